/*
    REFERENCES
    ----------

    1. https://docs.rs/headless_chrome/1.0.17/headless_chrome/protocol/cdp/Network/struct.CookieParam.html

*/

use cookie::Cookie;
use reqwest::header::HeaderValue;
use serde::Deserialize;

/// A cookie captured from a browser session, attached to manifest and license
/// requests as a plain `Cookie` header.
#[allow(dead_code)]
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CookieParam {
    #[serde(default)]
    #[serde(rename = "name")]
    pub name: String,
    #[serde(default)]
    #[serde(rename = "value")]
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    #[serde(rename = "url")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    #[serde(rename = "domain")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    #[serde(rename = "path")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    #[serde(rename = "secure")]
    pub secure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    #[serde(rename = "httpOnly")]
    pub http_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "expires")]
    pub expires: Option<f64>,
}

impl CookieParam {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: value.to_owned(),
            ..Default::default()
        }
    }

    pub fn as_cookie(&self) -> Cookie<'_> {
        let mut cookie = Cookie::new(&self.name, &self.value);

        if let Some(domain) = &self.domain {
            cookie.set_domain(domain);
        }

        if let Some(path) = &self.path {
            cookie.set_path(path);
        }

        cookie.set_secure(self.secure);
        cookie.set_http_only(self.http_only);

        if let Some(expires) = &self.expires {
            let mut now = cookie::time::OffsetDateTime::now_utc();
            now += cookie::time::Duration::seconds_f64(*expires);
            cookie.set_expires(now);
        }

        cookie
    }
}

/// Joins cookies into one `Cookie` request header value.
pub(super) fn header_value(cookies: &[CookieParam]) -> Option<HeaderValue> {
    if cookies.is_empty() {
        return None;
    }

    HeaderValue::from_str(
        &cookies
            .iter()
            .map(|x| x.as_cookie().stripped().to_string())
            .collect::<Vec<_>>()
            .join("; "),
    )
    .ok()
}
