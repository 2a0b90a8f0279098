use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

pub(super) const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

const CHROME_UA_CH: &str =
    "\"Not(A:Brand\";v=\"99\", \"Google Chrome\";v=\"133\", \"Chromium\";v=\"133\"";

/// Browser like defaults used for manifest and license requests.
///
/// These are an explicit value passed into the discovery and license code
/// instead of ambient global state. Caller supplied headers are merged over
/// them, later entries override.
#[derive(Clone, Debug)]
pub struct HttpDefaults {
    pub headers: HeaderMap,
    pub timeout: Duration,
}

impl Default for HttpDefaults {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(CHROME_UA));
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_static("https://www.mtv.fi"),
        );
        headers.insert(
            header::REFERER,
            HeaderValue::from_static("https://www.mtv.fi/"),
        );
        headers.insert(
            HeaderName::from_static("sec-ch-ua"),
            HeaderValue::from_static(CHROME_UA_CH),
        );
        headers.insert(
            HeaderName::from_static("sec-ch-ua-mobile"),
            HeaderValue::from_static("?0"),
        );
        headers.insert(
            HeaderName::from_static("sec-ch-ua-platform"),
            HeaderValue::from_static("\"Windows\""),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("fi-FI,fi;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        Self {
            headers,
            timeout: Duration::from_secs(15),
        }
    }
}

impl HttpDefaults {
    /// Returns the default headers with `extra` merged over them.
    pub fn merged(&self, extra: &HeaderMap) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.extend(extra.clone());
        headers
    }
}
