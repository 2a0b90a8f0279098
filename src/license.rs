//! Provider specific license exchange strategies.
//!
//! A strategy is selected from the license server url and sends the raw cdm
//! challenge as a POST body. Any non 200 response or transport error is an
//! error for that single attempt and never crosses this module's boundary
//! unhandled, callers log it and move on.

use crate::{acquire::LicenseOptions, defaults::HttpDefaults};
use anyhow::{Result, bail};
use reqwest::{
    StatusCode,
    blocking::Client,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};

/// License server dialect, detected from the url. First matching rule wins.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy {
    /// DRMToday style broker, bearer token plus `x-dt-auth-token` header and
    /// an `assetId` query parameter.
    DrmToday,
    /// Axinom style server, single `X-AxDRM-Message` token header over a
    /// minimal fixed header set.
    Axinom,
    /// Plain challenge POST with the caller's header and cookie context.
    Generic,
}

impl Strategy {
    pub fn detect(license_url: &str) -> Self {
        if license_url.contains("drmtoday") {
            Self::DrmToday
        } else if license_url.contains("axprod.net") || license_url.contains("ruutu") {
            Self::Axinom
        } else {
            Self::Generic
        }
    }
}

/// Ordered token candidates for the axinom token loop.
///
/// An empty token list still produces one attempt without a token, the
/// `X-AxDRM-Message` request header fallback may cover it.
pub(super) fn token_candidates(options: &LicenseOptions) -> Vec<Option<String>> {
    if options.tokens.is_empty() {
        vec![None]
    } else {
        options.tokens.iter().cloned().map(Some).collect()
    }
}

/// Strips a bearer prefix and surrounding quote characters from a token
/// scraped out of request headers.
pub(super) fn normalize_token(raw: &str) -> String {
    raw.replace("Bearer ", "")
        .trim()
        .trim_matches(|x| x == '"' || x == '\'')
        .to_owned()
}

pub(super) fn drmtoday_url(license_url: &str, asset_id: &str) -> String {
    let mut url = license_url.to_owned();

    if !url.contains("assetId=") {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str("assetId=");
        url.push_str(asset_id);
    }

    url
}

pub(super) fn post_drmtoday(
    client: &Client,
    license_url: &str,
    challenge: &[u8],
    options: &LicenseOptions,
    defaults: &HttpDefaults,
) -> Result<Vec<u8>> {
    let url = drmtoday_url(license_url, options.asset_id());
    let mut headers = defaults.merged(&options.headers);

    if let Some(token) = options.tokens.first() {
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
        headers.insert(
            HeaderName::from_static("x-dt-auth-token"),
            HeaderValue::from_str(token)?,
        );
    }

    post(
        client,
        &url,
        challenge,
        headers,
        options.cookie_header(),
        defaults,
    )
}

pub(super) fn post_axinom(
    client: &Client,
    license_url: &str,
    challenge: &[u8],
    token: Option<&str>,
    options: &LicenseOptions,
    defaults: &HttpDefaults,
) -> Result<Vec<u8>> {
    // Only this fixed header set is sent, the caller context is deliberately
    // not merged in. Compression negotiation breaks this provider, hence the
    // forced identity encoding.
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(crate::defaults::CHROME_UA),
    );
    headers.insert(
        header::ORIGIN,
        HeaderValue::from_static("https://www.ruutu.fi"),
    );
    headers.insert(
        header::REFERER,
        HeaderValue::from_static("https://www.ruutu.fi/"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::ACCEPT_ENCODING,
        HeaderValue::from_static("identity"),
    );

    if let Some(token) = axinom_token(token, options) {
        headers.insert(
            HeaderName::from_static("x-axdrm-message"),
            HeaderValue::from_str(&token)?,
        );
    }

    post(client, license_url, challenge, headers, None, defaults)
}

/// Resolves the axinom token for one attempt, an explicit candidate first and
/// the `X-AxDRM-Message` header from the caller context as fallback.
fn axinom_token(token: Option<&str>, options: &LicenseOptions) -> Option<String> {
    token
        .map(|x| x.to_owned())
        .or_else(|| {
            options
                .headers
                .get("x-axdrm-message")
                .and_then(|x| x.to_str().ok())
                .map(|x| x.to_owned())
        })
        .map(|x| normalize_token(&x))
}

pub(super) fn post_generic(
    client: &Client,
    license_url: &str,
    challenge: &[u8],
    options: &LicenseOptions,
    defaults: &HttpDefaults,
) -> Result<Vec<u8>> {
    post(
        client,
        license_url,
        challenge,
        defaults.merged(&options.headers),
        options.cookie_header(),
        defaults,
    )
}

fn post(
    client: &Client,
    url: &str,
    challenge: &[u8],
    headers: HeaderMap,
    cookies: Option<HeaderValue>,
    defaults: &HttpDefaults,
) -> Result<Vec<u8>> {
    let mut request = client
        .post(url)
        .headers(headers)
        .body(challenge.to_vec())
        .timeout(defaults.timeout);

    if let Some(cookies) = cookies {
        request = request.header(header::COOKIE, cookies);
    }

    let response = request.send()?;
    let status = response.status();

    if status != StatusCode::OK {
        let body: String = response
            .text()
            .unwrap_or_default()
            .chars()
            .take(200)
            .collect();
        bail!("license server rejected request ({}): {}", status, body);
    }

    Ok(response.bytes()?.to_vec())
}
