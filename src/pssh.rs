//! Best effort PSSH discovery from manifests, playlists and init segments.
//!
//! Extraction rules are tried in strict priority order and every failure is
//! swallowed into `None`, so one unreadable document never aborts the scan.

use crate::{acquire::LicenseOptions, defaults::HttpDefaults, utils};
use anyhow::{Result, bail};
use log::debug;
use regex::{Regex, RegexBuilder};
use reqwest::{StatusCode, Url, blocking::Client, header};
use std::sync::LazyLock;

/// At most this many child variants of a master playlist are scanned.
const MAX_VARIANT_SCANS: usize = 5;

static HLS_KEY_DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"#EXT-X-(?:SESSION-)?KEY:.*URI="data:text/plain;base64,(.*?)""#)
        .case_insensitive(true)
        .build()
        .unwrap()
});

static HLS_MAP_URI: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"#EXT-X-MAP:URI="(.*?)""#)
        .case_insensitive(true)
        .build()
        .unwrap()
});

static PSSH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"<(?:[a-zA-Z0-9]+:)?pssh[^>]*>(.*?)</(?:[a-zA-Z0-9]+:)?pssh>",
        r"cenc:pssh>(.*?)</cenc:pssh>",
        r#""pssh(?:"|Value")?\s*:\s*"([^"]{20,})""#,
    ]
    .iter()
    .map(|x| {
        RegexBuilder::new(x)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .unwrap()
    })
    .collect()
});

/// Scans a manifest or playlist url for one base64 encoded PSSH candidate.
///
/// Rules, first confident match wins:
///
/// 1. HLS key directive carrying a `data:text/plain;base64,` uri.
/// 2. Inline `<cenc:pssh>` element text.
/// 3. Permissive XML / JSON patterns.
/// 4. Master playlist only, scan up to 5 child variants in listed order.
/// 5. `EXT-X-MAP` init segment fetch and binary box scan.
pub fn find_in_manifest(
    client: &Client,
    url: &str,
    options: &LicenseOptions,
    defaults: &HttpDefaults,
) -> Option<String> {
    scan_manifest(client, url, options, defaults, true)
}

fn scan_manifest(
    client: &Client,
    url: &str,
    options: &LicenseOptions,
    defaults: &HttpDefaults,
    recurse: bool,
) -> Option<String> {
    let url = resolve_tracking_url(url);
    let text = match fetch(client, &url, options, defaults).and_then(|x| {
        String::from_utf8(x).map_err(|_| anyhow::anyhow!("{} is not a text document", url))
    }) {
        Ok(x) => x,
        Err(e) => {
            debug!("manifest scan skipped: {:#}", e);
            return None;
        }
    };

    if let Some(pssh) = scan_text(&text) {
        debug!("found pssh in {}: {:.40}...", url, pssh);
        return Some(pssh);
    }

    // Children are never treated as master playlists themselves, which bounds
    // the scan to one level.
    if recurse
        && let Ok(m3u8_rs::Playlist::MasterPlaylist(master)) =
            m3u8_rs::parse_playlist_res(text.as_bytes())
    {
        for variant in master
            .variants
            .iter()
            .filter(|x| !x.is_i_frame)
            .take(MAX_VARIANT_SCANS)
        {
            if let Some(child) = join_url(&url, &variant.uri)
                && let Some(pssh) = scan_manifest(client, child.as_str(), options, defaults, false)
            {
                return Some(pssh);
            }
        }
    }

    if let Some(captures) = HLS_MAP_URI.captures(&text)
        && let Some(init_url) = join_url(&url, &captures[1])
    {
        match fetch(client, init_url.as_str(), options, defaults) {
            Ok(data) => {
                if let Some(pssh) = find_in_init_segment(&data) {
                    debug!("found pssh in init segment {}: {:.40}...", init_url, pssh);
                    return Some(pssh);
                }
            }
            Err(e) => debug!("init segment fetch failed: {:#}", e),
        }
    }

    None
}

/// Scans a binary mp4 init segment for an embedded `pssh` box and returns it
/// base64 encoded. Returns `None` on a missing tag or any bounds violation.
pub fn find_in_init_segment(data: &[u8]) -> Option<String> {
    let offset = data.windows(4).position(|x| x == b"pssh")?;

    if offset < 4 {
        return None;
    }

    let start = offset - 4;
    let size = u32::from_be_bytes(data[start..offset].try_into().unwrap()) as usize;

    if size == 0 || start + size > data.len() {
        return None;
    }

    Some(utils::encode_base64(&data[start..(start + size)]))
}

fn scan_text(text: &str) -> Option<String> {
    if let Some(captures) = HLS_KEY_DATA_URI.captures(text) {
        let pssh = captures[1].split(',').next().unwrap_or_default().trim();

        if !pssh.is_empty() {
            return Some(pssh.to_owned());
        }
    }

    if let Some(inner) = text
        .split("<cenc:pssh>")
        .nth(1)
        .and_then(|x| x.split("</cenc:pssh>").next())
    {
        let inner = inner.trim();

        if !inner.is_empty() {
            return Some(inner.to_owned());
        }
    }

    for pattern in PSSH_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            let pssh = captures[1].trim();

            if !pssh.is_empty() {
                return Some(pssh.to_owned());
            }
        }
    }

    None
}

/// Ad decision gateways wrap the real manifest url in a `resource` query
/// parameter.
fn resolve_tracking_url(url: &str) -> String {
    if url.contains("gnsnpaw.com") || url.contains("decision") {
        if let Ok(parsed) = Url::parse(url)
            && let Some((_, resource)) = parsed.query_pairs().find(|(k, _)| k == "resource")
        {
            return resource.into_owned();
        }
    }

    url.to_owned()
}

fn join_url(base: &str, uri: &str) -> Option<Url> {
    Url::parse(base).and_then(|x| x.join(uri)).ok()
}

fn fetch(
    client: &Client,
    url: &str,
    options: &LicenseOptions,
    defaults: &HttpDefaults,
) -> Result<Vec<u8>> {
    let mut request = client
        .get(url)
        .headers(defaults.merged(&options.headers))
        .timeout(defaults.timeout);

    if let Some(cookies) = options.cookie_header() {
        request = request.header(header::COOKIE, cookies);
    }

    let response = request.send()?;

    if response.status() != StatusCode::OK {
        bail!("{} request failed with status {}", url, response.status());
    }

    Ok(response.bytes()?.to_vec())
}
