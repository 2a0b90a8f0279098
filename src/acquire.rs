//! Drives the acquisition loop over PSSH candidates and license strategies.

use crate::{
    cdm::{Cdm, Key, Session},
    cookie::{self, CookieParam},
    defaults::HttpDefaults,
    license::{self, Strategy},
    pssh, utils,
};
use anyhow::{Context, Result};
use log::{debug, error, info};
use reqwest::{
    blocking::Client,
    header::{HeaderMap, HeaderValue},
};
use std::collections::HashSet;

/// Asset id sent to DRMToday style brokers when the caller supplies none.
pub const DEFAULT_ASSET_ID: &str = "tvmedia-20446735";

/// Caller supplied context for one acquisition, scraped from a live page.
///
/// Headers are merged over the browser like defaults, later entries override.
/// Tokens are tried in order where a strategy supports fallback.
#[derive(Clone, Debug, Default)]
pub struct LicenseOptions {
    pub headers: HeaderMap,
    pub cookies: Vec<CookieParam>,
    pub tokens: Vec<String>,
    pub asset_id: Option<String>,
}

impl LicenseOptions {
    pub(super) fn cookie_header(&self) -> Option<HeaderValue> {
        cookie::header_value(&self.cookies)
    }

    pub(super) fn asset_id(&self) -> &str {
        self.asset_id.as_deref().unwrap_or(DEFAULT_ASSET_ID)
    }
}

/// Requests content keys from a license server through an injected cdm.
pub struct KeyAcquirer<C: Cdm> {
    cdm: C,
    client: Client,
    defaults: HttpDefaults,
}

impl<C: Cdm> KeyAcquirer<C> {
    pub fn new(cdm: C) -> Result<Self> {
        Ok(Self::with_client(
            cdm,
            Client::builder()
                .build()
                .context("couldn't create reqwest client")?,
            HttpDefaults::default(),
        ))
    }

    pub fn with_client(cdm: C, client: Client, defaults: HttpDefaults) -> Self {
        Self {
            cdm,
            client,
            defaults,
        }
    }

    /// Scans a manifest or playlist url for one base64 encoded PSSH
    /// candidate, see [`pssh::find_in_manifest`].
    pub fn find_pssh(&self, manifest_url: &str, options: &LicenseOptions) -> Option<String> {
        pssh::find_in_manifest(&self.client, manifest_url, options, &self.defaults)
    }

    /// Requests content keys for base64 encoded PSSH candidates, tried in
    /// discovery order until one of them yields keys.
    ///
    /// One cdm session is opened for the whole call and always closed again,
    /// no session is opened when `psshs` is empty. A failing candidate or
    /// token is logged and skipped, it never aborts the remaining attempts.
    /// Returns the deduplicated `kid:key` pairs, an empty set means the
    /// acquisition failed.
    pub fn acquire(
        &self,
        psshs: &[String],
        license_url: &str,
        options: &LicenseOptions,
    ) -> Result<HashSet<String>> {
        let mut found: Vec<Key> = vec![];

        if psshs.is_empty() {
            return Ok(HashSet::new());
        }

        let session = Session::open(&self.cdm)?;
        let strategy = Strategy::detect(license_url);
        debug!("using {:?} strategy for {}", strategy, license_url);

        for pssh in psshs {
            match self.try_candidate(&session, strategy, pssh, license_url, options) {
                Ok(keys) => found.extend(keys),
                Err(e) => {
                    error!("pssh candidate failed: {:#}", e);
                    continue;
                }
            }

            // One successful candidate is enough.
            if !found.is_empty() {
                break;
            }
        }

        Ok(found.iter().map(Key::pair).collect())
    }

    fn try_candidate(
        &self,
        session: &Session<'_, C>,
        strategy: Strategy,
        pssh: &str,
        license_url: &str,
        options: &LicenseOptions,
    ) -> Result<Vec<Key>> {
        let pssh = utils::decode_base64(pssh).context("pssh candidate is not valid base64")?;
        let challenge = session.challenge(&pssh)?;

        match strategy {
            Strategy::DrmToday => {
                let response = license::post_drmtoday(
                    &self.client,
                    license_url,
                    &challenge,
                    options,
                    &self.defaults,
                )?;
                Ok(session.content_keys(&response)?)
            }
            Strategy::Axinom => {
                for token in license::token_candidates(options) {
                    let keys = license::post_axinom(
                        &self.client,
                        license_url,
                        &challenge,
                        token.as_deref(),
                        options,
                        &self.defaults,
                    )
                    .and_then(|x| session.content_keys(&x).map_err(|x| x.into()));

                    match keys {
                        Ok(keys) if !keys.is_empty() => {
                            match &token {
                                Some(token) => info!(
                                    "keys acquired with token {}...",
                                    token.get(..10).unwrap_or(token)
                                ),
                                None => info!("keys acquired without token"),
                            }
                            return Ok(keys);
                        }
                        Ok(_) => debug!("token accepted but no content keys returned"),
                        Err(e) => debug!("token failed: {:#}", e),
                    }
                }

                Ok(vec![])
            }
            Strategy::Generic => {
                let response = license::post_generic(
                    &self.client,
                    license_url,
                    &challenge,
                    options,
                    &self.defaults,
                )?;
                Ok(session.content_keys(&response)?)
            }
        }
    }
}
