//! Content decryption module capability and session lifecycle.

use log::debug;
use thiserror::Error;

/// The errors that may be returned by a [`Cdm`] implementation.
#[derive(Debug, Error)]
pub enum CdmError {
    #[error("Cdm device is not usable: {0}")]
    Configuration(String),

    #[error("License challenge cannot be generated: {0}")]
    Challenge(String),

    #[error("License cannot be parsed: {0}")]
    LicenseParse(String),

    #[error("No open session exists for id {0:?}")]
    InvalidSession(SessionId),
}

/// Opaque handle value for one cdm session.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SessionId(pub u64);

/// Type of a key returned by the cdm after parsing a license.
///
/// Only [`KeyType::Content`] keys decrypt media samples, other types are
/// signing or provider specific keys which are filtered out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyType {
    Content,
    Signing,
    Other(String),
}

/// A single (key id, key) pair returned by the cdm.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Key {
    pub typ: KeyType,
    pub kid: [u8; 16],
    pub key: [u8; 16],
}

impl Key {
    /// Format this key as `hex(kid):hex(key)`.
    pub fn pair(&self) -> String {
        format!("{}:{}", hex::encode(self.kid), hex::encode(self.key))
    }
}

/// An injected content decryption module.
///
/// The crate does not implement any cryptography itself. A concrete device
/// bound implementation (or a test double) is provided by the caller and only
/// accessed through this capability.
pub trait Cdm {
    fn open(&self) -> Result<SessionId, CdmError>;
    fn challenge(&self, session: SessionId, pssh: &[u8]) -> Result<Vec<u8>, CdmError>;
    fn parse_license(&self, session: SessionId, license: &[u8]) -> Result<(), CdmError>;
    fn keys(&self, session: SessionId) -> Result<Vec<Key>, CdmError>;
    fn close(&self, session: SessionId) -> Result<(), CdmError>;
}

/// An exclusively owned cdm session which is closed when dropped.
///
/// Exactly one session exists per acquisition call. Closing on drop guarantees
/// release on every exit path, including per candidate failures.
pub struct Session<'a, C: Cdm + ?Sized> {
    cdm: &'a C,
    id: SessionId,
}

impl<'a, C: Cdm + ?Sized> Session<'a, C> {
    pub fn open(cdm: &'a C) -> Result<Self, CdmError> {
        Ok(Self {
            id: cdm.open()?,
            cdm,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Generate a license challenge for one PSSH box.
    pub fn challenge(&self, pssh: &[u8]) -> Result<Vec<u8>, CdmError> {
        self.cdm.challenge(self.id, pssh)
    }

    /// Parse a license server response and return the content keys it holds.
    pub fn content_keys(&self, license: &[u8]) -> Result<Vec<Key>, CdmError> {
        self.cdm.parse_license(self.id, license)?;
        Ok(self
            .cdm
            .keys(self.id)?
            .into_iter()
            .filter(|x| x.typ == KeyType::Content)
            .collect())
    }
}

impl<C: Cdm + ?Sized> Drop for Session<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.cdm.close(self.id) {
            debug!("couldn't close cdm session {}: {}", self.id.0, e);
        }
    }
}
