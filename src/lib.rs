//! Request content keys from DRM license servers for video streams served
//! over HTTP, DASH (.mpd) and HLS (.m3u8) playlists.
//!
//! The crate covers three things:
//!
//! - Discovering `PSSH` protection headers inside manifests, playlists and
//!   binary init segments ([`pssh`]).
//! - Driving one cdm session per acquisition over an injected [`Cdm`]
//!   capability, the cryptographic implementation itself is not part of this
//!   crate.
//! - Exchanging the cdm challenge with a license server through a provider
//!   specific [`Strategy`], with ordered token fallback where the provider
//!   needs it.
//!
//! ```no_run
//! use vsl::{KeyAcquirer, LicenseOptions};
//!
//! # fn demo(cdm: impl vsl::Cdm) -> anyhow::Result<()> {
//! let acquirer = KeyAcquirer::new(cdm)?;
//! let options = LicenseOptions::default();
//!
//! let psshs = acquirer
//!     .find_pssh("https://streaming.site/video_001/master.m3u8", &options)
//!     .into_iter()
//!     .collect::<Vec<_>>();
//! let keys = acquirer.acquire(&psshs, "https://lic.drmtoday.com/cenc", &options)?;
//!
//! for key in keys {
//!     println!("{}", key);
//! }
//! # Ok(())
//! # }
//! ```

mod acquire;
mod cdm;
mod cookie;
mod defaults;
mod license;
mod utils;

pub mod pssh;

pub use acquire::{DEFAULT_ASSET_ID, KeyAcquirer, LicenseOptions};
pub use cdm::{Cdm, CdmError, Key, KeyType, Session, SessionId};
pub use cookie::CookieParam;
pub use defaults::HttpDefaults;
pub use license::Strategy;
pub use reqwest;
