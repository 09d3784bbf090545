//! # squawkbox
//!
//! Runtime support and a uniform service contract for external
//! text-to-speech backends.
//!
//! A *service* is one way of turning text into an MP3 file: a host
//! synthesizer driven over its command line, or a web API fetched over
//! HTTP. Services differ wildly in their protocols but share all of
//! their plumbing, and that plumbing is what this crate provides:
//!
//! - **CLI invocation** ([`cli`]) with argument flattening, hidden
//!   console windows on Windows, and layered output decoding;
//! - **transcoding** ([`transcode`]) of raw synthesizer output into MP3
//!   through LAME, with atomic placement of the result;
//! - **HTTP fetching** ([`net`]) with per-response validation and
//!   multi-segment concatenation;
//! - **phrase segmentation** ([`segment`]) for length-limited backends;
//! - **scratch-file management** ([`scratch`]) with quiet cleanup;
//! - **option descriptors** ([`options`]) with normalization,
//!   defaulting, and validation.
//!
//! Backends implement the [`Service`] trait against a shared
//! [`ServiceContext`] and register in a [`Registry`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use squawkbox::{GoogleTranslate, Registry, ServiceContext};
//!
//! # fn main() -> Result<(), squawkbox::TtsError> {
//! let ctx = ServiceContext::new(
//!     std::env::temp_dir().join("squawkbox"),
//!     Arc::new(|| "--quiet -q 2".to_string()),
//!     Arc::new(|text: &str| text.trim().to_string()),
//! )?;
//!
//! let mut registry = Registry::new();
//! registry.register(Box::new(GoogleTranslate::new(ctx.clone())))?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod errors;
pub mod net;
pub mod options;
pub mod platform;
pub mod providers;
pub mod scratch;
pub mod segment;
pub mod service;
pub mod transcode;

pub use cli::{CliArg, CliRunner, Decoding};
pub use errors::TtsError;
pub use net::{FetchRequire, NetFetcher, WebTarget};
pub use options::{OptionValues, ServiceOption, resolve_options};
pub use platform::{OS_FAMILY, OsFamily};
pub use providers::{ESpeak, GoogleTranslate, Registry};
pub use scratch::ScratchSpace;
pub use service::{Service, ServiceContext, ServiceTrait};
pub use transcode::{TranscodeRequire, Transcoder};
