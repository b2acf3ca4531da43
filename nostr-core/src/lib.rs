//! Nostr protocol core.
//!
//! Events with canonical id derivation and BIP-340 signatures, tags and
//! filters, plus the NIP extensions with non-trivial semantics:
//! threading (NIP-10), proof of work (NIP-13), relay lists (NIP-65),
//! zap receipts (NIP-57) and gift wraps (NIP-59).
//!
//! Everything that needs a secret key for encryption or touches the
//! network goes through the [`signer::Signer`] and
//! [`transport::RelayTransport`] capabilities.
pub use env_logger::Env;
pub use log::{debug, info};

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialises `env_logger` once for the whole process.
/// The default filter is `info`, override it with `RUST_LOG`.
pub fn init_logger() {
  INIT_LOGGER.call_once(|| {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info")).try_init();
  });
}

pub mod client_to_relay_communication;
pub mod config;
pub mod encoding;
pub mod error;
pub mod event;
pub mod filter;
pub mod nips;
pub mod relay_to_client_communication;
pub mod schnorr;
pub mod signer;
pub mod transport;

pub use config::Config;
pub use error::{Error, ErrorPolicy, Result};
pub use event::{kind::Kind, tag::Tag, tag::Tags, Event};
pub use filter::{Filter, FilterBuilder};
pub use schnorr::Keys;
pub use signer::{CancellationToken, Signer};
