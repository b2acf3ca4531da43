use std::{env, str::FromStr, time::Duration};

use log::warn;

const DEFAULT_SIGNER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POW_TIMEOUT_SECS: u64 = 60;
/// Two days, the NIP-59 window for backdating gift wraps.
const DEFAULT_GIFT_WRAP_WINDOW_SECS: u64 = 2 * 86400;
const DEFAULT_POW_REFRESH_INTERVAL: u64 = 10_000;

/// Tunables of the core. Passed to the pipelines that need them,
/// there is no process-wide instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Upper bound for any single signer or NIP-44 call.
  pub signer_timeout: Duration,
  /// Default deadline for proof-of-work mining.
  pub pow_timeout: Duration,
  /// Gift wrap `created_at` is drawn from `[now - window, now]`.
  pub gift_wrap_window_secs: u64,
  /// Nonce attempts between two `created_at` refreshes while mining.
  pub pow_refresh_interval: u64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      signer_timeout: Duration::from_secs(DEFAULT_SIGNER_TIMEOUT_SECS),
      pow_timeout: Duration::from_secs(DEFAULT_POW_TIMEOUT_SECS),
      gift_wrap_window_secs: DEFAULT_GIFT_WRAP_WINDOW_SECS,
      pow_refresh_interval: DEFAULT_POW_REFRESH_INTERVAL,
    }
  }
}

fn read_var<T: FromStr>(name: &str, default: T) -> T {
  match env::var(name) {
    Ok(value) => match value.trim().parse::<T>() {
      Ok(parsed) => parsed,
      Err(_) => {
        warn!("[config] {name}={value} is not valid, using default");
        default
      }
    },
    Err(_) => default,
  }
}

impl Config {
  /// Reads `.env` (if present) and the `NOSTR_*` environment variables.
  pub fn from_env() -> Self {
    dotenv::dotenv().ok();

    let pow_refresh_interval = match read_var("NOSTR_POW_REFRESH_INTERVAL", DEFAULT_POW_REFRESH_INTERVAL) {
      0 => {
        warn!("[config] NOSTR_POW_REFRESH_INTERVAL must be positive, using default");
        DEFAULT_POW_REFRESH_INTERVAL
      }
      interval => interval,
    };

    Self {
      signer_timeout: Duration::from_secs(read_var(
        "NOSTR_SIGNER_TIMEOUT_SECS",
        DEFAULT_SIGNER_TIMEOUT_SECS,
      )),
      pow_timeout: Duration::from_secs(read_var("NOSTR_POW_TIMEOUT_SECS", DEFAULT_POW_TIMEOUT_SECS)),
      gift_wrap_window_secs: read_var("NOSTR_GIFT_WRAP_WINDOW_SECS", DEFAULT_GIFT_WRAP_WINDOW_SECS),
      pow_refresh_interval,
    }
  }
}
