use std::fmt;

/// How a caller is expected to react to an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
  /// Reject the input, never retry, drop it.
  HardReject,
  /// The input is well formed but does not mean what was asked for.
  SemanticMismatch,
  /// The caller MAY retry with backoff. Nothing in the core retries.
  Transient,
  /// Propagated quietly, not an error from the user's point of view.
  Cancelled,
}

/// Reasons a zap receipt fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZapReceiptError {
  WrongKind(u32),
  MissingBolt11,
  MissingDescription,
  InvalidDescription,
  InvalidZapRequest,
  ProviderMismatch { expected: String, found: String },
  LnurlMismatch,
  AmountMismatch { invoice: u64, requested: u64 },
}

impl fmt::Display for ZapReceiptError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::WrongKind(kind) => write!(f, "expected kind 9735, got {kind}"),
      Self::MissingBolt11 => write!(f, "missing bolt11 tag"),
      Self::MissingDescription => write!(f, "missing description tag"),
      Self::InvalidDescription => write!(f, "description is not a zap request object"),
      Self::InvalidZapRequest => write!(f, "embedded zap request is invalid"),
      Self::ProviderMismatch { expected, found } => {
        write!(f, "receipt signed by {found}, expected {expected}")
      }
      Self::LnurlMismatch => write!(f, "zap request lnurl does not match recipient"),
      Self::AmountMismatch { invoice, requested } => {
        write!(f, "invoice amount {invoice} msat differs from requested {requested} msat")
      }
    }
  }
}

/// [`nostr_core`](crate) error
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// Error serializing or deserializing JSON data
  #[error(transparent)]
  Json(#[from] serde_json::Error),
  #[error("invalid hex: {0}")]
  InvalidHex(String),
  #[error("malformed: {0}")]
  Malformed(String),
  #[error("id mismatch: stored {stored}, computed {computed}")]
  IdMismatch { stored: String, computed: String },
  #[error("bad signature")]
  BadSignature,
  #[error("missing tag: {0}")]
  MissingTag(String),
  #[error("invalid kind: {0}")]
  InvalidKind(u64),
  #[error("invalid relay url: {0}")]
  InvalidUrl(String),
  #[error("event of kind {0} is not a relay list")]
  NotRelayList(u32),
  #[error("no thread context")]
  NoThreadContext,
  #[error("difficulty too low: required {required}, got {actual}")]
  DifficultyTooLow { required: u16, actual: u16 },
  #[error("proof of work generation timed out")]
  GenerateTimeout,
  #[error("invalid gift wrap: {0}")]
  InvalidGiftWrap(String),
  #[error("invalid seal: {0}")]
  InvalidSeal(String),
  #[error("sender pubkey mismatch: seal {seal}, rumor {rumor}")]
  PubkeyMismatch { seal: String, rumor: String },
  #[error("invalid zap receipt: {0}")]
  InvalidZapReceipt(ZapReceiptError),
  #[error("invalid lnurl: {0}")]
  InvalidLnurl(String),
  #[error("amount out of range: {0}")]
  AmountOutOfRange(String),
  #[error("invoice failed: {0}")]
  InvoiceFailed(String),
  #[error("cancelled")]
  Cancelled,
  #[error("signer unavailable: {0}")]
  SignerUnavailable(String),
  #[error("signer timed out")]
  SignerTimeout,
  #[error("encryption timed out")]
  EncryptionTimeout,
}

impl Error {
  pub fn policy(&self) -> ErrorPolicy {
    match self {
      Self::Json(_)
      | Self::InvalidHex(_)
      | Self::Malformed(_)
      | Self::IdMismatch { .. }
      | Self::BadSignature
      | Self::MissingTag(_)
      | Self::InvalidKind(_)
      | Self::InvalidUrl(_)
      | Self::InvalidGiftWrap(_)
      | Self::InvalidSeal(_)
      | Self::PubkeyMismatch { .. }
      | Self::InvalidZapReceipt(_)
      | Self::InvalidLnurl(_) => ErrorPolicy::HardReject,
      Self::DifficultyTooLow { .. }
      | Self::AmountOutOfRange(_)
      | Self::NotRelayList(_)
      | Self::NoThreadContext => ErrorPolicy::SemanticMismatch,
      Self::SignerUnavailable(_)
      | Self::SignerTimeout
      | Self::EncryptionTimeout
      | Self::GenerateTimeout
      | Self::InvoiceFailed(_) => ErrorPolicy::Transient,
      Self::Cancelled => ErrorPolicy::Cancelled,
    }
  }

  pub fn is_retryable(&self) -> bool {
    self.policy() == ErrorPolicy::Transient
  }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  #[test]
  fn policies_follow_the_error_table() {
    assert_eq!(Error::BadSignature.policy(), ErrorPolicy::HardReject);
    assert_eq!(
      Error::PubkeyMismatch { seal: "a".into(), rumor: "b".into() }.policy(),
      ErrorPolicy::HardReject
    );
    assert_eq!(Error::NotRelayList(1).policy(), ErrorPolicy::SemanticMismatch);
    assert_eq!(
      Error::DifficultyTooLow { required: 8, actual: 3 }.policy(),
      ErrorPolicy::SemanticMismatch
    );
    assert_eq!(Error::Cancelled.policy(), ErrorPolicy::Cancelled);
    assert!(Error::SignerTimeout.is_retryable());
    assert!(Error::GenerateTimeout.is_retryable());
    assert!(!Error::Malformed("x".into()).is_retryable());
  }

  #[test]
  fn amount_mismatch_message_names_both_amounts() {
    let err = Error::InvalidZapReceipt(ZapReceiptError::AmountMismatch {
      invoice: 21000,
      requested: 22000,
    });
    assert_eq!(
      err.to_string(),
      "invalid zap receipt: invoice amount 21000 msat differs from requested 22000 msat"
    );
  }
}
