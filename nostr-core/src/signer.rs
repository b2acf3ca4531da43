//! The signing and NIP-44 capability the core consumes, plus the
//! cancellation handle every async pipeline accepts.
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use tokio::time::timeout;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::schnorr::Keys;

/// Shared flag, set once and observed by every clone.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
  cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Relaxed)
  }

  /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
  pub fn check(&self) -> Result<()> {
    if self.is_cancelled() {
      debug!("[CancellationToken] pipeline cancelled");
      return Err(Error::Cancelled);
    }
    Ok(())
  }
}

/// Something that holds a key: a local [`Keys`], a remote bunker, a
/// hardware device. Only `sign_event` and the NIP-44 pair ever see
/// secret material.
#[async_trait]
pub trait Signer: Send + Sync {
  async fn public_key(&self) -> Result<String>;

  /// Fills `id`, `pubkey` and `sig` of an unsigned event JSON without
  /// touching any other field.
  async fn sign_event(&self, unsigned_event_json: &str) -> Result<String>;

  async fn nip44_encrypt(
    &self,
    plaintext: &str,
    peer_pubkey: &str,
    self_pubkey: &str,
  ) -> Result<String>;

  async fn nip44_decrypt(
    &self,
    ciphertext: &str,
    peer_pubkey: &str,
    self_pubkey: &str,
  ) -> Result<String>;

  /// A fresh one-shot signer outside any keystore, used for gift wraps.
  /// Default implementation cannot produce one.
  ///
  /// The wrap step encrypts with the returned signer, so it must support
  /// NIP-44 itself. Signers that carry a NIP-44 implementation override
  /// this to hand out a fresh instance of their own type.
  async fn ephemeral(&self) -> Result<Option<Box<dyn Signer>>> {
    Ok(None)
  }
}

#[async_trait]
impl Signer for Keys {
  async fn public_key(&self) -> Result<String> {
    Ok(self.public_key_hex())
  }

  async fn sign_event(&self, unsigned_event_json: &str) -> Result<String> {
    let mut event = Event::from_json(unsigned_event_json)?;
    event.sign(self)?;
    event.as_json()
  }

  async fn nip44_encrypt(&self, _: &str, _: &str, _: &str) -> Result<String> {
    Err(Error::SignerUnavailable(
      "local keys do not implement NIP-44".to_string(),
    ))
  }

  async fn nip44_decrypt(&self, _: &str, _: &str, _: &str) -> Result<String> {
    Err(Error::SignerUnavailable(
      "local keys do not implement NIP-44".to_string(),
    ))
  }

  /// Fresh `Keys`. They sign but share the NIP-44 limitation of any
  /// `Keys`, so gift wrapping needs a signer that brings its own
  /// ephemeral key with encryption.
  async fn ephemeral(&self) -> Result<Option<Box<dyn Signer>>> {
    Ok(Some(Box::new(Keys::generate())))
  }
}

/// Awaits one capability call between two cancellation checks, bounded
/// by `config.signer_timeout`.
async fn bounded<T, F>(
  call: F,
  config: &Config,
  cancel: &CancellationToken,
  on_timeout: Error,
) -> Result<T>
where
  F: Future<Output = Result<T>>,
{
  cancel.check()?;
  let result = timeout(config.signer_timeout, call)
    .await
    .map_err(|_| on_timeout)??;
  cancel.check()?;
  Ok(result)
}

/// Signs `event` through `signer` and checks the result: the signed
/// fields must be unchanged and the id and signature must verify.
pub async fn sign_event(
  signer: &dyn Signer,
  event: &Event,
  config: &Config,
  cancel: &CancellationToken,
) -> Result<Event> {
  let unsigned = event.as_json()?;
  let signed = bounded(
    signer.sign_event(&unsigned),
    config,
    cancel,
    Error::SignerTimeout,
  )
  .await?;
  let signed = Event::from_json(signed)?;

  if signed.created_at != event.created_at
    || signed.kind != event.kind
    || signed.tags != event.tags
    || signed.content != event.content
  {
    return Err(Error::Malformed(
      "signer altered the signed fields".to_string(),
    ));
  }
  signed.verify()?;
  Ok(signed)
}

pub async fn public_key(
  signer: &dyn Signer,
  config: &Config,
  cancel: &CancellationToken,
) -> Result<String> {
  bounded(signer.public_key(), config, cancel, Error::SignerTimeout).await
}

pub async fn ephemeral(
  signer: &dyn Signer,
  config: &Config,
  cancel: &CancellationToken,
) -> Result<Option<Box<dyn Signer>>> {
  bounded(signer.ephemeral(), config, cancel, Error::SignerTimeout).await
}

pub async fn nip44_encrypt(
  signer: &dyn Signer,
  plaintext: &str,
  peer_pubkey: &str,
  self_pubkey: &str,
  config: &Config,
  cancel: &CancellationToken,
) -> Result<String> {
  bounded(
    signer.nip44_encrypt(plaintext, peer_pubkey, self_pubkey),
    config,
    cancel,
    Error::EncryptionTimeout,
  )
  .await
}

pub async fn nip44_decrypt(
  signer: &dyn Signer,
  ciphertext: &str,
  peer_pubkey: &str,
  self_pubkey: &str,
  config: &Config,
  cancel: &CancellationToken,
) -> Result<String> {
  bounded(
    signer.nip44_decrypt(ciphertext, peer_pubkey, self_pubkey),
    config,
    cancel,
    Error::EncryptionTimeout,
  )
  .await
}
