//! NIP-59 gift wraps: rumor, seal (kind 13) and gift wrap (kind 1059).
//!
//! The seal is signed by the real sender, the gift wrap by a one-shot
//! key. On the way in, the rumor's author must be the seal's signer.
use std::fmt;

use log::{debug, info, warn};
use rand::Rng;

use crate::config::Config;
use crate::encoding::{is_hex_of_len, short};
use crate::error::{Error, Result};
use crate::event::{kind::Kind, now, tag::Tags, Event, PubKey, Timestamp};
use crate::signer::{self, CancellationToken, Signer};

use super::nip01::p_tag;
use super::nip17::{validate_gift_wrap, validate_seal};

/// Steps of an unwrap, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwrapStage {
  Received,
  ValidatedOuter,
  DecryptedSeal,
  ValidatedSeal,
  DecryptedRumor,
  VerifiedAuthorship,
  Done,
}

impl fmt::Display for UnwrapStage {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let stage = match self {
      Self::Received => "received",
      Self::ValidatedOuter => "validated outer",
      Self::DecryptedSeal => "decrypted seal",
      Self::ValidatedSeal => "validated seal",
      Self::DecryptedRumor => "decrypted rumor",
      Self::VerifiedAuthorship => "verified authorship",
      Self::Done => "done",
    };
    write!(f, "{stage}")
  }
}

/// Unsigned event stamped now.
pub fn create_rumor<S, C>(kind: Kind, sender: S, content: C, tags: Tags) -> Result<Event>
where
  S: Into<String>,
  C: Into<String>,
{
  Event::new_without_signature(sender, now(), kind, tags, content)
}

/// Kind 14 private direct message addressed to `recipient`.
pub fn create_dm_rumor(sender: &str, recipient: &str, content: &str) -> Result<Event> {
  let tags = Tags::from(vec![p_tag(recipient, None)?]);
  create_rumor(Kind::PrivateDirectMessage, sender, content, tags)
}

/// Now minus a uniform draw from `[0, window_secs]`.
pub fn randomized_timestamp(window_secs: u64) -> Timestamp {
  let offset = rand::thread_rng().gen_range(0..=window_secs);
  now() - offset as Timestamp
}

/// Result of a successful unwrap. `sender_pubkey` is the seal signer,
/// the only authenticated sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwrappedGift {
  pub rumor: Event,
  pub sender_pubkey: PubKey,
}

fn check_recipient(recipient_pubkey: &str) -> Result<()> {
  if !is_hex_of_len(recipient_pubkey, 64) {
    return Err(Error::InvalidHex(format!("recipient {recipient_pubkey:?}")));
  }
  Ok(())
}

pub struct GiftWrapper<'a> {
  config: &'a Config,
}

impl<'a> GiftWrapper<'a> {
  pub fn new(config: &'a Config) -> Self {
    Self { config }
  }

  /// Seals and wraps `rumor` for `recipient_pubkey`. The rumor is
  /// re-stamped with the sender's pubkey first.
  pub async fn wrap(
    &self,
    sender: &dyn Signer,
    rumor: &Event,
    recipient_pubkey: &str,
    cancel: &CancellationToken,
  ) -> Result<Event> {
    check_recipient(recipient_pubkey)?;
    let sender_pubkey = signer::public_key(sender, self.config, cancel).await?;

    let mut rumor = rumor.clone();
    rumor.pubkey = sender_pubkey;
    rumor.update_id()?;

    let seal = self.seal(sender, &rumor, recipient_pubkey, cancel).await?;
    let gift = self.wrap_seal(sender, &seal, recipient_pubkey, cancel).await?;
    info!(
      "[GiftWrapper::wrap] rumor {} wrapped in {} for {}",
      short(&rumor.id),
      short(&gift.id),
      short(recipient_pubkey)
    );
    Ok(gift)
  }

  /// Kind 13 seal of `rumor` signed by `sender`. The rumor is encrypted
  /// as given.
  pub async fn seal(
    &self,
    sender: &dyn Signer,
    rumor: &Event,
    recipient_pubkey: &str,
    cancel: &CancellationToken,
  ) -> Result<Event> {
    if !rumor.is_rumor() {
      return Err(Error::Malformed("a rumor must not be signed".to_string()));
    }
    check_recipient(recipient_pubkey)?;

    let sender_pubkey = signer::public_key(sender, self.config, cancel).await?;
    let ciphertext = signer::nip44_encrypt(
      sender,
      &rumor.as_json()?,
      recipient_pubkey,
      &sender_pubkey,
      self.config,
      cancel,
    )
    .await?;

    let seal = Event::new_without_signature(
      sender_pubkey.as_str(),
      now(),
      Kind::Seal,
      Tags::new(),
      ciphertext,
    )?;
    debug!("[GiftWrapper::seal] sealed rumor {}", short(&rumor.id));
    signer::sign_event(sender, &seal, self.config, cancel).await
  }

  /// Kind 1059 gift wrap around a signed event, signed by a one-shot key
  /// from [`Signer::ephemeral`]. Signers that cannot produce one make the
  /// sender sign the wrap, which exposes who sent it.
  pub async fn wrap_seal(
    &self,
    sender: &dyn Signer,
    seal: &Event,
    recipient_pubkey: &str,
    cancel: &CancellationToken,
  ) -> Result<Event> {
    check_recipient(recipient_pubkey)?;

    let ephemeral = signer::ephemeral(sender, self.config, cancel).await?;
    let wrapping: &dyn Signer = match &ephemeral {
      Some(ephemeral) => ephemeral.as_ref(),
      None => {
        warn!("[GiftWrapper::wrap_seal] no ephemeral key available, wrapping with the sender key");
        sender
      }
    };

    let wrapping_pubkey = signer::public_key(wrapping, self.config, cancel).await?;
    let ciphertext = signer::nip44_encrypt(
      wrapping,
      &seal.as_json()?,
      recipient_pubkey,
      &wrapping_pubkey,
      self.config,
      cancel,
    )
    .await?;

    let gift = Event::new_without_signature(
      wrapping_pubkey.as_str(),
      randomized_timestamp(self.config.gift_wrap_window_secs),
      Kind::GiftWrap,
      Tags::from(vec![p_tag(recipient_pubkey, None)?]),
      ciphertext,
    )?;
    signer::sign_event(wrapping, &gift, self.config, cancel).await
  }

  /// Opens `gift` with the recipient's signer.
  pub async fn unwrap(
    &self,
    recipient: &dyn Signer,
    gift: &Event,
    cancel: &CancellationToken,
  ) -> Result<UnwrappedGift> {
    let mut stage = UnwrapStage::Received;
    let result = self.open(recipient, gift, cancel, &mut stage).await;
    match result {
      Ok(unwrapped) => {
        info!(
          "[GiftWrapper::unwrap] {} from {} opened",
          short(&gift.id),
          short(&unwrapped.sender_pubkey)
        );
        Ok(unwrapped)
      }
      Err(Error::Cancelled) => {
        debug!("[GiftWrapper::unwrap] {} cancelled after {stage}", short(&gift.id));
        Err(Error::Cancelled)
      }
      Err(err) => {
        warn!(
          "[GiftWrapper::unwrap] {} rejected after {stage}: {err}",
          short(&gift.id)
        );
        Err(err)
      }
    }
  }

  async fn open(
    &self,
    recipient: &dyn Signer,
    gift: &Event,
    cancel: &CancellationToken,
    stage: &mut UnwrapStage,
  ) -> Result<UnwrappedGift> {
    let recipient_pubkey = signer::public_key(recipient, self.config, cancel).await?;

    validate_gift_wrap(gift)?;
    if gift.tags.find_first(&["p", recipient_pubkey.as_str()]).is_none() {
      return Err(Error::InvalidGiftWrap("not addressed to us".to_string()));
    }
    if gift.content.is_empty() {
      return Err(Error::InvalidGiftWrap("empty content".to_string()));
    }
    *stage = UnwrapStage::ValidatedOuter;
    debug!("[GiftWrapper::unwrap] {} {stage}", short(&gift.id));

    let seal_json = signer::nip44_decrypt(
      recipient,
      &gift.content,
      &gift.pubkey,
      &recipient_pubkey,
      self.config,
      cancel,
    )
    .await?;
    *stage = UnwrapStage::DecryptedSeal;
    debug!("[GiftWrapper::unwrap] {} {stage}", short(&gift.id));

    let seal = Event::from_json(seal_json).map_err(|err| Error::InvalidSeal(err.to_string()))?;
    validate_seal(&seal, None)?;
    *stage = UnwrapStage::ValidatedSeal;
    debug!("[GiftWrapper::unwrap] {} {stage}", short(&gift.id));

    let rumor_json = signer::nip44_decrypt(
      recipient,
      &seal.content,
      &seal.pubkey,
      &recipient_pubkey,
      self.config,
      cancel,
    )
    .await?;
    let rumor = Event::from_json(rumor_json)?;
    *stage = UnwrapStage::DecryptedRumor;
    debug!("[GiftWrapper::unwrap] {} {stage}", short(&gift.id));

    if rumor.pubkey != seal.pubkey {
      return Err(Error::PubkeyMismatch {
        seal: seal.pubkey,
        rumor: rumor.pubkey,
      });
    }
    if !rumor.is_rumor() {
      return Err(Error::Malformed("rumor carries a signature".to_string()));
    }
    rumor.verify_id()?;
    *stage = UnwrapStage::VerifiedAuthorship;
    debug!("[GiftWrapper::unwrap] {} {stage}", short(&gift.id));

    *stage = UnwrapStage::Done;
    Ok(UnwrappedGift {
      rumor,
      sender_pubkey: seal.pubkey,
    })
  }
}
