//! NIP-17 private direct messages.
//!
//! Messages travel as NIP-59 gift wraps; this module adds the kind 10050
//! list of relays a user reads them from and the structural checks on
//! the two signed layers.
use log::{debug, warn};

use crate::encoding::short;
use crate::error::{Error, Result};
use crate::event::{kind::Kind, tag::Tag, tag::Tags, Event, Timestamp};

use super::nip65::normalize_url;

pub use super::nip59::create_dm_rumor;

pub const RELAY_TAG: &str = "relay";

/// Relays for incoming private messages, in preference order. URLs are
/// normalized and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DmRelayList {
  relays: Vec<String>,
}

impl DmRelayList {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends `url` unless already listed. `Ok(false)` for a duplicate.
  pub fn add(&mut self, url: &str) -> Result<bool> {
    let url = normalize_url(url)?;
    if self.relays.contains(&url) {
      return Ok(false);
    }
    self.relays.push(url);
    Ok(true)
  }

  pub fn remove(&mut self, url: &str) -> bool {
    let Ok(url) = normalize_url(url) else {
      return false;
    };
    let before = self.relays.len();
    self.relays.retain(|relay| *relay != url);
    self.relays.len() != before
  }

  pub fn contains(&self, url: &str) -> bool {
    normalize_url(url)
      .map(|url| self.relays.contains(&url))
      .unwrap_or(false)
  }

  pub fn relays(&self) -> &[String] {
    &self.relays
  }

  pub fn len(&self) -> usize {
    self.relays.len()
  }

  pub fn is_empty(&self) -> bool {
    self.relays.is_empty()
  }

  pub fn to_tags(&self) -> Tags {
    self
      .relays
      .iter()
      .map(|relay| Tag::new(RELAY_TAG, [relay.as_str()]))
      .collect()
  }

  /// Unsigned kind 10050 event. A list without relays would tell senders
  /// there is nowhere to deliver, so it is refused.
  pub fn create_event(&self, pubkey: &str, created_at: Timestamp) -> Result<Event> {
    if self.is_empty() {
      return Err(Error::Malformed("a DM relay list needs a relay".to_string()));
    }
    Event::new_without_signature(pubkey, created_at, Kind::DmRelayList, self.to_tags(), "")
  }

  /// Reads every `relay` tag. Invalid URLs are skipped.
  pub fn from_event(event: &Event) -> Result<Self> {
    if event.kind != Kind::DmRelayList {
      return Err(Error::InvalidKind(event.kind.as_u32() as u64));
    }

    let mut list = Self::new();
    for tag in event.tags.filter(RELAY_TAG) {
      let Some(url) = tag.content() else { continue };
      if let Err(err) = list.add(url) {
        warn!("[DmRelayList::from_event] skipping relay in {}: {err}", short(&event.id));
      }
    }
    Ok(list)
  }
}

/// Where to deliver private messages: the relays of a kind 10050 `event`
/// when it lists any, otherwise the valid entries of `defaults`.
pub fn get_dm_relays(event: Option<&Event>, defaults: &[&str]) -> Vec<String> {
  if let Some(event) = event {
    match DmRelayList::from_event(event) {
      Ok(list) if !list.is_empty() => return list.relays,
      Ok(_) => debug!("[nip17::get_dm_relays] {} lists no relays", short(&event.id)),
      Err(err) => debug!("[nip17::get_dm_relays] ignoring {}: {err}", short(&event.id)),
    }
  }

  let mut fallback = DmRelayList::new();
  for relay in defaults {
    if let Err(err) = fallback.add(relay) {
      debug!("[nip17::get_dm_relays] skipping default relay: {err}");
    }
  }
  fallback.relays
}

/// Outer layer checks: kind 1059, valid id and signature and at least
/// one `p` tag.
pub fn validate_gift_wrap(gift: &Event) -> Result<()> {
  if gift.kind != Kind::GiftWrap {
    return Err(Error::InvalidGiftWrap(format!(
      "expected kind 1059, got {}",
      gift.kind.as_u32()
    )));
  }
  gift
    .verify()
    .map_err(|err| Error::InvalidGiftWrap(err.to_string()))?;
  if gift.tags.find("p").is_none() {
    return Err(Error::InvalidGiftWrap("missing p tag".to_string()));
  }
  Ok(())
}

/// Seal checks: kind 13 and valid id and signature. With a `rumor`, its
/// author must also be the seal signer.
pub fn validate_seal(seal: &Event, rumor: Option<&Event>) -> Result<()> {
  if seal.kind != Kind::Seal {
    return Err(Error::InvalidSeal(format!(
      "expected kind 13, got {}",
      seal.kind.as_u32()
    )));
  }
  seal
    .verify()
    .map_err(|err| Error::InvalidSeal(err.to_string()))?;

  if let Some(rumor) = rumor {
    if rumor.pubkey != seal.pubkey {
      return Err(Error::PubkeyMismatch {
        seal: seal.pubkey.clone(),
        rumor: rumor.pubkey.clone(),
      });
    }
  }
  Ok(())
}
