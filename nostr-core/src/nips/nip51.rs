//! NIP-51 lists: mute list (kind 10000) and pinned notes (kind 10001).
use log::debug;

use crate::encoding::{is_hex_of_len, short};
use crate::error::{Error, Result};
use crate::event::{kind::Kind, tag::Tag, tag::Tags, Event, Timestamp};

fn check_kind(event: &Event, expected: Kind) -> Result<()> {
  if event.kind != expected {
    return Err(Error::InvalidKind(event.kind.as_u32() as u64));
  }
  Ok(())
}

fn check_hex32(what: &str, value: &str) -> Result<()> {
  if !is_hex_of_len(value, 64) {
    return Err(Error::InvalidHex(format!("{what} {value:?}")));
  }
  Ok(())
}

/// Appends `value` unless present. `true` when it was added.
fn insert(values: &mut Vec<String>, value: String) -> bool {
  if values.contains(&value) {
    return false;
  }
  values.push(value);
  true
}

fn take_out(values: &mut Vec<String>, value: &str) -> bool {
  let before = values.len();
  values.retain(|v| v != value);
  values.len() != before
}

fn normalize_hashtag(hashtag: &str) -> String {
  hashtag.trim().trim_start_matches('#').to_lowercase()
}

/// Muted pubkeys (`p`), threads (`e`), hashtags (`t`) and words (`word`).
/// Hashtags and words are kept lowercase and matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuteList {
  pubkeys: Vec<String>,
  event_ids: Vec<String>,
  hashtags: Vec<String>,
  words: Vec<String>,
}

impl MuteList {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn mute_pubkey(&mut self, pubkey: &str) -> Result<bool> {
    check_hex32("pubkey", pubkey)?;
    Ok(insert(&mut self.pubkeys, pubkey.to_string()))
  }

  pub fn unmute_pubkey(&mut self, pubkey: &str) -> bool {
    take_out(&mut self.pubkeys, pubkey)
  }

  pub fn is_pubkey_muted(&self, pubkey: &str) -> bool {
    self.pubkeys.iter().any(|p| p == pubkey)
  }

  pub fn mute_event(&mut self, event_id: &str) -> Result<bool> {
    check_hex32("event id", event_id)?;
    Ok(insert(&mut self.event_ids, event_id.to_string()))
  }

  pub fn unmute_event(&mut self, event_id: &str) -> bool {
    take_out(&mut self.event_ids, event_id)
  }

  pub fn is_event_id_muted(&self, event_id: &str) -> bool {
    self.event_ids.iter().any(|e| e == event_id)
  }

  /// A leading `#` is ignored.
  pub fn mute_hashtag(&mut self, hashtag: &str) -> bool {
    let hashtag = normalize_hashtag(hashtag);
    !hashtag.is_empty() && insert(&mut self.hashtags, hashtag)
  }

  pub fn unmute_hashtag(&mut self, hashtag: &str) -> bool {
    take_out(&mut self.hashtags, &normalize_hashtag(hashtag))
  }

  pub fn is_hashtag_muted(&self, hashtag: &str) -> bool {
    let hashtag = normalize_hashtag(hashtag);
    self.hashtags.iter().any(|t| *t == hashtag)
  }

  pub fn mute_word(&mut self, word: &str) -> bool {
    let word = word.trim().to_lowercase();
    !word.is_empty() && insert(&mut self.words, word)
  }

  pub fn unmute_word(&mut self, word: &str) -> bool {
    take_out(&mut self.words, &word.trim().to_lowercase())
  }

  pub fn is_word_muted(&self, word: &str) -> bool {
    let word = word.trim().to_lowercase();
    self.words.iter().any(|w| *w == word)
  }

  /// Muted by author, by id, by one of its `t` tags, or because its
  /// content contains a muted word.
  pub fn is_event_muted(&self, event: &Event) -> bool {
    if self.is_pubkey_muted(&event.pubkey) || self.is_event_id_muted(&event.id) {
      return true;
    }
    if event
      .tags
      .filter("t")
      .filter_map(Tag::content)
      .any(|hashtag| self.is_hashtag_muted(hashtag))
    {
      return true;
    }
    if self.words.is_empty() {
      return false;
    }
    let content = event.content.to_lowercase();
    self.words.iter().any(|word| content.contains(word.as_str()))
  }

  pub fn to_tags(&self) -> Tags {
    let mut tags = Tags::new();
    for (name, values) in [
      ("p", &self.pubkeys),
      ("e", &self.event_ids),
      ("t", &self.hashtags),
      ("word", &self.words),
    ] {
      for value in values {
        tags.push(Tag::new(name, [value.as_str()]));
      }
    }
    tags
  }

  pub fn to_event(&self, pubkey: &str, created_at: Timestamp) -> Result<Event> {
    Event::new_without_signature(pubkey, created_at, Kind::MuteList, self.to_tags(), "")
  }

  /// Public tags only. Invalid `p` and `e` values are skipped.
  pub fn from_event(event: &Event) -> Result<Self> {
    check_kind(event, Kind::MuteList)?;

    let mut list = Self::new();
    for tag in event.tags.iter() {
      let Some(value) = tag.content() else { continue };
      let accepted = match tag.name() {
        "p" => list.mute_pubkey(value).is_ok(),
        "e" => list.mute_event(value).is_ok(),
        "t" => {
          list.mute_hashtag(value);
          true
        }
        "word" => {
          list.mute_word(value);
          true
        }
        _ => true,
      };
      if !accepted {
        debug!(
          "[MuteList::from_event] skipping {} tag in {}",
          tag.name(),
          short(&event.id)
        );
      }
    }
    Ok(list)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
  pub event_id: String,
  pub relay: Option<String>,
}

/// Pinned notes, oldest pin first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinList {
  pins: Vec<Pin>,
}

impl PinList {
  pub fn new() -> Self {
    Self::default()
  }

  /// `false` when already pinned.
  pub fn pin(&mut self, event_id: &str, relay: Option<&str>) -> Result<bool> {
    check_hex32("event id", event_id)?;
    if self.is_pinned(event_id) {
      return Ok(false);
    }
    self.pins.push(Pin {
      event_id: event_id.to_string(),
      relay: relay.filter(|r| !r.is_empty()).map(str::to_string),
    });
    Ok(true)
  }

  pub fn unpin(&mut self, event_id: &str) -> bool {
    let before = self.pins.len();
    self.pins.retain(|pin| pin.event_id != event_id);
    self.pins.len() != before
  }

  pub fn is_pinned(&self, event_id: &str) -> bool {
    self.pins.iter().any(|pin| pin.event_id == event_id)
  }

  pub fn pins(&self) -> &[Pin] {
    &self.pins
  }

  pub fn len(&self) -> usize {
    self.pins.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pins.is_empty()
  }

  pub fn to_tags(&self) -> Tags {
    self
      .pins
      .iter()
      .map(|pin| {
        let mut tag = Tag::new("e", [pin.event_id.as_str()]);
        if let Some(relay) = &pin.relay {
          tag.push(relay.as_str());
        }
        tag
      })
      .collect()
  }

  pub fn to_event(&self, pubkey: &str, created_at: Timestamp) -> Result<Event> {
    Event::new_without_signature(pubkey, created_at, Kind::PinList, self.to_tags(), "")
  }

  pub fn from_event(event: &Event) -> Result<Self> {
    check_kind(event, Kind::PinList)?;

    let mut list = Self::new();
    for tag in event.tags.filter("e") {
      let Some(event_id) = tag.content() else { continue };
      if list.pin(event_id, tag.get(2)).is_err() {
        debug!("[PinList::from_event] skipping pin {}", short(event_id));
      }
    }
    Ok(list)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  const ALICE: &str = "1111111111111111111111111111111111111111111111111111111111111111";
  const BOB: &str = "2222222222222222222222222222222222222222222222222222222222222222";
  const NOTE: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
  const OTHER_NOTE: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

  fn make_sut() -> MuteList {
    let mut list = MuteList::new();
    list.mute_pubkey(ALICE).unwrap();
    list.mute_event(NOTE).unwrap();
    list.mute_hashtag("#Bitcoin");
    list.mute_word("GM");
    list
  }

  fn make_note(author: &str, tags: Vec<Tag>, content: &str) -> Event {
    Event::new_without_signature(author, 1700000000, Kind::TextNote, Tags::from(tags), content)
      .unwrap()
  }

  #[test]
  fn test_mute_entries_are_normalized() {
    let mut list = make_sut();
    assert!(list.is_hashtag_muted("bitcoin"));
    assert!(list.is_hashtag_muted("#BITCOIN"));
    assert!(list.is_word_muted("gm"));
    assert!(!list.mute_hashtag("bitcoin"));
    assert!(!list.mute_word(" Gm "));
    assert!(!list.mute_word("  "));
    assert!(!list.mute_pubkey(ALICE).unwrap());
    assert!(matches!(list.mute_pubkey("alice"), Err(Error::InvalidHex(_))));

    assert!(list.unmute_hashtag("#bitcoin"));
    assert!(!list.is_hashtag_muted("bitcoin"));
    assert!(list.unmute_pubkey(ALICE));
    assert!(list.unmute_event(NOTE));
    assert!(list.unmute_word("gm"));
    assert_eq!(list, MuteList::new());
  }

  #[test]
  fn test_is_event_muted() {
    let list = make_sut();
    assert!(list.is_event_muted(&make_note(ALICE, vec![], "hello")));
    assert!(list.is_event_muted(&make_note(BOB, vec![Tag::new("t", ["BITCOIN"])], "hello")));
    assert!(list.is_event_muted(&make_note(BOB, vec![], "Gm everyone")));
    assert!(!list.is_event_muted(&make_note(BOB, vec![Tag::new("t", ["nostr"])], "hello")));

    let mut note = make_note(BOB, vec![], "hello");
    note.id = NOTE.to_string();
    assert!(list.is_event_muted(&note));
  }

  #[test]
  fn test_mute_list_round_trip() {
    let list = make_sut();
    let event = list.to_event(BOB, 1700000000).unwrap();
    assert_eq!(event.kind, Kind::MuteList);
    assert_eq!(
      serde_json::to_string(&event.tags).unwrap(),
      format!(r#"[["p","{ALICE}"],["e","{NOTE}"],["t","bitcoin"],["word","gm"]]"#)
    );
    assert_eq!(MuteList::from_event(&event).unwrap(), list);

    let wrong = make_note(BOB, vec![], "");
    assert!(matches!(MuteList::from_event(&wrong), Err(Error::InvalidKind(1))));
  }

  #[test]
  fn test_pin_list() {
    let mut pins = PinList::new();
    assert!(pins.pin(NOTE, Some("wss://r.com")).unwrap());
    assert!(pins.pin(OTHER_NOTE, None).unwrap());
    assert!(!pins.pin(NOTE, None).unwrap());
    assert!(pins.pin("short", None).is_err());
    assert!(pins.is_pinned(OTHER_NOTE));

    let event = pins.to_event(ALICE, 1700000000).unwrap();
    assert_eq!(event.kind, Kind::PinList);
    assert_eq!(
      serde_json::to_string(&event.tags).unwrap(),
      format!(r#"[["e","{NOTE}","wss://r.com"],["e","{OTHER_NOTE}"]]"#)
    );
    assert_eq!(PinList::from_event(&event).unwrap(), pins);

    assert!(pins.unpin(NOTE));
    assert!(!pins.unpin(NOTE));
    assert_eq!(pins.pins()[0].event_id, OTHER_NOTE);
  }
}
