//! NIP-02 follow list (kind 3).
use log::debug;

use crate::encoding::{is_hex_of_len, short};
use crate::error::{Error, Result};
use crate::event::{kind::Kind, tag::Tag, tag::Tags, Event, PubKey, Timestamp};

/// `["p", <pubkey>, <relay>, <petname>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
  pub pubkey: PubKey,
  pub relay: Option<String>,
  pub petname: Option<String>,
}

impl Contact {
  pub fn new<S: Into<String>>(pubkey: S) -> Self {
    Self {
      pubkey: pubkey.into(),
      relay: None,
      petname: None,
    }
  }

  pub fn with_relay<S: Into<String>>(mut self, relay: S) -> Self {
    self.relay = Some(relay.into());
    self
  }

  pub fn with_petname<S: Into<String>>(mut self, petname: S) -> Self {
    self.petname = Some(petname.into());
    self
  }

  fn to_tag(&self) -> Tag {
    let mut tag = Tag::new("p", [self.pubkey.as_str()]);
    match (&self.relay, &self.petname) {
      (relay, Some(petname)) => {
        tag.push(relay.as_deref().unwrap_or("")).push(petname.as_str());
      }
      (Some(relay), None) => {
        tag.push(relay.as_str());
      }
      (None, None) => {}
    }
    tag
  }
}

fn non_empty(value: Option<&str>) -> Option<String> {
  value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Follows in the order they were added. One entry per pubkey.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactList {
  contacts: Vec<Contact>,
}

impl ContactList {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds `contact`, replacing the entry with the same pubkey in place.
  pub fn add(&mut self, contact: Contact) -> Result<&mut Self> {
    if !is_hex_of_len(&contact.pubkey, 64) {
      return Err(Error::InvalidHex(format!("contact {:?}", contact.pubkey)));
    }
    match self.contacts.iter_mut().find(|c| c.pubkey == contact.pubkey) {
      Some(existing) => *existing = contact,
      None => self.contacts.push(contact),
    }
    Ok(self)
  }

  pub fn remove(&mut self, pubkey: &str) -> bool {
    let before = self.contacts.len();
    self.contacts.retain(|c| c.pubkey != pubkey);
    self.contacts.len() != before
  }

  pub fn contains(&self, pubkey: &str) -> bool {
    self.get(pubkey).is_some()
  }

  pub fn get(&self, pubkey: &str) -> Option<&Contact> {
    self.contacts.iter().find(|c| c.pubkey == pubkey)
  }

  pub fn contacts(&self) -> &[Contact] {
    &self.contacts
  }

  pub fn len(&self) -> usize {
    self.contacts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.contacts.is_empty()
  }

  pub fn to_tags(&self) -> Tags {
    self.contacts.iter().map(Contact::to_tag).collect()
  }

  /// Kind, tags and content of the follow list event.
  pub fn to_event_parts(&self) -> (Kind, Tags, String) {
    (Kind::ContactList, self.to_tags(), String::new())
  }

  pub fn to_event(&self, pubkey: &str, created_at: Timestamp) -> Result<Event> {
    let (kind, tags, content) = self.to_event_parts();
    Event::new_without_signature(pubkey, created_at, kind, tags, content)
  }

  /// `p` tags with an invalid pubkey are skipped.
  pub fn from_event(event: &Event) -> Result<Self> {
    if event.kind != Kind::ContactList {
      return Err(Error::InvalidKind(event.kind.as_u32() as u64));
    }

    let mut list = Self::new();
    for tag in event.tags.filter("p") {
      let Some(pubkey) = tag.content() else { continue };
      let contact = Contact {
        pubkey: pubkey.to_string(),
        relay: non_empty(tag.get(2)),
        petname: non_empty(tag.get(3)),
      };
      if list.add(contact).is_err() {
        debug!(
          "[ContactList::from_event] skipping invalid contact {} in {}",
          short(pubkey),
          short(&event.id)
        );
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
  const CAROL: &str = "3333333333333333333333333333333333333333333333333333333333333333";

  fn make_sut() -> ContactList {
    let mut list = ContactList::new();
    list.add(Contact::new(ALICE)).unwrap();
    list
      .add(Contact::new(BOB).with_relay("wss://bob.com"))
      .unwrap();
    list.add(Contact::new(CAROL).with_petname("carol")).unwrap();
    list
  }

  #[test]
  fn test_tags_keep_relay_slot_before_petname() {
    let tags = make_sut().to_tags();
    assert_eq!(
      serde_json::to_string(&tags).unwrap(),
      format!(r#"[["p","{ALICE}"],["p","{BOB}","wss://bob.com"],["p","{CAROL}","","carol"]]"#)
    );
  }

  #[test]
  fn test_round_trip_through_event() {
    let list = make_sut();
    let event = list.to_event(ALICE, 1700000000).unwrap();
    assert_eq!(event.kind, Kind::ContactList);
    assert_eq!(ContactList::from_event(&event).unwrap(), list);
  }

  #[test]
  fn test_add_replaces_and_remove() {
    let mut list = make_sut();
    list.add(Contact::new(ALICE).with_petname("al")).unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list.contacts()[0].petname.as_deref(), Some("al"));

    assert!(list.remove(BOB));
    assert!(!list.contains(BOB));
    assert!(!list.remove(BOB));
    assert!(matches!(list.add(Contact::new("bob")), Err(Error::InvalidHex(_))));
  }

  #[test]
  fn test_from_event_skips_invalid_and_checks_kind() {
    let tags = Tags::from(vec![
      Tag::new("p", ["not-a-key"]),
      Tag::new("p", [ALICE, "", ""]),
      Tag::new("t", ["nostr"]),
    ]);
    let event = Event::new_without_signature(BOB, 0, Kind::ContactList, tags.clone(), "").unwrap();
    let list = ContactList::from_event(&event).unwrap();
    assert_eq!(list.contacts(), &[Contact::new(ALICE)]);

    let event = Event::new_without_signature(BOB, 0, Kind::TextNote, tags, "").unwrap();
    assert!(matches!(ContactList::from_event(&event), Err(Error::InvalidKind(1))));
  }
}
