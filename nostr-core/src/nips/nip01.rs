//! Typed `e`, `p` and `a` tag builders, `a` tag coordinates and the
//! `alt` accessor.
use std::fmt;
use std::str::FromStr;

use crate::encoding::is_hex_of_len;
use crate::error::{Error, Result};
use crate::event::{
  kind::{Kind, MAX_COORDINATE_KIND},
  tag::{Tag, Tags},
  Event,
};

fn check_hex32(what: &str, value: &str) -> Result<()> {
  if !is_hex_of_len(value, 64) {
    return Err(Error::InvalidHex(format!("{what} {value:?}")));
  }
  Ok(())
}

fn check_coordinate_kind(kind: u32) -> Result<()> {
  if kind >= MAX_COORDINATE_KIND {
    return Err(Error::InvalidKind(kind as u64));
  }
  Ok(())
}

/// `["e", <id>, <relay>, <author>]`. The relay slot is kept (empty) when
/// an author follows it.
pub fn e_tag(event_id: &str, relay: Option<&str>, author: Option<&str>) -> Result<Tag> {
  check_hex32("event id", event_id)?;
  let mut tag = Tag::new("e", [event_id]);
  match (relay, author) {
    (relay, Some(author)) => {
      check_hex32("author pubkey", author)?;
      tag.push(relay.unwrap_or("")).push(author);
    }
    (Some(relay), None) => {
      tag.push(relay);
    }
    (None, None) => {}
  }
  Ok(tag)
}

/// `["p", <pubkey>, <relay>]`
pub fn p_tag(pubkey: &str, relay: Option<&str>) -> Result<Tag> {
  check_hex32("pubkey", pubkey)?;
  let mut tag = Tag::new("p", [pubkey]);
  if let Some(relay) = relay {
    tag.push(relay);
  }
  Ok(tag)
}

/// `["a", "<kind>:<pubkey>:<d>", <relay>]`
pub fn a_tag(kind: u32, pubkey: &str, identifier: Option<&str>, relay: Option<&str>) -> Result<Tag> {
  let coordinate = Coordinate::new(Kind::from(kind), pubkey, identifier.unwrap_or(""))?;
  Ok(coordinate.to_tag(relay))
}

pub fn append_e_tag(
  tags: &mut Tags,
  event_id: &str,
  relay: Option<&str>,
  author: Option<&str>,
) -> Result<()> {
  tags.push(e_tag(event_id, relay, author)?);
  Ok(())
}

pub fn append_p_tag(tags: &mut Tags, pubkey: &str, relay: Option<&str>) -> Result<()> {
  tags.push(p_tag(pubkey, relay)?);
  Ok(())
}

pub fn append_a_tag(
  tags: &mut Tags,
  kind: u32,
  pubkey: &str,
  identifier: Option<&str>,
  relay: Option<&str>,
) -> Result<()> {
  tags.push(a_tag(kind, pubkey, identifier, relay)?);
  Ok(())
}

/// First value of the first `alt` tag.
pub fn get_alt(event: &Event) -> Result<&str> {
  event
    .tags
    .first_value("alt")
    .ok_or_else(|| Error::MissingTag("alt".to_string()))
}

/// Pointer to an addressable (or replaceable) event: `kind:pubkey:d`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
  pub kind: Kind,
  pub pubkey: String,
  pub identifier: String,
}

impl Coordinate {
  pub fn new<P, I>(kind: Kind, pubkey: P, identifier: I) -> Result<Self>
  where
    P: Into<String>,
    I: Into<String>,
  {
    let pubkey = pubkey.into();
    check_coordinate_kind(kind.as_u32())?;
    check_hex32("pubkey", &pubkey)?;
    Ok(Self {
      kind,
      pubkey,
      identifier: identifier.into(),
    })
  }

  /// Coordinate of an already built event.
  pub fn from_event(event: &Event) -> Result<Self> {
    Self::new(event.kind, event.pubkey.as_str(), event.identifier())
  }

  /// The identifier is everything after the second `:`, and may be empty
  /// or missing.
  pub fn parse(value: &str) -> Result<Self> {
    let mut parts = value.splitn(3, ':');
    let (Some(kind), Some(pubkey)) = (parts.next(), parts.next()) else {
      return Err(Error::Malformed(format!("coordinate {value:?}")));
    };
    let kind: u32 = kind
      .parse()
      .map_err(|_| Error::Malformed(format!("coordinate kind {kind:?}")))?;
    Self::new(Kind::from(kind), pubkey, parts.next().unwrap_or(""))
  }

  pub fn to_tag(&self, relay: Option<&str>) -> Tag {
    let mut tag = Tag::new("a", [self.to_string()]);
    if let Some(relay) = relay {
      tag.push(relay);
    }
    tag
  }
}

impl fmt::Display for Coordinate {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}:{}:{}", self.kind.as_u32(), self.pubkey, self.identifier)
  }
}

impl FromStr for Coordinate {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::parse(s)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::event::Timestamp;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  const ID: &str = "00960bd35499f8c63a4f65e79d6b1a2b7f1b8c97e76652325567b78c496350ae";
  const PUBKEY: &str = "614a695bab54e8dc98946abdb8ec019599ece6dada0c23890977d0fa128081d6";

  fn make_sut(tags: Tags) -> Event {
    let created_at: Timestamp = 1700000000;
    Event::new_without_signature(PUBKEY, created_at, Kind::TextNote, tags, "").unwrap()
  }

  #[test]
  fn test_e_tag_keeps_empty_relay_slot_before_author() {
    assert_eq!(e_tag(ID, None, None).unwrap().as_vec(), &["e", ID]);
    assert_eq!(
      e_tag(ID, Some("wss://r.com"), None).unwrap().as_vec(),
      &["e", ID, "wss://r.com"]
    );
    assert_eq!(
      e_tag(ID, None, Some(PUBKEY)).unwrap().as_vec(),
      &["e", ID, "", PUBKEY]
    );
    assert!(matches!(e_tag("abc", None, None), Err(Error::InvalidHex(_))));
    assert!(matches!(
      e_tag(ID, None, Some("xyz")),
      Err(Error::InvalidHex(_))
    ));
  }

  #[test]
  fn test_p_tag() {
    assert_eq!(
      p_tag(PUBKEY, Some("wss://r.com")).unwrap().as_vec(),
      &["p", PUBKEY, "wss://r.com"]
    );
    assert!(p_tag(&PUBKEY[1..], None).is_err());
  }

  #[test]
  fn test_a_tag_and_kind_range() {
    let tag = a_tag(30023, PUBKEY, Some("article"), None).unwrap();
    assert_eq!(tag.content().unwrap(), format!("30023:{PUBKEY}:article"));

    let tag = a_tag(10002, PUBKEY, None, Some("wss://r.com")).unwrap();
    assert_eq!(tag.as_vec(), &["a".to_string(), format!("10002:{PUBKEY}:"), "wss://r.com".to_string()]);

    assert!(matches!(
      a_tag(MAX_COORDINATE_KIND, PUBKEY, None, None),
      Err(Error::InvalidKind(_))
    ));
  }

  #[test]
  fn test_append_builders() {
    let mut tags = Tags::new();
    append_e_tag(&mut tags, ID, None, None).unwrap();
    append_p_tag(&mut tags, PUBKEY, None).unwrap();
    append_a_tag(&mut tags, 30000, PUBKEY, Some("x"), None).unwrap();
    assert!(append_p_tag(&mut tags, "nope", None).is_err());
    assert_eq!(tags.len(), 3);
    assert_eq!(tags.get(2).unwrap().name(), "a");
  }

  #[test]
  fn test_coordinate_parse_and_display() {
    let raw = format!("30023:{PUBKEY}:with:colons");
    let coordinate: Coordinate = raw.parse().unwrap();
    assert_eq!(coordinate.kind, Kind::Custom(30023));
    assert_eq!(coordinate.identifier, "with:colons");
    assert_eq!(coordinate.to_string(), raw);

    let coordinate = Coordinate::parse(&format!("10002:{PUBKEY}")).unwrap();
    assert_eq!(coordinate.identifier, "");
    assert!(Coordinate::parse("x:y:z").is_err());
    assert!(Coordinate::parse("30023").is_err());
  }

  #[test]
  fn test_get_alt() {
    let event = make_sut(Tags::from(vec![Tag::new("alt", ["a short note"])]));
    assert_eq!(get_alt(&event).unwrap(), "a short note");

    let event = make_sut(Tags::new());
    assert!(matches!(get_alt(&event), Err(Error::MissingTag(name)) if name == "alt"));
  }
}
