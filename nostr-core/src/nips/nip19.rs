//! NIP-19 shareable identifiers carrying TLV metadata: `nprofile`,
//! `nevent` and `naddr`. The bare `npub`/`nsec`/`note` forms live in
//! [`crate::encoding`].
//!
//! Each record is `type (1 byte) | length (1 byte) | value`. Unknown types
//! are skipped on decode.
use bech32::{FromBase32, ToBase32, Variant};

use crate::encoding::parse_hex32;
use crate::error::{Error, Result};
use crate::event::kind::Kind;

use super::nip01::Coordinate;

pub const NPROFILE_HRP: &str = "nprofile";
pub const NEVENT_HRP: &str = "nevent";
pub const NADDR_HRP: &str = "naddr";

const TLV_SPECIAL: u8 = 0;
const TLV_RELAY: u8 = 1;
const TLV_AUTHOR: u8 = 2;
const TLV_KIND: u8 = 3;

/// A pubkey plus relays where its events can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePointer {
  pub pubkey: String,
  pub relays: Vec<String>,
}

/// An event id with optional hints for fetching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPointer {
  pub id: String,
  pub relays: Vec<String>,
  pub author: Option<String>,
  pub kind: Option<Kind>,
}

/// An addressable event by coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPointer {
  pub coordinate: Coordinate,
  pub relays: Vec<String>,
}

impl ProfilePointer {
  pub fn to_bech32(&self) -> Result<String> {
    let mut tlv = Vec::new();
    push_tlv(&mut tlv, TLV_SPECIAL, &parse_hex32(&self.pubkey)?)?;
    push_relays(&mut tlv, &self.relays)?;
    encode_tlv(NPROFILE_HRP, &tlv)
  }

  pub fn from_bech32(value: &str) -> Result<Self> {
    let data = decode_tlv(NPROFILE_HRP, value)?;
    let mut pubkey = None;
    let mut relays = Vec::new();
    for (tlv_type, bytes) in read_tlv(&data)? {
      match tlv_type {
        TLV_SPECIAL => pubkey = Some(hex32(bytes, "pubkey")?),
        TLV_RELAY => relays.push(utf8(bytes)?),
        _ => {}
      }
    }
    Ok(Self {
      pubkey: pubkey.ok_or_else(|| missing(NPROFILE_HRP, "pubkey"))?,
      relays,
    })
  }
}

impl EventPointer {
  pub fn to_bech32(&self) -> Result<String> {
    let mut tlv = Vec::new();
    push_tlv(&mut tlv, TLV_SPECIAL, &parse_hex32(&self.id)?)?;
    push_relays(&mut tlv, &self.relays)?;
    if let Some(author) = &self.author {
      push_tlv(&mut tlv, TLV_AUTHOR, &parse_hex32(author)?)?;
    }
    if let Some(kind) = self.kind {
      push_tlv(&mut tlv, TLV_KIND, &kind.as_u32().to_be_bytes())?;
    }
    encode_tlv(NEVENT_HRP, &tlv)
  }

  pub fn from_bech32(value: &str) -> Result<Self> {
    let data = decode_tlv(NEVENT_HRP, value)?;
    let mut id = None;
    let mut pointer = Self {
      id: String::new(),
      relays: Vec::new(),
      author: None,
      kind: None,
    };
    for (tlv_type, bytes) in read_tlv(&data)? {
      match tlv_type {
        TLV_SPECIAL => id = Some(hex32(bytes, "id")?),
        TLV_RELAY => pointer.relays.push(utf8(bytes)?),
        TLV_AUTHOR => pointer.author = Some(hex32(bytes, "author")?),
        TLV_KIND => pointer.kind = Some(Kind::from(be_u32(bytes)?)),
        _ => {}
      }
    }
    pointer.id = id.ok_or_else(|| missing(NEVENT_HRP, "id"))?;
    Ok(pointer)
  }
}

impl AddressPointer {
  pub fn to_bech32(&self) -> Result<String> {
    let mut tlv = Vec::new();
    push_tlv(&mut tlv, TLV_SPECIAL, self.coordinate.identifier.as_bytes())?;
    push_relays(&mut tlv, &self.relays)?;
    push_tlv(&mut tlv, TLV_AUTHOR, &parse_hex32(&self.coordinate.pubkey)?)?;
    push_tlv(&mut tlv, TLV_KIND, &self.coordinate.kind.as_u32().to_be_bytes())?;
    encode_tlv(NADDR_HRP, &tlv)
  }

  /// Identifier, author and kind are all required.
  pub fn from_bech32(value: &str) -> Result<Self> {
    let data = decode_tlv(NADDR_HRP, value)?;
    let (mut identifier, mut author, mut kind) = (None, None, None);
    let mut relays = Vec::new();
    for (tlv_type, bytes) in read_tlv(&data)? {
      match tlv_type {
        TLV_SPECIAL => identifier = Some(utf8(bytes)?),
        TLV_RELAY => relays.push(utf8(bytes)?),
        TLV_AUTHOR => author = Some(hex32(bytes, "author")?),
        TLV_KIND => kind = Some(be_u32(bytes)?),
        _ => {}
      }
    }
    let coordinate = Coordinate::new(
      Kind::from(kind.ok_or_else(|| missing(NADDR_HRP, "kind"))?),
      author.ok_or_else(|| missing(NADDR_HRP, "author"))?,
      identifier.ok_or_else(|| missing(NADDR_HRP, "identifier"))?,
    )?;
    Ok(Self { coordinate, relays })
  }
}

fn push_tlv(buf: &mut Vec<u8>, tlv_type: u8, value: &[u8]) -> Result<()> {
  let len = u8::try_from(value.len())
    .map_err(|_| Error::Malformed(format!("tlv value of {} bytes", value.len())))?;
  buf.push(tlv_type);
  buf.push(len);
  buf.extend_from_slice(value);
  Ok(())
}

fn push_relays(buf: &mut Vec<u8>, relays: &[String]) -> Result<()> {
  relays
    .iter()
    .try_for_each(|relay| push_tlv(buf, TLV_RELAY, relay.as_bytes()))
}

/// Splits `data` into `(type, value)` records. A record running past the
/// end is an error.
fn read_tlv(data: &[u8]) -> Result<Vec<(u8, &[u8])>> {
  let mut records = Vec::new();
  let mut rest = data;
  while let [tlv_type, len, tail @ ..] = rest {
    let len = *len as usize;
    if tail.len() < len {
      return Err(Error::Malformed(format!(
        "tlv type {tlv_type} wants {len} bytes, {} left",
        tail.len()
      )));
    }
    records.push((*tlv_type, &tail[..len]));
    rest = &tail[len..];
  }
  if !rest.is_empty() {
    return Err(Error::Malformed("truncated tlv header".to_string()));
  }
  Ok(records)
}

fn encode_tlv(hrp: &str, tlv: &[u8]) -> Result<String> {
  bech32::encode(hrp, tlv.to_base32(), Variant::Bech32)
    .map_err(|e| Error::Malformed(format!("bech32: {e}")))
}

fn decode_tlv(expected_hrp: &str, value: &str) -> Result<Vec<u8>> {
  let (hrp, data, _) =
    bech32::decode(value).map_err(|e| Error::Malformed(format!("bech32: {e}")))?;
  if hrp != expected_hrp {
    return Err(Error::Malformed(format!(
      "expected {expected_hrp} prefix, got {hrp}"
    )));
  }
  Vec::<u8>::from_base32(&data).map_err(|e| Error::Malformed(format!("bech32: {e}")))
}

fn hex32(bytes: &[u8], field: &str) -> Result<String> {
  if bytes.len() != 32 {
    return Err(Error::Malformed(format!(
      "{field} must be 32 bytes, got {}",
      bytes.len()
    )));
  }
  Ok(hex::encode(bytes))
}

fn be_u32(bytes: &[u8]) -> Result<u32> {
  let bytes: [u8; 4] = bytes
    .try_into()
    .map_err(|_| Error::Malformed(format!("kind must be 4 bytes, got {}", bytes.len())))?;
  Ok(u32::from_be_bytes(bytes))
}

fn utf8(bytes: &[u8]) -> Result<String> {
  String::from_utf8(bytes.to_vec()).map_err(|e| Error::Malformed(format!("tlv string: {e}")))
}

fn missing(hrp: &str, field: &str) -> Error {
  Error::Malformed(format!("{hrp} without {field}"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  const PUBKEY: &str = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
  const EVENT_ID: &str = "b9f5441e45ca39179320e0031cfb18e34078673dcc3d3e3a3b3a981760aa5696";

  fn make_sut() -> ProfilePointer {
    ProfilePointer {
      pubkey: PUBKEY.to_string(),
      relays: vec![
        "wss://r.x.com".to_string(),
        "wss://djbas.sadkb.com".to_string(),
      ],
    }
  }

  #[test]
  fn test_nprofile_layout() {
    let nprofile = make_sut().to_bech32().unwrap();
    assert!(nprofile.starts_with("nprofile1"));

    let data = decode_tlv(NPROFILE_HRP, &nprofile).unwrap();
    assert_eq!(&data[..2], &[TLV_SPECIAL, 32]);
    assert_eq!(hex::encode(&data[2..34]), PUBKEY);
    assert_eq!(&data[34..36], &[TLV_RELAY, 13]);
    assert_eq!(&data[36..49], b"wss://r.x.com");

    assert_eq!(ProfilePointer::from_bech32(&nprofile).unwrap(), make_sut());
  }

  #[test]
  fn test_nevent_carries_optional_hints() {
    let pointer = EventPointer {
      id: EVENT_ID.to_string(),
      relays: vec!["wss://relay.example.com".to_string()],
      author: Some(PUBKEY.to_string()),
      kind: Some(Kind::TextNote),
    };
    let encoded = pointer.to_bech32().unwrap();
    assert!(encoded.starts_with("nevent1"));
    assert_eq!(EventPointer::from_bech32(&encoded).unwrap(), pointer);

    let bare = EventPointer {
      id: EVENT_ID.to_string(),
      relays: Vec::new(),
      author: None,
      kind: None,
    };
    assert_eq!(EventPointer::from_bech32(&bare.to_bech32().unwrap()).unwrap(), bare);
  }

  #[test]
  fn test_naddr_reuses_coordinate() {
    let coordinate = Coordinate::new(Kind::from(30023), PUBKEY, "my-article").unwrap();
    let pointer = AddressPointer {
      coordinate: coordinate.clone(),
      relays: vec!["wss://relay.example.com".to_string()],
    };
    let decoded = AddressPointer::from_bech32(&pointer.to_bech32().unwrap()).unwrap();
    assert_eq!(decoded.coordinate.to_string(), coordinate.to_string());
    assert_eq!(decoded, pointer);
  }

  #[test]
  fn test_rejects_wrong_prefix_and_bad_records() {
    let nprofile = make_sut().to_bech32().unwrap();
    assert!(matches!(EventPointer::from_bech32(&nprofile), Err(Error::Malformed(_))));
    assert!(matches!(ProfilePointer::from_bech32("nprofile1xyz"), Err(Error::Malformed(_))));

    // Relay record claims 5 bytes but only 2 follow.
    let truncated = encode_tlv(NPROFILE_HRP, &[TLV_RELAY, 5, b'w', b's']).unwrap();
    assert!(matches!(ProfilePointer::from_bech32(&truncated), Err(Error::Malformed(_))));

    let short_key = encode_tlv(NPROFILE_HRP, &[TLV_SPECIAL, 2, 0xab, 0xcd]).unwrap();
    assert!(matches!(ProfilePointer::from_bech32(&short_key), Err(Error::Malformed(_))));

    let relay_only = encode_tlv(NPROFILE_HRP, &[TLV_RELAY, 1, b'x']).unwrap();
    assert!(matches!(ProfilePointer::from_bech32(&relay_only), Err(Error::Malformed(_))));
  }

  #[test]
  fn test_unknown_records_are_skipped() {
    let mut tlv = Vec::new();
    push_tlv(&mut tlv, 9, b"future").unwrap();
    push_tlv(&mut tlv, TLV_SPECIAL, &parse_hex32(EVENT_ID).unwrap()).unwrap();
    let encoded = encode_tlv(NEVENT_HRP, &tlv).unwrap();
    assert_eq!(EventPointer::from_bech32(&encoded).unwrap().id, EVENT_ID);
  }

  #[test]
  fn test_oversized_value_is_refused() {
    let mut pointer = make_sut();
    pointer.relays.push(format!("wss://{}.com", "a".repeat(300)));
    assert!(matches!(pointer.to_bech32(), Err(Error::Malformed(_))));
  }
}
