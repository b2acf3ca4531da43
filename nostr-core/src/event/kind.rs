use serde::de::{Deserialize, Deserializer, Error, Visitor};
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::ParseIntError;
use std::str::FromStr;

/// Largest kind an `a` tag coordinate may carry (exclusive).
pub const MAX_COORDINATE_KIND: u32 = 1 << 31;

/// Storage class of an event kind as relays treat it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindClass {
  /// Persisted by relays.
  Regular,
  /// Newest per `(pubkey, kind)` retained.
  Replaceable,
  /// Never persisted.
  Ephemeral,
  /// Newest per `(pubkey, kind, d-tag)` retained.
  Addressable,
}

/// Defines the type of the event.
/// Different types will change the meaning of different keys
/// of event object.
/// `TextNote` is the default.
///
/// Equality and hashing go through the numeric value, so
/// `Kind::Custom(10002) == Kind::RelayList`.
#[derive(Debug, Default, Copy, Clone)]
pub enum Kind {
  /// The content is set to a stringified JSON object describing the user.
  Metadata,
  /// The content is set to the plaintext content of a note.
  #[default]
  TextNote,
  /// The content is set to the URL of a relay the author recommends.
  RecommendRelay,
  /// NIP-02 follow list.
  ContactList,
  /// NIP-59 seal, the signed middle layer of a gift wrap.
  Seal,
  /// NIP-17 private direct message (a rumor kind).
  PrivateDirectMessage,
  /// NIP-59 gift wrap.
  GiftWrap,
  /// NIP-57 zap request.
  ZapRequest,
  /// NIP-57 zap receipt.
  ZapReceipt,
  /// NIP-51 mute list.
  MuteList,
  /// NIP-51 pinned notes.
  PinList,
  /// NIP-65 relay list metadata.
  RelayList,
  /// NIP-17 relays preferred for private messages.
  DmRelayList,
  /// Any kind without a dedicated variant.
  Custom(u32),
}

impl Kind {
  pub fn as_u32(&self) -> u32 {
    (*self).into()
  }

  /// Classification follows the NIP-01 ranges and resolves overlaps in
  /// the order addressable, ephemeral, replaceable, regular.
  ///
  /// Boundaries: `1000..10000` is regular, so 9999 is regular and 10000
  /// is the first replaceable kind of the range; 0 and 3 are replaceable;
  /// 20000 and 30000 open the ephemeral and addressable ranges; 40000 and
  /// above are regular again.
  pub fn class(&self) -> KindClass {
    let kind = self.as_u32();
    if (30000..40000).contains(&kind) {
      KindClass::Addressable
    } else if (20000..30000).contains(&kind) {
      KindClass::Ephemeral
    } else if (10000..20000).contains(&kind) || kind == 0 || kind == 3 {
      KindClass::Replaceable
    } else {
      KindClass::Regular
    }
  }

  pub fn is_regular(&self) -> bool {
    self.class() == KindClass::Regular
  }

  pub fn is_replaceable(&self) -> bool {
    self.class() == KindClass::Replaceable
  }

  pub fn is_ephemeral(&self) -> bool {
    self.class() == KindClass::Ephemeral
  }

  pub fn is_addressable(&self) -> bool {
    self.class() == KindClass::Addressable
  }
}

impl PartialEq for Kind {
  fn eq(&self, other: &Self) -> bool {
    self.as_u32() == other.as_u32()
  }
}

impl Eq for Kind {}

impl Hash for Kind {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.as_u32().hash(state);
  }
}

impl FromStr for Kind {
  type Err = ParseIntError;
  fn from_str(kind: &str) -> Result<Self, Self::Err> {
    let kind: u32 = kind.parse()?;
    Ok(Self::from(kind))
  }
}

impl From<u32> for Kind {
  fn from(u: u32) -> Self {
    match u {
      0 => Self::Metadata,
      1 => Self::TextNote,
      2 => Self::RecommendRelay,
      3 => Self::ContactList,
      13 => Self::Seal,
      14 => Self::PrivateDirectMessage,
      1059 => Self::GiftWrap,
      9734 => Self::ZapRequest,
      9735 => Self::ZapReceipt,
      10000 => Self::MuteList,
      10001 => Self::PinList,
      10002 => Self::RelayList,
      10050 => Self::DmRelayList,
      x => Self::Custom(x),
    }
  }
}

impl From<Kind> for u32 {
  fn from(e: Kind) -> u32 {
    match e {
      Kind::Metadata => 0,
      Kind::TextNote => 1,
      Kind::RecommendRelay => 2,
      Kind::ContactList => 3,
      Kind::Seal => 13,
      Kind::PrivateDirectMessage => 14,
      Kind::GiftWrap => 1059,
      Kind::ZapRequest => 9734,
      Kind::ZapReceipt => 9735,
      Kind::MuteList => 10000,
      Kind::PinList => 10001,
      Kind::RelayList => 10002,
      Kind::DmRelayList => 10050,
      Kind::Custom(u) => u,
    }
  }
}

impl Serialize for Kind {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_u32(self.as_u32())
  }
}

struct KindVisitor;

impl Visitor<'_> for KindVisitor {
  type Value = Kind;

  fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "an unsigned number of maximum length of 32 bits")
  }

  fn visit_u64<E>(self, v: u64) -> Result<Kind, E>
  where
    E: Error,
  {
    u32::try_from(v)
      .map(Kind::from)
      .map_err(|_| E::custom(format!("kind {v} does not fit in 32 bits")))
  }

  fn visit_i64<E>(self, v: i64) -> Result<Kind, E>
  where
    E: Error,
  {
    u64::try_from(v)
      .map_err(|_| E::custom(format!("kind {v} is negative")))
      .and_then(|v| self.visit_u64(v))
  }
}

impl<'de> Deserialize<'de> for Kind {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    deserializer.deserialize_u64(KindVisitor)
  }
}

impl fmt::Display for Kind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.as_u32())
  }
}
