use bitcoin_hashes::{sha256, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::encoding::parse_hex32;
use crate::error::Result;

use super::{kind::Kind, tag::Tags, Timestamp};

///
/// The canonical form signed by every event:
/// `[0,<pubkey>,<created_at>,<kind>,<tags>,<content>]` with no whitespace.
///
/// `serde_json` already escapes exactly what NIP-01 asks for (`"`, `\` and
/// the C0 controls) and leaves `/` and non-ASCII untouched.
///
/// <https://github.com/nostr-protocol/nips/blob/master/01.md>
///
pub fn canonical_json(
  pubkey: &str,
  created_at: Timestamp,
  kind: Kind,
  tags: &Tags,
  content: &str,
) -> Result<String> {
  Ok(serde_json::to_string(&(0, pubkey, created_at, kind, tags, content))?)
}

/// 32-bytes lowercase hex-encoded sha256 of the canonical serialization.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct EventId(pub String);

impl EventId {
  pub fn new(
    pubkey: &str,
    created_at: Timestamp,
    kind: Kind,
    tags: &Tags,
    content: &str,
  ) -> Result<Self> {
    let data = canonical_json(pubkey, created_at, kind, tags, content)?;
    Ok(Self::from_canonical(&data))
  }

  pub fn from_canonical(data: &str) -> Self {
    let hash = sha256::Hash::hash(data.as_bytes());
    Self(hash.to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Raw bytes, the message BIP-340 signatures are made over.
  pub fn to_bytes(&self) -> Result<[u8; 32]> {
    parse_hex32(&self.0)
  }
}

impl fmt::Display for EventId {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}
