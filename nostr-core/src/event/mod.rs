use std::time::{SystemTime, UNIX_EPOCH};

use secp256k1::Secp256k1;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// Event Modules
pub mod id;
pub mod kind;
pub mod marker;
pub mod tag;

use self::id::EventId;
use self::kind::{Kind, KindClass};
use self::tag::Tags;
use crate::encoding::{is_hex_of_len, parse_hex32};
use crate::error::{Error, Result};
use crate::schnorr::{verify_schnorr, Keys};

pub type PubKey = String;
/// Signed Unix seconds.
pub type Timestamp = i64;

/// Current wall-clock time in Unix seconds.
pub fn now() -> Timestamp {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs() as Timestamp)
    .unwrap_or_default()
}

///
/// Event is the only object that exists in the Nostr protocol.
///
/// Example (id's and other hashes are not valid for the information presented):
///   ```json
///   {
///     "id": "ca978112ca1bbdcafac231b39a23dc4da786eff8147c4e72b9807785afee48bb",
///     "pubkey": "02c7e1b1e9c175ab2d100baf1d5a66e73ecc044e9f8093d0c965741f26aa3abf76",
///     "created_at": 1673002822,
///     "kind": 1,
///     "tags": [
///       ["e", "688787d8ff144c502c7f5cffaafe2cc588d86079f9de88304c26b0cb99ce91c6", "wss://relay.damus.io", "root"],
///       ["p", "02c7e1b1e9c175ab2d100baf1d5a66e73ecc044e9f8093d0c965741f26aa3abf76", ""],
///     ],
///     "content": "Lorem ipsum dolor sit amet",
///     "sig": "e8551d85f530113366e8da481354c2756605e3f58149cedc1fb9385d35251712b954af8ef891cb0467d50ddc6685063d4190c97e9e131f903e6e4176dc13ce7c"
///   }
///   ```
///
/// An event without `sig` is a rumor (NIP-59). Unknown fields are kept in
/// `extra` and never take part in the id.
///
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Event {
  /// 32-bytes SHA256 of the serialized event data
  pub id: String,
  /// 32-bytes hex-encoded public key of the event creator
  pub pubkey: PubKey,
  /// Unix timestamp in seconds
  pub created_at: Timestamp,
  /// Kind of event
  pub kind: Kind,
  /// An array of arrays with more info about the event,
  /// like, for example, if it is replying to someone.
  /// The kind of event will change its tags and contents.
  pub tags: Tags,
  /// Arbitrary string. Meaning depends on the kind of the event.
  pub content: String,
  /// 64-bytes hex signature of the id field
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sig: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Event {
  /// Builds an unsigned event and derives its id.
  pub fn new_without_signature<P, C>(
    pubkey: P,
    created_at: Timestamp,
    kind: Kind,
    tags: Tags,
    content: C,
  ) -> Result<Self>
  where
    P: Into<String>,
    C: Into<String>,
  {
    let pubkey: String = pubkey.into();
    if !is_hex_of_len(&pubkey, 64) {
      return Err(Error::InvalidHex(format!("pubkey {pubkey:?}")));
    }
    let mut event = Self {
      pubkey,
      created_at,
      kind,
      tags,
      content: content.into(),
      ..Default::default()
    };
    event.update_id()?;
    Ok(event)
  }

  pub fn canonical_json(&self) -> Result<String> {
    id::canonical_json(&self.pubkey, self.created_at, self.kind, &self.tags, &self.content)
  }

  pub fn compute_id(&self) -> Result<EventId> {
    Ok(EventId::from_canonical(&self.canonical_json()?))
  }

  /// Re-derives `id` from the signed fields. Any previous signature no
  /// longer matches and is dropped.
  pub fn update_id(&mut self) -> Result<()> {
    self.id = self.compute_id()?.0;
    self.sig = None;
    Ok(())
  }

  /// Sets `pubkey` to the signer's key, re-derives `id` and signs it.
  pub fn sign(&mut self, keys: &Keys) -> Result<()> {
    self.pubkey = keys.public_key_hex();
    self.update_id()?;
    let msg = parse_hex32(&self.id)?;
    self.sig = Some(keys.sign_schnorr(&msg)?);
    Ok(())
  }

  pub fn verify_id(&self) -> Result<()> {
    if !is_hex_of_len(&self.pubkey, 64) {
      return Err(Error::InvalidHex(format!("pubkey {:?}", self.pubkey)));
    }
    let computed = self.compute_id()?;
    if computed.0 != self.id {
      return Err(Error::IdMismatch {
        stored: self.id.clone(),
        computed: computed.0,
      });
    }
    Ok(())
  }

  pub fn verify_signature(&self) -> Result<()> {
    let sig = self
      .sig
      .as_deref()
      .ok_or_else(|| Error::Malformed("event has no signature".to_string()))?;
    let msg = parse_hex32(&self.id)?;
    let secp = Secp256k1::verification_only();
    verify_schnorr(&secp, &msg, sig, &self.pubkey)
  }

  /// Id first, then signature.
  pub fn verify(&self) -> Result<()> {
    self.verify_id()?;
    self.verify_signature()
  }

  pub fn is_rumor(&self) -> bool {
    self.sig.is_none()
  }

  /// Value of the first `d` tag, empty when absent.
  pub fn identifier(&self) -> &str {
    self.tags.first_value("d").unwrap_or("")
  }

  /// Key under which relays keep only the newest event:
  /// `(pubkey, kind)` for replaceable kinds, `(pubkey, kind, d)` for
  /// addressable ones. `None` for regular and ephemeral events.
  pub fn replaceable_key(&self) -> Option<(PubKey, Kind, Option<String>)> {
    match self.kind.class() {
      KindClass::Replaceable => Some((self.pubkey.clone(), self.kind, None)),
      KindClass::Addressable => Some((
        self.pubkey.clone(),
        self.kind,
        Some(self.identifier().to_string()),
      )),
      KindClass::Regular | KindClass::Ephemeral => None,
    }
  }

  /// Newer `created_at` wins, ties go to the lexically lower id.
  pub fn newer_than(&self, other: &Event) -> bool {
    self.created_at > other.created_at
      || (self.created_at == other.created_at && self.id < other.id)
  }

  /// Deserializes from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self> {
    serde_json::from_value(msg).map_err(|err| Error::Malformed(err.to_string()))
  }

  /// Serialize as [`Value`]
  pub fn as_value(&self) -> Value {
    json!(self)
  }

  /// Deserialize [`Event`] from JSON string
  pub fn from_json<S>(msg: S) -> Result<Self>
  where
    S: AsRef<str>,
  {
    let msg = msg.as_ref();

    if msg.is_empty() {
      return Err(Error::Malformed("empty event".to_string()));
    }

    let value: Value =
      serde_json::from_str(msg).map_err(|err| Error::Malformed(err.to_string()))?;
    Self::from_value(value)
  }

  /// Get [`Event`] in JSON string
  pub fn as_json(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }
}

#[cfg(test)]
mod tests {
  use super::{tag::Tag, *};

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  fn make_signed_sut() -> Event {
    Event::from_value(json!({
      "content": "potato",
      "created_at": 1684589418,
      "id": "00960bd35499f8c63a4f65e79d6b1a2b7f1b8c97e76652325567b78c496350ae",
      "kind": 1,
      "pubkey": "614a695bab54e8dc98946abdb8ec019599ece6dada0c23890977d0fa128081d6",
      "sig": "bf073c935f71de50ec72bdb79f75b0bf32f9049305c3b22f97c06422c6f2edc86e0d7e07d7d7222678b238b1daee071be5f6fa653c611971395ec0d1c6407caf",
      "tags": []
    }))
    .unwrap()
  }

  fn make_keys() -> Keys {
    Keys::from_secret_hex("3b940b5586823dfd02ae3b461bb4336b5ecbaefd6627aa922efc048fec0c881c")
      .unwrap()
  }

  #[test]
  fn test_known_event_verifies() {
    let event = make_signed_sut();
    assert!(event.verify_id().is_ok());
    assert!(event.verify_signature().is_ok());
    assert!(!event.is_rumor());
  }

  #[test]
  fn test_tampered_content_is_id_mismatch() {
    let mut event = make_signed_sut();
    event.content = "tomato".to_string();
    assert!(matches!(event.verify(), Err(Error::IdMismatch { .. })));
  }

  #[test]
  fn test_foreign_signature_is_bad_signature() {
    let mut event = make_signed_sut();
    let mut other = event.clone();
    other.sign(&make_keys()).unwrap();
    event.sig = other.sig;
    assert!(event.verify_id().is_ok());
    assert!(matches!(event.verify_signature(), Err(Error::BadSignature)));
  }

  #[test]
  fn test_malformed_signature_is_invalid_hex() {
    let mut event = make_signed_sut();
    event.sig = Some("abc".to_string());
    assert!(matches!(event.verify(), Err(Error::InvalidHex(_))));
  }

  #[test]
  fn test_sign_fills_pubkey_id_and_sig() {
    let keys = make_keys();
    let mut event = Event::new_without_signature(
      "614a695bab54e8dc98946abdb8ec019599ece6dada0c23890977d0fa128081d6",
      1700000000,
      Kind::TextNote,
      Tags::from(vec![Tag::new("t", ["nostr"])]),
      "hello",
    )
    .unwrap();
    assert!(event.is_rumor());

    event.sign(&keys).unwrap();
    assert_eq!(event.pubkey, keys.public_key_hex());
    assert!(event.verify().is_ok());
  }

  #[test]
  fn test_rejects_malformed_pubkey() {
    let result = Event::new_without_signature("abc", 0, Kind::TextNote, Tags::new(), "");
    assert!(matches!(result, Err(Error::InvalidHex(_))));
  }

  #[test]
  fn test_serialization_keeps_field_order_and_extras() {
    let raw = r#"{"id":"00960bd35499f8c63a4f65e79d6b1a2b7f1b8c97e76652325567b78c496350ae","pubkey":"614a695bab54e8dc98946abdb8ec019599ece6dada0c23890977d0fa128081d6","created_at":1684589418,"kind":1,"tags":[],"content":"potato","sig":"bf073c935f71de50ec72bdb79f75b0bf32f9049305c3b22f97c06422c6f2edc86e0d7e07d7d7222678b238b1daee071be5f6fa653c611971395ec0d1c6407caf","relay_hint":"wss://relay.example.com"}"#;
    let event = Event::from_json(raw).unwrap();
    assert_eq!(
      event.extra.get("relay_hint"),
      Some(&json!("wss://relay.example.com"))
    );
    assert!(event.verify().is_ok());
    assert_eq!(event.as_json().unwrap(), raw);
  }

  #[test]
  fn test_rumor_serializes_without_sig() {
    let mut event = make_signed_sut();
    event.sig = None;
    let json = event.as_json().unwrap();
    assert!(!json.contains("\"sig\""));
    assert!(Event::from_json(&json).unwrap().is_rumor());
  }

  #[test]
  fn test_structural_failures_are_malformed() {
    assert!(matches!(Event::from_json(""), Err(Error::Malformed(_))));
    assert!(matches!(Event::from_json("{\"id\":1}"), Err(Error::Malformed(_))));
    assert!(matches!(
      Event::from_json(r#"{"id":"","pubkey":"","created_at":0,"kind":-1,"tags":[],"content":""}"#),
      Err(Error::Malformed(_))
    ));
  }

  #[test]
  fn test_replaceable_key_and_identifier() {
    let mut event = make_signed_sut();
    assert_eq!(event.replaceable_key(), None);

    event.kind = Kind::RelayList;
    assert_eq!(
      event.replaceable_key(),
      Some((event.pubkey.clone(), Kind::RelayList, None))
    );

    event.kind = Kind::Custom(30023);
    assert_eq!(event.identifier(), "");
    event.tags.push(Tag::new("d", ["article"]));
    assert_eq!(
      event.replaceable_key(),
      Some((event.pubkey.clone(), Kind::Custom(30023), Some("article".to_string())))
    );
  }

  #[test]
  fn test_newer_than_breaks_ties_by_id() {
    let mut a = make_signed_sut();
    let mut b = a.clone();
    b.created_at += 1;
    assert!(b.newer_than(&a));
    assert!(!a.newer_than(&b));

    b.created_at = a.created_at;
    a.id = "00".repeat(32);
    b.id = "ff".repeat(32);
    assert!(a.newer_than(&b));
    assert!(!b.newer_than(&a));
  }
}
