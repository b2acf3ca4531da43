//! NIP-57 lightning zaps: zap requests (kind 9734), zap receipts
//! (kind 9735), BOLT11 amounts, LNURL helpers and zap splits.
//!
//! <https://github.com/nostr-protocol/nips/blob/master/57.md>
use bech32::{FromBase32, ToBase32, Variant};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::encoding::{is_hex_of_len, short};
use crate::error::{Error, Result, ZapReceiptError};
use crate::event::{kind::Kind, now, tag::Tag, tag::Tags, Event, PubKey, Timestamp};
use crate::signer::{self, CancellationToken, Signer};

pub const LNURL_HRP: &str = "lnurl";

const MSAT_PER_BTC: u64 = 100_000_000_000;

fn malformed_invoice(invoice: &str, reason: &str) -> Error {
  Error::Malformed(format!("bolt11 {}: {reason}", short(invoice)))
}

/// Amount of a BOLT11 invoice in millisatoshis, read from its human
/// readable part (`lnbc2500u1...`). An invoice without amount is 0.
pub fn parse_bolt11_amount(invoice: &str) -> Result<u64> {
  let invoice = invoice.trim().to_ascii_lowercase();
  let hrp = match invoice.rfind('1') {
    Some(separator) => &invoice[..separator],
    None => return Err(malformed_invoice(&invoice, "missing separator")),
  };
  let Some(rest) = hrp.strip_prefix("ln") else {
    return Err(malformed_invoice(&invoice, "not a lightning invoice"));
  };

  // Currency prefix (bc, tb, bcrt, ...) runs until the first digit.
  let Some(start) = rest.find(|c: char| c.is_ascii_digit()) else {
    return Ok(0);
  };
  let amount = &rest[start..];
  let (digits, multiplier) = match amount.char_indices().last() {
    Some((index, c)) if c.is_ascii_alphabetic() => (&amount[..index], Some(c)),
    _ => (amount, None),
  };

  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return Err(malformed_invoice(&invoice, "invalid amount"));
  }
  let value: u64 = digits
    .parse()
    .map_err(|_| Error::AmountOutOfRange(format!("bolt11 amount {digits}")))?;

  let overflow = || Error::AmountOutOfRange(format!("bolt11 amount {amount}"));
  match multiplier {
    None => value.checked_mul(MSAT_PER_BTC).ok_or_else(overflow),
    Some('m') => value.checked_mul(100_000_000).ok_or_else(overflow),
    Some('u') => value.checked_mul(100_000).ok_or_else(overflow),
    Some('n') => value.checked_mul(100).ok_or_else(overflow),
    Some('p') => {
      if value % 10 != 0 {
        return Err(Error::AmountOutOfRange(format!(
          "bolt11 amount {amount} is not a whole millisatoshi"
        )));
      }
      Ok(value / 10)
    }
    Some(other) => Err(malformed_invoice(
      &invoice,
      &format!("unknown multiplier {other}"),
    )),
  }
}

/// Builds kind 9734 zap requests.
#[derive(Debug, Clone, Default)]
pub struct ZapRequestBuilder {
  recipient: PubKey,
  relays: Vec<String>,
  amount_msat: Option<u64>,
  lnurl: Option<String>,
  content: String,
  event_id: Option<String>,
  coordinate: Option<String>,
  zapped_kind: Option<Kind>,
}

impl ZapRequestBuilder {
  pub fn new<P, I, S>(recipient: P, relays: I) -> Self
  where
    P: Into<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      recipient: recipient.into(),
      relays: relays.into_iter().map(Into::into).collect(),
      ..Default::default()
    }
  }

  pub fn amount(&mut self, msat: u64) -> &mut Self {
    self.amount_msat = Some(msat);
    self
  }

  pub fn lnurl<S: Into<String>>(&mut self, lnurl: S) -> &mut Self {
    self.lnurl = Some(lnurl.into());
    self
  }

  pub fn content<S: Into<String>>(&mut self, content: S) -> &mut Self {
    self.content = content.into();
    self
  }

  /// Zapped event.
  pub fn event<S: Into<String>>(&mut self, event_id: S) -> &mut Self {
    self.event_id = Some(event_id.into());
    self
  }

  /// Zapped addressable event, `kind:pubkey:d`.
  pub fn coordinate<S: Into<String>>(&mut self, coordinate: S) -> &mut Self {
    self.coordinate = Some(coordinate.into());
    self
  }

  pub fn zapped_kind(&mut self, kind: Kind) -> &mut Self {
    self.zapped_kind = Some(kind);
    self
  }

  /// Tags in the order `relays`, `amount`, `lnurl`, `p`, `e`, `a`, `k`.
  pub fn to_tags(&self) -> Result<Tags> {
    if self.relays.is_empty() {
      return Err(Error::Malformed(
        "zap request needs at least one relay".to_string(),
      ));
    }
    if !is_hex_of_len(&self.recipient, 64) {
      return Err(Error::InvalidHex(format!("recipient {:?}", self.recipient)));
    }

    let mut tags = Tags::new();
    tags.push(Tag::new("relays", self.relays.iter().map(String::as_str)));
    if let Some(amount) = self.amount_msat {
      tags.push(Tag::new("amount", [amount.to_string()]));
    }
    if let Some(lnurl) = &self.lnurl {
      tags.push(Tag::new("lnurl", [lnurl.as_str()]));
    }
    tags.push(Tag::new("p", [self.recipient.as_str()]));
    if let Some(event_id) = &self.event_id {
      tags.push(Tag::new("e", [event_id.as_str()]));
    }
    if let Some(coordinate) = &self.coordinate {
      tags.push(Tag::new("a", [coordinate.as_str()]));
    }
    if let Some(kind) = self.zapped_kind {
      tags.push(Tag::new("k", [kind.as_u32().to_string()]));
    }
    Ok(tags)
  }

  pub fn to_unsigned(&self, sender: &str, created_at: Timestamp) -> Result<Event> {
    Event::new_without_signature(
      sender,
      created_at,
      Kind::ZapRequest,
      self.to_tags()?,
      self.content.as_str(),
    )
  }

  /// Signed zap request from `signer`, stamped now.
  pub async fn sign(
    &self,
    signer: &dyn Signer,
    config: &Config,
    cancel: &CancellationToken,
  ) -> Result<Event> {
    let sender = signer::public_key(signer, config, cancel).await?;
    let unsigned = self.to_unsigned(&sender, now())?;
    signer::sign_event(signer, &unsigned, config, cancel).await
  }
}

/// The fields of a kind 9734 event a zap flow cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapRequest {
  pub sender_pubkey: PubKey,
  pub recipient_pubkey: PubKey,
  pub relays: Vec<String>,
  pub amount_msat: Option<u64>,
  pub lnurl: Option<String>,
  pub event_id: Option<String>,
  pub coordinate: Option<String>,
  pub content: String,
}

/// Reads a zap request without checking its signature.
pub fn parse_zap_request(event: &Event) -> Result<ZapRequest> {
  if event.kind != Kind::ZapRequest {
    return Err(Error::InvalidKind(event.kind.as_u32() as u64));
  }

  let recipient_pubkey = event
    .tags
    .first_value("p")
    .ok_or_else(|| Error::MissingTag("p".to_string()))?;

  let amount_msat = match event.tags.first_value("amount") {
    Some(amount) => Some(
      amount
        .parse::<u64>()
        .map_err(|_| Error::Malformed(format!("zap request amount {amount:?}")))?,
    ),
    None => None,
  };

  let relays = event
    .tags
    .find("relays")
    .map(|tag| tag.as_vec()[1..].to_vec())
    .unwrap_or_default();

  Ok(ZapRequest {
    sender_pubkey: event.pubkey.clone(),
    recipient_pubkey: recipient_pubkey.to_string(),
    relays,
    amount_msat,
    lnurl: event.tags.first_value("lnurl").map(str::to_string),
    event_id: event.tags.first_value("e").map(str::to_string),
    coordinate: event.tags.first_value("a").map(str::to_string),
    content: event.content.clone(),
  })
}

/// Kind 9734, valid id and signature, exactly one `p` tag and at most
/// one `e` tag.
pub fn validate_zap_request(event: &Event) -> Result<ZapRequest> {
  if event.kind != Kind::ZapRequest {
    return Err(Error::InvalidKind(event.kind.as_u32() as u64));
  }
  event.verify()?;

  let p_count = event.tags.filter("p").count();
  if p_count != 1 {
    return Err(Error::Malformed(format!(
      "zap request must have exactly one p tag, found {p_count}"
    )));
  }
  let e_count = event.tags.filter("e").count();
  if e_count > 1 {
    return Err(Error::Malformed(format!(
      "zap request may have at most one e tag, found {e_count}"
    )));
  }

  parse_zap_request(event)
}

/// A parsed kind 9735 event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapReceipt {
  pub id: String,
  /// Pubkey of the LNURL provider that signed the receipt.
  pub provider_pubkey: PubKey,
  pub bolt11: String,
  pub preimage: Option<String>,
  /// Raw JSON of the zap request.
  pub description: String,
  /// `P` tag, or the zap request author when absent.
  pub sender_pubkey: PubKey,
  pub recipient_pubkey: PubKey,
  pub event_id: Option<String>,
  pub event_coordinate: Option<String>,
  /// From the invoice.
  pub amount_msat: u64,
  /// From the zap request `amount` tag.
  pub requested_amount_msat: Option<u64>,
  pub zap_request: Event,
}

fn receipt_error(kind: ZapReceiptError) -> Error {
  Error::InvalidZapReceipt(kind)
}

fn non_empty_value<'a>(event: &'a Event, name: &str) -> Option<&'a str> {
  event.tags.first_value(name).filter(|value| !value.is_empty())
}

/// Reads a zap receipt without checking signatures or the provider.
pub fn parse_zap_receipt(event: &Event) -> Result<ZapReceipt> {
  if event.kind != Kind::ZapReceipt {
    return Err(receipt_error(ZapReceiptError::WrongKind(
      event.kind.as_u32(),
    )));
  }

  let bolt11 = non_empty_value(event, "bolt11")
    .ok_or_else(|| receipt_error(ZapReceiptError::MissingBolt11))?;
  let description = non_empty_value(event, "description")
    .ok_or_else(|| receipt_error(ZapReceiptError::MissingDescription))?;

  let zap_request: Event = match serde_json::from_str::<Value>(description) {
    Ok(value @ Value::Object(_)) => {
      Event::from_value(value).map_err(|_| receipt_error(ZapReceiptError::InvalidDescription))?
    }
    _ => return Err(receipt_error(ZapReceiptError::InvalidDescription)),
  };

  let requested_amount_msat = match zap_request.tags.first_value("amount") {
    Some(amount) => Some(
      amount
        .parse::<u64>()
        .map_err(|_| receipt_error(ZapReceiptError::InvalidZapRequest))?,
    ),
    None => None,
  };

  let recipient_pubkey = event
    .tags
    .first_value("p")
    .ok_or_else(|| Error::MissingTag("p".to_string()))?;

  Ok(ZapReceipt {
    id: event.id.clone(),
    provider_pubkey: event.pubkey.clone(),
    bolt11: bolt11.to_string(),
    preimage: event.tags.first_value("preimage").map(str::to_string),
    description: description.to_string(),
    sender_pubkey: event
      .tags
      .first_value("P")
      .unwrap_or(zap_request.pubkey.as_str())
      .to_string(),
    recipient_pubkey: recipient_pubkey.to_string(),
    event_id: event.tags.first_value("e").map(str::to_string),
    event_coordinate: event.tags.first_value("a").map(str::to_string),
    amount_msat: parse_bolt11_amount(bolt11)?,
    requested_amount_msat,
    zap_request,
  })
}

/// Full receipt validation.
///
/// `expected_provider` is the `nostrPubkey` of the recipient's LNURL-pay
/// endpoint, `expected_lnurl` the recipient's lnurl. Both checks are
/// skipped when `None`, and the lnurl check only rejects a request whose
/// own `lnurl` tag differs.
pub fn validate_zap_receipt(
  event: &Event,
  expected_provider: Option<&str>,
  expected_lnurl: Option<&str>,
) -> Result<ZapReceipt> {
  if event.kind != Kind::ZapReceipt {
    return Err(receipt_error(ZapReceiptError::WrongKind(
      event.kind.as_u32(),
    )));
  }
  event.verify()?;

  let receipt = parse_zap_receipt(event)?;

  if let Some(expected) = expected_provider {
    if !expected.eq_ignore_ascii_case(&receipt.provider_pubkey) {
      warn!(
        "[nip57::validate_zap_receipt] {} signed by unexpected provider {}",
        short(&receipt.id),
        short(&receipt.provider_pubkey)
      );
      return Err(receipt_error(ZapReceiptError::ProviderMismatch {
        expected: expected.to_string(),
        found: receipt.provider_pubkey,
      }));
    }
  }

  let request = validate_zap_request(&receipt.zap_request).map_err(|err| {
    warn!(
      "[nip57::validate_zap_receipt] {} embeds an invalid zap request: {err}",
      short(&receipt.id)
    );
    receipt_error(ZapReceiptError::InvalidZapRequest)
  })?;

  if let Some(requested) = receipt.requested_amount_msat {
    if requested != 0 && requested != receipt.amount_msat {
      warn!(
        "[nip57::validate_zap_receipt] {} invoice {} msat, requested {requested} msat",
        short(&receipt.id),
        receipt.amount_msat
      );
      return Err(receipt_error(ZapReceiptError::AmountMismatch {
        invoice: receipt.amount_msat,
        requested,
      }));
    }
  }

  // A request without an lnurl tag cannot contradict the expected one.
  if let Some(expected) = expected_lnurl {
    let matches = request
      .lnurl
      .as_deref()
      .map_or(true, |lnurl| lnurl.eq_ignore_ascii_case(expected));
    if !matches {
      return Err(receipt_error(ZapReceiptError::LnurlMismatch));
    }
  }

  debug!(
    "[nip57::validate_zap_receipt] {} valid, {} msat",
    short(&receipt.id),
    receipt.amount_msat
  );
  Ok(receipt)
}

/// Bech32 `lnurl1...` of a URL.
pub fn encode_lnurl(url: &str) -> Result<String> {
  bech32::encode(LNURL_HRP, url.as_bytes().to_base32(), Variant::Bech32)
    .map_err(|err| Error::InvalidLnurl(err.to_string()))
}

/// URL behind an `lnurl1...` string, either case.
pub fn decode_lnurl(lnurl: &str) -> Result<String> {
  let lnurl = lnurl.trim();
  let lnurl = lnurl.strip_prefix("lightning:").unwrap_or(lnurl);
  let (hrp, data, _) = bech32::decode(lnurl).map_err(|err| Error::InvalidLnurl(err.to_string()))?;
  if hrp != LNURL_HRP {
    return Err(Error::InvalidLnurl(format!("unexpected prefix {hrp}")));
  }
  let bytes = Vec::<u8>::from_base32(&data).map_err(|err| Error::InvalidLnurl(err.to_string()))?;
  String::from_utf8(bytes).map_err(|err| Error::InvalidLnurl(err.to_string()))
}

/// `user@domain` lightning address to its LNURL-pay endpoint.
pub fn lud16_to_url(address: &str) -> Result<String> {
  match address.trim().split_once('@') {
    Some((user, domain)) if !user.is_empty() && !domain.is_empty() && !domain.contains('@') => {
      Ok(format!("https://{domain}/.well-known/lnurlp/{user}"))
    }
    _ => Err(Error::InvalidLnurl(format!("lightning address {address:?}"))),
  }
}

/// LNURL-pay endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LnurlPayInfo {
  pub callback: String,
  pub min_sendable: u64,
  pub max_sendable: u64,
  #[serde(default)]
  pub allows_nostr: bool,
  #[serde(default)]
  pub nostr_pubkey: Option<String>,
}

impl LnurlPayInfo {
  pub fn from_json(json: &str) -> Result<Self> {
    serde_json::from_str(json).map_err(|err| Error::InvalidLnurl(err.to_string()))
  }

  pub fn check_amount(&self, amount_msat: u64) -> Result<()> {
    if amount_msat < self.min_sendable || amount_msat > self.max_sendable {
      return Err(Error::AmountOutOfRange(format!(
        "{amount_msat} msat outside [{}, {}]",
        self.min_sendable, self.max_sendable
      )));
    }
    Ok(())
  }

  /// The endpoint issues zap receipts, signed by `nostr_pubkey`.
  pub fn supports_zaps(&self) -> bool {
    self.allows_nostr
      && self
        .nostr_pubkey
        .as_deref()
        .map(|pubkey| is_hex_of_len(pubkey, 64))
        .unwrap_or(false)
  }
}

/// Invoice request URL: `callback` with `amount`, `nostr` and `lnurl`
/// appended as query parameters.
pub fn build_callback_url(
  callback: &str,
  amount_msat: u64,
  zap_request_json: &str,
  lnurl: Option<&str>,
) -> Result<String> {
  if amount_msat == 0 {
    return Err(Error::AmountOutOfRange("amount must be positive".to_string()));
  }
  let mut url = Url::parse(callback).map_err(|err| Error::InvalidLnurl(format!("callback: {err}")))?;
  {
    let mut query = url.query_pairs_mut();
    query.append_pair("amount", &amount_msat.to_string());
    query.append_pair("nostr", zap_request_json);
    if let Some(lnurl) = lnurl {
      query.append_pair("lnurl", lnurl);
    }
  }
  Ok(url.to_string())
}

/// Invoice out of a callback response. A nonzero `expected_msat` must
/// match the invoice amount.
pub fn parse_invoice_response(json: &str, expected_msat: Option<u64>) -> Result<String> {
  let value: Value =
    serde_json::from_str(json).map_err(|err| Error::InvoiceFailed(err.to_string()))?;

  if value.get("status").and_then(Value::as_str) == Some("ERROR") {
    let reason = value
      .get("reason")
      .and_then(Value::as_str)
      .unwrap_or("unknown reason");
    return Err(Error::InvoiceFailed(reason.to_string()));
  }

  let invoice = value
    .get("pr")
    .and_then(Value::as_str)
    .filter(|pr| !pr.is_empty())
    .ok_or_else(|| Error::InvoiceFailed("response has no invoice".to_string()))?;

  if let Some(expected) = expected_msat.filter(|expected| *expected != 0) {
    let actual = parse_bolt11_amount(invoice)?;
    if actual != expected {
      return Err(Error::InvoiceFailed(format!(
        "invoice for {actual} msat, asked {expected} msat"
      )));
    }
  }
  Ok(invoice.to_string())
}

/// One `["zap", <pubkey>, <relay>, <weight>]` entry of a zap split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapSplit {
  pub pubkey: PubKey,
  pub relay: Option<String>,
  pub weight: u32,
}

pub fn parse_zap_splits(event: &Event) -> Vec<ZapSplit> {
  event
    .tags
    .filter("zap")
    .filter_map(|tag| {
      let pubkey = tag.content()?;
      Some(ZapSplit {
        pubkey: pubkey.to_string(),
        relay: tag.get(2).filter(|relay| !relay.is_empty()).map(str::to_string),
        weight: tag.get(3).and_then(|weight| weight.parse().ok()).unwrap_or(0),
      })
    })
    .collect()
}

/// Share of `total_msat` for the split at `index`. Without any weight the
/// amount is divided equally.
pub fn split_amount(splits: &[ZapSplit], index: usize, total_msat: u64) -> u64 {
  let Some(split) = splits.get(index) else {
    return 0;
  };
  let total_weight: u64 = splits.iter().map(|split| split.weight as u64).sum();
  if total_weight == 0 {
    return total_msat / splits.len() as u64;
  }
  ((total_msat as u128 * split.weight as u128) / total_weight as u128) as u64
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schnorr::Keys;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  const RECIPIENT: &str = "614a695bab54e8dc98946abdb8ec019599ece6dada0c23890977d0fa128081d6";

  fn make_request(sender: &Keys, amount: Option<u64>) -> Event {
    let mut builder = ZapRequestBuilder::new(RECIPIENT, ["wss://relay.example.com"]);
    builder.content("great post").lnurl("lnurl1abc");
    if let Some(amount) = amount {
      builder.amount(amount);
    }
    let mut request = builder.to_unsigned(&sender.public_key_hex(), 1700000000).unwrap();
    request.sign(sender).unwrap();
    request
  }

  fn make_sut(provider: &Keys, bolt11: &str, request: &Event) -> Event {
    let tags = Tags::from(vec![
      Tag::new("p", [RECIPIENT]),
      Tag::new("P", [request.pubkey.as_str()]),
      Tag::new("bolt11", [bolt11]),
      Tag::new("description", [request.as_json().unwrap()]),
      Tag::new("preimage", ["00ff"]),
    ]);
    let mut receipt = Event::new_without_signature(
      provider.public_key_hex(),
      1700000001,
      Kind::ZapReceipt,
      tags,
      "",
    )
    .unwrap();
    receipt.sign(provider).unwrap();
    receipt
  }

  #[test]
  fn test_bolt11_amounts() {
    assert_eq!(parse_bolt11_amount("lnbc210n1pjabcdef").unwrap(), 21_000);
    assert_eq!(parse_bolt11_amount("lnbc2500u1pvjluez").unwrap(), 250_000_000);
    assert_eq!(parse_bolt11_amount("LNBC20M1PVJLUEZ").unwrap(), 2_000_000_000);
    assert_eq!(parse_bolt11_amount("lntb1500p1xyz").unwrap(), 150);
    assert_eq!(parse_bolt11_amount("lnbc11xyz").unwrap(), MSAT_PER_BTC);
    assert_eq!(parse_bolt11_amount("lnbc1pvjluez").unwrap(), 0);
    assert_eq!(parse_bolt11_amount("lnbcrt5u1abc").unwrap(), 500_000);

    assert!(matches!(parse_bolt11_amount("lnbc15p1xyz"), Err(Error::AmountOutOfRange(_))));
    assert!(matches!(
      parse_bolt11_amount("lnbc999999999999m1xyz"),
      Err(Error::AmountOutOfRange(_))
    ));
    assert!(matches!(parse_bolt11_amount("bc210n1xyz"), Err(Error::Malformed(_))));
    assert!(matches!(parse_bolt11_amount("lnbc21x0n1xyz"), Err(Error::Malformed(_))));
    assert!(matches!(parse_bolt11_amount("lnbc"), Err(Error::Malformed(_))));
  }

  #[test]
  fn test_zap_request_tag_order() {
    let mut builder = ZapRequestBuilder::new(RECIPIENT, ["wss://a.com", "wss://b.com"]);
    builder
      .zapped_kind(Kind::TextNote)
      .coordinate(format!("30023:{RECIPIENT}:x"))
      .event("ee")
      .lnurl("lnurl1xyz")
      .amount(21000);
    let names: Vec<String> = builder
      .to_tags()
      .unwrap()
      .iter()
      .map(|tag| tag.name().to_string())
      .collect();
    assert_eq!(names, vec!["relays", "amount", "lnurl", "p", "e", "a", "k"]);

    let relays = builder.to_tags().unwrap();
    assert_eq!(relays.get(0).unwrap().as_vec(), &["relays", "wss://a.com", "wss://b.com"]);

    let empty = ZapRequestBuilder::new(RECIPIENT, Vec::<String>::new());
    assert!(matches!(empty.to_tags(), Err(Error::Malformed(_))));
  }

  #[tokio::test]
  async fn test_zap_request_signed_through_signer() {
    let keys = Keys::generate();
    let mut builder = ZapRequestBuilder::new(RECIPIENT, ["wss://a.com"]);
    builder.amount(1000);
    let request = builder
      .sign(&keys, &Config::default(), &CancellationToken::new())
      .await
      .unwrap();

    let parsed = validate_zap_request(&request).unwrap();
    assert_eq!(parsed.sender_pubkey, keys.public_key_hex());
    assert_eq!(parsed.recipient_pubkey, RECIPIENT);
    assert_eq!(parsed.relays, vec!["wss://a.com".to_string()]);
    assert_eq!(parsed.amount_msat, Some(1000));
  }

  #[test]
  fn test_validate_zap_request_counts_tags() {
    let keys = Keys::generate();
    let mut request = make_request(&keys, Some(1000));
    request.tags.push(Tag::new("p", [RECIPIENT]));
    request.sign(&keys).unwrap();
    assert!(matches!(validate_zap_request(&request), Err(Error::Malformed(_))));

    let mut note = make_request(&keys, None);
    note.kind = Kind::TextNote;
    assert!(matches!(validate_zap_request(&note), Err(Error::InvalidKind(1))));
  }

  #[test]
  fn test_receipt_validates() {
    let sender = Keys::generate();
    let provider = Keys::generate();
    let request = make_request(&sender, Some(21000));
    let receipt = make_sut(&provider, "lnbc210n1pjabcdef", &request);

    let provider_upper = provider.public_key_hex().to_uppercase();
    let parsed = validate_zap_receipt(&receipt, Some(provider_upper.as_str()), Some("LNURL1ABC")).unwrap();
    assert_eq!(parsed.amount_msat, 21000);
    assert_eq!(parsed.requested_amount_msat, Some(21000));
    assert_eq!(parsed.sender_pubkey, sender.public_key_hex());
    assert_eq!(parsed.recipient_pubkey, RECIPIENT);
    assert_eq!(parsed.preimage.as_deref(), Some("00ff"));
    assert_eq!(parsed.zap_request, request);
  }

  #[test]
  fn test_receipt_without_request_lnurl_passes_lnurl_check() {
    let sender = Keys::generate();
    let provider = Keys::generate();
    let mut builder = ZapRequestBuilder::new(RECIPIENT, ["wss://relay.example.com"]);
    builder.amount(21000);
    let mut request = builder.to_unsigned(&sender.public_key_hex(), 1700000000).unwrap();
    request.sign(&sender).unwrap();
    assert!(request.tags.find("lnurl").is_none());

    let receipt = make_sut(&provider, "lnbc210n1pjabcdef", &request);
    let parsed = validate_zap_receipt(&receipt, None, Some("lnurl1abc")).unwrap();
    assert_eq!(parsed.amount_msat, 21000);
  }

  #[test]
  fn test_receipt_failures() {
    let sender = Keys::generate();
    let provider = Keys::generate();

    let request = make_request(&sender, Some(22000));
    let receipt = make_sut(&provider, "lnbc210n1pjabcdef", &request);
    assert!(matches!(
      validate_zap_receipt(&receipt, None, None),
      Err(Error::InvalidZapReceipt(ZapReceiptError::AmountMismatch {
        invoice: 21000,
        requested: 22000
      }))
    ));

    let request = make_request(&sender, None);
    let receipt = make_sut(&provider, "lnbc210n1pjabcdef", &request);
    assert!(validate_zap_receipt(&receipt, None, None).is_ok());
    assert!(matches!(
      validate_zap_receipt(&receipt, Some(sender.public_key_hex().as_str()), None),
      Err(Error::InvalidZapReceipt(ZapReceiptError::ProviderMismatch { .. }))
    ));
    assert!(matches!(
      validate_zap_receipt(&receipt, None, Some("lnurl1other")),
      Err(Error::InvalidZapReceipt(ZapReceiptError::LnurlMismatch))
    ));

    let mut tampered = request.clone();
    tampered.content = "changed".to_string();
    let receipt = make_sut(&provider, "lnbc210n1pjabcdef", &tampered);
    assert!(matches!(
      validate_zap_receipt(&receipt, None, None),
      Err(Error::InvalidZapReceipt(ZapReceiptError::InvalidZapRequest))
    ));
  }

  #[test]
  fn test_receipt_structure() {
    let provider = Keys::generate();
    let mut receipt = Event::new_without_signature(
      provider.public_key_hex(),
      0,
      Kind::ZapReceipt,
      Tags::from(vec![Tag::new("description", ["{}"])]),
      "",
    )
    .unwrap();
    receipt.sign(&provider).unwrap();
    assert!(matches!(
      validate_zap_receipt(&receipt, None, None),
      Err(Error::InvalidZapReceipt(ZapReceiptError::MissingBolt11))
    ));

    receipt.tags = Tags::from(vec![
      Tag::new("bolt11", ["lnbc1xyz"]),
      Tag::new("description", ["[1,2]"]),
    ]);
    receipt.sign(&provider).unwrap();
    assert!(matches!(
      validate_zap_receipt(&receipt, None, None),
      Err(Error::InvalidZapReceipt(ZapReceiptError::InvalidDescription))
    ));

    receipt.kind = Kind::TextNote;
    assert!(matches!(
      validate_zap_receipt(&receipt, None, None),
      Err(Error::InvalidZapReceipt(ZapReceiptError::WrongKind(1)))
    ));
  }

  #[test]
  fn test_lnurl_encoding() {
    let url = "https://service.com/api?q=3fc3645b439ce8e7f2553a69e5267081d96dcd340693afabe04be7b0ccd178df";
    let lnurl = "LNURL1DP68GURN8GHJ7UM9WFMXJCM99E3K7MF0V9CXJ0M385EKVCENXC6R2C35XVUKXEFCV5MKVV34X5EKZD3EV56NYD3HXQURZEPEXEJXXEPNXSCRVWFNV9NXZCN9XQ6XYEFHVGCXXCMYXYMNSERXFQ5FNS";
    assert_eq!(decode_lnurl(lnurl).unwrap(), url);
    assert_eq!(encode_lnurl(url).unwrap().to_uppercase(), lnurl);
    assert_eq!(decode_lnurl(&format!("lightning:{}", encode_lnurl(url).unwrap())).unwrap(), url);

    let npub = crate::encoding::to_npub(RECIPIENT).unwrap();
    assert!(matches!(decode_lnurl(&npub), Err(Error::InvalidLnurl(_))));
    assert!(decode_lnurl("lnurl1notvalid").is_err());
  }

  #[test]
  fn test_lud16() {
    assert_eq!(
      lud16_to_url("satoshi@example.com").unwrap(),
      "https://example.com/.well-known/lnurlp/satoshi"
    );
    assert!(matches!(lud16_to_url("example.com"), Err(Error::InvalidLnurl(_))));
    assert!(lud16_to_url("@example.com").is_err());
    assert!(lud16_to_url("a@b@c").is_err());
  }

  #[test]
  fn test_pay_info() {
    let info = LnurlPayInfo::from_json(&format!(
      r#"{{"callback":"https://example.com/cb","minSendable":1000,"maxSendable":100000,"allowsNostr":true,"nostrPubkey":"{RECIPIENT}","tag":"payRequest"}}"#
    ))
    .unwrap();
    assert!(info.supports_zaps());
    assert!(info.check_amount(21000).is_ok());
    assert!(matches!(info.check_amount(999), Err(Error::AmountOutOfRange(_))));
    assert!(matches!(info.check_amount(100001), Err(Error::AmountOutOfRange(_))));

    let info = LnurlPayInfo::from_json(
      r#"{"callback":"https://example.com/cb","minSendable":1,"maxSendable":2}"#,
    )
    .unwrap();
    assert!(!info.supports_zaps());
    assert!(matches!(LnurlPayInfo::from_json("{}"), Err(Error::InvalidLnurl(_))));
  }

  #[test]
  fn test_callback_url() {
    let url = build_callback_url("https://example.com/cb", 21000, r#"{"kind":9734}"#, Some("lnurl1x"))
      .unwrap();
    assert_eq!(
      url,
      "https://example.com/cb?amount=21000&nostr=%7B%22kind%22%3A9734%7D&lnurl=lnurl1x"
    );

    let url = build_callback_url("https://example.com/cb?token=1", 5, "{}", None).unwrap();
    assert_eq!(url, "https://example.com/cb?token=1&amount=5&nostr=%7B%7D");

    assert!(matches!(
      build_callback_url("https://example.com/cb", 0, "{}", None),
      Err(Error::AmountOutOfRange(_))
    ));
    assert!(matches!(build_callback_url("not a url", 1, "{}", None), Err(Error::InvalidLnurl(_))));
  }

  #[test]
  fn test_invoice_response() {
    assert_eq!(
      parse_invoice_response(r#"{"pr":"lnbc210n1pjabcdef","routes":[]}"#, Some(21000)).unwrap(),
      "lnbc210n1pjabcdef"
    );
    assert!(matches!(
      parse_invoice_response(r#"{"status":"ERROR","reason":"too small"}"#, None),
      Err(Error::InvoiceFailed(reason)) if reason == "too small"
    ));
    assert!(matches!(
      parse_invoice_response(r#"{"pr":"lnbc210n1pjabcdef"}"#, Some(1000)),
      Err(Error::InvoiceFailed(_))
    ));
    assert!(matches!(parse_invoice_response(r#"{}"#, None), Err(Error::InvoiceFailed(_))));
  }

  #[test]
  fn test_zap_splits() {
    let event = Event::new_without_signature(
      RECIPIENT,
      0,
      Kind::TextNote,
      Tags::from(vec![
        Tag::new("zap", ["aa", "wss://a.com", "1"]),
        Tag::new("zap", ["bb", "", "3"]),
        Tag::new("zap", Vec::<String>::new()),
      ]),
      "",
    )
    .unwrap();
    let splits = parse_zap_splits(&event);
    assert_eq!(splits.len(), 2);
    assert_eq!(splits[0].relay.as_deref(), Some("wss://a.com"));
    assert_eq!(splits[1].relay, None);
    assert_eq!(split_amount(&splits, 0, 1000), 250);
    assert_eq!(split_amount(&splits, 1, 1000), 750);
    assert_eq!(split_amount(&splits, 2, 1000), 0);

    let unweighted = vec![
      ZapSplit { pubkey: "aa".into(), relay: None, weight: 0 },
      ZapSplit { pubkey: "bb".into(), relay: None, weight: 0 },
    ];
    assert_eq!(split_amount(&unweighted, 1, 1001), 500);
  }
}
