//! Fixed-length hex validation and the bare NIP-19 bech32 entities.
use bech32::{FromBase32, ToBase32, Variant};

use crate::error::{Error, Result};

pub const NPUB_HRP: &str = "npub";
pub const NSEC_HRP: &str = "nsec";
pub const NOTE_HRP: &str = "note";

/// First 8 characters of an id or pubkey, for logs.
pub(crate) fn short(value: &str) -> &str {
  value.get(..8).unwrap_or(value)
}

/// True when `value` is exactly `len` hex characters.
pub fn is_hex_of_len(value: &str, len: usize) -> bool {
  value.len() == len && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_hex_array<const N: usize>(value: &str) -> Result<[u8; N]> {
  if !is_hex_of_len(value, N * 2) {
    return Err(Error::InvalidHex(format!(
      "expected {} hex characters, got {:?}",
      N * 2,
      value
    )));
  }
  let mut out = [0u8; N];
  hex::decode_to_slice(value, &mut out).map_err(|e| Error::InvalidHex(e.to_string()))?;
  Ok(out)
}

/// 32 bytes (event ids, x-only pubkeys, secret keys).
pub fn parse_hex32(value: &str) -> Result<[u8; 32]> {
  parse_hex_array::<32>(value)
}

/// 64 bytes (schnorr signatures).
pub fn parse_hex64(value: &str) -> Result<[u8; 64]> {
  parse_hex_array::<64>(value)
}

fn encode_bech32(hrp: &str, hex_value: &str) -> Result<String> {
  let bytes = parse_hex32(hex_value)?;
  bech32::encode(hrp, bytes.to_base32(), Variant::Bech32)
    .map_err(|e| Error::Malformed(format!("bech32: {e}")))
}

fn decode_bech32(expected_hrp: &str, value: &str) -> Result<String> {
  let (hrp, data, _) =
    bech32::decode(value).map_err(|e| Error::Malformed(format!("bech32: {e}")))?;
  if hrp != expected_hrp {
    return Err(Error::Malformed(format!(
      "expected {expected_hrp} prefix, got {hrp}"
    )));
  }
  let bytes = Vec::<u8>::from_base32(&data).map_err(|e| Error::Malformed(format!("bech32: {e}")))?;
  if bytes.len() != 32 {
    return Err(Error::Malformed(format!("{hrp} payload must be 32 bytes")));
  }
  Ok(hex::encode(bytes))
}

pub fn to_npub(pubkey_hex: &str) -> Result<String> {
  encode_bech32(NPUB_HRP, pubkey_hex)
}

pub fn from_npub(npub: &str) -> Result<String> {
  decode_bech32(NPUB_HRP, npub)
}

pub fn to_nsec(secret_hex: &str) -> Result<String> {
  encode_bech32(NSEC_HRP, secret_hex)
}

pub fn from_nsec(nsec: &str) -> Result<String> {
  decode_bech32(NSEC_HRP, nsec)
}

pub fn to_note(event_id_hex: &str) -> Result<String> {
  encode_bech32(NOTE_HRP, event_id_hex)
}

pub fn from_note(note: &str) -> Result<String> {
  decode_bech32(NOTE_HRP, note)
}
