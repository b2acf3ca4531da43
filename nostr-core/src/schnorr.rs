use std::fmt;

use log::error;
use secp256k1::{
  schnorr, KeyPair, Message, Secp256k1, SecretKey, Signing, Verification, XOnlyPublicKey,
};

use crate::{
  encoding::{parse_hex32, parse_hex64},
  error::{Error, Result},
};

/// A secp256k1 secret key with its x-only public key.
#[derive(Clone)]
pub struct Keys {
  secret_key: SecretKey,
  public_key: XOnlyPublicKey,
}

impl fmt::Debug for Keys {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_struct("Keys")
      .field("public_key", &self.public_key_hex())
      .finish_non_exhaustive()
  }
}

impl Keys {
  pub fn new(secret_key: SecretKey) -> Self {
    let secp = Secp256k1::signing_only();
    let keypair = KeyPair::from_secret_key(&secp, &secret_key);
    let (public_key, _) = XOnlyPublicKey::from_keypair(&keypair);
    Self {
      secret_key,
      public_key,
    }
  }

  /// Fresh random keypair, also used for one-shot gift wrap keys.
  pub fn generate() -> Self {
    Self::new(SecretKey::new(&mut rand::thread_rng()))
  }

  pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
    let bytes = parse_hex32(secret_hex)?;
    let secret_key = SecretKey::from_slice(&bytes).map_err(|err| {
      error!("[Keys::from_secret_hex] {err}");
      Error::InvalidHex(err.to_string())
    })?;
    Ok(Self::new(secret_key))
  }

  pub fn public_key(&self) -> XOnlyPublicKey {
    self.public_key
  }

  pub fn public_key_hex(&self) -> String {
    self.public_key.to_string()
  }

  pub fn secret_key_hex(&self) -> String {
    hex::encode(self.secret_key.secret_bytes())
  }

  /// BIP-340 signature over a 32-byte message (an event id).
  pub fn sign_schnorr(&self, msg: &[u8; 32]) -> Result<String> {
    let secp = Secp256k1::signing_only();
    sign_schnorr(&secp, msg, &self.secret_key).map(|sig| sig.to_string())
  }
}

///
/// Signs a Schnorr signature for a determined content.
///
/// ## Arguments
///
/// * `secp` - A Secp256k1 engine to execute signature.
/// * `msg` - A 32 bytes hashed message (the raw event id).
/// * `seckey` - The Private Key to sign the message.
///
pub fn sign_schnorr<C: Signing>(
  secp: &Secp256k1<C>,
  msg: &[u8; 32],
  seckey: &SecretKey,
) -> Result<schnorr::Signature> {
  let msg = Message::from_slice(msg).map_err(|err| Error::Malformed(err.to_string()))?;
  let keypair = KeyPair::from_secret_key(secp, seckey);
  Ok(secp.sign_schnorr(&msg, &keypair))
}

///
/// Verifies a Schnorr signature for a determined content.
///
/// Malformed hex input is `InvalidHex`; a well formed signature that does
/// not verify is `BadSignature`.
///
/// ## Examples
///
/// ```
///     use nostr_core::schnorr::*;
///     use nostr_core::encoding::parse_hex32;
///     use secp256k1::Secp256k1;
///
///     let secp = Secp256k1::verification_only();
///     let id = parse_hex32("00960bd35499f8c63a4f65e79d6b1a2b7f1b8c97e76652325567b78c496350ae").unwrap();
///     let sig = "bf073c935f71de50ec72bdb79f75b0bf32f9049305c3b22f97c06422c6f2edc86e0d7e07d7d7222678b238b1daee071be5f6fa653c611971395ec0d1c6407caf";
///     let pubkey = "614a695bab54e8dc98946abdb8ec019599ece6dada0c23890977d0fa128081d6";
///     assert!(verify_schnorr(&secp, &id, sig, pubkey).is_ok());
/// ```
pub fn verify_schnorr<C: Verification>(
  secp: &Secp256k1<C>,
  msg: &[u8; 32],
  sig_hex: &str,
  pubkey_hex: &str,
) -> Result<()> {
  let sig_bytes = parse_hex64(sig_hex)?;
  let pubkey_bytes = parse_hex32(pubkey_hex)?;
  let sig = schnorr::Signature::from_slice(&sig_bytes)
    .map_err(|err| Error::InvalidHex(err.to_string()))?;
  let x_only_pubkey = XOnlyPublicKey::from_slice(&pubkey_bytes)
    .map_err(|err| Error::InvalidHex(err.to_string()))?;
  let msg = Message::from_slice(msg).map_err(|err| Error::Malformed(err.to_string()))?;

  secp
    .verify_schnorr(&sig, &msg, &x_only_pubkey)
    .map_err(|_| Error::BadSignature)
}

#[cfg(test)]
mod tests {
  use bitcoin_hashes::{sha256, Hash};

  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  struct Sut {
    keys: Keys,
    msg: [u8; 32],
  }

  fn make_sut() -> Sut {
    let keys = Keys::from_secret_hex(
      "3b940b5586823dfd02ae3b461bb4336b5ecbaefd6627aa922efc048fec0c881c",
    )
    .unwrap();
    let msg = sha256::Hash::hash(b"This is some message").into_inner();
    Sut { keys, msg }
  }

  #[test]
  fn test_should_sign_and_verify_schnorr() {
    let sut = make_sut();
    let sig = sut.keys.sign_schnorr(&sut.msg).unwrap();
    let secp = Secp256k1::verification_only();
    assert!(verify_schnorr(&secp, &sut.msg, &sig, &sut.keys.public_key_hex()).is_ok());
  }

  #[test]
  fn test_should_reject_signature_for_another_message() {
    let sut = make_sut();
    let other = sha256::Hash::hash(b"another message").into_inner();
    let sig = sut.keys.sign_schnorr(&other).unwrap();
    let secp = Secp256k1::verification_only();
    let result = verify_schnorr(&secp, &sut.msg, &sig, &sut.keys.public_key_hex());
    assert!(matches!(result, Err(Error::BadSignature)));
  }

  #[test]
  fn test_should_reject_malformed_hex() {
    let sut = make_sut();
    let secp = Secp256k1::verification_only();
    let result = verify_schnorr(&secp, &sut.msg, "zz", &sut.keys.public_key_hex());
    assert!(matches!(result, Err(Error::InvalidHex(_))));
  }

  #[test]
  fn test_invalid_secret_key_is_rejected() {
    let result = Keys::from_secret_hex(&"00".repeat(32));
    assert!(matches!(result, Err(Error::InvalidHex(_))));
  }

  #[test]
  fn test_public_key_is_x_only_hex() {
    let sut = make_sut();
    let pubkey = sut.keys.public_key_hex();
    assert_eq!(pubkey.len(), 64);
    assert_eq!(
      pubkey,
      "1d152307c6b72b0ed0418b0e70cd80e7f5295b8d86f5722d3f5213fbd2394f36"
    );
    assert_eq!(Keys::from_secret_hex(&sut.keys.secret_key_hex()).unwrap().public_key_hex(), pubkey);
  }
}
