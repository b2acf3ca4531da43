//! In-memory signer shared by the integration tests.
use async_trait::async_trait;
use bitcoin_hashes::{sha256, Hash};
use nostr_core::{Error, Event, Keys, Result, Signer};

/// Local keys plus a reversible NIP-44 stand-in: the ciphertext is bound
/// to the (sorted) pair of pubkeys, so decrypting with any other pair
/// fails.
pub struct TestSigner {
  pub keys: Keys,
}

impl TestSigner {
  pub fn new() -> Self {
    Self {
      keys: Keys::generate(),
    }
  }

  pub fn pubkey(&self) -> String {
    self.keys.public_key_hex()
  }
}

fn pair_tag(a: &str, b: &str) -> String {
  let (low, high) = if a < b { (a, b) } else { (b, a) };
  sha256::Hash::hash(format!("{low}:{high}").as_bytes()).to_string()
}

#[async_trait]
impl Signer for TestSigner {
  async fn public_key(&self) -> Result<String> {
    Ok(self.pubkey())
  }

  async fn sign_event(&self, unsigned_event_json: &str) -> Result<String> {
    let mut event = Event::from_json(unsigned_event_json)?;
    event.sign(&self.keys)?;
    event.as_json()
  }

  async fn nip44_encrypt(&self, plaintext: &str, peer_pubkey: &str, _: &str) -> Result<String> {
    Ok(format!(
      "{}:{}",
      pair_tag(peer_pubkey, &self.pubkey()),
      hex::encode(plaintext)
    ))
  }

  async fn nip44_decrypt(&self, ciphertext: &str, peer_pubkey: &str, _: &str) -> Result<String> {
    let (tag, body) = ciphertext
      .split_once(':')
      .ok_or_else(|| Error::Malformed("ciphertext without pair tag".to_string()))?;
    if tag != pair_tag(peer_pubkey, &self.pubkey()) {
      return Err(Error::Malformed("ciphertext for another key pair".to_string()));
    }
    let bytes = hex::decode(body).map_err(|err| Error::Malformed(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| Error::Malformed(err.to_string()))
  }

  async fn ephemeral(&self) -> Result<Option<Box<dyn Signer>>> {
    Ok(Some(Box::new(TestSigner::new())))
  }
}
