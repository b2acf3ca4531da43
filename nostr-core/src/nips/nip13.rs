//! NIP-13 proof of work: leading zero bits of the event id, committed
//! through a `["nonce", <nonce>, <target>]` tag.
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::config::Config;
use crate::encoding::{parse_hex32, short};
use crate::error::{Error, Result};
use crate::event::{id, now, tag::Tag, Event};

pub const NONCE_TAG: &str = "nonce";
/// Every bit of a 32-byte id.
pub const MAX_DIFFICULTY: u16 = 256;

/// Leading zero bits, most significant byte first.
pub fn leading_zero_bits(bytes: &[u8]) -> u16 {
  let mut bits: u16 = 0;
  for byte in bytes {
    if *byte == 0 {
      bits += 8;
    } else {
      bits += byte.leading_zeros() as u16;
      break;
    }
  }
  bits
}

pub fn get_difficulty(id_hex: &str) -> Result<u16> {
  Ok(leading_zero_bits(&parse_hex32(id_hex)?))
}

pub fn check_pow(event: &Event, min_difficulty: u16) -> Result<()> {
  let actual = get_difficulty(&event.id)?;
  if actual < min_difficulty {
    return Err(Error::DifficultyTooLow {
      required: min_difficulty,
      actual,
    });
  }
  Ok(())
}

/// Target the author committed to in the third element of the nonce tag.
pub fn committed_target(event: &Event) -> Option<u16> {
  event.tags.find(NONCE_TAG)?.get(2)?.parse().ok()
}

/// Mines `event` until its id has at least `target` leading zero bits.
///
/// An existing nonce tag is reused in place, otherwise one is appended.
/// Only that tag and `created_at` change; `created_at` is refreshed to
/// the current time every `refresh_interval` attempts. The input is left
/// untouched and the result carries no signature.
pub fn mine(event: &Event, target: u16, timeout: Duration, refresh_interval: u64) -> Result<Event> {
  if target > MAX_DIFFICULTY {
    return Err(Error::Malformed(format!(
      "difficulty {target} exceeds {MAX_DIFFICULTY}"
    )));
  }

  let mut mined = event.clone();
  let target_value = target.to_string();
  let nonce_index = match mined.tags.iter().position(|tag| tag.name() == NONCE_TAG) {
    Some(index) => index,
    None => {
      mined.tags.push(Tag::new(NONCE_TAG, ["0"]));
      mined.tags.len() - 1
    }
  };
  if let Some(tag) = mined.tags.get_mut(nonce_index) {
    *tag = Tag::new(NONCE_TAG, ["0", target_value.as_str()]);
  }

  let refresh_interval = refresh_interval.max(1);
  let started = Instant::now();
  info!(
    "[nip13::mine] mining {} to difficulty {target}",
    short(&mined.pubkey)
  );

  let mut nonce: u64 = 0;
  loop {
    if nonce % refresh_interval == 0 {
      if started.elapsed() > timeout {
        warn!("[nip13::mine] gave up after {nonce} attempts");
        return Err(Error::GenerateTimeout);
      }
      mined.created_at = now();
    }

    nonce += 1;
    if let Some(tag) = mined.tags.get_mut(nonce_index) {
      *tag = Tag::new(NONCE_TAG, [nonce.to_string(), target_value.clone()]);
    }

    let candidate = id::EventId::new(
      &mined.pubkey,
      mined.created_at,
      mined.kind,
      &mined.tags,
      &mined.content,
    )?;
    if leading_zero_bits(&candidate.to_bytes()?) >= target {
      info!(
        "[nip13::mine] found {} after {nonce} attempts",
        short(candidate.as_str())
      );
      mined.id = candidate.0;
      mined.sig = None;
      return Ok(mined);
    }
  }
}

/// [`mine`] with the deadline and refresh interval of `config`.
pub fn mine_with_config(event: &Event, target: u16, config: &Config) -> Result<Event> {
  mine(event, target, config.pow_timeout, config.pow_refresh_interval)
}
