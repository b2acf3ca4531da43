//! NIP-65 relay list metadata (kind 10002).
use std::fmt;

use log::{debug, warn};
use url::Url;

use crate::encoding::short;
use crate::error::{Error, Result};
use crate::event::{kind::Kind, tag::Tag, tag::Tags, Event, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayPermission {
  #[default]
  ReadWrite,
  Read,
  Write,
}

impl RelayPermission {
  /// Absent or unknown markers mean both directions.
  pub fn from_marker(marker: Option<&str>) -> Self {
    match marker {
      Some("read") => Self::Read,
      Some("write") => Self::Write,
      _ => Self::ReadWrite,
    }
  }

  pub fn marker(&self) -> Option<&'static str> {
    match self {
      Self::ReadWrite => None,
      Self::Read => Some("read"),
      Self::Write => Some("write"),
    }
  }

  pub fn is_readable(&self) -> bool {
    matches!(self, Self::ReadWrite | Self::Read)
  }

  pub fn is_writable(&self) -> bool {
    matches!(self, Self::ReadWrite | Self::Write)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEntry {
  pub url: String,
  pub permission: RelayPermission,
}

impl RelayEntry {
  fn to_tag(&self) -> Tag {
    let mut tag = Tag::new("r", [self.url.as_str()]);
    if let Some(marker) = self.permission.marker() {
      tag.push(marker);
    }
    tag
  }
}

impl fmt::Display for RelayEntry {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self.permission.marker() {
      Some(marker) => write!(f, "{} ({marker})", self.url),
      None => write!(f, "{}", self.url),
    }
  }
}

/// Lowercases scheme and host, drops query, fragment and a trailing
/// slash. Only `ws://` and `wss://` are accepted.
///
/// Default ports are dropped as well (`wss://host:443` becomes
/// `wss://host`), following WHATWG URL parsing, so both spellings of
/// the same relay collapse to one entry.
pub fn normalize_url(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  let url = Url::parse(trimmed).map_err(|err| Error::InvalidUrl(format!("{trimmed}: {err}")))?;

  match url.scheme() {
    "ws" | "wss" => {}
    other => {
      return Err(Error::InvalidUrl(format!(
        "{trimmed}: unsupported scheme {other}"
      )))
    }
  }

  let host = url
    .host_str()
    .filter(|host| !host.is_empty())
    .ok_or_else(|| Error::InvalidUrl(format!("{trimmed}: missing host")))?;

  let mut normalized = format!("{}://{}", url.scheme(), host);
  if let Some(port) = url.port() {
    normalized.push_str(&format!(":{port}"));
  }

  let path = url.path();
  let path = path.strip_suffix('/').unwrap_or(path);
  normalized.push_str(path);

  Ok(normalized)
}

pub fn is_valid_relay_url(raw: &str) -> bool {
  normalize_url(raw).is_ok()
}

/// Ordered, de-duplicated list of relays keyed by normalized URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayList {
  entries: Vec<RelayEntry>,
}

impl RelayList {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends `url`, or updates its permission when already listed.
  pub fn add(&mut self, url: &str, permission: RelayPermission) -> Result<&mut Self> {
    let url = normalize_url(url)?;
    match self.entries.iter_mut().find(|entry| entry.url == url) {
      Some(entry) => entry.permission = permission,
      None => self.entries.push(RelayEntry { url, permission }),
    }
    Ok(self)
  }

  /// `false` when the URL was not listed (or cannot be normalized).
  pub fn remove(&mut self, url: &str) -> bool {
    let Ok(url) = normalize_url(url) else {
      return false;
    };
    let before = self.entries.len();
    self.entries.retain(|entry| entry.url != url);
    self.entries.len() != before
  }

  pub fn find(&self, url: &str) -> Option<&RelayEntry> {
    let url = normalize_url(url).ok()?;
    self.entries.iter().find(|entry| entry.url == url)
  }

  pub fn entries(&self) -> &[RelayEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn read_relays(&self) -> impl Iterator<Item = &str> {
    self
      .entries
      .iter()
      .filter(|entry| entry.permission.is_readable())
      .map(|entry| entry.url.as_str())
  }

  pub fn write_relays(&self) -> impl Iterator<Item = &str> {
    self
      .entries
      .iter()
      .filter(|entry| entry.permission.is_writable())
      .map(|entry| entry.url.as_str())
  }

  pub fn to_tags(&self) -> Tags {
    self.entries.iter().map(RelayEntry::to_tag).collect()
  }

  /// Unsigned kind 10002 event carrying the list.
  pub fn create_event(&self, pubkey: &str, created_at: Timestamp) -> Result<Event> {
    Event::new_without_signature(pubkey, created_at, Kind::RelayList, self.to_tags(), "")
  }

  /// Rewrites `event` in place: kind 10002, empty content, tags
  /// regenerated from the list. The previous signature is dropped.
  pub fn update_event(&self, event: &mut Event) -> Result<()> {
    event.kind = Kind::RelayList;
    event.content.clear();
    event.tags = self.to_tags();
    event.update_id()
  }

  /// Reads every `r` tag. Tags with a missing or invalid URL are skipped.
  pub fn from_event(event: &Event) -> Result<Self> {
    if event.kind != Kind::RelayList {
      return Err(Error::NotRelayList(event.kind.as_u32()));
    }

    let mut list = Self::new();
    for tag in event.tags.filter("r") {
      let Some(url) = tag.content() else {
        debug!("[RelayList::from_event] r tag without url in {}", short(&event.id));
        continue;
      };
      let permission = RelayPermission::from_marker(tag.get(2));
      if let Err(err) = list.add(url, permission) {
        warn!("[RelayList::from_event] skipping relay: {err}");
      }
    }
    Ok(list)
  }
}
