use serde::de::Error as DeserializerError;
use serde::{ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, slice};

use crate::error::{Error, Result};

use super::marker::Marker;

/// Well-known tag names. Anything else is `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagKind {
  /// `["p", <pubkey>, <relay-url>]`
  PubKey,
  /// `["e", <event-id>, <relay-url>, <marker>, <author>]`
  ///
  /// where `<marker>` is one of `root`, `reply` or `mention` (NIP-10).
  Event,
  /// `["a", "<kind>:<pubkey>:<d>", <relay-url>]`
  Coordinate,
  /// `["d", <identifier>]` of addressable events.
  Identifier,
  /// `["r", <relay-url>, <"read"|"write">]` of relay lists.
  Relay,
  /// Custom tag
  Custom(String),
}

impl fmt::Display for TagKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::PubKey => write!(f, "p"),
      Self::Event => write!(f, "e"),
      Self::Coordinate => write!(f, "a"),
      Self::Identifier => write!(f, "d"),
      Self::Relay => write!(f, "r"),
      Self::Custom(tag) => write!(f, "{tag}"),
    }
  }
}

impl<S> From<S> for TagKind
where
  S: Into<String>,
{
  fn from(s: S) -> Self {
    let s: String = s.into();
    match s.as_str() {
      "p" => Self::PubKey,
      "e" => Self::Event,
      "a" => Self::Coordinate,
      "d" => Self::Identifier,
      "r" => Self::Relay,
      _ => Self::Custom(s),
    }
  }
}

/// A tag is a non-empty ordered list of strings. Element 0 is the tag
/// name, the rest are positional values whose meaning depends on it.
///
///   `["e", <32-bytes hex of the id of another event>, <recommended relay URL>, <marker>]`
///   ```json
///   ["e", "688787d8ff144c502c7f5cffaafe2cc588d86079f9de88304c26b0cb99ce91c6", "wss://relay.damus.io", "root"]
///   ```
///
/// Nothing is case-folded and equality is element-wise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(Vec<String>);

impl Tag {
  pub fn new<N, I, V>(name: N, values: I) -> Self
  where
    N: Into<String>,
    I: IntoIterator<Item = V>,
    V: Into<String>,
  {
    let mut data = vec![name.into()];
    data.extend(values.into_iter().map(Into::into));
    Self(data)
  }

  pub fn from_vec<S: Into<String>>(data: Vec<S>) -> Result<Self> {
    Self::try_from(data)
  }

  pub fn as_vec(&self) -> &[String] {
    &self.0
  }

  pub fn into_vec(self) -> Vec<String> {
    self.0
  }

  pub fn push<S: Into<String>>(&mut self, value: S) -> &mut Self {
    self.0.push(value.into());
    self
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Always false: a tag carries at least its name.
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.0.get(index).map(String::as_str)
  }

  pub fn name(&self) -> &str {
    &self.0[0]
  }

  pub fn kind(&self) -> TagKind {
    TagKind::from(self.name())
  }

  /// First positional value.
  pub fn content(&self) -> Option<&str> {
    self.get(1)
  }

  /// NIP-10 marker in position 3 of an `e` tag.
  pub fn marker(&self) -> Option<Marker> {
    self.get(3).and_then(Marker::parse)
  }

  /// Element-wise prefix match: `["e", "abc"]` matches every `e` tag
  /// whose first value is `abc`.
  pub fn starts_with(&self, prefix: &[&str]) -> bool {
    prefix.len() <= self.0.len() && prefix.iter().zip(self.0.iter()).all(|(a, b)| *a == b)
  }
}

impl<S> TryFrom<Vec<S>> for Tag
where
  S: Into<String>,
{
  type Error = Error;

  fn try_from(tag: Vec<S>) -> Result<Self> {
    let tag: Vec<String> = tag.into_iter().map(|v| v.into()).collect();
    if tag.is_empty() {
      return Err(Error::Malformed("tag must have a name".to_string()));
    }
    Ok(Self(tag))
  }
}

impl From<Tag> for Vec<String> {
  fn from(data: Tag) -> Self {
    data.0
  }
}

impl Serialize for Tag {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
    for element in self.0.iter() {
      seq.serialize_element(element)?;
    }
    seq.end()
  }
}

impl<'de> Deserialize<'de> for Tag {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    type Data = Vec<String>;
    let vec: Vec<String> = Data::deserialize(deserializer)?;
    Self::try_from(vec).map_err(DeserializerError::custom)
  }
}

/// Ordered list of tags. Duplicates and order are significant, both are
/// part of the signed payload.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<Tag>);

impl Tags {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, tag: Tag) -> &mut Self {
    self.0.push(tag);
    self
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&Tag> {
    self.0.get(index)
  }

  pub fn iter(&self) -> slice::Iter<'_, Tag> {
    self.0.iter()
  }

  pub fn as_slice(&self) -> &[Tag] {
    &self.0
  }

  /// First tag whose leading elements equal `prefix`.
  pub fn find_first(&self, prefix: &[&str]) -> Option<&Tag> {
    self.0.iter().find(|tag| tag.starts_with(prefix))
  }

  /// First tag named `name`.
  pub fn find(&self, name: &str) -> Option<&Tag> {
    self.find_first(&[name])
  }

  /// All tags named `name`, in order.
  pub fn filter<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
    self.0.iter().filter(move |tag| tag.name() == name)
  }

  /// First positional value of the first tag named `name`.
  pub fn first_value(&self, name: &str) -> Option<&str> {
    self
      .0
      .iter()
      .filter(|tag| tag.name() == name)
      .find_map(Tag::content)
  }

  /// Mutable access to the tag at `index`. Positions never change.
  pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Tag> {
    self.0.get_mut(index)
  }
}

impl From<Vec<Tag>> for Tags {
  fn from(tags: Vec<Tag>) -> Self {
    Self(tags)
  }
}

impl From<Tags> for Vec<Tag> {
  fn from(tags: Tags) -> Self {
    tags.0
  }
}

impl FromIterator<Tag> for Tags {
  fn from_iter<T: IntoIterator<Item = Tag>>(iter: T) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<'a> IntoIterator for &'a Tags {
  type Item = &'a Tag;
  type IntoIter = slice::Iter<'a, Tag>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}
