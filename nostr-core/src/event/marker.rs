use std::fmt;

/// Holds the types of `<marker>`
/// that an event tag (`"e"`) can have.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
  Root,
  Reply,
  Mention,
}

impl Marker {
  /// Unknown markers are treated as absent.
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "root" => Some(Self::Root),
      "reply" => Some(Self::Reply),
      "mention" => Some(Self::Mention),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Root => "root",
      Self::Reply => "reply",
      Self::Mention => "mention",
    }
  }
}

impl fmt::Display for Marker {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
