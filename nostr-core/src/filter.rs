use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, Error as DeserializerError};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::event::{kind::Kind, Event, PubKey, Timestamp};

///
/// Filters are data structures that clients send to relays (being the first on the first connection)
/// to request data from other clients.
/// The attributes of a Filter work as `&&` (in other words, all the conditions set must be present
/// in the event in order to pass the filter).
/// P.S.: a "REQ" communication from the client can have multiple filters. In this case, all filters will be
/// used as `||` operator: anything that matches any of the filters will be sent.
///
/// - ids: a list of event ids or prefixes
/// - authors: a list of publickeys or prefixes, the pubkey of an event must be one of these
/// - kinds: a list of kind numbers
/// - generic_tags: for a single letter `x`, the values accepted in position 1 of an `x` tag (`#x` on the wire)
/// - since: a timestamp. Events must be at least this old to pass
/// - until: a timestamp. Events must be at most this old to pass
/// - limit: maximum number of events to be returned in the initial query (it can be ignored afterwards)
///
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Filter {
  pub ids: Option<Vec<String>>,
  pub authors: Option<Vec<PubKey>>,
  pub kinds: Option<Vec<Kind>>,
  pub generic_tags: BTreeMap<char, Vec<String>>,
  pub since: Option<Timestamp>,
  pub until: Option<Timestamp>,
  pub limit: Option<u64>,
}

impl Filter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every present field must match, any value within a field may.
  pub fn matches(&self, event: &Event) -> bool {
    if let Some(ids) = &self.ids {
      if !ids.iter().any(|prefix| event.id.starts_with(prefix.as_str())) {
        return false;
      }
    }

    if let Some(authors) = &self.authors {
      if !authors
        .iter()
        .any(|prefix| event.pubkey.starts_with(prefix.as_str()))
      {
        return false;
      }
    }

    if let Some(kinds) = &self.kinds {
      if !kinds.contains(&event.kind) {
        return false;
      }
    }

    for (letter, values) in self.generic_tags.iter() {
      let name = letter.to_string();
      let hit = event.tags.filter(&name).any(|tag| {
        tag
          .content()
          .map(|value| values.iter().any(|v| v == value))
          .unwrap_or(false)
      });
      if !hit {
        return false;
      }
    }

    if let Some(since) = self.since {
      if event.created_at < since {
        return false;
      }
    }

    if let Some(until) = self.until {
      if event.created_at > until {
        return false;
      }
    }

    true
  }

  pub fn as_json(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn from_json(data: &str) -> Result<Self> {
    serde_json::from_str(data).map_err(|err| Error::Malformed(err.to_string()))
  }
}

/// True when `event` matches at least one of `filters`, as relays
/// evaluate the filters of a single `REQ`.
pub fn match_any(filters: &[Filter], event: &Event) -> bool {
  filters.iter().any(|filter| filter.matches(event))
}

impl Serialize for Filter {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    // Only present keys are written
    let mut map = serializer.serialize_map(None)?;
    if let Some(ids) = &self.ids {
      map.serialize_entry("ids", ids)?;
    }
    if let Some(authors) = &self.authors {
      map.serialize_entry("authors", authors)?;
    }
    if let Some(kinds) = &self.kinds {
      map.serialize_entry("kinds", kinds)?;
    }
    for (letter, values) in self.generic_tags.iter() {
      map.serialize_entry(&format!("#{letter}"), values)?;
    }
    if let Some(since) = self.since {
      map.serialize_entry("since", &since)?;
    }
    if let Some(until) = self.until {
      map.serialize_entry("until", &until)?;
    }
    if let Some(limit) = self.limit {
      map.serialize_entry("limit", &limit)?;
    }
    map.end()
  }
}

fn take_field<T, E>(data: &mut BTreeMap<String, Value>, key: &str) -> std::result::Result<Option<T>, E>
where
  T: DeserializeOwned,
  E: DeserializerError,
{
  match data.remove(key) {
    None | Some(Value::Null) => Ok(None),
    Some(value) => serde_json::from_value(value)
      .map(Some)
      .map_err(|err| E::custom(format!("{key}: {err}"))),
  }
}

impl<'de> Deserialize<'de> for Filter {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let mut data: BTreeMap<String, Value> = BTreeMap::deserialize(deserializer)?;

    let mut filter = Filter {
      ids: take_field::<_, D::Error>(&mut data, "ids")?,
      authors: take_field::<_, D::Error>(&mut data, "authors")?,
      kinds: take_field::<_, D::Error>(&mut data, "kinds")?,
      since: take_field::<_, D::Error>(&mut data, "since")?,
      until: take_field::<_, D::Error>(&mut data, "until")?,
      limit: take_field::<_, D::Error>(&mut data, "limit")?,
      ..Default::default()
    };

    // `#x` selectors, anything else is ignored
    let keys: Vec<String> = data.keys().cloned().collect();
    for key in keys {
      let mut chars = key.chars();
      if let (Some('#'), Some(letter), None) = (chars.next(), chars.next(), chars.next()) {
        if let Some(values) = take_field::<Vec<String>, D::Error>(&mut data, &key)? {
          filter.generic_tags.insert(letter, values);
        }
      }
    }

    Ok(filter)
  }
}

///
/// Accumulates constraints and hands out independent [`Filter`] copies.
///
/// ```
/// use nostr_core::{FilterBuilder, Kind};
///
/// let filter = FilterBuilder::new()
///   .kinds([Kind::TextNote])
///   .pubkeys(["614a695bab54e8dc98946abdb8ec019599ece6dada0c23890977d0fa128081d6"])
///   .limit(10)
///   .build();
/// assert_eq!(filter.limit, Some(10));
/// ```
#[derive(Debug, Default, Clone)]
pub struct FilterBuilder {
  filter: Filter,
}

fn extend_field<I, S>(field: &mut Option<Vec<String>>, values: I)
where
  I: IntoIterator<Item = S>,
  S: Into<String>,
{
  field
    .get_or_insert_with(Vec::new)
    .extend(values.into_iter().map(Into::into));
}

impl FilterBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn ids<I, S>(&mut self, ids: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    extend_field(&mut self.filter.ids, ids);
    self
  }

  pub fn authors<I, S>(&mut self, authors: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    extend_field(&mut self.filter.authors, authors);
    self
  }

  pub fn kinds<I>(&mut self, kinds: I) -> &mut Self
  where
    I: IntoIterator<Item = Kind>,
  {
    self.filter.kinds.get_or_insert_with(Vec::new).extend(kinds);
    self
  }

  /// Values for the `#x` selector of a single-letter tag.
  pub fn tag<I, S>(&mut self, letter: char, values: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self
      .filter
      .generic_tags
      .entry(letter)
      .or_default()
      .extend(values.into_iter().map(Into::into));
    self
  }

  /// `#e`
  pub fn events<I, S>(&mut self, ids: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.tag('e', ids)
  }

  /// `#p`
  pub fn pubkeys<I, S>(&mut self, pubkeys: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.tag('p', pubkeys)
  }

  /// `#a`, coordinates as `kind:pubkey:d`.
  pub fn coordinates<I, S>(&mut self, coordinates: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.tag('a', coordinates)
  }

  pub fn since(&mut self, since: Timestamp) -> &mut Self {
    self.filter.since = Some(since);
    self
  }

  pub fn until(&mut self, until: Timestamp) -> &mut Self {
    self.filter.until = Some(until);
    self
  }

  pub fn limit(&mut self, limit: u64) -> &mut Self {
    self.filter.limit = Some(limit);
    self
  }

  /// A deep copy, later builder calls do not affect it.
  pub fn build(&self) -> Filter {
    self.filter.clone()
  }
}
