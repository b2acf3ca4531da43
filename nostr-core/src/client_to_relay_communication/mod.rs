/// The three types of `client -> relay` communications.
///
///  - `["EVENT", event_JSON]`: used to publish events
///
///  - `["REQ", subscription_id, filters_JSON...]`: used to request events and subscribe to new updates.
///       A REQ message may contain multiple filters. In this case, events that match any of the filters are to be returned,
///       i.e., multiple filters are to be interpreted as `||` conditions.
///
///  - `["CLOSE", subscription_id]`: used to stop previous subscriptions. `subscription_id` is a random string used to represent a subscription.
///
use serde::{ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::event::Event;
use crate::filter::Filter;

/// Random subscription id for a new `REQ`.
pub fn new_subscription_id() -> String {
  Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
  Event(Box<Event>),
  Req {
    subscription_id: String,
    filters: Vec<Filter>,
  },
  Close(String),
}

fn invalid(reason: &str) -> Error {
  Error::Malformed(format!("client message: {reason}"))
}

fn as_subscription_id(value: &Value) -> Result<String> {
  value
    .as_str()
    .map(str::to_string)
    .ok_or_else(|| invalid("subscription id must be a string"))
}

impl ClientMessage {
  pub fn new_event(event: Event) -> Self {
    Self::Event(Box::new(event))
  }

  pub fn new_req<S: Into<String>>(subscription_id: S, filters: Vec<Filter>) -> Self {
    Self::Req {
      subscription_id: subscription_id.into(),
      filters,
    }
  }

  pub fn new_close<S: Into<String>>(subscription_id: S) -> Self {
    Self::Close(subscription_id.into())
  }

  /// Serialize as [`Value`]
  pub fn as_value(&self) -> Value {
    json!(self)
  }

  /// Deserialize from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self> {
    let v = msg.as_array().ok_or_else(|| invalid("not an array"))?;

    if v.is_empty() {
      return Err(invalid("empty frame"));
    }

    let v_len: usize = v.len();

    match v[0].as_str() {
      // ["EVENT", <event JSON>]
      Some("EVENT") if v_len == 2 => {
        let event = Event::from_value(v[1].clone())?;
        Ok(Self::new_event(event))
      }
      // ["REQ", <subscription_id>, <filter JSON>, <filter JSON>...]
      Some("REQ") if v_len >= 3 => {
        let subscription_id = as_subscription_id(&v[1])?;
        let filters = v[2..]
          .iter()
          .map(|filter| {
            serde_json::from_value(filter.clone()).map_err(|err| Error::Malformed(err.to_string()))
          })
          .collect::<Result<Vec<Filter>>>()?;
        Ok(Self::new_req(subscription_id, filters))
      }
      // ["CLOSE", <subscription_id>]
      Some("CLOSE") if v_len == 2 => Ok(Self::new_close(as_subscription_id(&v[1])?)),
      _ => Err(invalid("unknown frame")),
    }
  }

  /// Get the frame as JSON string. Event fields keep their declared order.
  pub fn as_json(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  /// Deserialize [`ClientMessage`] from JSON string
  pub fn from_json<S>(msg: S) -> Result<Self>
  where
    S: AsRef<str>,
  {
    let msg = msg.as_ref();

    if msg.is_empty() {
      return Err(invalid("empty frame"));
    }

    let value: Value = serde_json::from_str(msg).map_err(|err| Error::Malformed(err.to_string()))?;
    Self::from_value(value)
  }
}

impl Serialize for ClientMessage {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    match self {
      Self::Event(event) => {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element("EVENT")?;
        seq.serialize_element(event)?;
        seq.end()
      }
      Self::Req {
        subscription_id,
        filters,
      } => {
        let mut seq = serializer.serialize_seq(Some(2 + filters.len()))?;
        seq.serialize_element("REQ")?;
        seq.serialize_element(subscription_id)?;
        for filter in filters.iter() {
          seq.serialize_element(filter)?;
        }
        seq.end()
      }
      Self::Close(subscription_id) => {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element("CLOSE")?;
        seq.serialize_element(subscription_id)?;
        seq.end()
      }
    }
  }
}

impl<'de> Deserialize<'de> for ClientMessage {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let json_value = Value::deserialize(deserializer)?;
    Self::from_value(json_value).map_err(serde::de::Error::custom)
  }
}
