use serde::{ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::event::Event;

///
/// The `relay -> client` communications.
///
///  - `["EVENT", subscription_id, event_JSON]`: events requested by the client.
///  - `["OK", event_id, accepted, message]`: acceptance of a published event.
///  - `["EOSE", subscription_id]`: End Of Stored Events, what follows arrives in real time.
///  - `["CLOSED", subscription_id, message]`: the relay ended a subscription.
///  - `["NOTICE", message]`: human readable message.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
  Event {
    subscription_id: String,
    event: Box<Event>,
  },
  Ok {
    event_id: String,
    accepted: bool,
    message: String,
  },
  Eose(String),
  Closed {
    subscription_id: String,
    message: String,
  },
  Notice(String),
}

fn invalid(reason: &str) -> Error {
  Error::Malformed(format!("relay message: {reason}"))
}

fn as_text(value: &Value) -> Result<String> {
  value
    .as_str()
    .map(str::to_string)
    .ok_or_else(|| invalid("expected a string"))
}

impl RelayMessage {
  pub fn new_event<S: Into<String>>(subscription_id: S, event: Event) -> Self {
    Self::Event {
      subscription_id: subscription_id.into(),
      event: Box::new(event),
    }
  }

  pub fn new_eose<S: Into<String>>(subscription_id: S) -> Self {
    Self::Eose(subscription_id.into())
  }

  pub fn as_value(&self) -> Value {
    json!(self)
  }

  pub fn from_value(msg: Value) -> Result<Self> {
    let v = msg.as_array().ok_or_else(|| invalid("not an array"))?;

    if v.is_empty() {
      return Err(invalid("empty frame"));
    }

    let v_len = v.len();

    match v[0].as_str() {
      // ["EVENT", <subscription_id>, <event JSON>]
      Some("EVENT") if v_len == 3 => Ok(Self::new_event(
        as_text(&v[1])?,
        Event::from_value(v[2].clone())?,
      )),
      // ["OK", <event_id>, <true|false>, <message>]
      Some("OK") if v_len >= 3 => Ok(Self::Ok {
        event_id: as_text(&v[1])?,
        accepted: v[2]
          .as_bool()
          .ok_or_else(|| invalid("OK status must be a boolean"))?,
        message: match v.get(3) {
          Some(message) => as_text(message)?,
          None => String::new(),
        },
      }),
      // ["EOSE", <subscription_id>]
      Some("EOSE") if v_len == 2 => Ok(Self::new_eose(as_text(&v[1])?)),
      // ["CLOSED", <subscription_id>, <message>]
      Some("CLOSED") if v_len >= 2 => Ok(Self::Closed {
        subscription_id: as_text(&v[1])?,
        message: match v.get(2) {
          Some(message) => as_text(message)?,
          None => String::new(),
        },
      }),
      // ["NOTICE", <message>]
      Some("NOTICE") if v_len == 2 => Ok(Self::Notice(as_text(&v[1])?)),
      _ => Err(invalid("unknown frame")),
    }
  }

  /// Get [`RelayMessage`] as JSON string
  pub fn as_json(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  /// Get [`RelayMessage`] from JSON
  pub fn from_json<S>(msg: S) -> Result<Self>
  where
    S: AsRef<str>,
  {
    let msg = msg.as_ref();

    if msg.is_empty() {
      return Err(invalid("empty frame"));
    }

    let json_value: Value =
      serde_json::from_str(msg).map_err(|err| Error::Malformed(err.to_string()))?;
    Self::from_value(json_value)
  }
}

impl Serialize for RelayMessage {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    match self {
      Self::Event {
        subscription_id,
        event,
      } => {
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element("EVENT")?;
        seq.serialize_element(subscription_id)?;
        seq.serialize_element(event)?;
        seq.end()
      }
      Self::Ok {
        event_id,
        accepted,
        message,
      } => {
        let mut seq = serializer.serialize_seq(Some(4))?;
        seq.serialize_element("OK")?;
        seq.serialize_element(event_id)?;
        seq.serialize_element(accepted)?;
        seq.serialize_element(message)?;
        seq.end()
      }
      Self::Eose(subscription_id) => {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element("EOSE")?;
        seq.serialize_element(subscription_id)?;
        seq.end()
      }
      Self::Closed {
        subscription_id,
        message,
      } => {
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element("CLOSED")?;
        seq.serialize_element(subscription_id)?;
        seq.serialize_element(message)?;
        seq.end()
      }
      Self::Notice(message) => {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element("NOTICE")?;
        seq.serialize_element(message)?;
        seq.end()
      }
    }
  }
}

impl<'de> Deserialize<'de> for RelayMessage {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let json_value = Value::deserialize(deserializer)?;
    Self::from_value(json_value).map_err(serde::de::Error::custom)
  }
}
