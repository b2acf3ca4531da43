//! The relay connection capability and the helpers that drive it.
//!
//! Sockets, reconnects and pooling live behind [`RelayTransport`]; the
//! core only hands it frames and reads back acknowledgements and events.
use async_trait::async_trait;
use futures_util::future::join_all;
use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::client_to_relay_communication::{new_subscription_id, ClientMessage};
use crate::encoding::short;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::filter::Filter;
use crate::nips::nip65::RelayList;
use crate::relay_to_client_communication::RelayMessage;
use crate::signer::CancellationToken;

/// Relay answer to a published event (`["OK", id, accepted, message]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
  pub event_id: String,
  pub accepted: bool,
  pub message: String,
}

impl TryFrom<RelayMessage> for Ack {
  type Error = Error;

  fn try_from(message: RelayMessage) -> Result<Self> {
    match message {
      RelayMessage::Ok {
        event_id,
        accepted,
        message,
      } => Ok(Self {
        event_id,
        accepted,
        message,
      }),
      other => Err(Error::Malformed(format!("expected an OK frame, got {other:?}"))),
    }
  }
}

#[async_trait]
pub trait RelayTransport: Send + Sync {
  type Session: Send + Sync;

  /// Opens a session to a `ws://` or `wss://` URL.
  async fn connect(&self, url: &str) -> Result<Self::Session>;

  /// Sends `["EVENT", <event>]` and waits for the relay's `OK`.
  async fn publish(&self, session: &Self::Session, signed_event_json: &str) -> Result<Ack>;

  /// Sends `["REQ", <subscription_id>, <filter>...]`. The receiver yields
  /// the event JSON of every matching `EVENT` frame.
  async fn subscribe(
    &self,
    session: &Self::Session,
    subscription_id: &str,
    filters: &[Filter],
  ) -> Result<UnboundedReceiver<String>>;

  /// Sends `["CLOSE", <subscription_id>]`.
  async fn close(&self, session: &Self::Session, subscription_id: &str) -> Result<()>;
}

async fn publish_to<T: RelayTransport>(
  transport: &T,
  url: &str,
  event_json: &str,
  cancel: &CancellationToken,
) -> Result<Ack> {
  cancel.check()?;
  let session = transport.connect(url).await?;
  cancel.check()?;
  let ack = transport.publish(&session, event_json).await?;
  debug!(
    "[transport::publish_to] {url} answered {} for {}",
    ack.accepted,
    short(&ack.event_id)
  );
  Ok(ack)
}

/// Sends `event` to every write relay of `relays` concurrently and
/// returns each relay's outcome in list order. The event must verify.
pub async fn publish_to_write_relays<T: RelayTransport>(
  transport: &T,
  relays: &RelayList,
  event: &Event,
  cancel: &CancellationToken,
) -> Result<Vec<(String, Result<Ack>)>> {
  event.verify()?;
  cancel.check()?;
  let event_json = event.as_json()?;

  let urls: Vec<&str> = relays.write_relays().collect();
  if urls.is_empty() {
    warn!("[transport::publish_to_write_relays] no write relays for {}", short(&event.id));
  }

  let outcomes = join_all(
    urls
      .iter()
      .map(|url| publish_to(transport, url, &event_json, cancel)),
  )
  .await;

  let accepted = outcomes
    .iter()
    .filter(|outcome| matches!(outcome, Ok(ack) if ack.accepted))
    .count();
  info!(
    "[transport::publish_to_write_relays] {} accepted by {accepted}/{} relays",
    short(&event.id),
    urls.len()
  );

  cancel.check()?;
  Ok(
    urls
      .into_iter()
      .map(str::to_string)
      .zip(outcomes)
      .collect(),
  )
}

/// Opens a subscription under a fresh random id.
pub async fn subscribe<T: RelayTransport>(
  transport: &T,
  session: &T::Session,
  filters: &[Filter],
  cancel: &CancellationToken,
) -> Result<(String, UnboundedReceiver<String>)> {
  if filters.is_empty() {
    return Err(Error::Malformed("a subscription needs a filter".to_string()));
  }
  cancel.check()?;
  let subscription_id = new_subscription_id();
  let receiver = transport.subscribe(session, &subscription_id, filters).await?;
  debug!("[transport::subscribe] opened {subscription_id}");
  Ok((subscription_id, receiver))
}

/// Next verified event matching `filters`. Invalid or unrequested events
/// are dropped. `None` once the stream ends.
pub async fn next_event(
  receiver: &mut UnboundedReceiver<String>,
  filters: &[Filter],
  cancel: &CancellationToken,
) -> Result<Option<Event>> {
  loop {
    cancel.check()?;
    let Some(event_json) = receiver.recv().await else {
      return Ok(None);
    };
    let event = match Event::from_json(&event_json) {
      Ok(event) => event,
      Err(err) => {
        warn!("[transport::next_event] dropping unparsable event: {err}");
        continue;
      }
    };
    if let Err(err) = event.verify() {
      warn!("[transport::next_event] dropping {}: {err}", short(&event.id));
      continue;
    }
    if !crate::filter::match_any(filters, &event) {
      debug!("[transport::next_event] {} does not match", short(&event.id));
      continue;
    }
    return Ok(Some(event));
  }
}

/// The frames a transport writes for each call, for implementations that
/// speak the JSON wire protocol directly.
pub fn event_frame(signed_event_json: &str) -> Result<String> {
  ClientMessage::new_event(Event::from_json(signed_event_json)?).as_json()
}

pub fn req_frame(subscription_id: &str, filters: &[Filter]) -> Result<String> {
  ClientMessage::new_req(subscription_id, filters.to_vec()).as_json()
}

pub fn close_frame(subscription_id: &str) -> Result<String> {
  ClientMessage::new_close(subscription_id).as_json()
}
