//! NIP-10 reply threading over `e` and `p` tags.
use log::debug;

use crate::encoding::{is_hex_of_len, short};
use crate::error::{Error, Result};
use crate::event::{marker::Marker, tag::Tag, tag::Tags, Event};

use super::nip01::{e_tag, p_tag};

/// Where an event sits in a thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadContext {
  pub root_id: Option<String>,
  /// Direct parent. Equal to `root_id` when replying to the root.
  pub reply_id: Option<String>,
  pub root_relay: Option<String>,
  pub reply_relay: Option<String>,
  /// Ids of `e` tags that are neither root nor reply.
  pub mentions: Vec<String>,
}

fn relay_hint(tag: &Tag) -> Option<String> {
  tag.get(2).filter(|relay| !relay.is_empty()).map(str::to_string)
}

fn from_marked(e_tags: &[&Tag]) -> ThreadContext {
  let mut context = ThreadContext::default();

  for tag in e_tags {
    let Some(id) = tag.content() else { continue };
    match tag.marker() {
      Some(Marker::Root) if context.root_id.is_none() => {
        context.root_id = Some(id.to_string());
        context.root_relay = relay_hint(tag);
      }
      Some(Marker::Reply) if context.reply_id.is_none() => {
        context.reply_id = Some(id.to_string());
        context.reply_relay = relay_hint(tag);
      }
      Some(Marker::Root) | Some(Marker::Reply) => {}
      Some(Marker::Mention) | None => context.mentions.push(id.to_string()),
    }
  }

  if context.reply_id.is_none() {
    context.reply_id = context.root_id.clone();
    context.reply_relay = context.root_relay.clone();
  }
  context
}

/// Positional convention: first is root, last is the direct parent.
fn from_positional(e_tags: &[&Tag]) -> ThreadContext {
  let with_id: Vec<&Tag> = e_tags.iter().copied().filter(|tag| tag.content().is_some()).collect();
  let (Some(first), Some(last)) = (with_id.first(), with_id.last()) else {
    return ThreadContext::default();
  };

  let mentions = match with_id.len() {
    0..=2 => Vec::new(),
    n => with_id[1..n - 1]
      .iter()
      .filter_map(|tag| tag.content().map(str::to_string))
      .collect(),
  };

  ThreadContext {
    root_id: first.content().map(str::to_string),
    reply_id: last.content().map(str::to_string),
    root_relay: relay_hint(first),
    reply_relay: relay_hint(last),
    mentions,
  }
}

/// Root and direct parent of `event`. `NoThreadContext` when the event
/// has no usable `e` tags.
pub fn parse_thread(event: &Event) -> Result<ThreadContext> {
  let e_tags: Vec<&Tag> = event.tags.filter("e").collect();
  let marked = e_tags.iter().any(|tag| tag.marker().is_some());

  let context = if marked {
    from_marked(&e_tags)
  } else {
    from_positional(&e_tags)
  };

  if context.root_id.is_none() && context.reply_id.is_none() {
    return Err(Error::NoThreadContext);
  }
  Ok(context)
}

/// Pubkeys a reply to `parent` must tag: the parent author first, then
/// every `p` of the parent, de-duplicated in order of first appearance.
/// `exclude` (usually the replying author) is left out, and so are `p`
/// values that are not 32-byte hex keys.
pub fn reply_participants(parent: &Event, exclude: Option<&str>) -> Vec<String> {
  let mut participants: Vec<String> = Vec::new();
  let candidates = std::iter::once(parent.pubkey.as_str())
    .chain(parent.tags.filter("p").filter_map(Tag::content));

  for pubkey in candidates {
    if !is_hex_of_len(pubkey, 64) {
      debug!(
        "[nip10::reply_participants] skipping invalid p {:?} in {}",
        pubkey,
        short(&parent.id)
      );
      continue;
    }
    if Some(pubkey) == exclude || participants.iter().any(|known| known == pubkey) {
      continue;
    }
    participants.push(pubkey.to_string());
  }
  participants
}

/// Tags for a reply to `parent`.
///
/// When `parent` is itself part of a thread the reply points at the
/// thread root (`root` marker) and at `parent` (`reply` marker);
/// otherwise `parent` becomes the root. The `p` tags follow
/// [`reply_participants`].
pub fn build_reply_tags(
  parent: &Event,
  relay: Option<&str>,
  author: Option<&str>,
) -> Result<Tags> {
  let mut tags = Tags::new();
  let relay_or_empty = relay.unwrap_or("");

  match parse_thread(parent) {
    Ok(ThreadContext {
      root_id: Some(root_id),
      root_relay,
      ..
    }) if is_hex_of_len(&root_id, 64) => {
      let mut root = e_tag(&root_id, Some(root_relay.as_deref().unwrap_or("")), None)?;
      root.push(Marker::Root.as_str());
      tags.push(root);

      let mut reply = e_tag(&parent.id, Some(relay_or_empty), None)?;
      reply.push(Marker::Reply.as_str());
      tags.push(reply);
    }
    _ => {
      let mut root = e_tag(&parent.id, Some(relay_or_empty), None)?;
      root.push(Marker::Root.as_str());
      tags.push(root);
    }
  }

  for pubkey in reply_participants(parent, author) {
    tags.push(p_tag(&pubkey, None)?);
  }
  Ok(tags)
}
