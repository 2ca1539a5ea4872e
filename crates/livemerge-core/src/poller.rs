//! Resolution of followed channels into stream entries.
//!
//! Each channel moves through an explicit state machine:
//!
//!   Idle -> Pending -> Resolved(stream) | Failed
//!   Resolved -> Pending            (forced reload only)
//!   Failed -> Pending              (next poll)
//!   any -> Idle                    (cancelled on unfollow)
//!
//! Requests carry a ticket; a completion whose ticket is no longer the
//! pending one (superseded by a forced reload, or cancelled) is discarded.

use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::model::{Stream, StreamInput};
use crate::urls::{StreamUrls, UrlOptions};
use crate::youtube::{self, LiveVideo};

/// The two platform lookups needed to resolve a channel.
pub trait ChannelLookup: Send + Sync {
    fn live_video(
        &self,
        channel_id: &str,
        token: &str,
    ) -> impl Future<Output = youtube::Result<Option<LiveVideo>>> + Send;

    fn channel_title(
        &self,
        channel_id: &str,
        token: &str,
    ) -> impl Future<Output = youtube::Result<Option<String>>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Idle,
    Pending {
        ticket: u64,
    },
    Resolved(Stream),
    Failed,
}

#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Requested { ticket: u64, force: bool },
    Succeeded { ticket: u64, stream: Stream },
    Failed { ticket: u64 },
    Cancelled,
}

/// Next state for `event`, or `None` when the event is ignored.
///
/// A `Requested` event that yields `Some` means a lookup must be dispatched.
pub fn transition(state: &ChannelState, event: ChannelEvent) -> Option<ChannelState> {
    use ChannelState as S;

    match (state, event) {
        (_, ChannelEvent::Cancelled) => Some(S::Idle),

        (S::Idle | S::Failed, ChannelEvent::Requested { ticket, .. }) => {
            Some(S::Pending { ticket })
        }
        (S::Pending { .. } | S::Resolved(_), ChannelEvent::Requested { ticket, force: true }) => {
            Some(S::Pending { ticket })
        }
        (S::Pending { .. } | S::Resolved(_), ChannelEvent::Requested { force: false, .. }) => None,

        (S::Pending { ticket: current }, ChannelEvent::Succeeded { ticket, stream })
            if *current == ticket =>
        {
            Some(S::Resolved(stream))
        }
        (S::Pending { ticket: current }, ChannelEvent::Failed { ticket }) if *current == ticket => {
            Some(S::Failed)
        }

        // Stale completion: superseded or cancelled.
        (_, ChannelEvent::Succeeded { .. } | ChannelEvent::Failed { .. }) => None,
    }
}

/// Resolve one channel: its live broadcast if there is one, otherwise an
/// offline placeholder titled with the channel's display name.
pub async fn resolve_channel<L: ChannelLookup>(
    lookup: &L,
    channel_id: &str,
    token: &str,
    url_options: &UrlOptions,
) -> youtube::Result<Stream> {
    if let Some(video) = lookup.live_video(channel_id, token).await? {
        info!(
            "poller: channel {} is live with video {}",
            channel_id, video.video_id
        );
        let urls = StreamUrls::for_video(&video.video_id, url_options);
        let title = if video.channel_title.is_empty() {
            fallback_title(channel_id)
        } else {
            video.channel_title
        };
        return Ok(channel_stream(channel_id, title, urls, true));
    }

    let title = match lookup.channel_title(channel_id, token).await {
        Ok(Some(title)) => title,
        Ok(None) => fallback_title(channel_id),
        Err(e) => {
            warn!("poller: channel info lookup failed for {}: {}", channel_id, e);
            fallback_title(channel_id)
        }
    };
    info!("poller: channel {} is offline ({})", channel_id, title);
    Ok(channel_stream(channel_id, title, StreamUrls::default(), false))
}

fn fallback_title(channel_id: &str) -> String {
    format!("Channel {channel_id}")
}

fn channel_stream(channel_id: &str, title: String, urls: StreamUrls, is_live: bool) -> Stream {
    Stream {
        id: channel_id.to_string(),
        input: StreamInput {
            title: Some(title),
            original_url: urls.original_url,
            embed_url: urls.embed_url,
            chat_url: urls.chat_url,
            channel_id: Some(channel_id.to_string()),
        },
        is_live: Some(is_live),
    }
}

/// Per-channel state map plus the lookups to drive it.
pub struct ChannelPoller<L> {
    lookup: L,
    url_options: UrlOptions,
    states: Mutex<HashMap<String, ChannelState>>,
    next_ticket: AtomicU64,
}

impl<L: ChannelLookup> ChannelPoller<L> {
    pub fn new(lookup: L, url_options: UrlOptions) -> Self {
        Self {
            lookup,
            url_options,
            states: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(1),
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, ChannelState>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self, channel_id: &str) -> ChannelState {
        self.states().get(channel_id).cloned().unwrap_or_default()
    }

    /// Apply `event`; returns whether it was accepted.
    fn apply(&self, channel_id: &str, event: ChannelEvent) -> bool {
        let mut states = self.states();
        let current = states.get(channel_id).cloned().unwrap_or_default();
        match transition(&current, event) {
            Some(ChannelState::Idle) => {
                states.remove(channel_id);
                true
            }
            Some(next) => {
                states.insert(channel_id.to_string(), next);
                true
            }
            None => false,
        }
    }

    /// Forget a channel. A resolution still in flight for it is discarded
    /// when it completes.
    pub fn cancel(&self, channel_id: &str) {
        if self.apply(channel_id, ChannelEvent::Cancelled) {
            debug!("poller: cancelled {}", channel_id);
        }
    }

    /// Resolve `channel_id` unless it is already pending or resolved (and
    /// `force` is not set). `None` when skipped, failed or superseded.
    pub async fn resolve(&self, channel_id: &str, token: &str, force: bool) -> Option<Stream> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        if !self.apply(channel_id, ChannelEvent::Requested { ticket, force }) {
            debug!("poller: {} already pending or resolved, skipping", channel_id);
            return None;
        }

        match resolve_channel(&self.lookup, channel_id, token, &self.url_options).await {
            Ok(stream) => {
                let accepted = self.apply(
                    channel_id,
                    ChannelEvent::Succeeded {
                        ticket,
                        stream: stream.clone(),
                    },
                );
                if !accepted {
                    debug!("poller: dropping stale result for {}", channel_id);
                    return None;
                }
                Some(stream)
            }
            Err(e) => {
                warn!("poller: failed to resolve channel {}: {}", channel_id, e);
                self.apply(channel_id, ChannelEvent::Failed { ticket });
                None
            }
        }
    }

    /// Resolve every channel concurrently. Without a token nothing happens.
    pub async fn poll(&self, channels: &[String], token: Option<&str>, force: bool) -> Vec<Stream> {
        let Some(token) = token else {
            debug!("poller: no valid token, deferring {} channel(s)", channels.len());
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let requests = channels
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .map(|id| self.resolve(id, token, force));

        join_all(requests).await.into_iter().flatten().collect()
    }
}
