//! The dashboard's state and the edits a viewer can make to it.
//!
//! `Dashboard` owns every persisted slot. Each change to the stream list is
//! followed by a reconciliation of the custom sort order, so the order always
//! names exactly the current streams.

use rand::Rng;
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, info};

use crate::auth::{Credentials, TokenSource};
use crate::config::Config;
use crate::model::{SortMode, Stream, StreamInput, StreamPatch, UserPreferences};
use crate::sort::{self, DefaultSort};
use crate::store::{keys, Slot, Store};
use crate::streams::StreamCollection;
use crate::urls::{self, UrlOptions, UrlSource};

/// Rejected edits. The message is meant to be shown to the viewer as is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Please provide a title for the stream.")]
    MissingTitle,
    #[error("Please provide a URL for the stream.")]
    MissingUrl,
    #[error("Please provide a valid URL for the stream: {0}")]
    InvalidUrl(String),
    #[error("Please provide a channel ID.")]
    MissingChannel,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardOptions {
    pub url_options: UrlOptions,
    pub default_sort: DefaultSort,
    /// Origin of the page embedding the players.
    pub page_origin: Option<String>,
}

impl DashboardOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url_options: UrlOptions {
                embed_domain: config.youtube.embed_domain.clone(),
            },
            default_sort: config.sort.default_behavior,
            page_origin: config.youtube.page_origin.clone(),
        }
    }
}

/// A stream as handed to the view: the entry plus its ready-to-load player URL.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamView {
    #[serde(flatten)]
    pub stream: Stream,
    pub player_url: String,
}

/// Everything the view needs in one piece.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub streams: Vec<StreamView>,
    pub channels: Vec<String>,
    pub preferences: UserPreferences,
    pub sort_mode: SortMode,
    pub custom_order: Vec<String>,
    pub signed_in: bool,
}

pub struct Dashboard {
    streams: StreamCollection,
    custom_order: Slot<Vec<String>>,
    sort_mode: Slot<SortMode>,
    preferences: Slot<UserPreferences>,
    channels: Slot<Vec<String>>,
    credentials: Credentials,
    options: DashboardOptions,
}

/// Random identifier for a user-added stream.
pub fn new_stream_id() -> String {
    format!("{:032x}", rand::thread_rng().gen::<u128>())
}

fn validated_url(url: &str) -> Result<&str, InputError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(InputError::MissingUrl);
    }
    Url::parse(trimmed).map_err(|e| InputError::InvalidUrl(e.to_string()))?;
    Ok(trimmed)
}

impl Dashboard {
    pub fn open(store: &Store, options: DashboardOptions) -> Self {
        let mut dashboard = Self {
            streams: StreamCollection::open(store),
            custom_order: store.slot(keys::CUSTOM_SORT_ORDER, Vec::new()),
            sort_mode: store.slot(keys::SORT_MODE, SortMode::default()),
            preferences: store.slot(keys::PREFERENCES, UserPreferences::default()),
            channels: store.slot(keys::CHANNELS, Vec::new()),
            credentials: Credentials::open(store),
            options,
        };
        dashboard.reconcile_custom_order();
        debug!(
            "dashboard: opened with {} stream(s), {} channel(s)",
            dashboard.streams.len(),
            dashboard.channels.get().len()
        );
        dashboard
    }

    pub fn options(&self) -> &DashboardOptions {
        &self.options
    }

    // ── Streams ──────────────────────────────────────────────────────────────

    pub fn streams(&self) -> &[Stream] {
        self.streams.all()
    }

    pub fn stream(&self, id: &str) -> Option<&Stream> {
        self.streams.get(id)
    }

    /// Add a user stream from a title and any supported URL form.
    pub fn add_stream(&mut self, title: &str, url: &str) -> Result<Stream, InputError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(InputError::MissingTitle);
        }
        let url = validated_url(url)?;

        let input = urls::normalize(
            UrlSource::Partial(StreamInput {
                title: Some(title.to_string()),
                original_url: url.to_string(),
                ..Default::default()
            }),
            &self.options.url_options,
        );
        if input.embed_url.is_empty() {
            return Err(InputError::MissingUrl);
        }

        let stream = Stream::new(new_stream_id(), input);
        info!("dashboard: added stream {} ({})", stream.id, stream.title());
        self.streams.add(stream.clone());
        self.reconcile_custom_order();
        Ok(stream)
    }

    /// Point an existing stream at a new URL. Only the three URL fields change.
    ///
    /// A blank URL is ignored (`Ok(false)`), as is an unknown `id`.
    pub fn update_stream_url(&mut self, id: &str, url: &str) -> Result<bool, InputError> {
        if url.trim().is_empty() {
            return Ok(false);
        }
        let url = validated_url(url)?;
        let urls = urls::normalize_url(url, &self.options.url_options);
        if urls.embed_url.is_empty() {
            return Err(InputError::InvalidUrl(url.to_string()));
        }
        let updated = self.streams.update(id, StreamPatch::urls(urls));
        if updated {
            info!("dashboard: updated URL of stream {}", id);
        }
        Ok(updated)
    }

    pub fn remove_stream(&mut self, id: &str) -> bool {
        let removed = self.streams.remove(id);
        if removed {
            info!("dashboard: removed stream {}", id);
            self.reconcile_custom_order();
        }
        removed
    }

    /// Merge freshly resolved channel streams by identity. Results for
    /// channels no longer followed are dropped.
    pub fn merge_channel_streams(&mut self, resolved: Vec<Stream>) -> usize {
        let mut merged = 0;
        for stream in resolved {
            let followed = stream
                .input
                .channel_id
                .as_deref()
                .is_some_and(|id| self.channels.get().iter().any(|c| c == id));
            if !followed {
                debug!("dashboard: dropping result for unfollowed channel {}", stream.id);
                continue;
            }
            self.streams.upsert(stream);
            merged += 1;
        }
        if merged > 0 {
            self.reconcile_custom_order();
        }
        merged
    }

    // ── Ordering ─────────────────────────────────────────────────────────────

    pub fn sort_mode(&self) -> SortMode {
        *self.sort_mode.get()
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort_mode.set(mode);
    }

    pub fn custom_order(&self) -> &[String] {
        self.custom_order.get()
    }

    /// Store a user-arranged order together with the mode to show it in.
    /// The order is reconciled against the current streams first.
    pub fn apply_custom_sort(&mut self, order: &[String], mode: SortMode) {
        let next = sort::reconcile_order(order, self.streams.all());
        self.custom_order.set(next);
        self.sort_mode.set(mode);
    }

    /// Streams in display order. A focused stream, if present, comes first.
    pub fn ordered_streams(&self, focused: Option<&str>) -> Vec<Stream> {
        let mut ordered = sort::sorted_streams(
            self.streams.all(),
            self.sort_mode(),
            self.custom_order(),
            self.options.default_sort,
        );
        if let Some(pos) = focused.and_then(|id| ordered.iter().position(|s| s.id == id)) {
            let stream = ordered.remove(pos);
            ordered.insert(0, stream);
        }
        ordered
    }

    pub fn ordered_views(&self, focused: Option<&str>) -> Vec<StreamView> {
        let origin = self.options.page_origin.as_deref();
        self.ordered_streams(focused)
            .into_iter()
            .map(|stream| {
                let player_url = urls::player_url(&stream.input.embed_url, origin);
                StreamView { stream, player_url }
            })
            .collect()
    }

    fn reconcile_custom_order(&mut self) {
        let streams = self.streams.all();
        if self
            .custom_order
            .update_if_changed(|current| sort::reconcile_order(current, streams))
        {
            debug!("dashboard: custom order reconciled");
        }
    }

    // ── Preferences ──────────────────────────────────────────────────────────

    pub fn preferences(&self) -> &UserPreferences {
        self.preferences.get()
    }

    pub fn save_preferences(&mut self, preferences: &UserPreferences) {
        self.preferences.set(preferences.trimmed());
    }

    // ── Channels ─────────────────────────────────────────────────────────────

    pub fn channels(&self) -> &[String] {
        self.channels.get()
    }

    /// Follow a channel. `Ok(false)` if it was already followed.
    pub fn follow_channel(&mut self, channel_id: &str) -> Result<bool, InputError> {
        let channel_id = channel_id.trim();
        if channel_id.is_empty() {
            return Err(InputError::MissingChannel);
        }
        if self.channels.get().iter().any(|c| c == channel_id) {
            return Ok(false);
        }
        self.channels.update(|prev| {
            let mut next = prev.clone();
            next.push(channel_id.to_string());
            next
        });
        info!("dashboard: following channel {}", channel_id);
        Ok(true)
    }

    /// Stop following a channel and drop the stream derived from it.
    pub fn unfollow_channel(&mut self, channel_id: &str) -> bool {
        let channel_id = channel_id.trim();
        let followed = self
            .channels
            .update_if_changed(|prev| prev.iter().filter(|c| *c != channel_id).cloned().collect());

        let derived = self
            .streams
            .get(channel_id)
            .is_some_and(|s| s.input.channel_id.as_deref() == Some(channel_id));
        if derived {
            self.remove_stream(channel_id);
        }
        if followed {
            info!("dashboard: unfollowed channel {}", channel_id);
        }
        followed
    }

    // ── Token ────────────────────────────────────────────────────────────────

    pub fn set_token(&mut self, token: &str, expires_at_ms: i64) {
        self.credentials.set(token, expires_at_ms);
        info!("dashboard: token stored");
    }

    pub fn clear_token(&mut self) {
        self.credentials.clear();
    }

    pub fn is_signed_in(&mut self) -> bool {
        self.token().is_some()
    }

    pub fn snapshot(&mut self, focused: Option<&str>) -> Snapshot {
        Snapshot {
            streams: self.ordered_views(focused),
            channels: self.channels().to_vec(),
            preferences: self.preferences().clone(),
            sort_mode: self.sort_mode(),
            custom_order: self.custom_order().to_vec(),
            signed_in: self.is_signed_in(),
        }
    }
}

impl TokenSource for Dashboard {
    fn token(&mut self) -> Option<String> {
        self.credentials.token()
    }
}
