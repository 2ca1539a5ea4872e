use serde::{Deserialize, Serialize};

/// Stream data as authored by the user (or derived from a channel) before an
/// identity is assigned.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub original_url: String,
    #[serde(default)]
    pub embed_url: String,
    #[serde(default)]
    pub chat_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

/// One watchable entry of the grid.
///
/// `id` is random for user-added streams and equal to the channel ID for
/// channel-derived ones, so re-resolving a channel replaces its entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub id: String,
    #[serde(flatten)]
    pub input: StreamInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,
}

impl Stream {
    pub fn new(id: impl Into<String>, input: StreamInput) -> Self {
        Self {
            id: id.into(),
            input,
            is_live: None,
        }
    }

    /// Title used for display and ordering; missing titles sort as empty.
    pub fn title(&self) -> &str {
        self.input.title.as_deref().unwrap_or_default()
    }

    pub fn is_channel_derived(&self) -> bool {
        self.input.channel_id.is_some()
    }

    /// Merge the fields present in `patch`; everything else is left alone.
    pub fn apply(&mut self, patch: StreamPatch) {
        if let Some(original_url) = patch.original_url {
            self.input.original_url = original_url;
        }
        if let Some(embed_url) = patch.embed_url {
            self.input.embed_url = embed_url;
        }
        if let Some(chat_url) = patch.chat_url {
            self.input.chat_url = chat_url;
        }
        if let Some(is_live) = patch.is_live {
            self.is_live = Some(is_live);
        }
    }
}

/// Partial update for an existing stream. Title and id are not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPatch {
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub chat_url: Option<String>,
    #[serde(default)]
    pub is_live: Option<bool>,
}

impl StreamPatch {
    /// Patch replacing all three URL fields at once.
    pub fn urls(urls: crate::urls::StreamUrls) -> Self {
        Self {
            original_url: Some(urls.original_url),
            embed_url: Some(urls.embed_url),
            chat_url: Some(urls.chat_url),
            is_live: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub favorite_category: String,
    #[serde(default)]
    pub auto_join: bool,
}

impl UserPreferences {
    /// Trimmed copy, as saved from the setup form.
    pub fn trimmed(&self) -> Self {
        Self {
            display_name: self.display_name.trim().to_string(),
            favorite_category: self.favorite_category.trim().to_string(),
            auto_join: self.auto_join,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    #[default]
    Default,
    TitleAsc,
    TitleDesc,
    Custom,
}

impl SortMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
            Self::Custom => "custom",
        }
    }
}
