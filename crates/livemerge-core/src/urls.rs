//! YouTube URL normalization.
//!
//! Any of the watch / short / embed / live URL forms collapses to a video ID,
//! from which the canonical watch, embed and chat URLs are rebuilt. Input that
//! does not yield an ID is passed through trimmed, so the user still sees what
//! they typed.

use reqwest::Url;

use crate::model::StreamInput;

const WATCH_BASE: &str = "https://www.youtube.com/watch?v=";
const EMBED_BASE: &str = "https://www.youtube.com/embed/";
const CHAT_BASE: &str = "https://www.youtube.com/live_chat?v=";

/// Player parameters forced onto every embed URL, in the order they are set.
const PLAYER_PARAMS: &[(&str, &str)] = &[
    ("autoplay", "1"),
    ("mute", "1"),
    ("controls", "1"),
    ("modestbranding", "1"),
    ("rel", "0"),
    ("enablejsapi", "1"),
    ("autohide", "0"),
    ("disablekb", "1"),
];

/// What to normalize: a bare URL typed by the user, or a partially filled
/// stream record whose `original_url` is the source of truth.
#[derive(Debug, Clone)]
pub enum UrlSource {
    Raw(String),
    Partial(StreamInput),
}

impl From<&str> for UrlSource {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<StreamInput> for UrlSource {
    fn from(value: StreamInput) -> Self {
        Self::Partial(value)
    }
}

/// Extra context for building chat URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlOptions {
    /// Appended as `embed_domain` on chat URLs when set.
    pub embed_domain: Option<String>,
}

/// The three derived URL fields of a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamUrls {
    pub original_url: String,
    pub embed_url: String,
    pub chat_url: String,
}

impl StreamUrls {
    /// Every field set to the same verbatim value.
    fn passthrough(value: &str) -> Self {
        Self {
            original_url: value.to_string(),
            embed_url: value.to_string(),
            chat_url: value.to_string(),
        }
    }

    pub fn for_video(video_id: &str, opts: &UrlOptions) -> Self {
        Self {
            original_url: watch_url(video_id),
            embed_url: embed_url(video_id),
            chat_url: chat_url(video_id, opts),
        }
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_BASE}{video_id}")
}

pub fn embed_url(video_id: &str) -> String {
    format!("{EMBED_BASE}{video_id}")
}

pub fn chat_url(video_id: &str, opts: &UrlOptions) -> String {
    match opts.embed_domain.as_deref().filter(|d| !d.is_empty()) {
        Some(domain) => format!("{CHAT_BASE}{video_id}&embed_domain={domain}"),
        None => format!("{CHAT_BASE}{video_id}"),
    }
}

/// Extract the video ID from any supported YouTube URL form.
///
/// Returns `None` for empty input, unparseable URLs, unrelated hosts,
/// recognized hosts with an unsupported path, and IDs with characters outside
/// `[A-Za-z0-9_-]`.
pub fn video_id(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = Url::parse(trimmed).ok()?;
    let lowered = parsed.host_str()?.to_ascii_lowercase();
    let host = lowered.strip_prefix("www.").unwrap_or(lowered.as_str());

    let id = match host {
        "youtu.be" => first_segment(parsed.path()),
        "youtube.com" | "m.youtube.com" => {
            let path = parsed.path();
            if path == "/watch" {
                parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned())
            } else if let Some(rest) = path.strip_prefix("/embed/") {
                first_segment(rest)
            } else if let Some(rest) = path.strip_prefix("/live/") {
                first_segment(rest)
            } else {
                None
            }
        }
        _ => None,
    }?;

    is_video_id(&id).then_some(id)
}

/// IDs are written back into URLs verbatim, so only URL-safe ones qualify.
fn is_video_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn first_segment(path: &str) -> Option<String> {
    path.split('/')
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Canonical watch URL, or the trimmed input when no ID can be found.
pub fn normalize_watch_url(url: &str) -> String {
    let trimmed = url.trim();
    match video_id(trimmed) {
        Some(id) => watch_url(&id),
        None => trimmed.to_string(),
    }
}

/// Derive all three URL fields from a single source URL.
pub fn normalize_url(url: &str, opts: &UrlOptions) -> StreamUrls {
    let trimmed = url.trim();
    match video_id(trimmed) {
        Some(id) => StreamUrls::for_video(&id, opts),
        None => StreamUrls::passthrough(trimmed),
    }
}

/// Normalize a source into a stream input.
///
/// For a partial record only `original_url` is consulted; the embed and chat
/// URLs are always rebuilt from it, whatever they held before. Title and
/// channel ID are carried through.
pub fn normalize(source: UrlSource, opts: &UrlOptions) -> StreamInput {
    match source {
        UrlSource::Raw(raw) => {
            let urls = normalize_url(&raw, opts);
            StreamInput {
                title: None,
                original_url: urls.original_url,
                embed_url: urls.embed_url,
                chat_url: urls.chat_url,
                channel_id: None,
            }
        }
        UrlSource::Partial(input) => {
            let urls = normalize_url(&input.original_url, opts);
            StreamInput {
                original_url: urls.original_url,
                embed_url: urls.embed_url,
                chat_url: urls.chat_url,
                ..input
            }
        }
    }
}

/// Embed URL with the dashboard's player parameters applied.
///
/// Existing values for those parameters are replaced; other query parameters
/// are kept. An unparseable URL comes back unchanged.
pub fn player_url(embed_url: &str, origin: Option<&str>) -> String {
    let Ok(mut url) = Url::parse(embed_url) else {
        return embed_url.to_string();
    };

    let mut params: Vec<(&str, &str)> = PLAYER_PARAMS.to_vec();
    if let Some(origin) = origin.filter(|o| !o.is_empty()) {
        params.push(("origin", origin));
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !params.iter().any(|(name, _)| k == name))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .extend_pairs(params);

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> UrlOptions {
        UrlOptions::default()
    }

    #[test]
    fn test_video_id_from_all_forms() {
        for url in [
            "https://youtu.be/abc123",
            "https://youtu.be/abc123?t=5",
            "https://www.youtube.com/watch?v=abc123",
            "https://youtube.com/watch?feature=share&v=abc123",
            "https://m.youtube.com/watch?v=abc123",
            "https://www.youtube.com/embed/abc123",
            "https://www.youtube.com/live/abc123?si=xyz",
            "  https://WWW.YouTube.com/watch?v=abc123  ",
        ] {
            assert_eq!(video_id(url).as_deref(), Some("abc123"), "url: {url}");
        }
    }

    #[test]
    fn test_video_id_rejects_unsupported() {
        for url in [
            "",
            "   ",
            "not a url",
            "youtube.com/watch?v=abc123",
            "https://vimeo.com/12345",
            "https://www.youtube.com/watch",
            "https://www.youtube.com/watch?v=",
            "https://www.youtube.com/channel/UC123",
            "https://youtu.be/",
            "https://notyoutube.com/watch?v=abc123",
            "https://www.youtube.com/watch?v=a%26b",
            "https://www.youtube.com/watch?v=a b",
            "https://youtu.be/a%2Fb",
        ] {
            assert_eq!(video_id(url), None, "url: {url}");
        }
    }

    #[test]
    fn test_short_url_example() {
        let urls = normalize_url("https://youtu.be/abc123?t=5", &opts());
        assert_eq!(urls.original_url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(urls.embed_url, "https://www.youtube.com/embed/abc123");
        assert_eq!(urls.chat_url, "https://www.youtube.com/live_chat?v=abc123");
    }

    #[test]
    fn test_all_forms_canonicalize_identically() {
        let expected = normalize_url("https://www.youtube.com/watch?v=vid42", &opts());
        for url in [
            "https://youtu.be/vid42",
            "https://www.youtube.com/embed/vid42",
            "https://www.youtube.com/live/vid42",
            "https://m.youtube.com/watch?v=vid42&t=10s",
        ] {
            assert_eq!(normalize_url(url, &opts()), expected, "url: {url}");
        }
    }

    #[test]
    fn test_malformed_input_passes_through_trimmed() {
        for raw in ["  not a url  ", "https://vimeo.com/12345", "ftp://example.org/x"] {
            let urls = normalize_url(raw, &opts());
            let trimmed = raw.trim();
            assert_eq!(urls.original_url, trimmed);
            assert_eq!(urls.embed_url, trimmed);
            assert_eq!(urls.chat_url, trimmed);
        }
        assert_eq!(normalize_url("", &opts()), StreamUrls::default());
    }

    #[test]
    fn test_normalize_is_a_fixed_point() {
        for raw in [
            "https://youtu.be/abc123?t=5",
            "https://www.youtube.com/live/zzz",
            "https://www.youtube.com/watch?v=a%26b",
            "https://youtu.be/a%2Fb",
            "plain text",
        ] {
            let once = normalize(UrlSource::from(raw), &opts());
            let twice = normalize(UrlSource::Partial(once.clone()), &opts());
            assert_eq!(once, twice, "raw: {raw}");
        }
    }

    #[test]
    fn test_partial_rebuilds_embed_and_chat_from_original() {
        let input = StreamInput {
            title: Some("Title".into()),
            original_url: "https://youtu.be/fresh".into(),
            embed_url: "https://www.youtube.com/embed/stale".into(),
            chat_url: "https://example.org/chat".into(),
            channel_id: Some("UC1".into()),
        };
        let out = normalize(UrlSource::Partial(input), &opts());
        assert_eq!(out.title.as_deref(), Some("Title"));
        assert_eq!(out.channel_id.as_deref(), Some("UC1"));
        assert_eq!(out.original_url, "https://www.youtube.com/watch?v=fresh");
        assert_eq!(out.embed_url, "https://www.youtube.com/embed/fresh");
        assert_eq!(out.chat_url, "https://www.youtube.com/live_chat?v=fresh");
    }

    #[test]
    fn test_chat_url_with_embed_domain() {
        let opts = UrlOptions {
            embed_domain: Some("dash.local".into()),
        };
        let urls = normalize_url("https://youtu.be/abc", &opts);
        assert_eq!(
            urls.chat_url,
            "https://www.youtube.com/live_chat?v=abc&embed_domain=dash.local"
        );
        // Still a fixed point with the domain applied.
        let again = normalize_url(&urls.original_url, &opts);
        assert_eq!(again, urls);
    }

    #[test]
    fn test_normalize_watch_url() {
        assert_eq!(
            normalize_watch_url(" https://youtu.be/q1 "),
            "https://www.youtube.com/watch?v=q1"
        );
        assert_eq!(normalize_watch_url(" other "), "other");
    }

    #[test]
    fn test_player_url_sets_parameters() {
        let url = player_url("https://www.youtube.com/embed/abc", Some("http://localhost:5173"));
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        for (name, value) in PLAYER_PARAMS {
            assert!(
                pairs.iter().any(|(k, v)| k == name && v == value),
                "missing {name}={value} in {url}"
            );
        }
        assert!(pairs
            .iter()
            .any(|(k, v)| k == "origin" && v == "http://localhost:5173"));
        assert_eq!(parsed.path(), "/embed/abc");
    }

    #[test]
    fn test_player_url_replaces_existing_values() {
        let url = player_url("https://www.youtube.com/embed/abc?autoplay=0&start=30", None);
        let parsed = Url::parse(&url).unwrap();
        let autoplay: Vec<_> = parsed.query_pairs().filter(|(k, _)| k == "autoplay").collect();
        assert_eq!(autoplay.len(), 1);
        assert_eq!(autoplay[0].1, "1");
        assert!(parsed.query_pairs().any(|(k, v)| k == "start" && v == "30"));
        assert!(!parsed.query_pairs().any(|(k, _)| k == "origin"));
    }

    #[test]
    fn test_player_url_unparseable_is_unchanged() {
        assert_eq!(player_url("not a url", Some("x")), "not a url");
        assert_eq!(player_url("", None), "");
    }
}
