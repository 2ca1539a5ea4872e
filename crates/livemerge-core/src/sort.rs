//! Display ordering of streams.
//!
//! All functions are pure: they take the current streams plus the persisted
//! custom order and return new vectors.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::{SortMode, Stream};

/// What [`SortMode::Default`] resolves to.
///
/// Both behaviors existed for the default mode; the choice is left to the
/// `[sort] default_behavior` config key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultSort {
    /// Streams listed in the custom order first, in that order, then the rest
    /// in insertion order. Never drops entries.
    #[default]
    CustomPlacement,
    /// Same as `title-asc`.
    Alphabetical,
}

/// Order `streams` for display.
pub fn sorted_streams(
    streams: &[Stream],
    mode: SortMode,
    custom_order: &[String],
    default_sort: DefaultSort,
) -> Vec<Stream> {
    match mode {
        SortMode::TitleAsc => sort_by_title(streams, false),
        SortMode::TitleDesc => sort_by_title(streams, true),
        SortMode::Custom => only_in_order(streams, custom_order),
        SortMode::Default => match default_sort {
            DefaultSort::CustomPlacement => resolve_order(streams, custom_order),
            DefaultSort::Alphabetical => sort_by_title(streams, false),
        },
    }
}

/// Letters compare by their base form, ignoring accents and case. Titles
/// equal on that key fall back to the raw text so the result is deterministic.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(title: &str) -> impl Iterator<Item = char> + '_ {
    title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn sort_by_title(streams: &[Stream], descending: bool) -> Vec<Stream> {
    let mut sorted = streams.to_vec();
    // sort_by is stable: equal titles keep their relative order both ways.
    sorted.sort_by(|a, b| {
        let ord = compare_titles(a.title(), b.title());
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    sorted
}

/// Streams whose ID is listed in `order`, in that order. Unlisted streams are
/// dropped; reconcile the order beforehand to keep everything.
fn only_in_order(streams: &[Stream], order: &[String]) -> Vec<Stream> {
    let by_id: HashMap<&str, &Stream> = streams.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut seen = HashSet::new();
    order
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .filter_map(|id| by_id.get(id.as_str()).map(|s| (*s).clone()))
        .collect()
}

/// Streams listed in `order` first, then everything else in insertion order.
pub fn resolve_order(streams: &[Stream], order: &[String]) -> Vec<Stream> {
    let mut resolved = only_in_order(streams, order);
    let listed: HashSet<&str> = order.iter().map(String::as_str).collect();
    resolved.extend(
        streams
            .iter()
            .filter(|s| !listed.contains(s.id.as_str()))
            .cloned(),
    );
    resolved
}

/// Bring a persisted custom order in line with the current streams.
///
/// IDs without a stream are dropped, duplicates collapse to their first
/// position, and IDs of new streams are appended in insertion order.
/// Applying it twice gives the same result as applying it once.
pub fn reconcile_order(current: &[String], streams: &[Stream]) -> Vec<String> {
    let present: HashSet<&str> = streams.iter().map(|s| s.id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(current.len());

    let mut next: Vec<String> = current
        .iter()
        .filter(|id| present.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect();

    for stream in streams {
        if seen.insert(stream.id.as_str()) {
            next.push(stream.id.clone());
        }
    }
    next
}

/// Move the entry at `index` one step up (`-1`) or down (`+1`).
/// Moves that would leave the list are ignored.
pub fn move_in_order(order: &[String], index: usize, direction: isize) -> Vec<String> {
    let mut next = order.to_vec();
    let Some(target) = index.checked_add_signed(direction) else {
        return next;
    };
    if index >= next.len() || target >= next.len() {
        return next;
    }
    let item = next.remove(index);
    next.insert(target, item);
    next
}
