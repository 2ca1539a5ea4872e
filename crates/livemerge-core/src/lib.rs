//! Core of the LiveMerge multi-stream dashboard.
//!
//! Everything here is UI-agnostic: URL normalization, display ordering,
//! persisted state over a pluggable key/value backend, the stream collection,
//! and the optional YouTube channel poller. The daemon crate serves this over
//! HTTP to the browser dashboard.

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod model;
pub mod platform;
pub mod poller;
pub mod sort;
pub mod store;
pub mod streams;
pub mod urls;
pub mod youtube;

pub use dashboard::{Dashboard, InputError};
pub use model::{SortMode, Stream, StreamInput, StreamPatch, UserPreferences};
