use std::path::PathBuf;

/// Namespace shared by the data/config directories and the persisted keys.
pub const APP_NAME: &str = "livemerge";

/// `~/.local/share/livemerge` on Unix (macOS included), the platform data
/// directory elsewhere.
pub fn data_dir() -> PathBuf {
    #[cfg(unix)]
    let base = dirs::home_dir().map(|home| home.join(".local").join("share"));
    #[cfg(not(unix))]
    let base = dirs::data_local_dir();

    base.unwrap_or_else(std::env::temp_dir).join(APP_NAME)
}

/// `~/.config/livemerge` on Unix, the platform config directory elsewhere.
pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    let base = dirs::home_dir().map(|home| home.join(".config"));
    #[cfg(not(unix))]
    let base = dirs::config_dir();

    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_NAME)
}

/// Default location of the per-key JSON files backing the persisted store.
pub fn store_dir() -> PathBuf {
    data_dir().join("store")
}
