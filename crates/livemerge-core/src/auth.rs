//! Bearer token handed over by the external sign-in flow.
//!
//! The token and its expiry are persisted. Expiry is checked lazily when the
//! token is asked for; an expired token is dropped from storage and reported
//! as absent.

use chrono::Utc;
use tracing::info;

use crate::store::{keys, Slot, Store};

/// Anything able to hand out a currently valid bearer token.
pub trait TokenSource {
    /// `None` when no token is held or it has expired.
    fn token(&mut self) -> Option<String>;
}

#[derive(Debug)]
pub struct Credentials {
    token: Slot<Option<String>>,
    expires_at_ms: Slot<Option<i64>>,
}

impl Credentials {
    pub fn open(store: &Store) -> Self {
        Self {
            token: store.slot(keys::USER_TOKEN, None),
            expires_at_ms: store.slot(keys::TOKEN_EXPIRE_DATE, None),
        }
    }

    /// Store a freshly obtained token. `expires_at_ms` is a Unix timestamp in
    /// milliseconds.
    pub fn set(&mut self, token: impl Into<String>, expires_at_ms: i64) {
        self.expires_at_ms.set(Some(expires_at_ms));
        self.token.set(Some(token.into()));
    }

    pub fn clear(&mut self) {
        self.token.set(None);
        self.expires_at_ms.set(None);
    }

    /// Expired, or no expiry known. Clears the stored token when expired.
    pub fn is_expired_at(&mut self, now_ms: i64) -> bool {
        let expired = match *self.expires_at_ms.get() {
            Some(expires_at) => now_ms > expires_at,
            None => true,
        };
        if expired && self.token.get().is_some() {
            info!("auth: stored token expired, clearing it");
            self.clear();
        }
        expired
    }

    pub fn token_at(&mut self, now_ms: i64) -> Option<String> {
        if self.is_expired_at(now_ms) {
            return None;
        }
        self.token.get().clone()
    }

    pub fn expires_at_ms(&self) -> Option<i64> {
        *self.expires_at_ms.get()
    }
}

impl TokenSource for Credentials {
    fn token(&mut self) -> Option<String> {
        self.token_at(Utc::now().timestamp_millis())
    }
}
