//! Cached entries and the stored session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A single pastebin entry.
///
/// The title is the unique key. `modified_on` is in whole seconds since the
/// Unix epoch and is authoritative only when it came from the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Paste {
    /// Unique key, must not contain whitespace.
    pub title: String,
    /// Paste body.
    pub content: String,
    /// Last modification time (seconds since epoch).
    pub modified_on: i64,
    /// Whether the remote service has confirmed this version.
    pub is_synced: bool,
}

impl Paste {
    /// Create an unsynced paste with a zero modification time.
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            modified_on: 0,
            is_synced: false,
        }
    }

    /// Set the modification time.
    pub fn with_modified_on(mut self, modified_on: i64) -> Self {
        self.modified_on = modified_on;
        self
    }

    /// Set the sync flag.
    pub fn with_synced(mut self, is_synced: bool) -> Self {
        self.is_synced = is_synced;
        self
    }
}

/// Check a title against the client-side formatting rule.
///
/// The remote API has stricter rules; this only rejects whitespace.
pub fn is_valid_title(title: &str) -> bool {
    !title.chars().any(char::is_whitespace)
}

/// Current Unix time in whole seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// The single logged-in identity on this device.
///
/// `name` is the account address used in API paths, `api_key` the bearer
/// credential. The key is wiped from memory on drop and never printed by
/// `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct User {
    /// Account address.
    pub name: String,
    /// API credential.
    pub api_key: String,
}

impl User {
    /// Create a user record.
    pub fn new(name: &str, api_key: &str) -> Self {
        Self {
            name: name.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("name", &self.name)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_with_whitespace_are_invalid() {
        assert!(is_valid_title("hello-world"));
        assert!(!is_valid_title("a b"));
        assert!(!is_valid_title("tab\there"));
        assert!(!is_valid_title("line\nbreak"));
    }

    #[test]
    fn new_paste_is_unsynced() {
        let paste = Paste::new("title", "content");
        assert!(!paste.is_synced);
        assert_eq!(paste.modified_on, 0);

        let paste = paste.with_modified_on(42).with_synced(true);
        assert!(paste.is_synced);
        assert_eq!(paste.modified_on, 42);
    }

    #[test]
    fn user_debug_redacts_api_key() {
        let user = User::new("alice", "super-secret-key");
        let debug = format!("{:?}", user);
        assert!(debug.contains("alice"));
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("super-secret-key"));
    }

    #[test]
    fn unix_now_is_positive() {
        assert!(unix_now() > 1_600_000_000);
    }
}
