//! Remote abstraction for pastebin-sync.
//!
//! This module provides a pluggable remote layer that abstracts the
//! pastebin service (HTTP API, mock for testing).
//!
//! # Design
//!
//! Both operations are stateless: every call carries the account address
//! and API key of the stored session. Faults are reported as
//! [`Outcome::Failure`], never as panics or `Err`:
//! - transport and decode faults become client errors
//! - error responses from the service become remote errors
//!
//! # Example
//!
//! ```ignore
//! let remote = MockRemote::new();
//! remote.create_or_update_paste("hello", "world", "alice", "key").await;
//! let pastes = remote.get_pastebin("alice", "key").await;
//! ```

mod http;
mod mock;

pub use http::{HttpRemote, HttpRemoteConfig, HttpRemoteError, DEFAULT_BASE_URL};
pub use mock::MockRemote;

use async_trait::async_trait;
use paste_types::{Outcome, Paste};

/// Remote pastebin service.
#[async_trait]
pub trait PasteRemote: Send + Sync {
    /// Fetch every paste of the account at `address`.
    ///
    /// Returned pastes are marked synced.
    async fn get_pastebin(&self, address: &str, api_key: &str) -> Outcome<Vec<Paste>>;

    /// Create a paste or replace the one with the same title.
    ///
    /// Returns the title echoed by the service.
    async fn create_or_update_paste(
        &self,
        title: &str,
        content: &str,
        address: &str,
        api_key: &str,
    ) -> Outcome<String>;
}
