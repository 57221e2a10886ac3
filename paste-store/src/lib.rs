//! # paste-store
//!
//! Local cache for pastebin-sync.
//!
//! Holds the cached pastes and the single stored session, and exposes both
//! as reactive streams that re-emit after every committed write. Every
//! operation returns an [`Outcome`] instead of failing loudly.
//!
//! Two backends implement [`LocalStore`]:
//! - [`SqliteStore`] - durable SQLite file (or in-memory database)
//! - [`MemoryStore`] - `BTreeMap`-backed double with failure injection

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod memory;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use paste_types::{Outcome, Paste, User};

/// Maximum number of pastes emitted by [`LocalStore::pastes`].
pub const PASTE_LIST_LIMIT: usize = 25;

/// A stream of outcomes that lives as long as the store it came from.
pub type OutcomeStream<T> = BoxStream<'static, Outcome<T>>;

/// Contract of the local paste cache.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Most recently modified pastes, newest first, capped at
    /// [`PASTE_LIST_LIMIT`].
    ///
    /// Emits once on subscription and again after every paste write.
    fn pastes(&self) -> OutcomeStream<Vec<Paste>>;

    /// All pastes not yet confirmed by the remote.
    async fn unsynced_pastes(&self) -> Outcome<Vec<Paste>>;

    /// Insert a paste or replace the one with the same title.
    ///
    /// Returns the title.
    async fn insert_or_update_paste(&self, paste: Paste) -> Outcome<String>;

    /// Insert or replace a batch of pastes in one transaction.
    ///
    /// With `override_unsynced = false`, pastes whose stored copy is still
    /// unsynced are skipped. Returns the titles of the whole input batch.
    async fn insert_or_update_pastes(
        &self,
        pastes: Vec<Paste>,
        override_unsynced: bool,
    ) -> Outcome<Vec<String>>;

    /// Flag a paste as confirmed by the remote.
    async fn mark_as_synced(&self, title: &str) -> Outcome<String>;

    /// Flag a paste as confirmed only while the stored copy still has the
    /// content and timestamp of `pushed`.
    ///
    /// Returns whether the flag was set. A newer local edit stays unsynced.
    async fn mark_as_synced_if_current(&self, pushed: &Paste) -> Outcome<bool>;

    /// Delete a single paste.
    async fn delete_paste(&self, title: &str) -> Outcome<()>;

    /// Delete the given pastes, returning how many were removed.
    async fn delete_pastes(&self, titles: &[String]) -> Outcome<u64>;

    /// Delete every paste, returning how many were removed.
    async fn delete_all_pastes(&self) -> Outcome<u64>;

    /// The stored session, if any.
    ///
    /// Emits once on subscription and again after every user write.
    fn user(&self) -> OutcomeStream<Option<User>>;

    /// Store the session, replacing any previous one.
    async fn insert_user(&self, user: User) -> Outcome<()>;

    /// Remove the stored session.
    async fn delete_user(&self) -> Outcome<()>;
}

/// Order pastes newest first (ties by title) and apply the list cap.
pub(crate) fn newest_first(mut pastes: Vec<Paste>) -> Vec<Paste> {
    pastes.sort_by(|a, b| {
        b.modified_on
            .cmp(&a.modified_on)
            .then_with(|| a.title.cmp(&b.title))
    });
    pastes.truncate(PASTE_LIST_LIMIT);
    pastes
}
