//! # paste-client
//!
//! Offline-first repositories for pastebin-sync.
//!
//! This is the main library that applications use to list and edit pastes.
//!
//! ## Features
//!
//! - **Refresh then reconcile**: every subscription fetches from the remote,
//!   stores the result and then follows the local cache
//! - **Graceful degradation**: remote faults are surfaced once, then the
//!   cached data is served
//! - **Write-through**: edits land in the local cache before the remote sees
//!   them, and stay flagged unsynced until it confirms
//! - **Remote abstraction**: pluggable remote layer (HTTP, mock)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use paste_client::{HttpRemote, HttpRemoteConfig, PastebinRepository, RepositoryConfig};
//! use paste_store::SqliteStore;
//!
//! let store = Arc::new(SqliteStore::new(&path).await?);
//! let remote = Arc::new(HttpRemote::new(HttpRemoteConfig::default())?);
//! let repo = PastebinRepository::new(store, remote, RepositoryConfig::default());
//!
//! repo.session().login("alice", "api-key").await;
//! repo.insert_or_update("hello", "world").await;
//!
//! let mut pastes = repo.pastes();
//! while let Some(outcome) = pastes.next().await {
//!     // render
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod remote;
pub mod repository;
pub mod session;
mod stream;

pub use remote::{
    HttpRemote, HttpRemoteConfig, HttpRemoteError, MockRemote, PasteRemote, DEFAULT_BASE_URL,
};
pub use repository::{PasteSubscription, PastebinRepository, RepositoryConfig, SyncReport};
pub use session::SessionRepository;
pub use stream::distinct_until_changed;
