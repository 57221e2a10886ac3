//! In-memory store for testing.
//!
//! Allows seeding data, injecting failures and counting writes.

use super::{newest_first, LocalStore, OutcomeStream};
use crate::error::{to_outcome, StoreError};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use paste_types::{Outcome, Paste, User};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// In-memory store for testing.
///
/// Clones share state, so a test can keep a handle while the repository
/// under test owns another.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
    paste_changes: Arc<watch::Sender<u64>>,
    user_changes: Arc<watch::Sender<u64>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    pastes: BTreeMap<String, Paste>,
    user: Option<User>,
    writes: usize,
    fail_next_write: Option<String>,
    fail_next_read: Option<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let (paste_changes, _) = watch::channel(0);
        let (user_changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(MemoryStoreInner::default())),
            paste_changes: Arc::new(paste_changes),
            user_changes: Arc::new(user_changes),
        }
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a logged-in user.
    pub fn with_user(name: &str, api_key: &str) -> Self {
        let store = Self::new();
        store.lock().user = Some(User::new(name, api_key));
        store
    }

    /// Put pastes in place without counting as writes.
    pub fn seed(&self, pastes: impl IntoIterator<Item = Paste>) {
        {
            let mut inner = self.lock();
            for paste in pastes {
                inner.pastes.insert(paste.title.clone(), paste);
            }
        }
        self.paste_changes.send_modify(|rev| *rev += 1);
    }

    /// Look up a paste by title, bypassing the list cap.
    pub fn get(&self, title: &str) -> Option<Paste> {
        self.lock().pastes.get(title).cloned()
    }

    /// Number of stored pastes.
    pub fn len(&self) -> usize {
        self.lock().pastes.len()
    }

    /// Whether no pastes are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful write operations so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Cause the next write operation to fail with the given message.
    pub fn fail_next_write(&self, error: &str) {
        self.lock().fail_next_write = Some(error.to_string());
    }

    /// Cause the next stream query to fail with the given message.
    pub fn fail_next_read(&self, error: &str) {
        self.lock().fail_next_read = Some(error.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStoreInner> {
        // A poisoned lock only means another test thread panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run a write against the inner state, honouring injected failures.
    fn write<T>(
        &self,
        changes: &watch::Sender<u64>,
        apply: impl FnOnce(&mut MemoryStoreInner) -> T,
    ) -> Outcome<T> {
        let result = {
            let mut inner = self.lock();
            match inner.fail_next_write.take() {
                Some(error) => Err(StoreError::Injected(error)),
                None => {
                    inner.writes += 1;
                    Ok(apply(&mut inner))
                }
            }
        };
        if result.is_ok() {
            changes.send_modify(|rev| *rev += 1);
        }
        to_outcome(result)
    }

    fn read<T>(
        inner: &Mutex<MemoryStoreInner>,
        query: impl FnOnce(&MemoryStoreInner) -> T,
    ) -> Outcome<T> {
        let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
        let result = match inner.fail_next_read.take() {
            Some(error) => Err(StoreError::Injected(error)),
            None => Ok(query(&inner)),
        };
        to_outcome(result)
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    fn pastes(&self) -> OutcomeStream<Vec<Paste>> {
        let state = (Arc::clone(&self.inner), self.paste_changes.subscribe(), true);
        stream::unfold(state, |(inner, mut changes, first)| async move {
            if !first && changes.changed().await.is_err() {
                return None;
            }
            let outcome = Self::read(&inner, |i| {
                newest_first(i.pastes.values().cloned().collect())
            });
            Some((outcome, (inner, changes, false)))
        })
        .boxed()
    }

    async fn unsynced_pastes(&self) -> Outcome<Vec<Paste>> {
        Self::read(&self.inner, |i| {
            i.pastes
                .values()
                .filter(|p| !p.is_synced)
                .cloned()
                .collect()
        })
    }

    async fn insert_or_update_paste(&self, paste: Paste) -> Outcome<String> {
        self.write(&self.paste_changes, |inner| {
            let title = paste.title.clone();
            inner.pastes.insert(title.clone(), paste);
            title
        })
    }

    async fn insert_or_update_pastes(
        &self,
        pastes: Vec<Paste>,
        override_unsynced: bool,
    ) -> Outcome<Vec<String>> {
        self.write(&self.paste_changes, |inner| {
            let mut titles = Vec::with_capacity(pastes.len());
            for paste in pastes {
                titles.push(paste.title.clone());
                let keep_local = !override_unsynced
                    && inner
                        .pastes
                        .get(&paste.title)
                        .is_some_and(|existing| !existing.is_synced);
                if !keep_local {
                    inner.pastes.insert(paste.title.clone(), paste);
                }
            }
            titles
        })
    }

    async fn mark_as_synced(&self, title: &str) -> Outcome<String> {
        self.write(&self.paste_changes, |inner| {
            if let Some(paste) = inner.pastes.get_mut(title) {
                paste.is_synced = true;
            }
            title.to_string()
        })
    }

    async fn mark_as_synced_if_current(&self, pushed: &Paste) -> Outcome<bool> {
        self.write(&self.paste_changes, |inner| {
            match inner.pastes.get_mut(&pushed.title) {
                Some(paste)
                    if paste.content == pushed.content
                        && paste.modified_on == pushed.modified_on =>
                {
                    paste.is_synced = true;
                    true
                }
                _ => false,
            }
        })
    }

    async fn delete_paste(&self, title: &str) -> Outcome<()> {
        self.write(&self.paste_changes, |inner| {
            inner.pastes.remove(title);
        })
    }

    async fn delete_pastes(&self, titles: &[String]) -> Outcome<u64> {
        self.write(&self.paste_changes, |inner| {
            titles
                .iter()
                .filter(|t| inner.pastes.remove(t.as_str()).is_some())
                .count() as u64
        })
    }

    async fn delete_all_pastes(&self) -> Outcome<u64> {
        self.write(&self.paste_changes, |inner| {
            let count = inner.pastes.len() as u64;
            inner.pastes.clear();
            count
        })
    }

    fn user(&self) -> OutcomeStream<Option<User>> {
        let state = (Arc::clone(&self.inner), self.user_changes.subscribe(), true);
        stream::unfold(state, |(inner, mut changes, first)| async move {
            if !first && changes.changed().await.is_err() {
                return None;
            }
            let outcome = Self::read(&inner, |i| i.user.clone());
            Some((outcome, (inner, changes, false)))
        })
        .boxed()
    }

    async fn insert_user(&self, user: User) -> Outcome<()> {
        self.write(&self.user_changes, |inner| {
            inner.user = Some(user);
        })
    }

    async fn delete_user(&self) -> Outcome<()> {
        self.write(&self.user_changes, |inner| {
            inner.user = None;
        })
    }
}
