//! Mock remote for testing.
//!
//! Behaves like a tiny in-memory pastebin service by default, and allows
//! queueing outcomes and capturing calls for verification.

use super::PasteRemote;
use async_trait::async_trait;
use paste_types::{unix_now, Failure, Outcome, Paste};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Mock remote for testing.
///
/// Without queued outcomes, `get_pastebin` returns the server-side pastes
/// and `create_or_update_paste` stores into them. Clones share state.
#[derive(Debug, Default)]
pub struct MockRemote {
    inner: Arc<Mutex<MockRemoteInner>>,
}

#[derive(Debug, Default)]
struct MockRemoteInner {
    server: BTreeMap<String, Paste>,
    get_queue: VecDeque<Outcome<Vec<Paste>>>,
    post_queue: VecDeque<Outcome<String>>,
    get_calls: Vec<String>,
    post_calls: Vec<(String, String)>,
    latency: Duration,
}

impl MockRemote {
    /// Create a mock with an empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose server already holds the given pastes.
    pub fn with_pastes(pastes: impl IntoIterator<Item = Paste>) -> Self {
        let remote = Self::new();
        {
            let mut inner = remote.lock();
            for paste in pastes {
                inner.server.insert(paste.title.clone(), paste.with_synced(true));
            }
        }
        remote
    }

    /// Queue an outcome for the next `get_pastebin()` call.
    pub fn queue_get(&self, outcome: Outcome<Vec<Paste>>) {
        self.lock().get_queue.push_back(outcome);
    }

    /// Queue an outcome for the next `create_or_update_paste()` call.
    pub fn queue_post(&self, outcome: Outcome<String>) {
        self.lock().post_queue.push_back(outcome);
    }

    /// Cause the next `get_pastebin()` to fail.
    pub fn fail_next_get(&self, failure: Failure) {
        self.queue_get(Outcome::Failure(failure));
    }

    /// Cause the next `create_or_update_paste()` to fail.
    pub fn fail_next_post(&self, failure: Failure) {
        self.queue_post(Outcome::Failure(failure));
    }

    /// Delay every call by the given duration.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Addresses passed to `get_pastebin()`, in call order.
    pub fn get_calls(&self) -> Vec<String> {
        self.lock().get_calls.clone()
    }

    /// `(title, content)` pairs passed to `create_or_update_paste()`.
    pub fn post_calls(&self) -> Vec<(String, String)> {
        self.lock().post_calls.clone()
    }

    /// Server-side copy of a paste.
    pub fn server_paste(&self, title: &str) -> Option<Paste> {
        self.lock().server.get(title).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MockRemoteInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn delay(&self) {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Clone for MockRemote {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PasteRemote for MockRemote {
    async fn get_pastebin(&self, address: &str, _api_key: &str) -> Outcome<Vec<Paste>> {
        self.delay().await;
        let mut inner = self.lock();
        inner.get_calls.push(address.to_string());

        if let Some(outcome) = inner.get_queue.pop_front() {
            return outcome;
        }

        Outcome::Success(inner.server.values().cloned().collect())
    }

    async fn create_or_update_paste(
        &self,
        title: &str,
        content: &str,
        _address: &str,
        _api_key: &str,
    ) -> Outcome<String> {
        self.delay().await;
        let mut inner = self.lock();
        inner
            .post_calls
            .push((title.to_string(), content.to_string()));

        if let Some(outcome) = inner.post_queue.pop_front() {
            return outcome;
        }

        let paste = Paste::new(title, content)
            .with_modified_on(unix_now())
            .with_synced(true);
        inner.server.insert(title.to_string(), paste);
        Outcome::Success(title.to_string())
    }
}
