//! PastebinRepository - the main interface for pastebin-sync.
//!
//! This module provides [`PastebinRepository`], the API applications use to
//! list and edit pastes while offline or online.
//!
//! # Architecture
//!
//! Reads refresh from the remote once per session, then follow the local
//! cache. Writes land in the local cache first and are pushed to the remote
//! afterwards.
//!
//! ```text
//! session change ─► remote fetch ─► local upsert ─► local stream ─► caller
//!                        │ fault
//!                        └─► annotated failure, delay ─► local stream
//! ```

use crate::remote::PasteRemote;
use crate::session::SessionRepository;
use crate::stream::distinct_until_changed;
use futures_util::{FutureExt, Stream, StreamExt};
use paste_store::LocalStore;
use paste_types::{is_valid_title, unix_now, ClientFault, Failure, Outcome, Paste, User};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capacity of the channel between the pipeline and a subscriber.
const SUBSCRIPTION_BUFFER: usize = 16;

/// Configuration for [`PastebinRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Pause between surfacing a fetch failure and emitting local data.
    pub error_display_delay: Duration,
    /// Whether remote data replaces local edits that are not yet synced.
    pub override_unsynced: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            error_display_delay: Duration::from_secs(1),
            override_unsynced: true,
        }
    }
}

impl RepositoryConfig {
    /// Set the pause after a fetch failure.
    pub fn with_error_display_delay(mut self, delay: Duration) -> Self {
        self.error_display_delay = delay;
        self
    }

    /// Set whether remote data replaces unsynced local edits.
    pub fn with_override_unsynced(mut self, override_unsynced: bool) -> Self {
        self.override_unsynced = override_unsynced;
        self
    }
}

/// Counts from [`PastebinRepository::sync_unsynced`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Pastes the remote accepted.
    pub synced: usize,
    /// Pastes that failed in a way worth retrying.
    pub deferred: usize,
    /// Pastes the remote refused.
    pub rejected: usize,
}

/// Offline-first paste repository.
///
/// Cheap to clone; clones share the store and remote.
pub struct PastebinRepository<S, R> {
    store: Arc<S>,
    remote: Arc<R>,
    session: SessionRepository<S>,
    config: RepositoryConfig,
}

impl<S, R> Clone for PastebinRepository<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            remote: Arc::clone(&self.remote),
            session: self.session.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, R> PastebinRepository<S, R>
where
    S: LocalStore + 'static,
    R: PasteRemote + 'static,
{
    /// Create a repository.
    pub fn new(store: Arc<S>, remote: Arc<R>, config: RepositoryConfig) -> Self {
        let session = SessionRepository::new(Arc::clone(&store));
        Self {
            store,
            remote,
            session,
            config,
        }
    }

    /// The session repository sharing this repository's store.
    pub fn session(&self) -> &SessionRepository<S> {
        &self.session
    }

    /// Current configuration.
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Subscribe to the paste list.
    ///
    /// For every distinct session value: fetch from the remote, store the
    /// result, then follow the local cache. A new session value abandons the
    /// work for the previous one. Dropping the subscription stops all work.
    ///
    /// Must be called within a Tokio runtime.
    pub fn pastes(&self) -> PasteSubscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = CancellationToken::new();
        tokio::spawn(self.clone().drive(tx, cancel.clone()));
        PasteSubscription { rx, cancel }
    }

    /// Save a paste locally, then push it to the remote.
    ///
    /// A remote failure still returns the title: the paste stays flagged
    /// unsynced and [`sync_unsynced`](Self::sync_unsynced) retries it.
    pub async fn insert_or_update(&self, title: &str, content: &str) -> Outcome<String> {
        match AssertUnwindSafe(self.write_through(title, content))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = format!(
                    "Client error while adding a paste: {}",
                    panic_message(&*panic)
                );
                tracing::error!("{}", message);
                Outcome::client_error(ClientFault::Internal(message))
            }
        }
    }

    /// Push every unsynced paste to the remote.
    pub async fn sync_unsynced(&self) -> Outcome<SyncReport> {
        let user = match self.require_user("No user found, cannot sync pastes").await {
            Ok(user) => user,
            Err(failure) => return failure.cast_failure(),
        };

        let pending = match self.store.unsynced_pastes().await {
            Outcome::Success(pending) => pending,
            Outcome::Failure(failure) => return failure.cast_failure(),
        };

        let mut report = SyncReport::default();
        for paste in pending {
            let pushed = self
                .remote
                .create_or_update_paste(&paste.title, &paste.content, &user.name, &user.api_key)
                .await;

            match pushed {
                Outcome::Success(_) => match self.store.mark_as_synced_if_current(&paste).await {
                    Outcome::Success(true) => report.synced += 1,
                    Outcome::Success(false) => {
                        tracing::debug!("Paste '{}' changed while syncing", paste.title);
                        report.deferred += 1;
                    }
                    Outcome::Failure(failure) => {
                        failure.log("Failed to mark paste as synced");
                        report.deferred += 1;
                    }
                },
                Outcome::Failure(failure) if failure.is_recoverable() => {
                    tracing::warn!("Deferred sync of '{}': {}", paste.title, failure);
                    report.deferred += 1;
                }
                Outcome::Failure(failure) => {
                    failure.log(&format!("Remote rejected paste '{}'", paste.title));
                    report.rejected += 1;
                }
            }
        }

        tracing::info!(
            "Sync finished: {} synced, {} deferred, {} rejected",
            report.synced,
            report.deferred,
            report.rejected
        );
        Outcome::Success(report)
    }

    async fn write_through(&self, title: &str, content: &str) -> Outcome<String> {
        let user = match self.require_user("No user found, cannot add a paste").await {
            Ok(user) => user,
            Err(failure) => return failure.cast_failure(),
        };

        if !is_valid_title(title) {
            return Outcome::client_error(ClientFault::InvalidInput(
                "Title mustn't contain spaces".to_string(),
            ));
        }

        let draft = Paste::new(title, content).with_modified_on(unix_now());
        if let Outcome::Failure(failure) = self.store.insert_or_update_paste(draft.clone()).await {
            failure.log("Failed to store paste locally");
            return failure.cast_failure();
        }

        match self
            .remote
            .create_or_update_paste(title, content, &user.name, &user.api_key)
            .await
        {
            Outcome::Success(remote_title) => {
                // A newer local edit of the same title keeps its unsynced flag.
                self.store
                    .mark_as_synced_if_current(&draft)
                    .await
                    .log_if_failure("Failed to mark paste as synced");
                Outcome::Success(remote_title)
            }
            Outcome::Failure(failure) => {
                tracing::warn!("Paste '{}' saved locally only: {}", title, failure);
                Outcome::Success(title.to_string())
            }
        }
    }

    async fn require_user(&self, missing: &str) -> Result<User, Failure> {
        match self.session.current_user().await {
            Outcome::Success(Some(user)) => Ok(user),
            Outcome::Success(None) => Err(Failure::client(ClientFault::Unauthenticated(
                missing.to_string(),
            ))),
            Outcome::Failure(failure) => Err(failure),
        }
    }

    /// Switch-latest over the session stream.
    async fn drive(self, tx: mpsc::Sender<Outcome<Vec<Paste>>>, cancel: CancellationToken) {
        let mut users = self.session.user();
        let mut current: Option<(CancellationToken, JoinHandle<()>)> = None;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = users.next() => next,
            };

            let Some(user) = next else {
                // Session stream ended: let the last pipeline run on
                if let Some((_, handle)) = current.take() {
                    let _ = handle.await;
                }
                break;
            };

            if let Some((token, handle)) = current.take() {
                token.cancel();
                let _ = handle.await;
            }

            let token = cancel.child_token();
            let handle = tokio::spawn(self.clone().run_pipeline(user, tx.clone(), token.clone()));
            current = Some((token, handle));
        }

        if let Some((token, handle)) = current.take() {
            token.cancel();
            let _ = handle.await;
        }
        tracing::debug!("Paste subscription closed");
    }

    async fn run_pipeline(
        self,
        user: Outcome<Option<User>>,
        tx: mpsc::Sender<Outcome<Vec<Paste>>>,
        cancel: CancellationToken,
    ) {
        let work = async {
            if let Err(panic) = AssertUnwindSafe(self.fetch_then_follow(user, &tx))
                .catch_unwind()
                .await
            {
                let message = format!(
                    "Client error while fetching and/or storing pastes: {}",
                    panic_message(&*panic)
                );
                tracing::error!("{}", message);
                let _ = tx
                    .send(Outcome::client_error(ClientFault::Internal(message)))
                    .await;
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = work => {}
        }
    }

    async fn fetch_then_follow(
        &self,
        user: Outcome<Option<User>>,
        tx: &mpsc::Sender<Outcome<Vec<Paste>>>,
    ) {
        let user = match user {
            Outcome::Success(Some(user)) => user,
            Outcome::Success(None) => {
                let _ = tx
                    .send(Outcome::client_error(ClientFault::Unauthenticated(
                        "No user found, cannot fetch pastes".to_string(),
                    )))
                    .await;
                return;
            }
            Outcome::Failure(failure) => {
                let _ = tx.send(failure.cast_failure()).await;
                return;
            }
        };

        match self.remote.get_pastebin(&user.name, &user.api_key).await {
            Outcome::Success(pastes) => {
                let count = pastes.len();
                match self
                    .store
                    .insert_or_update_pastes(pastes, self.config.override_unsynced)
                    .await
                {
                    Outcome::Success(_) => tracing::debug!("Stored {} pastes from the API", count),
                    Outcome::Failure(failure) => {
                        failure.log("Failed to store pastes from the API");
                        let _ = tx.send(failure.cast_failure()).await;
                        return;
                    }
                }
            }
            Outcome::Failure(failure) => {
                failure.log("Failed to fetch pastes from API");
                let annotated = failure.map_failure(|message| {
                    format!("Failed to fetch pastes from API, using local data: {}", message)
                });
                if tx.send(annotated).await.is_err() {
                    return;
                }
                tokio::time::sleep(self.config.error_display_delay).await;
            }
        }

        let mut local = std::pin::pin!(distinct_until_changed(self.store.pastes()));
        while let Some(outcome) = local.next().await {
            if tx.send(outcome).await.is_err() {
                break;
            }
        }
    }
}

/// Live paste list returned by [`PastebinRepository::pastes`].
///
/// Implements [`Stream`]. Dropping it cancels the underlying work.
#[derive(Debug)]
pub struct PasteSubscription {
    rx: mpsc::Receiver<Outcome<Vec<Paste>>>,
    cancel: CancellationToken,
}

impl PasteSubscription {
    /// Stop the subscription; already buffered items can still be read.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the subscription was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Stream for PasteSubscription {
    type Item = Outcome<Vec<Paste>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for PasteSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
