//! Session repository.
//!
//! Exposes the single stored user and the login/logout operations on top
//! of a [`LocalStore`].

use crate::stream::distinct_until_changed;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use paste_store::LocalStore;
use paste_types::{ClientFault, Outcome, User};
use std::sync::Arc;

/// Access to the stored session.
pub struct SessionRepository<S> {
    store: Arc<S>,
}

impl<S> Clone for SessionRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LocalStore + 'static> SessionRepository<S> {
    /// Create a repository over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The stored user, re-emitted when it changes.
    ///
    /// Consecutive equal values are suppressed.
    pub fn user(&self) -> BoxStream<'static, Outcome<Option<User>>> {
        distinct_until_changed(self.store.user()).boxed()
    }

    /// A one-shot read of the stored user.
    pub async fn current_user(&self) -> Outcome<Option<User>> {
        self.store
            .user()
            .next()
            .await
            .unwrap_or(Outcome::Success(None))
    }

    /// Whether a user is stored, re-emitted when that changes.
    ///
    /// A failed read counts as logged out.
    pub fn is_authenticated(&self) -> BoxStream<'static, bool> {
        let authenticated = self.user().map(|outcome| match outcome {
            Outcome::Success(user) => user.is_some(),
            Outcome::Failure(failure) => {
                failure.log("Failed to read session");
                false
            }
        });
        distinct_until_changed(authenticated).boxed()
    }

    /// Store a session, replacing any previous one.
    pub async fn login(&self, name: &str, api_key: &str) -> Outcome<()> {
        if name.trim().is_empty() || api_key.trim().is_empty() {
            return Outcome::client_error(ClientFault::InvalidInput(
                "Name and API key must not be blank".to_string(),
            ));
        }

        let outcome = self.store.insert_user(User::new(name, api_key)).await;
        match &outcome {
            Outcome::Success(()) => tracing::info!("Logged in as {}", name),
            Outcome::Failure(failure) => failure.log("Failed to store session"),
        }
        outcome
    }

    /// Remove the stored session. Cached pastes are kept.
    pub async fn logout(&self) -> Outcome<()> {
        let outcome = self.store.delete_user().await;
        match &outcome {
            Outcome::Success(()) => tracing::info!("Logged out"),
            Outcome::Failure(failure) => failure.log("Failed to remove session"),
        }
        outcome
    }
}
