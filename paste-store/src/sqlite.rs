//! SQLite storage backend for paste-store.

use super::{LocalStore, OutcomeStream, PASTE_LIST_LIMIT};
use crate::error::{to_outcome, StoreError, StoreResult};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use paste_types::{Outcome, Paste, User};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

/// Newest schema this build understands.
const SCHEMA_VERSION: i64 = 2;

/// Initial schema, before pastes carried a sync flag.
const SCHEMA_V1: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS pastes (
        title TEXT PRIMARY KEY NOT NULL,
        content TEXT NOT NULL,
        modified_on INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        uid INTEGER PRIMARY KEY CHECK (uid = 0),
        name TEXT NOT NULL,
        api_key TEXT NOT NULL
    )
    "#,
];

/// Adds the sync flag; existing rows become unsynced.
const SCHEMA_V2: [&str; 2] = [
    "ALTER TABLE pastes ADD COLUMN is_synced INTEGER NOT NULL DEFAULT 0",
    "CREATE INDEX IF NOT EXISTS idx_pastes_modified_on ON pastes(modified_on)",
];

const UPSERT_PASTE: &str = r#"
    INSERT INTO pastes (title, content, modified_on, is_synced)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(title) DO UPDATE SET
        content = excluded.content,
        modified_on = excluded.modified_on,
        is_synced = excluded.is_synced
"#;

/// SQLite-based paste cache.
///
/// Uses WAL mode for concurrent reads/writes. Clones share the pool and the
/// change notifications.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    paste_changes: Arc<watch::Sender<u64>>,
    user_changes: Arc<watch::Sender<u64>>,
}

impl SqliteStore {
    /// Open (or create) the cache at `path` and bring its schema up to date.
    pub async fn new(path: &Path) -> StoreResult<Self> {
        if path.as_os_str().is_empty() {
            return Err(StoreError::InvalidPath {
                path: path.to_path_buf(),
            });
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Create an in-memory cache (for testing).
    ///
    /// The pool keeps its single connection open forever, since the database
    /// disappears with it.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(":memory:")?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        let (paste_changes, _) = watch::channel(0);
        let (user_changes, _) = watch::channel(0);
        let store = Self {
            pool,
            paste_changes: Arc::new(paste_changes),
            user_changes: Arc::new(user_changes),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Apply every schema step newer than the stored `user_version`.
    async fn run_migrations(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&mut *tx)
            .await?;

        if version > SCHEMA_VERSION {
            return Err(StoreError::Migration(format!(
                "database schema v{} is newer than supported v{}",
                version, SCHEMA_VERSION
            )));
        }

        let steps: [(i64, &[&str]); 2] = [(1, &SCHEMA_V1), (2, &SCHEMA_V2)];
        for (target, statements) in steps {
            if version >= target {
                continue;
            }
            for statement in statements {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            // PRAGMA does not accept bound parameters.
            sqlx::query(&format!("PRAGMA user_version = {}", target))
                .execute(&mut *tx)
                .await?;
            tracing::info!("Local store migrated to schema v{}", target);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Current schema version of the open database.
    pub async fn schema_version(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?)
    }

    fn notify_pastes(&self) {
        self.paste_changes.send_modify(|rev| *rev += 1);
    }

    fn notify_user(&self) {
        self.user_changes.send_modify(|rev| *rev += 1);
    }

    async fn upsert_batch(&self, pastes: &[Paste], override_unsynced: bool) -> StoreResult<()> {
        // Writer lock before the unsynced read, so the snapshot cannot go stale.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let skipped: HashSet<String> = if override_unsynced {
            HashSet::new()
        } else {
            sqlx::query_scalar::<_, String>("SELECT title FROM pastes WHERE is_synced = 0")
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .collect()
        };

        for paste in pastes.iter().filter(|p| !skipped.contains(&p.title)) {
            sqlx::query(UPSERT_PASTE)
                .bind(&paste.title)
                .bind(&paste.content)
                .bind(paste.modified_on)
                .bind(paste.is_synced)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_batch(&self, titles: &[String]) -> StoreResult<u64> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let mut deleted = 0;

        for title in titles {
            deleted += sqlx::query("DELETE FROM pastes WHERE title = ?1")
                .bind(title)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(deleted)
    }
}

async fn load_pastes(pool: &SqlitePool) -> StoreResult<Vec<Paste>> {
    let rows = sqlx::query_as::<_, PasteRow>(
        r#"
        SELECT title, content, modified_on, is_synced
        FROM pastes
        ORDER BY modified_on DESC, title ASC
        LIMIT ?1
        "#,
    )
    .bind(PASTE_LIST_LIMIT as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Paste::from).collect())
}

async fn load_user(pool: &SqlitePool) -> StoreResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>("SELECT name, api_key FROM users WHERE uid = 0")
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| User::new(&r.name, &r.api_key)))
}

#[async_trait]
impl LocalStore for SqliteStore {
    fn pastes(&self) -> OutcomeStream<Vec<Paste>> {
        let state = (self.pool.clone(), self.paste_changes.subscribe(), true);
        stream::unfold(state, |(pool, mut changes, first)| async move {
            if !first && changes.changed().await.is_err() {
                return None;
            }
            let outcome = to_outcome(load_pastes(&pool).await);
            Some((outcome, (pool, changes, false)))
        })
        .boxed()
    }

    async fn unsynced_pastes(&self) -> Outcome<Vec<Paste>> {
        let result = sqlx::query_as::<_, PasteRow>(
            r#"
            SELECT title, content, modified_on, is_synced
            FROM pastes
            WHERE is_synced = 0
            ORDER BY modified_on ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Paste::from).collect())
        .map_err(StoreError::Database);

        to_outcome(result)
    }

    async fn insert_or_update_paste(&self, paste: Paste) -> Outcome<String> {
        let result = sqlx::query(UPSERT_PASTE)
            .bind(&paste.title)
            .bind(&paste.content)
            .bind(paste.modified_on)
            .bind(paste.is_synced)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database);

        let outcome = to_outcome(result).map(|_| paste.title);
        if outcome.is_success() {
            self.notify_pastes();
        }
        outcome
    }

    async fn insert_or_update_pastes(
        &self,
        pastes: Vec<Paste>,
        override_unsynced: bool,
    ) -> Outcome<Vec<String>> {
        let outcome = to_outcome(self.upsert_batch(&pastes, override_unsynced).await)
            .map(|_| pastes.into_iter().map(|p| p.title).collect());
        if outcome.is_success() {
            self.notify_pastes();
        }
        outcome
    }

    async fn mark_as_synced(&self, title: &str) -> Outcome<String> {
        let result = sqlx::query("UPDATE pastes SET is_synced = 1 WHERE title = ?1")
            .bind(title)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database);

        let outcome = to_outcome(result).map(|_| title.to_string());
        if outcome.is_success() {
            self.notify_pastes();
        }
        outcome
    }

    async fn mark_as_synced_if_current(&self, pushed: &Paste) -> Outcome<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pastes SET is_synced = 1
            WHERE title = ?1 AND content = ?2 AND modified_on = ?3
            "#,
        )
        .bind(&pushed.title)
        .bind(&pushed.content)
        .bind(pushed.modified_on)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected() > 0)
        .map_err(StoreError::Database);

        let outcome = to_outcome(result);
        if let Outcome::Success(true) = outcome {
            self.notify_pastes();
        }
        outcome
    }

    async fn delete_paste(&self, title: &str) -> Outcome<()> {
        let result = sqlx::query("DELETE FROM pastes WHERE title = ?1")
            .bind(title)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database);

        let outcome = to_outcome(result).map(|_| ());
        if outcome.is_success() {
            self.notify_pastes();
        }
        outcome
    }

    async fn delete_pastes(&self, titles: &[String]) -> Outcome<u64> {
        if titles.is_empty() {
            return Outcome::Success(0);
        }

        let outcome = to_outcome(self.delete_batch(titles).await);
        if outcome.is_success() {
            self.notify_pastes();
        }
        outcome
    }

    async fn delete_all_pastes(&self) -> Outcome<u64> {
        let result = sqlx::query("DELETE FROM pastes")
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(StoreError::Database);

        let outcome = to_outcome(result);
        if outcome.is_success() {
            self.notify_pastes();
        }
        outcome
    }

    fn user(&self) -> OutcomeStream<Option<User>> {
        let state = (self.pool.clone(), self.user_changes.subscribe(), true);
        stream::unfold(state, |(pool, mut changes, first)| async move {
            if !first && changes.changed().await.is_err() {
                return None;
            }
            let outcome = to_outcome(load_user(&pool).await);
            Some((outcome, (pool, changes, false)))
        })
        .boxed()
    }

    async fn insert_user(&self, user: User) -> Outcome<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (uid, name, api_key)
            VALUES (0, ?1, ?2)
            ON CONFLICT(uid) DO UPDATE SET name = excluded.name, api_key = excluded.api_key
            "#,
        )
        .bind(&user.name)
        .bind(&user.api_key)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database);

        let outcome = to_outcome(result).map(|_| ());
        if outcome.is_success() {
            self.notify_user();
        }
        outcome
    }

    async fn delete_user(&self) -> Outcome<()> {
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database);

        let outcome = to_outcome(result).map(|_| ());
        if outcome.is_success() {
            self.notify_user();
        }
        outcome
    }
}

/// Internal row type for paste queries.
#[derive(sqlx::FromRow)]
struct PasteRow {
    title: String,
    content: String,
    modified_on: i64,
    is_synced: bool,
}

impl From<PasteRow> for Paste {
    fn from(row: PasteRow) -> Self {
        Paste {
            title: row.title,
            content: row.content,
            modified_on: row.modified_on,
            is_synced: row.is_synced,
        }
    }
}

/// Internal row type for the session query.
#[derive(sqlx::FromRow)]
struct UserRow {
    name: String,
    api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn synced(title: &str, content: &str, modified_on: i64) -> Paste {
        Paste::new(title, content)
            .with_modified_on(modified_on)
            .with_synced(true)
    }

    async fn first<T>(stream: &mut OutcomeStream<T>) -> T {
        match tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("stream should emit")
            .expect("stream should not end")
        {
            Outcome::Success(value) => value,
            Outcome::Failure(f) => panic!("unexpected failure: {}", f),
        }
    }

    // ===========================================
    // Paste CRUD
    // ===========================================

    #[tokio::test]
    async fn insert_and_list_pastes() {
        let store = SqliteStore::in_memory().await.unwrap();

        let title = store
            .insert_or_update_paste(synced("hello", "world", 10))
            .await;
        assert_eq!(title, Outcome::Success("hello".to_string()));

        let mut pastes = store.pastes();
        let listed = first(&mut pastes).await;
        assert_eq!(listed, vec![synced("hello", "world", 10)]);
    }

    #[tokio::test]
    async fn same_title_overwrites() {
        let store = SqliteStore::in_memory().await.unwrap();

        store.insert_or_update_paste(synced("t", "one", 1)).await;
        store
            .insert_or_update_paste(Paste::new("t", "two").with_modified_on(2))
            .await;

        let mut pastes = store.pastes();
        let listed = first(&mut pastes).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "two");
        assert!(!listed[0].is_synced);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_capped() {
        let store = SqliteStore::in_memory().await.unwrap();
        let batch: Vec<Paste> = (0..30)
            .map(|i| synced(&format!("p{:02}", i), "x", i))
            .collect();
        store.insert_or_update_pastes(batch, true).await;

        let mut pastes = store.pastes();
        let listed = first(&mut pastes).await;
        assert_eq!(listed.len(), PASTE_LIST_LIMIT);
        assert_eq!(listed[0].title, "p29");
        assert_eq!(listed[PASTE_LIST_LIMIT - 1].title, "p05");
    }

    #[tokio::test]
    async fn stream_reemits_after_write() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut pastes = store.pastes();

        assert!(first(&mut pastes).await.is_empty());

        store.insert_or_update_paste(synced("new", "entry", 5)).await;
        let listed = first(&mut pastes).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "new");
    }

    #[tokio::test]
    async fn bulk_upsert_overrides_unsynced_by_default() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert_or_update_paste(Paste::new("draft", "local edit").with_modified_on(5))
            .await;

        let titles = store
            .insert_or_update_pastes(vec![synced("draft", "remote", 6)], true)
            .await;
        assert_eq!(titles, Outcome::Success(vec!["draft".to_string()]));

        let mut pastes = store.pastes();
        assert_eq!(first(&mut pastes).await, vec![synced("draft", "remote", 6)]);
    }

    #[tokio::test]
    async fn bulk_upsert_can_preserve_unsynced() {
        let store = SqliteStore::in_memory().await.unwrap();
        let local = Paste::new("draft", "local edit").with_modified_on(5);
        store.insert_or_update_paste(local.clone()).await;
        store.insert_or_update_paste(synced("old", "v1", 1)).await;

        let titles = store
            .insert_or_update_pastes(
                vec![synced("draft", "remote", 6), synced("old", "v2", 2)],
                false,
            )
            .await;
        // Reported titles cover the whole batch, including skipped ones.
        assert_eq!(
            titles,
            Outcome::Success(vec!["draft".to_string(), "old".to_string()])
        );

        let mut pastes = store.pastes();
        let listed = first(&mut pastes).await;
        assert!(listed.contains(&local));
        assert!(listed.contains(&synced("old", "v2", 2)));
    }

    #[tokio::test]
    async fn mark_as_synced_flips_flag() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert_or_update_paste(Paste::new("t", "c").with_modified_on(1))
            .await;

        let unsynced = store.unsynced_pastes().await.success().unwrap();
        assert_eq!(unsynced.len(), 1);

        assert_eq!(
            store.mark_as_synced("t").await,
            Outcome::Success("t".to_string())
        );
        assert!(store.unsynced_pastes().await.success().unwrap().is_empty());
    }

    #[tokio::test]
    async fn conditional_mark_skips_newer_edit() {
        let store = SqliteStore::in_memory().await.unwrap();
        let pushed = Paste::new("t", "v1").with_modified_on(1);
        store.insert_or_update_paste(pushed.clone()).await;
        store
            .insert_or_update_paste(Paste::new("t", "v2").with_modified_on(2))
            .await;

        let mut pastes = store.pastes();
        first(&mut pastes).await;

        assert_eq!(
            store.mark_as_synced_if_current(&pushed).await,
            Outcome::Success(false)
        );
        let unsynced = store.unsynced_pastes().await.success().unwrap();
        assert_eq!(unsynced, vec![Paste::new("t", "v2").with_modified_on(2)]);

        // Nothing changed, so the list does not re-emit.
        assert!(
            tokio::time::timeout(Duration::from_millis(100), pastes.next())
                .await
                .is_err()
        );

        let current = Paste::new("t", "v2").with_modified_on(2);
        assert_eq!(
            store.mark_as_synced_if_current(&current).await,
            Outcome::Success(true)
        );
        assert_eq!(first(&mut pastes).await, vec![synced("t", "v2", 2)]);
    }

    #[tokio::test]
    async fn concurrent_writes_on_file_database_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(&dir.path().join("cache.db")).await.unwrap();
        store
            .insert_or_update_paste(Paste::new("draft", "local").with_modified_on(1))
            .await;

        let mut tasks = Vec::new();
        for i in 0..8 {
            let batches = store.clone();
            let batch = vec![synced("draft", "remote", 9), synced(&format!("r{}", i), "x", i)];
            tasks.push(tokio::spawn(async move {
                batches
                    .insert_or_update_pastes(batch, false)
                    .await
                    .map(|_| ())
            }));
            let singles = store.clone();
            let local = Paste::new(&format!("l{}", i), "y").with_modified_on(i);
            tasks.push(tokio::spawn(async move {
                singles.insert_or_update_paste(local).await.map(|_| ())
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), Outcome::Success(()));
        }

        let unsynced = store.unsynced_pastes().await.success().unwrap();
        assert_eq!(unsynced.len(), 9);
        assert!(unsynced.contains(&Paste::new("draft", "local").with_modified_on(1)));
    }

    #[tokio::test]
    async fn delete_operations_report_counts() {
        let store = SqliteStore::in_memory().await.unwrap();
        let batch: Vec<Paste> = ["a", "b", "c", "d"]
            .iter()
            .map(|t| synced(t, "x", 1))
            .collect();
        store.insert_or_update_pastes(batch, true).await;

        assert_eq!(store.delete_paste("a").await, Outcome::Success(()));
        assert_eq!(
            store
                .delete_pastes(&["b".to_string(), "missing".to_string()])
                .await,
            Outcome::Success(1)
        );
        assert_eq!(store.delete_pastes(&[]).await, Outcome::Success(0));
        assert_eq!(store.delete_all_pastes().await, Outcome::Success(2));

        let mut pastes = store.pastes();
        assert!(first(&mut pastes).await.is_empty());
    }

    // ===========================================
    // Session
    // ===========================================

    #[tokio::test]
    async fn user_is_single_slot() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut user = store.user();
        assert_eq!(first(&mut user).await, None);

        store.insert_user(User::new("alice", "key-1")).await;
        assert_eq!(first(&mut user).await, Some(User::new("alice", "key-1")));

        store.insert_user(User::new("bob", "key-2")).await;
        assert_eq!(first(&mut user).await, Some(User::new("bob", "key-2")));

        store.delete_user().await;
        assert_eq!(first(&mut user).await, None);
    }

    // ===========================================
    // Schema evolution
    // ===========================================

    #[tokio::test]
    async fn fresh_database_is_current_schema() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn v1_database_gains_sync_flag_and_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        // Build a database the way the first release left it.
        {
            let options = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await
                .unwrap();
            for statement in SCHEMA_V1 {
                sqlx::query(statement).execute(&pool).await.unwrap();
            }
            sqlx::query("PRAGMA user_version = 1")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query("INSERT INTO pastes (title, content, modified_on) VALUES ('kept', 'row', 7)")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query("INSERT INTO users (uid, name, api_key) VALUES (0, 'alice', 'k')")
                .execute(&pool)
                .await
                .unwrap();
            pool.close().await;
        }

        let store = SqliteStore::new(&path).await.unwrap();
        assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);

        let mut pastes = store.pastes();
        assert_eq!(
            first(&mut pastes).await,
            vec![Paste::new("kept", "row").with_modified_on(7)]
        );

        let mut user = store.user();
        assert_eq!(first(&mut user).await, Some(User::new("alice", "k")));
    }

    #[tokio::test]
    async fn reopening_file_database_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let store = SqliteStore::new(&path).await.unwrap();
            store.insert_or_update_paste(synced("t", "c", 3)).await;
        }

        let store = SqliteStore::new(&path).await.unwrap();
        let mut pastes = store.pastes();
        assert_eq!(first(&mut pastes).await, vec![synced("t", "c", 3)]);
    }

    #[tokio::test]
    async fn empty_path_is_rejected() {
        let result = SqliteStore::new(Path::new("")).await;
        assert!(matches!(result, Err(StoreError::InvalidPath { .. })));
    }
}
