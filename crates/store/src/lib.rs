//! Persistence for messages and chat summaries.

pub mod error;
pub mod store;
pub mod types;

pub use {
    error::{Error, Result},
    store::{MemoryStore, SqliteStore, Store},
    types::{ChatSummary, MessageRecord},
};

/// Run database migrations for the store.
///
/// Creates the `messages` and `chats` tables. Called by
/// [`SqliteStore::connect`]; call it yourself when building a store from an
/// existing pool.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    tracing::debug!("message store migrations applied");
    Ok(())
}
