//! `Store` implementations: in-memory and SQLite.

use std::collections::HashMap;

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    sqlx::SqlitePool,
    tokio::sync::RwLock,
    tracing::info,
    voxrelay_common::{Jid, MessageKind},
};

use crate::{
    Result,
    error::Error,
    types::{ChatSummary, MessageRecord},
};

/// Message and chat persistence. Every write is an upsert.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace the message with `record.id`.
    async fn upsert_message(&self, record: &MessageRecord) -> Result<()>;
    /// Insert or replace the summary for `summary.jid`.
    async fn upsert_chat(&self, summary: &ChatSummary) -> Result<()>;
    async fn get_message(&self, id: &str) -> Result<Option<MessageRecord>>;
    /// Most recent messages of a chat, newest first.
    async fn list_messages(&self, chat: &Jid, limit: u32) -> Result<Vec<MessageRecord>>;
    async fn get_chat(&self, jid: &Jid) -> Result<Option<ChatSummary>>;
}

// ── In-memory ───────────────────────────────────────────────────────────────

/// Process-local store, mainly for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    messages: RwLock<HashMap<String, MessageRecord>>,
    chats: RwLock<HashMap<Jid, ChatSummary>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_message(&self, record: &MessageRecord) -> Result<()> {
        self.messages
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn upsert_chat(&self, summary: &ChatSummary) -> Result<()> {
        self.chats
            .write()
            .await
            .insert(summary.jid.clone(), summary.clone());
        Ok(())
    }

    async fn get_message(&self, id: &str) -> Result<Option<MessageRecord>> {
        Ok(self.messages.read().await.get(id).cloned())
    }

    async fn list_messages(&self, chat: &Jid, limit: u32) -> Result<Vec<MessageRecord>> {
        let messages = self.messages.read().await;
        let mut out: Vec<MessageRecord> = messages
            .values()
            .filter(|m| &m.chat == chat)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn get_chat(&self, jid: &Jid) -> Result<Option<ChatSummary>> {
        Ok(self.chats.read().await.get(jid).cloned())
    }
}

// ── SQLite ──────────────────────────────────────────────────────────────────

type MessageRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    bool,
    i64,
);

type ChatRow = (String, String, String, i64, bool);

/// Stores messages and chats in SQLite.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(url).await?;
        crate::run_migrations(&pool).await?;
        info!(url, "message store ready");
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_message(&self, record: &MessageRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO messages
             (id, chat_jid, sender, content, kind, filename, is_from_me, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                chat_jid   = excluded.chat_jid,
                sender     = excluded.sender,
                content    = excluded.content,
                kind       = excluded.kind,
                filename   = excluded.filename,
                is_from_me = excluded.is_from_me,
                timestamp  = excluded.timestamp",
        )
        .bind(&record.id)
        .bind(record.chat.to_string())
        .bind(record.sender.to_string())
        .bind(&record.content)
        .bind(record.kind.as_str())
        .bind(&record.filename)
        .bind(record.is_from_me)
        .bind(record.timestamp.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_chat(&self, summary: &ChatSummary) -> Result<()> {
        sqlx::query(
            "INSERT INTO chats (jid, name, last_message, last_message_time, is_group)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(jid) DO UPDATE SET
                name              = excluded.name,
                last_message      = excluded.last_message,
                last_message_time = excluded.last_message_time,
                is_group          = excluded.is_group",
        )
        .bind(summary.jid.to_string())
        .bind(&summary.name)
        .bind(&summary.last_message)
        .bind(summary.last_message_time.timestamp_millis())
        .bind(summary.is_group)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_message(&self, id: &str) -> Result<Option<MessageRecord>> {
        let row = sqlx::query_as::<_, MessageRow>(
            "SELECT id, chat_jid, sender, content, kind, filename, is_from_me, timestamp
             FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(message_from_row).transpose()
    }

    async fn list_messages(&self, chat: &Jid, limit: u32) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, chat_jid, sender, content, kind, filename, is_from_me, timestamp
             FROM messages
             WHERE chat_jid = ?
             ORDER BY timestamp DESC, id DESC
             LIMIT ?",
        )
        .bind(chat.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(message_from_row).collect()
    }

    async fn get_chat(&self, jid: &Jid) -> Result<Option<ChatSummary>> {
        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT jid, name, last_message, last_message_time, is_group
             FROM chats WHERE jid = ?",
        )
        .bind(jid.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(chat_from_row).transpose()
    }
}

fn message_from_row(r: MessageRow) -> Result<MessageRecord> {
    let corrupt = |e: voxrelay_common::Error| Error::corrupt_row("messages", e.to_string());
    Ok(MessageRecord {
        id: r.0,
        chat: Jid::parse(&r.1).map_err(corrupt)?,
        sender: Jid::parse(&r.2).map_err(corrupt)?,
        content: r.3,
        kind: r.4.parse::<MessageKind>().map_err(corrupt)?,
        filename: r.5,
        is_from_me: r.6,
        timestamp: from_unix_millis("messages", r.7)?,
    })
}

fn chat_from_row(r: ChatRow) -> Result<ChatSummary> {
    Ok(ChatSummary {
        jid: Jid::parse(&r.0).map_err(|e| Error::corrupt_row("chats", e.to_string()))?,
        name: r.1,
        last_message: r.2,
        last_message_time: from_unix_millis("chats", r.3)?,
        is_group: r.4,
    })
}

fn from_unix_millis(table: &'static str, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::corrupt_row(table, format!("timestamp out of range: {millis}")))
}
