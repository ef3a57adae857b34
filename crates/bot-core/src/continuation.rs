//! Register of pending "the next free-text message means X" handlers.
//!
//! A chat carries at most one continuation. Registering a new one
//! replaces the old; taking one consumes it. Menu buttons, commands and
//! callbacks never consume continuations, only free text does, so a
//! user who taps a button mid-dialogue resumes the dialogue afterwards.

use serde::{Deserialize, Serialize};
use sqlx::{Any, Pool, Row};

use crate::error::{BotError, BotResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Continuation {
    AwaitUsername,
    AwaitPostingKey,
    AwaitComment { identifier: String },
    AwaitTitle { file_id: String },
}

#[derive(Clone)]
pub struct ContinuationStore {
    pool: Pool<Any>,
}

impl ContinuationStore {
    pub fn new(pool: Pool<Any>) -> Self {
        Self { pool }
    }

    /// Register `continuation` for `chat_id`, superseding any previous one.
    pub async fn set(&self, chat_id: i64, continuation: &Continuation) -> BotResult<()> {
        let payload = serde_json::to_string(continuation)
            .map_err(|e| BotError::Corrupt(format!("continuation encode: {e}")))?;
        sqlx::query(
            "INSERT INTO continuations (chat_id, payload, created_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (chat_id) DO UPDATE SET payload = $2, created_at = $3",
        )
        .bind(chat_id)
        .bind(payload)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove and return the pending continuation for `chat_id`, if any.
    pub async fn take(&self, chat_id: i64) -> BotResult<Option<Continuation>> {
        let row = sqlx::query("SELECT payload FROM continuations WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        sqlx::query("DELETE FROM continuations WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        let payload: String = row.try_get("payload")?;
        let continuation = serde_json::from_str(&payload)
            .map_err(|e| BotError::Corrupt(format!("continuation decode: {e}")))?;
        Ok(Some(continuation))
    }

    pub async fn clear(&self, chat_id: i64) -> BotResult<()> {
        sqlx::query("DELETE FROM continuations WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
