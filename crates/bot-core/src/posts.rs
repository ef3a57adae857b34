//! Ephemeral mapping from rendered feed messages to content identifiers.

use sqlx::{Any, Pool, Row};

use crate::error::BotResult;

/// One feed item rendered into a specific chat message. Created at
/// render time, read when an inline button on that message fires, never
/// updated. Rows are not pruned by the bot; `created_at` exists so an
/// operator can expire them out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    pub chat_id: i64,
    pub message_id: i64,
    pub identifier: String,
}

#[derive(Clone)]
pub struct PostStore {
    pool: Pool<Any>,
}

impl PostStore {
    pub fn new(pool: Pool<Any>) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, post: &PostRef) -> BotResult<()> {
        sqlx::query(
            "INSERT INTO post_refs (chat_id, message_id, identifier, created_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (chat_id, message_id) DO UPDATE SET identifier = $3",
        )
        .bind(post.chat_id)
        .bind(post.message_id)
        .bind(&post.identifier)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, chat_id: i64, message_id: i64) -> BotResult<Option<PostRef>> {
        let row = sqlx::query(
            "SELECT identifier FROM post_refs WHERE chat_id = $1 AND message_id = $2",
        )
        .bind(chat_id)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(PostRef {
                chat_id,
                message_id,
                identifier: r.try_get("identifier")?,
            })
        })
        .transpose()
    }
}
