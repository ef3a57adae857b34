//! Persisted per-user identity records.

use sqlx::{Any, Pool, Row};
use tracing::info;

use crate::error::BotResult;

/// One chat-platform user's link to a ledger account.
///
/// `account_name` is empty until the user has completed the username
/// step at least once. `chat_id` / `key_message_id` are -1 while unset;
/// `key_message_id` points at the chat message believed to contain the
/// user's posting key so it can be recalled (or deleted) later; the key
/// itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: i64,
    pub account_name: String,
    pub chat_id: i64,
    pub key_message_id: i64,
    pub last_action_at: i64,
    pub last_login_at: i64,
}

#[derive(Clone)]
pub struct IdentityStore {
    pool: Pool<Any>,
}

impl IdentityStore {
    pub fn new(pool: Pool<Any>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: i64) -> BotResult<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT id, account_name, chat_id, key_message_id, last_action_at, last_login_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(UserRecord {
                user_id: r.try_get("id")?,
                account_name: r.try_get("account_name")?,
                chat_id: r.try_get("chat_id")?,
                key_message_id: r.try_get("key_message_id")?,
                last_action_at: r.try_get("last_action_at")?,
                last_login_at: r.try_get("last_login_at")?,
            })
        })
        .transpose()
    }

    /// Fetch the record for `user_id`, creating an empty one if absent.
    /// Returns the record and whether it was created. A pre-existing
    /// record is never duplicated.
    pub async fn get_or_create(&self, user_id: i64) -> BotResult<(UserRecord, bool)> {
        if let Some(existing) = self.get(user_id).await? {
            return Ok((existing, false));
        }

        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO users (id, account_name, chat_id, key_message_id, last_action_at, last_login_at) \
             VALUES ($1, '', -1, -1, $2, $2) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!("New user record created: id={}", user_id);
        Ok((
            UserRecord {
                user_id,
                account_name: String::new(),
                chat_id: -1,
                key_message_id: -1,
                last_action_at: now,
                last_login_at: now,
            },
            true,
        ))
    }

    pub async fn save(&self, user: &UserRecord) -> BotResult<()> {
        sqlx::query(
            "UPDATE users SET account_name = $1, chat_id = $2, key_message_id = $3, \
             last_action_at = $4, last_login_at = $5 WHERE id = $6",
        )
        .bind(&user.account_name)
        .bind(user.chat_id)
        .bind(user.key_message_id)
        .bind(user.last_action_at)
        .bind(user.last_login_at)
        .bind(user.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, user_id: i64) -> BotResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
