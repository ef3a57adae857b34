//! Schema bootstrap.
//!
//! The bot creates its own tables at startup. SQL is kept portable
//! across Postgres and SQLite since tests run on the latter through the
//! sqlx `Any` driver.

use sqlx::{Any, Pool};

use crate::error::BotResult;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BIGINT PRIMARY KEY,
        account_name TEXT NOT NULL DEFAULT '',
        chat_id BIGINT NOT NULL DEFAULT -1,
        key_message_id BIGINT NOT NULL DEFAULT -1,
        last_action_at BIGINT NOT NULL,
        last_login_at BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS post_refs (
        chat_id BIGINT NOT NULL,
        message_id BIGINT NOT NULL,
        identifier TEXT NOT NULL,
        created_at BIGINT NOT NULL,
        PRIMARY KEY (chat_id, message_id)
    )",
    "CREATE TABLE IF NOT EXISTS continuations (
        chat_id BIGINT PRIMARY KEY,
        payload TEXT NOT NULL,
        created_at BIGINT NOT NULL
    )",
];

pub async fn ensure_schema(pool: &Pool<Any>) -> BotResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
