//! Conversation router.
//!
//! All inbound events land in [`BotApp::handle_event`]. Chat text goes
//! to the chat's pending continuation first, to the command and
//! menu-label table second, and is dropped otherwise, so stray messages
//! never confuse a dialogue and a dialogue step is never preempted by a
//! keyword. Every action except the login flow itself sits behind the
//! authentication guard.

use std::sync::Arc;

use photon_api::{ApiError, FeedCategory, PhotoApi};
use photon_chain::{ChainError, ChainGateway};
use tracing::{debug, warn};

use crate::content::{parse_hashtags, resolve_identifier};
use crate::continuation::{Continuation, ContinuationStore};
use crate::error::BotResult;
use crate::event::{CallbackAction, Command, EventMeta, InboundEvent, MenuAction, classify_text};
use crate::identity::{IdentityStore, UserRecord};
use crate::messages::{MsgKey, text};
use crate::port::{ChatPort, Keyboard};
use crate::posts::{PostRef, PostStore};

#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Base URL for "open in Photon" links under rendered posts.
    pub post_base_url: String,
    /// How many posts one feed request renders.
    pub feed_limit: usize,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            post_base_url: String::new(),
            feed_limit: 5,
        }
    }
}

/// The platform-agnostic bot application.
pub struct BotApp {
    identity: IdentityStore,
    posts: PostStore,
    continuations: ContinuationStore,
    chain: Arc<ChainGateway>,
    api: Arc<dyn PhotoApi>,
    opts: AppOptions,
}

impl BotApp {
    pub fn new(
        identity: IdentityStore,
        posts: PostStore,
        continuations: ContinuationStore,
        chain: Arc<ChainGateway>,
        api: Arc<dyn PhotoApi>,
        opts: AppOptions,
    ) -> Self {
        Self {
            identity,
            posts,
            continuations,
            chain,
            api,
            opts,
        }
    }

    /// Dispatch one inbound event. Chat text feeds a pending
    /// continuation before anything else, so a dialogue step cannot be
    /// preempted by a command keyword or a menu label; only text that no
    /// continuation claims is classified against the command table.
    pub async fn handle_event(
        &self,
        port: &dyn ChatPort,
        meta: &EventMeta,
        event: InboundEvent,
    ) -> BotResult<()> {
        let event = match event {
            InboundEvent::Text(message) => {
                if let Some(continuation) = self.continuations.take(meta.chat_id).await? {
                    return self.resume(port, meta, continuation, &message).await;
                }
                classify_text(&message)
            }
            other => other,
        };

        match event {
            InboundEvent::Command(Command::Start) => self.handle_start(port, meta).await,
            InboundEvent::Command(Command::Help) => {
                port.send(meta.chat_id, self.msg(meta, MsgKey::Help), Keyboard::None)
                    .await?;
                Ok(())
            }
            InboundEvent::Menu(MenuAction::LogIn) => self.handle_login_request(port, meta).await,
            InboundEvent::Menu(MenuAction::Feed(category)) => {
                self.handle_feed(port, meta, category).await
            }
            InboundEvent::Menu(MenuAction::Settings) => self.handle_settings(port, meta).await,
            InboundEvent::Menu(MenuAction::Back) => {
                port.send(meta.chat_id, self.msg(meta, MsgKey::Info), Keyboard::Main)
                    .await?;
                Ok(())
            }
            InboundEvent::Menu(MenuAction::LogOut) => self.handle_logout(port, meta).await,
            InboundEvent::Text(_) => {
                debug!("Dropping text with no pending continuation in chat {}", meta.chat_id);
                Ok(())
            }
            InboundEvent::Photo { file_id, caption } => {
                self.handle_photo(port, meta, file_id, caption).await
            }
            InboundEvent::Callback(action) => self.handle_callback(port, meta, action).await,
        }
    }

    fn msg(&self, meta: &EventMeta, key: MsgKey) -> &'static str {
        text(meta.locale.as_deref(), key)
    }

    /// Authentication guard. Resolves the sender to a signed-in account,
    /// re-establishing a lapsed ledger session from the stored posting key
    /// message when possible. On failure the user is prompted to log in
    /// and `None` is returned.
    async fn authenticate(
        &self,
        port: &dyn ChatPort,
        meta: &EventMeta,
    ) -> BotResult<Option<UserRecord>> {
        let record = self.identity.get(meta.user_id).await?;
        let Some(mut record) = record else {
            port.send(
                meta.chat_id,
                self.msg(meta, MsgKey::AuthRequired),
                Keyboard::Login,
            )
            .await?;
            return Ok(None);
        };

        // A record with no account name is a login that never finished.
        if record.account_name.is_empty() || record.key_message_id < 0 {
            port.send(
                meta.chat_id,
                self.msg(meta, MsgKey::AuthRequired),
                Keyboard::Login,
            )
            .await?;
            return Ok(None);
        }

        if !self.chain.is_logged_in(&record.account_name).await {
            let key = port
                .recall_message_text(record.chat_id, record.key_message_id)
                .await?;
            let restored = match key {
                Some(key) => self.chain.login(&record.account_name, key.trim()).await,
                None => Err(ChainError::InvalidCredential),
            };
            if let Err(e) = restored {
                debug!("Session restore failed for {}: {}", record.account_name, e);
                port.send(
                    meta.chat_id,
                    self.msg(meta, MsgKey::WrongKey),
                    Keyboard::Login,
                )
                .await?;
                return Ok(None);
            }
            record.last_login_at = now();
        }

        record.last_action_at = now();
        self.identity.save(&record).await?;
        Ok(Some(record))
    }

    async fn handle_start(&self, port: &dyn ChatPort, meta: &EventMeta) -> BotResult<()> {
        let known = self
            .identity
            .get(meta.user_id)
            .await?
            .is_some_and(|r| !r.account_name.is_empty());
        let keyboard = if known { Keyboard::Main } else { Keyboard::Login };
        port.send(meta.chat_id, self.msg(meta, MsgKey::Welcome), keyboard)
            .await?;
        Ok(())
    }

    async fn handle_login_request(&self, port: &dyn ChatPort, meta: &EventMeta) -> BotResult<()> {
        if let Some(record) = self.identity.get(meta.user_id).await? {
            if !record.account_name.is_empty() && self.chain.is_logged_in(&record.account_name).await
            {
                let notice = self
                    .msg(meta, MsgKey::AlreadyAuthorized)
                    .replace("{username}", &record.account_name);
                port.send(meta.chat_id, &notice, Keyboard::Main).await?;
                return Ok(());
            }
        }
        port.send(
            meta.chat_id,
            self.msg(meta, MsgKey::AskUsername),
            Keyboard::Remove,
        )
        .await?;
        self.continuations
            .set(meta.chat_id, &Continuation::AwaitUsername)
            .await
    }

    async fn resume(
        &self,
        port: &dyn ChatPort,
        meta: &EventMeta,
        continuation: Continuation,
        message: &str,
    ) -> BotResult<()> {
        match continuation {
            Continuation::AwaitUsername => self.process_username(port, meta, message).await,
            Continuation::AwaitPostingKey => self.process_key(port, meta, message).await,
            Continuation::AwaitComment { identifier } => {
                self.process_comment(port, meta, &identifier, message).await
            }
            Continuation::AwaitTitle { file_id } => {
                let Some(user) = self.authenticate(port, meta).await? else {
                    return Ok(());
                };
                self.submit_post(port, meta, &user, &file_id, message).await
            }
        }
    }

    async fn process_username(
        &self,
        port: &dyn ChatPort,
        meta: &EventMeta,
        message: &str,
    ) -> BotResult<()> {
        let username = message.trim();
        match self.chain.account_exists(username).await {
            Ok(true) => {}
            Ok(false) => {
                port.send(
                    meta.chat_id,
                    self.msg(meta, MsgKey::UserNotFound),
                    Keyboard::None,
                )
                .await?;
                return self
                    .continuations
                    .set(meta.chat_id, &Continuation::AwaitUsername)
                    .await;
            }
            Err(e) => {
                warn!("Account lookup failed for {}: {}", username, e);
                port.send(
                    meta.chat_id,
                    self.msg(meta, MsgKey::ActionFailed),
                    Keyboard::None,
                )
                .await?;
                return self
                    .continuations
                    .set(meta.chat_id, &Continuation::AwaitUsername)
                    .await;
            }
        }

        let (mut record, _created) = self.identity.get_or_create(meta.user_id).await?;
        record.account_name = username.to_string();
        record.chat_id = meta.chat_id;
        record.key_message_id = -1;
        self.identity.save(&record).await?;

        port.send(
            meta.chat_id,
            self.msg(meta, MsgKey::AskPostingKey),
            Keyboard::None,
        )
        .await?;
        self.continuations
            .set(meta.chat_id, &Continuation::AwaitPostingKey)
            .await
    }

    async fn process_key(
        &self,
        port: &dyn ChatPort,
        meta: &EventMeta,
        message: &str,
    ) -> BotResult<()> {
        let record = self.identity.get(meta.user_id).await?;
        let Some(mut record) = record
            .filter(|r| !r.account_name.is_empty() && r.chat_id == meta.chat_id)
        else {
            // No preceding username step in this chat, or the claim was
            // re-made from another chat since. Restart.
            port.send(
                meta.chat_id,
                self.msg(meta, MsgKey::AskUsername),
                Keyboard::None,
            )
            .await?;
            return self
                .continuations
                .set(meta.chat_id, &Continuation::AwaitUsername)
                .await;
        };

        if let Err(e) = self.chain.login(&record.account_name, message.trim()).await {
            debug!("Login failed for {}: {}", record.account_name, e);
            port.send(
                meta.chat_id,
                self.msg(meta, MsgKey::WrongKey),
                Keyboard::Login,
            )
            .await?;
            return Ok(());
        }

        // The key stays only in the user's own message; remember where it
        // is so a lapsed session can be restored from it later.
        record.key_message_id = meta.message_id;
        record.last_login_at = now();
        record.last_action_at = now();
        self.identity.save(&record).await?;

        let notice = self
            .msg(meta, MsgKey::LoggedIn)
            .replace("{username}", &record.account_name);
        port.send(meta.chat_id, &notice, Keyboard::Main).await?;
        port.send(meta.chat_id, self.msg(meta, MsgKey::Info), Keyboard::None)
            .await?;
        Ok(())
    }

    async fn handle_feed(
        &self,
        port: &dyn ChatPort,
        meta: &EventMeta,
        category: FeedCategory,
    ) -> BotResult<()> {
        let Some(user) = self.authenticate(port, meta).await? else {
            return Ok(());
        };

        let posts = self.api.list_posts(category, &user.account_name).await;
        if posts.is_empty() {
            let notice = self
                .msg(meta, MsgKey::NoPhotos)
                .replace("{source}", category.label());
            port.send(meta.chat_id, &notice, Keyboard::None).await?;
            return Ok(());
        }

        for post in posts.iter().take(self.opts.feed_limit) {
            let caption = format!("{}\nby @{}", post.title, post.author);
            let open_url = format!("{}{}", self.opts.post_base_url, post.url);
            let sent = port
                .send_photo(meta.chat_id, &post.body, &caption, &open_url)
                .await?;
            match resolve_identifier(&post.url) {
                Some(identifier) => {
                    self.posts
                        .insert(&PostRef {
                            chat_id: sent.chat_id,
                            message_id: sent.message_id,
                            identifier,
                        })
                        .await?;
                }
                None => warn!("Feed entry with unparseable url: {}", post.url),
            }
        }
        Ok(())
    }

    async fn handle_settings(&self, port: &dyn ChatPort, meta: &EventMeta) -> BotResult<()> {
        let Some(user) = self.authenticate(port, meta).await? else {
            return Ok(());
        };
        let notice = self
            .msg(meta, MsgKey::UserInfo)
            .replace("{username}", &user.account_name);
        // Quote the stored key message so the user can find it again.
        port.reply(user.chat_id, user.key_message_id, &notice, Keyboard::Settings)
            .await?;
        Ok(())
    }

    async fn handle_logout(&self, port: &dyn ChatPort, meta: &EventMeta) -> BotResult<()> {
        let record = self.identity.get(meta.user_id).await?;
        let Some(record) = record.filter(|r| !r.account_name.is_empty()) else {
            port.send(
                meta.chat_id,
                self.msg(meta, MsgKey::AuthRequired),
                Keyboard::Login,
            )
            .await?;
            return Ok(());
        };

        self.chain.logout(&record.account_name).await;
        self.identity.delete(record.user_id).await?;
        self.continuations.clear(meta.chat_id).await?;

        let notice = self.msg(meta, MsgKey::LoggedOut);
        if record.key_message_id >= 0 {
            port.reply(meta.chat_id, record.key_message_id, notice, Keyboard::Login)
                .await?;
        } else {
            port.send(meta.chat_id, notice, Keyboard::Login).await?;
        }
        Ok(())
    }

    async fn handle_photo(
        &self,
        port: &dyn ChatPort,
        meta: &EventMeta,
        file_id: String,
        caption: Option<String>,
    ) -> BotResult<()> {
        let Some(user) = self.authenticate(port, meta).await? else {
            return Ok(());
        };
        match caption.filter(|c| !c.trim().is_empty()) {
            Some(caption) => self.submit_post(port, meta, &user, &file_id, &caption).await,
            None => {
                port.send(
                    meta.chat_id,
                    self.msg(meta, MsgKey::TitleRequired),
                    Keyboard::None,
                )
                .await?;
                self.continuations
                    .set(meta.chat_id, &Continuation::AwaitTitle { file_id })
                    .await
            }
        }
    }

    async fn submit_post(
        &self,
        port: &dyn ChatPort,
        meta: &EventMeta,
        user: &UserRecord,
        file_id: &str,
        caption: &str,
    ) -> BotResult<()> {
        let (title, tags) = parse_hashtags(caption);
        if title.is_empty() {
            port.send(
                meta.chat_id,
                self.msg(meta, MsgKey::TitleRequired),
                Keyboard::None,
            )
            .await?;
            return self
                .continuations
                .set(
                    meta.chat_id,
                    &Continuation::AwaitTitle {
                        file_id: file_id.to_string(),
                    },
                )
                .await;
        }

        let image = port.download_image(file_id).await?;

        let challenge = match self.chain.sign_challenge(&user.account_name).await {
            Ok(challenge) => challenge,
            Err(e) => {
                warn!("Challenge signing failed for {}: {}", user.account_name, e);
                port.send(
                    meta.chat_id,
                    self.msg(meta, MsgKey::ActionFailed),
                    Keyboard::None,
                )
                .await?;
                return Ok(());
            }
        };

        let prepared = match self
            .api
            .prepare_post(image, &title, &user.account_name, &tags, &challenge)
            .await
        {
            Ok(prepared) => prepared,
            Err(e) => {
                let reason = match e {
                    ApiError::Validation(message) => message,
                    other => {
                        warn!("Post staging failed for {}: {}", user.account_name, other);
                        "Failed to connect to Photon server".to_string()
                    }
                };
                let notice = self.msg(meta, MsgKey::PostFailed).replace("{reason}", &reason);
                port.send(meta.chat_id, &notice, Keyboard::None).await?;
                return Ok(());
            }
        };

        // The staged post is considered accepted once the API validated
        // it; a broadcast failure is reported to the audit log, not the
        // user, and operators reconcile from there.
        match self.chain.broadcast_post(prepared.into_inner()).await {
            Ok(identifier) => {
                debug!("Posted {} for {}", identifier, user.account_name);
                self.api.log_post(&user.account_name, None).await;
            }
            Err(e) => {
                warn!("Broadcast failed for {}: {}", user.account_name, e);
                self.api
                    .log_post(&user.account_name, Some(&e.to_string()))
                    .await;
            }
        }

        port.send(meta.chat_id, self.msg(meta, MsgKey::PostAdded), Keyboard::None)
            .await?;
        Ok(())
    }

    async fn handle_callback(
        &self,
        port: &dyn ChatPort,
        meta: &EventMeta,
        action: CallbackAction,
    ) -> BotResult<()> {
        let Some(callback_id) = meta.callback_id.as_deref() else {
            return Ok(());
        };

        let Some(user) = self.authenticate(port, meta).await? else {
            port.notify_callback(callback_id, "", false).await?;
            return Ok(());
        };

        let Some(post) = self.posts.get(meta.chat_id, meta.message_id).await? else {
            port.notify_callback(callback_id, self.msg(meta, MsgKey::PostNotFound), true)
                .await?;
            return Ok(());
        };

        match action {
            CallbackAction::Upvote => {
                self.process_upvote(port, meta, callback_id, &user, &post.identifier)
                    .await
            }
            CallbackAction::Comment => {
                port.notify_callback(callback_id, "", false).await?;
                port.send(
                    meta.chat_id,
                    self.msg(meta, MsgKey::AskComment),
                    Keyboard::None,
                )
                .await?;
                self.continuations
                    .set(
                        meta.chat_id,
                        &Continuation::AwaitComment {
                            identifier: post.identifier,
                        },
                    )
                    .await
            }
        }
    }

    async fn process_upvote(
        &self,
        port: &dyn ChatPort,
        meta: &EventMeta,
        callback_id: &str,
        user: &UserRecord,
        identifier: &str,
    ) -> BotResult<()> {
        match self.chain.broadcast_vote(identifier, &user.account_name).await {
            Ok(()) => {
                if let Err(e) = self.api.log_upvote(identifier, &user.account_name).await {
                    warn!("Failed to report upvote on {}: {}", identifier, e);
                    return port
                        .notify_callback(callback_id, self.msg(meta, MsgKey::ActionFailed), true)
                        .await;
                }
                port.notify_callback(callback_id, self.msg(meta, MsgKey::VoteSent), false)
                    .await
            }
            Err(ChainError::PostNotFound(_)) => {
                port.notify_callback(callback_id, self.msg(meta, MsgKey::PostNotFound), true)
                    .await
            }
            Err(ChainError::AlreadyVoted(_)) => {
                port.notify_callback(callback_id, self.msg(meta, MsgKey::AlreadyVoted), true)
                    .await
            }
            Err(e) => {
                warn!("Vote on {} failed for {}: {}", identifier, user.account_name, e);
                port.notify_callback(callback_id, self.msg(meta, MsgKey::ActionFailed), true)
                    .await
            }
        }
    }

    async fn process_comment(
        &self,
        port: &dyn ChatPort,
        meta: &EventMeta,
        identifier: &str,
        message: &str,
    ) -> BotResult<()> {
        let Some(user) = self.authenticate(port, meta).await? else {
            return Ok(());
        };

        let outcome = self
            .chain
            .broadcast_reply(identifier, &user.account_name, message)
            .await;

        let key = match outcome {
            Ok(()) => MsgKey::CommentSent,
            Err(ChainError::PostNotFound(_)) => MsgKey::PostNotFound,
            Err(e) => {
                warn!("Comment on {} failed for {}: {}", identifier, user.account_name, e);
                MsgKey::ActionFailed
            }
        };
        port.send(meta.chat_id, self.msg(meta, key), Keyboard::None)
            .await?;
        Ok(())
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
