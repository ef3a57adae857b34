//! End-to-end conversation flows against in-memory fakes: a fake node
//! behind the chain gateway, a fake photo API, a fake chat port and a
//! sqlite-backed store set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use photon_api::{ApiError, FeedCategory, FeedPost, PhotoApi, PreparedPost};
use photon_bot_core::{
    AppOptions, BotApp, BotResult, CallbackAction, ChatPort, Command, ContinuationStore, EventMeta,
    IdentityStore, InboundEvent, Keyboard, MenuAction, MessageRef, PostStore, db::ensure_schema,
};
use photon_chain::{AccountInfo, ChainGateway, ChainRpc, RpcError, SignedOperation};
use serde_json::{Value, json};
use sqlx::any::AnyPoolOptions;

struct FakeRpc {
    accounts: HashMap<String, AccountInfo>,
    broadcasts: Mutex<Vec<Value>>,
}

impl FakeRpc {
    fn with_account(name: &str, posting_authority: &str) -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(
            name.to_string(),
            AccountInfo {
                name: name.to_string(),
                posting_authority: posting_authority.to_string(),
            },
        );
        Self {
            accounts,
            broadcasts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChainRpc for FakeRpc {
    async fn get_account(&self, name: &str) -> Result<Option<AccountInfo>, RpcError> {
        Ok(self.accounts.get(name).cloned())
    }

    async fn broadcast(&self, op: &SignedOperation) -> Result<(), RpcError> {
        self.broadcasts.lock().unwrap().push(op.op.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Sent {
    chat_id: i64,
    message_id: i64,
    text: String,
    keyboard: Keyboard,
}

#[derive(Default)]
struct FakePort {
    next_id: AtomicI64,
    sent: Mutex<Vec<Sent>>,
    photos: Mutex<Vec<(i64, i64, String)>>,
    notifications: Mutex<Vec<(String, bool)>>,
    recallable: Mutex<HashMap<(i64, i64), String>>,
}

impl FakePort {
    fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            ..Self::default()
        }
    }

    fn record(&self, chat_id: i64, text: &str, keyboard: Keyboard) -> MessageRef {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(Sent {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard,
        });
        MessageRef { chat_id, message_id }
    }

    fn last(&self) -> Sent {
        self.sent.lock().unwrap().last().cloned().unwrap()
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatPort for FakePort {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Keyboard) -> BotResult<MessageRef> {
        Ok(self.record(chat_id, text, keyboard))
    }

    async fn reply(
        &self,
        chat_id: i64,
        _reply_to: i64,
        text: &str,
        keyboard: Keyboard,
    ) -> BotResult<MessageRef> {
        Ok(self.record(chat_id, text, keyboard))
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        image_url: &str,
        caption: &str,
        _open_url: &str,
    ) -> BotResult<MessageRef> {
        let sent = self.record(chat_id, caption, Keyboard::None);
        self.photos
            .lock()
            .unwrap()
            .push((chat_id, sent.message_id, image_url.to_string()));
        Ok(sent)
    }

    async fn delete_message(&self, _chat_id: i64, _message_id: i64) -> BotResult<()> {
        Ok(())
    }

    async fn recall_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> BotResult<Option<String>> {
        Ok(self
            .recallable
            .lock()
            .unwrap()
            .get(&(chat_id, message_id))
            .cloned())
    }

    async fn notify_callback(&self, _callback_id: &str, text: &str, alert: bool) -> BotResult<()> {
        self.notifications
            .lock()
            .unwrap()
            .push((text.to_string(), alert));
        Ok(())
    }

    async fn download_image(&self, _file_id: &str) -> BotResult<Vec<u8>> {
        Ok(vec![0xff, 0xd8, 0xff])
    }
}

#[derive(Default)]
struct FakeApi {
    feed: Mutex<Vec<FeedPost>>,
    prepared: Mutex<Vec<(String, String, Vec<String>)>>,
    post_logs: Mutex<Vec<Option<String>>>,
    upvote_logs: Mutex<Vec<String>>,
}

#[async_trait]
impl PhotoApi for FakeApi {
    async fn list_posts(&self, _category: FeedCategory, _username: &str) -> Vec<FeedPost> {
        self.feed.lock().unwrap().clone()
    }

    async fn prepare_post(
        &self,
        _image: Vec<u8>,
        title: &str,
        username: &str,
        tags: &[String],
        _challenge: &Value,
    ) -> Result<PreparedPost, ApiError> {
        self.prepared
            .lock()
            .unwrap()
            .push((username.to_string(), title.to_string(), tags.to_vec()));
        Ok(PreparedPost::new(json!({
            "payload": {
                "username": username,
                "title": title,
                "body": "https://img.photon.example/1.jpg",
                "tags": tags,
            },
            "meta": { "app": "photon" },
            "beneficiaries": [],
        })))
    }

    async fn log_post(&self, _username: &str, error: Option<&str>) {
        self.post_logs
            .lock()
            .unwrap()
            .push(error.map(str::to_string));
    }

    async fn log_upvote(&self, identifier: &str, _username: &str) -> Result<(), ApiError> {
        self.upvote_logs.lock().unwrap().push(identifier.to_string());
        Ok(())
    }
}

struct Harness {
    app: BotApp,
    port: FakePort,
    api: Arc<FakeApi>,
    chain: Arc<ChainGateway>,
    rpc: Arc<FakeRpc>,
    identity: IdentityStore,
    wif: String,
}

const USER: i64 = 1;
const CHAT: i64 = 10;

async fn harness() -> Harness {
    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    ensure_schema(&pool).await.unwrap();

    let signer = PrivateKeySigner::random();
    let wif = hex::encode(signer.to_bytes());
    let rpc = Arc::new(FakeRpc::with_account("alice", &signer.address().to_string()));
    let chain = Arc::new(ChainGateway::new(rpc.clone()));
    let api = Arc::new(FakeApi::default());

    let identity = IdentityStore::new(pool.clone());
    let app = BotApp::new(
        identity.clone(),
        PostStore::new(pool.clone()),
        ContinuationStore::new(pool),
        chain.clone(),
        api.clone(),
        AppOptions {
            post_base_url: "https://photon.example".to_string(),
            feed_limit: 5,
        },
    );

    Harness {
        app,
        port: FakePort::new(),
        api,
        chain,
        rpc,
        identity,
        wif,
    }
}

fn meta(message_id: i64) -> EventMeta {
    EventMeta {
        user_id: USER,
        chat_id: CHAT,
        message_id,
        locale: None,
        callback_id: None,
    }
}

fn callback_meta(message_id: i64) -> EventMeta {
    EventMeta {
        callback_id: Some("cb-1".to_string()),
        ..meta(message_id)
    }
}

impl Harness {
    async fn event(&self, meta: &EventMeta, event: InboundEvent) {
        self.app.handle_event(&self.port, meta, event).await.unwrap();
    }

    async fn log_in(&self) {
        self.event(&meta(1), InboundEvent::Menu(MenuAction::LogIn))
            .await;
        self.event(&meta(2), InboundEvent::Text("alice".to_string()))
            .await;
        // Message 3 is the user's key message; make it recallable so a
        // lapsed session can be restored from it.
        self.port
            .recallable
            .lock()
            .unwrap()
            .insert((CHAT, 3), self.wif.clone());
        self.event(&meta(3), InboundEvent::Text(self.wif.clone()))
            .await;
    }
}

#[tokio::test]
async fn start_prompts_login_for_strangers() {
    let h = harness().await;
    h.event(&meta(1), InboundEvent::Command(Command::Start)).await;
    let sent = h.port.last();
    assert!(sent.text.starts_with("Welcome"));
    assert_eq!(sent.keyboard, Keyboard::Login);
}

#[tokio::test]
async fn login_flow_signs_user_in() {
    let h = harness().await;
    h.log_in().await;

    assert!(h.chain.is_logged_in("alice").await);
    let record = h.identity.get(USER).await.unwrap().unwrap();
    assert_eq!(record.account_name, "alice");
    assert_eq!(record.chat_id, CHAT);
    assert_eq!(record.key_message_id, 3);

    let texts: Vec<Sent> = h.port.sent.lock().unwrap().clone();
    let logged_in = texts
        .iter()
        .find(|s| s.text.contains("logged in as alice"))
        .unwrap();
    assert_eq!(logged_in.keyboard, Keyboard::Main);
}

#[tokio::test]
async fn unknown_username_reprompts() {
    let h = harness().await;
    h.event(&meta(1), InboundEvent::Menu(MenuAction::LogIn)).await;
    h.event(&meta(2), InboundEvent::Text("bob".to_string())).await;
    assert!(h.port.last().text.contains("could not find"));

    // The username continuation survives, so the next text is tried again.
    h.event(&meta(3), InboundEvent::Text("alice".to_string())).await;
    assert!(h.port.last().text.contains("posting key"));
}

#[tokio::test]
async fn wrong_key_returns_to_login() {
    let h = harness().await;
    h.event(&meta(1), InboundEvent::Menu(MenuAction::LogIn)).await;
    h.event(&meta(2), InboundEvent::Text("alice".to_string())).await;
    h.event(&meta(3), InboundEvent::Text("not-a-key".to_string()))
        .await;

    let sent = h.port.last();
    assert!(sent.text.contains("did not match"));
    assert_eq!(sent.keyboard, Keyboard::Login);
    assert!(!h.chain.is_logged_in("alice").await);
}

#[tokio::test]
async fn guard_blocks_unauthenticated_actions() {
    let h = harness().await;
    h.event(&meta(1), InboundEvent::Menu(MenuAction::Feed(FeedCategory::New)))
        .await;

    let sent = h.port.last();
    assert!(sent.text.contains("log in"));
    assert_eq!(sent.keyboard, Keyboard::Login);
    assert!(h.port.photos.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pending_continuation_claims_menu_labels() {
    let h = harness().await;
    h.event(&meta(1), InboundEvent::Menu(MenuAction::LogIn)).await;

    // An account happening to be named like a button is still a username
    // attempt, not a feed request.
    h.event(&meta(2), InboundEvent::Text("Hot".to_string())).await;
    let sent = h.port.last();
    assert!(sent.text.contains("could not find"));
    assert!(h.port.photos.lock().unwrap().is_empty());

    // The dialogue is intact: the next text is tried as a username too.
    h.event(&meta(3), InboundEvent::Text("alice".to_string())).await;
    assert!(h.port.last().text.contains("posting key"));
}

#[tokio::test]
async fn pending_continuation_claims_commands() {
    let h = harness().await;
    h.event(&meta(1), InboundEvent::Menu(MenuAction::LogIn)).await;
    h.event(&meta(2), InboundEvent::Text("/start".to_string())).await;

    // Taken as a (nonexistent) username, not as the start command.
    let sent = h.port.last();
    assert!(sent.text.contains("could not find"));
    assert!(!sent.text.starts_with("Welcome"));
}

#[tokio::test]
async fn idle_text_is_classified_as_commands_and_menus() {
    let h = harness().await;
    h.event(&meta(1), InboundEvent::Text("/start".to_string())).await;
    let sent = h.port.last();
    assert!(sent.text.starts_with("Welcome"));
    assert_eq!(sent.keyboard, Keyboard::Login);

    h.event(&meta(2), InboundEvent::Text("Hot".to_string())).await;
    assert!(h.port.last().text.contains("log in"));
}

#[tokio::test]
async fn stray_text_is_dropped() {
    let h = harness().await;
    h.event(&meta(1), InboundEvent::Text("hello?".to_string())).await;
    assert_eq!(h.port.sent_count(), 0);
}

#[tokio::test]
async fn feed_renders_posts_and_remembers_references() {
    let h = harness().await;
    h.log_in().await;
    *h.api.feed.lock().unwrap() = vec![
        FeedPost {
            author: "carol".to_string(),
            title: "Sunset".to_string(),
            body: "https://img/1.jpg".to_string(),
            url: "/post/@carol/sunset".to_string(),
        },
        FeedPost {
            author: "dave".to_string(),
            title: "Harbor".to_string(),
            body: "https://img/2.jpg".to_string(),
            url: "/post/@dave/harbor".to_string(),
        },
    ];

    h.event(&meta(4), InboundEvent::Menu(MenuAction::Feed(FeedCategory::Hot)))
        .await;

    let photos = h.port.photos.lock().unwrap().clone();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0].2, "https://img/1.jpg");

    // An upvote on the second rendered message resolves dave's post.
    let second_message = photos[1].1;
    h.event(
        &callback_meta(second_message),
        InboundEvent::Callback(CallbackAction::Upvote),
    )
    .await;

    let notifications = h.port.notifications.lock().unwrap().clone();
    assert_eq!(notifications.last().unwrap(), &("Upvoted!".to_string(), false));
    assert_eq!(
        h.api.upvote_logs.lock().unwrap().clone(),
        vec!["@dave/harbor".to_string()]
    );
    let votes: Vec<Value> = h.rpc.broadcasts.lock().unwrap().clone();
    assert_eq!(votes.last().unwrap()["identifier"], "@dave/harbor");
}

#[tokio::test]
async fn empty_feed_notice_names_the_source() {
    let h = harness().await;
    h.log_in().await;
    h.event(&meta(4), InboundEvent::Menu(MenuAction::Feed(FeedCategory::Top)))
        .await;
    assert!(h.port.last().text.contains("Top"));
}

#[tokio::test]
async fn callback_on_forgotten_message_alerts() {
    let h = harness().await;
    h.log_in().await;
    h.event(
        &callback_meta(999),
        InboundEvent::Callback(CallbackAction::Upvote),
    )
    .await;

    let notifications = h.port.notifications.lock().unwrap().clone();
    let (text, alert) = notifications.last().unwrap().clone();
    assert!(text.contains("no longer available"));
    assert!(alert);
}

#[tokio::test]
async fn comment_flow_broadcasts_reply() {
    let h = harness().await;
    h.log_in().await;
    *h.api.feed.lock().unwrap() = vec![FeedPost {
        author: "carol".to_string(),
        title: "Sunset".to_string(),
        body: "https://img/1.jpg".to_string(),
        url: "/post/@carol/sunset".to_string(),
    }];
    h.event(&meta(4), InboundEvent::Menu(MenuAction::Feed(FeedCategory::Feed)))
        .await;
    let rendered = h.port.photos.lock().unwrap()[0].1;

    h.event(
        &callback_meta(rendered),
        InboundEvent::Callback(CallbackAction::Comment),
    )
    .await;
    assert!(h.port.last().text.contains("comment"));

    h.event(&meta(5), InboundEvent::Text("Great shot".to_string()))
        .await;
    assert!(h.port.last().text.contains("Comment added"));

    let ops: Vec<Value> = h.rpc.broadcasts.lock().unwrap().clone();
    let reply = ops.last().unwrap();
    assert_eq!(reply["type"], "reply");
    assert_eq!(reply["identifier"], "@carol/sunset");
    assert_eq!(reply["body"], "Great shot");
}

#[tokio::test]
async fn captioned_photo_is_posted_with_tags() {
    let h = harness().await;
    h.log_in().await;
    h.event(
        &meta(4),
        InboundEvent::Photo {
            file_id: "file-1".to_string(),
            caption: Some("Evening light #sunset #photo".to_string()),
        },
    )
    .await;

    let prepared = h.api.prepared.lock().unwrap().clone();
    assert_eq!(
        prepared,
        vec![(
            "alice".to_string(),
            "Evening light".to_string(),
            vec!["sunset".to_string(), "photo".to_string()]
        )]
    );
    assert_eq!(h.api.post_logs.lock().unwrap().clone(), vec![None]);
    assert!(h.port.last().text.contains("posted"));

    let ops: Vec<Value> = h.rpc.broadcasts.lock().unwrap().clone();
    assert_eq!(ops.last().unwrap()["type"], "post");
}

#[tokio::test]
async fn uncaptioned_photo_waits_for_a_title() {
    let h = harness().await;
    h.log_in().await;
    h.event(
        &meta(4),
        InboundEvent::Photo {
            file_id: "file-2".to_string(),
            caption: None,
        },
    )
    .await;
    assert!(h.port.last().text.contains("title"));
    assert!(h.api.prepared.lock().unwrap().is_empty());

    h.event(&meta(5), InboundEvent::Text("Morning fog #mist".to_string()))
        .await;
    let prepared = h.api.prepared.lock().unwrap().clone();
    assert_eq!(prepared[0].1, "Morning fog");
    assert_eq!(prepared[0].2, vec!["mist".to_string()]);
}

#[tokio::test]
async fn lapsed_session_is_restored_from_key_message() {
    let h = harness().await;
    h.log_in().await;
    h.chain.logout("alice").await;
    assert!(!h.chain.is_logged_in("alice").await);

    *h.api.feed.lock().unwrap() = vec![FeedPost {
        author: "carol".to_string(),
        title: "Sunset".to_string(),
        body: "https://img/1.jpg".to_string(),
        url: "/post/@carol/sunset".to_string(),
    }];
    h.event(&meta(9), InboundEvent::Menu(MenuAction::Feed(FeedCategory::New)))
        .await;

    assert!(h.chain.is_logged_in("alice").await);
    assert_eq!(h.port.photos.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unrecallable_key_message_forces_relogin() {
    let h = harness().await;
    h.log_in().await;
    h.chain.logout("alice").await;
    h.port.recallable.lock().unwrap().clear();

    h.event(&meta(9), InboundEvent::Menu(MenuAction::Feed(FeedCategory::New)))
        .await;

    let sent = h.port.last();
    assert!(sent.text.contains("did not match"));
    assert_eq!(sent.keyboard, Keyboard::Login);
    assert!(!h.chain.is_logged_in("alice").await);
}

#[tokio::test]
async fn key_from_a_stale_chat_restarts_login() {
    let h = harness().await;
    h.event(&meta(1), InboundEvent::Menu(MenuAction::LogIn)).await;
    h.event(&meta(2), InboundEvent::Text("alice".to_string())).await;

    // The username step is redone from a second chat, so the first
    // chat's claim on the account is stale.
    let other = |message_id| EventMeta {
        chat_id: CHAT + 1,
        ..meta(message_id)
    };
    h.event(&other(3), InboundEvent::Menu(MenuAction::LogIn)).await;
    h.event(&other(4), InboundEvent::Text("alice".to_string())).await;

    // A key arriving in the first chat must not finish the login there.
    h.event(&meta(5), InboundEvent::Text(h.wif.clone())).await;
    assert!(!h.chain.is_logged_in("alice").await);
    let sent = h.port.last();
    assert_eq!(sent.chat_id, CHAT);
    assert!(sent.text.contains("username"));
}

#[tokio::test]
async fn logout_clears_identity_and_session() {
    let h = harness().await;
    h.log_in().await;
    h.event(&meta(4), InboundEvent::Menu(MenuAction::LogOut)).await;

    assert!(!h.chain.is_logged_in("alice").await);
    assert!(h.identity.get(USER).await.unwrap().is_none());
    let sent = h.port.last();
    assert!(sent.text.contains("logged out"));
    assert_eq!(sent.keyboard, Keyboard::Login);
}

#[tokio::test]
async fn login_button_while_signed_in_short_circuits() {
    let h = harness().await;
    h.log_in().await;
    h.event(&meta(4), InboundEvent::Menu(MenuAction::LogIn)).await;
    let sent = h.port.last();
    assert!(sent.text.contains("already logged in"));
    assert_eq!(sent.keyboard, Keyboard::Main);
}

#[tokio::test]
async fn settings_shows_account_panel() {
    let h = harness().await;
    h.log_in().await;
    h.event(&meta(4), InboundEvent::Menu(MenuAction::Settings)).await;
    let sent = h.port.last();
    assert!(sent.text.contains("alice"));
    assert_eq!(sent.keyboard, Keyboard::Settings);
}
