use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::types::{FeedCategory, FeedPost, FeedResponse, PreparedPost};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// The photo API surface the bot depends on.
///
/// Feed listings degrade to an empty vec on any failure; the audit log for
/// new posts is fire-and-forget, while the upvote log surfaces its failure
/// to the caller.
#[async_trait]
pub trait PhotoApi: Send + Sync {
    async fn list_posts(&self, category: FeedCategory, username: &str) -> Vec<FeedPost>;

    /// Stage a post submission. The API validates the image/title/tags and
    /// returns a payload the chain gateway can broadcast.
    async fn prepare_post(
        &self,
        image: Vec<u8>,
        title: &str,
        username: &str,
        tags: &[String],
        challenge: &Value,
    ) -> Result<PreparedPost, ApiError>;

    async fn log_post(&self, username: &str, error: Option<&str>);

    async fn log_upvote(&self, identifier: &str, username: &str) -> Result<(), ApiError>;
}

/// Reqwest-backed [`PhotoApi`] implementation.
#[derive(Clone)]
pub struct HttpPhotoApi {
    http: Client,
    base_url: String,
}

impl HttpPhotoApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl PhotoApi for HttpPhotoApi {
    async fn list_posts(&self, category: FeedCategory, username: &str) -> Vec<FeedPost> {
        let url = self.url(category.path());
        let result = async {
            let response: FeedResponse = self
                .http
                .get(&url)
                .query(&[("username", username)])
                .send()
                .await?
                .json()
                .await?;
            Ok::<_, reqwest::Error>(response.results)
        }
        .await;

        match result {
            Ok(posts) => posts,
            Err(e) => {
                warn!("Failed to retrieve {} posts from api: {}", category.label(), e);
                Vec::new()
            }
        }
    }

    async fn prepare_post(
        &self,
        image: Vec<u8>,
        title: &str,
        username: &str,
        tags: &[String],
        challenge: &Value,
    ) -> Result<PreparedPost, ApiError> {
        let mut form = Form::new()
            .part("photo", Part::bytes(image).file_name("photo.jpg"))
            .text("title", title.to_string())
            .text("username", username.to_string())
            .text("trx", challenge.to_string());
        for tag in tags {
            form = form.text("tags", tag.clone());
        }

        let body: Value = self
            .http
            .post(self.url("/v1/post/prepare"))
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        if body.get("payload").is_some() {
            debug!("Post staged for user {}", username);
            return Ok(PreparedPost::new(body));
        }

        // No payload means field-level validation errors: a map of
        // field -> [messages]. Collapse to one user-facing string.
        Err(ApiError::Validation(collect_field_errors(&body)))
    }

    async fn log_post(&self, username: &str, error: Option<&str>) {
        let outcome = self
            .http
            .post(self.url("/v1/log/post"))
            .form(&[("username", username), ("error", error.unwrap_or(""))])
            .send()
            .await;
        if let Err(e) = outcome {
            warn!("Failed to report new post to api: {}", e);
        }
    }

    async fn log_upvote(&self, identifier: &str, username: &str) -> Result<(), ApiError> {
        self.http
            .post(self.url(&format!("/v1/log/post/{identifier}/upvote")))
            .form(&[("username", username)])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn collect_field_errors(body: &Value) -> String {
    let Some(map) = body.as_object() else {
        return "Failed to connect to Photon server".to_string();
    };
    let mut parts: Vec<&str> = map
        .values()
        .filter_map(|v| match v {
            Value::Array(items) => items.first().and_then(Value::as_str),
            Value::String(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return "Failed to connect to Photon server".to_string();
    }
    parts.sort_unstable();
    parts.join(" ")
}
