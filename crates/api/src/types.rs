use serde::Deserialize;

/// The four feed listings the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCategory {
    /// Posts from accounts the user follows.
    Feed,
    New,
    Hot,
    Top,
}

impl FeedCategory {
    pub fn path(&self) -> &'static str {
        match self {
            FeedCategory::Feed => "/v1_1/recent",
            FeedCategory::New => "/v1_1/posts/new",
            FeedCategory::Hot => "/v1_1/posts/hot",
            FeedCategory::Top => "/v1_1/posts/top",
        }
    }

    /// Human-readable name, used in "no photos in {source}" notices.
    pub fn label(&self) -> &'static str {
        match self {
            FeedCategory::Feed => "Feed",
            FeedCategory::New => "New",
            FeedCategory::Hot => "Hot",
            FeedCategory::Top => "Top",
        }
    }
}

/// One feed entry as the API returns it. Ordering is the API's contract;
/// entries are rendered as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPost {
    pub author: String,
    pub title: String,
    /// Image URL.
    pub body: String,
    /// Relative post URL containing `@author/permlink`.
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedResponse {
    #[serde(default)]
    pub results: Vec<FeedPost>,
}

/// Staged submission returned by the prepare endpoint. Kept as the raw
/// payload the API produced; the chain gateway extracts what it needs at
/// broadcast time.
#[derive(Debug, Clone)]
pub struct PreparedPost(serde_json::Value);

impl PreparedPost {
    pub fn new(raw: serde_json::Value) -> Self {
        Self(raw)
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}
