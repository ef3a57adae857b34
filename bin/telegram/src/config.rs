use serde::{Deserialize, Serialize};

/// Serve updates over a webhook instead of long-polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Public HTTPS URL Telegram delivers updates to.
    pub url: String,
    /// Local address to bind the webhook listener on.
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub bot_token: String,
    /// Base URL of the Photon content API.
    pub api_url: String,
    /// JSON-RPC endpoint of the ledger node shim.
    pub node_url: String,
    /// Base URL for "open in Photon" links under rendered posts.
    pub post_base_url: String,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

impl BotConfig {
    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read bot config {}: {}", path, e))?;
        let config: BotConfig =
            toml::from_str(&contents).map_err(|e| anyhow::anyhow!("Invalid bot config: {}", e))?;
        Ok(config)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow::anyhow!("TELEGRAM_BOT_TOKEN environment variable is required"))?;
        let api_url = std::env::var("PHOTON_API_URL")
            .unwrap_or_else(|_| "https://api.photon.example".to_string());
        let node_url = std::env::var("PHOTON_NODE_URL")
            .unwrap_or_else(|_| "http://localhost:8545".to_string());
        let post_base_url = std::env::var("PHOTON_POST_BASE_URL")
            .unwrap_or_else(|_| "https://photon.example".to_string());

        let webhook = match (
            std::env::var("TELEGRAM_WEBHOOK_URL").ok(),
            std::env::var("TELEGRAM_WEBHOOK_BIND").ok(),
        ) {
            (Some(url), bind) => Some(WebhookConfig {
                url,
                bind: bind.unwrap_or_else(|| "0.0.0.0:8443".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            bot_token,
            api_url,
            node_url,
            post_base_url,
            webhook,
        })
    }
}
