//! Endpoint credentials, read directly from the environment (section 6). Every value is
//! optional except `rpc_url`; a missing optional secret silently disables the feature it
//! gates (analytics auth, Telegram, Slack) rather than failing the run.

use crate::error::AuditorError;

#[derive(Clone, Debug)]
pub struct Secrets {
    pub rpc_url: String,
    pub analytics_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub slack_webhook_url: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Result<Self, AuditorError> {
        let rpc_url = std::env::var("RPC_URL").map_err(|_| {
            AuditorError::FatalConfig("RPC_URL environment variable is required".to_string())
        })?;

        Ok(Self {
            rpc_url,
            analytics_api_key: non_empty_env("ANALYTICS_API_KEY"),
            telegram_bot_token: non_empty_env("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: non_empty_env("TELEGRAM_CHAT_ID"),
            slack_webhook_url: non_empty_env("SLACK_WEBHOOK_URL"),
        })
    }

    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some((token, chat_id)),
            _ => None,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
