//! Telegram Bot API `sendMessage` sink (section 4.8).

use serde::Serialize;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub async fn send(
    http: &reqwest::Client,
    bot_token: &str,
    chat_id: &str,
    text: &str,
) -> anyhow::Result<()> {
    send_to(http, DEFAULT_API_BASE, bot_token, chat_id, text).await
}

async fn send_to(
    http: &reqwest::Client,
    api_base: &str,
    bot_token: &str,
    chat_id: &str,
    text: &str,
) -> anyhow::Result<()> {
    let url = format!("{api_base}/bot{bot_token}/sendMessage");
    let response = http
        .post(&url)
        .json(&SendMessageRequest { chat_id, text })
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!("telegram sendMessage returned HTTP {}", response.status());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_posts_to_bot_send_message_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/bot.+/sendMessage$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let result = send_to(&http, &server.uri(), "test-token", "123", "hello").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn send_errors_on_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let result = send_to(&http, &server.uri(), "test-token", "123", "hello").await;
        assert!(result.is_err());
    }
}
