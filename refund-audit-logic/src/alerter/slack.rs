//! Slack incoming-webhook sink (section 4.8).

use serde::Serialize;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

pub async fn send(http: &reqwest::Client, webhook_url: &str, text: &str) -> anyhow::Result<()> {
    let response = http
        .post(webhook_url)
        .json(&WebhookPayload { text })
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!("slack webhook returned HTTP {}", response.status());
    }
    Ok(())
}
