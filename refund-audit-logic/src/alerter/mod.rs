//! Violation alerting (section 4.8): fans a structured message out to every configured
//! sink independently. One sink's failure must never suppress the other, and a message
//! with zero enabled sinks is logged at `warn` and dropped rather than erroring.

mod slack;
mod telegram;

use crate::detector::ViolationReport;
use crate::secrets::Secrets;

/// The alerter owns its own `reqwest::Client` (no rate limiting — alert volume is
/// bounded by violation count, not RPC throughput) and the subset of secrets that enable
/// each sink.
pub struct Alerter {
    http: reqwest::Client,
    secrets: Secrets,
}

impl Alerter {
    pub fn new(secrets: Secrets) -> Self {
        Self {
            http: reqwest::Client::new(),
            secrets,
        }
    }

    /// Renders `report` into a human-readable message and sends it to every enabled
    /// sink. Each sink's result is logged independently; this method itself never
    /// returns an error, matching the "alerting never aborts the run" policy.
    pub async fn send(&self, report: &ViolationReport) {
        let message = render_message(report);

        let mut any_enabled = false;

        if let Some((token, chat_id)) = self.secrets.telegram() {
            any_enabled = true;
            if let Err(e) = telegram::send(&self.http, token, chat_id, &message).await {
                tracing::error!(error = %e, "telegram alert delivery failed");
            }
        }

        if let Some(webhook_url) = &self.secrets.slack_webhook_url {
            any_enabled = true;
            if let Err(e) = slack::send(&self.http, webhook_url, &message).await {
                tracing::error!(error = %e, "slack alert delivery failed");
            }
        }

        if !any_enabled {
            tracing::warn!(
                block_number = report.block_number,
                "violation detected but no alert sink is configured"
            );
        }
    }
}

fn render_message(report: &ViolationReport) -> String {
    format!(
        "Refund violation at block {}: captured {} wei, optimal was {} wei (delta {} wei). Missed bundles: {}",
        report.block_number,
        report.actual_refund,
        report.highest_refund,
        report.delta,
        if report.missed_opportunities.is_empty() {
            "none".to_string()
        } else {
            report.missed_opportunities.join(", ")
        }
    )
}
