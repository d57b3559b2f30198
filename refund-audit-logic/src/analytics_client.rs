//! Candidate-bundle analytics client (section 4.2): submits a parameterised query,
//! polls to completion, and returns the candidate bundle rows. Guards against a silently
//! rewritten remote query by comparing it to a vendored local copy before the first run.

use crate::error::AuditorError;
use crate::types::Bundle;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    execution_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: ExecutionStatus,
}

#[derive(Debug, Deserialize)]
struct QueryTextResponse {
    sql: String,
}

pub struct AnalyticsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    polling_rate: Duration,
    vendored_sql_directory: PathBuf,
}

impl AnalyticsClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        polling_rate: Duration,
        vendored_sql_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            polling_rate,
            vendored_sql_directory: vendored_sql_directory.into(),
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Fetches the remote query text for `query_id` and compares it (after trimming) to
    /// the vendored local copy at `<vendored_sql_directory>/<query_id>.sql` (section
    /// 4.2). Any divergence is fatal; the process must abort, never silently proceed
    /// against a query whose semantics may have changed.
    pub async fn verify_sql_guard(&self, query_id: &str) -> Result<(), AuditorError> {
        let remote = self
            .authed(self.http.get(format!("{}/queries/{query_id}", self.base_url)))
            .send()
            .await
            .map_err(|e| AuditorError::Other(e.into()))?
            .json::<QueryTextResponse>()
            .await
            .map_err(|e| AuditorError::Other(e.into()))?;

        let vendored_path = self.vendored_sql_directory.join(format!("{query_id}.sql"));
        let vendored = tokio::fs::read_to_string(&vendored_path)
            .await
            .map_err(|e| {
                AuditorError::FatalConfig(format!(
                    "could not read vendored SQL at {}: {e}",
                    vendored_path.display()
                ))
            })?;

        if remote.sql.trim() != vendored.trim() {
            return Err(AuditorError::SqlGuardMismatch {
                query_id: query_id.to_string(),
            });
        }
        Ok(())
    }

    /// Submits `query_id` with `{start_block, end_block}`, polls at `polling_rate` until
    /// `COMPLETED` or `FAILED`, and returns the candidate bundle rows. `FAILED` yields an
    /// empty list rather than an error — the pipeline treats "no candidates this round"
    /// as valid (section 4.2: "no partial results").
    pub async fn run_query(
        &self,
        query_id: &str,
        start_block: u64,
        end_block: u64,
    ) -> Result<Vec<Bundle>, AuditorError> {
        let execute = self
            .authed(
                self.http
                    .post(format!("{}/queries/{query_id}/execute", self.base_url)),
            )
            .json(&serde_json::json!({"start_block": start_block, "end_block": end_block}))
            .send()
            .await
            .map_err(|e| AuditorError::Other(e.into()))?
            .json::<ExecuteResponse>()
            .await
            .map_err(|e| AuditorError::Other(e.into()))?;

        loop {
            let status = self
                .authed(self.http.get(format!(
                    "{}/executions/{}/status",
                    self.base_url, execute.execution_id
                )))
                .send()
                .await
                .map_err(|e| AuditorError::Other(e.into()))?
                .json::<StatusResponse>()
                .await
                .map_err(|e| AuditorError::Other(e.into()))?;

            match status.status {
                ExecutionStatus::Completed => {
                    let rows: Vec<Bundle> = self
                        .authed(self.http.get(format!(
                            "{}/executions/{}/results",
                            self.base_url, execute.execution_id
                        )))
                        .send()
                        .await
                        .map_err(|e| AuditorError::Other(e.into()))?
                        .json()
                        .await
                        .map_err(|e| AuditorError::Other(e.into()))?;
                    return Ok(rows);
                }
                ExecutionStatus::Failed => {
                    tracing::warn!(query_id, "analytics execution failed, returning no candidates");
                    return Ok(Vec::new());
                }
                ExecutionStatus::Running => {
                    tokio::time::sleep(self.polling_rate).await;
                }
            }
        }
    }
}
