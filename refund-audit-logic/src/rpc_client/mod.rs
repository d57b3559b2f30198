//! Rate-limited, retrying JSON-RPC client for the blockchain node (section 4.1).
//!
//! All four methods are `async fn`s awaited to completion from the caller's point of
//! view; concurrency across blocks/bundles is the caller's responsibility. The shared
//! rate gate and retry policy live here so every caller gets the same budget.

mod call_object;
mod retry;

pub use call_object::{CallObject, TraceType};

use crate::error::AuditorError;
use crate::settings::RateLimitHandlingSettings;
use crate::types::{numeric::to_hex_prefixed, Block, TraceResult};
use ethers_core::types::{Address, H256, U256};
use reqwest_middleware::ClientWithMiddleware;
use rpc_rate_limiter::RpcRateLimiter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<JsonRpcErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorPayload {
    code: i64,
    message: String,
}

/// Minimal transaction lookup result: section 4.5 step 4 only ever needs the block a
/// transaction was actually mined in, falling back to the current block on failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionLookup {
    #[serde(default, with = "block_number_hex")]
    pub block_number: Option<u64>,
}

mod block_number_hex {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()))
    }
}

pub struct RpcClient {
    http: ClientWithMiddleware,
    url: String,
    settings: RateLimitHandlingSettings,
    next_id: std::sync::atomic::AtomicU64,
}

impl RpcClient {
    pub fn new(url: String, settings: RateLimitHandlingSettings, timeout: Duration) -> Self {
        let base = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is valid");

        let calls_per_minute =
            NonZeroU32::new(settings.calls_per_minute.max(1)).expect("checked non-zero above");

        let http = reqwest_middleware::ClientBuilder::new(base)
            .with(RpcRateLimiter::per_minute(calls_per_minute))
            .build();

        Self {
            http,
            url,
            settings,
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    pub async fn get_block(&self, number: u64, include_txs: bool) -> Result<Block, AuditorError> {
        let params = serde_json::json!([to_hex_prefixed(U256::from(number)), include_txs]);
        self.call("eth_getBlockByNumber", params).await
    }

    pub async fn get_balance(&self, address: Address, at_block: u64) -> Result<U256, AuditorError> {
        let params = serde_json::json!([
            format!("{address:#x}"),
            to_hex_prefixed(U256::from(at_block))
        ]);
        let hex: String = self.call("eth_getBalance", params).await?;
        crate::types::numeric::parse_hex_or_decimal(&hex)
            .map_err(|e| AuditorError::Malformed(e.to_string()))
    }

    pub async fn get_transaction(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionLookup>, AuditorError> {
        let params = serde_json::json!([format!("{hash:#x}")]);
        self.call("eth_getTransactionByHash", params).await
    }

    /// Issues a single `trace_callMany` request for `calls`, zipped with `trace_types`
    /// per call (section 4.1). The result list mirrors `calls` by index; callers zip it
    /// with their own metadata.
    pub async fn trace_call_many(
        &self,
        calls: Vec<(CallObject, Vec<TraceType>)>,
    ) -> Result<Vec<TraceResult>, AuditorError> {
        let params: Vec<Value> = calls
            .into_iter()
            .map(|(call, trace_types)| serde_json::json!([call, trace_types]))
            .collect();
        self.call("trace_callMany", Value::Array(params)).await
    }

    async fn call<T: for<'de> Deserialize<'de> + Default>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, AuditorError> {
        retry::with_retry(&self.settings, method, || self.call_once(method, &params)).await
    }

    async fn call_once<T: for<'de> Deserialize<'de> + Default>(
        &self,
        method: &str,
        params: &Value,
    ) -> Result<T, retry::RpcCallError> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params: params.clone(),
        };

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(retry::RpcCallError::Transport)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(retry::RpcCallError::RateLimited);
        }
        if !status.is_success() {
            return Err(retry::RpcCallError::Permanent(format!(
                "{method} returned HTTP {status}"
            )));
        }

        let body: JsonRpcResponse<T> = response
            .json()
            .await
            .map_err(|e| retry::RpcCallError::Transport(e.into()))?;

        if let Some(error) = body.error {
            return Err(retry::RpcCallError::Permanent(format!(
                "{method} returned JSON-RPC error {}: {}",
                error.code, error.message
            )));
        }

        body.result
            .ok_or_else(|| retry::RpcCallError::Permanent(format!("{method} returned no result")))
    }
}
