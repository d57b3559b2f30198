//! Per-bundle simulation pipeline (section 4.5): balance precheck, trace call, refund
//! computation, persistence, backrun sub-pass. A failed bundle must never prevent
//! simulation of the next one; only fatal configuration errors propagate out of this
//! module.

use crate::error::AuditorError;
use crate::rpc_client::{CallObject, RpcClient, TraceType};
use crate::store::{Store, TransactionStatus};
use crate::types::{ninety_percent, Bundle, EnrichedTrace, Transaction};
use ethers_core::types::U256;
use std::path::{Path, PathBuf};

/// The result of simulating one bundle (or one combination-search subset): the enriched
/// per-transaction traces and the refund they together produce.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub enriched: Vec<EnrichedTrace>,
    pub refund: U256,
}

/// Appends enriched traces to `simulation_results_<block>.json` (section 6). Multiple
/// bundles in the same block accumulate into one file.
pub struct SimulationOutputWriter {
    directory: PathBuf,
}

impl SimulationOutputWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path(&self, block_number: u64) -> PathBuf {
        simulation_output_path(&self.directory, block_number)
    }

    pub async fn append(&self, block_number: u64, traces: &[EnrichedTrace]) -> anyhow::Result<()> {
        if traces.is_empty() {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.path(block_number);
        let mut existing: Vec<EnrichedTrace> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        existing.extend_from_slice(traces);
        tokio::fs::write(&path, serde_json::to_vec_pretty(&existing)?).await?;
        Ok(())
    }
}

/// Bundle-level balance precheck (step 1): every transaction's `from` must hold at least
/// `value`. The first insufficient transaction fails the whole bundle.
pub async fn bundle_has_sufficient_balance(
    rpc: &RpcClient,
    transactions: &[Transaction],
    block_number: u64,
) -> Result<bool, AuditorError> {
    for tx in transactions {
        let balance = rpc.get_balance(tx.from, block_number).await?;
        if balance < tx.value {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Stricter per-transaction check (step 2): `required = gas_limit * max_fee_per_gas +
/// value`.
pub async fn transaction_has_sufficient_balance(
    rpc: &RpcClient,
    tx: &Transaction,
    block_number: u64,
) -> Result<bool, AuditorError> {
    let balance = rpc.get_balance(tx.from, block_number).await?;
    Ok(balance >= tx.required_balance())
}

/// Steps 3-5: invokes `trace_call_many` for `transactions` (preserving order), zips the
/// result by index, enriches with the canonical mined block (falling back to
/// `block_number` when `get_transaction` fails or is inconclusive), and sums the refund
/// components across the whole set.
pub async fn trace_and_enrich(
    rpc: &RpcClient,
    bundle_id: &str,
    transactions: &[Transaction],
    block_number: u64,
    is_backrun: bool,
) -> Result<SimulationOutcome, AuditorError> {
    if transactions.is_empty() {
        return Ok(SimulationOutcome {
            enriched: Vec::new(),
            refund: U256::zero(),
        });
    }

    let calls = transactions
        .iter()
        .map(|tx| (CallObject::from(tx), vec![TraceType::Trace, TraceType::StateDiff]))
        .collect();
    let traces = rpc.trace_call_many(calls).await?;

    let mut enriched = Vec::with_capacity(traces.len());
    let mut total = U256::zero();
    for (tx, trace) in transactions.iter().zip(traces.into_iter()) {
        let component_sum = trace
            .component_sum()
            .map_err(|e| AuditorError::Malformed(e.to_string()))?;
        total = total.saturating_add(component_sum);
        let mined_block_number = match rpc.get_transaction(tx.hash).await {
            Ok(Some(lookup)) => lookup.block_number.unwrap_or(block_number),
            Ok(None) | Err(_) => block_number,
        };
        enriched.push(EnrichedTrace {
            tx_hash: tx.hash,
            bundle_id: bundle_id.to_string(),
            mined_block_number,
            is_backrun,
            trace,
        });
    }

    Ok(SimulationOutcome {
        enriched,
        refund: ninety_percent(total),
    })
}

/// Runs the full per-bundle pipeline (steps 1-7) for one already-selected bundle, writing
/// status transitions and the enriched trace file as a side effect. Returns the refund
/// produced by the transactions that were actually simulated in this call (`U256::zero()`
/// when nothing new was simulated, e.g. on a resumed run).
pub async fn simulate_bundle(
    rpc: &RpcClient,
    store: &Store,
    output: &SimulationOutputWriter,
    block_number: u64,
    bundle: &Bundle,
) -> anyhow::Result<U256> {
    if let Some(status) = store.bundle_status(&bundle.bundle_id, block_number).await? {
        if status.is_terminal() {
            return Ok(U256::zero());
        }
    }

    if !bundle_has_sufficient_balance(rpc, &bundle.transactions, block_number).await? {
        store
            .upsert_bundle_status(
                &bundle.bundle_id,
                block_number,
                crate::store::BundleStatus::InsufficientBalance,
                false,
            )
            .await?;
        for tx in &bundle.transactions {
            store
                .upsert_transaction_status(
                    &format!("{:#x}", tx.hash),
                    &bundle.bundle_id,
                    block_number,
                    TransactionStatus::InsufficientBalance,
                    false,
                )
                .await?;
        }
        return Ok(U256::zero());
    }

    let mut to_simulate = Vec::new();
    for tx in &bundle.transactions {
        let hash = format!("{:#x}", tx.hash);
        if let Some(existing) = store.transaction_status(&hash).await? {
            if existing.is_terminal() {
                continue;
            }
        }
        if !transaction_has_sufficient_balance(rpc, tx, block_number).await? {
            store
                .upsert_transaction_status(
                    &hash,
                    &bundle.bundle_id,
                    block_number,
                    TransactionStatus::InsufficientBalance,
                    false,
                )
                .await?;
            continue;
        }
        to_simulate.push(tx.clone());
    }

    if to_simulate.is_empty() {
        store
            .upsert_bundle_status(
                &bundle.bundle_id,
                block_number,
                crate::store::BundleStatus::Simulated,
                false,
            )
            .await?;
        return Ok(U256::zero());
    }

    let outcome = trace_and_enrich(rpc, &bundle.bundle_id, &to_simulate, block_number, false)
        .await
        .map_err(anyhow::Error::from)?;

    for tx in &to_simulate {
        store
            .upsert_transaction_status(
                &format!("{:#x}", tx.hash),
                &bundle.bundle_id,
                block_number,
                TransactionStatus::Simulated,
                false,
            )
            .await?;
    }
    output.append(block_number, &outcome.enriched).await?;
    store
        .upsert_bundle_status(
            &bundle.bundle_id,
            block_number,
            crate::store::BundleStatus::Simulated,
            false,
        )
        .await?;

    run_backrun_subpass(rpc, store, output, block_number, &bundle.bundle_id, &to_simulate).await;

    Ok(outcome.refund)
}

/// Step 7: re-simulates each transaction as if it trailed the bundle ("position p+1").
/// Isolated per transaction — a failure here is logged and never propagates to the
/// caller, since the outer bundle has already been marked simulated.
async fn run_backrun_subpass(
    rpc: &RpcClient,
    store: &Store,
    output: &SimulationOutputWriter,
    block_number: u64,
    bundle_id: &str,
    transactions: &[Transaction],
) {
    for tx in transactions {
        let single = std::slice::from_ref(tx);
        match trace_and_enrich(rpc, bundle_id, single, block_number, true).await {
            Ok(outcome) => {
                if let Err(e) = output.append(block_number, &outcome.enriched).await {
                    tracing::error!(tx_hash = %tx.hash, error = %e, "failed to persist backrun trace");
                    continue;
                }
                if let Err(e) = store
                    .upsert_transaction_status(
                        &format!("{:#x}", tx.hash),
                        bundle_id,
                        block_number,
                        TransactionStatus::BackrunSimulated,
                        true,
                    )
                    .await
                {
                    tracing::error!(tx_hash = %tx.hash, error = %e, "failed to persist backrun status");
                }
            }
            Err(e) => {
                tracing::error!(tx_hash = %tx.hash, error = %e, "backrun simulation failed");
            }
        }
    }
}

fn simulation_output_path(directory: &Path, block_number: u64) -> PathBuf {
    directory.join(format!("simulation_results_{block_number}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RateLimitHandlingSettings;
    use crate::types::GasPricing;
    use ethers_core::types::{Address, H256};
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> RateLimitHandlingSettings {
        RateLimitHandlingSettings {
            calls_per_minute: 6000,
            max_retries: 0,
            initial_delay_seconds: Duration::from_millis(1),
            exponential_backoff: false,
            enable_retry: false,
        }
    }

    fn sample_tx(value: u64) -> Transaction {
        Transaction {
            hash: H256::repeat_byte(value as u8),
            from: Address::repeat_byte(1),
            to: None,
            value: U256::from(value),
            gas_limit: U256::from(21_000),
            gas_pricing: GasPricing::Legacy {
                gas_price: U256::from(1),
            },
            nonce: U256::zero(),
            chain_id: 1,
            data: None,
            access_list: None,
            extra: Default::default(),
        }
    }

    async fn rpc_against(server: &MockServer) -> RpcClient {
        RpcClient::new(server.uri(), settings(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn trace_and_enrich_of_empty_set_yields_zero_refund_without_rpc_calls() {
        let server = MockServer::start().await;
        // no mocks mounted: any RPC call would fail the test with a connection error.
        let rpc = rpc_against(&server).await;
        let outcome = trace_and_enrich(&rpc, "bundle_0", &[], 10, false)
            .await
            .unwrap();
        assert!(outcome.enriched.is_empty());
        assert_eq!(outcome.refund, U256::zero());
    }

    #[tokio::test]
    async fn trace_and_enrich_sums_components_and_falls_back_to_current_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::body_partial_json(
                serde_json::json!({"method": "trace_callMany"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": [{"gasUsed": "0x5208", "effectiveGasPrice": "0xa"}],
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::body_partial_json(
                serde_json::json!({"method": "eth_getTransactionByHash"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 2,
                "result": null,
            })))
            .mount(&server)
            .await;

        let rpc = rpc_against(&server).await;
        let tx = sample_tx(0);
        let outcome = trace_and_enrich(&rpc, "bundle_0", &[tx.clone()], 42, false)
            .await
            .unwrap();

        assert_eq!(outcome.enriched.len(), 1);
        assert_eq!(outcome.enriched[0].mined_block_number, 42);
        assert_eq!(outcome.enriched[0].tx_hash, tx.hash);
        // 21000 * 10 = 210_000, 90% = 189_000
        assert_eq!(outcome.refund, U256::from(189_000u64));
    }

    #[tokio::test]
    async fn simulation_output_writer_accumulates_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SimulationOutputWriter::new(dir.path());
        let trace = EnrichedTrace {
            tx_hash: H256::repeat_byte(1),
            bundle_id: "bundle_0".to_string(),
            mined_block_number: 1,
            is_backrun: false,
            trace: crate::types::TraceResult::default(),
        };
        writer.append(1, std::slice::from_ref(&trace)).await.unwrap();
        writer.append(1, std::slice::from_ref(&trace)).await.unwrap();

        let bytes = tokio::fs::read(simulation_output_path(dir.path(), 1))
            .await
            .unwrap();
        let stored: Vec<EnrichedTrace> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(stored.len(), 2);
    }
}
