//! Ingestion pipeline and per-block orchestration (section 4.3): fetches the block and
//! its candidate bundles, persists both caches, then drives selection, simulation,
//! combination search, and detection for that block. Per-block work is independent and
//! bounded by `max_processes`, not fork-join (section 4.3, 5).

use crate::detector;
use crate::runtime::Runtime;
use crate::selector;
use crate::simulator::simulate_bundle;
use crate::store::BundleStatus;
use crate::types::{Block, Bundle};
use ethers_core::types::U256;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;

/// Steps (a)-(e) of section 4.3 for one block: fetch, partition, cache, record.
pub async fn ingest_block(
    rt: &Runtime,
    block_number: u64,
    candidates: &[Bundle],
) -> anyhow::Result<(Block, Vec<Bundle>)> {
    let block = rt
        .telemetry
        .time("ingest_block", block_number, || async {
            rt.rpc.get_block(block_number, true).await
        })
        .await?;

    let bundles_for_block: Vec<Bundle> = candidates
        .iter()
        .filter(|b| b.target_block == block_number)
        .cloned()
        .collect();

    rt.cache.write_block(&block).await?;
    rt.cache.write_bundles(block_number, &bundles_for_block).await?;
    rt.store
        .upsert_block_data(block_number, block.transaction_count(), false)
        .await?;

    Ok((block, bundles_for_block))
}

/// Full per-block pass: ingest, select + simulate, search, detect, alert. A failure here
/// is logged by the caller and never aborts the range (section 4.5: "a failed simulation
/// of one bundle MUST NOT prevent simulation of subsequent bundles" generalises to
/// blocks too).
async fn process_block(rt: &Runtime, block_number: u64, candidates: &[Bundle]) -> anyhow::Result<()> {
    let (_block, bundles) = ingest_block(rt, block_number, candidates).await?;

    if !rt.settings.bundle_simulation.simulation_enabled || bundles.is_empty() {
        return Ok(());
    }

    let selected = selector::select(bundles.clone(), rt.settings.bundle_simulation.max_selected_bundles);

    let mut actual_refund = U256::zero();
    let mut actual_bundle_ids = Vec::new();
    let mut freshly_simulated_refunds: HashMap<String, U256> = HashMap::new();
    for bundle in &selected {
        // A bundle already terminal before this call means `simulate_bundle` below will
        // skip it and return zero regardless of what its true refund was (section 5,
        // resume semantics): that zero must never be cached as a refund value.
        let already_terminal = rt
            .store
            .bundle_status(&bundle.bundle_id, block_number)
            .await?
            .map(|status| status.is_terminal())
            .unwrap_or(false);

        let refund = rt
            .telemetry
            .time("simulate_bundle", block_number, || {
                simulate_bundle(&rt.rpc, &rt.store, &rt.simulation_output, block_number, bundle)
            })
            .await?;

        if !already_terminal {
            freshly_simulated_refunds.insert(bundle.bundle_id.clone(), refund);
        }
        if refund > U256::zero() {
            actual_refund = actual_refund.saturating_add(refund);
            actual_bundle_ids.push(bundle.bundle_id.clone());
        }
    }
    rt.store.mark_block_simulated(block_number).await?;

    // A cached refund is only reused by the search when the store itself confirms the
    // bundle reached `simulated` for this block (section 5: the store is authoritative)
    // and it was this round's own simulation that produced the value, not a terminal
    // status this bundle already carried on entry.
    let simulated_in_store: std::collections::HashSet<String> = rt
        .store
        .bundles_for_block(block_number)
        .await?
        .into_iter()
        .filter(|row| BundleStatus::parse(&row.status) == Some(BundleStatus::Simulated))
        .map(|row| row.bundle_id)
        .collect();
    let known_refunds: HashMap<String, U256> = freshly_simulated_refunds
        .into_iter()
        .filter(|(bundle_id, _)| simulated_in_store.contains(bundle_id))
        .collect();

    let best = rt
        .telemetry
        .time("search_block", block_number, || {
            crate::combination_search::search(
                &rt.rpc,
                block_number,
                &bundles,
                &known_refunds,
                rt.settings.combination_search.max_combination_cardinality,
            )
        })
        .await?;

    if let Some(best) = best {
        if let Some(report) = detector::detect(
            block_number,
            &best.bundle_ids,
            &actual_bundle_ids,
            best.refund,
            actual_refund,
        ) {
            for bundle_id in &actual_bundle_ids {
                rt.store
                    .upsert_bundle_status(bundle_id, block_number, BundleStatus::Simulated, true)
                    .await?;
            }
            rt.alerter.send(&report).await;
        }
    }

    Ok(())
}

/// Drives every block in `[start, end]` through [`process_block`], bounded by
/// `performance_tuning.max_processes`. Errors from a single block are logged and do not
/// stop the remaining blocks.
pub async fn run_range(rt: &Runtime, start: u64, end: u64, candidates: &[Bundle]) {
    let width = rt
        .settings
        .performance_tuning
        .max_processes
        .resolve()
        .max(1) as usize;

    stream::iter(start..=end)
        .for_each_concurrent(Some(width), |block_number| async move {
            if rt.cancellation.is_cancelled() {
                return;
            }
            if let Err(e) = process_block(rt, block_number, candidates).await {
                tracing::error!(block_number, error = %e, "failed to process block");
            }
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerter::Alerter;
    use crate::analytics_client::AnalyticsClient;
    use crate::secrets::Secrets;
    use crate::settings::{
        AnalyticsSettings, BundleSimulationSettings, CombinationSearchSettings,
        DataStorageSettings, MaxProcesses, PerformanceTuningSettings, RateLimitHandlingSettings,
        Settings,
    };
    use crate::simulator::SimulationOutputWriter;
    use crate::store::Store;
    use crate::telemetry::Telemetry;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_runtime(server: &MockServer, dir: &std::path::Path) -> Runtime {
        let settings = Settings {
            data_storage: DataStorageSettings {
                data_directory: dir.join("data"),
                logs_directory: dir.join("logs"),
                log_filename: "auditor.log".into(),
                simulation_output_directory: dir.join("sim"),
                database_file: dir.join("auditor.db"),
            },
            start_block: 1,
            end_block: 1,
            num_blocks_to_process: None,
            start_block_offset: 0,
            bundle_simulation: BundleSimulationSettings {
                simulation_enabled: true,
                max_selected_bundles: 5,
                simulation_output_file: "simulation_results".into(),
            },
            rate_limit_handling: RateLimitHandlingSettings {
                calls_per_minute: 6000,
                max_retries: 0,
                initial_delay_seconds: Duration::from_millis(1),
                exponential_backoff: false,
                enable_retry: false,
            },
            performance_tuning: PerformanceTuningSettings {
                use_multiprocessing: false,
                max_processes: MaxProcesses::Fixed(1),
            },
            combination_search: CombinationSearchSettings::default(),
            polling_rate_seconds: Duration::from_millis(1),
            block_delay_seconds: Duration::from_secs(0),
            validate_sql: false,
            abort_on_empty_first_query: false,
            analytics: AnalyticsSettings {
                base_url: server.uri(),
                candidate_bundle_query_id: "q1".into(),
                vendored_sql_directory: dir.join("sql"),
            },
        };

        let rpc = crate::rpc_client::RpcClient::new(
            server.uri(),
            settings.rate_limit_handling.clone(),
            Duration::from_secs(5),
        );
        let analytics = AnalyticsClient::new(
            server.uri(),
            None,
            Duration::from_millis(1),
            dir.join("sql"),
        );
        let store = Store::open_in_memory().await.unwrap();
        let alerter = Alerter::new(Secrets {
            rpc_url: server.uri(),
            analytics_api_key: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            slack_webhook_url: None,
        });
        let telemetry = Telemetry::new(dir.join("simulation_timings.log"));
        let cache = crate::cache::FileCache::new(dir.join("cache"));
        let simulation_output = SimulationOutputWriter::new(dir.join("sim"));

        Runtime::new(
            rpc,
            analytics,
            store,
            alerter,
            telemetry,
            cache,
            simulation_output,
            settings,
        )
    }

    #[tokio::test]
    async fn ingest_block_writes_caches_and_partitions_bundles() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(
                serde_json::json!({"method": "eth_getBlockByNumber"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "blockNumber": 1,
                    "timestamp": 1_700_000_000u64,
                    "stateRoot": format!("{:#x}", ethers_core::types::H256::zero()),
                    "transactions": [],
                },
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let rt = test_runtime(&server, dir.path()).await;

        let candidates = vec![
            Bundle {
                bundle_id: "in_block".to_string(),
                target_block: 1,
                declared_refund: U256::zero(),
                transactions: vec![],
            },
            Bundle {
                bundle_id: "other_block".to_string(),
                target_block: 2,
                declared_refund: U256::zero(),
                transactions: vec![],
            },
        ];

        let (block, bundles) = ingest_block(&rt, 1, &candidates).await.unwrap();
        assert_eq!(block.block_number, 1);
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].bundle_id, "in_block");
        assert_eq!(rt.store.highest_ingested_block().await.unwrap(), Some(1));
        assert!(rt.cache.read_block(1).await.unwrap().is_some());
    }
}
