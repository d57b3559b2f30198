//! Offline refund auditor core: ingestion, simulation, optimal-combination search, and
//! violation detection over a private transaction-ordering service's candidate bundles.

pub mod alerter;
pub mod analytics_client;
pub mod cache;
pub mod combination_search;
pub mod detector;
pub mod error;
pub mod ingestion;
pub mod rpc_client;
pub mod runtime;
pub mod secrets;
pub mod selector;
pub mod settings;
pub mod simulator;
pub mod store;
pub mod telemetry;
pub mod types;

pub use error::AuditorError;
pub use runtime::Runtime;
pub use settings::Settings;

use std::time::Duration;

/// Builds a [`Runtime`] from settings and secrets (section 4.10): opens the persistence
/// store (running embedded migrations), constructs the RPC client, analytics client, and
/// alerter.
pub async fn build_runtime(
    settings: Settings,
    secrets: secrets::Secrets,
) -> anyhow::Result<Runtime> {
    let store = store::Store::open(&settings.data_storage.database_file).await?;
    let rpc = rpc_client::RpcClient::new(
        secrets.rpc_url.clone(),
        settings.rate_limit_handling.clone(),
        Duration::from_secs(30),
    );
    let analytics = analytics_client::AnalyticsClient::new(
        settings.analytics.base_url.clone(),
        secrets.analytics_api_key.clone(),
        settings.polling_rate_seconds,
        settings.analytics.vendored_sql_directory.clone(),
    );
    let alerter = alerter::Alerter::new(secrets);
    let telemetry = telemetry::Telemetry::new(
        settings.data_storage.logs_directory.join("simulation_timings.log"),
    );
    let cache = cache::FileCache::new(settings.data_storage.data_directory.clone());
    let simulation_output =
        simulator::SimulationOutputWriter::new(settings.data_storage.simulation_output_directory.clone());

    Ok(Runtime::new(
        rpc,
        analytics,
        store,
        alerter,
        telemetry,
        cache,
        simulation_output,
        settings,
    ))
}

/// The full run (section 4.10): validates the SQL guard, resolves the resumable block
/// range, fetches candidate bundles for it, and drives every block through
/// [`ingestion::run_range`].
pub async fn run_audit(rt: &Runtime) -> Result<(), AuditorError> {
    if rt.settings.validate_sql {
        rt.analytics
            .verify_sql_guard(&rt.settings.analytics.candidate_bundle_query_id)
            .await?;
    }

    if rt.settings.start_block > rt.settings.end_block {
        return Err(AuditorError::FatalConfig(format!(
            "start_block {} exceeds end_block {}",
            rt.settings.start_block, rt.settings.end_block
        )));
    }

    let resume_from = rt.store.highest_ingested_block().await?;
    if let Some(resume_from) = resume_from {
        if resume_from >= rt.settings.end_block {
            return Err(AuditorError::FatalConfig(format!(
                "latest-processed block {resume_from} meets or exceeds end_block {}",
                rt.settings.end_block
            )));
        }
    }

    let (start, end) = rt.settings.effective_range(resume_from);
    if start > end {
        return Ok(());
    }

    let candidates = rt
        .analytics
        .run_query(&rt.settings.analytics.candidate_bundle_query_id, start, end)
        .await?;

    if candidates.is_empty() && rt.settings.abort_on_empty_first_query && resume_from.is_none() {
        return Err(AuditorError::FatalConfig(
            "analytics query returned no candidate bundles on the first run".to_string(),
        ));
    }

    ingestion::run_range(rt, start, end, &candidates).await;
    Ok(())
}
