//! Bundles every external collaborator behind one value threaded by reference through
//! the pipeline (design note, section 9): the RPC client, analytics client, store
//! handle, and alerter, plus the telemetry writer and on-disk caches. Mockable in tests
//! because each collaborator is itself wiremock-backed or in-memory.

use crate::alerter::Alerter;
use crate::analytics_client::AnalyticsClient;
use crate::cache::FileCache;
use crate::rpc_client::RpcClient;
use crate::settings::Settings;
use crate::simulator::SimulationOutputWriter;
use crate::store::Store;
use crate::telemetry::Telemetry;
use tokio_util::sync::CancellationToken;

pub struct Runtime {
    pub rpc: RpcClient,
    pub analytics: AnalyticsClient,
    pub store: Store,
    pub alerter: Alerter,
    pub telemetry: Telemetry,
    pub cache: FileCache,
    pub simulation_output: SimulationOutputWriter,
    pub settings: Settings,
    pub cancellation: CancellationToken,
}

impl Runtime {
    pub fn new(
        rpc: RpcClient,
        analytics: AnalyticsClient,
        store: Store,
        alerter: Alerter,
        telemetry: Telemetry,
        cache: FileCache,
        simulation_output: SimulationOutputWriter,
        settings: Settings,
    ) -> Self {
        Self {
            rpc,
            analytics,
            store,
            alerter,
            telemetry,
            cache,
            simulation_output,
            settings,
            cancellation: CancellationToken::new(),
        }
    }
}
