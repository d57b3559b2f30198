use serde::Deserialize;
use serde_with::serde_as;
use std::path::PathBuf;
use std::time;

/// Number of blocks to process, which the config format allows to spell out as the
/// literal string `"all"` in addition to an explicit integer (section 6).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BlockCount {
    All(AllLiteral),
    Count(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllLiteral {
    All,
}

/// Worker pool width; `"auto"` resolves to `std::thread::available_parallelism` at
/// startup (section 5).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MaxProcesses {
    Auto(AutoLiteral),
    Fixed(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoLiteral {
    Auto,
}

impl MaxProcesses {
    pub fn resolve(&self) -> u32 {
        match self {
            MaxProcesses::Fixed(n) => *n,
            MaxProcesses::Auto(_) => std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataStorageSettings {
    pub data_directory: PathBuf,
    pub logs_directory: PathBuf,
    #[serde(default = "default_log_filename")]
    pub log_filename: String,
    pub simulation_output_directory: PathBuf,
    pub database_file: PathBuf,
}

fn default_log_filename() -> String {
    "auditor.log".to_string()
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleSimulationSettings {
    #[serde(default = "default_true")]
    pub simulation_enabled: bool,
    pub max_selected_bundles: usize,
    #[serde(default = "default_simulation_output_file")]
    pub simulation_output_file: String,
}

fn default_simulation_output_file() -> String {
    "simulation_results".to_string()
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitHandlingSettings {
    pub calls_per_minute: u32,
    pub max_retries: u32,
    #[serde_as(as = "serde_with::DurationSecondsWithFrac<f64>")]
    pub initial_delay_seconds: time::Duration,
    #[serde(default = "default_true")]
    pub exponential_backoff: bool,
    #[serde(default = "default_true")]
    pub enable_retry: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceTuningSettings {
    #[serde(default)]
    pub use_multiprocessing: bool,
    #[serde(default = "default_max_processes")]
    pub max_processes: MaxProcesses,
}

fn default_max_processes() -> MaxProcesses {
    MaxProcesses::Fixed(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombinationSearchSettings {
    #[serde(default = "default_max_combination_cardinality")]
    pub max_combination_cardinality: u32,
}

fn default_max_combination_cardinality() -> u32 {
    16
}

impl Default for CombinationSearchSettings {
    fn default() -> Self {
        Self {
            max_combination_cardinality: default_max_combination_cardinality(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsSettings {
    pub base_url: String,
    pub candidate_bundle_query_id: String,
    pub vendored_sql_directory: PathBuf,
}

fn default_true() -> bool {
    true
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub data_storage: DataStorageSettings,

    pub start_block: u64,
    pub end_block: u64,
    #[serde(default)]
    pub num_blocks_to_process: Option<BlockCount>,
    #[serde(default)]
    pub start_block_offset: u64,

    pub bundle_simulation: BundleSimulationSettings,
    pub rate_limit_handling: RateLimitHandlingSettings,
    pub performance_tuning: PerformanceTuningSettings,
    #[serde(default)]
    pub combination_search: CombinationSearchSettings,

    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub polling_rate_seconds: time::Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub block_delay_seconds: time::Duration,

    #[serde(default = "default_true")]
    pub validate_sql: bool,
    #[serde(default)]
    pub abort_on_empty_first_query: bool,

    pub analytics: AnalyticsSettings,
}

impl Settings {
    /// Builds settings from a YAML file overlaid by `AUDITOR__`-prefixed environment
    /// variables (section 6's "single YAML-like config file" plus the pack's layered
    /// `config::Config` convention).
    pub fn build(config_path: &std::path::Path) -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(config_path))
            .add_source(
                config::Environment::with_prefix("AUDITOR")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate_block_range()?;
        Ok(settings)
    }

    /// `start_block > end_block` is a fatal configuration error (section 6, 8).
    pub fn validate_block_range(&self) -> anyhow::Result<()> {
        if self.start_block > self.end_block {
            anyhow::bail!(
                "start_block ({}) is greater than end_block ({})",
                self.start_block,
                self.end_block
            );
        }
        Ok(())
    }

    /// Resolves `num_blocks_to_process` / `start_block_offset` into the effective
    /// `[start, end]` range to ingest, clamped to `self.end_block`.
    pub fn effective_range(&self, resume_from: Option<u64>) -> (u64, u64) {
        let start = resume_from
            .map(|n| n + 1)
            .unwrap_or(self.start_block + self.start_block_offset);
        let end = match &self.num_blocks_to_process {
            Some(BlockCount::Count(n)) => (start.saturating_add(*n).saturating_sub(1)).min(self.end_block),
            Some(BlockCount::All(_)) | None => self.end_block,
        };
        (start, end.min(self.end_block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_range_resumes_from_highest_ingested() {
        let settings = sample_settings();
        let (start, end) = settings.effective_range(Some(105));
        assert_eq!((start, end), (106, 200));
    }

    #[test]
    fn effective_range_starts_fresh_when_store_is_empty() {
        let settings = sample_settings();
        let (start, end) = settings.effective_range(None);
        assert_eq!((start, end), (100, 200));
    }

    fn sample_settings() -> Settings {
        Settings {
            data_storage: DataStorageSettings {
                data_directory: "data".into(),
                logs_directory: "logs".into(),
                log_filename: "auditor.log".into(),
                simulation_output_directory: "sim".into(),
                database_file: "auditor.db".into(),
            },
            start_block: 100,
            end_block: 200,
            num_blocks_to_process: None,
            start_block_offset: 0,
            bundle_simulation: BundleSimulationSettings {
                simulation_enabled: true,
                max_selected_bundles: 5,
                simulation_output_file: "simulation_results".into(),
            },
            rate_limit_handling: RateLimitHandlingSettings {
                calls_per_minute: 60,
                max_retries: 3,
                initial_delay_seconds: time::Duration::from_secs(1),
                exponential_backoff: true,
                enable_retry: true,
            },
            performance_tuning: PerformanceTuningSettings {
                use_multiprocessing: false,
                max_processes: MaxProcesses::Fixed(1),
            },
            combination_search: CombinationSearchSettings::default(),
            polling_rate_seconds: time::Duration::from_secs(5),
            block_delay_seconds: time::Duration::from_secs(0),
            validate_sql: true,
            abort_on_empty_first_query: false,
            analytics: AnalyticsSettings {
                base_url: "http://localhost:8081".into(),
                candidate_bundle_query_id: "query-1".into(),
                vendored_sql_directory: "sql".into(),
            },
        }
    }
}
