//! Entry point: loads configuration and secrets, initialises logging, and runs one audit
//! pass over the configured block range (section 6).

use clap::Parser;
use refund_audit_logic::{secrets::Secrets, settings::Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "refund-audit", about = "Offline MEV refund auditor")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

fn init_logging(logs_directory: &std::path::Path, log_filename: &str) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(logs_directory)?;
    let file_appender = tracing_appender::rolling::never(logs_directory, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();

    let settings = match Settings::build(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("fatal configuration error: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let _guard = match init_logging(&settings.data_storage.logs_directory, &settings.data_storage.log_filename) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialise logging: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let secrets = match Secrets::from_env() {
        Ok(secrets) => secrets,
        Err(e) => {
            tracing::error!(error = %e, "fatal configuration error");
            return std::process::ExitCode::FAILURE;
        }
    };

    let runtime = match refund_audit_logic::build_runtime(settings, secrets).await {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to build runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    match refund_audit_logic::run_audit(&runtime).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, fatal = e.is_fatal(), "audit run failed");
            std::process::ExitCode::FAILURE
        }
    }
}

