//! Step-duration telemetry (section 4.9): a hand-rolled line-writer, deliberately not a
//! `tracing` layer, because `simulation_timings.log` is a fixed one-line-per-step format
//! consumed by post-processing tooling outside this crate (ambient stack expansion).

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub struct Telemetry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Telemetry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Times `f`, then appends one line to the timings file regardless of whether `f`
    /// succeeded: `<step>\t<duration_ms>\t<block_number>\t<outcome>`.
    pub async fn time<F, Fut, T, E>(&self, step: &str, block_number: u64, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let result = f().await;
        let elapsed = start.elapsed();
        let outcome = if result.is_ok() { "ok" } else { "error" };
        if let Err(e) = self.append_line(step, block_number, elapsed, outcome).await {
            tracing::warn!(error = %e, "failed to write telemetry line");
        }
        result
    }

    async fn append_line(
        &self,
        step: &str,
        block_number: u64,
        elapsed: Duration,
        outcome: &str,
    ) -> std::io::Result<()> {
        let line = format!(
            "{step}\t{}\t{block_number}\t{outcome}\n",
            elapsed.as_millis()
        );
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn time_records_one_line_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let telemetry = Telemetry::new(dir.path().join("simulation_timings.log"));

        let _: Result<(), ()> = telemetry.time("ingest_block", 10, || async { Ok(()) }).await;
        let _: Result<(), ()> = telemetry
            .time("rpc_call", 10, || async { Err(()) })
            .await;

        let contents = tokio::fs::read_to_string(dir.path().join("simulation_timings.log"))
            .await
            .unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ingest_block\t"));
        assert!(lines[0].ends_with("\t10\tok"));
        assert!(lines[1].ends_with("\t10\terror"));
    }
}
