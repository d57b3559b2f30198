use crate::error::AuditorError;
use crate::settings::RateLimitHandlingSettings;
use std::future::Future;
use std::time::Duration;

/// The three outcomes a single RPC attempt can have, as distinguished by the retry
/// policy (section 4.1 / 7): a 429-equivalent and a transport failure are retried
/// identically; any other HTTP error or JSON-RPC error surfaces immediately.
#[derive(Debug)]
pub enum RpcCallError {
    RateLimited,
    Transport(reqwest_middleware::Error),
    Permanent(String),
}

/// Drives the backoff policy: `initial_delay * 2^attempt` when `exponential_backoff` is
/// enabled, otherwise a constant `initial_delay`, capped at `max_retries`. When
/// `enable_retry` is false the call is attempted exactly once.
pub async fn with_retry<T, F, Fut>(
    settings: &RateLimitHandlingSettings,
    method: &str,
    mut call: F,
) -> Result<T, AuditorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RpcCallError>>,
{
    let max_attempts = if settings.enable_retry {
        settings.max_retries + 1
    } else {
        1
    };

    let mut attempt = 0u32;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(RpcCallError::Permanent(msg)) => {
                return Err(AuditorError::RpcPermanent(msg));
            }
            Err(retryable) => {
                attempt += 1;
                if attempt >= max_attempts {
                    let reason = match retryable {
                        RpcCallError::RateLimited => "rate limited (429)".to_string(),
                        RpcCallError::Transport(e) => e.to_string(),
                        RpcCallError::Permanent(_) => unreachable!(),
                    };
                    return Err(AuditorError::RpcRetriesExhausted(format!(
                        "{method}: {reason} after {attempt} attempt(s)"
                    )));
                }
                let delay = backoff_delay(settings, attempt - 1);
                tracing::warn!(
                    method,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying RPC call"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn backoff_delay(settings: &RateLimitHandlingSettings, attempt: u32) -> Duration {
    if settings.exponential_backoff {
        settings.initial_delay_seconds.saturating_mul(2u32.saturating_pow(attempt))
    } else {
        settings.initial_delay_seconds
    }
}
