//! Shared RPC utilities for interacting with Ethereum JSON-RPC endpoints.

use std::{future::Future, time::Duration};

use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

/// Default timeout for a single RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result, or an error if the request failed or returned an error response.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error: {}",
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Poll `check_fn` until it yields a value.
///
/// `Ok(None)` and errors both mean "not yet"; polling stops once `timeout`
/// worth of `interval`s has elapsed.
///
/// # Arguments
/// * `name` - What is being waited for (for error messages)
/// * `timeout` - Maximum time to wait
/// * `interval` - Delay between two attempts
/// * `check_fn` - Function that returns `Ok(Some(value))` once ready
pub async fn poll_until<T, F, Fut>(
    name: &str,
    timeout: Duration,
    interval: Duration,
    check_fn: F,
) -> Result<T, anyhow::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let attempts = (timeout.as_millis() / interval.as_millis().max(1)).max(1) as usize;
    let backoff = ConstantBuilder::default()
        .with_delay(interval)
        .with_max_times(attempts);

    (|| {
        let check = check_fn();
        async move {
            match check.await? {
                Some(value) => Ok(value),
                None => Err(anyhow::anyhow!("{} is not available yet", name)),
            }
        }
    })
    .retry(backoff)
    .notify(|err: &anyhow::Error, retry_in: Duration| {
        tracing::trace!(error = %err, waiting_for = %name, ?retry_in, "Still waiting, retrying...");
    })
    .await
    .with_context(|| format!("Timeout waiting for {} after {:?}", name, timeout))
}

/// Deserialize a u64 from a hex string (with 0x prefix).
pub fn deserialize_opt_u64_from_hex<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    s.map(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16))
        .transpose()
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_poll_until_returns_once_ready() {
        let calls = AtomicUsize::new(0);
        let value = poll_until(
            "counter",
            Duration::from_millis(200),
            Duration::from_millis(10),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(if n >= 2 { Some(n) } else { None }) }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_poll_until_times_out() {
        let result: anyhow::Result<()> = poll_until(
            "never",
            Duration::from_millis(30),
            Duration::from_millis(10),
            || async { Ok(None) },
        )
        .await;

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Timeout waiting for never"));
    }
}
