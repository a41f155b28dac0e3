use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Number of extra attempts for transient transport failures.
pub const DEFAULT_RETRIES: usize = 2;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(300);

/// Retries an async request while it fails with a transient transport error
///
/// Connection and timeout errors are retried; any other error, including
/// ones raised for HTTP status codes, is returned immediately.
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay`: Pause between attempts
pub async fn with_retry<F, Fut, T>(mut operation: F, retries: usize, delay: Duration) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                let transient = err.is_connect() || err.is_timeout();
                if !transient || attempt > retries {
                    return Err(err.into());
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt,
                    retries + 1,
                    err
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retries_connection_errors_then_gives_up() {
        let attempts = AtomicUsize::new(0);
        let client = reqwest::Client::new();

        // Nothing listens on port 9 of the loopback interface
        let result = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                client.get("http://127.0.0.1:9/").send()
            },
            2,
            Duration::from_millis(1),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_on_success() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let attempts = AtomicUsize::new(0);
        let client = reqwest::Client::new();
        let url = server.uri();
        let response = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                client.get(&url).send()
            },
            2,
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        // HTTP error statuses are not transport failures
        assert_eq!(response.status().as_u16(), 503);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
