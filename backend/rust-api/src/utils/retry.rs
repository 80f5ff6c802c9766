use std::time::Duration;

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryConfig {
    /// Short retries for write races on unique indexes.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            jitter_max: Some(Duration::from_millis(20)),
        }
    }
}

impl RetryConfig {
    /// Patient retries while the database container is still starting.
    pub fn startup() -> Self {
        Self {
            max_attempts: 10,
            base_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            jitter_max: Some(Duration::from_millis(100)),
        }
    }
}

/// Runs `f` until it succeeds, `should_retry` rejects the error, or attempts run out.
pub async fn retry_async_when<F, Fut, T, E, P>(
    config: RetryConfig,
    should_retry: P,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempts_left = config.max_attempts.max(1);
    let mut backoff = config.base_backoff;

    loop {
        let err = match f().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        attempts_left -= 1;
        if attempts_left == 0 || !should_retry(&err) {
            return Err(err);
        }
        tracing::debug!(
            attempts_left,
            backoff_ms = backoff.as_millis() as u64,
            "Retrying after failure"
        );

        let jitter = config
            .jitter_max
            .map(|max| max.as_millis() as u64)
            .filter(|max| *max > 0)
            .map(|max| Duration::from_millis(rand::random::<u64>() % (max + 1)))
            .unwrap_or_default();
        tokio::time::sleep(backoff + jitter).await;

        backoff = std::cmp::min(backoff * 2, config.max_backoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast(max_attempts: usize) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            jitter_max: None,
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let counter = AtomicUsize::new(0);

        let res: Result<usize, &'static str> = retry_async_when(fast(3), |_| true, || async {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err("race")
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(res, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicUsize::new(0);

        let res: Result<(), &'static str> = retry_async_when(fast(2), |_| true, || async {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("always")
        })
        .await;

        assert!(res.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stops_on_errors_the_predicate_rejects() {
        let counter = AtomicUsize::new(0);

        let res: Result<(), &'static str> =
            retry_async_when(fast(5), |err| *err == "race", || async {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("fatal")
            })
            .await;

        assert_eq!(res, Err("fatal"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
