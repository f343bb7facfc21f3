//! Concurrency gate: bounds in-flight requests per site.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::trace;

use super::{BookClient, FetchError, FetchResponse};

/// Client layer that holds a semaphore permit for the duration of the inner
/// fetch. The permit is acquired immediately before the call and dropped as
/// soon as it returns, so retry sleeps never occupy a slot.
pub struct GatedClient {
    inner: Arc<dyn BookClient>,
    semaphore: Arc<Semaphore>,
    permits: usize,
}

impl GatedClient {
    /// Wraps `inner` with a gate of `permits` slots (at least one).
    #[must_use]
    pub fn new(inner: Arc<dyn BookClient>, permits: usize) -> Self {
        let permits = permits.max(1);
        Self {
            inner,
            semaphore: Arc::new(Semaphore::new(permits)),
            permits,
        }
    }

    /// Configured number of slots.
    #[must_use]
    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Slots currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[async_trait]
impl BookClient for GatedClient {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::GateClosed)?;
        trace!(url, available = self.semaphore.available_permits(), "gate acquired");
        self.inner.fetch(url).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Records the highest number of concurrent fetches observed.
    #[derive(Default)]
    struct ConcurrencyProbe {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl BookClient for ConcurrencyProbe {
        async fn fetch(&self, _url: &str) -> Result<FetchResponse, FetchError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(FetchResponse::new(200, "ok"))
        }
    }

    #[tokio::test]
    async fn test_gate_bounds_concurrency() {
        let probe = Arc::new(ConcurrencyProbe::default());
        let gate = Arc::new(GatedClient::new(probe.clone(), 3));

        let mut handles = Vec::new();
        for i in 0..12 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                gate.fetch(&format!("https://example.com/{i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(probe.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(gate.available(), 3);
    }

    #[test]
    fn test_gate_minimum_one_permit() {
        let gate = GatedClient::new(Arc::new(ConcurrencyProbe::default()), 0);
        assert_eq!(gate.permits(), 1);
    }
}
