use crate::{
    error::{AppResult, ErrorReason, FetchError},
    fetcher::Fetcher,
    metrics::CacheMetrics,
    types::CertMap,
};
use parking_lot::RwLock;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

/// Holds the last successfully fetched [`CertMap`] and keeps it fresh.
///
/// The snapshot is only ever replaced as a whole, so readers observe either
/// the previous map or the new one. A failed refresh leaves it untouched.
#[derive(Debug)]
pub struct CertCache {
    fetcher: Fetcher,
    refresh_interval: Duration,
    current: RwLock<Arc<CertMap>>,
    metrics: CacheMetrics,
    cancel: CancellationToken,
}

impl CertCache {
    /// Perform the initial fetch. The cache does not exist without one.
    pub async fn initialize(
        fetcher: Fetcher,
        refresh_interval: Duration,
        metrics: CacheMetrics,
        cancel: CancellationToken,
    ) -> AppResult<Self> {
        if refresh_interval.is_zero() {
            return Err(ErrorReason::InvalidRefreshInterval.into());
        }

        let certs = match fetcher.fetch(&cancel).await {
            Ok(certs) => certs,
            Err(e) => {
                metrics.record_failure();
                return Err(e.into());
            }
        };
        metrics.record_success(certs.len());
        if certs.is_empty() {
            warn!("Certificate source {} returned an empty bundle", fetcher.url());
        }
        info!(
            "Loaded {} certificates from {}",
            certs.len(),
            fetcher.url()
        );

        Ok(Self {
            fetcher,
            refresh_interval,
            current: RwLock::new(Arc::new(certs)),
            metrics,
            cancel,
        })
    }

    pub fn lookup(&self, cert_id: &str) -> Option<String> {
        self.current.read().get(cert_id).map(str::to_owned)
    }

    pub fn snapshot(&self) -> Arc<CertMap> {
        self.current.read().clone()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Swap in a new snapshot, returning the one it replaced.
    fn replace(&self, certs: CertMap) -> Arc<CertMap> {
        let certs = Arc::new(certs);
        std::mem::replace(&mut *self.current.write(), certs)
    }

    /// Fetch once and swap the snapshot on success.
    pub async fn refresh_once(&self) -> Result<usize, FetchError> {
        match self.fetcher.fetch(&self.cancel).await {
            Ok(certs) => {
                let count = certs.len();
                if *self.snapshot() == certs {
                    debug!("Certificates from {} are unchanged", self.fetcher.url());
                }
                drop(self.replace(certs));
                self.metrics.record_success(count);
                Ok(count)
            }
            Err(FetchError::Cancelled) => Err(FetchError::Cancelled),
            Err(e) => {
                self.metrics.record_failure();
                Err(e)
            }
        }
    }

    pub fn spawn_refresh_loop(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.clone().run_refresh_loop())
    }

    pub async fn run_refresh_loop(self: Arc<Self>) {
        let mut ticker = interval_at(
            Instant::now() + self.refresh_interval,
            self.refresh_interval,
        );
        // A slow fetch postpones the next tick instead of causing a burst.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            debug!("Refreshing certificates from {}", self.fetcher.url());
            match self.refresh_once().await {
                Ok(count) => {
                    info!(
                        "Refreshed {} certificates from {}",
                        count,
                        self.fetcher.url()
                    );
                }
                Err(FetchError::Cancelled) => break,
                Err(e) => {
                    warn!(
                        "Failed to refresh certificates from {}, keeping the previous snapshot: {:?}",
                        self.fetcher.url(),
                        e
                    );
                }
            }
        }

        info!("Certificate refresh loop stopped");
    }
}
