use crate::error::AppResult;
use chrono::Utc;
use prometheus::{IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone, Debug)]
pub struct CacheMetrics {
    registry: Registry,
    refresh_total: IntCounterVec,
    certificates: IntGauge,
    last_refresh: IntGauge,
}

impl CacheMetrics {
    pub fn new() -> AppResult<Self> {
        let registry = Registry::new_custom(None, None)?;

        let refresh_total = IntCounterVec::new(
            Opts::new("refresh_total", "Certificate refresh attempts by result")
                .namespace("certcache"),
            &["result"],
        )?;
        registry.register(Box::new(refresh_total.clone()))?;
        let certificates = IntGauge::with_opts(
            Opts::new("certificates", "Certificates in the current snapshot")
                .namespace("certcache"),
        )?;
        registry.register(Box::new(certificates.clone()))?;
        let last_refresh = IntGauge::with_opts(
            Opts::new(
                "last_refresh_timestamp_seconds",
                "Unix timestamp of the last successful refresh",
            )
            .namespace("certcache"),
        )?;
        registry.register(Box::new(last_refresh.clone()))?;

        Ok(Self {
            registry,
            refresh_total,
            certificates,
            last_refresh,
        })
    }

    pub fn record_success(&self, certificates: usize) {
        self.refresh_total.with_label_values(&["success"]).inc();
        self.certificates
            .set(i64::try_from(certificates).unwrap_or(i64::MAX));
        self.last_refresh.set(Utc::now().timestamp());
    }

    pub fn record_failure(&self) {
        self.refresh_total.with_label_values(&["failure"]).inc();
    }

    #[cfg(test)]
    pub fn refresh_count(&self, result: &str) -> u64 {
        self.refresh_total.with_label_values(&[result]).get()
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn export_refresh_counters() {
        let metrics = CacheMetrics::new().unwrap();
        metrics.record_success(3);
        metrics.record_failure();
        metrics.record_failure();

        assert_eq!(metrics.refresh_count("success"), 1);
        assert_eq!(metrics.refresh_count("failure"), 2);

        let text = metrics.encode().unwrap();
        assert!(text.contains("certcache_certificates 3"));
        assert!(text.contains(r#"certcache_refresh_total{result="failure"} 2"#));
        assert!(text.contains("certcache_last_refresh_timestamp_seconds"));
    }
}
