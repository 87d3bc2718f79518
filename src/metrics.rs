//! Prometheus metrics (feature `metrics`) and tracing spans (feature `tracing`).

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<StorefrontMetrics> = Lazy::new(StorefrontMetrics::init);

#[cfg(feature = "metrics")]
pub struct StorefrontMetrics {
    pub registry: Registry,
    pub queries_total: IntCounter,
    pub query_errors_total: IntCounter,
    pub query_duration: Histogram,
    pub authorization_denials: IntCounterVec,
    pub integrity_errors_total: IntCounter,
}

#[cfg(feature = "metrics")]
impl StorefrontMetrics {
    pub fn init() -> Self {
        let registry = Registry::new_custom(Some("storefront".to_string()), None)
            .expect("metric prefix is valid");

        let queries_total = IntCounter::new("queries_total", "Total SQL statements executed")
            .expect("metric definition is valid");
        let query_errors_total =
            IntCounter::new("query_errors_total", "SQL statements that returned an error")
                .expect("metric definition is valid");
        let query_duration = Histogram::with_opts(HistogramOpts::new(
            "query_duration_seconds",
            "Duration of SQL statements",
        ))
        .expect("metric definition is valid");
        let authorization_denials = IntCounterVec::new(
            Opts::new("authorization_denials_total", "Denied authorization checks"),
            &["reason"],
        )
        .expect("metric definition is valid");
        let integrity_errors_total = IntCounter::new(
            "integrity_errors_total",
            "Corrupt category hierarchy detected while walking or building the tree",
        )
        .expect("metric definition is valid");

        for collector in [
            Box::new(queries_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(query_errors_total.clone()),
            Box::new(query_duration.clone()),
            Box::new(authorization_denials.clone()),
            Box::new(integrity_errors_total.clone()),
        ] {
            registry
                .register(collector)
                .expect("metric names are unique");
        }

        Self {
            registry,
            queries_total,
            query_errors_total,
            query_duration,
            authorization_denials,
            integrity_errors_total,
        }
    }

    pub fn record_query_duration(&self, elapsed: std::time::Duration) {
        self.queries_total.inc();
        self.query_duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_query_error(&self) {
        self.query_errors_total.inc();
    }

    pub fn record_denial(&self, reason: &str) {
        self.authorization_denials.with_label_values(&[reason]).inc();
    }

    pub fn record_integrity_error(&self) {
        self.integrity_errors_total.inc();
    }

    /// Render every registered metric in the Prometheus text exposition format
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            log::warn!("failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    const MAX_STATEMENT_LEN: usize = 120;

    fn statement_label(query: &str) -> &str {
        let trimmed = query.trim();
        match trimmed.char_indices().nth(MAX_STATEMENT_LEN) {
            Some((idx, _)) => &trimmed[..idx],
            None => trimmed,
        }
    }

    pub fn execute_query_span(query: &str) -> Span {
        info_span!("storefront.query", statement = statement_label(query))
    }

    pub fn acquire_connection_span() -> Span {
        info_span!("storefront.connect")
    }

    pub fn begin_transaction_span() -> Span {
        info_span!("storefront.transaction.begin")
    }

    pub fn commit_transaction_span() -> Span {
        info_span!("storefront.transaction.commit")
    }

    pub fn rollback_transaction_span() -> Span {
        info_span!("storefront.transaction.rollback")
    }

    pub fn authorize_span(action: &'static str) -> Span {
        info_span!("storefront.authorize", action)
    }

}
