// Prometheus metrics for the admission gateway
//
// Exposes metrics on /metrics HTTP endpoint:
// - Admission outcomes (counter by outcome)
// - Rate limit decisions, fail-open admits counted separately
// - Tokens reserved (counter)
// - Dependency failures (counter by operation)
// - Admission latency (histogram)

use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref ADMISSIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("admissions_total", "Job submissions by admission outcome"),
        &["outcome"]
    ).expect("Failed to create admissions metric");

    pub static ref RATE_LIMIT_DECISIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new(
            "rate_limit_decisions_total",
            "Rate limiter decisions (admit, reject, fail_open)"
        ),
        &["decision"]
    ).expect("Failed to create rate limit decisions metric");

    pub static ref TOKENS_RESERVED_TOTAL: IntCounter = IntCounter::new(
        "tokens_reserved_total",
        "Tokens reserved against account budgets at admission"
    ).expect("Failed to create tokens reserved metric");

    pub static ref DEPENDENCY_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("dependency_errors_total", "External dependency failures by operation"),
        &["operation"]
    ).expect("Failed to create dependency errors metric");

    pub static ref ADMISSION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new("admission_duration_seconds", "Time spent admitting a job submission"),
    ).expect("Failed to create admission duration metric");
}

/// Register all collectors - call once at startup.
///
/// Collectors that are already registered are skipped.
pub fn init() -> prometheus::Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ADMISSIONS_TOTAL.clone()),
        Box::new(RATE_LIMIT_DECISIONS_TOTAL.clone()),
        Box::new(TOKENS_RESERVED_TOTAL.clone()),
        Box::new(DEPENDENCY_ERRORS_TOTAL.clone()),
        Box::new(ADMISSION_DURATION_SECONDS.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}
