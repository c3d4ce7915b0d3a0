//! Prometheus metrics for the blacklist filter.
//!
//! - `ipblacklist_requests_allowed_total` - Requests forwarded to the inner handler
//! - `ipblacklist_requests_rejected_total{reason}` - Requests rejected (`static` / `dynamic`)
//! - `ipblacklist_promotions_total` - Addresses added to the dynamic blacklist
//! - `ipblacklist_lookup_failures_total` - Dynamic lookups that failed open
//! - `ipblacklist_accounting_failures_total` - Dropped accounting writes
//!
//! Recording before [`init`] is a no-op.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

pub static REQUESTS_ALLOWED: OnceLock<IntCounter> = OnceLock::new();

pub static REQUESTS_REJECTED: OnceLock<IntCounterVec> = OnceLock::new();

pub static PROMOTIONS: OnceLock<IntCounter> = OnceLock::new();

pub static LOOKUP_FAILURES: OnceLock<IntCounter> = OnceLock::new();

pub static ACCOUNTING_FAILURES: OnceLock<IntCounter> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup; later calls leave the first registration in place.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(REQUESTS_ALLOWED, IntCounter::new("ipblacklist_requests_allowed_total", "Requests forwarded to the inner handler"));
    register!(REQUESTS_REJECTED, IntCounterVec::new(Opts::new("ipblacklist_requests_rejected_total", "Requests rejected by blacklist"), &["reason"]));
    register!(PROMOTIONS, IntCounter::new("ipblacklist_promotions_total", "Addresses promoted to the dynamic blacklist"));
    register!(LOOKUP_FAILURES, IntCounter::new("ipblacklist_lookup_failures_total", "Dynamic blacklist lookups that failed open"));
    register!(ACCOUNTING_FAILURES, IntCounter::new("ipblacklist_accounting_failures_total", "Request accounting writes dropped after an error"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

fn inc(metric: &OnceLock<IntCounter>) {
    if let Some(m) = metric.get() {
        m.inc();
    }
}

pub fn record_allowed() {
    inc(&REQUESTS_ALLOWED);
}

pub fn record_rejected(reason: &str) {
    if let Some(m) = REQUESTS_REJECTED.get() {
        m.with_label_values(&[reason]).inc();
    }
}

pub fn record_promotion() {
    inc(&PROMOTIONS);
}

pub fn record_lookup_failure() {
    inc(&LOOKUP_FAILURES);
}

pub fn record_accounting_failure() {
    inc(&ACCOUNTING_FAILURES);
}
