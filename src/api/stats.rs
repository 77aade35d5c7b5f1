//! Prediction counters and pipeline latency for /health and /stats/latency.
//! Written by the prediction handlers, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

use crate::pipeline::Prediction;

/// Latency percentiles in microseconds. `None` until the first prediction.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LatencySummary {
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub sample_count: u64,
}

pub struct ServiceStats {
    predictions_total: AtomicU64,
    fallbacks_total: AtomicU64,
    /// Tracks 1us to 60s, 3 significant figures. `None` if the bounds were rejected.
    latency_us: Option<Mutex<Histogram<u64>>>,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self {
            predictions_total: AtomicU64::new(0),
            fallbacks_total: AtomicU64::new(0),
            latency_us: Histogram::new_with_bounds(1, 60_000_000, 3).ok().map(Mutex::new),
        }
    }

    pub fn record(&self, prediction: &Prediction, elapsed: Duration) {
        self.predictions_total.fetch_add(1, Ordering::Relaxed);
        if !prediction.is_model() {
            self.fallbacks_total.fetch_add(1, Ordering::Relaxed);
        }
        let us = elapsed.as_micros().clamp(1, u128::from(u64::MAX)) as u64;
        if let Some(Ok(mut h)) = self.latency_us.as_ref().map(|m| m.lock()) {
            h.saturating_record(us);
        }
    }

    pub fn predictions_total(&self) -> u64 {
        self.predictions_total.load(Ordering::Relaxed)
    }

    pub fn fallbacks_total(&self) -> u64 {
        self.fallbacks_total.load(Ordering::Relaxed)
    }

    pub fn latency(&self) -> LatencySummary {
        let Some(Ok(h)) = self.latency_us.as_ref().map(|m| m.lock()) else {
            return LatencySummary::default();
        };
        if h.len() == 0 {
            return LatencySummary::default();
        }
        LatencySummary {
            p50_us: Some(h.value_at_quantile(0.5)),
            p95_us: Some(h.value_at_quantile(0.95)),
            p99_us: Some(h.value_at_quantile(0.99)),
            sample_count: h.len(),
        }
    }
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::predictor::FallbackReason;

    #[test]
    fn counts_predictions_and_fallbacks() {
        let stats = ServiceStats::new();
        stats.record(&Prediction::Model { price: 40.0 }, Duration::from_micros(120));
        stats.record(
            &Prediction::Fallback {
                price: 45.5,
                reason: FallbackReason::ModelUnavailable,
            },
            Duration::from_micros(30),
        );
        assert_eq!(stats.predictions_total(), 2);
        assert_eq!(stats.fallbacks_total(), 1);
    }

    #[test]
    fn latency_empty_until_recorded() {
        let stats = ServiceStats::new();
        assert_eq!(stats.latency(), LatencySummary::default());

        for us in [100, 200, 300, 400] {
            stats.record(&Prediction::Model { price: 10.0 }, Duration::from_micros(us));
        }
        let summary = stats.latency();
        assert_eq!(summary.sample_count, 4);
        let p50 = summary.p50_us.unwrap();
        assert!((190..=210).contains(&p50), "p50={p50}");
        assert!(summary.p99_us.unwrap() >= p50);
    }

    #[test]
    fn sub_microsecond_latency_is_recorded() {
        let stats = ServiceStats::new();
        stats.record(&Prediction::Model { price: 10.0 }, Duration::from_nanos(10));
        assert_eq!(stats.latency().sample_count, 1);
    }
}
