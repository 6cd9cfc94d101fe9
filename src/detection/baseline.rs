//! Per-target anomaly baselines
//!
//! Each target (keyed `{target_type}_{target_id}`) carries a bounded window of
//! profile signatures. Mean and variance are always recomputed from the
//! current window contents so they never drift from the stored samples.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::detection::structs::{MetricType, PerformanceProfile, Severity, TimestampMS};
use crate::statistics;

/// Maximum signature samples kept per target
pub const BASELINE_WINDOW: usize = 100;

/// Baselines unused for longer than this are evicted by the maintenance sweep
pub const BASELINE_MAX_IDLE_MS: i64 = 7 * 24 * 3600 * 1000;

/// Anomaly score above which a finding is signalled
const ANOMALY_SCORE_THRESHOLD: f64 = 2.0;

/// Rolling signature baseline for one target
#[derive(Debug, Clone)]
pub struct AnomalyBaseline {
    samples: Vec<f64>,
    pub mean: f64,
    pub variance: f64,
    pub last_updated: TimestampMS,
}

impl AnomalyBaseline {
    fn new(first_sample: f64, now: TimestampMS) -> Self {
        Self {
            samples: vec![first_sample],
            mean: first_sample,
            variance: 0.0,
            last_updated: now,
        }
    }

    /// Append a sample, trim to the window and recompute mean/variance from
    /// the full window contents.
    fn record(&mut self, sample: f64, now: TimestampMS) {
        self.samples.push(sample);
        if self.samples.len() > BASELINE_WINDOW {
            let excess = self.samples.len() - BASELINE_WINDOW;
            self.samples.drain(..excess);
        }
        self.mean = statistics::mean(&self.samples);
        self.variance = statistics::variance(&self.samples);
        self.last_updated = now;
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// Outcome of scoring one profile signature against its baseline
#[derive(Debug, Clone, Copy)]
pub struct AnomalySignal {
    pub score: f64,
    pub severity: Severity,
    pub confidence: f64,
    pub baseline_mean: f64,
    pub baseline_variance: f64,
}

/// Tracks signature baselines for all targets
#[derive(Debug, Default)]
pub struct BaselineTracker {
    baselines: FxHashMap<String, AnomalyBaseline>,
}

impl BaselineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(profile: &PerformanceProfile) -> String {
        format!("{}_{}", profile.target_type, profile.target_id)
    }

    /// Weighted blend of the profile's headline metric averages.
    ///
    /// Missing metric types contribute 0 through their zero average.
    pub fn signature(profile: &PerformanceProfile) -> f64 {
        0.5 * profile.metric_average(MetricType::ResponseTime)
            + 0.3 * profile.metric_average(MetricType::CpuUsage)
            + 0.2 * profile.metric_average(MetricType::MemoryUsage)
    }

    /// Score a profile against its target's baseline without mutating it.
    ///
    /// The first observation of a target yields no signal; zero variance
    /// yields score 0 (no anomaly is possible against a flat baseline).
    pub fn score(&self, profile: &PerformanceProfile) -> Option<AnomalySignal> {
        let baseline = self.baselines.get(&Self::key(profile))?;
        let signature = Self::signature(profile);

        let score = if baseline.variance == 0.0 {
            0.0
        } else {
            (signature - baseline.mean).abs() / baseline.variance.sqrt()
        };

        if score <= ANOMALY_SCORE_THRESHOLD {
            return None;
        }

        let severity = if score > 3.0 { Severity::High } else { Severity::Medium };
        Some(AnomalySignal {
            score,
            severity,
            confidence: (score / 3.0).min(0.95),
            baseline_mean: baseline.mean,
            baseline_variance: baseline.variance,
        })
    }

    /// Fold a profile's signature into its target's baseline.
    ///
    /// Called by the orchestrator exactly once per analyzed profile, after
    /// all algorithms ran against the pre-update snapshot.
    pub fn observe(&mut self, profile: &PerformanceProfile) {
        let key = Self::key(profile);
        let signature = Self::signature(profile);
        let now = chrono::Utc::now().timestamp_millis();

        match self.baselines.get_mut(&key) {
            Some(baseline) => baseline.record(signature, now),
            None => {
                debug!(target_key = %key, signature, "Initializing anomaly baseline");
                self.baselines.insert(key, AnomalyBaseline::new(signature, now));
            }
        }
    }

    /// Drop baselines not updated within [`BASELINE_MAX_IDLE_MS`].
    /// Returns the number of evicted entries.
    pub fn evict_stale(&mut self, now: TimestampMS) -> usize {
        let before = self.baselines.len();
        self.baselines.retain(|_, b| now - b.last_updated <= BASELINE_MAX_IDLE_MS);
        before - self.baselines.len()
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }

    pub fn clear(&mut self) {
        self.baselines.clear();
    }

    #[cfg(test)]
    pub(crate) fn get(&self, key: &str) -> Option<&AnomalyBaseline> {
        self.baselines.get(key)
    }
}
