//! Bounded ring buffer of analyzed profiles
//!
//! Feeds the statistical-outlier and trend algorithms with per-profile metric
//! averages. Capacity 1000; the maintenance sweep trims it back to 500.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::detection::structs::{MetricType, PerformanceProfile, TimestampMS};
use crate::statistics;

/// Hard cap on retained entries
pub const HISTORY_CAPACITY: usize = 1000;

/// The maintenance sweep trims the buffer down to this size
pub const HISTORY_SWEEP_TARGET: usize = 500;

/// Compact record of one analyzed profile
#[derive(Debug, Clone)]
pub struct HistoricalProfile {
    pub profile_id: String,
    pub target_key: String,
    pub analyzed_at: TimestampMS,
    /// Per-metric-type average over the profile's samples
    pub metric_averages: FxHashMap<MetricType, f64>,
    pub performance_score: f64,
}

impl HistoricalProfile {
    pub fn from_profile(profile: &PerformanceProfile) -> Self {
        let mut metric_averages: FxHashMap<MetricType, Vec<f64>> = FxHashMap::default();
        for metric in &profile.metrics {
            metric_averages.entry(metric.metric_type).or_default().push(metric.value);
        }
        Self {
            profile_id: profile.id.clone(),
            target_key: format!("{}_{}", profile.target_type, profile.target_id),
            analyzed_at: chrono::Utc::now().timestamp_millis(),
            metric_averages: metric_averages
                .into_iter()
                .map(|(metric_type, values)| (metric_type, statistics::mean(&values)))
                .collect(),
            performance_score: profile.summary.performance_score,
        }
    }
}

/// Ring buffer of historical profile records
#[derive(Debug, Default)]
pub struct HistoricalStore {
    entries: VecDeque<HistoricalProfile>,
}

impl HistoricalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one analyzed profile, dropping the oldest past capacity
    pub fn append(&mut self, record: HistoricalProfile) {
        if self.entries.len() >= HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    /// Historical per-profile averages of one metric type for a target,
    /// oldest first. Profiles without that metric are skipped.
    pub fn metric_averages(&self, target_key: &str, metric_type: MetricType) -> Vec<f64> {
        self.entries
            .iter()
            .filter(|e| e.target_key == target_key)
            .filter_map(|e| e.metric_averages.get(&metric_type).copied())
            .collect()
    }

    /// All retained records, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &HistoricalProfile> {
        self.entries.iter()
    }

    /// Number of historical profiles recorded for a target
    pub fn target_count(&self, target_key: &str) -> usize {
        self.entries.iter().filter(|e| e.target_key == target_key).count()
    }

    /// Trim the buffer down to the sweep target. Returns removed count.
    pub fn sweep(&mut self) -> usize {
        if self.entries.len() <= HISTORY_SWEEP_TARGET {
            return 0;
        }
        let excess = self.entries.len() - HISTORY_SWEEP_TARGET;
        self.entries.drain(..excess);
        debug!(removed = excess, retained = self.entries.len(), "Historical buffer trimmed");
        excess
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
