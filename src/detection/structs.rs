use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Millisecond unix timestamp used throughout the analysis pipeline
pub type TimestampMS = i64;

/// Kinds of samples a profile can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    ResponseTime,
    CpuUsage,
    MemoryUsage,
    DiskIo,
    NetworkIo,
    DatabaseQueryTime,
    CacheHitRate,
    ErrorRate,
    QueueSize,
    ConnectionPoolSize,
    GcTime,
}

/// Coarse resource grouping, one level above [`MetricType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Cpu,
    Memory,
    Io,
    Network,
    Database,
    Cache,
    Application,
    BusinessLogic,
}

/// A single timestamped sample inside a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub metric_type: MetricType,
    pub category: MetricCategory,
    pub value: f64,
    pub timestamp: TimestampMS,
}

impl PerformanceMetric {
    pub fn new(metric_type: MetricType, category: MetricCategory, value: f64) -> Self {
        Self {
            metric_type,
            category,
            value,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Derived summary attached to a closed profile by the collector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// Overall performance score for the profiled run (0-100, higher is better)
    pub performance_score: f64,
}

/// Immutable-once-closed profiling record produced by an external collector.
///
/// The engine only reads profiles; ordering of `metrics` is arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceProfile {
    pub id: String,
    /// Service or endpoint the profile was captured for
    pub target_id: String,
    /// Kind of target ("service", "endpoint", ...)
    pub target_type: String,
    pub duration_ms: i64,
    pub start_time: TimestampMS,
    pub metrics: Vec<PerformanceMetric>,
    pub summary: ProfileSummary,
}

impl PerformanceProfile {
    /// All sample values of one metric type, in arrival order
    pub fn metric_values(&self, metric_type: MetricType) -> Vec<f64> {
        self.metrics
            .iter()
            .filter(|m| m.metric_type == metric_type)
            .map(|m| m.value)
            .collect()
    }

    /// All sample values belonging to one category, in arrival order
    pub fn category_values(&self, category: MetricCategory) -> Vec<f64> {
        self.metrics
            .iter()
            .filter(|m| m.category == category)
            .map(|m| m.value)
            .collect()
    }

    /// Average value of one metric type, 0 when the profile carries none
    pub fn metric_average(&self, metric_type: MetricType) -> f64 {
        crate::statistics::mean(&self.metric_values(metric_type))
    }
}

/// Classification of a detected bottleneck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckType {
    CpuBound,
    MemoryBound,
    IoBound,
    NetworkBound,
    DatabaseBound,
    LockContention,
    ResourceStarvation,
    AlgorithmInefficiency,
    ConfigurationIssue,
}

impl std::fmt::Display for BottleneckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BottleneckType::CpuBound => "cpu_bound",
            BottleneckType::MemoryBound => "memory_bound",
            BottleneckType::IoBound => "io_bound",
            BottleneckType::NetworkBound => "network_bound",
            BottleneckType::DatabaseBound => "database_bound",
            BottleneckType::LockContention => "lock_contention",
            BottleneckType::ResourceStarvation => "resource_starvation",
            BottleneckType::AlgorithmInefficiency => "algorithm_inefficiency",
            BottleneckType::ConfigurationIssue => "configuration_issue",
        };
        write!(f, "{}", s)
    }
}

/// Severity of a detected bottleneck
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Step function over the value/threshold ratio.
    ///
    /// Breakpoints: >=3x critical, >=2x high, >=1.5x medium, below that low.
    /// Callers only invoke this once a base threshold was exceeded, so `Low`
    /// covers ratios in (1.0, 1.5).
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 3.0 {
            Severity::Critical
        } else if ratio >= 2.0 {
            Severity::High
        } else if ratio >= 1.5 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// A bottleneck finding produced by one detection algorithm.
///
/// Created by an algorithm, annotated once by the orchestrator (confidence
/// cap + `detection_algorithm` context key), then treated as immutable.
/// `root_causes` stays empty until the finding is passed through the
/// root-cause analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceBottleneck {
    pub id: String,
    pub profile_id: String,
    pub bottleneck_type: BottleneckType,
    pub severity: Severity,
    /// Component the finding is attributed to (usually the profile target)
    pub component: String,
    /// Operation within the component, if the algorithm can narrow it down
    pub operation: String,
    /// Estimated impact on the target, 0-100
    pub impact_score: f64,
    /// Share of the profile's total metric load attributed to this finding
    pub percentage_of_total: f64,
    /// Populated by the root-cause analyzer, empty at detection time
    pub root_causes: Vec<String>,
    /// Free-form diagnostic payload keyed by the detection algorithm
    pub context: serde_json::Map<String, Value>,
    /// Detection confidence in [0,1], capped by the producing algorithm
    pub confidence: f64,
    pub detected_at: TimestampMS,
}

static BOTTLENECK_SEQ: AtomicU64 = AtomicU64::new(0);

impl PerformanceBottleneck {
    /// Build a finding with a fresh id; context starts empty.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profile: &PerformanceProfile,
        bottleneck_type: BottleneckType,
        severity: Severity,
        operation: &str,
        impact_score: f64,
        percentage_of_total: f64,
        confidence: f64,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let seq = BOTTLENECK_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("bn_{}_{}", now, seq),
            profile_id: profile.id.clone(),
            bottleneck_type,
            severity,
            component: profile.target_id.clone(),
            operation: operation.to_string(),
            impact_score: impact_score.clamp(0.0, 100.0),
            percentage_of_total: percentage_of_total.clamp(0.0, 100.0),
            root_causes: Vec::new(),
            context: serde_json::Map::new(),
            confidence: confidence.clamp(0.0, 1.0),
            detected_at: now,
        }
    }

    /// Dedup key: findings with the same type and component are duplicates
    pub fn dedup_key(&self) -> String {
        format!("{}_{}", self.bottleneck_type, self.component)
    }

    /// Attach one diagnostic value to the context payload
    pub fn with_context(mut self, key: &str, value: Value) -> Self {
        self.context.insert(key.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> PerformanceProfile {
        PerformanceProfile {
            id: "profile_1".to_string(),
            target_id: "checkout-service".to_string(),
            target_type: "service".to_string(),
            duration_ms: 60_000,
            start_time: 0,
            metrics: vec![
                PerformanceMetric::new(MetricType::CpuUsage, MetricCategory::Cpu, 50.0),
                PerformanceMetric::new(MetricType::CpuUsage, MetricCategory::Cpu, 70.0),
                PerformanceMetric::new(MetricType::ResponseTime, MetricCategory::Application, 200.0),
            ],
            summary: ProfileSummary { performance_score: 80.0 },
        }
    }

    #[test]
    fn test_metric_selectors() {
        let profile = sample_profile();
        assert_eq!(profile.metric_values(MetricType::CpuUsage), vec![50.0, 70.0]);
        assert_eq!(profile.category_values(MetricCategory::Cpu), vec![50.0, 70.0]);
        assert_eq!(profile.metric_average(MetricType::CpuUsage), 60.0);
        assert_eq!(profile.metric_average(MetricType::GcTime), 0.0);
    }

    #[test]
    fn test_severity_breakpoints() {
        assert_eq!(Severity::from_ratio(1.2), Severity::Low);
        assert_eq!(Severity::from_ratio(1.5), Severity::Medium);
        assert_eq!(Severity::from_ratio(1.99), Severity::Medium);
        assert_eq!(Severity::from_ratio(2.0), Severity::High);
        assert_eq!(Severity::from_ratio(2.5), Severity::High);
        assert_eq!(Severity::from_ratio(3.0), Severity::Critical);
        assert_eq!(Severity::from_ratio(12.0), Severity::Critical);
    }

    #[test]
    fn test_bottleneck_ids_unique_and_clamped() {
        let profile = sample_profile();
        let a = PerformanceBottleneck::new(
            &profile,
            BottleneckType::CpuBound,
            Severity::High,
            "aggregate",
            140.0,
            110.0,
            1.7,
        );
        let b = PerformanceBottleneck::new(
            &profile,
            BottleneckType::CpuBound,
            Severity::High,
            "aggregate",
            10.0,
            5.0,
            0.5,
        );
        assert_ne!(a.id, b.id);
        assert_eq!(a.impact_score, 100.0);
        assert_eq!(a.percentage_of_total, 100.0);
        assert_eq!(a.confidence, 1.0);
        assert_eq!(a.dedup_key(), "cpu_bound_checkout-service");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
