//! Pluggable bottleneck detection algorithms
//!
//! Each algorithm is a stateless evaluator over one profile plus a read-only
//! snapshot of the shared detection state. The orchestrator owns the registry
//! (built once from a fixed table), runs algorithms in insertion order and
//! isolates their failures; nothing here mutates baselines or history.

use serde_json::json;

use crate::config::AnalysisConfig;
use crate::detection::baseline::BaselineTracker;
use crate::detection::history::HistoricalStore;
use crate::detection::structs::{
    BottleneckType, MetricCategory, MetricType, PerformanceBottleneck, PerformanceProfile,
    Severity,
};
use crate::errors::DetectionError;
use crate::statistics;

/// Read-only view the orchestrator hands to every algorithm for one call
pub struct DetectionContext<'a> {
    pub config: &'a AnalysisConfig,
    pub baselines: &'a BaselineTracker,
    pub history: &'a HistoricalStore,
}

impl DetectionContext<'_> {
    pub fn target_key(&self, profile: &PerformanceProfile) -> String {
        format!("{}_{}", profile.target_type, profile.target_id)
    }
}

/// A single detection strategy producing zero or more candidate findings
pub trait DetectionAlgorithm: Send + Sync {
    fn evaluate(
        &self,
        profile: &PerformanceProfile,
        ctx: &DetectionContext,
    ) -> Result<Vec<PerformanceBottleneck>, DetectionError>;
}

/// Share of the profile's total sample load carried by one category (0-100)
fn category_share(profile: &PerformanceProfile, category: MetricCategory) -> f64 {
    let total: f64 = profile.metrics.iter().map(|m| m.value).sum();
    if total == 0.0 {
        return 0.0;
    }
    let in_category: f64 = profile.category_values(category).iter().sum();
    (in_category / total) * 100.0
}

/// Share of the profile's total sample load carried by one metric type (0-100)
fn metric_share(profile: &PerformanceProfile, metric_type: MetricType) -> f64 {
    let total: f64 = profile.metrics.iter().map(|m| m.value).sum();
    if total == 0.0 {
        return 0.0;
    }
    let of_type: f64 = profile.metric_values(metric_type).iter().sum();
    (of_type / total) * 100.0
}

/// Category-mean threshold checks for cpu/memory/io/network.
///
/// Emits one finding per category whose in-profile mean exceeds the
/// configured threshold; severity follows the ratio breakpoints.
pub struct ThresholdDetection;

impl ThresholdDetection {
    const CHECKS: [(MetricCategory, BottleneckType, &'static str); 4] = [
        (MetricCategory::Cpu, BottleneckType::CpuBound, "cpu_aggregate"),
        (MetricCategory::Memory, BottleneckType::MemoryBound, "memory_aggregate"),
        (MetricCategory::Io, BottleneckType::IoBound, "io_aggregate"),
        (MetricCategory::Network, BottleneckType::NetworkBound, "network_aggregate"),
    ];

    fn threshold_for(config: &AnalysisConfig, category: MetricCategory) -> f64 {
        match category {
            MetricCategory::Cpu => config.cpu_usage_threshold,
            MetricCategory::Memory => config.memory_usage_threshold,
            MetricCategory::Io => config.io_latency_threshold,
            MetricCategory::Network => config.network_latency_threshold,
            _ => f64::MAX,
        }
    }
}

impl DetectionAlgorithm for ThresholdDetection {
    fn evaluate(
        &self,
        profile: &PerformanceProfile,
        ctx: &DetectionContext,
    ) -> Result<Vec<PerformanceBottleneck>, DetectionError> {
        let mut findings = Vec::new();

        for (category, bottleneck_type, operation) in Self::CHECKS {
            let values = profile.category_values(category);
            if values.is_empty() {
                continue;
            }

            let threshold = Self::threshold_for(ctx.config, category);
            let current = statistics::mean(&values);
            if current <= threshold {
                continue;
            }

            // Reference point: peak sample for cpu/memory, the threshold
            // itself for latency-style categories.
            let baseline = match category {
                MetricCategory::Cpu | MetricCategory::Memory => values
                    .iter()
                    .fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)),
                _ => threshold,
            };
            let impact = if baseline == 0.0 { 0.0 } else { ((current / baseline) * 50.0).min(100.0) };

            let finding = PerformanceBottleneck::new(
                profile,
                bottleneck_type,
                Severity::from_ratio(current / threshold),
                operation,
                impact,
                category_share(profile, category),
                0.9,
            )
            .with_context("current_mean", json!(current))
            .with_context("threshold", json!(threshold));
            findings.push(finding);
        }

        Ok(findings)
    }
}

/// Z-score of the current profile's metric averages against the target's
/// historical per-profile averages.
pub struct StatisticalOutlierDetection;

impl StatisticalOutlierDetection {
    const METRICS: [MetricType; 5] = [
        MetricType::ResponseTime,
        MetricType::CpuUsage,
        MetricType::MemoryUsage,
        MetricType::DiskIo,
        MetricType::NetworkIo,
    ];

    fn bottleneck_type_for(metric_type: MetricType) -> BottleneckType {
        match metric_type {
            MetricType::CpuUsage => BottleneckType::CpuBound,
            MetricType::MemoryUsage => BottleneckType::MemoryBound,
            MetricType::DiskIo => BottleneckType::IoBound,
            MetricType::NetworkIo => BottleneckType::NetworkBound,
            _ => BottleneckType::AlgorithmInefficiency,
        }
    }
}

impl DetectionAlgorithm for StatisticalOutlierDetection {
    fn evaluate(
        &self,
        profile: &PerformanceProfile,
        ctx: &DetectionContext,
    ) -> Result<Vec<PerformanceBottleneck>, DetectionError> {
        let target_key = ctx.target_key(profile);
        if ctx.history.target_count(&target_key) < ctx.config.min_sample_size {
            // Insufficient history is not an error
            return Ok(Vec::new());
        }

        let mut findings = Vec::new();
        for metric_type in Self::METRICS {
            let current_values = profile.metric_values(metric_type);
            if current_values.is_empty() {
                continue;
            }
            let historical = ctx.history.metric_averages(&target_key, metric_type);
            if historical.len() < ctx.config.min_sample_size {
                continue;
            }

            let hist_mean = statistics::mean(&historical);
            let hist_std = statistics::std_dev(&historical);
            if hist_std == 0.0 {
                continue;
            }

            let current = statistics::mean(&current_values);
            let z_score = (current - hist_mean).abs() / hist_std;
            if z_score <= 2.0 {
                continue;
            }

            let severity = if z_score > 3.0 { Severity::High } else { Severity::Medium };
            let finding = PerformanceBottleneck::new(
                profile,
                Self::bottleneck_type_for(metric_type),
                severity,
                "historical_deviation",
                (z_score * 25.0).min(100.0),
                metric_share(profile, metric_type),
                (z_score / 3.0).min(0.95),
            )
            .with_context("z_score", json!(z_score))
            .with_context("historical_mean", json!(hist_mean))
            .with_context("current_mean", json!(current));
            findings.push(finding);
        }

        Ok(findings)
    }
}

/// Linear-trend degradation of response-time averages across the most
/// recent analysis window.
pub struct TrendAnalysisDetection;

impl DetectionAlgorithm for TrendAnalysisDetection {
    fn evaluate(
        &self,
        profile: &PerformanceProfile,
        ctx: &DetectionContext,
    ) -> Result<Vec<PerformanceBottleneck>, DetectionError> {
        let target_key = ctx.target_key(profile);
        let window = ctx.config.analysis_window_size;
        if ctx.history.target_count(&target_key) < window {
            return Ok(Vec::new());
        }

        let historical = ctx.history.metric_averages(&target_key, MetricType::ResponseTime);
        if historical.len() < window {
            return Ok(Vec::new());
        }

        let series = &historical[historical.len() - window..];
        let trend = statistics::linear_trend(series);
        if trend.slope <= 0.1 || trend.correlation <= 0.7 {
            return Ok(Vec::new());
        }

        let finding = PerformanceBottleneck::new(
            profile,
            BottleneckType::AlgorithmInefficiency,
            Severity::Medium,
            "response_time_trend",
            60.0,
            metric_share(profile, MetricType::ResponseTime),
            trend.correlation,
        )
        .with_context("slope", json!(trend.slope))
        .with_context("correlation", json!(trend.correlation))
        .with_context("window_size", json!(window));
        Ok(vec![finding])
    }
}

/// Low CPU with response times far above threshold points at threads
/// waiting on locks rather than doing work.
pub struct LockContentionDetection;

impl DetectionAlgorithm for LockContentionDetection {
    fn evaluate(
        &self,
        profile: &PerformanceProfile,
        ctx: &DetectionContext,
    ) -> Result<Vec<PerformanceBottleneck>, DetectionError> {
        let cpu = profile.metric_values(MetricType::CpuUsage);
        let response_times = profile.metric_values(MetricType::ResponseTime);
        if cpu.is_empty() || response_times.is_empty() {
            return Ok(Vec::new());
        }

        let cpu_mean = statistics::mean(&cpu);
        let rt_mean = statistics::mean(&response_times);
        if cpu_mean >= 30.0 || rt_mean <= 2.0 * ctx.config.response_time_threshold {
            return Ok(Vec::new());
        }

        let finding = PerformanceBottleneck::new(
            profile,
            BottleneckType::LockContention,
            Severity::High,
            "wait_heavy_requests",
            80.0,
            metric_share(profile, MetricType::ResponseTime),
            0.7,
        )
        .with_context("cpu_mean", json!(cpu_mean))
        .with_context("response_time_mean", json!(rt_mean));
        Ok(vec![finding])
    }
}

/// High peak memory combined with a volatile memory series indicates the
/// target is starved and thrashing for the resource.
pub struct ResourceStarvationDetection;

impl DetectionAlgorithm for ResourceStarvationDetection {
    fn evaluate(
        &self,
        profile: &PerformanceProfile,
        _ctx: &DetectionContext,
    ) -> Result<Vec<PerformanceBottleneck>, DetectionError> {
        let memory = profile.metric_values(MetricType::MemoryUsage);
        if memory.is_empty() {
            return Ok(Vec::new());
        }

        let max_memory = memory.iter().fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let cov = statistics::coefficient_of_variation(&memory);
        if max_memory <= 85.0 || cov <= 0.3 {
            return Ok(Vec::new());
        }

        let finding = PerformanceBottleneck::new(
            profile,
            BottleneckType::ResourceStarvation,
            Severity::High,
            "memory_pressure",
            85.0,
            metric_share(profile, MetricType::MemoryUsage),
            0.8,
        )
        .with_context("max_memory", json!(max_memory))
        .with_context("coefficient_of_variation", json!(cov));
        Ok(vec![finding])
    }
}

/// Pearson correlation of the response-time and CPU series within one
/// profile. Strong positive correlation blames the CPU; strong negative
/// correlation points at inefficient code paths.
pub struct CorrelationDetection;

impl DetectionAlgorithm for CorrelationDetection {
    fn evaluate(
        &self,
        profile: &PerformanceProfile,
        _ctx: &DetectionContext,
    ) -> Result<Vec<PerformanceBottleneck>, DetectionError> {
        let response_times = profile.metric_values(MetricType::ResponseTime);
        let cpu = profile.metric_values(MetricType::CpuUsage);
        let r = statistics::pearson_correlation(&response_times, &cpu);
        if r.abs() <= 0.7 {
            return Ok(Vec::new());
        }

        let bottleneck_type = if r > 0.0 {
            BottleneckType::CpuBound
        } else {
            BottleneckType::AlgorithmInefficiency
        };

        let finding = PerformanceBottleneck::new(
            profile,
            bottleneck_type,
            Severity::Medium,
            "metric_correlation",
            r.abs() * 100.0,
            metric_share(profile, MetricType::ResponseTime),
            r.abs(),
        )
        .with_context("pearson_r", json!(r));
        Ok(vec![finding])
    }
}

/// Deviation of the profile signature from the target's rolling baseline.
/// Scoring only: the orchestrator folds the signature into the baseline
/// once per analyzed profile.
pub struct AnomalyDetection;

impl DetectionAlgorithm for AnomalyDetection {
    fn evaluate(
        &self,
        profile: &PerformanceProfile,
        ctx: &DetectionContext,
    ) -> Result<Vec<PerformanceBottleneck>, DetectionError> {
        let Some(signal) = ctx.baselines.score(profile) else {
            return Ok(Vec::new());
        };

        let finding = PerformanceBottleneck::new(
            profile,
            BottleneckType::AlgorithmInefficiency,
            signal.severity,
            "baseline_deviation",
            (signal.score * 20.0).min(100.0),
            metric_share(profile, MetricType::ResponseTime),
            signal.confidence,
        )
        .with_context("anomaly_score", json!(signal.score))
        .with_context("baseline_mean", json!(signal.baseline_mean))
        .with_context("baseline_variance", json!(signal.baseline_variance));
        Ok(vec![finding])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::history::HistoricalProfile;
    use crate::detection::structs::{PerformanceMetric, ProfileSummary};

    fn profile(metrics: Vec<(MetricType, MetricCategory, f64)>) -> PerformanceProfile {
        PerformanceProfile {
            id: "p_test".to_string(),
            target_id: "svc-a".to_string(),
            target_type: "service".to_string(),
            duration_ms: 1000,
            start_time: 0,
            metrics: metrics
                .into_iter()
                .map(|(t, c, v)| PerformanceMetric::new(t, c, v))
                .collect(),
            summary: ProfileSummary { performance_score: 80.0 },
        }
    }

    fn cpu_profile(values: &[f64]) -> PerformanceProfile {
        profile(
            values
                .iter()
                .map(|&v| (MetricType::CpuUsage, MetricCategory::Cpu, v))
                .collect(),
        )
    }

    struct TestState {
        config: AnalysisConfig,
        baselines: BaselineTracker,
        history: HistoricalStore,
    }

    impl TestState {
        fn new() -> Self {
            Self {
                config: AnalysisConfig::default(),
                baselines: BaselineTracker::new(),
                history: HistoricalStore::new(),
            }
        }

        fn ctx(&self) -> DetectionContext<'_> {
            DetectionContext {
                config: &self.config,
                baselines: &self.baselines,
                history: &self.history,
            }
        }
    }

    #[test]
    fn test_threshold_cpu_above_limit() {
        let state = TestState::new();
        let p = cpu_profile(&[95.0, 96.0, 97.0, 98.0]);
        let findings = ThresholdDetection.evaluate(&p, &state.ctx()).unwrap();

        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.bottleneck_type, BottleneckType::CpuBound);
        // 96.5 / 80 = 1.206 -> below the 1.5x breakpoint
        assert_eq!(finding.severity, Severity::Low);
        assert_eq!(finding.confidence, 0.9);
        // impact = mean / max * 50
        assert!((finding.impact_score - 96.5 / 98.0 * 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_severity_scales_with_ratio() {
        let mut state = TestState::new();
        state.config.cpu_usage_threshold = 30.0;
        let p = cpu_profile(&[74.0, 76.0]); // mean 75, ratio 2.5
        let findings = ThresholdDetection.evaluate(&p, &state.ctx()).unwrap();
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn test_threshold_quiet_below_limit() {
        let state = TestState::new();
        let p = cpu_profile(&[40.0, 50.0]);
        assert!(ThresholdDetection.evaluate(&p, &state.ctx()).unwrap().is_empty());
    }

    #[test]
    fn test_outlier_requires_min_sample_size() {
        let mut state = TestState::new();
        // One short of the minimum
        for i in 0..state.config.min_sample_size - 1 {
            state.history.append(HistoricalProfile::from_profile(&{
                let mut p = cpu_profile(&[50.0]);
                p.id = format!("h{}", i);
                p
            }));
        }
        let anomalous = cpu_profile(&[99.0]);
        assert!(StatisticalOutlierDetection
            .evaluate(&anomalous, &state.ctx())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_outlier_flags_deviant_profile() {
        let mut state = TestState::new();
        // Stable history with slight jitter so stddev is non-zero
        for i in 0..12 {
            let v = 50.0 + (i % 3) as f64;
            state.history.append(HistoricalProfile::from_profile(&{
                let mut p = cpu_profile(&[v]);
                p.id = format!("h{}", i);
                p
            }));
        }
        let anomalous = cpu_profile(&[95.0]);
        let findings = StatisticalOutlierDetection.evaluate(&anomalous, &state.ctx()).unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].bottleneck_type, BottleneckType::CpuBound);
        assert_eq!(findings[0].severity, Severity::High);
        assert!(findings[0].confidence <= 0.95);
    }

    #[test]
    fn test_trend_detects_degradation() {
        let mut state = TestState::new();
        for i in 0..state.config.analysis_window_size {
            let mut p = profile(vec![(
                MetricType::ResponseTime,
                MetricCategory::Application,
                100.0 + 10.0 * i as f64,
            )]);
            p.id = format!("h{}", i);
            state.history.append(HistoricalProfile::from_profile(&p));
        }

        let current = profile(vec![(
            MetricType::ResponseTime,
            MetricCategory::Application,
            220.0,
        )]);
        let findings = TrendAnalysisDetection.evaluate(&current, &state.ctx()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].bottleneck_type, BottleneckType::AlgorithmInefficiency);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[0].confidence > 0.9);
        // The fitted series is exactly the historical window
        assert_eq!(
            findings[0].context["window_size"],
            json!(state.config.analysis_window_size)
        );
    }

    #[test]
    fn test_trend_ignores_current_profile_spike() {
        // Flat history with a wild current profile: the fit covers history
        // only, so a single outlying profile cannot fabricate a trend
        let mut state = TestState::new();
        for i in 0..state.config.analysis_window_size {
            let mut p = profile(vec![(
                MetricType::ResponseTime,
                MetricCategory::Application,
                100.0,
            )]);
            p.id = format!("h{}", i);
            state.history.append(HistoricalProfile::from_profile(&p));
        }
        let spike = profile(vec![(
            MetricType::ResponseTime,
            MetricCategory::Application,
            5000.0,
        )]);
        assert!(TrendAnalysisDetection.evaluate(&spike, &state.ctx()).unwrap().is_empty());
    }

    #[test]
    fn test_trend_quiet_on_flat_history() {
        let mut state = TestState::new();
        for i in 0..state.config.analysis_window_size {
            let mut p = profile(vec![(
                MetricType::ResponseTime,
                MetricCategory::Application,
                100.0,
            )]);
            p.id = format!("h{}", i);
            state.history.append(HistoricalProfile::from_profile(&p));
        }
        let current = profile(vec![(
            MetricType::ResponseTime,
            MetricCategory::Application,
            100.0,
        )]);
        assert!(TrendAnalysisDetection.evaluate(&current, &state.ctx()).unwrap().is_empty());
    }

    #[test]
    fn test_lock_contention_heuristic() {
        let state = TestState::new();
        let p = profile(vec![
            (MetricType::CpuUsage, MetricCategory::Cpu, 15.0),
            (MetricType::CpuUsage, MetricCategory::Cpu, 20.0),
            (MetricType::ResponseTime, MetricCategory::Application, 2500.0),
            (MetricType::ResponseTime, MetricCategory::Application, 3000.0),
        ]);
        let findings = LockContentionDetection.evaluate(&p, &state.ctx()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].bottleneck_type, BottleneckType::LockContention);
        assert_eq!(findings[0].impact_score, 80.0);
        assert_eq!(findings[0].confidence, 0.7);
    }

    #[test]
    fn test_lock_contention_needs_both_series() {
        let state = TestState::new();
        let p = profile(vec![(MetricType::ResponseTime, MetricCategory::Application, 9000.0)]);
        assert!(LockContentionDetection.evaluate(&p, &state.ctx()).unwrap().is_empty());
    }

    #[test]
    fn test_resource_starvation_pattern() {
        let state = TestState::new();
        let p = profile(vec![
            (MetricType::MemoryUsage, MetricCategory::Memory, 30.0),
            (MetricType::MemoryUsage, MetricCategory::Memory, 95.0),
            (MetricType::MemoryUsage, MetricCategory::Memory, 40.0),
            (MetricType::MemoryUsage, MetricCategory::Memory, 92.0),
        ]);
        let findings = ResourceStarvationDetection.evaluate(&p, &state.ctx()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].bottleneck_type, BottleneckType::ResourceStarvation);
        assert_eq!(findings[0].impact_score, 85.0);
    }

    #[test]
    fn test_resource_starvation_quiet_on_stable_memory() {
        let state = TestState::new();
        // High but flat memory: CoV stays under 0.3
        let p = profile(vec![
            (MetricType::MemoryUsage, MetricCategory::Memory, 90.0),
            (MetricType::MemoryUsage, MetricCategory::Memory, 91.0),
            (MetricType::MemoryUsage, MetricCategory::Memory, 92.0),
        ]);
        assert!(ResourceStarvationDetection.evaluate(&p, &state.ctx()).unwrap().is_empty());
    }

    #[test]
    fn test_correlation_positive_blames_cpu() {
        let state = TestState::new();
        let mut metrics = Vec::new();
        for i in 0..10 {
            metrics.push((MetricType::ResponseTime, MetricCategory::Application, 100.0 + 10.0 * i as f64));
            metrics.push((MetricType::CpuUsage, MetricCategory::Cpu, 40.0 + 5.0 * i as f64));
        }
        let p = profile(metrics);
        let findings = CorrelationDetection.evaluate(&p, &state.ctx()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].bottleneck_type, BottleneckType::CpuBound);
        assert!((findings[0].confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_negative_blames_code() {
        let state = TestState::new();
        let mut metrics = Vec::new();
        for i in 0..10 {
            metrics.push((MetricType::ResponseTime, MetricCategory::Application, 100.0 + 10.0 * i as f64));
            metrics.push((MetricType::CpuUsage, MetricCategory::Cpu, 90.0 - 5.0 * i as f64));
        }
        let p = profile(metrics);
        let findings = CorrelationDetection.evaluate(&p, &state.ctx()).unwrap();
        assert_eq!(findings[0].bottleneck_type, BottleneckType::AlgorithmInefficiency);
    }

    #[test]
    fn test_anomaly_delegates_to_baseline() {
        let mut state = TestState::new();
        for v in [100.0, 101.0, 99.0, 100.5, 99.5] {
            state.baselines.observe(&profile(vec![(
                MetricType::ResponseTime,
                MetricCategory::Application,
                v,
            )]));
        }
        let spike = profile(vec![(
            MetricType::ResponseTime,
            MetricCategory::Application,
            160.0,
        )]);
        let findings = AnomalyDetection.evaluate(&spike, &state.ctx()).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].context.contains_key("anomaly_score"));
    }

    #[test]
    fn test_anomaly_silent_for_new_target() {
        let state = TestState::new();
        let p = cpu_profile(&[99.0]);
        assert!(AnomalyDetection.evaluate(&p, &state.ctx()).unwrap().is_empty());
    }
}
