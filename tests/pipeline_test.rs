//! End-to-end pipeline tests: profile -> detector -> analyzer

use std::sync::Arc;
use std::time::Duration;

use perf_analyzer::{
    AnalysisConfig, BottleneckDetector, BottleneckType, MetricCategory, MetricType,
    PerformanceMetric, PerformanceProfile, ProfileSummary, RootCauseAnalyzer, RootCauseCategory,
    Severity,
};

fn profile(id: &str, metrics: Vec<(MetricType, MetricCategory, f64)>) -> PerformanceProfile {
    PerformanceProfile {
        id: id.to_string(),
        target_id: "checkout-service".to_string(),
        target_type: "service".to_string(),
        duration_ms: 60_000,
        start_time: 0,
        metrics: metrics
            .into_iter()
            .map(|(t, c, v)| PerformanceMetric::new(t, c, v))
            .collect(),
        summary: ProfileSummary { performance_score: 72.0 },
    }
}

fn hot_cpu_profile(id: &str) -> PerformanceProfile {
    profile(
        id,
        vec![
            (MetricType::CpuUsage, MetricCategory::Cpu, 95.0),
            (MetricType::CpuUsage, MetricCategory::Cpu, 96.0),
            (MetricType::CpuUsage, MetricCategory::Cpu, 97.0),
            (MetricType::CpuUsage, MetricCategory::Cpu, 98.0),
        ],
    )
}

#[tokio::test]
async fn test_cpu_saturation_end_to_end() {
    let detector = BottleneckDetector::new(AnalysisConfig::default());
    let analyzer = RootCauseAnalyzer::new(AnalysisConfig::default());

    let p = hot_cpu_profile("p1");
    let bottlenecks = detector.analyze_profile(&p).await;

    assert_eq!(bottlenecks.len(), 1);
    let finding = &bottlenecks[0];
    assert_eq!(finding.bottleneck_type, BottleneckType::CpuBound);
    assert_eq!(finding.confidence, 0.9);
    // mean 96.5 / threshold 80 = 1.206: between 1.0 and the 1.5x breakpoint
    assert_eq!(finding.severity, Severity::Low);
    assert_eq!(finding.component, "checkout-service");

    let causes = analyzer.analyze_bottleneck(finding, &p).await;
    assert!(causes
        .iter()
        .any(|rc| rc.category == RootCauseCategory::CodeInefficiency));
    for rc in &causes {
        assert!((0.0..=1.0).contains(&rc.confidence));
        for evidence in &rc.evidence {
            assert!((0.0..=1.0).contains(&evidence.strength));
        }
    }
}

#[tokio::test]
async fn test_severity_breakpoints_through_threshold_path() {
    // ratio 2.5 with threshold 30 -> high
    let config = AnalysisConfig { cpu_usage_threshold: 30.0, ..Default::default() };
    let detector = BottleneckDetector::new(config);
    let p = profile(
        "p1",
        vec![
            (MetricType::CpuUsage, MetricCategory::Cpu, 74.0),
            (MetricType::CpuUsage, MetricCategory::Cpu, 76.0),
        ],
    );
    let bottlenecks = detector.analyze_profile(&p).await;
    assert_eq!(bottlenecks[0].severity, Severity::High);

    // ratio 3.2 -> critical
    let config = AnalysisConfig { cpu_usage_threshold: 25.0, ..Default::default() };
    let detector = BottleneckDetector::new(config);
    let bottlenecks = detector
        .analyze_profile(&profile(
            "p2",
            vec![(MetricType::CpuUsage, MetricCategory::Cpu, 80.0)],
        ))
        .await;
    assert_eq!(bottlenecks[0].severity, Severity::Critical);
}

#[tokio::test]
async fn test_outlier_silent_below_min_sample_size() {
    let detector = BottleneckDetector::new(AnalysisConfig::default());

    // Feed a handful of quiet profiles, fewer than min_sample_size
    for i in 0..5 {
        let p = profile(
            &format!("warmup_{}", i),
            vec![(MetricType::ResponseTime, MetricCategory::Application, 100.0)],
        );
        detector.analyze_profile(&p).await;
    }

    // A wildly different profile: statistical outlier must stay silent
    let wild = profile(
        "wild",
        vec![(MetricType::ResponseTime, MetricCategory::Application, 900.0)],
    );
    let analysis = detector.analyze_profile_detailed(&wild).await;
    let outlier_run = analysis
        .runs
        .iter()
        .find(|r| r.algorithm_id == "statistical_outlier")
        .unwrap();
    assert_eq!(outlier_run.candidates, 0);
}

#[tokio::test]
async fn test_outlier_fires_with_sufficient_history() {
    let config = AnalysisConfig { min_sample_size: 5, ..Default::default() };
    let detector = BottleneckDetector::new(config);

    for i in 0..8 {
        let jitter = (i % 3) as f64;
        let p = profile(
            &format!("warmup_{}", i),
            vec![(MetricType::CpuUsage, MetricCategory::Cpu, 40.0 + jitter)],
        );
        detector.analyze_profile(&p).await;
    }

    let spike = profile("spike", vec![(MetricType::CpuUsage, MetricCategory::Cpu, 75.0)]);
    let bottlenecks = detector.analyze_profile(&spike).await;
    let cpu_finding = bottlenecks
        .iter()
        .find(|b| b.bottleneck_type == BottleneckType::CpuBound)
        .expect("outlier finding expected");
    assert_eq!(cpu_finding.context["detection_algorithm"], "statistical_outlier");
    assert!(cpu_finding.confidence <= 0.95);
}

#[tokio::test]
async fn test_anomaly_baseline_lifecycle() {
    let detector = BottleneckDetector::new(AnalysisConfig::default());

    // First profile for a new target: never an anomaly
    let first = profile(
        "first",
        vec![(MetricType::ResponseTime, MetricCategory::Application, 100.0)],
    );
    assert!(detector.analyze_profile(&first).await.is_empty());

    // Second profile far from the first: zero initial variance means no
    // anomaly is possible and no division by zero occurs
    let second = profile(
        "second",
        vec![(MetricType::ResponseTime, MetricCategory::Application, 5000.0)],
    );
    let analysis = detector.analyze_profile_detailed(&second).await;
    let anomaly_run = analysis
        .runs
        .iter()
        .find(|r| r.algorithm_id == "anomaly_detection")
        .unwrap();
    assert_eq!(anomaly_run.candidates, 0);
    assert!(anomaly_run.error.is_none());
}

#[tokio::test]
async fn test_lock_contention_flows_to_resource_contention_cause() {
    let detector = BottleneckDetector::new(AnalysisConfig::default());
    let analyzer = RootCauseAnalyzer::new(AnalysisConfig::default());

    let p = profile(
        "p1",
        vec![
            (MetricType::CpuUsage, MetricCategory::Cpu, 12.0),
            (MetricType::CpuUsage, MetricCategory::Cpu, 18.0),
            (MetricType::ResponseTime, MetricCategory::Application, 2800.0),
            (MetricType::ResponseTime, MetricCategory::Application, 3200.0),
        ],
    );
    let bottlenecks = detector.analyze_profile(&p).await;
    let lock = bottlenecks
        .iter()
        .find(|b| b.bottleneck_type == BottleneckType::LockContention)
        .expect("lock contention expected");
    assert_eq!(lock.impact_score, 80.0);

    let causes = analyzer.analyze_bottleneck(lock, &p).await;
    assert!(causes
        .iter()
        .any(|rc| rc.category == RootCauseCategory::ResourceContention));
    // thread_pool_exhaustion pattern matches the lock_contention type
    assert!(causes
        .iter()
        .any(|rc| rc.category == RootCauseCategory::ArchitecturalIssue));
}

#[tokio::test]
async fn test_maintenance_task_runs_on_schedule() {
    let detector = Arc::new(BottleneckDetector::new(AnalysisConfig::default()));
    detector.analyze_profile(&hot_cpu_profile("p1")).await;

    let handle = BottleneckDetector::spawn_maintenance(Arc::clone(&detector), Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(80)).await;
    handle.abort();

    // Nothing to trim or evict, but the task ran without panicking and state
    // is intact
    assert_eq!(detector.statistics().historical_profiles, 1);
}

#[tokio::test]
async fn test_analyze_profile_with_empty_metrics_returns_empty() {
    let detector = BottleneckDetector::new(AnalysisConfig::default());
    let empty = profile("empty", vec![]);
    let analysis = detector.analyze_profile_detailed(&empty).await;
    assert!(analysis.bottlenecks.is_empty());
    assert!(analysis.runs.iter().all(|r| r.error.is_none()));
}
