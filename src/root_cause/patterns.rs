//! Known degradation pattern database
//!
//! Patterns carry a richer indicator list than the matcher consumes: matching
//! is a plain lookup on the bottleneck's coarse type. The indicator fields are
//! kept for a future indicator-based matcher and are not evaluated today.

use serde_json::json;

use crate::detection::structs::{BottleneckType, PerformanceBottleneck};
use crate::root_cause::structs::{
    Evidence, EvidenceType, FixEffort, FixPriority, FixSuggestion, ImpactAssessment, RootCause,
    RootCauseCategory,
};

/// One known degradation pattern
pub struct KnownPattern {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Coarse bottleneck type the matcher keys on
    pub matched_type: BottleneckType,
    /// Finer-grained indicators, currently unused by the matcher
    pub indicators: &'static [&'static str],
    pub confidence: f64,
    pub suggested_fix: &'static str,
}

/// The fixed pattern database
pub fn known_patterns() -> Vec<KnownPattern> {
    vec![
        KnownPattern {
            id: "memory_leak_pattern",
            name: "Memory leak",
            description: "Heap usage climbs until the process is restarted or collected",
            matched_type: BottleneckType::MemoryBound,
            indicators: &["increasing_memory_trend", "gc_frequency_increase"],
            confidence: 0.75,
            suggested_fix: "Track allocation sites of long-lived objects and bound cache growth",
        },
        KnownPattern {
            id: "cpu_spike_pattern",
            name: "CPU spike",
            description: "Short bursts of full CPU saturation aligned with request spikes",
            matched_type: BottleneckType::CpuBound,
            indicators: &["cpu_burst", "request_rate_correlation"],
            confidence: 0.7,
            suggested_fix: "Smooth bursty workloads with queueing and bounded concurrency",
        },
        KnownPattern {
            id: "thread_pool_exhaustion",
            name: "Thread pool exhaustion",
            description: "All worker threads blocked, new work queues without progress",
            matched_type: BottleneckType::LockContention,
            indicators: &["queue_size_growth", "idle_cpu_high_latency"],
            confidence: 0.75,
            suggested_fix: "Size worker pools from measured concurrency and add backpressure",
        },
        KnownPattern {
            id: "db_connection_pool_exhaustion",
            name: "Database connection pool exhaustion",
            description: "Requests wait on checkout because the pool is fully leased",
            matched_type: BottleneckType::DatabaseBound,
            indicators: &["connection_pool_saturation", "query_queue_growth"],
            confidence: 0.75,
            suggested_fix: "Raise pool limits or shorten transaction scope to return connections",
        },
    ]
}

/// Match the database against one bottleneck's coarse type.
///
/// Each match contributes an architectural-issue root cause carrying the
/// pattern's description and suggested fix.
pub fn match_patterns(bottleneck: &PerformanceBottleneck) -> Vec<RootCause> {
    known_patterns()
        .iter()
        .filter(|p| p.matched_type == bottleneck.bottleneck_type)
        .map(|pattern| {
            let mut rc = RootCause::new(
                RootCauseCategory::ArchitecturalIssue,
                pattern.description,
                pattern.confidence,
            );
            rc.evidence.push(Evidence::new(
                EvidenceType::PatternMatching,
                pattern.name,
                json!({
                    "pattern_id": pattern.id,
                    "matched_type": bottleneck.bottleneck_type.to_string(),
                    "indicators": pattern.indicators,
                }),
                pattern.confidence,
            ));
            rc.fix_suggestions.push(FixSuggestion {
                description: pattern.suggested_fix.to_string(),
                priority: FixPriority::Medium,
                estimated_improvement_percent: 30.0,
                implementation_effort: FixEffort::Medium,
            });
            rc.impact_assessment = ImpactAssessment {
                performance_impact: bottleneck.impact_score,
                user_impact: 50.0,
                business_impact: 40.0,
                resource_impact: 50.0,
                affected_operations: vec![bottleneck.operation.clone()],
            };
            rc
        })
        .collect()
}
