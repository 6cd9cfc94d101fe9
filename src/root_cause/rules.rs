//! Rule table for root-cause inference
//!
//! A rule is an AND-combined list of conditions plus a domain-specific
//! generator that produces the evidence and fix suggestions. Rules evaluate
//! against one bottleneck and its profile; the analyzer isolates failures per
//! rule.

use serde_json::json;

use crate::detection::structs::{
    BottleneckType, MetricType, PerformanceBottleneck, PerformanceProfile,
};
use crate::errors::AnalysisError;
use crate::root_cause::structs::{
    Evidence, EvidenceType, FixEffort, FixPriority, FixSuggestion, ImpactAssessment, RootCause,
    RootCauseCategory,
};
use crate::statistics;

/// Which statistic of a metric series a threshold condition applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricStat {
    Average,
    Maximum,
}

/// One condition of a rule; all of a rule's conditions must hold
#[derive(Debug, Clone)]
pub enum RuleCondition {
    /// A statistic of one metric series exceeds a fixed threshold
    MetricThreshold {
        metric: MetricType,
        stat: MetricStat,
        above: f64,
    },
    /// The metric series trends upward at least this steeply within the profile
    MetricTrend {
        metric: MetricType,
        min_slope: f64,
        min_correlation: f64,
    },
    /// The bottleneck carries this coarse type
    BottleneckOfType(BottleneckType),
    /// The profile's performance score regressed at least this far below the
    /// historical mean for the target
    HistoricalRegression { min_drop_percent: f64 },
}

/// Evaluation inputs shared by all conditions of one rule
pub struct RuleContext<'a> {
    pub bottleneck: &'a PerformanceBottleneck,
    pub profile: &'a PerformanceProfile,
    /// Performance scores of recent analyses for the same target, oldest first
    pub historical_scores: &'a [f64],
}

impl RuleCondition {
    pub fn evaluate(&self, ctx: &RuleContext) -> bool {
        match self {
            RuleCondition::MetricThreshold { metric, stat, above } => {
                let values = ctx.profile.metric_values(*metric);
                if values.is_empty() {
                    return false;
                }
                let observed = match stat {
                    MetricStat::Average => statistics::mean(&values),
                    MetricStat::Maximum => {
                        values.iter().fold(f64::NEG_INFINITY, |acc, &v| acc.max(v))
                    }
                };
                observed > *above
            }
            RuleCondition::MetricTrend { metric, min_slope, min_correlation } => {
                let values = ctx.profile.metric_values(*metric);
                let trend = statistics::linear_trend(&values);
                trend.slope > *min_slope && trend.correlation > *min_correlation
            }
            RuleCondition::BottleneckOfType(expected) => {
                ctx.bottleneck.bottleneck_type == *expected
            }
            RuleCondition::HistoricalRegression { min_drop_percent } => {
                if ctx.historical_scores.is_empty() {
                    return false;
                }
                let historical_mean = statistics::mean(ctx.historical_scores);
                if historical_mean == 0.0 {
                    return false;
                }
                let drop =
                    (historical_mean - ctx.profile.summary.performance_score) / historical_mean;
                drop * 100.0 > *min_drop_percent
            }
        }
    }
}

/// Domain key selecting the evidence/fix generator for a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleDomain {
    CpuSaturation,
    MemoryLeak,
    SlowQuery,
    NetworkLatency,
    DiskIo,
    LockContention,
    GcOverhead,
}

/// One entry of the rule registry
pub struct AnalysisRule {
    pub id: &'static str,
    pub enabled: bool,
    pub category: RootCauseCategory,
    pub domain: RuleDomain,
    pub description: &'static str,
    pub base_confidence: f64,
    pub conditions: Vec<RuleCondition>,
}

impl AnalysisRule {
    /// True when every condition holds for this bottleneck/profile pair
    pub fn matches(&self, ctx: &RuleContext) -> bool {
        self.conditions.iter().all(|c| c.evaluate(ctx))
    }

    /// Build the root cause for a matched rule via its domain generator
    pub fn generate(&self, ctx: &RuleContext) -> Result<RootCause, AnalysisError> {
        let mut root_cause = RootCause::new(self.category, self.description, self.base_confidence);
        let (evidence, fixes, impact) = match self.domain {
            RuleDomain::CpuSaturation => cpu_saturation_artifacts(ctx),
            RuleDomain::MemoryLeak => memory_leak_artifacts(ctx),
            RuleDomain::SlowQuery => slow_query_artifacts(ctx),
            RuleDomain::NetworkLatency => network_latency_artifacts(ctx),
            RuleDomain::DiskIo => disk_io_artifacts(ctx),
            RuleDomain::LockContention => lock_contention_artifacts(ctx),
            RuleDomain::GcOverhead => gc_overhead_artifacts(ctx),
        };
        if evidence.is_empty() {
            return Err(AnalysisError::EvidenceGeneration(format!(
                "rule {} matched but produced no evidence",
                self.id
            )));
        }
        root_cause.evidence = evidence;
        root_cause.fix_suggestions = fixes;
        root_cause.impact_assessment = impact;
        Ok(root_cause)
    }
}

/// The fixed rule table the analyzer registry is built from
pub fn default_rules() -> Vec<AnalysisRule> {
    vec![
        AnalysisRule {
            id: "cpu_saturation",
            enabled: true,
            category: RootCauseCategory::CodeInefficiency,
            domain: RuleDomain::CpuSaturation,
            description: "CPU saturated by inefficient code paths",
            base_confidence: 0.85,
            conditions: vec![
                RuleCondition::BottleneckOfType(BottleneckType::CpuBound),
                RuleCondition::MetricThreshold {
                    metric: MetricType::CpuUsage,
                    stat: MetricStat::Maximum,
                    above: 95.0,
                },
            ],
        },
        AnalysisRule {
            id: "memory_leak",
            enabled: true,
            category: RootCauseCategory::CodeInefficiency,
            domain: RuleDomain::MemoryLeak,
            description: "Memory usage grows monotonically, likely a leak",
            base_confidence: 0.8,
            conditions: vec![
                RuleCondition::BottleneckOfType(BottleneckType::MemoryBound),
                RuleCondition::MetricTrend {
                    metric: MetricType::MemoryUsage,
                    min_slope: 0.05,
                    min_correlation: 0.6,
                },
            ],
        },
        AnalysisRule {
            id: "slow_query",
            enabled: true,
            category: RootCauseCategory::DataIssue,
            domain: RuleDomain::SlowQuery,
            description: "Database queries dominate request latency",
            base_confidence: 0.8,
            conditions: vec![
                RuleCondition::BottleneckOfType(BottleneckType::DatabaseBound),
                RuleCondition::MetricThreshold {
                    metric: MetricType::DatabaseQueryTime,
                    stat: MetricStat::Average,
                    above: 100.0,
                },
            ],
        },
        AnalysisRule {
            id: "network_latency",
            enabled: true,
            category: RootCauseCategory::ExternalDependency,
            domain: RuleDomain::NetworkLatency,
            description: "Network latency to upstream dependencies is elevated",
            base_confidence: 0.75,
            conditions: vec![
                RuleCondition::BottleneckOfType(BottleneckType::NetworkBound),
                RuleCondition::MetricThreshold {
                    metric: MetricType::NetworkIo,
                    stat: MetricStat::Average,
                    above: 200.0,
                },
            ],
        },
        AnalysisRule {
            id: "disk_io_saturation",
            enabled: true,
            category: RootCauseCategory::InfrastructureLimit,
            domain: RuleDomain::DiskIo,
            description: "Disk IO latency at the limit of the underlying storage",
            base_confidence: 0.75,
            conditions: vec![
                RuleCondition::BottleneckOfType(BottleneckType::IoBound),
                RuleCondition::MetricThreshold {
                    metric: MetricType::DiskIo,
                    stat: MetricStat::Average,
                    above: 100.0,
                },
            ],
        },
        AnalysisRule {
            id: "lock_contention",
            enabled: true,
            category: RootCauseCategory::ResourceContention,
            domain: RuleDomain::LockContention,
            description: "Threads serialize on shared locks",
            base_confidence: 0.8,
            conditions: vec![RuleCondition::BottleneckOfType(BottleneckType::LockContention)],
        },
        AnalysisRule {
            id: "gc_overhead",
            enabled: true,
            category: RootCauseCategory::ConfigurationError,
            domain: RuleDomain::GcOverhead,
            description: "Garbage collection consumes an outsized share of runtime",
            base_confidence: 0.75,
            conditions: vec![
                RuleCondition::MetricThreshold {
                    metric: MetricType::GcTime,
                    stat: MetricStat::Average,
                    above: 50.0,
                },
                RuleCondition::MetricThreshold {
                    metric: MetricType::MemoryUsage,
                    stat: MetricStat::Average,
                    above: 70.0,
                },
            ],
        },
    ]
}

type Artifacts = (Vec<Evidence>, Vec<FixSuggestion>, ImpactAssessment);

fn cpu_saturation_artifacts(ctx: &RuleContext) -> Artifacts {
    let cpu = ctx.profile.metric_values(MetricType::CpuUsage);
    if cpu.is_empty() {
        return (Vec::new(), Vec::new(), ImpactAssessment::default());
    }
    let max_cpu = cpu.iter().fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    let mean_cpu = statistics::mean(&cpu);

    let evidence = vec![Evidence::new(
        EvidenceType::ResourceUtilization,
        "CPU usage pinned near its ceiling for the profiled window",
        json!({"max_cpu": max_cpu, "mean_cpu": mean_cpu, "samples": cpu.len()}),
        ((max_cpu - 90.0) / 10.0).clamp(0.5, 1.0),
    )];
    let fixes = vec![
        FixSuggestion {
            description: "Profile the hot path and replace quadratic scans with indexed lookups"
                .to_string(),
            priority: FixPriority::High,
            estimated_improvement_percent: 40.0,
            implementation_effort: FixEffort::Medium,
        },
        FixSuggestion {
            description: "Cache repeated computations inside the request loop".to_string(),
            priority: FixPriority::Medium,
            estimated_improvement_percent: 20.0,
            implementation_effort: FixEffort::Low,
        },
    ];
    let impact = ImpactAssessment {
        performance_impact: ctx.bottleneck.impact_score,
        user_impact: 70.0,
        business_impact: 50.0,
        resource_impact: max_cpu.min(100.0),
        affected_operations: vec![ctx.bottleneck.operation.clone()],
    };
    (evidence, fixes, impact)
}

fn memory_leak_artifacts(ctx: &RuleContext) -> Artifacts {
    let memory = ctx.profile.metric_values(MetricType::MemoryUsage);
    if memory.is_empty() {
        return (Vec::new(), Vec::new(), ImpactAssessment::default());
    }
    let trend = statistics::linear_trend(&memory);

    let evidence = vec![Evidence::new(
        EvidenceType::TimingAnalysis,
        "Memory usage grows steadily across the profiled window without release",
        json!({"slope": trend.slope, "correlation": trend.correlation, "samples": memory.len()}),
        trend.correlation.clamp(0.5, 1.0),
    )];
    let fixes = vec![
        FixSuggestion {
            description: "Audit long-lived collections and caches for unbounded growth".to_string(),
            priority: FixPriority::High,
            estimated_improvement_percent: 50.0,
            implementation_effort: FixEffort::Medium,
        },
        FixSuggestion {
            description: "Take heap snapshots at interval and diff retained object graphs"
                .to_string(),
            priority: FixPriority::Medium,
            estimated_improvement_percent: 0.0,
            implementation_effort: FixEffort::Low,
        },
    ];
    let impact = ImpactAssessment {
        performance_impact: ctx.bottleneck.impact_score,
        user_impact: 60.0,
        business_impact: 55.0,
        resource_impact: 80.0,
        affected_operations: vec![ctx.bottleneck.operation.clone()],
    };
    (evidence, fixes, impact)
}

fn slow_query_artifacts(ctx: &RuleContext) -> Artifacts {
    let query_times = ctx.profile.metric_values(MetricType::DatabaseQueryTime);
    if query_times.is_empty() {
        return (Vec::new(), Vec::new(), ImpactAssessment::default());
    }
    let mean_query = statistics::mean(&query_times);

    let evidence = vec![Evidence::new(
        EvidenceType::QueryPlan,
        "Database query time dominates the request budget",
        json!({"mean_query_ms": mean_query, "samples": query_times.len()}),
        (mean_query / 500.0).clamp(0.5, 1.0),
    )];
    let fixes = vec![
        FixSuggestion {
            description: "Add covering indexes for the slowest recurring query shapes".to_string(),
            priority: FixPriority::High,
            estimated_improvement_percent: 60.0,
            implementation_effort: FixEffort::Low,
        },
        FixSuggestion {
            description: "Batch N+1 query patterns into single set-based statements".to_string(),
            priority: FixPriority::Medium,
            estimated_improvement_percent: 30.0,
            implementation_effort: FixEffort::Medium,
        },
    ];
    let impact = ImpactAssessment {
        performance_impact: ctx.bottleneck.impact_score,
        user_impact: 65.0,
        business_impact: 60.0,
        resource_impact: 40.0,
        affected_operations: vec![ctx.bottleneck.operation.clone()],
    };
    (evidence, fixes, impact)
}

fn network_latency_artifacts(ctx: &RuleContext) -> Artifacts {
    let network = ctx.profile.metric_values(MetricType::NetworkIo);
    if network.is_empty() {
        return (Vec::new(), Vec::new(), ImpactAssessment::default());
    }
    let mean_latency = statistics::mean(&network);

    let evidence = vec![Evidence::new(
        EvidenceType::MetricCorrelation,
        "Upstream network latency tracks the observed slowdown",
        json!({"mean_network_ms": mean_latency, "samples": network.len()}),
        (mean_latency / 1000.0).clamp(0.5, 1.0),
    )];
    let fixes = vec![
        FixSuggestion {
            description: "Add timeouts and hedged requests for the slow dependency".to_string(),
            priority: FixPriority::High,
            estimated_improvement_percent: 35.0,
            implementation_effort: FixEffort::Medium,
        },
        FixSuggestion {
            description: "Co-locate chatty services or introduce a regional cache".to_string(),
            priority: FixPriority::Low,
            estimated_improvement_percent: 45.0,
            implementation_effort: FixEffort::High,
        },
    ];
    let impact = ImpactAssessment {
        performance_impact: ctx.bottleneck.impact_score,
        user_impact: 60.0,
        business_impact: 45.0,
        resource_impact: 30.0,
        affected_operations: vec![ctx.bottleneck.operation.clone()],
    };
    (evidence, fixes, impact)
}

fn disk_io_artifacts(ctx: &RuleContext) -> Artifacts {
    let disk = ctx.profile.metric_values(MetricType::DiskIo);
    if disk.is_empty() {
        return (Vec::new(), Vec::new(), ImpactAssessment::default());
    }
    let mean_io = statistics::mean(&disk);

    let evidence = vec![Evidence::new(
        EvidenceType::ResourceUtilization,
        "Disk IO latency saturates the storage layer",
        json!({"mean_io_ms": mean_io, "samples": disk.len()}),
        (mean_io / 500.0).clamp(0.5, 1.0),
    )];
    let fixes = vec![
        FixSuggestion {
            description: "Move hot data onto faster storage or add a read-through cache"
                .to_string(),
            priority: FixPriority::High,
            estimated_improvement_percent: 50.0,
            implementation_effort: FixEffort::High,
        },
        FixSuggestion {
            description: "Coalesce small writes into batched sequential flushes".to_string(),
            priority: FixPriority::Medium,
            estimated_improvement_percent: 25.0,
            implementation_effort: FixEffort::Medium,
        },
    ];
    let impact = ImpactAssessment {
        performance_impact: ctx.bottleneck.impact_score,
        user_impact: 50.0,
        business_impact: 40.0,
        resource_impact: 70.0,
        affected_operations: vec![ctx.bottleneck.operation.clone()],
    };
    (evidence, fixes, impact)
}

fn lock_contention_artifacts(ctx: &RuleContext) -> Artifacts {
    let cpu = ctx.profile.metric_values(MetricType::CpuUsage);
    let response_times = ctx.profile.metric_values(MetricType::ResponseTime);
    if cpu.is_empty() && response_times.is_empty() {
        return (Vec::new(), Vec::new(), ImpactAssessment::default());
    }

    let evidence = vec![Evidence::new(
        EvidenceType::TimingAnalysis,
        "Requests stall while CPU stays idle, consistent with lock waits",
        json!({
            "mean_cpu": statistics::mean(&cpu),
            "mean_response_ms": statistics::mean(&response_times),
        }),
        0.7,
    )];
    let fixes = vec![
        FixSuggestion {
            description: "Shard the contended lock or switch to a concurrent data structure"
                .to_string(),
            priority: FixPriority::High,
            estimated_improvement_percent: 55.0,
            implementation_effort: FixEffort::Medium,
        },
        FixSuggestion {
            description: "Shorten critical sections by moving IO outside lock scope".to_string(),
            priority: FixPriority::High,
            estimated_improvement_percent: 30.0,
            implementation_effort: FixEffort::Low,
        },
    ];
    let impact = ImpactAssessment {
        performance_impact: ctx.bottleneck.impact_score,
        user_impact: 75.0,
        business_impact: 55.0,
        resource_impact: 20.0,
        affected_operations: vec![ctx.bottleneck.operation.clone()],
    };
    (evidence, fixes, impact)
}

fn gc_overhead_artifacts(ctx: &RuleContext) -> Artifacts {
    let gc = ctx.profile.metric_values(MetricType::GcTime);
    let memory = ctx.profile.metric_values(MetricType::MemoryUsage);
    if gc.is_empty() || memory.is_empty() {
        return (Vec::new(), Vec::new(), ImpactAssessment::default());
    }

    let evidence = vec![Evidence::new(
        EvidenceType::ResourceUtilization,
        "Collector pause time rises together with heap pressure",
        json!({
            "mean_gc_ms": statistics::mean(&gc),
            "mean_memory": statistics::mean(&memory),
        }),
        0.7,
    )];
    let fixes = vec![
        FixSuggestion {
            description: "Increase heap headroom or tune generation sizing".to_string(),
            priority: FixPriority::Medium,
            estimated_improvement_percent: 30.0,
            implementation_effort: FixEffort::Low,
        },
        FixSuggestion {
            description: "Reduce allocation rate in the hottest request paths".to_string(),
            priority: FixPriority::High,
            estimated_improvement_percent: 40.0,
            implementation_effort: FixEffort::Medium,
        },
    ];
    let impact = ImpactAssessment {
        performance_impact: ctx.bottleneck.impact_score,
        user_impact: 45.0,
        business_impact: 30.0,
        resource_impact: 60.0,
        affected_operations: vec![ctx.bottleneck.operation.clone()],
    };
    (evidence, fixes, impact)
}
