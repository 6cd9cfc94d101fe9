use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::detection::structs::TimestampMS;

/// Classification of an inferred root cause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCauseCategory {
    CodeInefficiency,
    ResourceContention,
    ConfigurationError,
    ArchitecturalIssue,
    DataIssue,
    ExternalDependency,
    InfrastructureLimit,
}

/// Kind of supporting evidence attached to a root cause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    MetricCorrelation,
    StackTrace,
    QueryPlan,
    ResourceUtilization,
    TimingAnalysis,
    PatternMatching,
}

/// A single piece of supporting evidence; immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub evidence_type: EvidenceType,
    pub description: String,
    /// Raw numeric payload backing the description
    pub data: Value,
    /// How strongly this evidence supports the root cause, in [0,1]
    pub strength: f64,
    pub timestamp: TimestampMS,
}

impl Evidence {
    pub fn new(evidence_type: EvidenceType, description: &str, data: Value, strength: f64) -> Self {
        Self {
            evidence_type,
            description: description.to_string(),
            data,
            strength: strength.clamp(0.0, 1.0),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Relative urgency of applying a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Expected engineering effort of a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixEffort {
    Low,
    Medium,
    High,
}

/// One actionable remediation suggestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub description: String,
    pub priority: FixPriority,
    /// Expected improvement of the affected metric, percent
    pub estimated_improvement_percent: f64,
    pub implementation_effort: FixEffort,
}

/// Four-axis 0-100 impact breakdown plus the operations it touches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactAssessment {
    pub performance_impact: f64,
    pub user_impact: f64,
    pub business_impact: f64,
    pub resource_impact: f64,
    pub affected_operations: Vec<String>,
}

/// An inferred root cause for one bottleneck, with supporting evidence and
/// remediation suggestions. Attached to exactly one bottleneck's result set
/// per analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootCause {
    pub id: String,
    pub category: RootCauseCategory,
    pub description: String,
    /// Inference confidence in [0,1]
    pub confidence: f64,
    pub evidence: Vec<Evidence>,
    pub fix_suggestions: Vec<FixSuggestion>,
    pub impact_assessment: ImpactAssessment,
}

static ROOT_CAUSE_SEQ: AtomicU64 = AtomicU64::new(0);

impl RootCause {
    pub fn new(category: RootCauseCategory, description: &str, confidence: f64) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let seq = ROOT_CAUSE_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("rc_{}_{}", now, seq),
            category,
            description: description.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            evidence: Vec::new(),
            fix_suggestions: Vec::new(),
            impact_assessment: ImpactAssessment::default(),
        }
    }
}

/// Compact per-analysis record kept in the per-target history buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub timestamp: TimestampMS,
    pub profile_id: String,
    pub bottleneck_id: String,
    pub performance_score: f64,
    pub root_cause_count: usize,
    pub top_root_cause_category: Option<RootCauseCategory>,
}
