//! perf_analyzer: bottleneck detection and root-cause scoring engine
//!
//! Consumes [`PerformanceProfile`](detection::structs::PerformanceProfile)
//! records produced by an external collector and emits scored
//! [`PerformanceBottleneck`](detection::structs::PerformanceBottleneck)
//! findings and [`RootCause`](root_cause::structs::RootCause) inferences.
//! Reporting, persistence and profile collection live outside this crate.

pub mod config;
pub mod detection;
pub mod errors;
pub mod logging;
pub mod root_cause;
pub mod statistics;

pub use config::{AnalysisConfig, AnalysisTomlConfig};
pub use detection::structs::{
    BottleneckType, MetricCategory, MetricType, PerformanceBottleneck, PerformanceMetric,
    PerformanceProfile, ProfileSummary, Severity,
};
pub use detection::{BottleneckDetector, DetectorStats, MaintenanceReport, ProfileAnalysis};
pub use root_cause::structs::{
    Evidence, EvidenceType, FixSuggestion, ImpactAssessment, RootCause, RootCauseCategory,
};
pub use root_cause::{AnalyzerStats, RootCauseAnalyzer};
