use thiserror::Error;

/// Failure inside a single detection algorithm.
///
/// Caught at the per-algorithm boundary by the orchestrator: logged, surfaced
/// in the run diagnostics, never propagated to the caller.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("invalid metric data: {0}")]
    InvalidMetricData(String),
    #[error("baseline unavailable for target: {0}")]
    BaselineUnavailable(String),
    #[error("algorithm failure: {0}")]
    AlgorithmFailure(String),
}

/// Failure inside a single root-cause rule or generator.
///
/// Same isolation contract as [`DetectionError`]: the failing rule
/// contributes nothing and remaining rules still run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("rule evaluation failure: {0}")]
    RuleFailure(String),
    #[error("evidence generation failure: {0}")]
    EvidenceGeneration(String),
    #[error("unknown rule domain: {0}")]
    UnknownDomain(String),
}

/// Configuration loading failure
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
