//! Static engine configuration, read once at construction
//!
//! Mirrors the teacher pattern of a strongly-typed runtime config plus a
//! TOML-compatible override struct whose optional fields are merged over the
//! defaults.

use serde::Deserialize;
use tracing::info;

/// Thresholds, window sizes and feature flags for the analysis engine
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Mean CPU usage (percent) above which the CPU threshold algorithm fires
    pub cpu_usage_threshold: f64,
    /// Mean memory usage (percent) above which the memory algorithm fires
    pub memory_usage_threshold: f64,
    /// Mean response time (ms) used by the lock-contention heuristic
    pub response_time_threshold: f64,
    /// Mean IO latency (ms) above which the IO threshold algorithm fires
    pub io_latency_threshold: f64,
    /// Mean network latency (ms) above which the network algorithm fires
    pub network_latency_threshold: f64,
    /// Historical profiles required before statistical-outlier scoring runs
    pub min_sample_size: usize,
    /// Window of historical profiles used by the trend algorithm
    pub analysis_window_size: usize,
    /// Findings below this confidence are dropped before results are returned
    pub confidence_threshold: f64,
    /// Per-target analysis records kept by the root-cause analyzer
    pub historical_analysis_window: usize,
    pub enable_statistical_analysis: bool,
    pub enable_pattern_matching: bool,
    pub enable_deep_analysis: bool,
    pub enable_machine_learning: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cpu_usage_threshold: 80.0,
            memory_usage_threshold: 85.0,
            response_time_threshold: 1000.0,
            io_latency_threshold: 100.0,
            network_latency_threshold: 200.0,
            min_sample_size: 10,
            analysis_window_size: 10,
            confidence_threshold: 0.7,
            historical_analysis_window: 100,
            enable_statistical_analysis: true,
            enable_pattern_matching: true,
            enable_deep_analysis: true,
            enable_machine_learning: false,
        }
    }
}

/// TOML-compatible configuration section (`[analysis]`), all fields optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisTomlConfig {
    pub cpu_usage_threshold: Option<f64>,
    pub memory_usage_threshold: Option<f64>,
    pub response_time_threshold: Option<f64>,
    pub io_latency_threshold: Option<f64>,
    pub network_latency_threshold: Option<f64>,
    pub min_sample_size: Option<usize>,
    pub analysis_window_size: Option<usize>,
    pub confidence_threshold: Option<f64>,
    pub historical_analysis_window: Option<usize>,
    pub enable_statistical_analysis: Option<bool>,
    pub enable_pattern_matching: Option<bool>,
    pub enable_deep_analysis: Option<bool>,
    pub enable_machine_learning: Option<bool>,
}

impl AnalysisConfig {
    /// Apply optional TOML overrides on top of the defaults
    pub fn from_toml(overrides: AnalysisTomlConfig) -> Self {
        let defaults = Self::default();
        let config = Self {
            cpu_usage_threshold: overrides.cpu_usage_threshold.unwrap_or(defaults.cpu_usage_threshold),
            memory_usage_threshold: overrides.memory_usage_threshold.unwrap_or(defaults.memory_usage_threshold),
            response_time_threshold: overrides.response_time_threshold.unwrap_or(defaults.response_time_threshold),
            io_latency_threshold: overrides.io_latency_threshold.unwrap_or(defaults.io_latency_threshold),
            network_latency_threshold: overrides.network_latency_threshold.unwrap_or(defaults.network_latency_threshold),
            min_sample_size: overrides.min_sample_size.unwrap_or(defaults.min_sample_size),
            analysis_window_size: overrides.analysis_window_size.unwrap_or(defaults.analysis_window_size),
            confidence_threshold: overrides.confidence_threshold.unwrap_or(defaults.confidence_threshold),
            historical_analysis_window: overrides.historical_analysis_window.unwrap_or(defaults.historical_analysis_window),
            enable_statistical_analysis: overrides.enable_statistical_analysis.unwrap_or(defaults.enable_statistical_analysis),
            enable_pattern_matching: overrides.enable_pattern_matching.unwrap_or(defaults.enable_pattern_matching),
            enable_deep_analysis: overrides.enable_deep_analysis.unwrap_or(defaults.enable_deep_analysis),
            enable_machine_learning: overrides.enable_machine_learning.unwrap_or(defaults.enable_machine_learning),
        };
        info!(
            confidence_threshold = config.confidence_threshold,
            min_sample_size = config.min_sample_size,
            "Analysis configuration resolved"
        );
        config
    }

    /// Load configuration from a TOML file with an `[analysis]` section.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load_from_file(path: &str) -> Result<Self, crate::errors::ConfigError> {
        if !std::path::Path::new(path).exists() {
            info!("Config file {} not found, using defaults", path);
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let parsed: TomlConfig = toml::from_str(&raw)?;
        Ok(Self::from_toml(parsed.analysis.unwrap_or_default()))
    }
}

/// Top-level TOML file structure
#[derive(Debug, Clone, Deserialize)]
struct TomlConfig {
    analysis: Option<AnalysisTomlConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.cpu_usage_threshold, 80.0);
        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.min_sample_size, 10);
        assert!(config.enable_statistical_analysis);
        assert!(!config.enable_machine_learning);
    }

    #[test]
    fn test_toml_overrides_merge_over_defaults() {
        let overrides = AnalysisTomlConfig {
            cpu_usage_threshold: Some(70.0),
            confidence_threshold: Some(0.5),
            ..Default::default()
        };
        let config = AnalysisConfig::from_toml(overrides);
        assert_eq!(config.cpu_usage_threshold, 70.0);
        assert_eq!(config.confidence_threshold, 0.5);
        // Untouched fields keep defaults
        assert_eq!(config.memory_usage_threshold, 85.0);
        assert_eq!(config.analysis_window_size, 10);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[analysis]\ncpu_usage_threshold = 60.0\nenable_machine_learning = true\n",
        )
        .unwrap();

        let config = AnalysisConfig::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.cpu_usage_threshold, 60.0);
        assert!(config.enable_machine_learning);
        assert_eq!(config.io_latency_threshold, 100.0);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AnalysisConfig::load_from_file("/nonexistent/config.toml").unwrap();
        assert_eq!(config.cpu_usage_threshold, 80.0);
    }
}
