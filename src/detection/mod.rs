//! Bottleneck detection orchestrator
//!
//! Owns the only mutable shared state of the engine (baseline tracker,
//! historical buffer, result cache) and runs the registered detection
//! algorithms over incoming profiles. Algorithms execute against an immutable
//! view of that state; baselines and history are updated exactly once per
//! analyzed profile, after every algorithm has run, so concurrent calls for
//! the same target cannot lose updates.

pub mod algorithms;
pub mod baseline;
pub mod history;
pub mod structs;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::detection::algorithms::{
    AnomalyDetection, CorrelationDetection, DetectionAlgorithm, DetectionContext,
    LockContentionDetection, ResourceStarvationDetection, StatisticalOutlierDetection,
    ThresholdDetection, TrendAnalysisDetection,
};
use crate::detection::baseline::BaselineTracker;
use crate::detection::history::{HistoricalProfile, HistoricalStore};
use crate::detection::structs::{PerformanceBottleneck, PerformanceProfile};

/// One registered detection algorithm with its runtime controls
struct AlgorithmEntry {
    id: &'static str,
    enabled: bool,
    max_confidence: f64,
    algorithm: Box<dyn DetectionAlgorithm>,
}

/// Diagnostics for a single algorithm execution within one analysis call
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmRun {
    pub algorithm_id: String,
    pub elapsed_ms: f64,
    /// Candidates produced before post-processing
    pub candidates: usize,
    /// Error message when the algorithm failed; it contributed nothing
    pub error: Option<String>,
}

/// Structured result of one `analyze_profile` call
#[derive(Debug, Clone)]
pub struct ProfileAnalysis {
    pub profile_id: String,
    pub bottlenecks: Vec<PerformanceBottleneck>,
    /// Per-algorithm diagnostics, empty when served from the result cache
    pub runs: Vec<AlgorithmRun>,
    pub from_cache: bool,
}

/// Aggregate counters exposed on the admin surface
#[derive(Debug, Clone, Serialize)]
pub struct DetectorStats {
    pub algorithm_count: usize,
    pub enabled_algorithms: usize,
    pub historical_profiles: usize,
    pub baseline_targets: usize,
    pub cached_results: usize,
    pub total_bottlenecks: u64,
}

/// Result of one maintenance sweep
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MaintenanceReport {
    pub trimmed_history: usize,
    pub evicted_baselines: usize,
    /// Cached results whose profile left the historical buffer
    pub pruned_results: usize,
}

struct DetectorState {
    baselines: BaselineTracker,
    history: HistoricalStore,
    result_cache: FxHashMap<String, Vec<PerformanceBottleneck>>,
    total_bottlenecks: u64,
}

/// Orchestrates the detection algorithm registry over incoming profiles
pub struct BottleneckDetector {
    config: AnalysisConfig,
    registry: Mutex<Vec<AlgorithmEntry>>,
    state: Mutex<DetectorState>,
}

impl BottleneckDetector {
    /// Build the detector with its fixed algorithm table.
    ///
    /// Feature flags decide the initial enabled state of the statistical,
    /// pattern-matching and correlation entries; everything can be toggled
    /// later through [`set_algorithm_enabled`](Self::set_algorithm_enabled).
    pub fn new(config: AnalysisConfig) -> Self {
        let registry: Vec<AlgorithmEntry> = vec![
            AlgorithmEntry {
                id: "threshold",
                enabled: true,
                max_confidence: 0.9,
                algorithm: Box::new(ThresholdDetection),
            },
            AlgorithmEntry {
                id: "statistical_outlier",
                enabled: config.enable_statistical_analysis,
                max_confidence: 0.95,
                algorithm: Box::new(StatisticalOutlierDetection),
            },
            AlgorithmEntry {
                id: "trend_analysis",
                enabled: config.enable_statistical_analysis,
                max_confidence: 0.85,
                algorithm: Box::new(TrendAnalysisDetection),
            },
            AlgorithmEntry {
                id: "lock_contention_pattern",
                enabled: config.enable_pattern_matching,
                max_confidence: 0.75,
                algorithm: Box::new(LockContentionDetection),
            },
            AlgorithmEntry {
                id: "resource_starvation_pattern",
                enabled: config.enable_pattern_matching,
                max_confidence: 0.85,
                algorithm: Box::new(ResourceStarvationDetection),
            },
            AlgorithmEntry {
                id: "correlation",
                enabled: config.enable_deep_analysis,
                max_confidence: 0.9,
                algorithm: Box::new(CorrelationDetection),
            },
            AlgorithmEntry {
                id: "anomaly_detection",
                enabled: true,
                max_confidence: 0.95,
                algorithm: Box::new(AnomalyDetection),
            },
        ];

        info!(algorithms = registry.len(), "Bottleneck detector initialized");

        Self {
            config,
            registry: Mutex::new(registry),
            state: Mutex::new(DetectorState {
                baselines: BaselineTracker::new(),
                history: HistoricalStore::new(),
                result_cache: FxHashMap::default(),
                total_bottlenecks: 0,
            }),
        }
    }

    /// Analyze one profile and return the filtered, deduplicated findings.
    ///
    /// Never fails: algorithm errors are isolated and logged, degenerate
    /// input yields an empty result.
    pub async fn analyze_profile(&self, profile: &PerformanceProfile) -> Vec<PerformanceBottleneck> {
        self.analyze_profile_detailed(profile).await.bottlenecks
    }

    /// Like [`analyze_profile`](Self::analyze_profile) but with per-algorithm
    /// run diagnostics attached.
    pub async fn analyze_profile_detailed(&self, profile: &PerformanceProfile) -> ProfileAnalysis {
        let registry = self.registry.lock().expect("detector registry poisoned");
        let mut state = self.state.lock().expect("detector state poisoned");

        if let Some(cached) = state.result_cache.get(&profile.id) {
            debug!(profile_id = %profile.id, "Serving analysis from result cache");
            return ProfileAnalysis {
                profile_id: profile.id.clone(),
                bottlenecks: cached.clone(),
                runs: Vec::new(),
                from_cache: true,
            };
        }

        let mut candidates: Vec<PerformanceBottleneck> = Vec::new();
        let mut runs: Vec<AlgorithmRun> = Vec::new();

        for entry in registry.iter().filter(|e| e.enabled) {
            let ctx = DetectionContext {
                config: &self.config,
                baselines: &state.baselines,
                history: &state.history,
            };

            let started = Instant::now();
            match entry.algorithm.evaluate(profile, &ctx) {
                Ok(mut findings) => {
                    for finding in &mut findings {
                        finding.confidence = finding.confidence.min(entry.max_confidence);
                        finding
                            .context
                            .insert("detection_algorithm".to_string(), json!(entry.id));
                    }
                    runs.push(AlgorithmRun {
                        algorithm_id: entry.id.to_string(),
                        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                        candidates: findings.len(),
                        error: None,
                    });
                    candidates.extend(findings);
                }
                Err(e) => {
                    warn!(algorithm = entry.id, error = %e, "Detection algorithm failed, skipping");
                    runs.push(AlgorithmRun {
                        algorithm_id: entry.id.to_string(),
                        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                        candidates: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        // Dedup by (type, component): first-seen wins, later duplicates are
        // dropped rather than merged.
        let mut seen: FxHashMap<String, ()> = FxHashMap::default();
        let mut bottlenecks: Vec<PerformanceBottleneck> = Vec::new();
        for finding in candidates {
            let key = finding.dedup_key();
            if seen.insert(key.clone(), ()).is_none() {
                bottlenecks.push(finding);
            } else {
                debug!(dedup_key = %key, "Dropping duplicate finding");
            }
        }

        bottlenecks.retain(|b| b.confidence >= self.config.confidence_threshold);

        // Single mutation point per analyzed profile
        state.result_cache.insert(profile.id.clone(), bottlenecks.clone());
        state.baselines.observe(profile);
        state.history.append(HistoricalProfile::from_profile(profile));
        state.total_bottlenecks += bottlenecks.len() as u64;

        info!(
            profile_id = %profile.id,
            target = %profile.target_id,
            findings = bottlenecks.len(),
            "Profile analysis complete"
        );

        ProfileAnalysis {
            profile_id: profile.id.clone(),
            bottlenecks,
            runs,
            from_cache: false,
        }
    }

    /// Enable or disable a registered algorithm by id. Returns false when
    /// the id is unknown.
    pub fn set_algorithm_enabled(&self, id: &str, enabled: bool) -> bool {
        let mut registry = self.registry.lock().expect("detector registry poisoned");
        match registry.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.enabled = enabled;
                info!(algorithm = id, enabled, "Algorithm toggled");
                true
            }
            None => false,
        }
    }

    /// Aggregate counters for the admin surface
    pub fn statistics(&self) -> DetectorStats {
        let registry = self.registry.lock().expect("detector registry poisoned");
        let state = self.state.lock().expect("detector state poisoned");
        DetectorStats {
            algorithm_count: registry.len(),
            enabled_algorithms: registry.iter().filter(|e| e.enabled).count(),
            historical_profiles: state.history.len(),
            baseline_targets: state.baselines.len(),
            cached_results: state.result_cache.len(),
            total_bottlenecks: state.total_bottlenecks,
        }
    }

    /// Trim the historical buffer and evict stale baselines.
    ///
    /// Invoked by the background sweep; callable directly as well.
    pub fn run_maintenance(&self) -> MaintenanceReport {
        let mut state = self.state.lock().expect("detector state poisoned");
        let state = &mut *state;
        let now = chrono::Utc::now().timestamp_millis();

        let trimmed_history = state.history.sweep();
        let evicted_baselines = state.baselines.evict_stale(now);

        // The result cache follows the historical buffer: entries whose
        // profile was trimmed are no longer served.
        let pruned_results = if trimmed_history > 0 {
            let live: FxHashSet<&str> =
                state.history.iter().map(|e| e.profile_id.as_str()).collect();
            let before = state.result_cache.len();
            state.result_cache.retain(|profile_id, _| live.contains(profile_id.as_str()));
            before - state.result_cache.len()
        } else {
            0
        };

        let report = MaintenanceReport { trimmed_history, evicted_baselines, pruned_results };
        if report.trimmed_history > 0 || report.evicted_baselines > 0 || report.pruned_results > 0 {
            info!(
                trimmed = report.trimmed_history,
                evicted = report.evicted_baselines,
                pruned = report.pruned_results,
                "Maintenance sweep complete"
            );
        }
        report
    }

    /// Spawn the periodic maintenance sweep on the tokio runtime.
    ///
    /// The task runs until the detector is dropped by all holders; a single
    /// task means the sweep never overlaps itself.
    pub fn spawn_maintenance(detector: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick fires immediately; skip it so the sweep runs on the period
            ticker.tick().await;
            loop {
                ticker.tick().await;
                detector.run_maintenance();
            }
        })
    }

    /// Clear all mutable state: baselines, history, cached results, counters.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().expect("detector state poisoned");
        state.baselines.clear();
        state.history.clear();
        state.result_cache.clear();
        state.total_bottlenecks = 0;
        info!("Bottleneck detector shut down, state cleared");
    }
}
