//! Root-cause inference over detected bottlenecks
//!
//! Three independent passes contribute causes for one bottleneck: the rule
//! table, the known-pattern database and a historical-regression comparison.
//! Rule failures are isolated the same way detection algorithm failures are:
//! logged, skipped, never propagated.

pub mod patterns;
pub mod rules;
pub mod structs;

use std::collections::VecDeque;
use std::sync::Mutex;

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::detection::structs::{PerformanceBottleneck, PerformanceProfile};
use crate::root_cause::rules::{default_rules, AnalysisRule, RuleCondition, RuleContext};
use crate::root_cause::structs::{
    AnalysisRecord, Evidence, EvidenceType, FixEffort, FixPriority, FixSuggestion, RootCause,
    RootCauseCategory,
};

/// Analyses considered by the historical-regression pass
const REGRESSION_LOOKBACK: usize = 10;

/// Regression threshold: score more than this far below the historical mean
const REGRESSION_DROP_PERCENT: f64 = 20.0;

/// Aggregate counters exposed on the admin surface
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzerStats {
    pub rule_count: usize,
    pub enabled_rules: usize,
    pub pattern_count: usize,
    pub analyzed_bottlenecks: usize,
    pub tracked_targets: usize,
    pub total_root_causes: u64,
}

struct AnalyzerState {
    /// Root causes per analyzed bottleneck id
    results: FxHashMap<String, Vec<RootCause>>,
    /// Per-target ring of past analysis records
    history: FxHashMap<String, VecDeque<AnalysisRecord>>,
    total_root_causes: u64,
}

/// Evaluates the rule table, pattern database and regression pass for one
/// bottleneck at a time
pub struct RootCauseAnalyzer {
    config: AnalysisConfig,
    rules: Mutex<Vec<AnalysisRule>>,
    state: Mutex<AnalyzerState>,
}

impl RootCauseAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let rules = default_rules();
        info!(rules = rules.len(), "Root cause analyzer initialized");
        Self {
            config,
            rules: Mutex::new(rules),
            state: Mutex::new(AnalyzerState {
                results: FxHashMap::default(),
                history: FxHashMap::default(),
                total_root_causes: 0,
            }),
        }
    }

    fn target_key(profile: &PerformanceProfile) -> String {
        format!("{}_{}", profile.target_type, profile.target_id)
    }

    /// Infer root causes for one bottleneck.
    ///
    /// Never fails: a rule that errors contributes nothing, degenerate input
    /// yields an empty result.
    pub async fn analyze_bottleneck(
        &self,
        bottleneck: &PerformanceBottleneck,
        profile: &PerformanceProfile,
    ) -> Vec<RootCause> {
        let rules = self.rules.lock().expect("analyzer rules poisoned");
        let mut state = self.state.lock().expect("analyzer state poisoned");

        let target_key = Self::target_key(profile);
        let historical_scores: Vec<f64> = state
            .history
            .get(&target_key)
            .map(|records| {
                records
                    .iter()
                    .rev()
                    .take(REGRESSION_LOOKBACK)
                    .rev()
                    .map(|r| r.performance_score)
                    .collect()
            })
            .unwrap_or_default();

        let ctx = RuleContext {
            bottleneck,
            profile,
            historical_scores: &historical_scores,
        };

        let mut root_causes: Vec<RootCause> = Vec::new();

        // Pass 1: the rule table
        for rule in rules.iter().filter(|r| r.enabled) {
            if !rule.matches(&ctx) {
                continue;
            }
            match rule.generate(&ctx) {
                Ok(rc) => {
                    debug!(rule = rule.id, confidence = rc.confidence, "Rule matched");
                    root_causes.push(rc);
                }
                Err(e) => {
                    warn!(rule = rule.id, error = %e, "Rule generation failed, skipping");
                }
            }
        }

        // Pass 2: the known-pattern database
        if self.config.enable_pattern_matching {
            root_causes.extend(patterns::match_patterns(bottleneck));
        }

        // Pass 3: historical regression of the target's performance score
        if let Some(rc) = self.regression_root_cause(&ctx) {
            root_causes.push(rc);
        }

        // One filter over all three passes: nothing below the threshold
        // reaches the caller or the stored results.
        root_causes.retain(|rc| rc.confidence >= self.config.confidence_threshold);

        // Record the analysis before releasing the lock
        let record = AnalysisRecord {
            timestamp: chrono::Utc::now().timestamp_millis(),
            profile_id: profile.id.clone(),
            bottleneck_id: bottleneck.id.clone(),
            performance_score: profile.summary.performance_score,
            root_cause_count: root_causes.len(),
            top_root_cause_category: root_causes
                .iter()
                .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
                .map(|rc| rc.category),
        };
        let window = self.config.historical_analysis_window;
        let mut evicted_bottlenecks: Vec<String> = Vec::new();
        {
            let target_history = state.history.entry(target_key).or_default();
            target_history.push_back(record);
            while target_history.len() > window {
                if let Some(old) = target_history.pop_front() {
                    evicted_bottlenecks.push(old.bottleneck_id);
                }
            }
        }
        // Stored results follow the history window so neither grows unbounded
        for bottleneck_id in evicted_bottlenecks {
            state.results.remove(&bottleneck_id);
        }

        state.results.insert(bottleneck.id.clone(), root_causes.clone());
        state.total_root_causes += root_causes.len() as u64;

        info!(
            bottleneck_id = %bottleneck.id,
            root_causes = root_causes.len(),
            "Bottleneck analysis complete"
        );

        root_causes
    }

    /// Build the regression root cause when the target's score dropped more
    /// than 20% below the mean of its recent analyses.
    fn regression_root_cause(&self, ctx: &RuleContext) -> Option<RootCause> {
        let condition = RuleCondition::HistoricalRegression {
            min_drop_percent: REGRESSION_DROP_PERCENT,
        };
        if !condition.evaluate(ctx) {
            return None;
        }

        let historical_mean = crate::statistics::mean(ctx.historical_scores);
        let current = ctx.profile.summary.performance_score;
        let mut rc = RootCause::new(
            RootCauseCategory::CodeInefficiency,
            "Performance score regressed against the target's recent history",
            0.8,
        );
        rc.evidence.push(Evidence::new(
            EvidenceType::TimingAnalysis,
            "Current score sits well below the rolling mean",
            json!({
                "historical_mean": historical_mean,
                "current_score": current,
                "analyses_considered": ctx.historical_scores.len(),
            }),
            0.8,
        ));
        rc.fix_suggestions.push(FixSuggestion {
            description: "Bisect recent deployments against the profiled workload".to_string(),
            priority: FixPriority::High,
            estimated_improvement_percent: 0.0,
            implementation_effort: FixEffort::Low,
        });
        rc.impact_assessment.performance_impact =
            ((historical_mean - current) / historical_mean * 100.0).clamp(0.0, 100.0);
        rc.impact_assessment.affected_operations = vec![ctx.bottleneck.operation.clone()];
        Some(rc)
    }

    /// Enable or disable a rule by id. Returns false when the id is unknown.
    pub fn set_rule_enabled(&self, id: &str, enabled: bool) -> bool {
        let mut rules = self.rules.lock().expect("analyzer rules poisoned");
        match rules.iter_mut().find(|r| r.id == id) {
            Some(rule) => {
                rule.enabled = enabled;
                info!(rule = id, enabled, "Rule toggled");
                true
            }
            None => false,
        }
    }

    /// Root causes stored for a previously analyzed bottleneck
    pub fn results_for(&self, bottleneck_id: &str) -> Option<Vec<RootCause>> {
        let state = self.state.lock().expect("analyzer state poisoned");
        state.results.get(bottleneck_id).cloned()
    }

    /// Aggregate counters for the admin surface
    pub fn statistics(&self) -> AnalyzerStats {
        let rules = self.rules.lock().expect("analyzer rules poisoned");
        let state = self.state.lock().expect("analyzer state poisoned");
        AnalyzerStats {
            rule_count: rules.len(),
            enabled_rules: rules.iter().filter(|r| r.enabled).count(),
            pattern_count: patterns::known_patterns().len(),
            analyzed_bottlenecks: state.results.len(),
            tracked_targets: state.history.len(),
            total_root_causes: state.total_root_causes,
        }
    }

    /// Clear all stored results and per-target history.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().expect("analyzer state poisoned");
        state.results.clear();
        state.history.clear();
        state.total_root_causes = 0;
        info!("Root cause analyzer shut down, state cleared");
    }
}
