//! Task classification
//!
//! Turns free text plus optional [`TaskContext`] into a complexity level, a
//! confidence and a task type.
//!
//! # Scoring
//!
//! ```text
//! indicators ──► weighted average ──► + task-type adjustment ──► bucket
//!                      │
//!                      └──► confidence = min(n/10, 1) (+0.2 if |avg| > 0.5)
//! ```

pub mod indicators;
pub mod task_type;

pub use indicators::ComplexityIndicator;

use crate::context::TaskContext;
use crate::error::RoutingResult;
use crate::types::{ComplexityLevel, TaskType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Seam between the engine and whatever classifies prompts.
///
/// The built-in implementation is [`TaskClassifier`]; errors returned here are
/// propagated by `RoutingEngine::select` without substitution.
#[cfg_attr(test, mockall::automock)]
pub trait TaskAnalyzer: Send + Sync {
    fn analyze<'a>(
        &self,
        prompt: &str,
        context: Option<&'a TaskContext>,
    ) -> RoutingResult<TaskAnalysis>;
}

/// Full classification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAnalysis {
    pub complexity: ComplexityLevel,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub task_type: TaskType,
    /// Weighted indicator average before the task-type adjustment
    pub weighted_score: f64,
    /// Score that was bucketed into `complexity`
    pub complexity_score: f64,
    pub indicators: Vec<ComplexityIndicator>,
    pub task_scores: BTreeMap<TaskType, f64>,
}

impl TaskAnalysis {
    /// `(complexity, confidence, task_type)`
    pub fn as_tuple(&self) -> (ComplexityLevel, f64, TaskType) {
        (self.complexity, self.confidence, self.task_type)
    }

    /// Compact summary for logging
    pub fn summary(&self) -> String {
        format!(
            "complexity={} score={:.3} confidence={:.2} type={} indicators={}",
            self.complexity,
            self.complexity_score,
            self.confidence,
            self.task_type,
            self.indicators.len()
        )
    }
}

/// Heuristic prompt classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskClassifier;

impl TaskClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a prompt. Never fails, including for the empty string.
    pub fn analyze(&self, prompt: &str, context: Option<&TaskContext>) -> TaskAnalysis {
        let lowered = prompt.to_lowercase();

        let mut indicators = indicators::lexical_indicators(prompt, &lowered);
        indicators.extend(indicators::length_indicator(prompt));
        indicators.extend(indicators::code_density_indicator(prompt));
        if let Some(ctx) = context {
            indicators.extend(indicators::context_indicators(ctx));
        }

        let weighted_score = weighted_average(&indicators);

        let task_scores = task_type::score_task_types(&lowered, context);
        let task_type = task_type::select_task_type(&task_scores);

        let complexity_score = weighted_score + task_type::complexity_adjustment(task_type);
        let complexity = ComplexityLevel::from_score(complexity_score);

        let mut confidence = (indicators.len() as f64 / 10.0).min(1.0);
        if weighted_score.abs() > 0.5 {
            confidence = (confidence + 0.2).min(1.0);
        }

        let analysis = TaskAnalysis {
            complexity,
            confidence,
            task_type,
            weighted_score,
            complexity_score,
            indicators,
            task_scores,
        };
        tracing::debug!(analysis = %analysis.summary(), "classified task");
        analysis
    }
}

impl TaskAnalyzer for TaskClassifier {
    fn analyze(&self, prompt: &str, context: Option<&TaskContext>) -> RoutingResult<TaskAnalysis> {
        Ok(TaskClassifier::analyze(self, prompt, context))
    }
}

/// `Σ(score·weight) / Σ(weight)`; zero when nothing was emitted.
fn weighted_average(indicators: &[ComplexityIndicator]) -> f64 {
    let total_weight: f64 = indicators.iter().map(|i| i.weight).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    indicators.iter().map(|i| i.score * i.weight).sum::<f64>() / total_weight
}
