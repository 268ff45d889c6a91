//! Routing decisions

use crate::catalog::BackendDescriptor;
use crate::types::{ComplexityLevel, ModelLevel, TaskType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of alternates carried by a decision.
pub const MAX_FALLBACKS: usize = 4;

/// Token estimate floor used for cost estimation.
const MIN_ESTIMATED_TOKENS: usize = 10;

/// The backend chosen for one request plus ordered alternates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub decision_id: Uuid,
    pub backend: BackendDescriptor,
    /// Next-best candidates, best first
    pub fallback_backends: Vec<BackendDescriptor>,
    /// Classifier confidence, 0.0 - 1.0
    pub confidence: f64,
    pub reasoning: String,
    /// Approximate USD cost of the prompt alone
    pub estimated_cost: f64,
    pub task_type: TaskType,
    pub complexity: ComplexityLevel,
    pub required_level: ModelLevel,
    pub decided_at: DateTime<Utc>,
}

impl RoutingDecision {
    /// Names of the primary backend followed by the fallbacks.
    pub fn backend_chain(&self) -> Vec<&str> {
        std::iter::once(self.backend.name.as_str())
            .chain(self.fallback_backends.iter().map(|b| b.name.as_str()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn for_test(backend: &str) -> Self {
        use crate::catalog::ClassificationRules;
        use crate::config::BackendEntry;

        Self {
            decision_id: Uuid::new_v4(),
            backend: BackendDescriptor::from_entry(
                &BackendEntry::new(backend),
                &ClassificationRules::default(),
            ),
            fallback_backends: Vec::new(),
            confidence: 0.5,
            reasoning: String::new(),
            estimated_cost: 0.0,
            task_type: TaskType::General,
            complexity: ComplexityLevel::Simple,
            required_level: ModelLevel::Free,
            decided_at: Utc::now(),
        }
    }
}

/// `max(chars / 4, 10) × cost_per_token`
pub fn estimate_cost(prompt: &str, backend: &BackendDescriptor) -> f64 {
    let tokens = (prompt.chars().count() / 4).max(MIN_ESTIMATED_TOKENS);
    tokens as f64 * backend.cost_per_token
}

/// Inputs to [`compose_reasoning`].
#[derive(Debug, Clone, Copy)]
pub struct ReasoningInputs<'a> {
    pub backend: &'a BackendDescriptor,
    pub task_type: TaskType,
    pub complexity: ComplexityLevel,
    pub required_level: ModelLevel,
    /// Caller asked for free backends and config allows it
    pub free_preference: bool,
}

/// Human-readable explanation; every applicable clause, joined with `"; "`.
pub fn compose_reasoning(inputs: ReasoningInputs<'_>) -> String {
    let backend = inputs.backend;
    let mut parts = Vec::new();

    if backend.is_free() {
        parts.push("Selected free backend (no per-token cost)".to_string());
    }

    if backend.specializes_in(inputs.task_type) {
        parts.push(format!("Specialized for {} tasks", inputs.task_type));
    }

    if backend.level >= inputs.required_level {
        parts.push(format!(
            "{} level fits {} complexity (requires {})",
            backend.level, inputs.complexity, inputs.required_level
        ));
    } else {
        parts.push(format!(
            "Fallback below required {} level for {} complexity",
            inputs.required_level, inputs.complexity
        ));
    }

    if backend.success_rate() < 1.0 {
        parts.push(format!(
            "Success rate {:.0}%",
            backend.success_rate() * 100.0
        ));
    }

    if inputs.free_preference && backend.is_free() {
        parts.push("Free backend preference applied".to_string());
    }

    parts.join("; ")
}
