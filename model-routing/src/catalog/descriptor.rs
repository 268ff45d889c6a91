//! Catalog entries

use super::reliability::{ReliabilityState, ReliabilityTransition};
use super::rules::{self, ClassificationRules, LevelSource};
use crate::config::BackendEntry;
use crate::types::{ModelLevel, TaskType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// A backend as the router sees it: static capabilities plus live reliability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub level: ModelLevel,
    pub level_source: LevelSource,
    /// USD per token; 0.0 for free backends
    pub cost_per_token: f64,
    pub context_window: u32,
    pub max_output_tokens: u32,
    pub specializations: BTreeSet<TaskType>,
    pub description: String,
    pub supports_images: bool,
    pub is_custom: bool,
    #[serde(flatten)]
    pub reliability: ReliabilityState,
}

impl BackendDescriptor {
    pub fn from_entry(entry: &BackendEntry, rules: &ClassificationRules) -> Self {
        let assignment = rules.classify_level(entry);
        Self {
            name: entry.model_name.clone(),
            aliases: entry.aliases.clone(),
            level: assignment.level,
            level_source: assignment.source,
            cost_per_token: rules::estimate_cost(entry),
            context_window: entry.context_window,
            max_output_tokens: entry.max_output_tokens,
            specializations: rules::infer_specializations(entry),
            description: entry.description.clone(),
            supports_images: entry.supports_images,
            is_custom: entry.is_custom,
            reliability: ReliabilityState::default(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.reliability.is_available
    }

    pub fn success_rate(&self) -> f64 {
        self.reliability.success_rate
    }

    pub fn error_count(&self) -> u32 {
        self.reliability.error_count
    }

    pub fn is_free(&self) -> bool {
        self.cost_per_token == 0.0
    }

    /// 0 for free backends, 1 otherwise.
    pub fn cost_priority(&self) -> u8 {
        u8::from(!self.is_free())
    }

    pub fn specializes_in(&self, task_type: TaskType) -> bool {
        self.specializations.contains(&task_type)
    }

    pub fn record_outcome(&mut self, success: bool, error: Option<&str>) -> ReliabilityTransition {
        self.reliability.record(success, error)
    }
}

/// Cheapest first, then most reliable, then fewest net errors, then name.
pub fn reliability_order(a: &BackendDescriptor, b: &BackendDescriptor) -> Ordering {
    a.cost_priority()
        .cmp(&b.cost_priority())
        .then_with(|| {
            (1.0 - a.success_rate())
                .partial_cmp(&(1.0 - b.success_rate()))
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.error_count().cmp(&b.error_count()))
        .then_with(|| a.name.cmp(&b.name))
}
