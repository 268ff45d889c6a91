//! Backend catalog
//!
//! Owns every [`BackendDescriptor`], grouped by [`ModelLevel`], and is the only
//! place descriptors are mutated (through [`BackendCatalog::record`]).

pub mod descriptor;
pub mod reliability;
pub mod rules;

pub use descriptor::{reliability_order, BackendDescriptor};
pub use reliability::{ReliabilityState, ReliabilityTransition, AUTO_DISABLE_ERROR_COUNT};
pub use rules::{ClassificationRules, LevelSource};

use crate::config::{BackendListConfig, RoutingConfig};
use crate::types::ModelLevel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Maximum number of entries in [`CatalogStats::top_performers`].
pub const TOP_PERFORMERS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct BackendCatalog {
    backends: Vec<BackendDescriptor>,
    /// Lower-cased name and aliases -> index into `backends`
    lookup: HashMap<String, usize>,
}

impl BackendCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the catalog from both config documents.
    ///
    /// Duplicate names keep the first entry. An alias that collides with an
    /// earlier name or alias is ignored.
    pub fn from_config(routing: &RoutingConfig, list: &BackendListConfig) -> Self {
        let rules = ClassificationRules::from_config(routing);
        let mut catalog = Self::new();

        for entry in &list.models {
            let key = entry.model_name.to_lowercase();
            if key.trim().is_empty() {
                tracing::warn!("Skipping backend entry with an empty model_name");
                continue;
            }
            if catalog.backends.iter().any(|b| b.name.to_lowercase() == key) {
                tracing::warn!(
                    backend = %entry.model_name,
                    "Duplicate backend in backend list, keeping the first entry"
                );
                continue;
            }
            catalog.insert(BackendDescriptor::from_entry(entry, &rules));
        }

        tracing::info!(
            backends = catalog.len(),
            levels = catalog.all_levels().len(),
            "Backend catalog built"
        );
        catalog
    }

    fn insert(&mut self, descriptor: BackendDescriptor) {
        let idx = self.backends.len();
        tracing::debug!(
            backend = %descriptor.name,
            level = %descriptor.level,
            source = ?descriptor.level_source,
            cost_per_token = descriptor.cost_per_token,
            "Registered backend"
        );

        self.lookup.insert(descriptor.name.to_lowercase(), idx);
        for alias in &descriptor.aliases {
            let alias_key = alias.to_lowercase();
            if self.lookup.contains_key(&alias_key) {
                tracing::warn!(
                    backend = %descriptor.name,
                    alias = %alias,
                    "Alias already taken, ignoring"
                );
                continue;
            }
            self.lookup.insert(alias_key, idx);
        }
        self.backends.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.backends.iter()
    }

    /// Look up by name or alias, ignoring case.
    pub fn by_name(&self, name: &str) -> Option<&BackendDescriptor> {
        self.lookup
            .get(&name.to_lowercase())
            .map(|&idx| &self.backends[idx])
    }

    /// Every backend at `level` in catalog order, available or not.
    pub fn by_level(&self, level: ModelLevel) -> Vec<&BackendDescriptor> {
        self.iter().filter(|b| b.level == level).collect()
    }

    /// Every backend at `level`, ranked by [`reliability_order`].
    pub fn candidates(&self, level: ModelLevel) -> Vec<&BackendDescriptor> {
        let mut ranked = self.by_level(level);
        ranked.sort_by(|a, b| reliability_order(a, b));
        ranked
    }

    /// Levels holding at least one backend, ascending.
    pub fn all_levels(&self) -> Vec<ModelLevel> {
        ModelLevel::ALL
            .into_iter()
            .filter(|level| self.backends.iter().any(|b| b.level == *level))
            .collect()
    }

    /// Record a request outcome. Returns `false` for unknown backends.
    pub fn record(&mut self, name: &str, success: bool, error: Option<&str>) -> bool {
        let Some(&idx) = self.lookup.get(&name.to_lowercase()) else {
            tracing::debug!(backend = %name, "Ignoring outcome for unknown backend");
            return false;
        };

        let backend = &mut self.backends[idx];
        let transition = backend.record_outcome(success, error);
        if transition == ReliabilityTransition::Disabled {
            tracing::warn!(
                backend = %backend.name,
                error_count = backend.error_count(),
                last_error = backend.reliability.last_error.as_deref().unwrap_or(""),
                "Backend disabled after repeated failures"
            );
        } else {
            tracing::debug!(
                backend = %backend.name,
                success,
                success_rate = backend.success_rate(),
                error_count = backend.error_count(),
                "Recorded backend outcome"
            );
        }
        true
    }

    /// Aggregate view of the catalog, annotated with level policies.
    pub fn stats(&self, routing: &RoutingConfig) -> CatalogStats {
        let available = self.iter().filter(|b| b.is_available()).count();

        let mut per_level = BTreeMap::new();
        for level in ModelLevel::ALL {
            let members = self.by_level(level);
            let policy = routing.levels.get(&level);
            per_level.insert(
                level,
                LevelStats {
                    total: members.len(),
                    available: members.iter().filter(|b| b.is_available()).count(),
                    free: members.iter().filter(|b| b.is_free()).count(),
                    cost_limit: policy.map(|p| p.cost_limit),
                    priority: policy.map(|p| p.priority),
                },
            );
        }

        let mut performers: Vec<&BackendDescriptor> = self
            .iter()
            .filter(|b| b.is_available() && b.reliability.total_requests > 0)
            .collect();
        performers.sort_by(|a, b| {
            b.success_rate()
                .partial_cmp(&a.success_rate())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.reliability
                        .total_requests
                        .cmp(&a.reliability.total_requests)
                })
                .then_with(|| a.name.cmp(&b.name))
        });

        CatalogStats {
            total: self.len(),
            available,
            disabled: self.len() - available,
            per_level,
            top_performers: performers
                .into_iter()
                .take(TOP_PERFORMERS)
                .map(|b| PerformerSummary {
                    name: b.name.clone(),
                    level: b.level,
                    success_rate: b.success_rate(),
                    total_requests: b.reliability.total_requests,
                    error_count: b.error_count(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    pub total: usize,
    pub available: usize,
    pub free: usize,
    pub cost_limit: Option<f64>,
    pub priority: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformerSummary {
    pub name: String,
    pub level: ModelLevel,
    pub success_rate: f64,
    pub total_requests: u64,
    pub error_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total: usize,
    pub available: usize,
    pub disabled: usize,
    pub per_level: BTreeMap<ModelLevel, LevelStats>,
    pub top_performers: Vec<PerformerSummary>,
}
