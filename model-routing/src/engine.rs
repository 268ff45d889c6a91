//! Routing engine
//!
//! Classifies a prompt, derives the level it needs and walks the catalog level
//! by level until it has a ranked candidate list.
//!
//! ```text
//! select(prompt, ctx, prefer_free, max_cost)
//!   │
//!   ├─ cache hit? ──────────────────────────────────────────► decision
//!   │
//!   ├─ analyzer ──► (complexity, confidence, task_type)
//!   ├─ required level (threshold gate or default map)
//!   ├─ tiered scan: [free] + required.and_above()
//!   ├─ empty? unconstrained scan over every level (unless strict)
//!   └─ primary + ≤4 fallbacks ──► cache ──────────────────────► decision
//! ```
//!
//! Catalog and cache live behind separate mutexes; classification runs
//! outside both.

use crate::cache::{cache_key, CacheStats, DecisionCache};
use crate::catalog::{reliability_order, BackendCatalog, BackendDescriptor, CatalogStats};
use crate::classifier::{TaskAnalysis, TaskAnalyzer, TaskClassifier};
use crate::config::{BackendListConfig, EngineConfig, FallbackStrategy, RoutingConfig};
use crate::context::TaskContext;
use crate::decision::{self, ReasoningInputs, RoutingDecision, MAX_FALLBACKS};
use crate::error::{RoutingError, RoutingResult};
use crate::types::{ModelLevel, TaskType};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Ranking bonus for a backend specialized in the task's type.
pub const SPECIALIZATION_BONUS: f64 = 10.0;

/// Free candidates needed to stop scanning after the free level.
const EARLY_EXIT_CANDIDATES: usize = 3;

/// Engine handle shared across threads.
pub type SharedRoutingEngine = Arc<RoutingEngine>;

pub struct RoutingEngine {
    analyzer: Box<dyn TaskAnalyzer>,
    config: RoutingConfig,
    catalog: Mutex<BackendCatalog>,
    cache: Mutex<DecisionCache>,
}

impl std::fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Snapshot returned by [`RoutingEngine::stats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    #[serde(flatten)]
    pub catalog: CatalogStats,
    pub cache: CacheStats,
    pub free_model_preference: bool,
    pub cost_optimization: bool,
    pub fallback_strategy: FallbackStrategy,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> RoutingResult<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|e| RoutingError::LockPoisoned(format!("{}: {}", what, e)))
}

impl RoutingEngine {
    /// Engine over the given documents with the heuristic classifier.
    pub fn new(config: RoutingConfig, backends: BackendListConfig) -> Self {
        let catalog = BackendCatalog::from_config(&config, &backends);
        let cache = DecisionCache::from_settings(&config.cache);
        Self {
            analyzer: Box::new(TaskClassifier::new()),
            config,
            catalog: Mutex::new(catalog),
            cache: Mutex::new(cache),
        }
    }

    /// Load both documents leniently and build an engine.
    pub fn from_engine_config(engine_config: &EngineConfig) -> Self {
        let (routing, backends) = engine_config.load();
        Self::new(routing, backends)
    }

    /// [`RoutingEngine::from_engine_config`] with paths from the environment.
    pub fn from_env() -> Self {
        Self::from_engine_config(&EngineConfig::from_env())
    }

    /// Replace the classifier.
    pub fn with_analyzer(mut self, analyzer: impl TaskAnalyzer + 'static) -> Self {
        self.analyzer = Box::new(analyzer);
        self
    }

    /// Replace the decision cache.
    pub fn with_cache(mut self, cache: DecisionCache) -> Self {
        self.cache = Mutex::new(cache);
        self
    }

    pub fn into_shared(self) -> SharedRoutingEngine {
        Arc::new(self)
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Classify without routing.
    pub fn analyze(
        &self,
        prompt: &str,
        context: Option<&TaskContext>,
    ) -> RoutingResult<TaskAnalysis> {
        self.analyzer.analyze(prompt, context)
    }

    /// Choose a backend for `prompt`.
    ///
    /// `max_cost` bounds the per-token cost of every returned backend,
    /// fallbacks included. Analyzer errors are returned as-is.
    pub fn select(
        &self,
        prompt: &str,
        context: Option<&TaskContext>,
        prefer_free: bool,
        max_cost: Option<f64>,
    ) -> RoutingResult<RoutingDecision> {
        let key = cache_key(prompt, context, prefer_free, max_cost);
        if let Some(hit) = lock(&self.cache, "decision cache")?.get(&key) {
            debug!(backend = %hit.backend.name, "Returning cached routing decision");
            return Ok(hit);
        }

        let analysis = self.analyzer.analyze(prompt, context)?;
        let required_level = self
            .config
            .required_level(analysis.complexity, analysis.confidence);
        let free_preference = prefer_free && self.config.free_model_preference;

        let mut ranked = {
            let catalog = lock(&self.catalog, "backend catalog")?;
            let mut ranked = self.tiered_candidates(
                &catalog,
                analysis.task_type,
                required_level,
                prefer_free,
                max_cost,
            );
            if ranked.is_empty() {
                match self.config.fallback_strategy {
                    FallbackStrategy::Unconstrained => {
                        debug!("Tiered scan empty, scanning every level");
                        ranked = unconstrained_candidates(&catalog, max_cost);
                    }
                    FallbackStrategy::Strict => {
                        debug!("Tiered scan empty and fallback strategy is strict");
                    }
                }
            }
            ranked
        };

        if ranked.is_empty() {
            return Err(RoutingError::NoSuitableBackend {
                task_type: analysis.task_type,
                required_level,
                max_cost,
            });
        }

        ranked.truncate(1 + MAX_FALLBACKS);
        let backend = ranked.remove(0);
        let reasoning = decision::compose_reasoning(ReasoningInputs {
            backend: &backend,
            task_type: analysis.task_type,
            complexity: analysis.complexity,
            required_level,
            free_preference,
        });

        let decision = RoutingDecision {
            decision_id: Uuid::new_v4(),
            estimated_cost: decision::estimate_cost(prompt, &backend),
            backend,
            fallback_backends: ranked,
            confidence: analysis.confidence,
            reasoning,
            task_type: analysis.task_type,
            complexity: analysis.complexity,
            required_level,
            decided_at: Utc::now(),
        };

        info!(
            backend = %decision.backend.name,
            level = %decision.backend.level,
            task_type = %decision.task_type,
            complexity = %decision.complexity,
            required_level = %required_level,
            fallbacks = decision.fallback_backends.len(),
            "Routing decision made"
        );

        lock(&self.cache, "decision cache")?.insert(key, decision.clone());
        Ok(decision)
    }

    /// Levels in scan order: free first under free preference, then the
    /// required level and everything above it.
    fn search_order(&self, required_level: ModelLevel, prefer_free: bool) -> Vec<ModelLevel> {
        let mut order = Vec::with_capacity(ModelLevel::ALL.len());
        if prefer_free && self.config.free_model_preference {
            order.push(ModelLevel::Free);
        }
        for level in required_level.and_above() {
            if !order.contains(&level) {
                order.push(level);
            }
        }
        order
    }

    fn tiered_candidates(
        &self,
        catalog: &BackendCatalog,
        task_type: TaskType,
        required_level: ModelLevel,
        prefer_free: bool,
        max_cost: Option<f64>,
    ) -> Vec<BackendDescriptor> {
        let free_preference = prefer_free && self.config.free_model_preference;
        let mut ranked: Vec<BackendDescriptor> = Vec::new();

        for level in self.search_order(required_level, prefer_free) {
            let mut level_candidates: Vec<&BackendDescriptor> = catalog
                .candidates(level)
                .into_iter()
                .filter(|b| within_budget(b, max_cost))
                .collect();

            let cost_first = level == ModelLevel::Free && free_preference;
            level_candidates.sort_by(|a, b| rank_for_task(a, b, task_type, cost_first));

            debug!(
                level = %level,
                candidates = level_candidates.len(),
                "Scanned level"
            );
            ranked.extend(level_candidates.into_iter().cloned());

            if level == ModelLevel::Free
                && ranked.len() >= EARLY_EXIT_CANDIDATES
                && prefer_free
                && self.config.cost_optimization
            {
                debug!(candidates = ranked.len(), "Enough free candidates, stopping scan");
                break;
            }
        }
        ranked
    }

    /// Record a request outcome. Unknown backends are ignored (`Ok(false)`).
    pub fn record(&self, name: &str, success: bool, error: Option<&str>) -> RoutingResult<bool> {
        Ok(lock(&self.catalog, "backend catalog")?.record(name, success, error))
    }

    pub fn stats(&self) -> RoutingResult<EngineStats> {
        let catalog = lock(&self.catalog, "backend catalog")?.stats(&self.config);
        let cache = lock(&self.cache, "decision cache")?.stats();
        Ok(EngineStats {
            catalog,
            cache,
            free_model_preference: self.config.free_model_preference,
            cost_optimization: self.config.cost_optimization,
            fallback_strategy: self.config.fallback_strategy,
        })
    }

    /// Snapshot of every backend at `level`, ranked.
    pub fn by_level(&self, level: ModelLevel) -> RoutingResult<Vec<BackendDescriptor>> {
        Ok(lock(&self.catalog, "backend catalog")?
            .candidates(level)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Levels that have at least one backend.
    pub fn levels(&self) -> RoutingResult<Vec<ModelLevel>> {
        Ok(lock(&self.catalog, "backend catalog")?.all_levels())
    }

    pub fn backend(&self, name: &str) -> RoutingResult<Option<BackendDescriptor>> {
        Ok(lock(&self.catalog, "backend catalog")?.by_name(name).cloned())
    }

    pub fn tool_routing_enabled(&self, tool: &str) -> bool {
        self.config.tool_enabled(tool)
    }

    pub fn purge_expired_cache(&self) -> RoutingResult<usize> {
        Ok(lock(&self.cache, "decision cache")?.purge_expired())
    }

    pub fn clear_cache(&self) -> RoutingResult<()> {
        lock(&self.cache, "decision cache")?.clear();
        Ok(())
    }

    pub fn cache_len(&self) -> RoutingResult<usize> {
        Ok(lock(&self.cache, "decision cache")?.len())
    }
}

fn within_budget(backend: &BackendDescriptor, max_cost: Option<f64>) -> bool {
    backend.is_available() && max_cost.map_or(true, |limit| backend.cost_per_token <= limit)
}

fn specialization_bonus(backend: &BackendDescriptor, task_type: TaskType) -> f64 {
    if backend.specializes_in(task_type) {
        SPECIALIZATION_BONUS
    } else {
        0.0
    }
}

/// Specialization bonus first, then [`reliability_order`]; with `cost_first`
/// the zero-cost split comes ahead of the bonus.
fn rank_for_task(
    a: &BackendDescriptor,
    b: &BackendDescriptor,
    task_type: TaskType,
    cost_first: bool,
) -> Ordering {
    let by_bonus = specialization_bonus(b, task_type)
        .partial_cmp(&specialization_bonus(a, task_type))
        .unwrap_or(Ordering::Equal);
    if cost_first {
        a.cost_priority()
            .cmp(&b.cost_priority())
            .then(by_bonus)
            .then_with(|| reliability_order(a, b))
    } else {
        by_bonus.then_with(|| reliability_order(a, b))
    }
}

/// Every available backend within budget, level by level, ascending.
fn unconstrained_candidates(
    catalog: &BackendCatalog,
    max_cost: Option<f64>,
) -> Vec<BackendDescriptor> {
    ModelLevel::ALL
        .into_iter()
        .flat_map(|level| catalog.candidates(level))
        .filter(|b| within_budget(b, max_cost))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::MockTaskAnalyzer;
    use crate::config::BackendEntry;
    use crate::types::ComplexityLevel;
    use std::collections::BTreeMap;

    fn analysis(
        complexity: ComplexityLevel,
        confidence: f64,
        task_type: TaskType,
    ) -> TaskAnalysis {
        TaskAnalysis {
            complexity,
            confidence,
            task_type,
            weighted_score: 0.0,
            complexity_score: 0.0,
            indicators: Vec::new(),
            task_scores: BTreeMap::new(),
        }
    }

    fn mock_returning(result: TaskAnalysis, times: usize) -> MockTaskAnalyzer {
        let mut mock = MockTaskAnalyzer::new();
        mock.expect_analyze()
            .times(times)
            .returning(move |_, _| Ok(result.clone()));
        mock
    }

    fn builtin_engine() -> RoutingEngine {
        RoutingEngine::new(RoutingConfig::default(), BackendListConfig::builtin())
    }

    #[test]
    fn test_cache_hit_skips_analyzer() {
        let engine = builtin_engine().with_analyzer(mock_returning(
            analysis(ComplexityLevel::Moderate, 0.9, TaskType::CodeGeneration),
            1,
        ));

        let first = engine.select("write a function", None, true, None).unwrap();
        let second = engine.select("write a function", None, true, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.cache_len().unwrap(), 1);
    }

    #[test]
    fn test_different_inputs_miss_cache() {
        let engine = builtin_engine().with_analyzer(mock_returning(
            analysis(ComplexityLevel::Moderate, 0.9, TaskType::General),
            2,
        ));
        engine.select("same prompt", None, true, None).unwrap();
        engine.select("same prompt", None, false, None).unwrap();
        assert_eq!(engine.cache_len().unwrap(), 2);
    }

    #[test]
    fn test_analyzer_error_propagates() {
        let mut mock = MockTaskAnalyzer::new();
        mock.expect_analyze()
            .times(1)
            .returning(|_, _| Err(RoutingError::classification("model offline")));
        let engine = builtin_engine().with_analyzer(mock);

        let err = engine.select("anything", None, true, None).unwrap_err();
        assert_eq!(err.code(), "CLASSIFICATION_FAILED");
        assert_eq!(engine.cache_len().unwrap(), 0);
    }

    #[test]
    fn test_search_order() {
        let engine = builtin_engine();
        assert_eq!(
            engine.search_order(ModelLevel::Senior, true),
            vec![ModelLevel::Free, ModelLevel::Senior, ModelLevel::Executive]
        );
        assert_eq!(
            engine.search_order(ModelLevel::Free, true),
            ModelLevel::ALL.to_vec()
        );
        assert_eq!(
            engine.search_order(ModelLevel::Executive, false),
            vec![ModelLevel::Executive]
        );

        let mut cfg = RoutingConfig::default();
        cfg.free_model_preference = false;
        let engine = RoutingEngine::new(cfg, BackendListConfig::builtin());
        assert_eq!(
            engine.search_order(ModelLevel::Junior, true),
            vec![ModelLevel::Junior, ModelLevel::Senior, ModelLevel::Executive]
        );
    }

    #[test]
    fn test_early_exit_after_three_free_candidates() {
        let engine = builtin_engine().with_analyzer(mock_returning(
            analysis(ComplexityLevel::Expert, 0.9, TaskType::Planning),
            1,
        ));
        let decision = engine.select("design", None, true, None).unwrap();
        assert_eq!(decision.backend.level, ModelLevel::Free);
        assert_eq!(decision.fallback_backends.len(), 2);
        assert!(decision
            .fallback_backends
            .iter()
            .all(|b| b.level == ModelLevel::Free));
    }

    #[test]
    fn test_no_free_preference_uses_required_level() {
        let engine = builtin_engine().with_analyzer(mock_returning(
            analysis(ComplexityLevel::Expert, 0.9, TaskType::Planning),
            1,
        ));
        let decision = engine.select("design", None, false, None).unwrap();
        assert_eq!(decision.required_level, ModelLevel::Executive);
        assert_eq!(decision.backend.level, ModelLevel::Executive);
        assert_eq!(decision.fallback_backends.len(), 1);
    }

    #[test]
    fn test_specialization_bonus_orders_paid_level() {
        let list = BackendListConfig::new(vec![
            BackendEntry::new("acme/alpha-large"),
            BackendEntry::new("acme/beta-large").with_description("debugging specialist"),
        ]);
        let mut cfg = RoutingConfig::default();
        cfg.model_level_mappings =
            BTreeMap::from([(ModelLevel::Senior, vec!["-large".to_string()])]);
        let engine = RoutingEngine::new(cfg, list).with_analyzer(mock_returning(
            analysis(ComplexityLevel::Complex, 0.9, TaskType::Debugging),
            1,
        ));

        let decision = engine.select("crash", None, false, None).unwrap();
        assert_eq!(decision.backend.name, "acme/beta-large");
        assert_eq!(decision.fallback_backends[0].name, "acme/alpha-large");
        assert!(decision.reasoning.contains("Specialized for debugging"));
    }

    #[test]
    fn test_free_level_puts_zero_cost_before_bonus() {
        // an unknown paid backend defaults to the free level
        let list = BackendListConfig::new(vec![
            BackendEntry::new("acme/debugger").with_description("debug anything"),
            BackendEntry::new("plain:free"),
        ]);
        let engine = RoutingEngine::new(RoutingConfig::default(), list).with_analyzer(
            mock_returning(
                analysis(ComplexityLevel::Simple, 0.9, TaskType::Debugging),
                1,
            ),
        );
        let decision = engine.select("fix", None, true, None).unwrap();
        assert_eq!(decision.backend.name, "plain:free");
        assert_eq!(decision.backend.cost_per_token, 0.0);
        assert_eq!(decision.fallback_backends[0].name, "acme/debugger");
    }

    #[test]
    fn test_unconstrained_pass_below_required_level() {
        let list = BackendListConfig::new(vec![BackendEntry::new("openai/gpt-4o-mini")]);
        let engine = RoutingEngine::new(RoutingConfig::default(), list).with_analyzer(
            mock_returning(analysis(ComplexityLevel::Expert, 0.9, TaskType::General), 1),
        );
        let decision = engine.select("hard", None, false, None).unwrap();
        assert_eq!(decision.backend.name, "openai/gpt-4o-mini");
        assert!(decision.reasoning.contains("Fallback below required executive"));
    }

    #[test]
    fn test_strict_strategy_skips_unconstrained_pass() {
        let list = BackendListConfig::new(vec![BackendEntry::new("openai/gpt-4o-mini")]);
        let mut cfg = RoutingConfig::default();
        cfg.fallback_strategy = FallbackStrategy::Strict;
        let engine = RoutingEngine::new(cfg, list).with_analyzer(mock_returning(
            analysis(ComplexityLevel::Expert, 0.9, TaskType::General),
            1,
        ));
        let err = engine.select("hard", None, false, None).unwrap_err();
        assert!(matches!(
            err,
            RoutingError::NoSuitableBackend {
                required_level: ModelLevel::Executive,
                ..
            }
        ));
    }

    #[test]
    fn test_fallbacks_capped_at_four() {
        let list = BackendListConfig::new(
            (0..8)
                .map(|i| BackendEntry::new(format!("local-{}", i)).custom())
                .collect(),
        );
        let mut cfg = RoutingConfig::default();
        cfg.cost_optimization = false;
        let engine = RoutingEngine::new(cfg, list).with_analyzer(mock_returning(
            analysis(ComplexityLevel::Simple, 0.9, TaskType::General),
            1,
        ));
        let decision = engine.select("hi", None, true, None).unwrap();
        assert_eq!(decision.fallback_backends.len(), MAX_FALLBACKS);
        assert_eq!(
            decision.backend_chain(),
            vec!["local-0", "local-1", "local-2", "local-3", "local-4"]
        );
    }

    #[test]
    fn test_cached_decision_survives_disable() {
        let engine = builtin_engine().with_analyzer(mock_returning(
            analysis(ComplexityLevel::Simple, 0.9, TaskType::General),
            1,
        ));
        let first = engine.select("hello", None, true, None).unwrap();
        for _ in 0..5 {
            engine.record(&first.backend.name, false, None).unwrap();
        }
        let second = engine.select("hello", None, true, None).unwrap();
        assert_eq!(second.backend.name, first.backend.name);

        engine.clear_cache().unwrap();
        assert_eq!(engine.cache_len().unwrap(), 0);
    }

    #[test]
    fn test_with_cache_injection() {
        let engine = builtin_engine()
            .with_cache(DecisionCache::new(std::time::Duration::from_secs(60), 0))
            .with_analyzer(mock_returning(
                analysis(ComplexityLevel::Simple, 0.9, TaskType::General),
                2,
            ));
        engine.select("hello", None, true, None).unwrap();
        engine.select("hello", None, true, None).unwrap();
        assert_eq!(engine.purge_expired_cache().unwrap(), 0);
        assert_eq!(engine.stats().unwrap().cache.capacity, 0);
    }

    #[test]
    fn test_tool_routing_rules() {
        let mut cfg = RoutingConfig::default();
        cfg.tool_specific_rules.insert(
            "chat".to_string(),
            crate::config::ToolRule { enabled: false },
        );
        let engine = RoutingEngine::new(cfg, BackendListConfig::builtin());
        assert!(!engine.tool_routing_enabled("chat"));
        assert!(engine.tool_routing_enabled("codegen"));
    }

    #[test]
    fn test_stats_and_levels() {
        let engine = builtin_engine();
        engine.record("opus", false, None).unwrap();
        let stats = engine.stats().unwrap();
        assert_eq!(stats.catalog.total, 8);
        assert!(stats.free_model_preference);
        assert_eq!(stats.fallback_strategy, FallbackStrategy::Unconstrained);
        assert_eq!(engine.levels().unwrap(), ModelLevel::ALL.to_vec());
        assert_eq!(engine.by_level(ModelLevel::Executive).unwrap().len(), 2);
        assert!(engine.backend("SONNET").unwrap().is_some());

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total"], 8);
        assert_eq!(json["per_level"]["free"]["total"], 3);
    }
}
