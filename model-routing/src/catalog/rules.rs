//! Backend classification rule tables
//!
//! Level assignment walks [`LEVEL_RULES`] in order and takes the first hit:
//!
//! ```text
//! free marker  >  configured mapping  >  vendor/family heuristic  >  Free
//! ```
//!
//! Vendor/family tokens and their prices share one table so level and cost
//! always agree on which token matched. When several tokens match a name the
//! longest one wins (`gpt-4o-mini` beats `gpt-4o` beats `gpt-4`).

use crate::config::{BackendEntry, RoutingConfig};
use crate::types::{ModelLevel, TaskType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Per-token cost used when no vendor token matches a paid backend.
pub const PLACEHOLDER_COST_PER_TOKEN: f64 = 0.000_001;

const FREE_SUFFIXES: [&str; 3] = [":free", "-free", "_free"];

/// Vendor/model-family token, level, and blended USD cost per token.
const VENDOR_TOKENS: &[(&str, ModelLevel, f64)] = &[
    // Executive
    ("claude-3-opus", ModelLevel::Executive, 0.000_075),
    ("claude-opus", ModelLevel::Executive, 0.000_075),
    ("opus", ModelLevel::Executive, 0.000_075),
    ("gpt-4.5", ModelLevel::Executive, 0.000_075),
    ("gpt-4-turbo", ModelLevel::Executive, 0.000_03),
    ("gpt-4o", ModelLevel::Executive, 0.000_01),
    ("o1-preview", ModelLevel::Executive, 0.000_06),
    ("gemini-ultra", ModelLevel::Executive, 0.000_02),
    ("gemini-1.5-pro", ModelLevel::Executive, 0.000_01),
    ("gemini-2.5-pro", ModelLevel::Executive, 0.000_01),
    // Senior
    ("claude-3.5-sonnet", ModelLevel::Senior, 0.000_015),
    ("claude-3-sonnet", ModelLevel::Senior, 0.000_015),
    ("sonnet", ModelLevel::Senior, 0.000_015),
    ("gpt-4", ModelLevel::Senior, 0.000_03),
    ("o1-mini", ModelLevel::Senior, 0.000_012),
    ("gemini-pro", ModelLevel::Senior, 0.000_005),
    ("mistral-large", ModelLevel::Senior, 0.000_008),
    ("llama-3.1-405b", ModelLevel::Senior, 0.000_003),
    ("qwen-max", ModelLevel::Senior, 0.000_006),
    ("command-r-plus", ModelLevel::Senior, 0.000_015),
    // Junior
    ("claude-3-haiku", ModelLevel::Junior, 0.000_001_25),
    ("haiku", ModelLevel::Junior, 0.000_001_25),
    ("gpt-4o-mini", ModelLevel::Junior, 0.000_000_6),
    ("gpt-3.5", ModelLevel::Junior, 0.000_002),
    ("gemini-1.5-flash", ModelLevel::Junior, 0.000_000_3),
    ("gemini-flash", ModelLevel::Junior, 0.000_000_3),
    ("llama", ModelLevel::Junior, 0.000_000_2),
    ("mixtral", ModelLevel::Junior, 0.000_000_6),
    ("mistral", ModelLevel::Junior, 0.000_000_25),
    ("qwen", ModelLevel::Junior, 0.000_000_4),
    ("deepseek", ModelLevel::Junior, 0.000_000_5),
    ("gemma", ModelLevel::Junior, 0.000_000_2),
    ("phi-3", ModelLevel::Junior, 0.000_000_1),
    ("command-r", ModelLevel::Junior, 0.000_000_5),
];

/// Which rule placed a backend in its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    FreeMarker,
    ConfiguredMapping,
    VendorHeuristic,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelAssignment {
    pub level: ModelLevel,
    pub source: LevelSource,
    /// Token or pattern that matched, if any
    pub matched: Option<String>,
}

type LevelRule = fn(&ClassificationRules, &BackendEntry, &str) -> Option<LevelAssignment>;

/// Precedence order for level assignment; the default applies after these.
const LEVEL_RULES: [(&str, LevelRule); 3] = [
    ("free_marker", free_marker_rule),
    ("configured_mapping", configured_mapping_rule),
    ("vendor_heuristic", vendor_heuristic_rule),
];

/// Level mappings from config, ready for matching.
#[derive(Debug, Clone, Default)]
pub struct ClassificationRules {
    /// Most capable level first so overlapping patterns resolve upward
    mappings: Vec<(ModelLevel, Vec<String>)>,
}

impl ClassificationRules {
    pub fn from_config(config: &RoutingConfig) -> Self {
        let mut mappings: Vec<(ModelLevel, Vec<String>)> = config
            .model_level_mappings
            .iter()
            .map(|(level, patterns)| {
                (
                    *level,
                    patterns
                        .iter()
                        .map(|p| p.trim().to_lowercase())
                        .filter(|p| !p.is_empty())
                        .collect(),
                )
            })
            .collect();
        mappings.sort_by(|a, b| b.0.cmp(&a.0));
        Self { mappings }
    }

    /// Assign a level to a configured backend.
    pub fn classify_level(&self, entry: &BackendEntry) -> LevelAssignment {
        let name = entry.model_name.to_lowercase();
        for (rule_name, rule) in LEVEL_RULES {
            if let Some(assignment) = rule(self, entry, &name) {
                tracing::trace!(
                    backend = %entry.model_name,
                    rule = rule_name,
                    level = %assignment.level,
                    "level rule matched"
                );
                return assignment;
            }
        }
        LevelAssignment {
            level: ModelLevel::Free,
            source: LevelSource::Default,
            matched: None,
        }
    }
}

fn free_marker_rule(
    _rules: &ClassificationRules,
    entry: &BackendEntry,
    name: &str,
) -> Option<LevelAssignment> {
    let marker = if entry.is_custom {
        Some("is_custom".to_string())
    } else if let Some(suffix) = FREE_SUFFIXES.iter().find(|s| name.ends_with(*s)) {
        Some((*suffix).to_string())
    } else if name.contains("free") {
        Some("free".to_string())
    } else {
        None
    };
    marker.map(|m| LevelAssignment {
        level: ModelLevel::Free,
        source: LevelSource::FreeMarker,
        matched: Some(m),
    })
}

fn configured_mapping_rule(
    rules: &ClassificationRules,
    _entry: &BackendEntry,
    name: &str,
) -> Option<LevelAssignment> {
    rules.mappings.iter().find_map(|(level, patterns)| {
        patterns
            .iter()
            .find(|p| name.contains(p.as_str()))
            .map(|p| LevelAssignment {
                level: *level,
                source: LevelSource::ConfiguredMapping,
                matched: Some(p.clone()),
            })
    })
}

fn vendor_heuristic_rule(
    _rules: &ClassificationRules,
    _entry: &BackendEntry,
    name: &str,
) -> Option<LevelAssignment> {
    best_vendor_token(name).map(|(token, level, _)| LevelAssignment {
        level,
        source: LevelSource::VendorHeuristic,
        matched: Some(token.to_string()),
    })
}

/// Longest vendor token contained in `name`.
fn best_vendor_token(name: &str) -> Option<(&'static str, ModelLevel, f64)> {
    VENDOR_TOKENS
        .iter()
        .filter(|(token, _, _)| name.contains(token))
        .max_by_key(|(token, _, _)| token.len())
        .copied()
}

/// Whether a backend carries any free marker.
pub fn is_free_entry(entry: &BackendEntry) -> bool {
    free_marker_rule(
        &ClassificationRules::default(),
        entry,
        &entry.model_name.to_lowercase(),
    )
    .is_some()
}

/// Per-token cost estimate for a configured backend.
pub fn estimate_cost(entry: &BackendEntry) -> f64 {
    if is_free_entry(entry) {
        return 0.0;
    }
    best_vendor_token(&entry.model_name.to_lowercase())
        .map(|(_, _, cost)| cost)
        .unwrap_or(PLACEHOLDER_COST_PER_TOKEN)
}

static SPECIALIZATION_HINTS: LazyLock<Vec<(Regex, &'static [TaskType])>> = LazyLock::new(|| {
    let hints: [(&str, &'static [TaskType]); 3] = [
        (
            r"\b(?:code|coder|coding|programming)",
            &[TaskType::CodeGeneration, TaskType::CodeReview],
        ),
        (r"\b(?:analysis|reasoning|thinking)", &[TaskType::Analysis]),
        (r"\b(?:debug|fix|problem)", &[TaskType::Debugging]),
    ];
    hints
        .into_iter()
        .map(|(p, types)| {
            (
                Regex::new(p).expect("specialization hint regex should compile"),
                types,
            )
        })
        .collect()
});

/// Declared specializations plus those inferred from name and description.
pub fn infer_specializations(entry: &BackendEntry) -> BTreeSet<TaskType> {
    let mut specs: BTreeSet<TaskType> = BTreeSet::new();

    for raw in &entry.specializations {
        match TaskType::parse(raw) {
            Some(t) => {
                specs.insert(t);
            }
            None => tracing::debug!(
                backend = %entry.model_name,
                specialization = %raw,
                "ignoring unknown specialization"
            ),
        }
    }

    let text = format!("{} {}", entry.model_name, entry.description).to_lowercase();
    for (re, types) in SPECIALIZATION_HINTS.iter() {
        if re.is_match(&text) {
            specs.extend(types.iter().copied());
        }
    }
    if entry.supports_images {
        specs.insert(TaskType::Analysis);
    }

    if specs.is_empty() {
        specs.insert(TaskType::General);
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn level_of(rules: &ClassificationRules, name: &str) -> (ModelLevel, LevelSource) {
        let a = rules.classify_level(&BackendEntry::new(name));
        (a.level, a.source)
    }

    #[test]
    fn test_free_markers() {
        let rules = ClassificationRules::default();
        assert_eq!(
            level_of(&rules, "meta-llama/llama-3-8b:free"),
            (ModelLevel::Free, LevelSource::FreeMarker)
        );
        assert_eq!(
            level_of(&rules, "FreeGPT"),
            (ModelLevel::Free, LevelSource::FreeMarker)
        );
        let custom = BackendEntry::new("anthropic/claude-3-opus").custom();
        assert_eq!(rules.classify_level(&custom).level, ModelLevel::Free);
    }

    #[test]
    fn test_free_marker_beats_configured_mapping() {
        let mut cfg = RoutingConfig::default();
        cfg.model_level_mappings =
            BTreeMap::from([(ModelLevel::Executive, vec!["llama".to_string()])]);
        let rules = ClassificationRules::from_config(&cfg);
        assert_eq!(level_of(&rules, "llama-3:free").0, ModelLevel::Free);
        assert_eq!(
            level_of(&rules, "llama-3-70b"),
            (ModelLevel::Executive, LevelSource::ConfiguredMapping)
        );
    }

    #[test]
    fn test_configured_mapping_beats_heuristic() {
        let mut cfg = RoutingConfig::default();
        cfg.model_level_mappings =
            BTreeMap::from([(ModelLevel::Junior, vec!["Opus".to_string()])]);
        let rules = ClassificationRules::from_config(&cfg);
        assert_eq!(level_of(&rules, "claude-3-opus").0, ModelLevel::Junior);
    }

    #[test]
    fn test_overlapping_mappings_prefer_higher_level() {
        let mut cfg = RoutingConfig::default();
        cfg.model_level_mappings = BTreeMap::from([
            (ModelLevel::Junior, vec!["acme".to_string()]),
            (ModelLevel::Senior, vec!["acme-large".to_string()]),
        ]);
        let rules = ClassificationRules::from_config(&cfg);
        assert_eq!(level_of(&rules, "acme-large-v2").0, ModelLevel::Senior);
        assert_eq!(level_of(&rules, "acme-small").0, ModelLevel::Junior);
    }

    #[test]
    fn test_vendor_heuristic_longest_token_wins() {
        let rules = ClassificationRules::default();
        assert_eq!(level_of(&rules, "openai/gpt-4o-mini").0, ModelLevel::Junior);
        assert_eq!(level_of(&rules, "openai/gpt-4o").0, ModelLevel::Executive);
        assert_eq!(level_of(&rules, "openai/gpt-4").0, ModelLevel::Senior);
        assert_eq!(
            level_of(&rules, "anthropic/claude-3.5-sonnet").0,
            ModelLevel::Senior
        );
    }

    #[test]
    fn test_unknown_defaults_to_free() {
        let rules = ClassificationRules::default();
        assert_eq!(
            level_of(&rules, "acme/mystery-model"),
            (ModelLevel::Free, LevelSource::Default)
        );
    }

    #[test]
    fn test_cost_estimation() {
        assert_eq!(estimate_cost(&BackendEntry::new("x/y:free")), 0.0);
        assert_eq!(estimate_cost(&BackendEntry::new("local").custom()), 0.0);
        assert_eq!(
            estimate_cost(&BackendEntry::new("openai/gpt-4o-mini")),
            0.000_000_6
        );
        assert_eq!(
            estimate_cost(&BackendEntry::new("acme/mystery-model")),
            PLACEHOLDER_COST_PER_TOKEN
        );
    }

    #[test]
    fn test_specialization_inference() {
        let coder = BackendEntry::new("qwen/qwen-2.5-coder-32b");
        let specs = infer_specializations(&coder);
        assert!(specs.contains(&TaskType::CodeGeneration));
        assert!(specs.contains(&TaskType::CodeReview));

        let reasoner = BackendEntry::new("deepseek-r1")
            .with_description("Reasoning model that can fix hard problems");
        let specs = infer_specializations(&reasoner);
        assert!(specs.contains(&TaskType::Analysis));
        assert!(specs.contains(&TaskType::Debugging));

        let vision = BackendEntry::new("plain").with_images();
        assert_eq!(
            infer_specializations(&vision),
            BTreeSet::from([TaskType::Analysis])
        );

        assert_eq!(
            infer_specializations(&BackendEntry::new("plain")),
            BTreeSet::from([TaskType::General])
        );
    }

    #[test]
    fn test_declared_specializations_are_kept() {
        let entry = BackendEntry::new("plain").with_specializations(["planning", "telepathy"]);
        assert_eq!(
            infer_specializations(&entry),
            BTreeSet::from([TaskType::Planning])
        );
    }
}
