//! Routing configuration documents
//!
//! Two documents drive the engine:
//!
//! - **Routing config**: level policies, complexity thresholds, name→level
//!   mappings, tool rules and global flags.
//! - **Backend list**: `{ "models": [...] }` describing every backend.
//!
//! Both are optional. Missing or malformed documents fall back to built-in
//! defaults; see [`loader`].

pub mod loader;

pub use loader::{read_document, EngineConfig, MODELS_PATH_ENV, ROUTING_CONFIG_PATH_ENV};

use crate::types::{ComplexityLevel, ModelLevel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cost ceiling and priority advertised for a level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LevelPolicy {
    /// Maximum cost per token expected at this level
    pub cost_limit: f64,
    /// Lower = preferred
    pub priority: u32,
}

/// Level granted to a complexity bucket when the classifier is confident.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComplexityThreshold {
    pub max_level: ModelLevel,
    pub confidence_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolRule {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// What happens when the tiered search finds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Scan every level again, filtered only by availability and max cost
    #[default]
    Unconstrained,
    /// Fail as soon as the tiered search is empty
    Strict,
}

impl FallbackStrategy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unconstrained" | "cost_optimized" | "any_available" | "default" => {
                Some(Self::Unconstrained)
            }
            "strict" | "none" | "disabled" => Some(Self::Strict),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for FallbackStrategy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown fallback_strategy '{}', using {:?}",
                raw,
                Self::default()
            );
            Self::default()
        }))
    }
}

/// Decision cache sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 1024,
        }
    }
}

/// Routing rules document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RoutingConfig {
    pub levels: BTreeMap<ModelLevel, LevelPolicy>,
    pub complexity_thresholds: BTreeMap<ComplexityLevel, ComplexityThreshold>,
    /// Case-insensitive name substrings that pin a backend to a level
    pub model_level_mappings: BTreeMap<ModelLevel, Vec<String>>,
    pub tool_specific_rules: BTreeMap<String, ToolRule>,
    pub free_model_preference: bool,
    pub cost_optimization: bool,
    #[schemars(with = "String")]
    pub fallback_strategy: FallbackStrategy,
    pub cache: CacheSettings,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let levels = BTreeMap::from([
            (
                ModelLevel::Free,
                LevelPolicy {
                    cost_limit: 0.0,
                    priority: 1,
                },
            ),
            (
                ModelLevel::Junior,
                LevelPolicy {
                    cost_limit: 0.000_002,
                    priority: 2,
                },
            ),
            (
                ModelLevel::Senior,
                LevelPolicy {
                    cost_limit: 0.000_015,
                    priority: 3,
                },
            ),
            (
                ModelLevel::Executive,
                LevelPolicy {
                    cost_limit: 0.000_075,
                    priority: 4,
                },
            ),
        ]);

        let complexity_thresholds = BTreeMap::from([
            (
                ComplexityLevel::Simple,
                ComplexityThreshold {
                    max_level: ModelLevel::Free,
                    confidence_threshold: 0.3,
                },
            ),
            (
                ComplexityLevel::Moderate,
                ComplexityThreshold {
                    max_level: ModelLevel::Junior,
                    confidence_threshold: 0.4,
                },
            ),
            (
                ComplexityLevel::Complex,
                ComplexityThreshold {
                    max_level: ModelLevel::Senior,
                    confidence_threshold: 0.5,
                },
            ),
            (
                ComplexityLevel::Expert,
                ComplexityThreshold {
                    max_level: ModelLevel::Executive,
                    confidence_threshold: 0.6,
                },
            ),
        ]);

        Self {
            levels,
            complexity_thresholds,
            model_level_mappings: BTreeMap::new(),
            tool_specific_rules: BTreeMap::new(),
            free_model_preference: true,
            cost_optimization: true,
            fallback_strategy: FallbackStrategy::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl RoutingConfig {
    /// Level required for a classified task.
    ///
    /// The configured threshold applies only when the classifier is at least
    /// as confident as it demands; otherwise the built-in mapping is used.
    pub fn required_level(&self, complexity: ComplexityLevel, confidence: f64) -> ModelLevel {
        match self.complexity_thresholds.get(&complexity) {
            Some(t) if confidence >= t.confidence_threshold => t.max_level,
            _ => complexity.default_level(),
        }
    }

    /// Whether routing is enabled for a tool; tools without a rule are enabled.
    pub fn tool_enabled(&self, tool: &str) -> bool {
        self.tool_specific_rules
            .get(tool)
            .map(|r| r.enabled)
            .unwrap_or(true)
    }
}

/// One backend as declared in the backend list document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BackendEntry {
    pub model_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_context_window")]
    pub context_window: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default)]
    pub supports_images: bool,
    /// Free-form task type names (`"code_generation"`, `"debugging"`, ...)
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Local or self-hosted backend; always classified as free
    #[serde(default)]
    pub is_custom: bool,
}

impl BackendEntry {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            aliases: Vec::new(),
            context_window: default_context_window(),
            max_output_tokens: default_max_output_tokens(),
            supports_images: false,
            specializations: Vec::new(),
            description: String::new(),
            is_custom: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_specializations<I, S>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.specializations = specs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn custom(mut self) -> Self {
        self.is_custom = true;
        self
    }

    pub fn with_images(mut self) -> Self {
        self.supports_images = true;
        self
    }

    pub fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = tokens;
        self
    }
}

/// Backend list document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BackendListConfig {
    #[serde(default)]
    pub models: Vec<BackendEntry>,
}

impl BackendListConfig {
    pub fn new(models: Vec<BackendEntry>) -> Self {
        Self { models }
    }

    /// Backends used when no backend list document is available.
    pub fn builtin() -> Self {
        Self::new(vec![
            BackendEntry::new("meta-llama/llama-3.1-8b-instruct:free")
                .with_description("General purpose open model, free tier"),
            BackendEntry::new("qwen/qwen-2.5-coder-32b-instruct:free")
                .with_description("Open coder model for programming tasks, free tier"),
            BackendEntry::new("deepseek/deepseek-r1:free")
                .with_description("Open reasoning model with visible thinking, free tier"),
            BackendEntry::new("openai/gpt-4o-mini")
                .with_aliases(["gpt-4o-mini"])
                .with_images(),
            BackendEntry::new("anthropic/claude-3-haiku").with_aliases(["claude-3-haiku"]),
            BackendEntry::new("anthropic/claude-3.5-sonnet")
                .with_aliases(["claude-3.5-sonnet", "sonnet"])
                .with_description("Strong coding and analysis model")
                .with_images(),
            BackendEntry::new("google/gemini-1.5-pro")
                .with_aliases(["gemini-pro"])
                .with_context_window(1_000_000)
                .with_images(),
            BackendEntry::new("anthropic/claude-3-opus")
                .with_aliases(["claude-3-opus", "opus"])
                .with_description("Deep reasoning for expert tasks"),
        ])
    }
}

fn default_true() -> bool {
    true
}

fn default_context_window() -> u32 {
    8_192
}

fn default_max_output_tokens() -> u32 {
    4_096
}
