//! Core routing vocabulary: capability levels, task types, complexity levels.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Capability/cost bracket a backend is classified into.
///
/// Ordering is load-bearing: tier search walks "this level and every level
/// above it" using `Ord`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelLevel {
    /// Zero-cost backends (local, custom, or `:free` listings)
    Free,
    /// Small hosted models
    Junior,
    /// Mid-size hosted models
    Senior,
    /// Frontier models
    Executive,
}

impl ModelLevel {
    /// All levels, ascending.
    pub const ALL: [ModelLevel; 4] = [Self::Free, Self::Junior, Self::Senior, Self::Executive];

    /// This level and every higher level, ascending.
    pub fn and_above(self) -> impl Iterator<Item = ModelLevel> {
        Self::ALL.into_iter().filter(move |l| *l >= self)
    }

    /// Parse a config key such as `"senior"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "junior" => Some(Self::Junior),
            "senior" => Some(Self::Senior),
            "executive" => Some(Self::Executive),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Junior => write!(f, "junior"),
            Self::Senior => write!(f, "senior"),
            Self::Executive => write!(f, "executive"),
        }
    }
}

/// Kind of work a prompt asks for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Write new code
    CodeGeneration,
    /// Review existing code
    CodeReview,
    /// Find and fix a defect
    Debugging,
    /// Write docs, comments, explanations
    Documentation,
    /// Investigate, compare, evaluate
    Analysis,
    /// Design and planning
    Planning,
    /// Anything else
    General,
}

impl TaskType {
    /// Parse a config/specialization string, accepting a few common spellings.
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        match key.as_str() {
            "code_generation" | "codegen" | "coding" => Some(Self::CodeGeneration),
            "code_review" | "review" => Some(Self::CodeReview),
            "debugging" | "debug" => Some(Self::Debugging),
            "documentation" | "docs" => Some(Self::Documentation),
            "analysis" => Some(Self::Analysis),
            "planning" => Some(Self::Planning),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CodeGeneration => write!(f, "code_generation"),
            Self::CodeReview => write!(f, "code_review"),
            Self::Debugging => write!(f, "debugging"),
            Self::Documentation => write!(f, "documentation"),
            Self::Analysis => write!(f, "analysis"),
            Self::Planning => write!(f, "planning"),
            Self::General => write!(f, "general"),
        }
    }
}

/// How demanding a task is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
    Expert,
}

impl ComplexityLevel {
    /// Bucket an adjusted complexity score.
    pub fn from_score(score: f64) -> Self {
        if score < 0.0 {
            Self::Simple
        } else if score < 0.3 {
            Self::Moderate
        } else if score < 0.6 {
            Self::Complex
        } else {
            Self::Expert
        }
    }

    /// Level used when the configured threshold is not confident enough.
    pub fn default_level(self) -> ModelLevel {
        match self {
            Self::Simple => ModelLevel::Free,
            Self::Moderate => ModelLevel::Junior,
            Self::Complex => ModelLevel::Senior,
            Self::Expert => ModelLevel::Executive,
        }
    }
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Moderate => write!(f, "moderate"),
            Self::Complex => write!(f, "complex"),
            Self::Expert => write!(f, "expert"),
        }
    }
}
