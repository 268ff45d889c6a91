//! Routing error types
//!
//! The engine originates exactly one failure of its own (`NoSuitableBackend`).
//! Analyzer failures pass through untouched; config problems never reach the
//! caller of `select` because loaders fall back to defaults.

use crate::types::{ModelLevel, TaskType};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Errors surfaced by the routing engine
#[derive(Error, Debug)]
pub enum RoutingError {
    /// No backend satisfied the filters, even after the unconstrained pass
    #[error(
        "no suitable backend for {task_type} task (required level {required_level}, max cost {})",
        display_cost(.max_cost)
    )]
    NoSuitableBackend {
        task_type: TaskType,
        required_level: ModelLevel,
        max_cost: Option<f64>,
    },

    /// The task analyzer failed; callers decide on a fallback classification
    #[error("task classification failed: {0}")]
    Classification(String),

    /// A mutex around engine state was poisoned by a panicking holder
    #[error("routing state lock poisoned: {0}")]
    LockPoisoned(String),
}

fn display_cost(max_cost: &Option<f64>) -> String {
    match max_cost {
        Some(c) => c.to_string(),
        None => "unbounded".to_string(),
    }
}

impl RoutingError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSuitableBackend { .. } => "NO_SUITABLE_BACKEND",
            Self::Classification(_) => "CLASSIFICATION_FAILED",
            Self::LockPoisoned(_) => "LOCK_POISONED",
        }
    }

    pub fn classification(message: impl Into<String>) -> Self {
        Self::Classification(message.into())
    }
}

/// Errors from the strict configuration loaders.
///
/// The lenient loaders (`load_or_default`) log these and substitute defaults.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "CONFIG_NOT_FOUND",
            Self::Io { .. } => "CONFIG_IO",
            Self::Json { .. } | Self::Toml { .. } => "CONFIG_INVALID",
        }
    }
}
