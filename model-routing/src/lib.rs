//! Model Routing Library
//!
//! Picks which LLM backend should serve a prompt.
//!
//! - Task classification: heuristic complexity, confidence and task type
//! - Backend catalog grouped into capability levels (free → executive)
//! - Reliability tracking with automatic disable after repeated failures
//! - Bounded TTL cache of routing decisions
//!
//! # Usage
//!
//! ```no_run
//! use model_routing::{RoutingEngine, TaskContext};
//!
//! let engine = RoutingEngine::from_env();
//! let ctx = TaskContext::new().with_files(["src/lib.rs"]);
//! let decision = engine
//!     .select("Refactor the parser module", Some(&ctx), true, None)
//!     .expect("catalog has backends");
//!
//! println!("{} ({})", decision.backend.name, decision.reasoning);
//! engine.record(&decision.backend.name, true, None).ok();
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod cache;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
pub mod types;

// Re-export core vocabulary
pub use types::{ComplexityLevel, ModelLevel, TaskType};

// Re-export classifier types
pub use classifier::{ComplexityIndicator, TaskAnalysis, TaskAnalyzer, TaskClassifier};
pub use context::TaskContext;

// Re-export catalog types
pub use catalog::{
    BackendCatalog, BackendDescriptor, CatalogStats, LevelSource, LevelStats, PerformerSummary,
    ReliabilityState, AUTO_DISABLE_ERROR_COUNT,
};

// Re-export config types
pub use config::{
    BackendEntry, BackendListConfig, CacheSettings, EngineConfig, FallbackStrategy, LevelPolicy,
    RoutingConfig,
};

// Re-export engine types
pub use cache::{CacheStats, DecisionCache};
pub use decision::RoutingDecision;
pub use engine::{EngineStats, RoutingEngine, SharedRoutingEngine};
pub use error::{ConfigError, RoutingError, RoutingResult};
