//! Config document loading
//!
//! Strict loaders return [`ConfigError`]; the `load_or_default` variants used
//! by the engine never fail and log what they substituted.

use super::{BackendListConfig, RoutingConfig};
use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable naming the routing config document.
pub const ROUTING_CONFIG_PATH_ENV: &str = "MODEL_ROUTER_CONFIG";
/// Environment variable naming the backend list document.
pub const MODELS_PATH_ENV: &str = "MODEL_ROUTER_MODELS";

/// Read a JSON document, or TOML when the extension is `.toml`.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn load_with_fallback<T: DeserializeOwned>(
    path: Option<&Path>,
    kind: &str,
    fallback: impl FnOnce() -> T,
) -> T {
    let Some(path) = path else {
        tracing::debug!("No {} document configured, using built-in defaults", kind);
        return fallback();
    };

    match read_document(path) {
        Ok(doc) => {
            tracing::info!(path = %path.display(), "Loaded {} document", kind);
            doc
        }
        Err(ConfigError::NotFound { .. }) => {
            tracing::info!(
                path = %path.display(),
                "{} document not found, using built-in defaults",
                kind
            );
            fallback()
        }
        Err(e) => {
            tracing::warn!(
                code = e.code(),
                "Failed to load {} document ({}), using built-in defaults",
                kind,
                e
            );
            fallback()
        }
    }
}

impl RoutingConfig {
    /// Strict load.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_document(path.as_ref())
    }

    /// Load from `path`, substituting defaults for anything missing or invalid.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        load_with_fallback(path, "routing config", Self::default)
    }
}

impl BackendListConfig {
    /// Strict load.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_document(path.as_ref())
    }

    /// Load from `path`, substituting [`BackendListConfig::builtin`] for
    /// anything missing or invalid.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        load_with_fallback(path, "backend list", Self::builtin)
    }
}

/// Where the engine's documents live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub routing_config_path: Option<PathBuf>,
    pub models_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Resolve document paths from `MODEL_ROUTER_CONFIG` / `MODEL_ROUTER_MODELS`.
    pub fn from_env() -> Self {
        Self {
            routing_config_path: std::env::var(ROUTING_CONFIG_PATH_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            models_path: std::env::var(MODELS_PATH_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Override paths with explicitly supplied ones (e.g. CLI flags).
    pub fn with_overrides(
        mut self,
        routing_config_path: Option<PathBuf>,
        models_path: Option<PathBuf>,
    ) -> Self {
        if routing_config_path.is_some() {
            self.routing_config_path = routing_config_path;
        }
        if models_path.is_some() {
            self.models_path = models_path;
        }
        self
    }

    /// Load both documents leniently.
    pub fn load(&self) -> (RoutingConfig, BackendListConfig) {
        (
            RoutingConfig::load_or_default(self.routing_config_path.as_deref()),
            BackendListConfig::load_or_default(self.models_path.as_deref()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FallbackStrategy;

    #[test]
    fn test_missing_file_is_not_found() {
        let err = RoutingConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_malformed_json_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("routing.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            RoutingConfig::from_path(&path),
            Err(ConfigError::Json { .. })
        ));
        assert_eq!(
            RoutingConfig::load_or_default(Some(&path)),
            RoutingConfig::default()
        );
    }

    #[test]
    fn test_toml_routing_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("routing.toml");
        std::fs::write(
            &path,
            r#"
free_model_preference = false
fallback_strategy = "strict"

[cache]
ttl_secs = 60
"#,
        )
        .unwrap();

        let cfg = RoutingConfig::from_path(&path).unwrap();
        assert!(!cfg.free_model_preference);
        assert_eq!(cfg.fallback_strategy, FallbackStrategy::Strict);
        assert_eq!(cfg.cache.ttl_secs, 60);
        assert_eq!(cfg.cache.max_entries, 1024);
    }

    #[test]
    fn test_backend_list_defaults_to_builtin() {
        assert_eq!(
            BackendListConfig::load_or_default(None),
            BackendListConfig::builtin()
        );

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(&path, r#"{"models": [{"model_name": "local-llm", "is_custom": true}]}"#)
            .unwrap();
        let list = BackendListConfig::load_or_default(Some(&path));
        assert_eq!(list.models.len(), 1);
        assert!(list.models[0].is_custom);
    }

    #[test]
    fn test_overrides_replace_only_given_paths() {
        let base = EngineConfig {
            routing_config_path: Some(PathBuf::from("a.json")),
            models_path: Some(PathBuf::from("b.json")),
        };
        let cfg = base.with_overrides(None, Some(PathBuf::from("c.json")));
        assert_eq!(cfg.routing_config_path, Some(PathBuf::from("a.json")));
        assert_eq!(cfg.models_path, Some(PathBuf::from("c.json")));
    }
}
