//! Structured task context
//!
//! Callers used to pass an arbitrary map; this record keeps only the keys the
//! classifier reads (`files`, `file_types`, `error`/`errors`,
//! `existing_code`) and validates them once at the boundary.

use serde::Serialize;
use serde_json::Value;

/// Optional context accompanying a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskContext {
    /// Paths of files involved in the task
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    /// File extensions (with leading dot, lower-cased)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_types: Vec<String>,

    /// Error messages supplied by the caller
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    /// Whether an `error`/`errors` key was present at all
    pub has_error: bool,

    /// Source the task operates on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_code: Option<String>,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_file_types<I, S>(mut self, file_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_types = file_types
            .into_iter()
            .map(|t| normalize_extension(&t.into()))
            .collect();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self.has_error = true;
        self
    }

    pub fn with_existing_code(mut self, code: impl Into<String>) -> Self {
        self.existing_code = Some(code.into());
        self
    }

    /// Build a context from a loosely-typed JSON object.
    ///
    /// Unknown keys are ignored. `files` entries may be strings or objects with
    /// a `path`/`name` field; `error` and `errors` may be a string or an array,
    /// and either key marks the context as erroring whatever its value.
    /// Non-object input yields an empty context.
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            tracing::debug!("ignoring non-object task context");
            return Self::default();
        };

        let files: Vec<String> = obj
            .get("files")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.clone()),
                        Value::Object(o) => o
                            .get("path")
                            .or_else(|| o.get("name"))
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let file_types: Vec<String> = obj
            .get("file_types")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(normalize_extension)
                    .collect()
            })
            .unwrap_or_default();

        let mut errors = Vec::new();
        let mut has_error = false;
        for key in ["error", "errors"] {
            match obj.get(key) {
                None => {}
                Some(Value::Null) => has_error = true,
                Some(Value::String(s)) => {
                    has_error = true;
                    errors.push(s.clone());
                }
                Some(Value::Array(items)) => {
                    has_error = true;
                    errors.extend(items.iter().map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    }));
                }
                Some(other) => {
                    has_error = true;
                    errors.push(other.to_string());
                }
            }
        }

        let existing_code = obj
            .get("existing_code")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            files,
            file_types,
            errors,
            has_error,
            existing_code,
        }
    }

    /// Number of files named by the context.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Declared file types, or extensions inferred from `files` when none were
    /// declared.
    pub fn effective_file_types(&self) -> Vec<String> {
        if !self.file_types.is_empty() {
            return self.file_types.clone();
        }
        self.files
            .iter()
            .filter_map(|f| {
                std::path::Path::new(f)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(normalize_extension)
            })
            .collect()
    }

    /// Canonical serialization used for cache keys.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim().to_ascii_lowercase();
    if trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{}", trimmed)
    }
}
