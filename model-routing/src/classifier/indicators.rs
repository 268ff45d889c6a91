//! Complexity indicators extracted from prompt text and task context.
//!
//! Every indicator carries its own weight; the classifier folds them into a
//! single weighted average.

use crate::context::TaskContext;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Maximum evidence samples kept per indicator.
const MAX_EVIDENCE: usize = 5;

/// One signal contributing to the complexity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityIndicator {
    pub name: String,
    pub weight: f64,
    /// Signed contribution before weighting
    pub score: f64,
    /// Sample of matched fragments
    pub evidence: Vec<String>,
}

impl ComplexityIndicator {
    fn new(name: &str, weight: f64, score: f64, evidence: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            weight,
            score,
            evidence,
        }
    }
}

/// A weighted family of regexes.
struct LexicalBucket {
    name: &'static str,
    weight: f64,
    impact: f64,
    patterns: Vec<Regex>,
}

impl LexicalBucket {
    fn new(name: &'static str, weight: f64, impact: f64, sources: &[&str]) -> Self {
        let patterns = sources
            .iter()
            .map(|p| Regex::new(p).expect("lexical bucket regex should compile"))
            .collect();
        Self {
            name,
            weight,
            impact,
            patterns,
        }
    }

    fn indicator(&self, text: &str) -> Option<ComplexityIndicator> {
        let (matches, evidence) = count_matches(&self.patterns, text);
        if matches == 0 {
            return None;
        }
        let magnitude = matches as f64 * self.weight * self.impact.abs();
        let score = if self.impact < 0.0 {
            -magnitude
        } else {
            magnitude
        };
        Some(ComplexityIndicator::new(
            self.name,
            self.weight,
            score,
            evidence,
        ))
    }
}

/// Buckets matched against the lower-cased prompt.
static LEXICAL_BUCKETS: LazyLock<Vec<LexicalBucket>> = LazyLock::new(|| {
    vec![
        LexicalBucket::new(
            "simple_keywords",
            0.3,
            -0.2,
            &[
                r"\b(?:simple|basic|easy|trivial|straightforward)\b",
                r"\b(?:typo|typos|spelling|misspell\w*)\b",
                r"\b(?:small|simple|minor|tiny|quick|trivial)\s+(?:fix|change|typo|tweak|edit|update|bug)\b",
                r"\bhelp me\b",
                r"\b(?:fix|change|rename|update)\s+(?:this|that|the)\b",
                r"\b(?:quick|small|minor|tiny)\b",
                r"\b(?:hello world|one[- ]liner|single line)\b",
                r"\bjust\b",
            ],
        ),
        LexicalBucket::new(
            "moderate_keywords",
            0.4,
            0.1,
            &[
                r"\b(?:implement|create|build|add|write|update|modify|extend|convert)\b",
                r"\b(?:function|method|class|module|component|endpoint|api|script|tests?)\b",
                r"\b(?:refactor|validate|validation|parse|parser|integrate)\b",
                r"\b(?:several|multiple|a few)\b",
            ],
        ),
        LexicalBucket::new(
            "complex_keywords",
            0.6,
            0.3,
            &[
                r"\b(?:design|system|algorithm|performance|optimi[sz]e|concurren\w*|database|schema|migration|pipeline|framework)\b",
                r"\b(?:async|asynchronous|parallel|thread\w*|cach\w+|queue)\b",
                r"\b(?:security|authentication|authori[sz]ation|encryption)\b",
                r"\b(?:integration|multi-\w+)\b",
            ],
        ),
        LexicalBucket::new(
            "expert_keywords",
            0.8,
            0.5,
            &[
                r"\b(?:distributed|microservices?|architecture|scalab\w+|high availability|fault[- ]toleran\w+)\b",
                r"\b(?:consensus|sharding|replication|kubernetes|orchestration|load balanc\w+)\b",
                r"\b(?:machine learning|neural network|compiler|cryptograph\w+|formal verification|real[- ]time)\b",
                r"\b(?:enterprise|production[- ]grade|mission[- ]critical)\b",
            ],
        ),
    ]
});

/// Source-code syntax matched against the original-case prompt.
static TECHNICAL_SYNTAX: LazyLock<LexicalBucket> = LazyLock::new(|| {
    LexicalBucket::new(
        "technical_syntax",
        0.3,
        0.2,
        &[
            r"\b[A-Z][A-Z0-9_]{2,}\b",
            r"\b(?:def|fn|func|function)\s+\w+\s*\(",
            r"\b(?:class|struct|interface|trait|enum)\s+[A-Z]\w*",
            r#"(?m)^\s*(?:import\s+\w+|from\s+\w[\w.]*\s+import|use\s+\w+(?:::\w+)+|#include\s*[<"])"#,
            r"\b\w+\.\w+\(",
        ],
    )
});

static CODE_DENSITY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bfor\s+\w+\s+in\b",
        r"\bfor\s*\(",
        r"\bwhile\s*\(",
        r"(?m)^\s*while\b",
        r"\bif\s*\(",
        r"(?m)^\s*(?:if|elif)\b.*:\s*$",
        r"\b(?:try|catch|except|finally)\b\s*[:{(]",
        r"\basync\s+(?:def|fn|function)\b",
        r"\bawait\b",
        r"\byield\b",
        r"\blambda\b",
        r"=>",
        r"\|[\w\s,]*\|\s*[{\w]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("code density regex should compile"))
    .collect()
});

/// Prompt length brackets: (minimum chars, label, delta).
///
/// The highest bracket whose minimum the length reaches wins.
const LENGTH_BRACKETS: [(usize, &str, f64); 4] = [
    (0, "short", -0.1),
    (100, "medium", 0.0),
    (500, "long", 0.2),
    (2000, "very_long", 0.4),
];

/// Per-extension complexity contribution.
const FILE_TYPE_COMPLEXITY: &[(&str, f64)] = &[
    (".py", 0.2),
    (".js", 0.2),
    (".jsx", 0.25),
    (".ts", 0.3),
    (".tsx", 0.3),
    (".java", 0.3),
    (".go", 0.3),
    (".rb", 0.2),
    (".php", 0.2),
    (".sh", 0.15),
    (".sql", 0.3),
    (".rs", 0.4),
    (".c", 0.4),
    (".h", 0.4),
    (".hpp", 0.4),
    (".cpp", 0.5),
    (".json", 0.05),
    (".yaml", 0.05),
    (".yml", 0.05),
    (".toml", 0.05),
    (".html", 0.1),
    (".css", 0.1),
    (".md", 0.0),
    (".txt", 0.0),
];

const UNKNOWN_FILE_TYPE_COMPLEXITY: f64 = 0.1;

fn count_matches(patterns: &[Regex], text: &str) -> (usize, Vec<String>) {
    let mut count = 0;
    let mut evidence = Vec::new();
    for re in patterns {
        for m in re.find_iter(text) {
            count += 1;
            if evidence.len() < MAX_EVIDENCE {
                evidence.push(m.as_str().to_string());
            }
        }
    }
    (count, evidence)
}

/// Keyword bucket and technical-syntax indicators.
pub fn lexical_indicators(prompt: &str, lowered: &str) -> Vec<ComplexityIndicator> {
    let mut out: Vec<ComplexityIndicator> = LEXICAL_BUCKETS
        .iter()
        .filter_map(|bucket| bucket.indicator(lowered))
        .collect();
    if let Some(technical) = TECHNICAL_SYNTAX.indicator(prompt) {
        out.push(technical);
    }
    out
}

/// Length bracket indicator; `None` for the neutral bracket.
pub fn length_indicator(prompt: &str) -> Option<ComplexityIndicator> {
    let len = prompt.chars().count();
    let (_, label, delta) = LENGTH_BRACKETS
        .iter()
        .rev()
        .find(|(min, _, _)| len >= *min)
        .copied()
        .unwrap_or(LENGTH_BRACKETS[0]);
    if delta == 0.0 {
        return None;
    }
    Some(ComplexityIndicator::new(
        "prompt_length",
        0.2,
        delta,
        vec![format!("{} chars ({})", len, label)],
    ))
}

/// Control-flow density of code embedded in the prompt.
pub fn code_density_indicator(prompt: &str) -> Option<ComplexityIndicator> {
    let (count, evidence) = count_matches(&CODE_DENSITY_PATTERNS, prompt);
    if count == 0 {
        return None;
    }
    Some(ComplexityIndicator::new(
        "code_density",
        0.4,
        count as f64 * 0.05,
        evidence,
    ))
}

/// Complexity contribution of a single file extension.
pub fn file_type_complexity(extension: &str) -> f64 {
    FILE_TYPE_COMPLEXITY
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, c)| *c)
        .unwrap_or(UNKNOWN_FILE_TYPE_COMPLEXITY)
}

/// Indicators derived from structured context.
pub fn context_indicators(context: &TaskContext) -> Vec<ComplexityIndicator> {
    let mut out = Vec::new();

    let file_types = context.effective_file_types();
    if !file_types.is_empty() {
        let total: f64 = file_types.iter().map(|t| file_type_complexity(t)).sum();
        out.push(ComplexityIndicator::new(
            "file_type_complexity",
            0.3,
            total,
            file_types.iter().take(MAX_EVIDENCE).cloned().collect(),
        ));
    }

    if context.has_error {
        out.push(ComplexityIndicator::new(
            "error_context",
            0.4,
            0.2,
            context.errors.iter().take(MAX_EVIDENCE).cloned().collect(),
        ));
    }

    if let Some(code) = &context.existing_code {
        let size = code.chars().count();
        out.push(ComplexityIndicator::new(
            "existing_code_size",
            0.3,
            (size as f64 / 10_000.0).min(0.3),
            vec![format!("{} chars", size)],
        ));
    }

    let file_count = context.file_count();
    if file_count > 1 {
        out.push(ComplexityIndicator::new(
            "multi_file",
            0.2,
            (file_count as f64 * 0.05).min(0.3),
            vec![format!("{} files", file_count)],
        ));
    }

    out
}
