//! Task-type scoring
//!
//! Each type scores `(keyword_hits × 1.0 + pattern_hits × 2.0) × weight`,
//! then context nudges apply. Exact ties resolve through [`TIE_BREAK_ORDER`].

use crate::context::TaskContext;
use crate::types::TaskType;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

const KEYWORD_SCORE: f64 = 1.0;
const PATTERN_SCORE: f64 = 2.0;

/// Earlier entries win exact score ties.
pub const TIE_BREAK_ORDER: [TaskType; 7] = [
    TaskType::Debugging,
    TaskType::CodeReview,
    TaskType::CodeGeneration,
    TaskType::Planning,
    TaskType::Analysis,
    TaskType::Documentation,
    TaskType::General,
];

struct TypeProfile {
    task_type: TaskType,
    weight: f64,
    keywords: &'static [&'static str],
    patterns: Vec<Regex>,
}

impl TypeProfile {
    fn new(
        task_type: TaskType,
        weight: f64,
        keywords: &'static [&'static str],
        patterns: &[&str],
    ) -> Self {
        Self {
            task_type,
            weight,
            keywords,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("task type regex should compile"))
                .collect(),
        }
    }

    fn score(&self, words: &HashSet<&str>, lowered: &str) -> f64 {
        let keyword_hits = self.keywords.iter().filter(|k| words.contains(*k)).count();
        let pattern_hits: usize = self
            .patterns
            .iter()
            .map(|re| re.find_iter(lowered).count())
            .sum();
        (keyword_hits as f64 * KEYWORD_SCORE + pattern_hits as f64 * PATTERN_SCORE) * self.weight
    }
}

static PROFILES: LazyLock<Vec<TypeProfile>> = LazyLock::new(|| {
    vec![
        TypeProfile::new(
            TaskType::CodeGeneration,
            1.0,
            &[
                "create", "write", "implement", "build", "generate", "develop", "code",
                "function", "class", "script", "program", "add",
            ],
            &[
                r"\b(?:write|create|implement|build|generate)\s+(?:a|an|the|some)\b",
                r"\bcode\s+(?:for|that|to)\b",
            ],
        ),
        TypeProfile::new(
            TaskType::CodeReview,
            1.0,
            &[
                "review", "check", "audit", "inspect", "critique", "feedback", "quality",
                "improve", "lint", "smell",
            ],
            &[
                r"\breview\s+(?:my|this|the|our)\b",
                r"\b(?:code|pull request|pr)\s+review\b",
                r"\bis\s+this\s+code\b",
            ],
        ),
        TypeProfile::new(
            TaskType::Debugging,
            1.0,
            &[
                "fix", "bug", "error", "debug", "issue", "broken", "crash", "fail", "failing",
                "exception", "traceback", "wrong", "typo",
            ],
            &[
                r"\b(?:fix|debug|solve|resolve)\s+(?:this|the|a|an|my)\b",
                r"\b(?:not working|doesn't work|does not work)\b",
                r"\b\w*(?:error|exception):",
                r"\bstack\s*trace\b",
            ],
        ),
        TypeProfile::new(
            TaskType::Documentation,
            0.8,
            &[
                "document", "documentation", "docs", "comment", "comments", "readme",
                "docstring", "explain", "describe", "tutorial", "guide",
            ],
            &[
                r"\b(?:write|add|update)\s+(?:the\s+)?(?:docs|documentation|comments|docstrings?|readme)\b",
                r"\bexplain\s+(?:how|what|why|this)\b",
            ],
        ),
        TypeProfile::new(
            TaskType::Analysis,
            0.9,
            &[
                "analyze", "analyse", "analysis", "evaluate", "compare", "assess",
                "investigate", "performance", "metrics", "benchmark", "understand", "why",
            ],
            &[
                r"\b(?:analy[sz]e|evaluate|compare|assess)\s+(?:the|this|these|our)\b",
                r"\bwhat\s+(?:is|are)\s+the\s+(?:difference|tradeoffs?|pros)\b",
            ],
        ),
        TypeProfile::new(
            TaskType::Planning,
            1.1,
            &[
                "design", "plan", "architecture", "strategy", "roadmap", "structure",
                "organize", "approach", "migrate", "scale",
            ],
            &[
                r"\b(?:design|plan|architect)\s+(?:a|an|the|our)\b",
                r"\bhow\s+should\s+(?:i|we)\b",
            ],
        ),
        TypeProfile::new(
            TaskType::General,
            0.5,
            &["help", "question", "what", "how", "tell", "hello", "thanks"],
            &[r"^\s*(?:hi|hello|hey)\b", r"\bcan you\b"],
        ),
    ]
});

/// Fixed complexity adjustment applied once the task type is known.
pub fn complexity_adjustment(task_type: TaskType) -> f64 {
    match task_type {
        TaskType::CodeGeneration => 0.1,
        TaskType::CodeReview => 0.1,
        TaskType::Debugging => 0.2,
        TaskType::Documentation => -0.1,
        TaskType::Analysis => 0.15,
        TaskType::Planning => 0.2,
        TaskType::General => 0.0,
    }
}

/// Score every task type for a lower-cased prompt.
pub fn score_task_types(lowered: &str, context: Option<&TaskContext>) -> BTreeMap<TaskType, f64> {
    let words: HashSet<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();

    let mut scores: BTreeMap<TaskType, f64> = PROFILES
        .iter()
        .map(|p| (p.task_type, p.score(&words, lowered)))
        .collect();

    if let Some(ctx) = context {
        if ctx.has_error {
            *scores.entry(TaskType::Debugging).or_default() += 2.0;
        }
        if ctx.file_count() > 1 {
            *scores.entry(TaskType::Analysis).or_default() += 1.0;
            *scores.entry(TaskType::Planning).or_default() += 1.0;
        }
    }

    scores
}

/// Highest-scoring type; `General` when nothing scored.
pub fn select_task_type(scores: &BTreeMap<TaskType, f64>) -> TaskType {
    let best = scores.values().copied().fold(0.0_f64, f64::max);
    if best <= 0.0 {
        return TaskType::General;
    }
    TIE_BREAK_ORDER
        .iter()
        .copied()
        .find(|t| {
            scores
                .get(t)
                .is_some_and(|s| (s - best).abs() < f64::EPSILON * 16.0)
        })
        .unwrap_or(TaskType::General)
}
