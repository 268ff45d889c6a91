use clap::{Parser, Subcommand};
use model_routing::ModelLevel;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Route prompts to LLM backends", long_about = None)]
pub struct Args {
    /// Routing config document, JSON or TOML (overrides MODEL_ROUTER_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend list document, JSON or TOML (overrides MODEL_ROUTER_MODELS)
    #[arg(long, global = true)]
    pub models: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pick a backend for a prompt
    Select {
        prompt: String,

        #[command(flatten)]
        context: ContextArgs,

        /// Do not search the free level first
        #[arg(long, default_value_t = false)]
        no_prefer_free: bool,

        /// Upper bound on cost per token (USD)
        #[arg(long)]
        max_cost: Option<f64>,

        /// Calling tool; fails when routing is disabled for it
        #[arg(long)]
        tool: Option<String>,
    },

    /// Classify a prompt without routing it
    Analyze {
        prompt: String,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Catalog and cache statistics
    Stats,

    /// Backends grouped by level
    Levels {
        /// Only show this level (free, junior, senior, executive)
        #[arg(long, value_parser = parse_level)]
        level: Option<ModelLevel>,
    },

    /// JSON Schemas of the config documents
    Schema,
}

/// Task context flags shared by `select` and `analyze`.
#[derive(clap::Args, Debug, Default)]
pub struct ContextArgs {
    /// Raw context object, e.g. '{"files": ["a.rs"], "error": "..."}'
    #[arg(long)]
    pub context: Option<String>,

    /// File involved in the task (repeatable)
    #[arg(long = "file")]
    pub files: Vec<String>,

    /// Error message to attach
    #[arg(long)]
    pub error: Option<String>,
}

fn parse_level(raw: &str) -> Result<ModelLevel, String> {
    ModelLevel::parse(raw).ok_or_else(|| format!("unknown level '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select() {
        let args = Args::try_parse_from([
            "route-cli",
            "--models",
            "models.json",
            "select",
            "fix the bug",
            "--file",
            "a.rs",
            "--file",
            "b.rs",
            "--max-cost",
            "0.00001",
            "--no-prefer-free",
        ])
        .unwrap();
        assert_eq!(args.models, Some(PathBuf::from("models.json")));
        match args.command {
            Command::Select {
                prompt,
                context,
                no_prefer_free,
                max_cost,
                tool,
            } => {
                assert_eq!(prompt, "fix the bug");
                assert_eq!(context.files, vec!["a.rs", "b.rs"]);
                assert!(no_prefer_free);
                assert_eq!(max_cost, Some(0.00001));
                assert!(tool.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_levels_filter() {
        let args = Args::try_parse_from(["route-cli", "levels", "--level", "Senior"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Levels {
                level: Some(ModelLevel::Senior)
            }
        ));
        assert!(Args::try_parse_from(["route-cli", "levels", "--level", "boss"]).is_err());
    }
}
