mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Args, Command, ContextArgs};
use model_routing::{
    BackendListConfig, EngineConfig, ModelLevel, RoutingConfig, RoutingEngine, TaskContext,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let engine_config = EngineConfig::from_env().with_overrides(args.config, args.models);
    let build_engine = || {
        let engine = RoutingEngine::from_engine_config(&engine_config);
        info!(
            config = ?engine_config.routing_config_path,
            models = ?engine_config.models_path,
            "Routing engine ready"
        );
        engine
    };

    match args.command {
        Command::Select {
            prompt,
            context,
            no_prefer_free,
            max_cost,
            tool,
        } => {
            let engine = build_engine();
            if let Some(tool) = tool.as_deref() {
                if !engine.tool_routing_enabled(tool) {
                    bail!("routing is disabled for tool '{}'", tool);
                }
            }
            let ctx = build_context(&context)?;
            let decision = engine
                .select(&prompt, ctx.as_ref(), !no_prefer_free, max_cost)
                .with_context(|| format!("failed to route prompt ({} chars)", prompt.len()))?;
            print_json(&decision)
        }
        Command::Analyze { prompt, context } => {
            let ctx = build_context(&context)?;
            let analysis = build_engine().analyze(&prompt, ctx.as_ref())?;
            print_json(&analysis)
        }
        Command::Stats => print_json(&build_engine().stats()?),
        Command::Levels { level } => {
            let engine = build_engine();
            let levels = match level {
                Some(level) => vec![level],
                None => ModelLevel::ALL.to_vec(),
            };
            let mut grouped = BTreeMap::new();
            for level in levels {
                grouped.insert(level, engine.by_level(level)?);
            }
            print_json(&grouped)
        }
        Command::Schema => print_json(&serde_json::json!({
            "routing_config": schemars::schema_for!(RoutingConfig),
            "backend_list": schemars::schema_for!(BackendListConfig),
        })),
    }
}

/// Merge `--context` JSON with the `--file` / `--error` shorthands.
fn build_context(args: &ContextArgs) -> Result<Option<TaskContext>> {
    let mut ctx = match args.context.as_deref() {
        Some(raw) => {
            let value: serde_json::Value =
                serde_json::from_str(raw).context("--context is not valid JSON")?;
            Some(TaskContext::from_json(&value))
        }
        None => None,
    };

    if !args.files.is_empty() {
        let base = ctx.take().unwrap_or_default();
        let mut files = base.files.clone();
        files.extend(args.files.iter().cloned());
        ctx = Some(base.with_files(files));
    }
    if let Some(error) = &args.error {
        ctx = Some(ctx.take().unwrap_or_default().with_error(error.clone()));
    }
    Ok(ctx)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
