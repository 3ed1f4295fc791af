use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use influence_core::mcp_stdio::run_mcp_stdio;
use influence_core::{EngineConfig, InfluenceEngine};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: influence --mcp | influence <graph.csv|graph.json>...";

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries JSON output, logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,influence_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = EngineConfig::from_env();
    let engine = InfluenceEngine::from_config(config).context("Failed to configure engine")?;

    if args.iter().any(|a| a == "--mcp") {
        return run_mcp_stdio(engine).await;
    }

    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    for file in &args {
        let report = engine
            .import_file(Path::new(file))
            .await
            .with_context(|| format!("Failed to import {}", file))?;
        info!(file = %file, nodes_added = report.nodes_added, edges_added = report.edges_added, "imported");
    }

    let summary = json!({
        "analytics": engine.analytics(),
        "top_influencers": engine.top_influencers(None),
        "communities": engine.communities(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
