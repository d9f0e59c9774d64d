//! Reconciler CLI: reads a JSON run file (array of topics), prints reconciled topics as JSON.
//!
//! Usage: `resource-reconciler <run.json>`; `-` or no argument reads stdin.

use std::io::Read;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use resource_reconciler::{ReconcileConfig, Reconciler, TopicInput};

/// Compact logs to stderr; `RUST_LOG` wins over the default filter.
fn enable_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reconcile=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn read_input(arg: Option<String>) -> Result<String> {
    match arg.as_deref() {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading run file from stdin")?;
            Ok(buf)
        }
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("reading run file {path}"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; RECONCILE_* overrides can live there.
    let _ = dotenvy::dotenv();
    enable_tracing();

    let cfg = ReconcileConfig::from_toml()?;
    let raw = read_input(std::env::args().nth(1))?;
    let topics: Vec<TopicInput> = serde_json::from_str(&raw).context("parsing run file")?;

    info!(
        target: "reconcile",
        topics = topics.len(),
        validate_urls = cfg.validate_urls,
        strict_theme = cfg.theme_filter_strict,
        "run started"
    );

    let mut reconciler = Reconciler::with_http(cfg)?;
    let out = reconciler.reconcile_run(topics).await;

    let json = serde_json::to_string_pretty(&out).context("serializing result")?;
    println!("{json}");
    Ok(())
}
