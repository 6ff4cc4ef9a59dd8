//! Shard Mirror CLI
//!
//! Repairs broken sharded image references in an HTML file.

use anyhow::{bail, Context};
use shard_mirror::{DocumentRepairer, HttpImageProber, ImageStatus, MirrorConfig, MirrorResolver};
use std::env;
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};

/// Main entry point for the shard-mirror tool
///
/// # Usage
/// ```bash
/// # Print the repaired document to stdout, default configuration
/// shard-mirror page.html
///
/// # Write to a file with a custom configuration
/// shard-mirror page.html fixed.html shard_mirror.yaml
/// ```
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(input_path) = args.first() else {
        bail!("usage: shard-mirror <input.html> [output.html] [config.yaml]");
    };
    let output_path = args.get(1);

    let config = match args.get(2) {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            MirrorConfig::from_file(path)
                .with_context(|| format!("failed to load configuration from {}", path))?
        }
        None => MirrorConfig::default(),
    };
    info!("  - Fallback prefixes: {:?}", config.fallback_prefixes);
    info!("  - Fallback roots: {:?}", config.fallback_roots);
    info!("  - Max attempts: {}", config.max_attempts);
    info!("  - Probe timeout: {} ms", config.probe_timeout_ms);

    let html = fs::read_to_string(input_path)
        .with_context(|| format!("failed to read {}", input_path))?;

    let config = Arc::new(config);
    let prober = Arc::new(HttpImageProber::new(&config)?);
    let repairer = DocumentRepairer::new(MirrorResolver::new(Arc::clone(&config), prober));

    let report = repairer.repair(&html).await?;
    for image in &report.images {
        match &image.status {
            ImageStatus::Resolved { url, attempts } => {
                info!("{} -> {} ({} probes)", image.original_url, url, attempts)
            }
            ImageStatus::Exhausted { attempts } => {
                warn!("{} unresolved after {} probes", image.original_url, attempts)
            }
            ImageStatus::Healthy | ImageStatus::Skipped => {}
        }
    }

    match output_path {
        Some(path) => {
            fs::write(path, &report.html).with_context(|| format!("failed to write {}", path))?;
            info!("Wrote repaired document to: {}", path);
        }
        None => print!("{}", report.html),
    }

    let stats = repairer.resolver().metrics().snapshot();
    info!("Metrics: {}", serde_json::to_string(&stats)?);
    Ok(())
}
