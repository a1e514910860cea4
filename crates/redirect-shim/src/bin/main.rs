//! redirect-shim CLI
//!
//! `serve` runs the compatibility shim eagerly; `rewrite` applies the legacy
//! URL rewrite to a JSON artifact with a fixed target.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redirect_core::{CodeArtifact, LdcTransform, LegacyUrlMapper, StaticRoot, TransformUnit};
use redirect_shim::config::{ENV_API_ROOT, ENV_TIMEOUT_SECS};
use redirect_shim::{ShimConfig, ShimHandle};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "redirect-shim", about = "Legacy skin API compatibility shim")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the shim and serve until interrupted
    Serve {
        /// Root of the Yggdrasil-compatible backend
        #[arg(long, env = ENV_API_ROOT)]
        api_root: String,

        /// Outbound request timeout in seconds
        #[arg(long, env = ENV_TIMEOUT_SECS, default_value_t = 10)]
        timeout_secs: u64,
    },

    /// Redirect legacy skin URLs inside a JSON artifact
    Rewrite {
        /// Artifact to rewrite
        input: PathBuf,

        /// Base URL legacy literals are pointed at
        #[arg(long)]
        target: String,

        /// Where to write the rewritten artifact (defaults to the input path)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Legacy endpoint to match as `host[/path-prefix]` (repeatable, replaces the defaults)
        #[arg(long = "endpoint")]
        endpoints: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Serve {
            api_root,
            timeout_secs,
        } => serve(api_root, timeout_secs).await,
        Command::Rewrite {
            input,
            target,
            output,
            endpoints,
        } => rewrite(input, target, output, endpoints),
    }
}

async fn serve(api_root: String, timeout_secs: u64) -> Result<()> {
    let config = ShimConfig::new(api_root)?.with_timeout(Duration::from_secs(timeout_secs));
    tracing::info!(api_root = config.api_root(), "Starting shim");

    let handle = ShimHandle::new(config);
    let port = tokio::task::spawn_blocking(move || handle.ensure_started()).await??;
    println!("http://127.0.0.1:{port}");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}

fn rewrite(
    input: PathBuf,
    target: String,
    output: Option<PathBuf>,
    endpoints: Vec<String>,
) -> Result<()> {
    let data = std::fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
    let artifact = CodeArtifact::from_json(&data)?;

    let root = StaticRoot(target);
    let mapper = if endpoints.is_empty() {
        LegacyUrlMapper::new(root)
    } else {
        LegacyUrlMapper::with_endpoints(root, &endpoints[..])
    };
    let unit = LdcTransform::new(mapper);

    let mut modified = 0usize;
    let name = artifact.name.clone();
    let rewritten = unit.transform(&name, &artifact, &mut || modified += 1)?;
    match rewritten {
        Some(rewritten) => {
            let path = output.unwrap_or(input);
            std::fs::write(&path, rewritten.to_json()?)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(artifact = %name, modified, path = %path.display(), "Artifact rewritten");
        }
        None => {
            tracing::info!(artifact = %name, "No legacy literals found, artifact left as is");
        }
    }

    Ok(())
}
