use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use fx_grid_engine::config::Config;
use fx_grid_engine::replay::{run_replay, ReplayDocument};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        bail!("usage: fx-grid-engine <replay.json>");
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading replay {path}"))?;
    let doc = ReplayDocument::from_json_str(&raw).with_context(|| format!("parsing replay {path}"))?;
    info!(path = %path, sessions = doc.sessions.len(), "Replay loaded");

    for line in run_replay(cfg, doc).await? {
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}
