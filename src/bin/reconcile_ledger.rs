//! Audits the cached ledger fields and, with `--repair`, rewrites drifted ones.
//!
//! Exits non-zero when drift remains after the run.

use anyhow::Context;
use hopeconnect::{config::Config, database::setup_database, services::reconcile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let repair = std::env::args().skip(1).any(|arg| arg == "--repair");
    let db = setup_database(&config).await?;

    let report = if repair {
        reconcile::repair(&db).await
    } else {
        reconcile::audit(&db).await
    }
    .map_err(|e| anyhow::anyhow!("ledger reconciliation failed: {e}"))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to render report")?
    );

    if !report.is_clean() && !report.repaired {
        anyhow::bail!("ledger drift detected; rerun with --repair to fix cached totals");
    }
    if !report.duplicate_sponsorships.is_empty() {
        anyhow::bail!("orphans with more than one active sponsorship need manual review");
    }
    Ok(())
}
