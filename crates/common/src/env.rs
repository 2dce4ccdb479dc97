//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::info;

/// Ensure the data directories the server writes into exist.
pub async fn ensure_dirs(dirs: &[&str]) -> anyhow::Result<()> {
    for dir in dirs {
        if tokio::fs::metadata(dir).await.is_err() {
            info!(%dir, "creating missing data directory");
        }
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {dir}: {e}"))?;
    }
    Ok(())
}
