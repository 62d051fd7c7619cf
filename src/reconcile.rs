//! Detection of golden images no capture produced this run.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{error, info};

use crate::types::Mode;
use crate::Result;

/// Lists files in `dir` that are not in `produced`, sorted by name.
///
/// In update mode the stale files are deleted. A missing directory has no
/// stale files.
pub async fn reconcile_screenshots(
    dir: &Path,
    produced: &HashSet<String>,
    mode: Mode,
) -> Result<Vec<String>> {
    let mut stale = list_files(dir)
        .await?
        .into_iter()
        .filter(|name| !produced.contains(name))
        .collect::<Vec<_>>();
    stale.sort();

    if stale.is_empty() {
        return Ok(stale);
    }

    match mode {
        Mode::Update => {
            for name in &stale {
                tokio::fs::remove_file(dir.join(name)).await?;
            }
            info!("Deleted {} outdated screenshots", stale.len());
        }
        Mode::Check => {
            error!(
                "Found {} outdated screenshots: {}",
                stale.len(),
                stale.join(", ")
            );
        }
    }
    Ok(stale)
}

async fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}
