//! HTML report of failed comparisons.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use tracing::info;

use crate::types::MismatchResult;
use crate::Result;

pub const INDEX_FILE: &str = "index.html";

/// Writes the expected/actual/diff PNGs for every mismatch plus an
/// `index.html` table linking them, and returns the index path.
///
/// Does nothing and returns `None` when there are no mismatches.
pub async fn generate_report(
    report_dir: &Path,
    mismatches: &[MismatchResult],
) -> Result<Option<PathBuf>> {
    if mismatches.is_empty() {
        return Ok(None);
    }

    tokio::fs::create_dir_all(report_dir).await?;

    let mut writes = Vec::with_capacity(mismatches.len() * 3);
    let mut rows = String::new();
    for mismatch in mismatches {
        for (kind, bytes) in [
            ("expected", &mismatch.expected),
            ("actual", &mismatch.actual),
            ("diff", &mismatch.diff),
        ] {
            let path = report_dir.join(artifact_name(&mismatch.name, kind));
            writes.push(tokio::fs::write(path, bytes));
        }
        rows.push_str(&row(&mismatch.name));
    }
    try_join_all(writes).await?;

    let index = report_dir.join(INDEX_FILE);
    tokio::fs::write(&index, render_index(&rows)).await?;
    info!(
        "Wrote report for {} mismatch(es) to {}",
        mismatches.len(),
        index.display()
    );
    Ok(Some(index))
}

fn artifact_name(name: &str, kind: &str) -> String {
    format!("{name}-{kind}.png")
}

fn row(name: &str) -> String {
    let img = |kind: &str| {
        format!(
            "<img src=\"./{}\">",
            escape_html(&urlencoding::encode(&artifact_name(name, kind)))
        )
    };
    format!(
        "
      <tr>
        <th>{}</th>
        <th>{}</th>
        <th>{}</th>
        <th>{}</th>
      </tr>",
        escape_html(name),
        img("expected"),
        img("actual"),
        img("diff"),
    )
}

fn render_index(rows: &str) -> String {
    format!(
        "<!doctype html>
<meta charset=\"utf-8\">
<table>
  <thead>
    <tr>
      <th>Test name</th>
      <th>Expected</th>
      <th>Actual</th>
      <th>Diff</th>
    </tr>
  </thead>
  <tbody>{rows}
  </tbody>
</table>
"
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
