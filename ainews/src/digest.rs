use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::item::NewsItem;

/// Heading used for items that never received a category.
pub const OTHER_CATEGORY: &str = "Other";

/// Group ranked items by category. Groups appear in the order their first
/// item appears; inside a group the rank order is kept.
pub fn group_by_category(items: &[NewsItem]) -> Vec<(&str, Vec<&NewsItem>)> {
    let mut groups: Vec<(&str, Vec<&NewsItem>)> = Vec::new();
    for item in items {
        let category = item.category.as_deref().unwrap_or(OTHER_CATEGORY);
        match groups.iter_mut().find(|(name, _)| *name == category) {
            Some((_, members)) => members.push(item),
            None => groups.push((category, vec![item])),
        }
    }
    groups
}

/// Render the digest as Markdown.
pub fn render_markdown(generated_at: NaiveDateTime, items: &[NewsItem]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# AI News Digest {}", generated_at.format("%Y-%m-%d"));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Generated at {} · {} items",
        generated_at.format("%H:%M:%S"),
        items.len()
    );

    for (category, members) in group_by_category(items) {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {} ({})", category, members.len());

        for item in members {
            let _ = writeln!(out);
            let _ = writeln!(out, "### [{}]({})", item.display_title(), item.url);
            let _ = writeln!(out);

            let mut meta = vec![format!("*{}*", item.title), item.source.clone()];
            if item.score > 0 || item.comments_count > 0 {
                meta.push(format!("{} points, {} comments", item.score, item.comments_count));
            }
            meta.push(format!("importance {}/5", item.importance_score));
            let _ = writeln!(out, "{}", meta.join(" · "));

            if let Some(summary) = &item.summary {
                let _ = writeln!(out);
                let _ = writeln!(out, "{}", summary);
            }
            if !item.key_points.is_empty() {
                let _ = writeln!(out);
                for point in &item.key_points {
                    let _ = writeln!(out, "- {}", point);
                }
            }
            if !item.tags.is_empty() {
                let tags: Vec<String> = item.tags.iter().map(|t| format!("`{}`", t)).collect();
                let _ = writeln!(out);
                let _ = writeln!(out, "{}", tags.join(" "));
            }
        }
    }
    out
}

/// Write `<dir>/<date>.md` and, when asked, `<dir>/<date>.json`.
/// Returns the Markdown path.
pub async fn write_digest(
    dir: &Path,
    generated_at: NaiveDateTime,
    items: &[NewsItem],
    write_json: bool,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let stem = generated_at.format("%Y-%m-%d").to_string();
    let md_path = dir.join(format!("{}.md", stem));
    tokio::fs::write(&md_path, render_markdown(generated_at, items))
        .await
        .with_context(|| format!("Failed to write digest: {}", md_path.display()))?;
    info!("digest: wrote {}", md_path.display());

    if write_json {
        let json_path = dir.join(format!("{}.json", stem));
        let body = serde_json::to_string_pretty(items).context("Failed to serialize items")?;
        tokio::fs::write(&json_path, body)
            .await
            .with_context(|| format!("Failed to write digest: {}", json_path.display()))?;
        info!("digest: wrote {}", json_path.display());
    }

    Ok(md_path)
}
