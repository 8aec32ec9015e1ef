//! JSON snapshot of a run.
//!
//! The serialized [`DailySummary`] is written next to the HTML report so other
//! tools can consume the ranked stories without scraping HTML:
//!
//! ```text
//! output/
//! └── ai_news_report_20261019_080012.json
//! ```

use super::{REPORT_PREFIX, file_stamp};
use crate::models::DailySummary;
use chrono::Local;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `summary` as pretty-printed JSON into `dir` and return the path.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn write_summary(dir: &Path, summary: &DailySummary) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(summary)?;

    info!("Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = dir.join(format!("{}{}.json", REPORT_PREFIX, file_stamp(&Local::now())));
    info!(path = %path.display(), "Writing JSON");
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON snapshot");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Story;

    #[tokio::test]
    async fn test_write_summary_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let summary = DailySummary {
            title: "AI Daily Insight (2026-10-19)".to_string(),
            intro: "中文也可以".to_string(),
            top_stories: vec![Story {
                title: "One".to_string(),
                ..Default::default()
            }],
            categories: DailySummary::empty_categories(),
        };

        let path = write_summary(&tmp.path().join("nested"), &summary).await.unwrap();
        assert_eq!(path.extension().unwrap(), "json");

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("中文也可以"));
        let back: DailySummary = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.top_stories[0].title, "One");
        assert_eq!(back.categories.len(), 5);
    }
}
