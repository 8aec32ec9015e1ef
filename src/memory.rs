//! Day-to-day memory of past summaries.
//!
//! The history is a single pretty-printed JSON array of [`HistoryRecord`]s.
//! At most one record is kept per date and only the newest
//! [`MAX_HISTORY_ENTRIES`] survive a save. Recent records are fed back to the
//! model so the daily intro can point out continuity.

use crate::models::{DailySummary, HistoryRecord, StoryDigest};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use std::error::Error;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

pub const MAX_HISTORY_ENTRIES: usize = 30;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Handle to the history file.
#[derive(Debug, Clone)]
pub struct MemoryManager {
    path: PathBuf,
}

impl MemoryManager {
    /// Open the history file, creating its directory and an empty `[]`
    /// file when missing.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        if !fs::try_exists(&path).await? {
            fs::write(&path, "[]").await?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<HistoryRecord>, Box<dyn Error>> {
        let raw = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Records from the last `days` days, relative to the current time.
    pub async fn load_history(&self, days: i64) -> Vec<HistoryRecord> {
        self.load_history_at(days, Local::now().naive_local()).await
    }

    /// Records whose date is on or after `now - days`. Records with an
    /// unparseable date are skipped; an unreadable file yields nothing.
    pub async fn load_history_at(&self, days: i64, now: NaiveDateTime) -> Vec<HistoryRecord> {
        let history = match self.read_all().await {
            Ok(h) => h,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Error loading memory");
                return Vec::new();
            }
        };

        let cutoff = now - Duration::days(days);
        history
            .into_iter()
            .filter(|entry| match NaiveDate::parse_from_str(&entry.date, DATE_FORMAT) {
                Ok(date) => date.and_hms_opt(0, 0, 0).is_some_and(|d| d >= cutoff),
                Err(_) => false,
            })
            .collect()
    }

    /// Persist a lightweight copy of today's summary.
    pub async fn save_summary(&self, summary: &DailySummary) -> Result<(), Box<dyn Error>> {
        let today = Local::now().format(DATE_FORMAT).to_string();
        self.save_record(record_from_summary(summary, &today)).await
    }

    /// Insert `record`, replacing any existing record for the same date and
    /// keeping only the newest [`MAX_HISTORY_ENTRIES`].
    ///
    /// # Arguments
    ///
    /// * `record` - The day's digest; its `date` is the replacement key
    ///
    /// # Returns
    ///
    /// An error if the history file cannot be read or rewritten.
    #[instrument(level = "info", skip_all, fields(date = %record.date))]
    pub async fn save_record(&self, record: HistoryRecord) -> Result<(), Box<dyn Error>> {
        let mut history = self.read_all().await?;
        let date = record.date.clone();
        history.retain(|h| h.date != record.date);
        history.push(record);
        if history.len() > MAX_HISTORY_ENTRIES {
            let excess = history.len() - MAX_HISTORY_ENTRIES;
            history.drain(..excess);
        }

        let json = serde_json::to_string_pretty(&history)?;
        fs::write(&self.path, json).await?;
        info!(%date, entries = history.len(), "Summary saved to memory");
        Ok(())
    }

    /// History from the last `days` days formatted as model context.
    pub async fn context_string(&self, days: i64) -> String {
        format_context(&self.load_history(days).await)
    }
}

pub fn record_from_summary(summary: &DailySummary, date: &str) -> HistoryRecord {
    HistoryRecord {
        date: date.to_string(),
        intro: summary.intro.clone(),
        top_stories: summary
            .top_stories
            .iter()
            .map(|s| StoryDigest {
                title: s.title.clone(),
                summary: s.summary.clone(),
            })
            .collect(),
    }
}

pub fn format_context(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "No recent history available.".to_string();
    }

    let mut context = String::from("Recent AI News Context:\n");
    for entry in records {
        let _ = writeln!(context, "--- {} ---", entry.date);
        let _ = writeln!(context, "Overview: {}", entry.intro);
        for story in &entry.top_stories {
            let _ = writeln!(context, "- {}: {}", story.title, story.summary);
        }
        context.push('\n');
    }
    context
}
