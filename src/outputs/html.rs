//! HTML renditions of the daily summary.
//!
//! Two layouts are produced from the same [`DailySummary`]:
//!
//! - the full report (`ai_news_report_*.html`), which is also the email body
//! - a narrow, inline-styled post for pasting into the WeChat editor
//!   (`wechat_post_*.html`)
//!
//! Both are askama templates under `templates/`; model- and feed-provided
//! text is escaped by the template engine.

use super::{REPORT_PREFIX, file_stamp};
use crate::models::{CategoryGroup, DailySummary, Story};
use askama::Template;
use chrono::Local;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

#[derive(Template)]
#[template(path = "report.html")]
struct ReportPage<'a> {
    title: &'a str,
    generated_at: &'a str,
    intro: &'a str,
    top_stories: &'a [Story],
    /// Only buckets that have stories.
    categories: Vec<&'a CategoryGroup>,
}

#[derive(Template)]
#[template(path = "wechat.html")]
struct WechatPage<'a> {
    date: &'a str,
    intro: &'a str,
    top_stories: &'a [Story],
    others: Vec<&'a Story>,
}

/// Render the full report page. `generated_at` is shown verbatim in the header.
pub fn render_report(summary: &DailySummary, generated_at: &str) -> askama::Result<String> {
    ReportPage {
        title: &summary.title,
        generated_at,
        intro: &summary.intro,
        top_stories: &summary.top_stories,
        categories: summary.categories.iter().filter(|g| !g.stories.is_empty()).collect(),
    }
    .render()
}

/// Render the WeChat post. `date` is `YYYY-MM-DD`.
pub fn render_wechat(summary: &DailySummary, date: &str) -> askama::Result<String> {
    WechatPage {
        date,
        intro: &summary.intro,
        top_stories: &summary.top_stories,
        others: summary.categories.iter().flat_map(|g| g.stories.iter()).collect(),
    }
    .render()
}

/// Write the full report into `dir` and return its path.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn write_report(dir: &Path, summary: &DailySummary) -> Result<PathBuf, Box<dyn Error>> {
    let now = Local::now();
    let html = render_report(summary, &now.format("%Y-%m-%d %H:%M:%S").to_string())?;
    let path = dir.join(format!("{}{}.html", REPORT_PREFIX, file_stamp(&now)));
    fs::create_dir_all(dir).await?;
    fs::write(&path, html).await?;
    info!(path = %path.display(), stories = summary.story_count(), "Report generated");
    Ok(path)
}

/// Write the WeChat post into `dir` and return its path.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn write_wechat(dir: &Path, summary: &DailySummary) -> Result<PathBuf, Box<dyn Error>> {
    let now = Local::now();
    let html = render_wechat(summary, &now.format("%Y-%m-%d").to_string())?;
    let path = dir.join(format!("wechat_post_{}.html", file_stamp(&now)));
    fs::create_dir_all(dir).await?;
    fs::write(&path, html).await?;
    info!(path = %path.display(), "WeChat HTML ready");
    Ok(path)
}

/// Newest `ai_news_report_*.html` in `dir`, by file name.
pub async fn latest_report(dir: &Path) -> Result<Option<PathBuf>, Box<dyn Error>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut newest: Option<String> = None;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(REPORT_PREFIX)
            && name.ends_with(".html")
            && newest.as_ref().is_none_or(|n| name > *n)
        {
            newest = Some(name);
        }
    }
    Ok(newest.map(|n| dir.join(n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn story(title: &str) -> Story {
        Story {
            title: title.to_string(),
            summary: "A summary".to_string(),
            source: "Feed".to_string(),
            link: "https://example.com/x?a=1&b=2".to_string(),
            image: Some("https://img.example.com/a.png".to_string()),
            impact: "Big deal".to_string(),
            key_points: vec!["point one".to_string()],
        }
    }

    fn summary() -> DailySummary {
        let mut categories = DailySummary::empty_categories();
        categories[1].stories.push(Story {
            image: None,
            ..story("Industry <news>")
        });
        DailySummary {
            title: "AI Daily Insight (2026-10-19)".to_string(),
            intro: "Busy day & more".to_string(),
            top_stories: vec![story("Top one")],
            categories,
        }
    }

    #[test]
    fn test_render_report_escapes_and_skips_empty_categories() {
        let html = render_report(&summary(), "2026-10-19 08:00:00").unwrap();
        assert!(html.contains("<title>AI Daily Insight (2026-10-19)</title>"));
        assert!(html.contains("Busy day &amp; more"));
        assert!(html.contains("Industry &lt;news&gt;"));
        assert!(!html.contains("Industry <news>"));
        assert!(html.contains("href=\"https://example.com/x?a=1&amp;b=2\""));
        assert!(html.contains("<li>point one</li>"));
        assert!(html.contains("<img src=\"https://img.example.com/a.png\""));
        assert!(html.contains("<h2>Industry &amp; Business</h2>"));
        assert!(!html.contains("Models &amp; Technology"));
        assert!(!html.contains(Category::ModelsAndTech.label()));
    }

    #[test]
    fn test_render_wechat_numbers_top_stories() {
        let html = render_wechat(&summary(), "2026-10-19").unwrap();
        assert!(html.contains("AI Daily Briefing (2026-10-19)"));
        assert!(html.contains("1. Top one"));
        assert!(html.contains("More News"));
    }

    #[test]
    fn test_render_wechat_without_other_news() {
        let s = DailySummary {
            categories: vec![CategoryGroup {
                category: Category::Other,
                stories: vec![],
            }],
            ..summary()
        };
        assert!(!render_wechat(&s, "2026-10-19").unwrap().contains("More News"));
    }

    #[tokio::test]
    async fn test_write_and_find_latest_report() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(latest_report(tmp.path()).await.unwrap().is_none());

        std::fs::write(tmp.path().join("ai_news_report_20260101_000000.html"), "old").unwrap();
        std::fs::write(tmp.path().join("wechat_post_29990101_000000.html"), "x").unwrap();
        let written = write_report(tmp.path(), &summary()).await.unwrap();

        let latest = latest_report(tmp.path()).await.unwrap().unwrap();
        assert_eq!(latest, written);
    }

    #[tokio::test]
    async fn test_latest_report_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        assert!(latest_report(&missing).await.unwrap().is_none());
    }
}
