//! Report rendering and file output.
//!
//! # Submodules
//!
//! - [`html`]: Standalone HTML report and the WeChat-friendly HTML post
//! - [`markdown`]: Plain Markdown and WeChat Markdown renditions
//! - [`json`]: Machine-readable snapshot of a [`DailySummary`](crate::models::DailySummary)
//! - [`convert`]: Markdown file → styled HTML file
//!
//! # Output Structure
//!
//! ```text
//! output/
//! ├── ai_news_report_20261019_080012.html
//! ├── ai_news_report_20261019_080012.json
//! └── wechat_post_20261019_080012.html
//! ```

pub mod convert;
pub mod html;
pub mod json;
pub mod markdown;

use chrono::{DateTime, Local};

/// Prefix shared by every daily report file.
pub const REPORT_PREFIX: &str = "ai_news_report_";

/// `YYYYMMDD_HHMMSS` stamp used in output file names.
pub fn file_stamp(at: &DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}
