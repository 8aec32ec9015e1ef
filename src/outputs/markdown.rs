//! Markdown renditions of the daily summary, printed to stdout after a run.

use crate::models::DailySummary;
use std::fmt::{self, Write};

pub const DISCLAIMER: &str = "This report was generated automatically by AI and is for reference only. \
It does not constitute investment advice; readers bear their own risk.";

/// Plain Markdown report: title, bold intro, top stories, categories, disclaimer.
pub fn render_markdown(summary: &DailySummary) -> String {
    let mut md = String::new();
    let _ = write_markdown(&mut md, summary);
    md
}

fn write_markdown(md: &mut String, summary: &DailySummary) -> fmt::Result {
    writeln!(md, "# {}\n", summary.title)?;
    writeln!(md, "**{}**\n", summary.intro)?;

    writeln!(md, "## 🔥 Top Stories")?;
    for story in &summary.top_stories {
        writeln!(md, "### [{}]({})", story.title, story.link)?;
        writeln!(md, "**Source:** {}\n", story.source)?;
        writeln!(md, "{}\n", story.summary)?;
        if !story.impact.is_empty() {
            writeln!(md, "> 💡 {}\n", story.impact)?;
        }
    }

    for group in summary.categories.iter().filter(|g| !g.stories.is_empty()) {
        writeln!(md, "## {}", group.category.label())?;
        for story in &group.stories {
            writeln!(
                md,
                "- **[{}]({})** ({}): {}",
                story.title, story.link, story.source, story.summary
            )?;
        }
        writeln!(md)?;
    }

    writeln!(md, "\n---")?;
    writeln!(md, "### ⚠️ Disclaimer")?;
    writeln!(md, "{}", DISCLAIMER)
}

/// Markdown laid out for a WeChat Official Account post. `date` is `YYYY-MM-DD`.
pub fn render_wechat_markdown(summary: &DailySummary, date: &str) -> String {
    let mut md = String::new();
    let _ = write_wechat_markdown(&mut md, summary, date);
    md
}

fn write_wechat_markdown(md: &mut String, summary: &DailySummary, date: &str) -> fmt::Result {
    writeln!(md, "# 🤖 AI Daily Briefing ({})\n", date)?;
    writeln!(md, "{}\n", summary.intro)?;
    writeln!(md, "---\n")?;

    writeln!(md, "## 🔥 Today's Highlights\n")?;
    for (i, story) in summary.top_stories.iter().enumerate() {
        writeln!(md, "### {}. {}", i + 1, story.title)?;
        writeln!(md, "**Source**: {}\n", story.source)?;
        writeln!(md, "{}\n", story.summary)?;
        if !story.key_points.is_empty() {
            writeln!(md, "**Key points**:")?;
            for point in &story.key_points {
                writeln!(md, "- {}", point)?;
            }
            writeln!(md)?;
        }
        if !story.impact.is_empty() {
            writeln!(md, "> 💡 **Insight**: {}\n", story.impact)?;
        }
        writeln!(md, "🔗 [Read the original]({})\n", story.link)?;
    }

    for group in summary.categories.iter().filter(|g| !g.stories.is_empty()) {
        writeln!(md, "## 📂 {}\n", group.category.label())?;
        for story in &group.stories {
            writeln!(md, "- **{}**", story.title)?;
            writeln!(md, "  {} ([{}]({}))", story.summary, story.source, story.link)?;
        }
        writeln!(md)?;
    }

    writeln!(md, "---")?;
    writeln!(md, "*Generated automatically by an AI agent, for reference only.*")?;
    writeln!(md, "*Disclaimer: not investment advice, please judge independently.*")
}
