//! Data models for feed items, LLM analyses, and the daily summary.
//!
//! This module defines the core data structures used throughout the application:
//! - [`NewsItem`]: A raw feed entry, optionally enriched with full article text
//! - [`ArticleAnalysis`]: The JSON object the LLM returns for a single article
//! - [`DailySummary`]: The ranked and bucketed report for a single run
//! - [`HistoryRecord`]: The lightweight copy of a summary kept in memory
//! - [`ResearchDoc`]: A web search result with its fetched page text

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

/// A single entry pulled from an RSS or Atom feed.
#[derive(Debug, Clone)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    /// The feed-provided summary or description (may contain HTML).
    pub summary: String,
    /// Display name of the feed this entry came from.
    pub source: String,
    pub published: DateTime<Local>,
    /// Main article text, filled in by the enrichment stage.
    pub full_content: Option<String>,
    /// Lead image URL, filled in by the enrichment stage.
    pub image: Option<String>,
}

impl NewsItem {
    /// Publication time as `YYYY-MM-DD HH:MM:SS`.
    pub fn published_str(&self) -> String {
        self.published.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Best available body text: full content when present, otherwise the feed summary.
    pub fn body(&self) -> &str {
        self.full_content.as_deref().unwrap_or(&self.summary)
    }
}

/// Per-article insight extracted by the LLM.
///
/// Every field is optional on the wire; a model that omits a key still
/// produces a usable analysis.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ArticleAnalysis {
    /// Headline rewritten in the report language.
    pub title: Option<String>,
    /// Older replies carry the headline under `title_zh`, sometimes next to `title`.
    pub title_zh: Option<String>,
    /// One or two sentence summary in the report language.
    pub summary: Option<String>,
    pub summary_zh: Option<String>,
    pub key_points: Vec<String>,
    pub category: Option<String>,
    #[serde(deserialize_with = "score_from_any")]
    pub importance_score: f64,
    pub impact_analysis: Option<String>,
}

/// Accept `7`, `7.5`, `"7"` or `null` for the importance score.
fn score_from_any<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    })
}

/// A feed item together with its (possibly missing) LLM analysis.
#[derive(Debug, Clone)]
pub struct AnalyzedItem {
    pub item: NewsItem,
    pub analysis: Option<ArticleAnalysis>,
}

impl AnalyzedItem {
    /// Importance score, 0 when the analysis failed.
    pub fn score(&self) -> f64 {
        self.analysis.as_ref().map(|a| a.importance_score).unwrap_or(0.0)
    }

    /// Convert into the report-facing [`Story`], falling back to the raw
    /// feed title and summary when the model left them out.
    pub fn to_story(&self) -> Story {
        let analysis = self.analysis.clone().unwrap_or_default();
        Story {
            title: non_empty(analysis.title)
                .or_else(|| non_empty(analysis.title_zh))
                .unwrap_or_else(|| self.item.title.clone()),
            summary: non_empty(analysis.summary)
                .or_else(|| non_empty(analysis.summary_zh))
                .unwrap_or_else(|| self.item.summary.clone()),
            source: self.item.source.clone(),
            link: self.item.link.clone(),
            image: self.item.image.clone(),
            impact: analysis.impact_analysis.unwrap_or_default(),
            key_points: analysis.key_points,
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// The five fixed report buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Category {
    ModelsAndTech,
    IndustryAndBusiness,
    AcademiaAndResearch,
    ToolsAndApplications,
    Other,
}

impl Category {
    /// Buckets in report order.
    pub const ALL: [Category; 5] = [
        Category::ModelsAndTech,
        Category::IndustryAndBusiness,
        Category::AcademiaAndResearch,
        Category::ToolsAndApplications,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::ModelsAndTech => "Models & Technology",
            Category::IndustryAndBusiness => "Industry & Business",
            Category::AcademiaAndResearch => "Academia & Research",
            Category::ToolsAndApplications => "Tools & Applications",
            Category::Other => "Other",
        }
    }

    /// Map a free-text category returned by the LLM onto a bucket.
    ///
    /// Keywords are checked bucket by bucket in report order, so
    /// "模型/应用" lands in [`Category::ModelsAndTech`].
    pub fn from_llm(raw: &str) -> Category {
        let lowered = raw.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| lowered.contains(k));

        if has(&["模型", "技术", "model", "tech"]) {
            Category::ModelsAndTech
        } else if has(&["行业", "商业", "industry", "business"]) {
            Category::IndustryAndBusiness
        } else if has(&["学术", "研究", "academ", "research"]) {
            Category::AcademiaAndResearch
        } else if has(&["应用", "工具", "tool", "app"]) {
            Category::ToolsAndApplications
        } else {
            Category::Other
        }
    }
}

/// A story as it appears in the rendered report.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Story {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub link: String,
    pub image: Option<String>,
    pub impact: String,
    pub key_points: Vec<String>,
}

impl Story {
    /// Image URL worth rendering, if any.
    pub fn lead_image(&self) -> Option<&str> {
        self.image.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// All stories that fell into one bucket.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryGroup {
    pub category: Category,
    pub stories: Vec<Story>,
}

/// The final ranked report for one run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DailySummary {
    pub title: String,
    pub intro: String,
    pub top_stories: Vec<Story>,
    /// Always holds the five buckets in [`Category::ALL`] order, possibly empty.
    pub categories: Vec<CategoryGroup>,
}

impl DailySummary {
    pub fn empty_categories() -> Vec<CategoryGroup> {
        Category::ALL
            .iter()
            .map(|c| CategoryGroup {
                category: *c,
                stories: Vec::new(),
            })
            .collect()
    }

    pub fn story_count(&self) -> usize {
        self.top_stories.len() + self.categories.iter().map(|g| g.stories.len()).sum::<usize>()
    }
}

/// Headline and summary of a top story as remembered in history.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoryDigest {
    pub title: String,
    pub summary: String,
}

/// One day's entry in the history file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoryRecord {
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub top_stories: Vec<StoryDigest>,
}

/// A web search hit with the text of the page behind it.
#[derive(Debug, Clone)]
pub struct ResearchDoc {
    pub title: String,
    pub link: String,
    pub source: String,
    /// Search-engine snippet.
    pub summary: String,
    pub full_content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, summary: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            link: "https://example.com/a".to_string(),
            summary: summary.to_string(),
            source: "Example Feed".to_string(),
            published: Local::now(),
            full_content: None,
            image: None,
        }
    }

    #[test]
    fn test_category_mapping_chinese() {
        assert_eq!(Category::from_llm("模型"), Category::ModelsAndTech);
        assert_eq!(Category::from_llm("行业"), Category::IndustryAndBusiness);
        assert_eq!(Category::from_llm("学术"), Category::AcademiaAndResearch);
        assert_eq!(Category::from_llm("应用"), Category::ToolsAndApplications);
        assert_eq!(Category::from_llm("其他"), Category::Other);
    }

    #[test]
    fn test_category_mapping_english_and_order() {
        assert_eq!(Category::from_llm("New Model Release"), Category::ModelsAndTech);
        assert_eq!(Category::from_llm("Business"), Category::IndustryAndBusiness);
        assert_eq!(Category::from_llm("Research paper"), Category::AcademiaAndResearch);
        assert_eq!(Category::from_llm("Developer Tools"), Category::ToolsAndApplications);
        assert_eq!(Category::from_llm("模型/应用"), Category::ModelsAndTech);
        assert_eq!(Category::from_llm(""), Category::Other);
    }

    #[test]
    fn test_analysis_accepts_string_score_and_missing_fields() {
        let a: ArticleAnalysis =
            serde_json::from_str(r#"{"importance_score": "8", "category": "行业"}"#).unwrap();
        assert_eq!(a.importance_score, 8.0);
        assert!(a.key_points.is_empty());
        assert!(a.title.is_none());

        let b: ArticleAnalysis = serde_json::from_str(r#"{"importance_score": null}"#).unwrap();
        assert_eq!(b.importance_score, 0.0);
    }

    #[test]
    fn test_to_story_falls_back_to_feed_text() {
        let analyzed = AnalyzedItem {
            item: item("Original", "Feed summary"),
            analysis: Some(ArticleAnalysis {
                title: Some("  ".to_string()),
                importance_score: 6.0,
                key_points: vec!["one".to_string()],
                ..Default::default()
            }),
        };
        let story = analyzed.to_story();
        assert_eq!(story.title, "Original");
        assert_eq!(story.summary, "Feed summary");
        assert_eq!(story.key_points, vec!["one".to_string()]);
        assert_eq!(analyzed.score(), 6.0);
    }

    #[test]
    fn test_analysis_accepts_legacy_keys() {
        let a: ArticleAnalysis =
            serde_json::from_str(r#"{"title_zh": "标题", "summary_zh": "摘要", "importance_score": 9}"#)
                .unwrap();
        let story = AnalyzedItem {
            item: item("Original", "Feed summary"),
            analysis: Some(a),
        }
        .to_story();
        assert_eq!(story.title, "标题");
        assert_eq!(story.summary, "摘要");
    }

    #[test]
    fn test_analysis_with_both_title_keys_is_kept() {
        let a: ArticleAnalysis = serde_json::from_str(
            r#"{"title": "Headline", "title_zh": "标题", "summary": "", "summary_zh": "摘要", "importance_score": 9}"#,
        )
        .unwrap();
        assert_eq!(a.importance_score, 9.0);

        let story = AnalyzedItem {
            item: item("Original", "Feed summary"),
            analysis: Some(a),
        }
        .to_story();
        assert_eq!(story.title, "Headline");
        assert_eq!(story.summary, "摘要");
    }

    #[test]
    fn test_missing_analysis_scores_zero() {
        let analyzed = AnalyzedItem {
            item: item("t", "s"),
            analysis: None,
        };
        assert_eq!(analyzed.score(), 0.0);
    }

    #[test]
    fn test_body_prefers_full_content() {
        let mut it = item("t", "short");
        assert_eq!(it.body(), "short");
        it.full_content = Some("long text".to_string());
        assert_eq!(it.body(), "long text");
    }

    #[test]
    fn test_empty_categories_has_five_buckets_in_order() {
        let groups = DailySummary::empty_categories();
        let cats: Vec<Category> = groups.iter().map(|g| g.category).collect();
        assert_eq!(cats, Category::ALL.to_vec());
    }
}
