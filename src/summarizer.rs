//! LLM-driven filtering, analysis, ranking, and long-form generation.
//!
//! The daily summary is built in three steps:
//!
//! 1. **Filter**: one cheap call over all titles drops obvious noise
//!    (only in token saving mode, and only for more than five items)
//! 2. **Map**: every remaining article is analyzed on its own
//!    ([`MAX_CONCURRENT_ANALYSES`] at a time) for a score, category and summary
//! 3. **Reduce**: items scoring below [`MIN_IMPORTANCE`] are dropped, the rest
//!    ranked; the top [`TOP_STORY_COUNT`] become headlines and the others are
//!    bucketed, then an intro is written with recent history as context
//!
//! The same client also backs the content factory's report, slide deck and
//! video script generators.

use crate::api::{AskAsync, ChatRequest, parse_json_reply};
use crate::config::AppConfig;
use crate::memory::MemoryManager;
use crate::models::{
    AnalyzedItem, ArticleAnalysis, Category, CategoryGroup, DailySummary, NewsItem, ResearchDoc,
    Story,
};
use crate::utils::{looks_truncated, truncate_chars, truncate_for_log};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt::Write;
use tracing::{debug, error, info, instrument, warn};

pub const MAX_CONCURRENT_ANALYSES: usize = 5;
pub const MIN_IMPORTANCE: f64 = 4.0;
pub const TOP_STORY_COUNT: usize = 5;
/// Batch filtering only kicks in above this many items.
pub const FILTER_THRESHOLD: usize = 5;
/// Article characters sent for single-article analysis.
pub const ANALYSIS_CONTENT_CHARS: usize = 3000;
/// Characters per source document in the deep report prompt.
pub const REPORT_SOURCE_CHARS: usize = 2000;
pub const SLIDES_REPORT_CHARS: usize = 3000;
pub const SCRIPT_REPORT_CHARS: usize = 2000;
pub const HISTORY_CONTEXT_DAYS: i64 = 3;

pub const FALLBACK_INTRO: &str = "Several important AI updates landed today.";

/// Reader preferences that steer every prompt.
#[derive(Debug, Clone)]
pub struct Preferences {
    pub interests: Vec<String>,
    pub dislikes: Vec<String>,
    pub language: String,
    pub token_saving_mode: bool,
}

impl From<&AppConfig> for Preferences {
    fn from(c: &AppConfig) -> Self {
        Self {
            interests: c.interests.clone(),
            dislikes: c.dislikes.clone(),
            language: c.language.clone(),
            token_saving_mode: c.token_saving_mode,
        }
    }
}

/// Visual and tonal style of a generated slide deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SlideStyle {
    /// Restrained, includes a methodology slide.
    Academic,
    /// Punchy headlines for social media.
    Viral,
}

impl SlideStyle {
    pub fn theme(&self) -> &'static str {
        match self {
            SlideStyle::Academic => "gaia",
            SlideStyle::Viral => "uncover",
        }
    }

    fn temperature(&self) -> f32 {
        match self {
            SlideStyle::Academic => 0.3,
            SlideStyle::Viral => 0.5,
        }
    }
}

#[derive(Debug, Deserialize)]
struct KeepIndices {
    #[serde(default)]
    keep_indices: Vec<i64>,
}

pub struct Summarizer<'a, A> {
    llm: &'a A,
    prefs: Preferences,
    memory: Option<&'a MemoryManager>,
}

impl<'a, A> Summarizer<'a, A>
where
    A: AskAsync,
{
    pub fn new(llm: &'a A, prefs: Preferences) -> Self {
        Self {
            llm,
            prefs,
            memory: None,
        }
    }

    /// Read context from and save summaries to `memory`.
    pub fn with_memory(mut self, memory: &'a MemoryManager) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Drop irrelevant items with a single call over all titles.
    ///
    /// Any failure keeps every item.
    #[instrument(level = "info", skip_all, fields(count = items.len()))]
    pub async fn batch_filter(&self, items: Vec<NewsItem>) -> Vec<NewsItem> {
        if items.is_empty() {
            return items;
        }
        info!(count = items.len(), "Batch filtering articles by title");

        let mut titles = String::new();
        for (i, item) in items.iter().enumerate() {
            let _ = writeln!(titles, "{}. {} (Source: {})", i, item.title, item.source);
        }
        let prompt = format!(
            r#"Act as a strict AI news editor. From the list below keep only the stories that are genuinely important and match the reader's interests.

Reader interests: {interests}
Not interested in: {dislikes}

Criteria:
1. Must be a major AI development: a new model release, significant research, or a notable business event.
2. Drop tutorials ("How to"), overly niche daily papers, unrelated promotion, and duplicate coverage.
3. Be strict: keep only the most valuable 30%-50%.

News list:
{titles}
Output only the indices to keep, as JSON:
{{
    "keep_indices": [0, 2, 5]
}}"#,
            interests = self.prefs.interests.join(", "),
            dislikes = self.prefs.dislikes.join(", "),
        );
        let request = ChatRequest::new(prompt)
            .system("You are a strict news editor. Output JSON only.")
            .temperature(0.1)
            .json();

        let reply = match self.llm.ask(&request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Filter failed, keeping all items");
                return items;
            }
        };
        match parse_json_reply::<KeepIndices>(&reply) {
            Ok(keep) => {
                let before = items.len();
                let kept = apply_keep_indices(items, &keep.keep_indices);
                info!(before, after = kept.len(), "Filtered articles");
                kept
            }
            Err(e) => {
                warn!(error = %e, reply = %truncate_for_log(&reply, 300), "Filter reply unparseable, keeping all items");
                items
            }
        }
    }

    fn analysis_request(&self, item: &NewsItem) -> ChatRequest {
        let content = truncate_chars(item.body(), ANALYSIS_CONTENT_CHARS);
        let prompt = format!(
            r#"Analyze the following AI news article and extract the key information.

Reader preferences (use them to set importance_score):
- Focus on: {interests}
- Ignore or score low: {dislikes}

Title: {title}
Source: {source}
Published: {published}
Content:
{content}

Write all text values in {language}. Reply with raw JSON only (no Markdown):
{{
    "title": "headline",
    "summary": "summary in at most 50 words",
    "key_points": ["point 1", "point 2", "point 3"],
    "category": "Models / Industry / Research / Applications / Other",
    "importance_score": 1-10 (high when it matches the reader's interests, low when unrelated),
    "impact_analysis": "one sentence on its impact on the industry"
}}"#,
            interests = self.prefs.interests.join(", "),
            dislikes = self.prefs.dislikes.join(", "),
            title = item.title,
            source = item.source,
            published = item.published_str(),
            language = self.prefs.language,
        );
        ChatRequest::new(prompt)
            .system("You are an AI analyst. Output raw JSON only.")
            .temperature(0.3)
            .json()
    }

    /// Analyze one article. Failures leave the item without an analysis.
    #[instrument(level = "debug", skip_all, fields(title = %item.title))]
    pub async fn analyze_item(&self, item: NewsItem) -> AnalyzedItem {
        let request = self.analysis_request(&item);

        let reply = match self.llm.ask(&request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(title = %item.title, error = %e, "Analysis call failed");
                return AnalyzedItem { item, analysis: None };
            }
        };

        let mut parsed = parse_json_reply::<ArticleAnalysis>(&reply);
        if let Err(ref e) = parsed {
            if looks_truncated(e) {
                warn!(title = %item.title, error = %e, "EOF while parsing; re-asking once");
                match self.llm.ask(&request).await {
                    Ok(r2) => parsed = parse_json_reply::<ArticleAnalysis>(&r2),
                    Err(e2) => warn!(title = %item.title, error = %e2, "Re-ask failed"),
                }
            }
        }

        match parsed {
            Ok(mut analysis) => {
                analysis.key_points = analysis
                    .key_points
                    .into_iter()
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .unique()
                    .collect();
                debug!(score = analysis.importance_score, "Analyzed article");
                AnalyzedItem {
                    item,
                    analysis: Some(analysis),
                }
            }
            Err(e) => {
                warn!(
                    title = %item.title,
                    error = %e,
                    response_preview = %truncate_for_log(&reply, 300),
                    "Model returned non-conforming JSON"
                );
                AnalyzedItem { item, analysis: None }
            }
        }
    }

    async fn generate_intro(&self, top_stories: &[Story]) -> String {
        let history = match self.memory {
            Some(m) => m.context_string(HISTORY_CONTEXT_DAYS).await,
            None => crate::memory::format_context(&[]),
        };
        let headlines = top_stories
            .iter()
            .map(|s| format!("- {}", s.title))
            .join("\n");
        let prompt = format!(
            r#"Using today's headlines below and the background from the past few days, write one short sentence summarizing today's developments in the AI industry.

Background (for reference only; do not force a connection):
{history}

Today's headlines:
{headlines}

Requirements: concise and professional; point out continuity if there is any. Write in {language}."#,
            language = self.prefs.language,
        );

        match self.llm.ask(&ChatRequest::new(prompt)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => FALLBACK_INTRO.to_string(),
            Err(e) => {
                warn!(error = %e, "Intro generation failed; using fallback");
                FALLBACK_INTRO.to_string()
            }
        }
    }

    /// Turn collected items into the daily summary and remember it.
    ///
    /// Runs the title filter, analyzes the survivors five at a time, ranks
    /// by importance and writes the intro with recent history as context.
    ///
    /// # Arguments
    ///
    /// * `items` - Enriched feed entries, newest first
    ///
    /// # Returns
    ///
    /// The ranked summary, or `None` for empty input. LLM failures along the
    /// way degrade the result (fallback intro, unscored items) rather than
    /// abort it.
    #[instrument(level = "info", skip_all, fields(count = items.len()))]
    pub async fn summarize(&self, items: Vec<NewsItem>) -> Option<DailySummary> {
        if items.is_empty() {
            return None;
        }

        let items = if self.prefs.token_saving_mode && items.len() > FILTER_THRESHOLD {
            self.batch_filter(items).await
        } else {
            items
        };

        info!(count = items.len(), "Analyzing articles in depth");
        let analyzed: Vec<AnalyzedItem> = stream::iter(items)
            .map(|item| self.analyze_item(item))
            .buffered(MAX_CONCURRENT_ANALYSES)
            .collect()
            .await;

        let ranked = rank(analyzed);
        info!(valid = ranked.len(), "Ranked articles");

        let (top_stories, categories) = bucket(&ranked);
        let intro = self.generate_intro(&top_stories).await;
        let date = ranked
            .first()
            .map(|a| a.item.published.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        let summary = DailySummary {
            title: format!("AI Daily Insight ({})", date),
            intro,
            top_stories,
            categories,
        };

        if let Some(memory) = self.memory {
            if let Err(e) = memory.save_summary(&summary).await {
                error!(error = %e, "Failed to save memory");
            }
        }
        Some(summary)
    }

    /// Long-form Markdown research report on `topic` from collected sources.
    #[instrument(level = "info", skip_all, fields(%topic, sources = docs.len()))]
    pub async fn generate_deep_report(&self, topic: &str, docs: &[ResearchDoc]) -> String {
        let mut context = String::new();
        for (i, doc) in docs.iter().enumerate() {
            let _ = writeln!(context, "--- Source {}: {} ---", i + 1, doc.title);
            let _ = writeln!(context, "Link: {} ({})", doc.link, doc.source);
            if !doc.summary.is_empty() {
                let _ = writeln!(context, "Snippet: {}", doc.summary);
            }
            let _ = writeln!(context, "{}\n", truncate_chars(&doc.full_content, REPORT_SOURCE_CHARS));
        }
        let prompt = format!(
            r#"Using the material collected below, write an in-depth industry research report on "{topic}".

Material:
{context}
Requirements:
1. Clear structure with four sections: Background & Current State, Core Technology / Event Analysis, Competitive Landscape, Future Trends.
2. Real analysis: connect the material logically and draw conclusions rather than stacking quotes.
3. Support claims with key figures from the material.
4. Cite sources inline as [Source N] and end with a "References" list of the source links.
5. Around 1500 words.
6. Format: Markdown.
7. Language: {language}."#,
            language = self.prefs.language,
        );
        let request = ChatRequest::new(prompt)
            .system("You are a senior AI industry analyst.")
            .temperature(0.4);

        info!("Generating deep dive report");
        match self.llm.ask(&request).await {
            Ok(text) => text,
            Err(e) => format!("Error generating report: {}", e),
        }
    }

    /// Marp slide deck derived from a report.
    #[instrument(level = "info", skip_all, fields(%topic, ?style))]
    pub async fn generate_slides(&self, topic: &str, report: &str, style: SlideStyle) -> String {
        let style_rules = match style {
            SlideStyle::Viral => {
                "3. Style:\n   - Strong visual impact, made for sharing on social media.\n   - Bold, attention-grabbing slide titles.\n   - Very few words per slide; highlight one quotable line.\n   - Do NOT include a Methodology slide.\n   - Do NOT include a presenter name."
            }
            SlideStyle::Academic => {
                "3. Style: professional, academic, minimal.\n4. Special requirements:\n   - Include a \"Methodology\" slide (briefly: broad search followed by in-depth synthesis).\n   - No placeholders; describe concrete chart contents."
            }
        };
        let prompt = format!(
            r#"Convert the following research report into a Marp (Markdown Presentation Ecosystem) slide deck.

Topic: {topic}
Report (excerpt):
{excerpt}...

Requirements:
1. Format: standard Marp Markdown.
   - Front matter contains `marp: true`, `theme: {theme}`, `paginate: true`.
   - Separate slides with `---`.
2. Structure:
   - Cover slide: title and subtitle.
   - Agenda slide.
   - Body slides: distilled key points as lists.
   - Closing slide.
{style_rules}
5. Language: {language}."#,
            excerpt = truncate_chars(report, SLIDES_REPORT_CHARS),
            theme = style.theme(),
            language = self.prefs.language,
        );
        let request = ChatRequest::new(prompt)
            .system("You are a presentation expert skilled in Marp markdown.")
            .temperature(style.temperature());

        info!("Generating Marp slides");
        match self.llm.ask(&request).await {
            Ok(text) => ensure_marp_front_matter(&text, style),
            Err(e) => format!("Error generating slides: {}", e),
        }
    }

    /// Short-form video voice-over script with shot suggestions.
    #[instrument(level = "info", skip_all, fields(%topic, %platform))]
    pub async fn generate_video_script(&self, topic: &str, report: &str, platform: &str) -> String {
        let prompt = format!(
            r#"Adapt the following research report into a voice-over script for a short video on {platform}.

Topic: {topic}
Reference material:
{excerpt}

Requirements:
1. Golden first three seconds: open with a hook that sparks curiosity or urgency.
2. Fully conversational; no written-style phrasing.
3. Shot notes: for every beat give a [Visual] suggestion followed by the [Voice-over] line.
4. Length: 60-90 seconds of speech.
5. Close by asking viewers to follow, like, or comment.
6. Language: {language}.

Example:
[Visual: host looks shocked, news screenshot behind]
Voice-over: If this really happens, everyone's wallet is about to shrink!"#,
            excerpt = truncate_chars(report, SCRIPT_REPORT_CHARS),
            language = self.prefs.language,
        );
        let request = ChatRequest::new(prompt)
            .system("You are a viral content creator.")
            .temperature(0.7);

        info!("Generating video script");
        match self.llm.ask(&request).await {
            Ok(text) => text,
            Err(e) => format!("Error generating script: {}", e),
        }
    }
}

/// Keep items whose index appears in `indices`, in original order.
/// Out-of-range and negative indices are ignored.
pub fn apply_keep_indices(items: Vec<NewsItem>, indices: &[i64]) -> Vec<NewsItem> {
    let keep: HashSet<i64> = indices.iter().copied().collect();
    items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(&(*i as i64)))
        .map(|(_, item)| item)
        .collect()
}

/// Drop items below [`MIN_IMPORTANCE`] and sort the rest by score,
/// highest first. Ties keep their input order.
pub fn rank(analyzed: Vec<AnalyzedItem>) -> Vec<AnalyzedItem> {
    let mut valid: Vec<AnalyzedItem> = analyzed
        .into_iter()
        .filter(|a| a.score() >= MIN_IMPORTANCE)
        .collect();
    valid.sort_by(|a, b| b.score().total_cmp(&a.score()));
    valid
}

/// Split ranked items into headline stories and the five buckets.
pub fn bucket(ranked: &[AnalyzedItem]) -> (Vec<Story>, Vec<CategoryGroup>) {
    let mut top_stories = Vec::new();
    let mut categories = DailySummary::empty_categories();

    for (i, analyzed) in ranked.iter().enumerate() {
        let story = analyzed.to_story();
        if i < TOP_STORY_COUNT {
            top_stories.push(story);
            continue;
        }
        let raw = analyzed
            .analysis
            .as_ref()
            .and_then(|a| a.category.as_deref())
            .unwrap_or("");
        let target = Category::from_llm(raw);
        if let Some(group) = categories.iter_mut().find(|g| g.category == target) {
            group.stories.push(story);
        }
    }
    (top_stories, categories)
}

/// Strip a surrounding code fence and make sure the deck starts with Marp
/// front matter.
pub fn ensure_marp_front_matter(raw: &str, style: SlideStyle) -> String {
    let mut body = raw.trim();
    if let Some(rest) = body
        .strip_prefix("```markdown")
        .or_else(|| body.strip_prefix("```md"))
        .or_else(|| body.strip_prefix("```"))
    {
        body = rest.trim_start();
        if let Some(inner) = body.strip_suffix("```") {
            body = inner.trim_end();
        }
    }

    let has_front_matter =
        body.starts_with("---") && body.lines().take(6).any(|l| l.trim() == "marp: true");
    if has_front_matter {
        format!("{}\n", body)
    } else {
        format!(
            "---\nmarp: true\ntheme: {}\npaginate: true\n---\n\n{}\n",
            style.theme(),
            body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::StubLlm;
    use chrono::{Duration, Local, TimeZone};

    fn prefs(token_saving_mode: bool) -> Preferences {
        Preferences {
            interests: vec!["AI Agents".to_string()],
            dislikes: vec!["Crypto".to_string()],
            language: "English".to_string(),
            token_saving_mode,
        }
    }

    fn item(i: usize) -> NewsItem {
        NewsItem {
            title: format!("Story {}", i),
            link: format!("https://example.com/{}", i),
            summary: format!("Summary {}", i),
            source: "Feed".to_string(),
            published: Local.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap() - Duration::minutes(i as i64),
            full_content: None,
            image: None,
        }
    }

    fn analyzed(i: usize, score: f64, category: &str) -> AnalyzedItem {
        AnalyzedItem {
            item: item(i),
            analysis: Some(ArticleAnalysis {
                importance_score: score,
                category: Some(category.to_string()),
                ..Default::default()
            }),
        }
    }

    /// Pull the story number back out of a single-article analysis prompt.
    fn story_number(req: &ChatRequest) -> Option<usize> {
        let line = req.user.lines().find(|l| l.starts_with("Title: Story "))?;
        line.trim_start_matches("Title: Story ").parse().ok()
    }

    #[test]
    fn test_apply_keep_indices_ignores_out_of_range() {
        let items: Vec<NewsItem> = (0..4).map(item).collect();
        let kept = apply_keep_indices(items, &[3, 1, 9, -1, 1]);
        let titles: Vec<&str> = kept.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Story 1", "Story 3"]);
    }

    #[test]
    fn test_rank_drops_low_scores_and_is_stable() {
        let input = vec![
            analyzed(0, 5.0, "x"),
            analyzed(1, 3.9, "x"),
            analyzed(2, 9.0, "x"),
            analyzed(3, 5.0, "x"),
            AnalyzedItem {
                item: item(4),
                analysis: None,
            },
        ];
        let ranked = rank(input);
        let titles: Vec<&str> = ranked.iter().map(|a| a.item.title.as_str()).collect();
        assert_eq!(titles, vec!["Story 2", "Story 0", "Story 3"]);
    }

    #[test]
    fn test_bucket_top_five_then_categories() {
        let ranked: Vec<AnalyzedItem> = vec![
            analyzed(0, 10.0, "模型"),
            analyzed(1, 9.0, "行业"),
            analyzed(2, 9.0, "学术"),
            analyzed(3, 8.0, "应用"),
            analyzed(4, 8.0, "其他"),
            analyzed(5, 7.0, "行业"),
            analyzed(6, 6.0, "Research"),
            analyzed(7, 5.0, "weird"),
        ];
        let (top, cats) = bucket(&ranked);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].title, "Story 0");
        assert_eq!(cats.len(), 5);
        assert_eq!(cats[1].category, Category::IndustryAndBusiness);
        assert_eq!(cats[1].stories[0].title, "Story 5");
        assert_eq!(cats[2].stories[0].title, "Story 6");
        assert_eq!(cats[4].stories[0].title, "Story 7");
        assert!(cats[0].stories.is_empty());
    }

    #[tokio::test]
    async fn test_batch_filter_keeps_listed_indices() {
        let llm = StubLlm::new(|req| {
            assert!(req.json_mode);
            assert!(req.user.contains("0. Story 0 (Source: Feed)"));
            Ok(r#"{"keep_indices": [0, 2]}"#.to_string())
        });
        let s = Summarizer::new(&llm, prefs(true));
        let kept = s.batch_filter((0..4).map(item).collect()).await;
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].title, "Story 2");
    }

    #[tokio::test]
    async fn test_batch_filter_failure_keeps_everything() {
        let llm = StubLlm::new(|_| Err("boom".to_string()));
        let s = Summarizer::new(&llm, prefs(true));
        assert_eq!(s.batch_filter((0..4).map(item).collect()).await.len(), 4);

        let garbage = StubLlm::new(|_| Ok("not json".to_string()));
        let s = Summarizer::new(&garbage, prefs(true));
        assert_eq!(s.batch_filter((0..4).map(item).collect()).await.len(), 4);
    }

    #[tokio::test]
    async fn test_analyze_item_dedupes_key_points_and_truncates_content() {
        let llm = StubLlm::new(|req| {
            let content_line = req.user.lines().find(|l| l.starts_with('x')).unwrap_or("");
            assert_eq!(content_line.chars().count(), ANALYSIS_CONTENT_CHARS);
            Ok(r#"```json
{"title": "T", "summary": "S", "key_points": ["a", " a ", "b", ""], "category": "模型", "importance_score": 8, "impact_analysis": "big"}
```"#
                .to_string())
        });
        let s = Summarizer::new(&llm, prefs(false));
        let mut it = item(0);
        it.full_content = Some("x".repeat(5000));
        let a = s.analyze_item(it).await;
        let analysis = a.analysis.unwrap();
        assert_eq!(analysis.key_points, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(analysis.importance_score, 8.0);
    }

    #[tokio::test]
    async fn test_analyze_item_reasks_once_on_truncated_json() {
        let llm = StubLlm::new(|_| Ok(r#"{"title": "cut off"#.to_string()));
        let s = Summarizer::new(&llm, prefs(false));
        let a = s.analyze_item(item(0)).await;
        assert!(a.analysis.is_none());
        assert_eq!(llm.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_summarize_end_to_end_with_memory() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = MemoryManager::open(tmp.path().join("history.json")).await.unwrap();

        let llm = StubLlm::new(|req| {
            if req.user.contains("keep_indices") {
                return Ok(r#"{"keep_indices": [0,1,2,3,4,5,6,7]}"#.to_string());
            }
            if let Some(n) = story_number(req) {
                let score = 10 - n;
                let reply = if n == 1 {
                    "garbage".to_string()
                } else {
                    format!(
                        r#"{{"title": "Headline {n}", "summary": "Sum {n}", "category": "行业", "importance_score": {score}}}"#
                    )
                };
                return Ok(reply);
            }
            assert!(req.user.contains("No recent history available."));
            Ok("  A steady day in AI.  ".to_string())
        });

        let s = Summarizer::new(&llm, prefs(true)).with_memory(&memory);
        let items: Vec<NewsItem> = (0..9).map(item).collect();
        let summary = s.summarize(items).await.unwrap();

        // Story 8 was filtered out, story 1 failed to parse, story 7 scored 3.
        assert_eq!(summary.story_count(), 5 + 1);
        assert_eq!(summary.top_stories[0].title, "Headline 0");
        assert_eq!(summary.top_stories[1].title, "Headline 2");
        let industry = &summary.categories[1];
        assert_eq!(industry.stories.len(), 1);
        assert_eq!(industry.stories[0].title, "Headline 6");
        assert_eq!(summary.intro, "A steady day in AI.");
        assert_eq!(summary.title, "AI Daily Insight (2026-10-19)");

        let saved = memory.load_history(1).await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].top_stories.len(), 5);
    }

    #[tokio::test]
    async fn test_summarize_small_batch_skips_filter_and_uses_fallback_intro() {
        let llm = StubLlm::new(|req| {
            assert!(!req.user.contains("keep_indices"));
            if story_number(req).is_some() {
                Ok(r#"{"importance_score": 2}"#.to_string())
            } else {
                Err("intro down".to_string())
            }
        });
        let s = Summarizer::new(&llm, prefs(true));
        let summary = s.summarize((0..3).map(item).collect()).await.unwrap();
        assert!(summary.top_stories.is_empty());
        assert_eq!(summary.intro, FALLBACK_INTRO);
        assert_eq!(summary.title, "AI Daily Insight ()");
    }

    #[tokio::test]
    async fn test_summarize_empty_is_none() {
        let llm = StubLlm::new(|_| panic!("should not be called"));
        let s = Summarizer::new(&llm, prefs(true));
        assert!(s.summarize(Vec::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_generators_return_error_text_on_failure() {
        let llm = StubLlm::new(|_| Err("offline".to_string()));
        let s = Summarizer::new(&llm, prefs(false));
        assert_eq!(s.generate_deep_report("t", &[]).await, "Error generating report: offline");
        assert_eq!(
            s.generate_slides("t", "r", SlideStyle::Viral).await,
            "Error generating slides: offline"
        );
        assert_eq!(
            s.generate_video_script("t", "r", "tiktok").await,
            "Error generating script: offline"
        );
    }

    #[tokio::test]
    async fn test_slides_request_uses_style() {
        let llm = StubLlm::new(|req| {
            assert!(req.user.contains("theme: uncover"));
            assert!(req.user.contains("Do NOT include a Methodology slide"));
            assert_eq!(req.temperature, Some(0.5));
            Ok("# Title".to_string())
        });
        let s = Summarizer::new(&llm, prefs(false));
        let deck = s.generate_slides("t", "report", SlideStyle::Viral).await;
        assert!(deck.starts_with("---\nmarp: true\ntheme: uncover\npaginate: true\n---\n\n# Title"));
    }

    #[tokio::test]
    async fn test_academic_slides_request() {
        let llm = StubLlm::new(|req| {
            assert!(req.user.contains("theme: gaia"));
            assert!(req.user.contains("Include a \"Methodology\" slide"));
            assert!(!req.user.contains("Do NOT include a Methodology slide"));
            assert_eq!(req.temperature, Some(0.3));
            Ok("# Findings".to_string())
        });
        let s = Summarizer::new(&llm, prefs(false));
        let deck = s.generate_slides("t", "report", SlideStyle::Academic).await;
        assert!(deck.starts_with("---\nmarp: true\ntheme: gaia\npaginate: true\n---\n\n# Findings"));
    }

    #[test]
    fn test_ensure_marp_front_matter_keeps_existing() {
        let deck = "```markdown\n---\nmarp: true\ntheme: gaia\npaginate: true\n---\n\n# Hi\n```";
        let out = ensure_marp_front_matter(deck, SlideStyle::Academic);
        assert!(out.starts_with("---\nmarp: true\ntheme: gaia"));
        assert!(!out.contains("```"));
        assert_eq!(out.matches("marp: true").count(), 1);
    }
}
