//! Content factory: topic → research → report → slides → video script.
//!
//! Each topic gets its own timestamped folder:
//!
//! ```text
//! output/
//! └── 20261019_080000_Electric vehicle price war/
//!     ├── 1_report.md
//!     ├── 2_viral_slides.md
//!     └── 3_tiktok_script.txt
//! ```
//!
//! With `--style academic` the deck is written as `2_academic_slides.md`.

use crate::api::AskAsync;
use crate::models::ResearchDoc;
use crate::research::research_topic;
use crate::summarizer::{SlideStyle, Summarizer};
use crate::topics::trending_topics;
use crate::utils::safe_topic_name;
use chrono::Local;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;
use tokio::fs;
use tracing::{error, info, instrument, warn};

pub const REPORT_FILE: &str = "1_report.md";
pub const SCRIPT_FILE: &str = "3_tiktok_script.txt";

pub fn slides_file(style: SlideStyle) -> &'static str {
    match style {
        SlideStyle::Viral => "2_viral_slides.md",
        SlideStyle::Academic => "2_academic_slides.md",
    }
}

/// Pause between topics in batch mode.
const BATCH_PAUSE: StdDuration = StdDuration::from_secs(2);

pub fn topic_dir(output_dir: &Path, topic: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    output_dir.join(format!("{}_{}", timestamp, safe_topic_name(topic)))
}

/// Research `topic` and write the three content files. Returns the folder,
/// or `None` when research found nothing.
#[instrument(level = "info", skip_all, fields(%topic, ?style))]
pub async fn generate_for_topic<A: AskAsync>(
    summarizer: &Summarizer<'_, A>,
    topic: &str,
    style: SlideStyle,
    output_dir: &Path,
) -> Result<Option<PathBuf>, Box<dyn Error>> {
    info!("Phase 1: deep research");
    let docs = research_topic(topic).await?;
    write_topic_content(summarizer, topic, &docs, style, output_dir).await
}

/// Generate and write content from already collected research.
pub async fn write_topic_content<A: AskAsync>(
    summarizer: &Summarizer<'_, A>,
    topic: &str,
    docs: &[ResearchDoc],
    style: SlideStyle,
    output_dir: &Path,
) -> Result<Option<PathBuf>, Box<dyn Error>> {
    if docs.is_empty() {
        warn!(%topic, "No research data found; skipping");
        return Ok(None);
    }

    let dir = topic_dir(output_dir, topic);
    fs::create_dir_all(&dir).await?;

    info!("Phase 2: base report");
    let report = summarizer.generate_deep_report(topic, docs).await;
    fs::write(dir.join(REPORT_FILE), &report).await?;
    info!(path = %dir.join(REPORT_FILE).display(), "Report saved");

    info!(?style, "Phase 3: slides");
    let slides = summarizer.generate_slides(topic, &report, style).await;
    let slides_path = dir.join(slides_file(style));
    fs::write(&slides_path, &slides).await?;
    info!(path = %slides_path.display(), "Slides saved");

    info!("Phase 4: video script");
    let script = summarizer
        .generate_video_script(topic, &report, "tiktok")
        .await;
    fs::write(dir.join(SCRIPT_FILE), &script).await?;
    info!(path = %dir.join(SCRIPT_FILE).display(), "Video script saved");

    info!(dir = %dir.display(), "Content ready");
    Ok(Some(dir))
}

/// Run the factory over today's trending topics. Errors on one topic are
/// logged and the batch moves on. Returns how many topics produced output.
#[instrument(level = "info", skip_all, fields(limit = limit))]
pub async fn run_batch<A: AskAsync>(
    llm: &A,
    summarizer: &Summarizer<'_, A>,
    limit: usize,
    language: &str,
    style: SlideStyle,
    output_dir: &Path,
) -> usize {
    let topics = trending_topics(llm, limit, language).await;
    info!(?topics, "Today's topics");

    let total = topics.len();
    let mut produced = 0usize;
    for (i, topic) in topics.iter().enumerate() {
        info!(index = i + 1, total, %topic, "Processing topic");
        match generate_for_topic(summarizer, topic, style, output_dir).await {
            Ok(Some(_)) => produced += 1,
            Ok(None) => {}
            Err(e) => error!(%topic, error = %e, "Error processing topic"),
        }
        if i + 1 < total {
            tokio::time::sleep(BATCH_PAUSE).await;
        }
    }
    produced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::StubLlm;
    use crate::summarizer::Preferences;

    fn prefs() -> Preferences {
        Preferences {
            interests: vec![],
            dislikes: vec![],
            language: "English".to_string(),
            token_saving_mode: false,
        }
    }

    fn doc() -> ResearchDoc {
        ResearchDoc {
            title: "Source A".to_string(),
            link: "https://example.com/a".to_string(),
            source: "Web Search".to_string(),
            summary: "snippet".to_string(),
            full_content: "Detailed findings.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_write_topic_content_writes_three_files() {
        let tmp = tempfile::tempdir().unwrap();
        let llm = StubLlm::new(|req| {
            let system = req.system.as_deref().unwrap_or("");
            if system.contains("industry analyst") {
                assert!(req.user.contains("--- Source 1: Source A ---"));
                assert!(req.user.contains("Link: https://example.com/a (Web Search)"));
                assert!(req.user.contains("Snippet: snippet"));
                Ok("# Report".to_string())
            } else if system.contains("Marp") {
                Ok("---\nmarp: true\ntheme: uncover\npaginate: true\n---\n# Deck".to_string())
            } else {
                Ok("[Visual] hook".to_string())
            }
        });
        let summarizer = Summarizer::new(&llm, prefs());

        let dir = write_topic_content(&summarizer, "EV price war?", &[doc()], SlideStyle::Viral, tmp.path())
            .await
            .unwrap()
            .unwrap();

        assert!(dir.file_name().unwrap().to_string_lossy().ends_with("_EV price war"));
        assert_eq!(std::fs::read_to_string(dir.join(REPORT_FILE)).unwrap(), "# Report");
        assert!(
            std::fs::read_to_string(dir.join("2_viral_slides.md"))
                .unwrap()
                .contains("# Deck")
        );
        assert_eq!(
            std::fs::read_to_string(dir.join(SCRIPT_FILE)).unwrap(),
            "[Visual] hook"
        );
    }

    #[tokio::test]
    async fn test_write_topic_content_skips_without_research() {
        let tmp = tempfile::tempdir().unwrap();
        let llm = StubLlm::new(|_| panic!("no calls expected"));
        let summarizer = Summarizer::new(&llm, prefs());
        let out = write_topic_content(&summarizer, "t", &[], SlideStyle::Viral, tmp.path())
            .await
            .unwrap();
        assert!(out.is_none());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_academic_style_names_the_deck() {
        let tmp = tempfile::tempdir().unwrap();
        let llm = StubLlm::new(|req| {
            if req.system.as_deref().unwrap_or("").contains("Marp") {
                assert_eq!(req.temperature, Some(0.3));
            }
            Ok("body".to_string())
        });
        let summarizer = Summarizer::new(&llm, prefs());
        let dir = write_topic_content(&summarizer, "Chips", &[doc()], SlideStyle::Academic, tmp.path())
            .await
            .unwrap()
            .unwrap();
        let deck = std::fs::read_to_string(dir.join("2_academic_slides.md")).unwrap();
        assert!(deck.contains("theme: gaia"));
        assert!(!dir.join("2_viral_slides.md").exists());
    }
}
