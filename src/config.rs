//! Runtime configuration.
//!
//! Settings are layered: built-in defaults, then an optional `config.yaml`,
//! then environment variables (a `.env` file in the working directory is
//! loaded first). Secrets such as API keys and SMTP passwords are only ever
//! read from the environment.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use tracing::{debug, info, instrument};

/// A named RSS/Atom feed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// OpenAI-compatible endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
        }
    }
}

/// Outgoing mail settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailSettings {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub from_name: String,
    pub recipients: Vec<String>,
    /// Plain text file with one subscriber address per line.
    pub subscribers_file: String,
    #[serde(skip)]
    pub smtp_user: Option<String>,
    #[serde(skip)]
    pub smtp_password: Option<String>,
    #[serde(skip)]
    pub resend_api_key: Option<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            from_name: "AI Daily Agent".to_string(),
            recipients: Vec::new(),
            subscribers_file: "subscribers.txt".to_string(),
            smtp_user: None,
            smtp_password: None,
            resend_api_key: None,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub feeds: Vec<FeedSource>,
    /// Topics the ranking favours.
    pub interests: Vec<String>,
    /// Topics the ranking pushes down.
    pub dislikes: Vec<String>,
    /// Output language requested from the model.
    pub language: String,
    /// Run the single batch title filter before per-article analysis.
    pub token_saving_mode: bool,
    pub llm: LlmSettings,
    pub email: EmailSettings,
    pub output_dir: String,
    pub history_file: String,
    /// Local `HH:MM` at which the scheduler fires.
    pub schedule_time: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            interests: [
                "Large Language Models (LLM)",
                "Generative AI",
                "AI Agents",
                "OpenAI",
                "DeepMind",
                "Transformer Architecture",
                "RAG (Retrieval-Augmented Generation)",
                "Autonomous Systems",
                "AI Coding Assistants",
                "AI in Healthcare",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            dislikes: ["Crypto", "Blockchain", "NFT", "Metaverse Hype", "Web3"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            language: "Chinese".to_string(),
            token_saving_mode: true,
            llm: LlmSettings::default(),
            email: EmailSettings::default(),
            output_dir: "output".to_string(),
            history_file: "data/history.json".to_string(),
            schedule_time: "08:00".to_string(),
        }
    }
}

fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource::new("OpenAI Blog", "https://openai.com/blog/rss.xml"),
        FeedSource::new("Google DeepMind", "https://deepmind.google/blog/rss.xml"),
        FeedSource::new("Microsoft Research", "https://www.microsoft.com/en-us/research/feed/"),
        FeedSource::new("Hugging Face Blog", "https://huggingface.co/blog/feed.xml"),
        FeedSource::new(
            "TechCrunch AI",
            "https://techcrunch.com/category/artificial-intelligence/feed/",
        ),
        FeedSource::new("The Verge AI", "https://www.theverge.com/rss/ai/index.xml"),
        FeedSource::new(
            "MIT Technology Review AI",
            "https://www.technologyreview.com/topic/artificial-intelligence/feed",
        ),
        FeedSource::new("Reddit Machine Learning", "https://www.reddit.com/r/MachineLearning/.rss"),
        FeedSource::new("机器之心", "https://www.jiqizhixin.com/rss"),
        FeedSource::new("量子位", "https://www.qbitai.com/feed"),
    ]
}

impl AppConfig {
    /// Load configuration from `path` (if it exists) and the environment.
    ///
    /// A missing file is not an error; a file that exists but does not
    /// parse is.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        match dotenvy::dotenv() {
            Ok(env_path) => debug!(path = %env_path.display(), "Loaded .env"),
            Err(e) => debug!(error = %e, "No .env loaded"),
        }

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let parsed = Self::from_yaml(&raw)?;
            info!(feeds = parsed.feeds.len(), "Loaded configuration file");
            parsed
        } else {
            info!("No configuration file; using built-in defaults");
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, Box<dyn Error>> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Overlay environment values. `lookup` is injectable for tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("SMTP_SERVER") {
            self.email.smtp_server = v;
        }
        if let Some(port) = get("SMTP_PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
            self.email.smtp_port = port;
        }
        if let Some(v) = get("SMTP_USER") {
            self.email.smtp_user = Some(v);
        }
        if let Some(v) = get("SMTP_PASSWORD") {
            self.email.smtp_password = Some(v);
        }
        if let Some(v) = get("RESEND_API_KEY") {
            self.email.resend_api_key = Some(v);
        }
        if let Some(v) = get("EMAIL_RECIPIENTS") {
            self.email.recipients = v
                .split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect();
        }
    }
}
