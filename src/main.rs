//! # Daily AI News
//!
//! An agent that collects AI news from RSS/Atom feeds, ranks and summarizes
//! it with an OpenAI-compatible LLM, and publishes a daily report as HTML,
//! Markdown and email. A second pipeline, the content factory, turns a
//! single topic into a research report, a slide deck and a short-video script.
//!
//! ## Usage
//!
//! ```sh
//! daily_ai_news run --hours 24 --email
//! daily_ai_news schedule --at 08:00
//! daily_ai_news factory --batch --limit 5
//! ```
//!
//! ## Architecture
//!
//! The daily job is a pipeline:
//! 1. **Fetching**: Pull recent entries from every configured feed (10 at a time)
//! 2. **Enrichment**: Download each article page for full text and lead image
//! 3. **Summarizing**: Filter, score and categorize with the LLM (5 at a time)
//! 4. **Output**: Write HTML/JSON reports, print Markdown, optionally email

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod email;
mod enrich;
mod factory;
mod fetcher;
mod memory;
mod models;
mod outputs;
mod research;
mod scheduler;
mod summarizer;
mod topics;
mod utils;

use api::build_client;
use cli::{Cli, Command, FactoryArgs, RunArgs};
use config::AppConfig;
use memory::MemoryManager;
use outputs::{convert, html, json, markdown};
use summarizer::{Preferences, Summarizer};
use utils::{ensure_writable_dir, parse_hhmm};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = AppConfig::load(&args.config)?;

    match args.command {
        Command::Run(RunArgs { hours, email }) => run_daily_job(&config, hours, email).await,
        Command::Schedule { at, now } => {
            let at = parse_hhmm(at.as_deref().unwrap_or(&config.schedule_time))?;
            info!(at = %at.format("%H:%M"), "AI news scheduler is running");
            let cfg = &config;
            scheduler::run_daily(at, now, move || run_daily_job(cfg, 24, true)).await;
            Ok(())
        }
        Command::Factory(factory_args) => run_factory(&config, factory_args).await,
        Command::Send { to } => send_latest(&config, to).await,
        Command::Welcome { email } => welcome(&config, &email).await,
        Command::Convert { input, output } => convert::markdown_file_to_html(&input, &output).await,
        Command::History { days } => {
            let memory = MemoryManager::open(&config.history_file).await?;
            debug!(path = %memory.path().display(), days, "Reading history");
            println!("{}", memory.context_string(days).await);
            Ok(())
        }
    }
}

/// Fetch → enrich → summarize → render → (email).
#[instrument(level = "info", skip_all, fields(hours = hours, send_email = send_email))]
async fn run_daily_job(config: &AppConfig, hours: i64, send_email: bool) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    info!("Starting daily AI news job");

    // Early check: ensure output dir is writable
    let output_dir = Path::new(&config.output_dir);
    if let Err(e) = ensure_writable_dir(output_dir).await {
        error!(
            path = %output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Fetch feeds ----
    let items = fetcher::fetch_all(&config.feeds, hours).await?;
    if items.is_empty() {
        warn!(hours, "No news found in the specified time range");
        return Ok(());
    }

    // ---- Full content ----
    let items = match enrich::enrich_items(items.clone()).await {
        Ok(enriched) => enriched,
        Err(e) => {
            error!(error = %e, "Error enriching news content; continuing with feed summaries");
            items
        }
    };

    // ---- Summarize ----
    let memory = MemoryManager::open(&config.history_file).await?;
    let llm = build_client(&config.llm)?;
    info!(model = %llm.inner().model(), "LLM client ready");
    let summarizer = Summarizer::new(&llm, Preferences::from(config)).with_memory(&memory);
    let Some(summary) = summarizer.summarize(items).await else {
        warn!("Failed to generate summary");
        return Ok(());
    };

    // ---- Output ----
    let report_path = html::write_report(output_dir, &summary).await?;
    if let Err(e) = html::write_wechat(output_dir, &summary).await {
        error!(error = %e, "Failed to write WeChat HTML");
    }
    if let Err(e) = json::write_summary(output_dir, &summary).await {
        error!(error = %e, "Failed to write JSON snapshot");
    }

    let date = Local::now().format("%Y-%m-%d").to_string();
    println!("{}", markdown::render_markdown(&summary));
    println!("{}", "=".repeat(50));
    println!("📱 WeChat version (ready to paste):");
    println!("{}", markdown::render_wechat_markdown(&summary, &date));
    println!("{}", "=".repeat(50));

    // ---- Email ----
    if send_email {
        let recipients = email::all_recipients(&config.email).await?;
        let html_content = tokio::fs::read_to_string(&report_path).await?;
        email::send_report(&config.email, &html_content, &summary.title, &recipients).await?;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        report = %report_path.display(),
        stories = summary.story_count(),
        "Daily job complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_factory(config: &AppConfig, args: FactoryArgs) -> Result<(), Box<dyn Error>> {
    let output_dir = Path::new(&config.output_dir);
    ensure_writable_dir(output_dir).await?;

    let llm = build_client(&config.llm)?;
    let summarizer = Summarizer::new(&llm, Preferences::from(config));

    if let Some(topic) = args.topic {
        match factory::generate_for_topic(&summarizer, &topic, args.style, output_dir).await? {
            Some(dir) => info!(dir = %dir.display(), "Factory run complete"),
            None => warn!(%topic, "Nothing produced"),
        }
    } else {
        let produced = factory::run_batch(
            &llm,
            &summarizer,
            args.limit,
            &config.language,
            args.style,
            output_dir,
        )
        .await;
        info!(produced, limit = args.limit, "Batch factory run complete");
    }
    Ok(())
}

/// Mail the newest report to `to`, or to the configured recipients when empty.
#[instrument(level = "info", skip_all)]
async fn send_latest(config: &AppConfig, to: Vec<String>) -> Result<(), Box<dyn Error>> {
    let Some(report) = html::latest_report(Path::new(&config.output_dir)).await? else {
        warn!(dir = %config.output_dir, "No HTML reports found; run the daily job first");
        return Ok(());
    };
    info!(path = %report.display(), "Reading latest report");
    let html_content = tokio::fs::read_to_string(&report).await?;

    let recipients = if to.is_empty() {
        email::all_recipients(&config.email).await?
    } else {
        email::merge_recipients(&to, &[])
    };
    email::send_report(&config.email, &html_content, "AI Daily Insight", &recipients).await
}

#[instrument(level = "info", skip_all, fields(%address))]
async fn welcome(config: &AppConfig, address: &str) -> Result<(), Box<dyn Error>> {
    if !email::is_plausible_email(address) {
        return Err(format!("'{}' is not a valid email address", address).into());
    }
    email::add_subscriber(Path::new(&config.email.subscribers_file), address).await?;

    let Some(report) = html::latest_report(Path::new(&config.output_dir)).await? else {
        warn!(dir = %config.output_dir, "No HTML reports found; run the daily job first");
        return Ok(());
    };
    info!(path = %report.display(), "Attaching latest report");
    let html_content = email::welcome_html(&tokio::fs::read_to_string(&report).await?);
    let recipients = vec![address.trim().to_string()];
    email::send_report(&config.email, &html_content, "Welcome to AI Daily News! 🎉", &recipients).await
}
