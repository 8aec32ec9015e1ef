//! Web search and deep research.
//!
//! Searches go through DuckDuckGo's no-JavaScript HTML endpoint, which needs
//! no API key. Result links there are usually wrapped in a
//! `duckduckgo.com/l/?uddg=<target>` redirect that is unwrapped here.

use crate::enrich::{fetch_details, page_client};
use crate::fetcher::BROWSER_USER_AGENT;
use crate::models::ResearchDoc;
use crate::utils::truncate_chars;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use std::error::Error;
use std::time::Duration as StdDuration;
use tracing::{info, instrument, warn};
use url::Url;

pub const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
pub const RESEARCH_RESULTS: usize = 5;
pub const MAX_CONCURRENT_READS: usize = 5;
/// Characters of page text kept per research document.
pub const RESEARCH_CONTENT_CHARS: usize = 5000;

static RESULT: Lazy<Selector> = Lazy::new(|| Selector::parse(".result").expect("valid selector"));
static RESULT_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.result__a").expect("valid selector"));
static RESULT_SNIPPET: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".result__snippet").expect("valid selector"));

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub href: String,
    pub body: String,
}

/// Search the web. Failures are logged and yield no results.
#[instrument(level = "info", skip_all, fields(%query, max_results = max_results))]
pub async fn search(query: &str, max_results: usize) -> Vec<SearchResult> {
    info!("Searching web");
    match search_inner(query, max_results).await {
        Ok(results) => {
            info!(count = results.len(), "Search finished");
            results
        }
        Err(e) => {
            warn!(error = %e, "Search failed");
            Vec::new()
        }
    }
}

async fn search_inner(query: &str, max_results: usize) -> Result<Vec<SearchResult>, Box<dyn Error>> {
    let client = Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(StdDuration::from_secs(15))
        .build()?;
    let url = format!("{}?q={}", SEARCH_ENDPOINT, urlencoding::encode(query));
    let html = client.get(&url).send().await?.error_for_status()?.text().await?;
    Ok(parse_results(&html, max_results))
}

/// Extract results from a DuckDuckGo HTML results page.
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT)
        .filter_map(|result| {
            let link = result.select(&RESULT_LINK).next()?;
            let href = resolve_result_href(link.value().attr("href")?)?;
            let title = link.text().collect::<String>().trim().to_string();
            let body = result
                .select(&RESULT_SNIPPET)
                .next()
                .map(|s| s.text().collect::<String>().trim().to_string())
                .unwrap_or_default();
            Some(SearchResult { title, href, body })
        })
        .take(max_results)
        .collect()
}

/// Unwrap `//duckduckgo.com/l/?uddg=...` redirects; pass direct links through.
/// Ad links and anything that is not http(s) are dropped.
pub fn resolve_result_href(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&absolute).ok()?;

    let target = if parsed.host_str().is_some_and(|h| h.ends_with("duckduckgo.com")) {
        if parsed.path().starts_with("/y.js") {
            return None;
        }
        let (_, v) = parsed.query_pairs().find(|(k, _)| k == "uddg")?;
        Url::parse(&v).ok()?
    } else {
        parsed
    };

    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

/// Search a topic and read the pages behind the top results.
#[instrument(level = "info", skip_all, fields(%topic))]
pub async fn research_topic(topic: &str) -> Result<Vec<ResearchDoc>, Box<dyn Error>> {
    let results = search(topic, RESEARCH_RESULTS).await;
    if results.is_empty() {
        return Ok(Vec::new());
    }

    info!(count = results.len(), "Reading articles for deep dive");
    let client = page_client()?;
    let docs: Vec<ResearchDoc> = stream::iter(results)
        .map(|res| {
            let client = &client;
            async move {
                let details = fetch_details(client, &res.href).await;
                ResearchDoc {
                    full_content: truncate_chars(&details.text, RESEARCH_CONTENT_CHARS).to_string(),
                    title: res.title,
                    link: res.href,
                    source: "Web Search".to_string(),
                    summary: res.body,
                }
            }
        })
        .buffered(MAX_CONCURRENT_READS)
        .collect()
        .await;
    Ok(docs)
}
