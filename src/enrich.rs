//! Full-article enrichment.
//!
//! Feed summaries are usually a sentence or two. This stage downloads each
//! linked page and pulls out the main body text and a lead image so the
//! summarizer has something substantial to read.

use crate::fetcher::BROWSER_USER_AGENT;
use crate::models::NewsItem;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use std::error::Error;
use std::time::Duration as StdDuration;
use tracing::{debug, info, instrument};

pub const MAX_CONCURRENT_PAGES: usize = 10;

/// Minimum length for extracted text to count as the article body.
pub const MIN_ARTICLE_CHARS: usize = 200;
/// Minimum length for the all-paragraphs fallback.
const MIN_FALLBACK_CHARS: usize = 100;

static ARTICLE_PARAGRAPHS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article p").expect("valid selector"));
static ALL_PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));
static OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).expect("valid selector"));
static TWITTER_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="twitter:image"]"#).expect("valid selector"));

/// What could be recovered from an article page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PageDetails {
    pub text: String,
    pub image: Option<String>,
}

pub fn page_client() -> Result<Client, Box<dyn Error>> {
    Ok(Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(StdDuration::from_secs(10))
        .build()?)
}

/// Fetch a page and extract its details. Network or decode failures yield
/// empty details rather than an error.
#[instrument(level = "debug", skip_all, fields(%url))]
pub async fn fetch_details(client: &Client, url: &str) -> PageDetails {
    match fetch_html(client, url).await {
        Ok(html) => extract_details(&html),
        Err(e) => {
            debug!(error = %e, "Page fetch failed");
            PageDetails::default()
        }
    }
}

async fn fetch_html(client: &Client, url: &str) -> Result<String, Box<dyn Error>> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Pull body text and lead image out of an HTML document.
///
/// Text comes from `<article>` paragraphs when they are long enough,
/// otherwise from every `<p>` on the page.
pub fn extract_details(html: &str) -> PageDetails {
    let document = Html::parse_document(html);

    let article_text = join_paragraphs(&document, &ARTICLE_PARAGRAPHS, "\n\n");
    let text = if article_text.chars().count() > MIN_ARTICLE_CHARS {
        article_text
    } else {
        let all = join_paragraphs(&document, &ALL_PARAGRAPHS, " ");
        if all.chars().count() > MIN_FALLBACK_CHARS {
            all
        } else {
            String::new()
        }
    };

    let image = meta_content(&document, &OG_IMAGE).or_else(|| meta_content(&document, &TWITTER_IMAGE));

    PageDetails { text, image }
}

/// First non-empty `content` attribute among the matching `<meta>` tags.
fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

fn join_paragraphs(document: &Html, selector: &Selector, sep: &str) -> String {
    document
        .select(selector)
        .map(|p| p.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Apply page details to an item: long text replaces the feed summary as the
/// body, short or missing text falls back to the summary.
pub fn apply_details(item: &mut NewsItem, details: PageDetails) {
    item.full_content = if details.text.chars().count() > MIN_ARTICLE_CHARS {
        Some(details.text)
    } else {
        Some(item.summary.clone())
    };
    item.image = details.image;
}

/// Fetch full content and images for all items concurrently.
///
/// # Arguments
///
/// * `items` - Feed entries to enrich; consumed and returned in the same order
///
/// # Returns
///
/// The items with `full_content` and `image` filled in. When a page fails
/// to load or has too little text, `full_content` falls back to the feed
/// summary.
#[instrument(level = "info", skip_all, fields(count = items.len()))]
pub async fn enrich_items(mut items: Vec<NewsItem>) -> Result<Vec<NewsItem>, Box<dyn Error>> {
    let client = page_client()?;
    info!(count = items.len(), "Fetching full content and images");

    let details: Vec<(usize, PageDetails)> = stream::iter(items.iter().enumerate())
        .map(|(i, item)| {
            let client = &client;
            async move { (i, fetch_details(client, &item.link).await) }
        })
        .buffer_unordered(MAX_CONCURRENT_PAGES)
        .collect()
        .await;

    let mut full = 0usize;
    for (i, d) in details {
        if d.text.chars().count() > MIN_ARTICLE_CHARS {
            full += 1;
        }
        apply_details(&mut items[i], d);
    }
    info!(total = items.len(), full_text = full, "Enrichment finished");
    Ok(items)
}
