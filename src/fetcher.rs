//! RSS/Atom collection.
//!
//! Every configured feed is fetched concurrently (at most
//! [`MAX_CONCURRENT_FEEDS`] in flight). A feed that fails to download or parse
//! is logged and contributes nothing; the run continues with the others.

use crate::config::FeedSource;
use crate::models::NewsItem;
use chrono::{DateTime, Duration, Local};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER};
use std::error::Error;
use std::time::Duration as StdDuration;
use tracing::{debug, info, instrument, warn};

pub const MAX_CONCURRENT_FEEDS: usize = 10;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// HTTP client preconfigured with the headers feed hosts expect from a browser.
pub fn feed_client() -> Result<Client, Box<dyn Error>> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "application/rss+xml, application/xml, application/atom+xml, text/xml;q=0.9, */*;q=0.8",
        ),
    );
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
    Ok(Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .timeout(StdDuration::from_secs(15))
        .build()?)
}

/// Fetch all feeds and return entries published within the last `hours_back`
/// hours, newest first.
///
/// Up to ten feeds are downloaded at once. A feed that fails to download or
/// parse is logged and skipped; the others still contribute.
///
/// # Arguments
///
/// * `feeds` - Feed names and URLs to pull
/// * `hours_back` - Size of the collection window ending now
///
/// # Returns
///
/// Every entry inside the window, sorted newest first. Empty when nothing
/// was published or every feed failed.
///
/// # Example
///
/// ```ignore
/// let items = fetch_all(&config.feeds, 24).await?;
/// ```
#[instrument(level = "info", skip_all, fields(feeds = feeds.len(), hours_back = hours_back))]
pub async fn fetch_all(feeds: &[FeedSource], hours_back: i64) -> Result<Vec<NewsItem>, Box<dyn Error>> {
    let client = feed_client()?;
    let cutoff = Local::now() - Duration::hours(hours_back);
    info!(sources = feeds.len(), hours_back, "Fetching news feeds");

    let batches: Vec<Vec<NewsItem>> = stream::iter(feeds)
        .map(|feed| {
            let client = &client;
            async move {
                match fetch_feed(client, feed, cutoff).await {
                    Ok(items) => {
                        if items.is_empty() {
                            info!(source = %feed.name, "No new items");
                        } else {
                            info!(source = %feed.name, count = items.len(), "Found items");
                        }
                        items
                    }
                    Err(e) => {
                        warn!(source = %feed.name, url = %feed.url, error = %e, "Feed fetch failed");
                        Vec::new()
                    }
                }
            }
        })
        .buffer_unordered(MAX_CONCURRENT_FEEDS)
        .collect()
        .await;

    let mut all: Vec<NewsItem> = batches.into_iter().flatten().collect();
    sort_newest_first(&mut all);
    info!(count = all.len(), "News items collected");
    Ok(all)
}

/// Download and parse a single feed.
#[instrument(level = "debug", skip_all, fields(source = %feed.name))]
async fn fetch_feed(
    client: &Client,
    feed: &FeedSource,
    cutoff: DateTime<Local>,
) -> Result<Vec<NewsItem>, Box<dyn Error>> {
    let response = client.get(&feed.url).send().await?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(format!("status {}", status).into());
    }
    let bytes = response.bytes().await?;
    debug!(bytes = bytes.len(), "Downloaded feed");
    parse_feed(&bytes, &feed.name, cutoff, Local::now())
}

/// Parse feed bytes into items no older than `cutoff`.
///
/// Entries with neither a published nor an updated timestamp are stamped
/// with `now` and therefore always kept.
pub fn parse_feed(
    bytes: &[u8],
    source: &str,
    cutoff: DateTime<Local>,
    now: DateTime<Local>,
) -> Result<Vec<NewsItem>, Box<dyn Error>> {
    let parsed = feed_rs::parser::parse(bytes)?;

    let items = parsed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let published = entry
                .published
                .or(entry.updated)
                .map(|d| d.with_timezone(&Local))
                .unwrap_or(now);
            if published < cutoff {
                return None;
            }

            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let link = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();
            if title.trim().is_empty() && link.is_empty() {
                return None;
            }
            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            Some(NewsItem {
                title: title.trim().to_string(),
                link,
                summary,
                source: source.to_string(),
                published,
                full_content: None,
                image: None,
            })
        })
        .collect();
    Ok(items)
}

pub fn sort_newest_first(items: &mut [NewsItem]) {
    items.sort_by(|a, b| b.published.cmp(&a.published));
}
