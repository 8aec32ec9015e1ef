//! Trending topic discovery for the content factory.

use crate::api::{AskAsync, ChatRequest, parse_json_reply};
use crate::research::search;
use chrono::Local;
use std::fmt::Write;
use tracing::{info, instrument, warn};

/// Used when search or extraction fails.
pub const FALLBACK_TOPICS: [&str; 10] = [
    "Box office forecast for the Spring Festival film season",
    "Industry impact of OpenAI's latest reasoning model",
    "Why young people are keeping their phones longer",
    "The electric vehicle price war",
    "The truth about the age-35 career crisis",
    "Controversy over pre-made meals in school canteens",
    "Latest property market policy explained",
    "Why graduates are struggling to find jobs",
    "Live-commerce sales data of a new streaming account",
    "Update on Musk's Mars colonization plan",
];

pub fn fallback_topics(count: usize) -> Vec<String> {
    FALLBACK_TOPICS.iter().take(count).map(|s| s.to_string()).collect()
}

/// Find `count` currently trending topics suitable for short-form content.
#[instrument(level = "info", skip_all, fields(count = count))]
pub async fn trending_topics<A: AskAsync>(llm: &A, count: usize, language: &str) -> Vec<String> {
    info!(count, "Fetching trending topics");
    let query = format!(
        "today's top news and trending topics {}",
        Local::now().format("%Y-%m-%d")
    );
    let results = search(&query, 10).await;
    if results.is_empty() {
        warn!("Search returned nothing; using fallback topics");
        return fallback_topics(count);
    }

    let mut raw_text = String::new();
    for r in &results {
        let _ = writeln!(raw_text, "- {}: {}", r.title, r.body);
    }
    let prompt = format!(
        r#"From the search results below, extract the {count} hottest topics right now that would make good short videos (debatable, high traffic, fresh).

Search results:
{raw_text}
Requirements:
1. Topics must be specific (e.g. "iPhone sales slump" rather than "tech news").
2. No duplicates.
3. Write the topics in {language}.
4. Return pure JSON with no Markdown, for example:
{{"topics": ["topic 1", "topic 2"]}}"#
    );
    let request = ChatRequest::new(prompt)
        .system("You are a social media trend analyst. Output JSON only.")
        .temperature(0.7)
        .json();

    match llm.ask(&request).await {
        Ok(reply) => {
            let topics = extract_topics(&reply, count);
            if topics.is_empty() {
                warn!("Topic extraction returned nothing; using fallback topics");
                fallback_topics(count)
            } else {
                topics
            }
        }
        Err(e) => {
            warn!(error = %e, "Topic extraction failed; using fallback topics");
            fallback_topics(count)
        }
    }
}

/// Pull a list of topics out of a model reply.
///
/// Accepts a bare array, `{"topics": [...]}`, or any object and takes its
/// first array value. Non-string entries are skipped.
pub fn extract_topics(reply: &str, count: usize) -> Vec<String> {
    let value: serde_json::Value = match parse_json_reply(reply) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let list = match &value {
        serde_json::Value::Array(items) => Some(items),
        serde_json::Value::Object(map) => map
            .get("topics")
            .and_then(|v| v.as_array())
            .or_else(|| map.values().find_map(|v| v.as_array())),
        _ => None,
    };

    list.map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(count)
            .collect()
    })
    .unwrap_or_default()
}
