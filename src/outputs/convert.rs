//! Markdown → standalone styled HTML.

use askama::Template;
use pulldown_cmark::{Options, Parser, html};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

#[derive(Template)]
#[template(path = "page.html")]
struct Page<'a> {
    title: &'a str,
    /// Already rendered HTML, inserted unescaped.
    body: &'a str,
}

/// Render Markdown (tables, strikethrough, fenced code) to an HTML fragment.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, parser);
    body
}

/// Wrap an HTML fragment in a full page with the shared stylesheet.
pub fn wrap_page(title: &str, body: &str) -> askama::Result<String> {
    Page { title, body }.render()
}

/// Convert a Markdown file into a styled HTML file.
#[instrument(level = "info", skip_all, fields(input = %input.display(), output = %output.display()))]
pub async fn markdown_file_to_html(input: &Path, output: &Path) -> Result<(), Box<dyn Error>> {
    let markdown = fs::read_to_string(input).await?;
    let title = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Document".to_string());
    let page = wrap_page(&title, &markdown_to_html(&markdown))?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(output, page).await?;
    info!("Converted Markdown to HTML");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_to_html_tables_and_code() {
        let md = "# Title\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n```rust\nfn x() {}\n```\n\n~~gone~~\n";
        let html = markdown_to_html(md);
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains("<code class=\"language-rust\">"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_wrap_page_escapes_title_only() {
        let page = wrap_page("R&D <notes>", "<p>kept</p>").unwrap();
        assert!(page.contains("<title>R&amp;D &lt;notes&gt;</title>"));
        assert!(page.contains("<p>kept</p>"));
    }

    #[tokio::test]
    async fn test_markdown_file_to_html() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("project_summary.md");
        let output = tmp.path().join("out/project_summary.html");
        std::fs::write(&input, "## Hello\n\nworld").unwrap();

        markdown_file_to_html(&input, &output).await.unwrap();

        let page = std::fs::read_to_string(&output).unwrap();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>project_summary</title>"));
        assert!(page.contains("<h2>Hello</h2>"));
        assert!(page.contains("<div class=\"container\">"));
    }

    #[tokio::test]
    async fn test_missing_input_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let err = markdown_file_to_html(&tmp.path().join("none.md"), &tmp.path().join("o.html")).await;
        assert!(err.is_err());
    }
}
