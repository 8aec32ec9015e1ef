//! Report delivery by email.
//!
//! Two backends sit behind the [`Mailer`] trait:
//! - [`SmtpMailer`]: STARTTLS + login through `lettre`
//! - [`ResendMailer`]: the Resend HTTP API, used whenever `RESEND_API_KEY` is set
//!
//! Recipients are the configured list plus everyone in the subscribers file.

use crate::config::EmailSettings;
use chrono::Local;
use itertools::Itertools;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::Client;
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::time::Duration as StdDuration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument, warn};

pub const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
/// Sender address Resend accepts without a verified domain.
pub const RESEND_FALLBACK_SENDER: &str = "onboarding@resend.dev";
pub const SEND_ATTEMPTS: usize = 3;
/// Backoff grows linearly: 2 s, 4 s, ...
pub const SEND_BACKOFF: StdDuration = StdDuration::from_secs(2);

/// Anything that can deliver an HTML message.
pub trait Mailer {
    async fn send_html(&self, recipients: &[String], subject: &str, html: &str) -> Result<(), Box<dyn Error>>;
}

/// SMTP delivery with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpMailer").field("from", &self.from.to_string()).finish()
    }
}

impl SmtpMailer {
    pub fn new(server: &str, port: u16, user: &str, password: &str, from_name: &str) -> Result<Self, Box<dyn Error>> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)?
            .port(port)
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .build();
        let from: Mailbox = format!("{} <{}>", from_name, user).parse()?;
        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    async fn send_html(&self, recipients: &[String], subject: &str, html: &str) -> Result<(), Box<dyn Error>> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for rcpt in recipients {
            builder = builder.to(rcpt.parse()?);
        }
        let message = builder.header(ContentType::TEXT_HTML).body(html.to_string())?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Delivery through the Resend HTTP API.
pub struct ResendMailer {
    client: Client,
    api_key: String,
    from: String,
}

impl fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResendMailer").field("from", &self.from).finish()
    }
}

impl ResendMailer {
    pub fn new(api_key: &str, from: String) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder().timeout(StdDuration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            from,
        })
    }
}

impl Mailer for ResendMailer {
    async fn send_html(&self, recipients: &[String], subject: &str, html: &str) -> Result<(), Box<dyn Error>> {
        let body = serde_json::json!({
            "from": self.from,
            "to": recipients,
            "subject": subject,
            "html": html,
        });
        let resp = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("Resend returned {}: {}", status, text).into());
        }
        Ok(())
    }
}

/// The backend picked from settings.
#[derive(Debug)]
pub enum MailBackend {
    Smtp(SmtpMailer),
    Resend(ResendMailer),
}

impl MailBackend {
    /// Resend when an API key is present, SMTP when user and password are.
    /// `Ok(None)` when neither is configured.
    pub fn from_settings(settings: &EmailSettings) -> Result<Option<Self>, Box<dyn Error>> {
        if let Some(key) = settings.resend_api_key.as_deref().filter(|k| !k.is_empty()) {
            let address = settings
                .smtp_user
                .as_deref()
                .filter(|u| !u.is_empty())
                .unwrap_or(RESEND_FALLBACK_SENDER);
            let from = format!("{} <{}>", settings.from_name, address);
            return Ok(Some(MailBackend::Resend(ResendMailer::new(key, from)?)));
        }

        match (settings.smtp_user.as_deref(), settings.smtp_password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Ok(Some(MailBackend::Smtp(SmtpMailer::new(
                    &settings.smtp_server,
                    settings.smtp_port,
                    user,
                    password,
                    &settings.from_name,
                )?)))
            }
            _ => Ok(None),
        }
    }
}

impl Mailer for MailBackend {
    async fn send_html(&self, recipients: &[String], subject: &str, html: &str) -> Result<(), Box<dyn Error>> {
        match self {
            MailBackend::Smtp(m) => m.send_html(recipients, subject, html).await,
            MailBackend::Resend(m) => m.send_html(recipients, subject, html).await,
        }
    }
}

/// `🤖 {title} - YYYY-MM-DD`
pub fn subject_line(title: &str) -> String {
    format!("🤖 {} - {}", title, Local::now().format("%Y-%m-%d"))
}

/// Send with up to `attempts` tries, sleeping `backoff * n` after the n-th failure.
///
/// # Arguments
///
/// * `mailer` - Backend that performs a single delivery
/// * `recipients` - Addresses placed in `To`
/// * `subject` - Full subject line
/// * `html` - Message body
/// * `attempts` - Total tries, at least one
/// * `backoff` - Base pause; grows linearly with each failure
///
/// # Returns
///
/// `Ok(())` on the first successful delivery, otherwise the last error.
///
/// # Example
///
/// ```ignore
/// send_with_retry(&mailer, &recipients, &subject, &html, 3, Duration::from_secs(2)).await?;
/// ```
pub async fn send_with_retry<M: Mailer>(
    mailer: &M,
    recipients: &[String],
    subject: &str,
    html: &str,
    attempts: usize,
    backoff: StdDuration,
) -> Result<(), Box<dyn Error>> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match mailer.send_html(recipients, subject, html).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < attempts => {
                warn!(attempt, error = %e, "Email send failed; retrying");
                tokio::time::sleep(backoff * attempt as u32).await;
                attempt += 1;
            }
            Err(e) => {
                error!(attempts, error = %e, "Failed to send email");
                return Err(e);
            }
        }
    }
}

/// Mail `html` to `recipients` with the configured backend.
///
/// Skips with a warning when there are no recipients or no credentials.
#[instrument(level = "info", skip_all, fields(%title, recipients = recipients.len()))]
pub async fn send_report(
    settings: &EmailSettings,
    html: &str,
    title: &str,
    recipients: &[String],
) -> Result<(), Box<dyn Error>> {
    if recipients.is_empty() {
        warn!("No email recipients configured; skipping email");
        return Ok(());
    }
    let Some(backend) = MailBackend::from_settings(settings)? else {
        warn!("Email credentials not configured; skipping email");
        return Ok(());
    };

    info!(?backend, "Sending email");
    send_with_retry(&backend, recipients, &subject_line(title), html, SEND_ATTEMPTS, SEND_BACKOFF).await?;
    info!("Email sent successfully");
    Ok(())
}

/// Read the subscribers file: one address per line, blanks skipped.
/// A missing file means no subscribers.
pub async fn load_subscribers(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Append `email` to the subscribers file unless already present.
/// Returns whether it was added.
#[instrument(level = "info", skip_all, fields(%email))]
pub async fn add_subscriber(path: &Path, email: &str) -> Result<bool, Box<dyn Error>> {
    let email = email.trim();
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    if raw.lines().map(str::trim).any(|e| e == email) {
        info!("Subscriber already present");
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    // Keep one address per line even if the file lacks a trailing newline.
    let needs_newline = !raw.is_empty() && !raw.ends_with('\n');
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path).await?;
    let line = if needs_newline {
        format!("\n{}\n", email)
    } else {
        format!("{}\n", email)
    };
    file.write_all(line.as_bytes()).await?;
    info!("Subscriber added");
    Ok(true)
}

/// Configured recipients followed by subscribers, trimmed and deduplicated.
pub fn merge_recipients(configured: &[String], subscribers: &[String]) -> Vec<String> {
    configured
        .iter()
        .chain(subscribers)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unique()
        .map(String::from)
        .collect()
}

/// Configured recipients plus the subscribers file.
pub async fn all_recipients(settings: &EmailSettings) -> Result<Vec<String>, Box<dyn Error>> {
    let subscribers = load_subscribers(Path::new(&settings.subscribers_file)).await?;
    Ok(merge_recipients(&settings.recipients, &subscribers))
}

pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    matches!(email.split_once('@'), Some((user, domain)) if !user.is_empty() && !domain.is_empty())
}

/// Prepend the new-subscriber banner to a report.
pub fn welcome_html(report_html: &str) -> String {
    format!(
        r#"<div style="background-color:#e3f2fd;padding:20px;border-radius:8px;margin-bottom:20px;border:1px solid #90caf9;">
<h2 style="color:#1565c0;margin-top:0;">🎉 Welcome to AI Daily News!</h2>
<p>Thanks for subscribing. Starting tomorrow you will get the latest AI industry news every morning.</p>
<p>So you don't have to wait, here is <strong>today's briefing</strong> 👇</p>
<p style="font-size:12px;color:#666;">(Add this address to your contacts so the report doesn't land in spam.)</p>
</div>
<hr style="border:0;border-top:1px solid #eee;margin:30px 0;">
{}"#,
        report_html
    )
}
