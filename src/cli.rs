//! Command-line interface definitions for the daily AI news agent.
//!
//! Every subcommand reads the same layered configuration (`--config`, then
//! environment variables).

use crate::summarizer::SlideStyle;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # One run over the last 24 hours, mailing the result
/// daily_ai_news run --email
///
/// # Run every day at 08:00 local time, starting with one run now
/// daily_ai_news schedule --at 08:00 --now
///
/// # Research a topic and produce report, slides and a video script
/// daily_ai_news factory --topic "Open-weight model licensing"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to config.yaml
    #[arg(short, long, global = true, env = "DAILY_AI_NEWS_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, summarize and render today's report
    Run(RunArgs),
    /// Run the daily job every day at a fixed local time
    Schedule {
        /// Local time as HH:MM (defaults to `schedule_time` from config)
        #[arg(long)]
        at: Option<String>,
        /// Also run once immediately
        #[arg(long)]
        now: bool,
    },
    /// Turn a topic into a report, slides and a short-video script
    Factory(FactoryArgs),
    /// Mail the latest HTML report
    Send {
        /// Comma-separated recipients overriding the configured list
        #[arg(long, value_delimiter = ',')]
        to: Vec<String>,
    },
    /// Add a subscriber and mail them the latest report with a welcome banner
    Welcome { email: String },
    /// Convert a Markdown file to a styled HTML page
    Convert { input: PathBuf, output: PathBuf },
    /// Print the recent history context
    History {
        #[arg(long, default_value_t = 3)]
        days: i64,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// How many hours back to collect news
    #[arg(long, default_value_t = 24)]
    pub hours: i64,
    /// Mail the report when done
    #[arg(long)]
    pub email: bool,
}

#[derive(Args, Debug)]
pub struct FactoryArgs {
    /// Single topic to produce content for
    #[arg(long, conflicts_with = "batch", required_unless_present = "batch")]
    pub topic: Option<String>,
    /// Discover trending topics and process each one
    #[arg(long)]
    pub batch: bool,
    /// Topics to process in batch mode
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
    /// Slide deck style
    #[arg(long, value_enum, default_value_t = SlideStyle::Viral)]
    pub style: SlideStyle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_run_defaults() {
        let cli = Cli::parse_from(["daily_ai_news", "run"]);
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.hours, 24);
                assert!(!args.email);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_config_after_subcommand() {
        let cli = Cli::parse_from(["daily_ai_news", "run", "--hours", "12", "--email", "-c", "alt.yaml"]);
        assert_eq!(cli.config, PathBuf::from("alt.yaml"));
        assert!(matches!(cli.command, Command::Run(RunArgs { hours: 12, email: true })));
    }

    #[test]
    fn test_cli_schedule() {
        let cli = Cli::parse_from(["daily_ai_news", "schedule", "--at", "07:45", "--now"]);
        match cli.command {
            Command::Schedule { at, now } => {
                assert_eq!(at.as_deref(), Some("07:45"));
                assert!(now);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_factory_modes() {
        let cli = Cli::parse_from(["daily_ai_news", "factory", "--topic", "EV price war"]);
        match cli.command {
            Command::Factory(args) => {
                assert_eq!(args.topic.as_deref(), Some("EV price war"));
                assert!(!args.batch);
                assert_eq!(args.style, SlideStyle::Viral);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::parse_from(["daily_ai_news", "factory", "--batch", "--limit", "3"]);
        match cli.command {
            Command::Factory(args) => {
                assert!(args.batch);
                assert_eq!(args.limit, 3);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::parse_from(["daily_ai_news", "factory", "--topic", "x", "--style", "academic"]);
        match cli.command {
            Command::Factory(args) => assert_eq!(args.style, SlideStyle::Academic),
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["daily_ai_news", "factory"]).is_err());
        assert!(Cli::try_parse_from(["daily_ai_news", "factory", "--topic", "x", "--style", "fancy"]).is_err());
        assert!(Cli::try_parse_from(["daily_ai_news", "factory", "--topic", "x", "--batch"]).is_err());
    }

    #[test]
    fn test_cli_send_splits_recipients() {
        let cli = Cli::parse_from(["daily_ai_news", "send", "--to", "a@x.com,b@x.com"]);
        match cli.command {
            Command::Send { to } => assert_eq!(to, vec!["a@x.com", "b@x.com"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_convert_and_history() {
        let cli = Cli::parse_from(["daily_ai_news", "convert", "in.md", "out.html"]);
        assert!(matches!(cli.command, Command::Convert { .. }));

        let cli = Cli::parse_from(["daily_ai_news", "history"]);
        assert!(matches!(cli.command, Command::History { days: 3 }));
    }
}
