#![warn(clippy::all)]
#![allow(clippy::pedantic)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use glance_common::config::Config;
use glance_common::logging::init_logging;

mod app;
mod commands;
mod output;

use app::App;

/// `glance` - chat with your configured provider from the terminal.
#[derive(Parser, Debug)]
#[command(name = "glance")]
#[command(version)]
#[command(about = "Chat, history and archive for the Glance sidebar core.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a message in the current conversation
    Chat {
        message: String,

        /// Image URL or data URI to attach
        #[arg(long)]
        image: Option<String>,

        /// Page text the message refers to
        #[arg(long)]
        selection: Option<String>,
    },

    /// Browse and manage past conversations
    History {
        #[command(subcommand)]
        history_command: HistoryCommands,
    },

    /// Save answers and conversations
    Archive {
        #[command(subcommand)]
        archive_command: ArchiveCommands,
    },

    /// Manage provider configurations
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Extract a web page in a background tab and summarize it
    #[command(name = "summarize-link")]
    SummarizeLink {
        url: String,

        /// Link text shown in place of the URL
        #[arg(long)]
        title: Option<String>,
    },

    /// List or apply prompt templates
    Templates {
        #[command(subcommand)]
        template_command: TemplateCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List past conversations, most recent first
    List,
    /// Print one conversation
    Show { id: String },
    /// Make a past conversation the current one
    Resume { id: String },
    /// Delete every past conversation
    Clear,
    /// Delete one past conversation
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ArchiveCommands {
    /// List archived entries
    List,
    /// Archive the answer at INDEX of the current conversation with its question
    Pair { index: usize },
    /// Archive the whole current conversation and start a new one
    Split,
    /// Delete every archived entry
    Clear,
    /// Delete one archived entry
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Add a provider configuration
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Provider kind: gemini or openai
        #[arg(short = 't', long, default_value = "gemini")]
        kind: String,

        /// API key
        #[arg(short, long)]
        key: String,

        /// Model name
        #[arg(short, long)]
        model: String,

        /// Base URL; required for OpenAI-compatible providers
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Make this configuration active
        #[arg(long)]
        activate: bool,
    },
    /// Set the active configuration
    Use { id: String },
    /// List configurations
    List,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// List prompt templates
    List,
    /// Send a template filled with the selected text
    Apply {
        id: String,

        #[arg(long)]
        selection: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_with_env()?;
    init_logging(&config.observability.log_level, &config.observability.log_format);

    let app = App::open(config)?;

    match cli.command {
        Commands::Chat {
            message,
            image,
            selection,
        } => commands::chat::run(&app, message, image, selection).await,
        Commands::History { history_command } => commands::history::run(&app, history_command).await,
        Commands::Archive { archive_command } => commands::archive::run(&app, archive_command).await,
        Commands::Config { config_command } => commands::config::run(&app, config_command).await,
        Commands::SummarizeLink { url, title } => commands::summarize::run(&app, url, title).await,
        Commands::Templates { template_command } => {
            commands::templates::run(&app, template_command).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat() {
        let cli = Cli::try_parse_from(["glance", "chat", "hello", "--selection", "quote"]).unwrap();
        match cli.command {
            Commands::Chat {
                message, selection, image,
            } => {
                assert_eq!(message, "hello");
                assert_eq!(selection.as_deref(), Some("quote"));
                assert!(image.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_archive_pair() {
        let cli = Cli::try_parse_from(["glance", "archive", "pair", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Archive {
                archive_command: ArchiveCommands::Pair { index: 3 }
            }
        ));
    }

    #[test]
    fn test_parse_config_add() {
        let cli = Cli::try_parse_from([
            "glance", "config", "add", "--name", "Local", "-t", "openai", "--key", "sk", "--model",
            "llama3", "--endpoint", "http://localhost:11434/v1", "--activate",
        ])
        .unwrap();
        match cli.command {
            Commands::Config {
                config_command: ConfigCommands::Add { kind, endpoint, activate, .. },
            } => {
                assert_eq!(kind, "openai");
                assert_eq!(endpoint.as_deref(), Some("http://localhost:11434/v1"));
                assert!(activate);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_summarize_link_name() {
        let cli = Cli::try_parse_from(["glance", "summarize-link", "https://a.test", "--title", "A"])
            .unwrap();
        assert!(matches!(cli.command, Commands::SummarizeLink { .. }));
    }
}
