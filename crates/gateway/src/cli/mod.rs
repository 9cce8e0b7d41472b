pub mod chat;
pub mod config;
pub mod run;

use clap::{Parser, Subcommand};

use sr_domain::config::Config;

/// serene: a supportive conversation service with crisis screening.
#[derive(Debug, Parser)]
#[command(name = "serene", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Chat interactively in the terminal.
    Chat {
        /// Owner whose transcript the conversation uses.
        #[arg(long, default_value = "cli:chat")]
        session: String,
    },
    /// Send a single message and print the reply.
    Run {
        /// The message to send.
        message: String,
        /// Owner whose transcript the message is stored in.
        #[arg(long, default_value = "cli:run")]
        session: String,
        /// Print the full cycle outcome as JSON instead of the reply text.
        #[arg(long)]
        json: bool,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `SERENE_CONFIG` (or
/// `config.toml` by default).  A missing file yields the defaults.
///
/// Returns the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("SERENE_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_parses() {
        let cli = Cli::try_parse_from(["serene"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn run_defaults_session() {
        let cli = Cli::try_parse_from(["serene", "run", "hello"]).unwrap();
        match cli.command {
            Some(Command::Run { message, session, json }) => {
                assert_eq!(message, "hello");
                assert_eq!(session, "cli:run");
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn chat_accepts_session() {
        let cli = Cli::try_parse_from(["serene", "chat", "--session", "alice"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Chat { session }) if session == "alice"));
    }
}
