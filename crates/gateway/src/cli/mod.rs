pub mod config;
pub mod run;

use clap::{Parser, Subcommand};

use felos_domain::config::Config;

/// felos: ad-creative chat agent with tool calling and a spend ledger.
#[derive(Debug, Parser)]
#[command(name = "felos", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Send a single message to the agent and print the response.
    Run {
        /// The message to send.
        message: String,
        /// Session id for ledger entries and stored images.
        #[arg(long, default_value = "cli:run")]
        session: String,
        /// Output every turn event as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
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

/// Load the configuration from `FELOS_CONFIG` (or `config.toml`). A missing
/// file yields the defaults. Returns the config and the path used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("FELOS_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        parse_config(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

pub fn parse_config(raw: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults_session() {
        let cli = Cli::parse_from(["felos", "run", "make ads for BeanBox"]);
        match cli.command {
            Some(Command::Run {
                message,
                session,
                json,
            }) => {
                assert_eq!(message, "make ads for BeanBox");
                assert_eq!(session, "cli:run");
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn empty_file_is_a_valid_config() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.turn.max_rounds, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = parse_config("[turn]\nmax_rounds = 4\n").unwrap();
        assert_eq!(cfg.turn.max_rounds, 4);
        assert_eq!(cfg.turn.deadline_secs, 120);
    }
}
