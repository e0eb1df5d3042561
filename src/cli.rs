//! Command line interface for the `shimframe` diagnostic binary.
//!
//! The binary inspects what the adaptation core would do for a given server
//! version without connecting anywhere.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command line arguments for the `shimframe` binary.
#[derive(Debug, Parser)]
#[command(
    name = "shimframe",
    version,
    about = "Inspect protocol version adaptation decisions"
)]
pub struct Cli {
    /// Settings file to load instead of the defaults.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Diagnostic operations.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the chat limits that apply to a server version.
    Limits {
        /// Server version name, for example `1.8.x` or `c0.28-c0.30`.
        version: String,
        /// The server announced the longer-messages classic extension.
        #[arg(long)]
        longer_messages: bool,
        /// Username length used for the classic chat prefix.
        #[arg(long, default_value_t = 16)]
        username_len: i32,
    },
    /// Resolve a server address as the connect screen would.
    Resolve {
        /// Address typed by the user.
        address: String,
        /// Server version name.
        #[arg(short, long, default_value = "1.20.5")]
        version: String,
    },
    /// List the client fixes active for a server version.
    Fixes {
        /// Server version name.
        version: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn parses_limits_with_flags() {
        let cli = Cli::parse_from(["shimframe", "limits", "c0.28-c0.30", "--longer-messages"]);
        assert!(matches!(
            cli.command,
            Command::Limits {
                ref version,
                longer_messages: true,
                username_len: 16,
            } if version == "c0.28-c0.30"
        ));
    }

    #[test]
    fn config_is_global() {
        let cli = Cli::parse_from(["shimframe", "resolve", "host", "--config", "s.toml"]);
        assert_eq!(
            cli.config.as_deref().and_then(|p| p.to_str()),
            Some("s.toml")
        );
    }
}
