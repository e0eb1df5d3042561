//! Diagnostic binary for `shimframe`.
//!
//! Prints the decisions the adaptation core makes for a server version.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
use shimframe::{
    address,
    fixes::FixRegistry,
    policy::{self, ServerExtension, StaticCapabilities},
    settings::{Settings, SettingsError},
    version::{ProtocolVersion, VersionError},
};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Version(#[from] VersionError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("`{0}` is not a valid server address")]
    Address(String),
    #[error("username length {0} is negative")]
    UsernameLength(i32),
}

fn main() -> ExitCode {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error}");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Command::Limits {
            version,
            longer_messages,
            username_len,
        } => {
            let version: ProtocolVersion = version.parse()?;
            let caps = StaticCapabilities {
                extensions: if longer_messages {
                    vec![ServerExtension::LongerMessages]
                } else {
                    Vec::new()
                },
                username_length: usize::try_from(username_len)
                    .map_err(|_| CliError::UsernameLength(username_len))?,
            };
            let limits = policy::active_limits(version, &caps);
            println!("version:                 {version}");
            println!("max message length:      {}", limits.max_message_length);
            println!("legacy extension active: {}", limits.legacy_extension_active);
            println!("bedrock family:          {}", limits.is_bedrock_family);
        }
        Command::Resolve {
            address: input,
            version,
        } => {
            let version: ProtocolVersion = version.parse()?;
            let resolved =
                address::resolve_server_address(&input, version, settings.replace_default_port)
                    .ok_or_else(|| CliError::Address(input.clone()))?;
            println!("{resolved}");
        }
        Command::Fixes { version } => {
            let version: ProtocolVersion = version.parse()?;
            for fix in FixRegistry::builtin().active(version) {
                println!("{fix:?}");
            }
        }
    }
    Ok(())
}
