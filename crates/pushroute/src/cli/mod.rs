//! Command-line interface for pushroute.
//!
//! Every command works against the durable store, so a sequence of
//! invocations replays the app lifecycle: `deliver` in one process, then
//! `dispatch` in the next, as a cold start would.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ClearCommand, ConfigCommand, DeliverCommand, DispatchCommand, InspectCommand, SlotArg,
    StateArg,
};

/// pushroute - Route notification taps to the right screen
///
/// Stages deep-link intents from push messages and replays them once the
/// navigation tree is mounted.
#[derive(Debug, Parser)]
#[command(name = "pushroute")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Hand a push message to the receiver
    Deliver(DeliverCommand),

    /// Mount the navigation tree and drain staged intents
    Dispatch(DispatchCommand),

    /// Show staged intents
    Inspect(InspectCommand),

    /// Remove staged intents
    Clear(ClearCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "pushroute");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["pushroute", "inspect"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["pushroute", "-v", "inspect"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["pushroute", "-vv", "inspect"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["pushroute", "-q", "inspect"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_deliver() {
        let cli = parse(&[
            "pushroute",
            "deliver",
            "--state",
            "background",
            r#"{"data":{"incidentId":"42"}}"#,
        ]);
        let Command::Deliver(cmd) = cli.command else {
            panic!("expected deliver");
        };
        assert_eq!(cmd.state, StateArg::Background);
        assert!(!cmd.mounted);
        assert!(cmd.payload.contains("incidentId"));
    }

    #[test]
    fn test_parse_deliver_requires_state() {
        assert!(Cli::try_parse_from(["pushroute", "deliver", "{}"]).is_err());
    }

    #[test]
    fn test_parse_deliver_mounted() {
        let cli = parse(&["pushroute", "deliver", "-s", "foreground", "-m", "{}"]);
        assert!(matches!(cli.command, Command::Deliver(DeliverCommand { mounted: true, .. })));
    }

    #[test]
    fn test_parse_clear_slot() {
        let cli = parse(&["pushroute", "clear", "--slot", "initial"]);
        assert!(matches!(
            cli.command,
            Command::Clear(ClearCommand {
                slot: Some(SlotArg::Initial)
            })
        ));
    }

    #[test]
    fn test_parse_dispatch_json() {
        let cli = parse(&["pushroute", "dispatch", "--json"]);
        assert!(matches!(cli.command, Command::Dispatch(DispatchCommand { json: true })));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["pushroute", "-c", "/custom/config.toml", "inspect"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = parse(&["pushroute", "config", "validate", "--file", "x.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }
}
