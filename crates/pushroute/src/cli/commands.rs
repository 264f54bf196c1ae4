//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::intent::Slot;
use crate::message::LifecycleState;

/// Deliver command arguments.
#[derive(Debug, Args)]
pub struct DeliverCommand {
    /// Lifecycle state the message arrives in
    #[arg(short, long, value_enum)]
    pub state: StateArg,

    /// Treat the navigation tree as already mounted (foreground and resume)
    #[arg(short, long)]
    pub mounted: bool,

    /// Message payload as JSON, e.g. '{"data":{"incidentId":"42"}}'
    pub payload: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Dispatch command arguments.
#[derive(Debug, Args)]
pub struct DispatchCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Inspect command arguments.
#[derive(Debug, Args)]
pub struct InspectCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Clear command arguments.
#[derive(Debug, Args)]
pub struct ClearCommand {
    /// Only clear this slot
    #[arg(short, long, value_enum)]
    pub slot: Option<SlotArg>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Lifecycle state argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    /// App launched by the tap
    Terminated,
    /// App resumed by the tap
    Background,
    /// UI focused when the message arrived
    Foreground,
}

impl From<StateArg> for LifecycleState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Terminated => Self::Terminated,
            StateArg::Background => Self::Background,
            StateArg::Foreground => Self::Foreground,
        }
    }
}

/// Slot argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SlotArg {
    /// Cold-start slot
    Initial,
    /// Background-resume slot
    Pending,
}

impl From<SlotArg> for Slot {
    fn from(arg: SlotArg) -> Self {
        match arg {
            SlotArg::Initial => Self::Initial,
            SlotArg::Pending => Self::Pending,
        }
    }
}
