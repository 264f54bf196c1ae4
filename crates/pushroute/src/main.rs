//! `pushroute` - CLI for the notification router
//!
//! Each invocation is one app process. Staged intents live in the configured
//! database, so `deliver` followed by `dispatch` behaves like a notification
//! tap followed by a cold start.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use pushroute::cli::{Cli, ClearCommand, Command, ConfigCommand, DeliverCommand};
use pushroute::navigation::RecordingNavigator;
use pushroute::{
    init_logging, readiness, Clock, Config, DispatchReport, InboundMessage, IntentStore,
    LifecycleState, NotificationRouter, Slot, Storage, SystemClock,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match cli.command {
        Command::Deliver(cmd) => handle_deliver(&load_config(cli.config)?, &cmd).await,
        Command::Dispatch(cmd) => handle_dispatch(&load_config(cli.config)?, cmd.json).await,
        Command::Inspect(cmd) => handle_inspect(&load_config(cli.config)?, cmd.json).await,
        Command::Clear(cmd) => handle_clear(&load_config(cli.config)?, &cmd).await,
        Command::Config(cmd) => handle_config(cli.config, cmd),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load_from(path).context("failed to load configuration")
}

/// A router over the configured database with a recording navigator.
struct Session {
    navigator: Arc<RecordingNavigator>,
    router: NotificationRouter,
}

impl Session {
    fn open(config: &Config) -> anyhow::Result<Self> {
        let store = Arc::new(open_store(config)?);
        let navigator = Arc::new(RecordingNavigator::new());
        let router = NotificationRouter::new(
            config,
            store,
            navigator.clone(),
            Arc::new(SystemClock),
        )?;
        Ok(Self {
            navigator,
            router,
        })
    }

    /// Mount the navigation tree immediately and run the startup drain.
    async fn mount(&self) -> anyhow::Result<DispatchReport> {
        let (notifier, signal) = readiness();
        notifier.mark_ready();
        Ok(self.router.on_mount(signal).await?)
    }

    fn navigations(&self) -> Vec<serde_json::Value> {
        self.navigator
            .commands()
            .iter()
            .map(|command| {
                let (name, params) = command.to_navigate_args();
                json!({ "name": name, "params": params })
            })
            .collect()
    }

    fn print_navigations(&self) {
        for navigation in self.navigations() {
            println!("navigate {} {}", navigation["name"], navigation["params"]);
        }
    }
}

fn open_store(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("failed to open store at {}", path.display()))
}

async fn handle_deliver(config: &Config, cmd: &DeliverCommand) -> anyhow::Result<()> {
    let message = InboundMessage::from_json(&cmd.payload).context("invalid message payload")?;
    let state = LifecycleState::from(cmd.state);
    let session = Session::open(config)?;

    if cmd.mounted {
        session.mount().await?;
    }
    let delivery = session.router.deliver(state, &message).await;
    let resumed = if cmd.mounted && state == LifecycleState::Background {
        session.router.resume().await
    } else {
        None
    };

    if cmd.json {
        let output = json!({
            "state": state,
            "delivery": delivery,
            "resume": resumed,
            "navigations": session.navigations(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{state}: {delivery:?}");
        if let Some(outcome) = resumed {
            println!("resume: {outcome:?}");
        }
        session.print_navigations();
    }
    Ok(())
}

async fn handle_dispatch(config: &Config, json: bool) -> anyhow::Result<()> {
    let session = Session::open(config)?;
    let report = session.mount().await?;

    if json {
        let output = json!({
            "report": report,
            "navigations": session.navigations(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for slot in &report.slots {
            println!("{:<8} {:?}", slot.slot, slot.outcome);
        }
        session.print_navigations();
        if report.navigated.is_none() {
            println!("No navigation.");
        }
    }
    Ok(())
}

async fn handle_inspect(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let clock = SystemClock;
    let now = clock.now();
    let window = config.freshness_window();

    let mut entries = Vec::new();
    for slot in Slot::DISPATCH_ORDER {
        let entry = match store.read(slot).await {
            Ok(None) => json!({ "slot": slot, "status": "empty" }),
            Ok(Some(intent)) => json!({
                "slot": slot,
                "status": if intent.is_fresh(now, window) { "fresh" } else { "stale" },
                "targetId": intent.target_id,
                "createdAt": intent.created_at.to_rfc3339(),
                "ageSecs": intent.age(now).num_seconds(),
            }),
            Err(e) => json!({ "slot": slot, "status": "unreadable", "error": e.to_string() }),
        };
        entries.push(entry);
    }
    let other_keys: Vec<String> = store
        .keys()?
        .into_iter()
        .filter(|key| Slot::from_key(key).is_none())
        .collect();

    if json {
        let output = json!({
            "databasePath": store.path(),
            "freshnessWindowSecs": window.num_seconds(),
            "slots": entries,
            "otherKeys": other_keys,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Database: {}", store.path().display());
        println!("Window:   {}s", window.num_seconds());
        println!();
        for entry in &entries {
            let slot = entry["slot"].as_str().unwrap_or_default();
            let status = entry["status"].as_str().unwrap_or_default();
            match (entry.get("targetId"), entry.get("ageSecs")) {
                (Some(target), Some(age)) => {
                    println!("{slot:<8} {status:<10} {target} ({age}s old)");
                }
                _ => println!("{slot:<8} {status}"),
            }
        }
        if !other_keys.is_empty() {
            println!();
            println!("Other keys: {}", other_keys.join(", "));
        }
    }
    Ok(())
}

async fn handle_clear(config: &Config, cmd: &ClearCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let slots = match cmd.slot {
        Some(slot) => vec![Slot::from(slot)],
        None => Slot::DISPATCH_ORDER.to_vec(),
    };
    for slot in slots {
        store.clear(slot).await?;
        println!("Cleared {slot}");
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = &load_config(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Dispatch]");
                println!(
                    "  Freshness window:   {}s",
                    config.dispatch.freshness_window_secs
                );
                match config.ready_timeout() {
                    Some(timeout) => println!("  Ready timeout:      {}ms", timeout.as_millis()),
                    None => println!("  Ready timeout:      none"),
                }
                println!();
                println!("[Message]");
                println!("  Target field:       {}", config.message.target_field);
                println!("  Target pattern:     {}", config.message.target_pattern);
                println!();
                println!("[Route]");
                println!("  Parent route:       {}", config.route.parent_route.join(" > "));
                println!("  Destination:        {}", config.route.destination_screen);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            validate_config(path)?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

fn validate_config(path: PathBuf) -> anyhow::Result<()> {
    let display = path.display().to_string();
    Config::load_from(Some(path)).with_context(|| format!("invalid configuration in {display}"))?;
    Ok(())
}
