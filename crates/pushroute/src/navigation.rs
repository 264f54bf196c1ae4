//! Navigation commands and the navigation tree seam.
//!
//! The navigation tree is an external collaborator. pushroute only needs two
//! things from it: a way to issue a navigate call, and a signal that it has
//! mounted and can accept one.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::info;

use crate::config::RouteConfig;
use crate::error::{Error, Result};

/// Parameters handed to the incident detail screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationParams {
    /// Incident to show.
    pub incident_id: String,
    /// Set when the screen was opened from a notification tap.
    pub from_notification: bool,
}

/// A single navigate call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationCommand {
    /// Screen names from the outermost navigator to the destination.
    pub route: Vec<String>,
    /// Destination parameters.
    pub params: NavigationParams,
}

impl NavigationCommand {
    /// Open `incident_id` through the configured nested route.
    #[must_use]
    pub fn nested(route: &RouteConfig, incident_id: &str) -> Self {
        let mut names = route.parent_route.clone();
        names.push(route.destination_screen.clone());
        Self::with_route(names, incident_id)
    }

    /// Open `incident_id` by addressing the destination screen directly.
    #[must_use]
    pub fn direct(route: &RouteConfig, incident_id: &str) -> Self {
        Self::with_route(vec![route.destination_screen.clone()], incident_id)
    }

    fn with_route(route: Vec<String>, incident_id: &str) -> Self {
        Self {
            route,
            params: NavigationParams {
                incident_id: incident_id.to_string(),
                from_notification: true,
            },
        }
    }

    /// The screen finally shown.
    #[must_use]
    pub fn screen(&self) -> &str {
        self.route.last().map_or("", String::as_str)
    }

    /// The screen name the navigate call is addressed to.
    #[must_use]
    pub fn root(&self) -> &str {
        self.route.first().map_or("", String::as_str)
    }

    /// Whether the command goes through enclosing navigators.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.route.len() > 1
    }

    /// Render as `(name, params)` navigate arguments, wrapping each inner
    /// screen as `{screen, params}`.
    #[must_use]
    pub fn to_navigate_args(&self) -> (String, Value) {
        let mut params = json!({
            "incidentId": self.params.incident_id,
            "fromNotification": self.params.from_notification,
        });
        for name in self.route.iter().skip(1).rev() {
            params = json!({ "screen": name, "params": params });
        }
        (self.root().to_string(), params)
    }
}

/// The navigation tree's imperative handle.
pub trait Navigator: Send + Sync + std::fmt::Debug {
    /// Issue a navigate call.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree rejects the command.
    fn navigate(&self, command: &NavigationCommand) -> Result<()>;
}

/// A navigator that logs and remembers every command it accepts.
///
/// Used by the CLI to report what a real navigation tree would have been
/// asked to do.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    rejected_roots: Vec<String>,
    commands: Mutex<Vec<NavigationCommand>>,
}

impl RecordingNavigator {
    /// Create a navigator that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject commands addressed to `root`, as a tree without that navigator would.
    #[must_use]
    pub fn rejecting(mut self, root: impl Into<String>) -> Self {
        self.rejected_roots.push(root.into());
        self
    }

    /// Commands accepted so far.
    #[must_use]
    pub fn commands(&self) -> Vec<NavigationCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Incident identifiers navigated to so far.
    #[must_use]
    pub fn incidents(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .map(|command| command.params.incident_id)
            .collect()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, command: &NavigationCommand) -> Result<()> {
        if self.rejected_roots.iter().any(|root| root == command.root()) {
            return Err(Error::navigation(
                command.root(),
                "no navigator handles this route",
            ));
        }
        info!(
            route = ?command.route,
            incident_id = %command.params.incident_id,
            "Navigate"
        );
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());
        Ok(())
    }
}

/// Create a linked readiness pair.
///
/// The navigation tree keeps the [`ReadyNotifier`] and fires it once mounted;
/// the dispatcher awaits the [`ReadySignal`].
#[must_use]
pub fn readiness() -> (ReadyNotifier, ReadySignal) {
    let (tx, rx) = watch::channel(false);
    (ReadyNotifier { tx }, ReadySignal { rx })
}

/// Fired by the navigation tree once it can accept navigate calls.
#[derive(Debug)]
pub struct ReadyNotifier {
    tx: watch::Sender<bool>,
}

impl ReadyNotifier {
    /// Signal that the tree is mounted.
    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }
}

/// Awaitable view of the navigation tree's readiness.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    rx: watch::Receiver<bool>,
}

impl ReadySignal {
    /// Whether the tree has signalled readiness.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the tree is ready.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NavigatorUnavailable`] if the notifier is dropped
    /// before firing.
    pub async fn wait(&mut self) -> Result<()> {
        self.rx
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| Error::NavigatorUnavailable)
    }

    /// Wait until the tree is ready, giving up after `timeout` if one is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the deadline passes and
    /// [`Error::NavigatorUnavailable`] if the notifier is dropped.
    pub async fn wait_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match timeout {
            None => self.wait().await,
            Some(limit) => tokio::time::timeout(limit, self.wait())
                .await
                .map_err(|_| Error::Timeout {
                    operation: "waiting for navigation tree".to_string(),
                })?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> RouteConfig {
        RouteConfig::default()
    }

    #[test]
    fn test_nested_command() {
        let command = NavigationCommand::nested(&route(), "42");

        assert_eq!(command.route, vec!["UserTabs", "Home", "UserViewDetails"]);
        assert_eq!(command.root(), "UserTabs");
        assert_eq!(command.screen(), "UserViewDetails");
        assert!(command.is_nested());
        assert!(command.params.from_notification);
    }

    #[test]
    fn test_direct_command() {
        let command = NavigationCommand::direct(&route(), "42");

        assert_eq!(command.route, vec!["UserViewDetails"]);
        assert_eq!(command.root(), "UserViewDetails");
        assert!(!command.is_nested());
    }

    #[test]
    fn test_nested_args_wrap_inner_screens() {
        let (name, params) = NavigationCommand::nested(&route(), "42").to_navigate_args();

        assert_eq!(name, "UserTabs");
        assert_eq!(
            params,
            json!({
                "screen": "Home",
                "params": {
                    "screen": "UserViewDetails",
                    "params": {"incidentId": "42", "fromNotification": true}
                }
            })
        );
    }

    #[test]
    fn test_direct_args() {
        let (name, params) = NavigationCommand::direct(&route(), "9").to_navigate_args();
        assert_eq!(name, "UserViewDetails");
        assert_eq!(params, json!({"incidentId": "9", "fromNotification": true}));
    }

    #[test]
    fn test_recording_navigator_records() {
        let navigator = RecordingNavigator::new();
        navigator
            .navigate(&NavigationCommand::nested(&route(), "42"))
            .unwrap();

        assert_eq!(navigator.incidents(), vec!["42"]);
        assert_eq!(navigator.commands().len(), 1);
    }

    #[test]
    fn test_recording_navigator_rejects_root() {
        let navigator = RecordingNavigator::new().rejecting("UserTabs");

        let err = navigator
            .navigate(&NavigationCommand::nested(&route(), "42"))
            .unwrap_err();
        assert!(matches!(err, Error::Navigation { .. }));
        assert!(navigator.commands().is_empty());

        navigator
            .navigate(&NavigationCommand::direct(&route(), "42"))
            .unwrap();
        assert_eq!(navigator.incidents(), vec!["42"]);
    }

    #[tokio::test]
    async fn test_ready_signal_resolves_after_mark() {
        let (notifier, mut signal) = readiness();
        assert!(!signal.is_ready());

        let waiter = tokio::spawn(async move { signal.wait().await });
        notifier.mark_ready();

        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_ready_signal_already_ready() {
        let (notifier, mut signal) = readiness();
        notifier.mark_ready();
        drop(notifier);

        assert!(signal.is_ready());
        assert!(signal.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_ready_signal_notifier_dropped() {
        let (notifier, mut signal) = readiness();
        drop(notifier);

        let err = signal.wait().await.unwrap_err();
        assert!(matches!(err, Error::NavigatorUnavailable));
    }

    #[tokio::test]
    async fn test_ready_signal_timeout() {
        let (_notifier, mut signal) = readiness();

        let err = signal
            .wait_timeout(Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }
}
