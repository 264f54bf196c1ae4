//! Navigation dispatcher.
//!
//! Drains the staged intents exactly once, after the navigation tree reports
//! it is mounted, and serves direct foreground navigation afterwards.
//!
//! ```text
//! NotReady --(tree ready)--> ReadyChecking --(both slots drained)--> ReadyIdle
//! ```
//!
//! `ReadyIdle` is terminal for the life of the process.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::RouteConfig;
use crate::error::Result;
use crate::intent::Slot;
use crate::navigation::{NavigationCommand, Navigator, ReadySignal};
use crate::storage::IntentStore;

/// Where the dispatcher is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherState {
    /// The navigation tree has not mounted yet.
    NotReady,
    /// Staged intents are being evaluated.
    ReadyChecking,
    /// Startup drain finished; foreground navigation is live.
    ReadyIdle,
}

impl std::fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotReady => write!(f, "not_ready"),
            Self::ReadyChecking => write!(f, "ready_checking"),
            Self::ReadyIdle => write!(f, "ready_idle"),
        }
    }
}

/// What happened to one slot during a drain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SlotOutcome {
    /// Nothing was staged.
    Empty,
    /// The intent was fresh and navigation was issued.
    Navigated {
        /// Incident navigated to.
        target_id: String,
    },
    /// The intent was older than the freshness window.
    Stale {
        /// Incident that was not opened.
        target_id: String,
        /// Age of the intent in milliseconds.
        age_ms: i64,
    },
    /// A higher-priority slot already navigated in this pass.
    Superseded {
        /// Incident that was not opened.
        target_id: String,
    },
    /// The slot could not be read or decoded.
    Unreadable,
    /// Every navigate attempt was rejected.
    NavigationFailed {
        /// Incident that was not opened.
        target_id: String,
    },
}

/// Evaluation result for a single slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotReport {
    /// The slot evaluated.
    pub slot: Slot,
    /// What happened.
    #[serde(flatten)]
    pub outcome: SlotOutcome,
}

/// Summary of one startup drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// False when the drain had already run in this process.
    pub ran: bool,
    /// Incident navigated to, if any.
    pub navigated: Option<String>,
    /// Per-slot results in evaluation order.
    pub slots: Vec<SlotReport>,
}

/// Result of a direct foreground navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForegroundOutcome {
    /// Navigation was issued.
    Navigated,
    /// The startup drain has not finished; the request was dropped.
    NotReady,
    /// The navigation tree rejected every attempt.
    Failed,
}

/// Consumes staged intents and issues navigation.
#[derive(Debug)]
pub struct NavigationDispatcher {
    store: Arc<dyn IntentStore>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    route: RouteConfig,
    freshness_window: Duration,
    ready_timeout: Option<std::time::Duration>,
    state: watch::Sender<DispatcherState>,
}

impl NavigationDispatcher {
    /// Create a dispatcher in the `NotReady` state.
    #[must_use]
    pub fn new(
        store: Arc<dyn IntentStore>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
        route: RouteConfig,
        freshness_window: Duration,
    ) -> Self {
        let (state, _) = watch::channel(DispatcherState::NotReady);
        Self {
            store,
            navigator,
            clock,
            route,
            freshness_window,
            ready_timeout: None,
            state,
        }
    }

    /// Give up waiting for the navigation tree after `timeout`.
    #[must_use]
    pub fn with_ready_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DispatcherState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DispatcherState> {
        self.state.subscribe()
    }

    /// Wait for the navigation tree, then drain both slots once.
    ///
    /// Only the first call in a process does anything; later calls return a
    /// report with `ran == false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree never becomes ready (timeout or dropped
    /// notifier). The state stays `NotReady` and the slots are left intact.
    pub async fn run(&self, mut ready: ReadySignal) -> Result<DispatchReport> {
        if self.state() != DispatcherState::NotReady {
            return Ok(DispatchReport::default());
        }

        if !ready.is_ready() {
            debug!("Waiting for navigation tree to mount");
        }
        ready.wait_timeout(self.ready_timeout).await?;

        let started = self.state.send_if_modified(|state| {
            if *state == DispatcherState::NotReady {
                *state = DispatcherState::ReadyChecking;
                true
            } else {
                false
            }
        });
        if !started {
            return Ok(DispatchReport::default());
        }
        debug!("Navigation tree ready, checking staged intents");

        let mut report = DispatchReport {
            ran: true,
            ..DispatchReport::default()
        };
        for slot in Slot::DISPATCH_ORDER {
            let outcome = self.evaluate(slot, report.navigated.is_some()).await;
            if let SlotOutcome::Navigated { target_id } = &outcome {
                report.navigated = Some(target_id.clone());
            }
            report.slots.push(SlotReport { slot, outcome });
        }

        self.state.send_replace(DispatcherState::ReadyIdle);
        info!(navigated = ?report.navigated, "Startup navigation check complete");
        Ok(report)
    }

    /// Navigate straight to `target_id` for a message that arrived while the
    /// UI was focused.
    ///
    /// Only honoured once the startup drain has finished.
    pub fn dispatch_foreground(&self, target_id: &str) -> ForegroundOutcome {
        let state = self.state();
        if state != DispatcherState::ReadyIdle {
            debug!(%state, target_id, "Navigation tree not ready, dropping foreground navigation");
            return ForegroundOutcome::NotReady;
        }
        if self.navigate(target_id) {
            ForegroundOutcome::Navigated
        } else {
            ForegroundOutcome::Failed
        }
    }

    /// Evaluate the `Pending` slot after the app returns from the background
    /// with the tree already mounted.
    ///
    /// Returns `None` without touching storage unless the state is `ReadyIdle`.
    pub async fn drain_pending_on_resume(&self) -> Option<SlotOutcome> {
        if self.state() != DispatcherState::ReadyIdle {
            return None;
        }
        Some(self.evaluate(Slot::Pending, false).await)
    }

    /// Read, judge and clear one slot.
    async fn evaluate(&self, slot: Slot, already_navigated: bool) -> SlotOutcome {
        let outcome = match self.store.read(slot).await {
            Ok(None) => return SlotOutcome::Empty,
            Ok(Some(intent)) => {
                let now = self.clock.now();
                let age = intent.age(now);
                if !intent.is_fresh(now, self.freshness_window) {
                    info!(
                        %slot,
                        target_id = %intent.target_id,
                        age_secs = age.num_seconds(),
                        "Discarding stale navigation intent"
                    );
                    SlotOutcome::Stale {
                        target_id: intent.target_id,
                        age_ms: age.num_milliseconds(),
                    }
                } else if already_navigated {
                    debug!(%slot, target_id = %intent.target_id, "Superseded by earlier slot");
                    SlotOutcome::Superseded {
                        target_id: intent.target_id,
                    }
                } else if self.navigate(&intent.target_id) {
                    SlotOutcome::Navigated {
                        target_id: intent.target_id,
                    }
                } else {
                    SlotOutcome::NavigationFailed {
                        target_id: intent.target_id,
                    }
                }
            }
            Err(e) if e.is_corrupt_intent() => {
                warn!(%slot, error = %e, "Discarding corrupt navigation intent");
                SlotOutcome::Unreadable
            }
            Err(e) => {
                warn!(%slot, error = %e, "Treating unreadable slot as empty");
                SlotOutcome::Unreadable
            }
        };

        if let Err(e) = self.store.clear(slot).await {
            warn!(%slot, error = %e, "Failed to clear navigation slot");
        }
        outcome
    }

    /// Issue the nested command, falling back to the direct one.
    fn navigate(&self, target_id: &str) -> bool {
        let nested = NavigationCommand::nested(&self.route, target_id);
        let Err(nested_err) = self.navigator.navigate(&nested) else {
            return true;
        };
        if !nested.is_nested() {
            error!(target_id, error = %nested_err, "Navigation failed");
            return false;
        }

        warn!(target_id, error = %nested_err, "Nested navigation failed, trying direct navigation");
        match self
            .navigator
            .navigate(&NavigationCommand::direct(&self.route, target_id))
        {
            Ok(()) => true,
            Err(e) => {
                error!(target_id, error = %e, "Navigation failed");
                false
            }
        }
    }
}
