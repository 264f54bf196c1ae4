//! Message receiver.
//!
//! Turns an inbound push message into either a staged intent or a direct
//! foreground navigation, depending on the app's lifecycle state. Nothing
//! here ever fails the caller: every problem is logged and reported as a
//! [`Delivery::Dropped`] outcome.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dispatcher::{ForegroundOutcome, NavigationDispatcher};
use crate::error::Error;
use crate::intent::Slot;
use crate::message::{InboundMessage, LifecycleState, TargetExtractor};
use crate::storage::IntentStore;

/// Why a message did not lead anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The data section had no target field.
    MissingTarget,
    /// The target field was present but unusable.
    MalformedTarget,
    /// A foreground message arrived before the startup drain finished.
    NotReady,
    /// The intent could not be written.
    StorageFailed,
    /// The navigation tree rejected the command.
    NavigationFailed,
}

/// What the receiver did with one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "delivery", rename_all = "snake_case")]
pub enum Delivery {
    /// The intent was written to a slot for the dispatcher to pick up.
    Staged {
        /// Slot written.
        slot: Slot,
        /// Incident staged.
        target_id: String,
    },
    /// Navigation was issued immediately.
    Navigated {
        /// Incident navigated to.
        target_id: String,
    },
    /// The app was not launched by a notification.
    Ignored,
    /// The message was discarded.
    Dropped {
        /// Why.
        reason: DropReason,
    },
}

impl Delivery {
    fn dropped(reason: DropReason) -> Self {
        Self::Dropped { reason }
    }
}

/// Entry point for push messages in every lifecycle state.
#[derive(Debug)]
pub struct MessageReceiver {
    extractor: TargetExtractor,
    store: Arc<dyn IntentStore>,
    dispatcher: Arc<NavigationDispatcher>,
}

impl MessageReceiver {
    /// Create a receiver staging into `store` and navigating through `dispatcher`.
    #[must_use]
    pub fn new(
        extractor: TargetExtractor,
        store: Arc<dyn IntentStore>,
        dispatcher: Arc<NavigationDispatcher>,
    ) -> Self {
        Self {
            extractor,
            store,
            dispatcher,
        }
    }

    /// Route `message` according to the lifecycle state it arrived in.
    pub async fn deliver(&self, state: LifecycleState, message: &InboundMessage) -> Delivery {
        match state {
            LifecycleState::Terminated => self.on_initial_notification(Some(message)).await,
            LifecycleState::Background => self.on_background_message(message).await,
            LifecycleState::Foreground => self.on_foreground_message(message),
        }
    }

    /// Handle the message that launched the app, if there was one.
    pub async fn on_initial_notification(&self, message: Option<&InboundMessage>) -> Delivery {
        let Some(message) = message else {
            debug!("App was not launched from a notification");
            return Delivery::Ignored;
        };
        self.stage(Slot::Initial, message).await
    }

    /// Handle a notification tap that resumed the app from the background.
    pub async fn on_background_message(&self, message: &InboundMessage) -> Delivery {
        self.stage(Slot::Pending, message).await
    }

    /// Handle a message that arrived while the UI was focused.
    pub fn on_foreground_message(&self, message: &InboundMessage) -> Delivery {
        let target_id = match self.target(LifecycleState::Foreground, message) {
            Ok(target_id) => target_id,
            Err(reason) => return Delivery::dropped(reason),
        };

        match self.dispatcher.dispatch_foreground(&target_id) {
            ForegroundOutcome::Navigated => Delivery::Navigated { target_id },
            ForegroundOutcome::NotReady => {
                info!(%target_id, "Dropping foreground message, navigation not ready");
                Delivery::dropped(DropReason::NotReady)
            }
            ForegroundOutcome::Failed => Delivery::dropped(DropReason::NavigationFailed),
        }
    }

    async fn stage(&self, slot: Slot, message: &InboundMessage) -> Delivery {
        let state = match slot {
            Slot::Initial => LifecycleState::Terminated,
            Slot::Pending => LifecycleState::Background,
        };
        let target_id = match self.target(state, message) {
            Ok(target_id) => target_id,
            Err(reason) => return Delivery::dropped(reason),
        };

        match self.store.stage(slot, &target_id).await {
            Ok(_) => {
                info!(
                    %slot,
                    %target_id,
                    title = message.title().unwrap_or_default(),
                    "Staged navigation from notification"
                );
                Delivery::Staged { slot, target_id }
            }
            Err(e) => {
                warn!(%slot, %target_id, error = %e, "Failed to stage navigation intent");
                Delivery::dropped(DropReason::StorageFailed)
            }
        }
    }

    fn target(
        &self,
        state: LifecycleState,
        message: &InboundMessage,
    ) -> std::result::Result<String, DropReason> {
        self.extractor.extract(message).map_err(|e| {
            warn!(
                %state,
                field = self.extractor.field(),
                message_id = message.message_id.as_deref().unwrap_or_default(),
                error = %e,
                "Dropping notification without a usable target"
            );
            match e {
                Error::MissingTarget { .. } => DropReason::MissingTarget,
                _ => DropReason::MalformedTarget,
            }
        })
    }
}
