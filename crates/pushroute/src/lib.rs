//! `pushroute` - Deliver notification deep links across the app lifecycle
//!
//! A push notification tap may arrive while the app is terminated, in the
//! background, or in the foreground. This library stages the tapped target
//! durably when the UI cannot navigate yet, and replays it exactly once after
//! the navigation tree has mounted, discarding intents that have gone stale.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod intent;
pub mod logging;
pub mod message;
pub mod navigation;
pub mod receiver;
pub mod router;
pub mod storage;

#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use dispatcher::{DispatchReport, DispatcherState, NavigationDispatcher, SlotOutcome};
pub use error::{Error, Result};
pub use intent::{PendingIntent, Slot};
pub use logging::init_logging;
pub use message::{InboundMessage, LifecycleState, TargetExtractor};
pub use navigation::{readiness, NavigationCommand, Navigator, ReadyNotifier, ReadySignal};
pub use receiver::{Delivery, DropReason, MessageReceiver};
pub use router::NotificationRouter;
pub use storage::{IntentStore, Storage};
