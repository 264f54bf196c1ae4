//! Wiring for a complete notification router.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Config;
use crate::dispatcher::{DispatchReport, DispatcherState, NavigationDispatcher, SlotOutcome};
use crate::error::Result;
use crate::message::{InboundMessage, LifecycleState, TargetExtractor};
use crate::navigation::{Navigator, ReadySignal};
use crate::receiver::{Delivery, MessageReceiver};
use crate::storage::IntentStore;

/// Receiver and dispatcher sharing one store and one navigation tree.
///
/// One router per process. The host forwards transport callbacks to
/// [`deliver`](Self::deliver), calls [`on_mount`](Self::on_mount) once when
/// its navigation tree starts, and [`resume`](Self::resume) whenever the app
/// returns to the foreground.
#[derive(Debug)]
pub struct NotificationRouter {
    dispatcher: Arc<NavigationDispatcher>,
    receiver: MessageReceiver,
}

impl NotificationRouter {
    /// Build a router from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured target pattern does not compile.
    pub fn new(
        config: &Config,
        store: Arc<dyn IntentStore>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let extractor = TargetExtractor::from_config(&config.message)?;
        let dispatcher = Arc::new(
            NavigationDispatcher::new(
                store.clone(),
                navigator,
                clock,
                config.route.clone(),
                config.freshness_window(),
            )
            .with_ready_timeout(config.ready_timeout()),
        );
        let receiver = MessageReceiver::new(extractor, store, dispatcher.clone());
        Ok(Self {
            dispatcher,
            receiver,
        })
    }

    /// Run the startup drain once the navigation tree is mounted.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree never signals readiness.
    pub async fn on_mount(&self, ready: ReadySignal) -> Result<DispatchReport> {
        self.dispatcher.run(ready).await
    }

    /// Handle a push message.
    pub async fn deliver(&self, state: LifecycleState, message: &InboundMessage) -> Delivery {
        self.receiver.deliver(state, message).await
    }

    /// Pick up a background tap staged while the tree was already mounted.
    pub async fn resume(&self) -> Option<SlotOutcome> {
        self.dispatcher.drain_pending_on_resume().await
    }

    /// Current dispatcher state.
    #[must_use]
    pub fn state(&self) -> DispatcherState {
        self.dispatcher.state()
    }
}
