//! Shows technical messages one notification at a time.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use futures::StreamExt;
use shared::messages::TechnicalMessage;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    controller::change_tracker::ChangeTracker, message_bus::MessageBus, view::NotificationSink,
};

pub struct MessageDeduplicator {
    bus: Arc<MessageBus>,
    tracker: Arc<ChangeTracker>,
    notifier: Arc<dyn NotificationSink>,
    notification_open: Arc<AtomicBool>,
}

impl MessageDeduplicator {
    pub fn new(
        bus: Arc<MessageBus>,
        tracker: Arc<ChangeTracker>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            bus,
            tracker,
            notifier,
            notification_open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_notification_open(&self) -> bool {
        self.notification_open.load(Ordering::SeqCst)
    }

    /// Handles one snapshot of the technical entries of the feed.
    pub fn on_messages_changed(&self, messages: Vec<TechnicalMessage>) {
        if self.is_notification_open() || messages.is_empty() {
            return;
        }

        self.bus.remove_messages(&messages);
        self.tracker.set_technical_errors();
        self.tracker.recompute(Some(true));
        warn!(
            consumed = messages.len(),
            first = %messages[0].text,
            "technical error reported"
        );

        self.notification_open.store(true, Ordering::SeqCst);
        let open = Arc::clone(&self.notification_open);
        let bus = Arc::clone(&self.bus);
        self.notifier.show_error(
            &messages[0].text,
            Some(Box::new(move || {
                open.store(false, Ordering::SeqCst);
                // Messages that arrived meanwhile are picked up on the next round.
                bus.notify_changed();
            })),
        );
    }

    /// Follows the bus feed until the returned task is aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut feed = Box::pin(self.bus.technical_stream());
            while let Some(messages) = feed.next().await {
                self.on_messages_changed(messages);
            }
            debug!("message feed closed");
        })
    }
}
