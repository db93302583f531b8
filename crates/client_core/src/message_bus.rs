//! Message feed of the store. Technical entries are consumed by the deduplicator.

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use shared::messages::TechnicalMessage;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

pub struct MessageBus {
    messages: Mutex<Vec<TechnicalMessage>>,
    revision: watch::Sender<u64>,
}

impl Default for MessageBus {
    fn default() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            messages: Mutex::new(Vec::new()),
            revision,
        }
    }
}

impl MessageBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, message: TechnicalMessage) {
        self.push_all(std::iter::once(message));
    }

    pub fn push_all(&self, messages: impl IntoIterator<Item = TechnicalMessage>) {
        let added = {
            let mut feed = self.messages.lock();
            let before = feed.len();
            feed.extend(messages);
            feed.len() - before
        };
        if added > 0 {
            debug!(added, "message feed grew");
            self.notify_changed();
        }
    }

    pub fn messages(&self) -> Vec<TechnicalMessage> {
        self.messages.lock().clone()
    }

    pub fn technical_messages(&self) -> Vec<TechnicalMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|message| message.technical)
            .cloned()
            .collect()
    }

    /// Removes the given messages by id. Removed messages are gone for good.
    pub fn remove_messages(&self, consumed: &[TechnicalMessage]) {
        let removed = {
            let mut feed = self.messages.lock();
            let before = feed.len();
            feed.retain(|message| !consumed.iter().any(|c| c.id == message.id));
            before - feed.len()
        };
        if removed > 0 {
            debug!(removed, "messages removed from feed");
            self.notify_changed();
        }
    }

    /// Re-announces the current feed to subscribers without changing it.
    pub fn notify_changed(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Snapshot of the technical entries, emitted once on subscription and after every change.
    pub fn technical_stream(self: &Arc<Self>) -> impl Stream<Item = Vec<TechnicalMessage>> + Send {
        let bus = Arc::clone(self);
        WatchStream::new(self.subscribe()).map(move |_| bus.technical_messages())
    }
}
