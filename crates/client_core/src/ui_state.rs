//! Observable view state shared between the controller and whatever renders it.

use serde::{Serialize, Serializer};
use shared::domain::SortOrder;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UiState {
    pub busy: bool,
    pub has_ui_changes: bool,
    pub username_empty: bool,
    #[serde(serialize_with = "serialize_order_index")]
    pub order: SortOrder,
}

fn serialize_order_index<S: Serializer>(order: &SortOrder, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(order.index() as u64)
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            busy: false,
            has_ui_changes: false,
            username_empty: true,
            order: SortOrder::None,
        }
    }
}

/// Single-writer container; readers either poll `get` or `subscribe` for changes.
pub struct UiStateModel {
    tx: watch::Sender<UiState>,
}

impl Default for UiStateModel {
    fn default() -> Self {
        Self::new(UiState::default())
    }
}

impl UiStateModel {
    pub fn new(initial: UiState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> UiState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.tx.subscribe()
    }

    /// Applies `f` and notifies subscribers only when the state actually changed.
    pub fn update(&self, f: impl FnOnce(&mut UiState)) {
        self.tx.send_if_modified(|state| {
            let before = *state;
            f(state);
            before != *state
        });
    }

    pub fn set_busy(&self, busy: bool) {
        self.update(|state| state.busy = busy);
    }

    pub fn set_has_ui_changes(&self, has_ui_changes: bool) {
        self.update(|state| state.has_ui_changes = has_ui_changes);
    }

    pub fn set_username_empty(&self, username_empty: bool) {
        self.update(|state| state.username_empty = username_empty);
    }

    pub fn set_order(&self, order: SortOrder) {
        self.update(|state| state.order = order);
    }
}
