//! Derives the "unsaved changes" flag of the view state.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::debug;

use crate::{data_service::DataService, ui_state::UiStateModel};

pub struct ChangeTracker {
    data: Arc<dyn DataService>,
    state: Arc<UiStateModel>,
    technical_errors: AtomicBool,
}

impl ChangeTracker {
    pub fn new(data: Arc<dyn DataService>, state: Arc<UiStateModel>) -> Self {
        Self {
            data,
            state,
            technical_errors: AtomicBool::new(false),
        }
    }

    /// Writes and returns `has_ui_changes`.
    ///
    /// An outstanding technical error forces `true`. Otherwise an explicit value wins,
    /// and without one the store's pending changes decide.
    pub fn recompute(&self, force: Option<bool>) -> bool {
        let has_ui_changes = if self.has_technical_errors() {
            true
        } else {
            force.unwrap_or_else(|| self.data.has_pending_changes())
        };
        debug!(?force, has_ui_changes, "recomputed ui changes");
        self.state.set_has_ui_changes(has_ui_changes);
        has_ui_changes
    }

    pub fn has_technical_errors(&self) -> bool {
        self.technical_errors.load(Ordering::SeqCst)
    }

    pub fn set_technical_errors(&self) {
        self.technical_errors.store(true, Ordering::SeqCst);
    }

    /// Only an explicit save or reset may call this.
    pub fn clear_technical_errors(&self) {
        self.technical_errors.store(false, Ordering::SeqCst);
    }
}
