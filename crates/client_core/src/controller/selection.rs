//! Row selection and the detail pane bound to it.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use shared::domain::ContextId;
use tracing::debug;

use crate::{
    data_service::EntityContext,
    view::{DetailPane, PaneLayout},
};

#[derive(Default)]
struct SelectionState {
    /// Row selected in the list; survives hiding the detail pane.
    selected_row: Option<ContextId>,
    /// Context bound to the detail pane, the only one kept alive.
    detail: Option<Arc<dyn EntityContext>>,
}

pub struct SelectionController {
    me: Weak<SelectionController>,
    pane: Mutex<Option<Arc<dyn DetailPane>>>,
    state: Mutex<SelectionState>,
}

impl SelectionController {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            pane: Mutex::new(None),
            state: Mutex::new(SelectionState::default()),
        })
    }

    pub fn attach_detail_pane(&self, pane: Arc<dyn DetailPane>) {
        *self.pane.lock() = Some(pane);
    }

    /// Detaches the pane, e.g. while the view is torn down.
    pub fn detach_detail_pane(&self) {
        self.pane.lock().take();
    }

    /// List selection changed.
    pub fn on_select(&self, context: Option<Arc<dyn EntityContext>>) {
        self.state.lock().selected_row = context.as_ref().map(|ctx| ctx.id());
        self.set_detail_area(context);
    }

    /// Binds the detail pane to `context` (or hides it) and moves keep-alive with it.
    pub fn set_detail_area(&self, context: Option<Arc<dyn EntityContext>>) {
        let Some(pane) = self.pane.lock().clone() else {
            debug!("detail pane not present, selection change ignored");
            return;
        };

        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut state.detail, context.clone())
        };
        if let Some(previous) = previous {
            previous.set_keep_alive(false, None);
        }
        if let Some(ctx) = &context {
            let me = self.me.clone();
            ctx.set_keep_alive(
                true,
                Some(Box::new(move || {
                    if let Some(selection) = me.upgrade() {
                        debug!("kept-alive person vanished, clearing selection");
                        selection.on_select(None);
                    }
                })),
            );
        }

        let visible = context.is_some();
        pane.bind(context);
        pane.set_visible(visible);
        pane.set_layout(PaneLayout::for_detail(visible));
    }

    /// Forgets the list selection if it still points at `id`.
    pub fn clear_row_selection(&self, id: ContextId) {
        let mut state = self.state.lock();
        if state.selected_row == Some(id) {
            state.selected_row = None;
        }
    }

    pub fn is_selected(&self, id: ContextId) -> bool {
        self.state.lock().selected_row == Some(id)
    }

    pub fn selected_row(&self) -> Option<ContextId> {
        self.state.lock().selected_row
    }

    pub fn detail_context(&self) -> Option<Arc<dyn EntityContext>> {
        self.state.lock().detail.clone()
    }

    pub fn is_detail_visible(&self) -> bool {
        self.state.lock().detail.is_some()
    }
}
