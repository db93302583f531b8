//! View-side collaborators driven by the controller: notifications and the detail pane.

use std::sync::Arc;

use crate::data_service::EntityContext;

/// Called once when an error notification is dismissed.
pub type CloseHandler = Box<dyn FnOnce() + Send>;

pub trait NotificationSink: Send + Sync {
    fn show_toast(&self, text: &str);

    fn show_error(&self, text: &str, on_close: Option<CloseHandler>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneLayout {
    pub list_size_percent: u8,
    pub resizable: bool,
    pub search_field_width_percent: u8,
}

impl PaneLayout {
    pub const WITH_DETAIL: PaneLayout = PaneLayout {
        list_size_percent: 60,
        resizable: true,
        search_field_width_percent: 40,
    };

    pub const LIST_ONLY: PaneLayout = PaneLayout {
        list_size_percent: 100,
        resizable: false,
        search_field_width_percent: 20,
    };

    pub fn for_detail(visible: bool) -> Self {
        if visible {
            Self::WITH_DETAIL
        } else {
            Self::LIST_ONLY
        }
    }
}

pub trait DetailPane: Send + Sync {
    fn bind(&self, context: Option<Arc<dyn EntityContext>>);

    fn set_visible(&self, visible: bool);

    fn set_layout(&self, layout: PaneLayout);
}
