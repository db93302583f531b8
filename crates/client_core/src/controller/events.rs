//! View events entering the controller.

use shared::domain::{ContextId, PersonField};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Create,
    FieldEdited {
        context: ContextId,
        field: PersonField,
        value: String,
        committed: bool,
    },
    SelectionChanged(Option<ContextId>),
    /// Deletes the row selected in the list.
    Delete,
    Save,
    ResetChanges,
    Refresh,
    ResetDataSource,
    Search(String),
    ToggleSort,
}

impl ViewEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ViewEvent::Create => "create",
            ViewEvent::FieldEdited { .. } => "field_edited",
            ViewEvent::SelectionChanged(_) => "selection_changed",
            ViewEvent::Delete => "delete",
            ViewEvent::Save => "save",
            ViewEvent::ResetChanges => "reset_changes",
            ViewEvent::Refresh => "refresh",
            ViewEvent::ResetDataSource => "reset_data_source",
            ViewEvent::Search(_) => "search",
            ViewEvent::ToggleSort => "toggle_sort",
        }
    }
}
