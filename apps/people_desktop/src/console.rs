//! Console renditions of the notification sink and the detail pane.

use std::sync::Arc;

use client_core::{CloseHandler, DetailPane, EntityContext, NotificationSink, PaneLayout};
use parking_lot::Mutex;
use shared::domain::PersonField;
use tracing::debug;

/// Prints notifications. Errors stay open until [`ConsoleNotifier::dismiss`].
#[derive(Default)]
pub struct ConsoleNotifier {
    open_errors: Mutex<Vec<CloseHandler>>,
}

impl ConsoleNotifier {
    /// Closes every open error; returns how many were closed.
    pub fn dismiss(&self) -> usize {
        let handlers: Vec<CloseHandler> = self.open_errors.lock().drain(..).collect();
        let count = handlers.len();
        for handler in handlers {
            handler();
        }
        count
    }
}

impl NotificationSink for ConsoleNotifier {
    fn show_toast(&self, text: &str) {
        println!("[info] {text}");
    }

    fn show_error(&self, text: &str, on_close: Option<CloseHandler>) {
        println!("[error] {text}");
        if let Some(handler) = on_close {
            self.open_errors.lock().push(handler);
        }
    }
}

pub struct ConsolePane;

impl DetailPane for ConsolePane {
    fn bind(&self, context: Option<Arc<dyn EntityContext>>) {
        match context {
            Some(ctx) => println!("[detail] {}", format_person(ctx.as_ref())),
            None => println!("[detail] closed"),
        }
    }

    fn set_visible(&self, visible: bool) {
        debug!(visible, "detail pane visibility");
    }

    fn set_layout(&self, layout: PaneLayout) {
        debug!(
            list = layout.list_size_percent,
            resizable = layout.resizable,
            search = layout.search_field_width_percent,
            "pane layout"
        );
    }
}

pub fn format_person(ctx: &dyn EntityContext) -> String {
    format!(
        "{:<18} {:<12} {:<12} {}",
        ctx.get_field(PersonField::UserName),
        ctx.get_field(PersonField::FirstName),
        ctx.get_field(PersonField::LastName),
        ctx.get_field(PersonField::Age),
    )
}
