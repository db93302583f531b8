//! Pending-change coordination for the People master-detail editor.
//!
//! [`model::PeopleModel`] keeps unsaved edits on the client and commits them as one batch;
//! [`controller::PeopleController`] turns view events into calls on it and reconciles
//! every outcome back into the observable [`ui_state::UiState`].

pub mod controller;
pub mod data_service;
pub mod message_bus;
pub mod model;
pub mod text;
pub mod ui_state;
pub mod view;

pub use controller::{events::ViewEvent, ControllerSettings, PeopleController};
pub use data_service::{DataService, DeleteOutcome, EntityContext, ListFilter, VanishCallback};
pub use message_bus::MessageBus;
pub use model::{PeopleModel, PersonContext, DEFAULT_GROUP_ID, RESET_DATA_SOURCE};
pub use text::{TextBundle, TextProvider};
pub use ui_state::{UiState, UiStateModel};
pub use view::{CloseHandler, DetailPane, NotificationSink, PaneLayout};

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "tests/message_bus_tests.rs"]
mod message_bus_tests;
