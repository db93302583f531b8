//! Controller layer: view events, change tracking, selection and batch orchestration.

pub mod batch;
pub mod change_tracker;
pub mod events;
pub mod message_dedup;
pub mod search_sort;
pub mod selection;

use std::sync::Arc;

use parking_lot::Mutex;
use shared::error::ServiceError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    data_service::DataService,
    model::{DEFAULT_GROUP_ID, RESET_DATA_SOURCE},
    text::TextProvider,
    ui_state::{UiState, UiStateModel},
    view::{DetailPane, NotificationSink},
};

use self::{
    batch::BatchCoordinator, change_tracker::ChangeTracker, events::ViewEvent,
    message_dedup::MessageDeduplicator, search_sort::SearchSortController,
    selection::SelectionController,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub batch_group_id: String,
    pub reset_operation: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            batch_group_id: DEFAULT_GROUP_ID.to_string(),
            reset_operation: RESET_DATA_SOURCE.to_string(),
        }
    }
}

/// Shows a failed call to the user. Technical failures already reach the user through
/// the message feed; showing them here as well would open a second notification.
pub(crate) fn report_failure(notifier: &dyn NotificationSink, err: &ServiceError) {
    if err.is_technical() {
        debug!(error = %err, "technical failure left to the message feed");
        return;
    }
    notifier.show_error(&err.message, None);
}

/// Wires the controller parts together and routes [`ViewEvent`]s to them.
pub struct PeopleController {
    data: Arc<dyn DataService>,
    state: Arc<UiStateModel>,
    notifier: Arc<dyn NotificationSink>,
    tracker: Arc<ChangeTracker>,
    selection: Arc<SelectionController>,
    coordinator: Arc<BatchCoordinator>,
    search_sort: SearchSortController,
    dedup: Arc<MessageDeduplicator>,
    pending_deletes: Mutex<Vec<JoinHandle<()>>>,
}

impl PeopleController {
    pub fn new(
        data: Arc<dyn DataService>,
        texts: Arc<dyn TextProvider>,
        notifier: Arc<dyn NotificationSink>,
        settings: ControllerSettings,
    ) -> Self {
        let state = Arc::new(UiStateModel::default());
        let tracker = Arc::new(ChangeTracker::new(Arc::clone(&data), Arc::clone(&state)));
        let selection = SelectionController::new();
        let coordinator = Arc::new(BatchCoordinator::new(
            Arc::clone(&data),
            Arc::clone(&state),
            Arc::clone(&tracker),
            Arc::clone(&selection),
            Arc::clone(&texts),
            Arc::clone(&notifier),
            settings,
        ));
        let search_sort = SearchSortController::new(
            Arc::clone(&data),
            Arc::clone(&state),
            texts,
            Arc::clone(&notifier),
        );
        let dedup = Arc::new(MessageDeduplicator::new(
            data.messages(),
            Arc::clone(&tracker),
            Arc::clone(&notifier),
        ));

        Self {
            data,
            state,
            notifier,
            tracker,
            selection,
            coordinator,
            search_sort,
            dedup,
            pending_deletes: Mutex::new(Vec::new()),
        }
    }

    /// Starts following the store's technical messages.
    pub fn start(&self) -> JoinHandle<()> {
        Arc::clone(&self.dedup).spawn()
    }

    pub fn attach_detail_pane(&self, pane: Arc<dyn DetailPane>) {
        self.selection.attach_detail_pane(pane);
    }

    pub fn ui_state(&self) -> UiState {
        self.state.get()
    }

    pub fn state_model(&self) -> &Arc<UiStateModel> {
        &self.state
    }

    pub fn data(&self) -> &Arc<dyn DataService> {
        &self.data
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn selection(&self) -> &Arc<SelectionController> {
        &self.selection
    }

    pub fn coordinator(&self) -> &Arc<BatchCoordinator> {
        &self.coordinator
    }

    pub fn dedup(&self) -> &MessageDeduplicator {
        &self.dedup
    }

    pub async fn handle(&self, event: ViewEvent) {
        debug!(event = event.name(), "handling view event");
        match event {
            ViewEvent::Create => {
                let ctx = self.coordinator.create();
                self.selection.on_select(Some(ctx));
            }
            ViewEvent::FieldEdited {
                context,
                field,
                value,
                committed,
            } => {
                let Some(ctx) = self.data.context(context) else {
                    warn!(%context, "edit for a row that is no longer listed");
                    return;
                };
                if committed {
                    if let Err(err) = ctx.set_field(field, &value) {
                        self.notifier.show_error(&err.message, None);
                        return;
                    }
                }
                self.coordinator.on_field_edit(ctx.as_ref(), committed);
            }
            ViewEvent::SelectionChanged(None) => self.selection.on_select(None),
            ViewEvent::SelectionChanged(Some(id)) => match self.data.context(id) {
                Some(ctx) => self.selection.on_select(Some(ctx)),
                None => warn!(context = %id, "selected row is no longer listed"),
            },
            ViewEvent::Delete => {
                let Some(ctx) = self
                    .selection
                    .selected_row()
                    .and_then(|id| self.data.context(id))
                else {
                    debug!("delete without a selected row");
                    return;
                };
                let pending = self.coordinator.begin_delete(ctx);
                // The outcome settles only with the next batch or reset.
                let coordinator = Arc::clone(&self.coordinator);
                let task = tokio::spawn(async move { coordinator.finish_delete(pending).await });
                self.pending_deletes.lock().push(task);
            }
            ViewEvent::Save => self.coordinator.save().await,
            ViewEvent::ResetChanges => self.coordinator.reset_changes(),
            ViewEvent::Refresh => self.coordinator.refresh().await,
            ViewEvent::ResetDataSource => self.coordinator.reset_data_source().await,
            ViewEvent::Search(query) => self.search_sort.search(&query).await,
            ViewEvent::ToggleSort => {
                self.search_sort.toggle_sort().await;
            }
        }
    }

    /// Awaits every spawned delete. Only returns once a save or reset has settled them.
    pub async fn settle_deletes(&self) {
        let tasks: Vec<JoinHandle<()>> = self.pending_deletes.lock().drain(..).collect();
        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "delete task failed");
            }
        }
    }

    /// Deletes still waiting for a batch or reset.
    pub fn unsettled_deletes(&self) -> usize {
        let mut tasks = self.pending_deletes.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.len()
    }
}

#[cfg(test)]
#[path = "../tests/controller_tests.rs"]
mod tests;
