//! Create, delete, save and reset against the store, reconciled into the view state.

use std::sync::Arc;

use shared::domain::{ContextId, Person, PersonField};
use tracing::{debug, info, warn};

use crate::{
    controller::{
        change_tracker::ChangeTracker, report_failure, selection::SelectionController,
        ControllerSettings,
    },
    data_service::{DataService, DeleteOutcome, EntityContext},
    text::{
        TextProvider, CHANGES_SENT, DELETION_RESTORED, DELETION_SUCCESS, REFRESH_NOT_POSSIBLE,
        REFRESH_SUCCESS, SOURCE_RESET_SUCCESS,
    },
    ui_state::UiStateModel,
    view::NotificationSink,
};

/// A delete already applied to the view, waiting for the store to settle it.
pub struct PendingDelete {
    ctx: Arc<dyn EntityContext>,
    id: ContextId,
    user_name: String,
    outcome: DeleteOutcome,
}

pub struct BatchCoordinator {
    data: Arc<dyn DataService>,
    state: Arc<UiStateModel>,
    tracker: Arc<ChangeTracker>,
    selection: Arc<SelectionController>,
    texts: Arc<dyn TextProvider>,
    notifier: Arc<dyn NotificationSink>,
    settings: ControllerSettings,
}

impl BatchCoordinator {
    pub fn new(
        data: Arc<dyn DataService>,
        state: Arc<UiStateModel>,
        tracker: Arc<ChangeTracker>,
        selection: Arc<SelectionController>,
        texts: Arc<dyn TextProvider>,
        notifier: Arc<dyn NotificationSink>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            data,
            state,
            tracker,
            selection,
            texts,
            notifier,
            settings,
        }
    }

    pub fn create(&self) -> Arc<dyn EntityContext> {
        let ctx = self.data.create(Person::default());
        self.tracker.recompute(Some(true));
        self.state.set_username_empty(true);
        info!(context = %ctx.id(), "person created");
        ctx
    }

    /// `committed` is false when the edit was escaped and the old value restored.
    pub fn on_field_edit(&self, ctx: &dyn EntityContext, committed: bool) {
        if !committed {
            self.tracker.recompute(None);
            return;
        }
        self.tracker.recompute(Some(true));
        if !ctx.get_field(PersonField::UserName).is_empty() {
            self.state.set_username_empty(false);
        }
    }

    /// Submits every pending change as one batch. Ignored while a submission is in flight.
    pub async fn save(&self) {
        if self.state.get().busy {
            warn!("batch submission already in flight, save ignored");
            return;
        }

        self.state.set_busy(true);
        let result = self.data.submit_batch(&self.settings.batch_group_id).await;
        self.state.set_busy(false);

        match result {
            Ok(()) => {
                self.tracker.clear_technical_errors();
                self.tracker.recompute(Some(false));
                info!(group = %self.settings.batch_group_id, "changes saved");
                self.notifier.show_toast(&self.texts.text(CHANGES_SENT, &[]));
                self.reload_after_save().await;
            }
            Err(err) => {
                self.tracker.recompute(None);
                warn!(error = %err, technical = err.is_technical(), "save failed");
                report_failure(self.notifier.as_ref(), &err);
            }
        }
    }

    /// The batch response does not carry the server's canonical rows; reload them.
    /// Changes made during the submission stay pending on top of the reloaded rows.
    async fn reload_after_save(&self) {
        if let Err(err) = self.data.reload().await {
            warn!(error = %err, "reload after save failed");
            report_failure(self.notifier.as_ref(), &err);
        }
    }

    pub fn reset_changes(&self) {
        self.data.reset_changes();
        self.tracker.clear_technical_errors();
        self.tracker.recompute(None);
        info!("local changes discarded");
    }

    pub async fn delete(&self, ctx: Arc<dyn EntityContext>) {
        let pending = self.begin_delete(ctx);
        self.finish_delete(pending).await;
    }

    /// Hides the detail, marks the row deleted and forces the unsaved flag. Runs to
    /// completion before the caller handles its next event.
    pub fn begin_delete(&self, ctx: Arc<dyn EntityContext>) -> PendingDelete {
        let user_name = ctx.get_field(PersonField::UserName);
        let id = ctx.id();
        self.selection.set_detail_area(None);
        let outcome = ctx.delete();
        self.tracker.recompute(Some(true));
        info!(context = %id, user = %user_name, "deleting person");
        PendingDelete {
            ctx,
            id,
            user_name,
            outcome,
        }
    }

    /// Waits for the store to settle the delete and reconciles the view with the outcome.
    pub async fn finish_delete(&self, pending: PendingDelete) {
        let PendingDelete {
            ctx,
            id,
            user_name,
            outcome,
        } = pending;

        match outcome.await {
            Ok(()) => {
                self.selection.clear_row_selection(id);
                self.tracker.recompute(None);
                self.notifier
                    .show_toast(&self.texts.text(DELETION_SUCCESS, &[user_name.as_str()]));
            }
            Err(err) => {
                if self.selection.is_selected(id) {
                    self.selection.set_detail_area(Some(Arc::clone(&ctx)));
                }
                if err.canceled {
                    info!(context = %id, user = %user_name, "deletion canceled by store");
                    self.notifier
                        .show_toast(&self.texts.text(DELETION_RESTORED, &[user_name.as_str()]));
                } else if err.is_technical() {
                    warn!(context = %id, error = %err, "deletion failed with the batch");
                } else {
                    warn!(context = %id, error = %err, "deletion failed");
                    self.notifier
                        .show_error(&format!("{}: {user_name}", err.message), None);
                }
                self.tracker.recompute(None);
            }
        }
    }

    /// Reseeds the store, then drops every local change and reloads.
    pub async fn reset_data_source(&self) {
        if let Err(err) = self.data.invoke(&self.settings.reset_operation).await {
            warn!(error = %err, "data source reset failed");
            report_failure(self.notifier.as_ref(), &err);
            return;
        }

        // Local baselines predate the reseed.
        self.data.reset_changes();
        let reloaded = self.data.reload().await;
        self.tracker.recompute(None);
        match reloaded {
            Ok(()) => self
                .notifier
                .show_toast(&self.texts.text(SOURCE_RESET_SUCCESS, &[])),
            Err(err) => report_failure(self.notifier.as_ref(), &err),
        }
    }

    pub async fn refresh(&self) {
        if self.data.has_pending_changes() {
            debug!("refresh refused, changes pending");
            self.notifier
                .show_error(&self.texts.text(REFRESH_NOT_POSSIBLE, &[]), None);
            return;
        }
        match self.data.refresh().await {
            Ok(()) => self.notifier.show_toast(&self.texts.text(REFRESH_SUCCESS, &[])),
            Err(err) => report_failure(self.notifier.as_ref(), &err),
        }
    }
}
