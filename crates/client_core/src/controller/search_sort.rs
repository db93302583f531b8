//! Free-text search and the three-state LastName sort.

use std::sync::Arc;

use shared::domain::SortOrder;
use tracing::{info, warn};

use crate::{
    controller::report_failure,
    data_service::{DataService, ListFilter},
    text::{TextProvider, SORT_MESSAGE},
    ui_state::UiStateModel,
    view::NotificationSink,
};

pub struct SearchSortController {
    data: Arc<dyn DataService>,
    state: Arc<UiStateModel>,
    texts: Arc<dyn TextProvider>,
    notifier: Arc<dyn NotificationSink>,
}

impl SearchSortController {
    pub fn new(
        data: Arc<dyn DataService>,
        state: Arc<UiStateModel>,
        texts: Arc<dyn TextProvider>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            data,
            state,
            texts,
            notifier,
        }
    }

    pub async fn search(&self, query: &str) {
        let filter = (!query.is_empty()).then(|| ListFilter::LastNameContains(query.to_string()));
        if let Err(err) = self.data.filter(filter).await {
            warn!(error = %err, query, "search failed");
            report_failure(self.notifier.as_ref(), &err);
        }
    }

    /// Advances None -> Ascending -> Descending -> None and returns the new state.
    pub async fn toggle_sort(&self) -> SortOrder {
        let order = self.state.get().order.next();
        self.state.set_order(order);
        if let Err(err) = self.data.sort(order).await {
            warn!(error = %err, ?order, "sort failed");
            report_failure(self.notifier.as_ref(), &err);
            return order;
        }

        info!(?order, "list sort changed");
        let state_text = self.texts.text(order.text_id(), &[]);
        self.notifier
            .show_toast(&self.texts.text(SORT_MESSAGE, &[state_text.as_str()]));
        order
    }

}
