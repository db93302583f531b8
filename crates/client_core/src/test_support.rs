//! Recording doubles and fixtures shared by the controller tests.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use shared::{
    domain::{ContextId, Person, PersonField, SortOrder},
    error::ServiceError,
};
use storage::Storage;

use crate::{
    data_service::{DataService, DeleteOutcome, EntityContext, ListFilter, VanishCallback},
    message_bus::MessageBus,
    model::{PeopleModel, DEFAULT_GROUP_ID},
    view::{CloseHandler, DetailPane, NotificationSink, PaneLayout},
};

pub async fn seeded_model() -> (Storage, Arc<PeopleModel>) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.reset_data_source().await.expect("seed");
    let model = PeopleModel::open(storage.clone(), DEFAULT_GROUP_ID)
        .await
        .expect("initial load");
    (storage, model)
}

pub fn row_named(model: &PeopleModel, user_name: &str) -> Arc<dyn EntityContext> {
    model
        .contexts()
        .into_iter()
        .find(|ctx| ctx.person().user_name == user_name)
        .unwrap_or_else(|| panic!("row {user_name} is listed"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Toast(String),
    Error(String),
}

#[derive(Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<Notification>>,
    open: Mutex<Vec<CloseHandler>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.shown()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Toast(text) => Some(text),
                Notification::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.shown()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Error(text) => Some(text),
                Notification::Toast(_) => None,
            })
            .collect()
    }

    /// Closes every open error notification, running their close handlers.
    pub fn dismiss_all(&self) {
        let handlers: Vec<CloseHandler> = self.open.lock().drain(..).collect();
        for on_close in handlers {
            on_close();
        }
    }
}

impl NotificationSink for RecordingNotifier {
    fn show_toast(&self, text: &str) {
        self.shown.lock().push(Notification::Toast(text.to_string()));
    }

    fn show_error(&self, text: &str, on_close: Option<CloseHandler>) {
        self.shown.lock().push(Notification::Error(text.to_string()));
        if let Some(on_close) = on_close {
            self.open.lock().push(on_close);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneRecord {
    pub bound: Option<ContextId>,
    pub visible: bool,
    pub layout: PaneLayout,
}

pub struct RecordingPane {
    record: Mutex<PaneRecord>,
}

impl RecordingPane {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            record: Mutex::new(PaneRecord {
                bound: None,
                visible: false,
                layout: PaneLayout::LIST_ONLY,
            }),
        })
    }

    pub fn record(&self) -> PaneRecord {
        *self.record.lock()
    }
}

impl DetailPane for RecordingPane {
    fn bind(&self, context: Option<Arc<dyn EntityContext>>) {
        self.record.lock().bound = context.map(|ctx| ctx.id());
    }

    fn set_visible(&self, visible: bool) {
        self.record.lock().visible = visible;
    }

    fn set_layout(&self, layout: PaneLayout) {
        self.record.lock().layout = layout;
    }
}

/// Polls `condition` while letting spawned tasks run.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Data service whose answers are fixed up front.
pub struct ScriptedData {
    pending: AtomicBool,
    reloads: AtomicUsize,
    bus: Arc<MessageBus>,
    rows: Mutex<Vec<Arc<dyn EntityContext>>>,
    next_id: AtomicI64,
}

impl ScriptedData {
    pub fn new(pending: bool) -> Arc<Self> {
        Arc::new(Self {
            pending: AtomicBool::new(pending),
            reloads: AtomicUsize::new(0),
            bus: MessageBus::new(),
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        })
    }

    pub fn add_row(&self, user_name: &str, delete_result: Result<(), ServiceError>) -> Arc<dyn EntityContext> {
        let ctx: Arc<dyn EntityContext> = Arc::new(ScriptedContext {
            id: ContextId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            person: Mutex::new(Person::new(user_name, "", "", "18")),
            delete_result,
            keep_alive: AtomicBool::new(false),
        });
        self.rows.lock().push(Arc::clone(&ctx));
        ctx
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataService for ScriptedData {
    fn create(&self, _initial: Person) -> Arc<dyn EntityContext> {
        self.add_row("", Ok(()))
    }

    fn has_pending_changes(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    fn reset_changes(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }

    async fn refresh(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn reload(&self) -> Result<(), ServiceError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn submit_batch(&self, _group_id: &str) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn filter(&self, _filter: Option<ListFilter>) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn sort(&self, _order: SortOrder) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn invoke(&self, _operation: &str) -> Result<(), ServiceError> {
        Ok(())
    }

    fn messages(&self) -> Arc<MessageBus> {
        Arc::clone(&self.bus)
    }

    fn contexts(&self) -> Vec<Arc<dyn EntityContext>> {
        self.rows.lock().clone()
    }
}

pub struct ScriptedContext {
    id: ContextId,
    person: Mutex<Person>,
    delete_result: Result<(), ServiceError>,
    keep_alive: AtomicBool,
}

impl EntityContext for ScriptedContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn get_field(&self, field: PersonField) -> String {
        self.person.lock().get(field).to_string()
    }

    fn person(&self) -> Person {
        self.person.lock().clone()
    }

    fn set_field(&self, field: PersonField, value: &str) -> Result<(), ServiceError> {
        self.person.lock().set(field, value);
        Ok(())
    }

    fn delete(&self) -> DeleteOutcome {
        let result = self.delete_result.clone();
        async move {
            tokio::task::yield_now().await;
            result
        }
        .boxed()
    }

    fn set_keep_alive(&self, keep_alive: bool, _on_vanish: Option<VanishCallback>) {
        self.keep_alive.store(keep_alive, Ordering::SeqCst);
    }

    fn is_keep_alive(&self) -> bool {
        self.keep_alive.load(Ordering::SeqCst)
    }

    fn is_deleted(&self) -> bool {
        false
    }
}
