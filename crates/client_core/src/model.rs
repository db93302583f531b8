//! Client-side pending change set over the persisted People collection.
//!
//! Edits, creations and deletions stay local until `submit_batch` sends them to
//! [`Storage`] as a single transaction. Delete futures stay unresolved until the batch
//! containing them settles, or until `reset_changes` cancels them.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Weak,
    },
};

use async_trait::async_trait;
use futures::{future, FutureExt};
use parking_lot::Mutex;
use shared::{
    domain::{ContextId, Person, PersonField, SortOrder},
    error::{ErrorCode, ServiceError},
    messages::TechnicalMessage,
};
use storage::{BatchOp, PeopleQuery, Storage};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::{
    data_service::{DataService, DeleteOutcome, EntityContext, ListFilter, VanishCallback},
    message_bus::MessageBus,
};

pub const RESET_DATA_SOURCE: &str = "ResetDataSource";
pub const DEFAULT_GROUP_ID: &str = "peopleGroup";

type DeleteWaiter = oneshot::Sender<Result<(), ServiceError>>;

pub struct PeopleModel {
    me: Weak<PeopleModel>,
    storage: Storage,
    group_id: String,
    bus: Arc<MessageBus>,
    state: Mutex<ListState>,
    next_id: AtomicI64,
}

#[derive(Default)]
struct ListState {
    /// The current listing, created rows first.
    rows: Vec<Arc<PersonContext>>,
    /// Rows outside the listing that must stay resolvable: the kept-alive row and rows
    /// with unsaved changes.
    kept: Vec<Arc<PersonContext>>,
    query: PeopleQuery,
}

impl ListState {
    fn all(&self) -> impl Iterator<Item = &Arc<PersonContext>> {
        self.rows.iter().chain(self.kept.iter())
    }

    fn retain(&mut self, mut keep: impl FnMut(&Arc<PersonContext>) -> bool) {
        self.rows.retain(&mut keep);
        self.kept.retain(keep);
    }
}

pub struct PersonContext {
    id: ContextId,
    model: Weak<PeopleModel>,
    inner: Mutex<ContextInner>,
}

struct ContextInner {
    person: Person,
    /// Last state known to the store; `None` while the row is transient.
    persisted: Option<Person>,
    deleted: bool,
    dropped: bool,
    delete_waiter: Option<DeleteWaiter>,
    keep_alive: bool,
    on_vanish: Option<VanishCallback>,
}

impl ContextInner {
    fn is_pending(&self) -> bool {
        if self.dropped {
            return false;
        }
        match &self.persisted {
            None => true,
            Some(persisted) => self.deleted || *persisted != self.person,
        }
    }

    fn drop_from_model(&mut self) -> Option<VanishCallback> {
        self.dropped = true;
        self.keep_alive = false;
        self.on_vanish.take()
    }
}

/// Snapshot of one pending row taken when a batch is built.
struct Submitted {
    context: Arc<PersonContext>,
    person: Person,
    delete: bool,
}

impl PeopleModel {
    pub fn new(storage: Storage, group_id: impl Into<String>) -> Arc<Self> {
        let group_id = group_id.into();
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            storage,
            group_id,
            bus: MessageBus::new(),
            state: Mutex::new(ListState::default()),
            next_id: AtomicI64::new(1),
        })
    }

    /// Creates the model and performs the initial list load.
    pub async fn open(storage: Storage, group_id: impl Into<String>) -> Result<Arc<Self>, ServiceError> {
        let model = Self::new(storage, group_id);
        model.load_listing().await?;
        Ok(model)
    }

    pub fn query(&self) -> PeopleQuery {
        self.state.lock().query.clone()
    }

    fn new_context(&self, person: Person, persisted: Option<Person>) -> Arc<PersonContext> {
        let id = ContextId(self.next_id.fetch_add(1, Ordering::Relaxed));
        Arc::new(PersonContext {
            id,
            model: self.me.clone(),
            inner: Mutex::new(ContextInner {
                person,
                persisted,
                deleted: false,
                dropped: false,
                delete_waiter: None,
                keep_alive: false,
                on_vanish: None,
            }),
        })
    }

    fn discard(&self, id: ContextId) {
        self.state.lock().retain(|ctx| ctx.id != id);
    }

    fn technical_failure(&self, what: &str, err: impl Display) -> ServiceError {
        let text = format!("{what}: {err}");
        error!(error = %err, "{what}");
        self.bus.push(TechnicalMessage::technical(text.clone()));
        ServiceError::internal(text)
    }

    fn ensure_no_pending_changes(&self, action: &str) -> Result<(), ServiceError> {
        if self.has_pending_changes() {
            return Err(ServiceError::pending_changes(format!(
                "cannot {action} while changes are pending"
            )));
        }
        Ok(())
    }

    /// Replaces the listing with the store's rows for the current query.
    ///
    /// Unsaved rows keep their local state. Kept-alive and unsaved rows that fall out of
    /// the listing move to `kept` while they still exist in the store; the others vanish.
    async fn load_listing(&self) -> Result<(), ServiceError> {
        let query = self.query();
        let people = self
            .storage
            .list_people(&query)
            .await
            .map_err(|err| self.technical_failure("failed to load people", format!("{err:#}")))?;

        let outside: Vec<Arc<PersonContext>> = {
            let listed: HashSet<&str> = people.iter().map(|p| p.user_name.as_str()).collect();
            let state = self.state.lock();
            state
                .all()
                .filter(|ctx| {
                    let inner = ctx.inner.lock();
                    (inner.keep_alive || inner.is_pending())
                        && inner
                            .persisted
                            .as_ref()
                            .is_some_and(|p| !listed.contains(p.user_name.as_str()))
                })
                .cloned()
                .collect()
        };

        let mut surviving = Vec::new();
        let mut vanished = Vec::new();
        for ctx in outside {
            let Some(key) = ctx.key() else {
                continue;
            };
            match self.storage.find_person(&key).await {
                Ok(Some(person)) => surviving.push((ctx, person)),
                Ok(None) => vanished.push(ctx),
                Err(err) => {
                    return Err(self.technical_failure(
                        "failed to reload kept-alive person",
                        format!("{err:#}"),
                    ))
                }
            }
        }

        let mut callbacks: Vec<VanishCallback> = Vec::new();
        let mut resolved: Vec<DeleteWaiter> = Vec::new();
        let (listed, kept) = {
            let mut state = self.state.lock();
            let (transient, persisted): (Vec<_>, Vec<_>) = std::mem::take(&mut state.rows)
                .into_iter()
                .partition(|ctx| ctx.key().is_none());
            let previous: HashMap<String, Arc<PersonContext>> = persisted
                .into_iter()
                .chain(std::mem::take(&mut state.kept))
                .filter_map(|ctx| ctx.key().map(|key| (key, ctx)))
                .collect();

            let mut rows: Vec<Arc<PersonContext>> = transient
                .into_iter()
                .filter(|ctx| !ctx.inner.lock().dropped)
                .collect();
            for person in people {
                let ctx = match previous.get(&person.user_name) {
                    Some(ctx) => {
                        ctx.refresh_from_store(person);
                        Arc::clone(ctx)
                    }
                    None => self.new_context(person.clone(), Some(person)),
                };
                rows.push(ctx);
            }
            state.rows = rows;
            state.kept = surviving
                .into_iter()
                .map(|(ctx, person)| {
                    ctx.refresh_from_store(person);
                    ctx
                })
                .collect();

            for ctx in &vanished {
                let mut inner = ctx.inner.lock();
                // A delete of a row that is already gone has nothing left to do.
                if let Some(waiter) = inner.delete_waiter.take() {
                    resolved.push(waiter);
                }
                if let Some(on_vanish) = inner.drop_from_model() {
                    callbacks.push(on_vanish);
                }
            }
            (state.rows.len(), state.kept.len())
        };

        info!(
            rows = listed,
            kept,
            vanished = vanished.len(),
            "people list reloaded"
        );
        for waiter in resolved {
            let _ = waiter.send(Ok(()));
        }
        for on_vanish in callbacks {
            on_vanish();
        }
        Ok(())
    }

    fn settle_success(&self, submitted: Vec<Submitted>) {
        let mut resolved = Vec::new();
        let mut callbacks = Vec::new();
        {
            let mut state = self.state.lock();
            for entry in &submitted {
                let mut inner = entry.context.inner.lock();
                if entry.delete {
                    if let Some(on_vanish) = inner.drop_from_model() {
                        callbacks.push(on_vanish);
                    }
                    if let Some(waiter) = inner.delete_waiter.take() {
                        resolved.push(waiter);
                    }
                } else {
                    inner.persisted = Some(entry.person.clone());
                }
            }
            state.retain(|ctx| !ctx.inner.lock().dropped);
        }
        for waiter in resolved {
            let _ = waiter.send(Ok(()));
        }
        for on_vanish in callbacks {
            on_vanish();
        }
    }

    /// A failed batch keeps edits and creations pending but gives deleted rows back.
    fn settle_failure(&self, submitted: Vec<Submitted>, error: &ServiceError) {
        let rejected: Vec<DeleteWaiter> = submitted
            .iter()
            .filter(|entry| entry.delete)
            .filter_map(|entry| {
                let mut inner = entry.context.inner.lock();
                inner.deleted = false;
                inner.delete_waiter.take()
            })
            .collect();
        for waiter in rejected {
            let _ = waiter.send(Err(error.clone()));
        }
    }
}

#[async_trait]
impl DataService for PeopleModel {
    fn create(&self, initial: Person) -> Arc<dyn EntityContext> {
        let ctx = self.new_context(initial, None);
        self.state.lock().rows.insert(0, Arc::clone(&ctx));
        info!(context = %ctx.id, "created transient person");
        ctx
    }

    fn has_pending_changes(&self) -> bool {
        self.state
            .lock()
            .all()
            .any(|ctx| ctx.inner.lock().is_pending())
    }

    fn reset_changes(&self) {
        let mut canceled = Vec::new();
        let mut callbacks = Vec::new();
        {
            let mut state = self.state.lock();
            state.retain(|ctx| {
                let mut inner = ctx.inner.lock();
                let Some(persisted) = inner.persisted.clone() else {
                    if let Some(on_vanish) = inner.drop_from_model() {
                        callbacks.push(on_vanish);
                    }
                    return false;
                };
                if inner.deleted {
                    inner.deleted = false;
                    if let Some(waiter) = inner.delete_waiter.take() {
                        canceled.push((waiter, persisted.user_name.clone()));
                    }
                }
                inner.person = persisted;
                true
            });
        }

        info!(canceled_deletes = canceled.len(), "pending changes reset");
        for (waiter, user_name) in canceled {
            let _ = waiter.send(Err(ServiceError::canceled(format!(
                "deletion of '{user_name}' was canceled"
            ))));
        }
        for on_vanish in callbacks {
            on_vanish();
        }
    }

    async fn refresh(&self) -> Result<(), ServiceError> {
        self.ensure_no_pending_changes("refresh")?;
        self.load_listing().await
    }

    async fn reload(&self) -> Result<(), ServiceError> {
        self.load_listing().await
    }

    async fn submit_batch(&self, group_id: &str) -> Result<(), ServiceError> {
        if group_id != self.group_id {
            return Err(ServiceError::validation(format!(
                "unknown batch group '{group_id}'"
            )));
        }

        let submitted: Vec<Submitted> = {
            let state = self.state.lock();
            state
                .all()
                .filter_map(|ctx| {
                    let inner = ctx.inner.lock();
                    inner.is_pending().then(|| Submitted {
                        context: Arc::clone(ctx),
                        person: inner.person.clone(),
                        delete: inner.deleted,
                    })
                })
                .collect()
        };
        if submitted.is_empty() {
            debug!(group = group_id, "nothing to submit");
            return Ok(());
        }

        let ops: Vec<BatchOp> = submitted
            .iter()
            .map(|entry| match (entry.context.key(), entry.delete) {
                (Some(key), true) => BatchOp::Delete { key },
                (Some(key), false) => BatchOp::Update {
                    key,
                    person: entry.person.clone(),
                },
                (None, _) => BatchOp::Insert(entry.person.clone()),
            })
            .collect();

        info!(group = group_id, operations = ops.len(), "submitting batch");
        match self.storage.apply_batch(&ops).await {
            Ok(()) => {
                self.settle_success(submitted);
                Ok(())
            }
            Err(err) => {
                let error = if err.is_technical() {
                    self.technical_failure("batch submission failed", &err)
                } else {
                    warn!(error = %err, user = err.user_name(), "batch rejected");
                    ServiceError::validation(err.to_string())
                };
                self.settle_failure(submitted, &error);
                Err(error)
            }
        }
    }

    async fn filter(&self, filter: Option<ListFilter>) -> Result<(), ServiceError> {
        self.ensure_no_pending_changes("filter")?;
        let needle = filter.map(|filter| match filter {
            ListFilter::LastNameContains(needle) => needle,
        });
        self.state.lock().query.last_name_contains = needle;
        self.load_listing().await
    }

    async fn sort(&self, order: SortOrder) -> Result<(), ServiceError> {
        self.ensure_no_pending_changes("sort")?;
        self.state.lock().query.order = order;
        self.load_listing().await
    }

    async fn invoke(&self, operation: &str) -> Result<(), ServiceError> {
        if operation != RESET_DATA_SOURCE {
            return Err(ServiceError::new(
                ErrorCode::NotFound,
                format!("unknown operation '{operation}'"),
            ));
        }
        self.storage
            .reset_data_source()
            .await
            .map_err(|err| self.technical_failure("data source reset failed", format!("{err:#}")))?;
        info!(operation, "operation invoked");
        Ok(())
    }

    fn messages(&self) -> Arc<MessageBus> {
        Arc::clone(&self.bus)
    }

    fn contexts(&self) -> Vec<Arc<dyn EntityContext>> {
        self.state
            .lock()
            .rows
            .iter()
            .filter(|ctx| !ctx.is_deleted())
            .map(|ctx| Arc::clone(ctx) as Arc<dyn EntityContext>)
            .collect()
    }

    fn context(&self, id: ContextId) -> Option<Arc<dyn EntityContext>> {
        self.state
            .lock()
            .all()
            .find(|ctx| ctx.id == id && !ctx.is_deleted())
            .map(|ctx| Arc::clone(ctx) as Arc<dyn EntityContext>)
    }
}

impl PersonContext {
    fn key(&self) -> Option<String> {
        self.inner
            .lock()
            .persisted
            .as_ref()
            .map(|p| p.user_name.clone())
    }

    /// Takes the store's values unless the row has unsaved changes.
    fn refresh_from_store(&self, person: Person) {
        let mut inner = self.inner.lock();
        if inner.is_pending() {
            return;
        }
        inner.person = person.clone();
        inner.persisted = Some(person);
    }
}

impl EntityContext for PersonContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn get_field(&self, field: PersonField) -> String {
        self.inner.lock().person.get(field).to_string()
    }

    fn person(&self) -> Person {
        self.inner.lock().person.clone()
    }

    fn set_field(&self, field: PersonField, value: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock();
        if inner.deleted || inner.dropped {
            return Err(ServiceError::validation(format!(
                "cannot edit {field} of a deleted person"
            )));
        }
        inner.person.set(field, value);
        debug!(context = %self.id, %field, "field edited");
        Ok(())
    }

    fn delete(&self) -> DeleteOutcome {
        let receiver = {
            let mut inner = self.inner.lock();
            if inner.deleted || inner.dropped {
                return future::ready(Err(ServiceError::validation("person is already deleted")))
                    .boxed();
            }
            if inner.persisted.is_none() {
                inner.drop_from_model();
                None
            } else {
                let (tx, rx) = oneshot::channel();
                inner.deleted = true;
                inner.delete_waiter = Some(tx);
                Some(rx)
            }
        };

        let Some(receiver) = receiver else {
            // Transient rows never reached the store; dropping them is the whole delete.
            if let Some(model) = self.model.upgrade() {
                model.discard(self.id);
            }
            debug!(context = %self.id, "transient person discarded");
            return future::ready(Ok(())).boxed();
        };

        debug!(context = %self.id, "delete pending until next batch");
        receiver
            .map(|settled| {
                settled.unwrap_or_else(|_| {
                    Err(ServiceError::canceled(
                        "delete request was dropped by the store",
                    ))
                })
            })
            .boxed()
    }

    fn set_keep_alive(&self, keep_alive: bool, on_vanish: Option<VanishCallback>) {
        let mut inner = self.inner.lock();
        inner.keep_alive = keep_alive && !inner.dropped;
        inner.on_vanish = if inner.keep_alive { on_vanish } else { None };
    }

    fn is_keep_alive(&self) -> bool {
        self.inner.lock().keep_alive
    }

    fn is_deleted(&self) -> bool {
        let inner = self.inner.lock();
        inner.deleted || inner.dropped
    }
}

#[cfg(test)]
#[path = "tests/model_tests.rs"]
mod tests;
