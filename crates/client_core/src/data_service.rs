//! Contract between the controller and the store that owns the People collection.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use shared::{
    domain::{ContextId, Person, PersonField, SortOrder},
    error::ServiceError,
};

use crate::message_bus::MessageBus;

/// Invoked by the store when a kept-alive entity no longer exists after a reload.
pub type VanishCallback = Box<dyn FnOnce() + Send + Sync>;

/// Outcome of a delete request, settled by the store.
pub type DeleteOutcome = BoxFuture<'static, Result<(), ServiceError>>;

/// Application filter on the list binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    LastNameContains(String),
}

/// Handle to one entity inside the pending change set. The store owns the data.
pub trait EntityContext: Send + Sync {
    fn id(&self) -> ContextId;

    fn get_field(&self, field: PersonField) -> String;

    fn person(&self) -> Person;

    fn set_field(&self, field: PersonField, value: &str) -> Result<(), ServiceError>;

    /// Marks the entity deleted before returning. The outcome resolves once the store
    /// has settled the delete: on batch success, batch failure, or cancellation
    /// (`ServiceError::canceled`).
    fn delete(&self) -> DeleteOutcome;

    fn set_keep_alive(&self, keep_alive: bool, on_vanish: Option<VanishCallback>);

    fn is_keep_alive(&self) -> bool;

    /// True once the store has dropped this entity or it is marked for deletion.
    fn is_deleted(&self) -> bool;
}

#[async_trait]
pub trait DataService: Send + Sync {
    fn create(&self, initial: Person) -> Arc<dyn EntityContext>;

    fn has_pending_changes(&self) -> bool;

    /// Discards every local edit, drops created rows and cancels pending deletes.
    fn reset_changes(&self);

    /// Reloads the list from the store. Refused while changes are pending.
    async fn refresh(&self) -> Result<(), ServiceError>;

    /// Reloads the list from the store unconditionally. Rows with unsaved changes keep
    /// their local state; every other row takes the store's values.
    async fn reload(&self) -> Result<(), ServiceError>;

    /// Submits all pending changes of `group_id` as one atomic batch.
    async fn submit_batch(&self, group_id: &str) -> Result<(), ServiceError>;

    async fn filter(&self, filter: Option<ListFilter>) -> Result<(), ServiceError>;

    async fn sort(&self, order: SortOrder) -> Result<(), ServiceError>;

    /// Calls a bound operation of the store, e.g. the data source reset.
    async fn invoke(&self, operation: &str) -> Result<(), ServiceError>;

    fn messages(&self) -> Arc<MessageBus>;

    /// Rows of the current listing, in display order.
    fn contexts(&self) -> Vec<Arc<dyn EntityContext>>;

    /// Resolves a live entity, including a kept-alive one the listing no longer shows.
    fn context(&self, id: ContextId) -> Option<Arc<dyn EntityContext>> {
        self.contexts().into_iter().find(|ctx| ctx.id() == id)
    }
}
