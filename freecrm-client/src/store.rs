/// Normalized entity store
///
/// One [`EntityStore`] per entity kind holds the records a UI has loaded,
/// keyed by id, in display order. It only changes through
/// [`EntityStore::apply`]: a list load replaces the set, a created or
/// updated record is upserted, a deleted id is removed.
///
/// [`EntityStore::apply_result`] feeds an API call's outcome straight in;
/// a failed call records the error and leaves the records untouched.
///
/// # Example
///
/// ```no_run
/// use freecrm_client::{store::{EntityStore, StoreAction}, forms::ContactForm, CrmClient};
/// use freecrm_shared::models::client::Client;
///
/// # async fn example(crm: CrmClient) {
/// let mut clients: EntityStore<Client> = EntityStore::new();
///
/// clients.apply_result(crm.list_clients().await.map(StoreAction::Loaded));
/// clients.apply_result(
///     crm.create_client(&ContactForm::named("Acme")).await.map(StoreAction::Upserted),
/// );
/// # }
/// ```

use std::collections::HashMap;

use chrono::NaiveDate;
use freecrm_shared::{
    billing::EffectiveStatus,
    models::{client::Client, invoice::InvoiceView, prospect::Prospect, task::Task},
};
use uuid::Uuid;

use crate::error::ClientError;

/// Records a store can hold
pub trait Entity: Clone {
    fn id(&self) -> Uuid;
}

impl Entity for Client {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Prospect {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Task {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for InvoiceView {
    fn id(&self) -> Uuid {
        self.invoice.id
    }
}

/// A change to a store
#[derive(Debug, Clone)]
pub enum StoreAction<T> {
    /// Replace the whole set, keeping the server's order
    Loaded(Vec<T>),

    /// Replace the record with the same id in place, or put a new one first
    Upserted(T),

    /// Drop the record with this id
    Removed(Uuid),
}

/// Records of one kind, normalized by id
#[derive(Debug, Clone)]
pub struct EntityStore<T> {
    order: Vec<Uuid>,
    by_id: HashMap<Uuid, T>,
    last_error: Option<String>,
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            by_id: HashMap::new(),
            last_error: None,
        }
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, action: StoreAction<T>) {
        match action {
            StoreAction::Loaded(records) => {
                self.order.clear();
                self.by_id.clear();
                for record in records {
                    let id = record.id();
                    if self.by_id.insert(id, record).is_none() {
                        self.order.push(id);
                    }
                }
            }
            StoreAction::Upserted(record) => {
                let id = record.id();
                if self.by_id.insert(id, record).is_none() {
                    self.order.insert(0, id);
                }
            }
            StoreAction::Removed(id) => {
                if self.by_id.remove(&id).is_some() {
                    self.order.retain(|existing| *existing != id);
                }
            }
        }
    }

    /// Applies a successful call's action, or records the error
    ///
    /// Returns whether the store changed.
    pub fn apply_result(&mut self, result: Result<StoreAction<T>, ClientError>) -> bool {
        match result {
            Ok(action) => {
                self.last_error = None;
                self.apply(action);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Store left unchanged after failed call");
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.by_id.get(&id)
    }

    /// Records in display order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Message of the last failed call, cleared by the next success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Invoice views carry a status resolved on the day they were fetched
impl EntityStore<InvoiceView> {
    /// Effective status of an invoice as of `today`, resolved from its
    /// stored status and due date rather than the cached value
    pub fn status_of(&self, id: Uuid, today: NaiveDate) -> Option<EffectiveStatus> {
        self.get(id).map(|view| view.invoice.effective_status(today))
    }

    /// Re-resolves every cached status for `today`; returns how many changed
    pub fn refresh_statuses(&mut self, today: NaiveDate) -> usize {
        self.by_id
            .values_mut()
            .map(|view| view.refresh(today))
            .filter(|changed| *changed)
            .count()
    }
}
