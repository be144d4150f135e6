//! Customer operations over an abstract record store.
//!
//! Validation always completes before the store is touched. Failures are
//! returned, never translated here; see [`crate::errors::Translation`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::customer::{Customer, CustomerDetails, CustomerId};
use crate::errors::{ApiError, ServiceError, StoreError};
use crate::validation::{
    is_blank, validate_customer_details, validate_customer_id, validate_update_request,
};

/// Persistence contract consumed by [`CustomerService`].
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Persists a new record and returns it with its assigned id.
    async fn insert(&self, details: CustomerDetails) -> Result<Customer, StoreError>;

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;

    /// Records whose first or last name starts with `term`, see
    /// [`Customer::name_starts_with`]. Store iteration order.
    async fn find_by_name_prefix(&self, term: &str) -> Result<Vec<Customer>, StoreError>;

    async fn update(&self, customer: &Customer) -> Result<(), StoreError>;

    async fn remove(&self, customer: &Customer) -> Result<(), StoreError>;

    /// Commits pending changes. No-op for auto-committing stores.
    async fn save(&self) -> Result<(), StoreError>;

    async fn close(&self) {}
}

#[async_trait]
impl<T: CustomerStore + ?Sized> CustomerStore for Arc<T> {
    async fn insert(&self, details: CustomerDetails) -> Result<Customer, StoreError> {
        (**self).insert(details).await
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_name_prefix(&self, term: &str) -> Result<Vec<Customer>, StoreError> {
        (**self).find_by_name_prefix(term).await
    }

    async fn update(&self, customer: &Customer) -> Result<(), StoreError> {
        (**self).update(customer).await
    }

    async fn remove(&self, customer: &Customer) -> Result<(), StoreError> {
        (**self).remove(customer).await
    }

    async fn save(&self) -> Result<(), StoreError> {
        (**self).save().await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

pub struct CustomerService<S> {
    store: S,
}

impl<S: CustomerStore> CustomerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Blank terms return an empty list without querying the store.
    pub async fn search(&self, search_term: &str) -> Result<Vec<Customer>, ServiceError> {
        if is_blank(search_term) {
            debug!(event_name = "customer.search.skipped", "blank search term");
            return Ok(Vec::new());
        }

        let customers = self.store.find_by_name_prefix(search_term).await?;
        debug!(
            event_name = "customer.search",
            search_term,
            matches = customers.len(),
            "customer search completed"
        );
        Ok(customers)
    }

    pub async fn add(&self, customer: Option<CustomerDetails>) -> Result<Customer, ServiceError> {
        validate_customer_details(customer.as_ref())?;
        // presence was checked by validation
        let details = customer.unwrap_or_default();

        let stored = self.store.insert(details).await?;
        self.store.save().await?;

        info!(event_name = "customer.added", customer_id = %stored.id, "customer added");
        Ok(stored)
    }

    /// Overwrites the mutable fields of the record at `id`. The stored id is
    /// kept regardless of what the payload carried.
    pub async fn update(
        &self,
        id: i64,
        customer: Option<CustomerDetails>,
    ) -> Result<Customer, ServiceError> {
        validate_update_request(id, customer.as_ref())?;
        let details = customer.unwrap_or_default();

        let mut existing = self.find_existing(id).await?;
        existing.apply_details(details);

        self.store.update(&existing).await?;
        self.store.save().await?;

        info!(event_name = "customer.updated", customer_id = %existing.id, "customer updated");
        Ok(existing)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        validate_customer_id(id)?;

        let existing = self.find_existing(id).await?;
        self.store.remove(&existing).await?;
        self.store.save().await?;

        info!(event_name = "customer.deleted", customer_id = %existing.id, "customer deleted");
        Ok(())
    }

    /// Releases the underlying store handle.
    pub async fn close(&self) {
        self.store.close().await;
    }

    async fn find_existing(&self, id: i64) -> Result<Customer, ServiceError> {
        self.store.find_by_id(CustomerId(id)).await?.ok_or_else(|| {
            ApiError::no_result_found(format!("Customer with id {id} not found.")).into()
        })
    }
}
