use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use customer_api_core::{Customer, CustomerDetails, CustomerId, CustomerStore, StoreError};
use tokio::sync::RwLock;

use super::RepositoryError;

/// Process-local store; ids start at 1 and are never reused.
#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<BTreeMap<CustomerId, Customer>>,
    last_id: AtomicI64,
}

#[cfg(test)]
impl InMemoryCustomerRepository {
    async fn len(&self) -> usize {
        self.customers.read().await.len()
    }

    async fn is_empty(&self) -> bool {
        self.customers.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl CustomerStore for InMemoryCustomerRepository {
    async fn insert(&self, details: CustomerDetails) -> Result<Customer, StoreError> {
        let id = CustomerId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);
        let customer = Customer::from_details(id, details);
        let mut customers = self.customers.write().await;
        customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let customers = self.customers.read().await;
        Ok(customers.get(&id).cloned())
    }

    async fn find_by_name_prefix(&self, term: &str) -> Result<Vec<Customer>, StoreError> {
        let customers = self.customers.read().await;
        Ok(customers.values().filter(|customer| customer.name_starts_with(term)).cloned().collect())
    }

    async fn update(&self, customer: &Customer) -> Result<(), StoreError> {
        let mut customers = self.customers.write().await;
        let existing = customers
            .get_mut(&customer.id)
            .ok_or(RepositoryError::NotFound(customer.id))?;
        *existing = customer.clone();
        Ok(())
    }

    async fn remove(&self, customer: &Customer) -> Result<(), StoreError> {
        let mut customers = self.customers.write().await;
        customers.remove(&customer.id).ok_or(RepositoryError::NotFound(customer.id))?;
        Ok(())
    }

    async fn save(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
