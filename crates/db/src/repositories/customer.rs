use async_trait::async_trait;
use customer_api_core::{Customer, CustomerDetails, CustomerId, CustomerStore, StoreError};
use sqlx::Row;

use super::RepositoryError;
use crate::DbPool;

/// SQLite-backed customer store. Every statement auto-commits.
pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert_row(&self, details: CustomerDetails) -> Result<Customer, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO customer (first_name, last_name, birth_date) VALUES (?, ?, ?)",
        )
        .bind(&details.first_name)
        .bind(&details.last_name)
        .bind(&details.birth_date)
        .execute(&self.pool)
        .await?;

        Ok(Customer::from_details(CustomerId(result.last_insert_rowid()), details))
    }

    async fn fetch_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, birth_date FROM customer WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_customer).transpose()
    }

    // SQLite LIKE only folds ASCII, so prefix matching happens in Rust.
    async fn fetch_by_name_prefix(&self, term: &str) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, first_name, last_name, birth_date FROM customer ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::new();
        for row in &rows {
            let customer = row_to_customer(row)?;
            if customer.name_starts_with(term) {
                matches.push(customer);
            }
        }
        Ok(matches)
    }

    async fn update_row(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE customer SET first_name = ?, last_name = ?, birth_date = ? WHERE id = ?",
        )
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.birth_date)
        .bind(customer.id.0)
        .execute(&self.pool)
        .await?;

        expect_one_row(result.rows_affected(), customer.id)
    }

    async fn delete_row(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM customer WHERE id = ?")
            .bind(customer.id.0)
            .execute(&self.pool)
            .await?;

        expect_one_row(result.rows_affected(), customer.id)
    }
}

// The service looks a customer up before writing, so a miss here means the
// row was deleted in between.
fn expect_one_row(rows_affected: u64, id: CustomerId) -> Result<(), RepositoryError> {
    if rows_affected == 0 {
        return Err(RepositoryError::NotFound(id));
    }
    Ok(())
}

fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let first_name: String =
        row.try_get("first_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_name: String =
        row.try_get("last_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let birth_date: String =
        row.try_get("birth_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Customer { id: CustomerId(id), first_name, last_name, birth_date })
}

#[async_trait]
impl CustomerStore for SqlCustomerRepository {
    async fn insert(&self, details: CustomerDetails) -> Result<Customer, StoreError> {
        Ok(self.insert_row(details).await?)
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.fetch_by_id(id).await?)
    }

    async fn find_by_name_prefix(&self, term: &str) -> Result<Vec<Customer>, StoreError> {
        Ok(self.fetch_by_name_prefix(term).await?)
    }

    async fn update(&self, customer: &Customer) -> Result<(), StoreError> {
        Ok(self.update_row(customer).await?)
    }

    async fn remove(&self, customer: &Customer) -> Result<(), StoreError> {
        Ok(self.delete_row(customer).await?)
    }

    async fn save(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use customer_api_core::{CustomerDetails, CustomerId, CustomerService, CustomerStore};

    use super::SqlCustomerRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn details(first: &str, last: &str) -> CustomerDetails {
        CustomerDetails::new(first, last, "01-01-1990")
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids_and_round_trips() {
        let repo = SqlCustomerRepository::new(setup().await);

        let jane = repo.insert(details("jane", "dow")).await.expect("insert jane");
        let john = repo.insert(details("john", "dow")).await.expect("insert john");

        assert!(jane.id.0 > 0);
        assert!(john.id.0 > jane.id.0);

        let found = repo.find_by_id(jane.id).await.expect("find").expect("should exist");
        assert_eq!(found, jane);
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_unknown_id() {
        let repo = SqlCustomerRepository::new(setup().await);

        assert_eq!(repo.find_by_id(CustomerId(404)).await.expect("find"), None);
    }

    #[tokio::test]
    async fn name_prefix_search_is_case_insensitive_and_ordered() {
        let repo = SqlCustomerRepository::new(setup().await);
        repo.insert(details("jane", "dow")).await.expect("insert");
        repo.insert(details("john", "dow")).await.expect("insert");
        repo.insert(details("Émile", "zola")).await.expect("insert");

        let by_first = repo.find_by_name_prefix("JA").await.expect("search");
        assert_eq!(by_first.len(), 1);
        assert_eq!(by_first[0].first_name, "jane");

        let by_last = repo.find_by_name_prefix("DOW").await.expect("search");
        let names: Vec<_> = by_last.iter().map(|c| c.first_name.as_str()).collect();
        assert_eq!(names, ["jane", "john"]);

        let accented = repo.find_by_name_prefix("é").await.expect("search");
        assert_eq!(accented.len(), 1);

        assert!(repo.find_by_name_prefix("%").await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn update_and_remove_modify_the_stored_row() {
        let repo = SqlCustomerRepository::new(setup().await);
        let mut jane = repo.insert(details("jane", "dow")).await.expect("insert");

        jane.first_name = "updated name".to_string();
        repo.update(&jane).await.expect("update");
        let found = repo.find_by_id(jane.id).await.expect("find").expect("exists");
        assert_eq!(found.first_name, "updated name");

        repo.remove(&jane).await.expect("remove");
        assert_eq!(repo.find_by_id(jane.id).await.expect("find"), None);
    }

    #[tokio::test]
    async fn writes_to_a_removed_row_fail() {
        let repo = SqlCustomerRepository::new(setup().await);
        let mut jane = repo.insert(details("jane", "dow")).await.expect("insert");
        repo.remove(&jane).await.expect("remove");

        jane.first_name = "revived".to_string();
        let update = repo.update(&jane).await.expect_err("update of removed row");
        let remove = repo.remove(&jane).await.expect_err("second remove");

        let expected = format!("customer {} is no longer stored", jane.id);
        assert_eq!(update.to_string(), expected);
        assert_eq!(remove.to_string(), expected);
        assert_eq!(repo.find_by_id(jane.id).await.expect("find"), None);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let repo = SqlCustomerRepository::new(setup().await);
        let first = repo.insert(details("jane", "dow")).await.expect("insert");
        repo.remove(&first).await.expect("remove");

        let second = repo.insert(details("john", "dow")).await.expect("insert");

        assert!(second.id.0 > first.id.0);
    }

    #[tokio::test]
    async fn service_lifecycle_against_sqlite() {
        let service = CustomerService::new(SqlCustomerRepository::new(setup().await));

        let added = service
            .add(Some(CustomerDetails::new("jane", "dow", "4/7/1990")))
            .await
            .expect("add");
        assert!(added.id.0 > 0);
        assert_eq!(service.search("ja").await.expect("search"), vec![added.clone()]);

        service
            .update(added.id.0, Some(CustomerDetails::new("updated name", "dow", "4/7/1990")))
            .await
            .expect("update");
        assert_eq!(service.search("dow").await.expect("search")[0].first_name, "updated name");

        service.delete(added.id.0).await.expect("delete");
        assert!(service.search("dow").await.expect("search").is_empty());

        service.close().await;
    }

    #[tokio::test]
    async fn closed_pool_surfaces_database_error() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);
        repo.close().await;

        let error = repo.insert(details("jane", "dow")).await.expect_err("closed pool");

        assert!(error.to_string().starts_with("database error:"), "got: {error}");
    }
}
