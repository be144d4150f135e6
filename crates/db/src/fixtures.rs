//! Demo customers for local runs and smoke checks.
//!
//! Loading goes through [`CustomerService`] so the usual validation applies.
//! A customer already present with identical fields is not inserted twice.

use customer_api_core::{Customer, CustomerDetails, CustomerService, CustomerStore, ServiceError};

const DEMO_CUSTOMERS: &[(&str, &str, &str)] =
    &[("jane", "dow", "4/7/1990"), ("john", "dow", "4/6/1991")];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: Vec<Customer>,
    pub already_present: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

pub struct DemoDataset;

impl DemoDataset {
    pub fn customers() -> Vec<CustomerDetails> {
        DEMO_CUSTOMERS
            .iter()
            .map(|(first, last, birth)| CustomerDetails::new(*first, *last, *birth))
            .collect()
    }

    pub async fn load<S: CustomerStore>(
        service: &CustomerService<S>,
    ) -> Result<SeedResult, ServiceError> {
        let mut inserted = Vec::new();
        let mut already_present = 0;

        for details in Self::customers() {
            if find_exact(service, &details).await?.is_some() {
                already_present += 1;
                continue;
            }
            inserted.push(service.add(Some(details)).await?);
        }

        Ok(SeedResult { inserted, already_present })
    }

    pub async fn verify<S: CustomerStore>(
        service: &CustomerService<S>,
    ) -> Result<VerificationResult, ServiceError> {
        let mut checks = Vec::new();
        for details in Self::customers() {
            let present = find_exact(service, &details).await?.is_some();
            checks.push((format!("{} {}", details.first_name, details.last_name), present));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

async fn find_exact<S: CustomerStore>(
    service: &CustomerService<S>,
    details: &CustomerDetails,
) -> Result<Option<Customer>, ServiceError> {
    let candidates = service.search(&details.first_name).await?;
    Ok(candidates.into_iter().find(|customer| {
        customer.first_name == details.first_name
            && customer.last_name == details.last_name
            && customer.birth_date == details.birth_date
    }))
}
