//! Write-time checks for customer input. Each check stops at the first
//! violated rule.

use crate::domain::customer::CustomerDetails;
use crate::errors::ApiError;

pub const CUSTOMER_MISSING: &str = "Customer cannot be null.";
pub const FIRST_NAME_EMPTY: &str = "Customer's first name cannot be empty.";
pub const LAST_NAME_EMPTY: &str = "Customer's last name cannot be empty.";
pub const BIRTH_DATE_EMPTY: &str = "Customer's birth date cannot be empty.";
pub const CUSTOMER_ID_INVALID: &str = "Customer id is invalid. It should be greater than zero.";

/// `birth_date` is only checked for presence; its format is not validated.
pub fn validate_customer_details(customer: Option<&CustomerDetails>) -> Result<(), ApiError> {
    let customer = customer.ok_or_else(|| ApiError::bad_request(CUSTOMER_MISSING))?;

    if is_blank(&customer.first_name) {
        return Err(ApiError::bad_request(FIRST_NAME_EMPTY));
    }
    if is_blank(&customer.last_name) {
        return Err(ApiError::bad_request(LAST_NAME_EMPTY));
    }
    if is_blank(&customer.birth_date) {
        return Err(ApiError::bad_request(BIRTH_DATE_EMPTY));
    }

    Ok(())
}

pub fn validate_customer_id(id: i64) -> Result<(), ApiError> {
    if id <= 0 {
        return Err(ApiError::bad_request(CUSTOMER_ID_INVALID));
    }
    Ok(())
}

pub fn validate_update_request(
    id: i64,
    customer: Option<&CustomerDetails>,
) -> Result<(), ApiError> {
    validate_customer_id(id)?;
    validate_customer_details(customer)
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
