pub mod config;
pub mod domain;
pub mod envelope;
pub mod errors;
pub mod service;
pub mod validation;

pub use domain::customer::{Customer, CustomerDetails, CustomerId};
pub use envelope::ApiResponse;
pub use errors::{ApiError, ErrorKind, ServiceError, StatusClass, StoreError, Translation};
pub use service::{CustomerService, CustomerStore};
