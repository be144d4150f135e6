use std::error::Error as StdError;

use thiserror::Error;

use crate::envelope::ApiResponse;

/// Transport-independent status classes. The server maps these onto HTTP
/// status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    InternalError,
    InvalidInput,
    MissingResource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Generic,
    BadRequest,
    NoResultFound,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Generic(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NoResultFound(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn no_result_found(message: impl Into<String>) -> Self {
        Self::NoResultFound(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Generic(_) => ErrorKind::Generic,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::NoResultFound(_) => ErrorKind::NoResultFound,
        }
    }

    pub fn status_class(&self) -> StatusClass {
        match self.kind() {
            ErrorKind::Generic => StatusClass::InternalError,
            ErrorKind::BadRequest => StatusClass::InvalidInput,
            ErrorKind::NoResultFound => StatusClass::MissingResource,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Generic(message) | Self::BadRequest(message) | Self::NoResultFound(message) => {
                message
            }
        }
    }
}

/// Opaque failure raised by a record store. Displays the source error verbatim.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct StoreError(Box<dyn StdError + Send + Sync>);

impl StoreError {
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of boundary error translation: the status class to emit and the
/// failure envelope carrying the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Translation {
    pub status: StatusClass,
    pub body: ApiResponse<()>,
}

impl Translation {
    pub fn from_error(error: &ServiceError) -> Self {
        match error {
            ServiceError::Api(api) => Self::recognized(api),
            ServiceError::Store(store) => Self::unrecognized(store),
        }
    }

    pub fn recognized(error: &ApiError) -> Self {
        Self { status: error.status_class(), body: ApiResponse::failure(error.message()) }
    }

    /// Anything outside the taxonomy surfaces as an internal error with its
    /// message passed through unchanged.
    pub fn unrecognized(error: &(dyn StdError + '_)) -> Self {
        Self { status: StatusClass::InternalError, body: ApiResponse::failure(error.to_string()) }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.body {
            ApiResponse::Failure { message } => Some(message),
            ApiResponse::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::envelope::ApiResponse;
    use crate::errors::{ApiError, ErrorKind, ServiceError, StatusClass, StoreError, Translation};

    #[test]
    fn taxonomy_kinds_map_to_status_classes() {
        let cases = [
            (ApiError::Generic("boom".to_owned()), ErrorKind::Generic, StatusClass::InternalError),
            (ApiError::bad_request("bad"), ErrorKind::BadRequest, StatusClass::InvalidInput),
            (
                ApiError::no_result_found("gone"),
                ErrorKind::NoResultFound,
                StatusClass::MissingResource,
            ),
        ];

        for (error, kind, status) in cases {
            assert_eq!(error.kind(), kind);
            assert_eq!(error.status_class(), status);
        }
    }

    #[test]
    fn display_is_the_bare_message() {
        let error = ApiError::no_result_found("Customer with id 7 not found.");

        assert_eq!(error.to_string(), "Customer with id 7 not found.");
        assert_eq!(error.message(), "Customer with id 7 not found.");
    }

    #[test]
    fn recognized_failure_keeps_status_class_and_message() {
        let translation = Translation::from_error(&ServiceError::from(ApiError::bad_request(
            "Customer's first name cannot be empty.",
        )));

        assert_eq!(translation.status, StatusClass::InvalidInput);
        assert_eq!(
            translation.body,
            ApiResponse::failure("Customer's first name cannot be empty.")
        );
    }

    #[test]
    fn store_failure_is_internal_with_raw_message() {
        let store = StoreError::new(io::Error::new(io::ErrorKind::Other, "disk I/O error"));
        let translation = Translation::from_error(&ServiceError::from(store));

        assert_eq!(translation.status, StatusClass::InternalError);
        assert_eq!(translation.message(), Some("disk I/O error"));
    }

    #[test]
    fn unrecognized_error_is_internal_with_raw_message() {
        let error = io::Error::new(io::ErrorKind::InvalidData, "unexpected end of input");
        let translation = Translation::unrecognized(&error);

        assert_eq!(translation.status, StatusClass::InternalError);
        assert_eq!(translation.message(), Some("unexpected end of input"));
    }
}
