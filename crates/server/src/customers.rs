//! `/api/customers` routes.
//!
//! Extraction never fails a request on its own: an unreadable body is an
//! absent customer, a non-numeric id is id `0`, and a missing search term is
//! the empty term. Validation in the service answers all three.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use customer_api_core::{ApiResponse, Customer, CustomerDetails, CustomerService, CustomerStore};
use serde::Deserialize;

use crate::error::AppError;

pub type SharedCustomerService = Arc<CustomerService<Arc<dyn CustomerStore>>>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    search_term: Option<String>,
}

type CustomerBody = Result<Json<Option<CustomerDetails>>, JsonRejection>;

pub fn router(service: SharedCustomerService) -> Router {
    Router::new()
        .route("/api/customers", get(search_customers).post(add_customer))
        .route("/api/customers/{id}", put(update_customer).delete(delete_customer))
        .with_state(service)
}

async fn search_customers(
    State(service): State<SharedCustomerService>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Customer>>>, AppError> {
    let search_term =
        params.ok().and_then(|Query(params)| params.search_term).unwrap_or_default();
    let customers = service.search(&search_term).await?;
    Ok(Json(ApiResponse::success(customers)))
}

async fn add_customer(
    State(service): State<SharedCustomerService>,
    body: CustomerBody,
) -> Result<Json<ApiResponse<Customer>>, AppError> {
    let customer = service.add(into_details(body)).await?;
    Ok(Json(ApiResponse::success(customer)))
}

async fn update_customer(
    State(service): State<SharedCustomerService>,
    id: Result<Path<i64>, PathRejection>,
    body: CustomerBody,
) -> Result<Json<ApiResponse<Customer>>, AppError> {
    let customer = service.update(into_id(id), into_details(body)).await?;
    Ok(Json(ApiResponse::success(customer)))
}

async fn delete_customer(
    State(service): State<SharedCustomerService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    service.delete(into_id(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn into_details(body: CustomerBody) -> Option<CustomerDetails> {
    body.ok().and_then(|Json(details)| details)
}

fn into_id(id: Result<Path<i64>, PathRejection>) -> i64 {
    id.map(|Path(id)| id).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use customer_api_core::{CustomerService, CustomerStore};
    use customer_api_db::InMemoryCustomerRepository;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::router;

    fn app() -> Router {
        let store: Arc<dyn CustomerStore> = Arc::new(InMemoryCustomerRepository::default());
        router(Arc::new(CustomerService::new(store)))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response =
            app.clone().oneshot(request.body(body).expect("request")).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    fn jane() -> Value {
        json!({"firstName": "jane", "lastName": "dow", "birthDate": "4/7/1990"})
    }

    #[tokio::test]
    async fn add_returns_created_customer_in_success_envelope() {
        let app = app();

        let (status, body) = send(&app, Method::POST, "/api/customers", Some(jane())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["data"]["firstName"], "jane");
        assert_eq!(body["data"]["birthDate"], "4/7/1990");
    }

    #[tokio::test]
    async fn add_without_body_reports_missing_customer() {
        let app = app();

        let (status, body) = send(&app, Method::POST, "/api/customers", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"status": "failure", "message": "Customer cannot be null."}));
    }

    #[tokio::test]
    async fn add_with_blank_field_reports_field_message() {
        let app = app();
        let payload = json!({"firstName": "jane", "lastName": "  ", "birthDate": "4/7/1990"});

        let (status, body) = send(&app, Method::POST, "/api/customers", Some(payload)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Customer's last name cannot be empty.");
    }

    #[tokio::test]
    async fn add_with_null_field_reports_field_message() {
        let app = app();
        let payload = json!({"firstName": null, "lastName": "dow", "birthDate": "4/7/1990"});

        let (status, body) = send(&app, Method::POST, "/api/customers", Some(payload)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Customer's first name cannot be empty.");
    }

    #[tokio::test]
    async fn search_matches_prefix_and_blank_term_is_empty() {
        let app = app();
        send(&app, Method::POST, "/api/customers", Some(jane())).await;

        let (status, body) = send(&app, Method::GET, "/api/customers?searchTerm=JA", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

        let (_, body) = send(&app, Method::GET, "/api/customers?searchTerm=%20", None).await;
        assert_eq!(body, json!({"status": "success", "data": []}));

        let (_, body) = send(&app, Method::GET, "/api/customers", None).await;
        assert_eq!(body, json!({"status": "success", "data": []}));
    }

    #[tokio::test]
    async fn update_overwrites_fields_and_keeps_path_id() {
        let app = app();
        send(&app, Method::POST, "/api/customers", Some(jane())).await;
        let payload =
            json!({"id": 99, "firstName": "updated name", "lastName": "dow", "birthDate": "x"});

        let (status, body) = send(&app, Method::PUT, "/api/customers/1", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["data"]["firstName"], "updated name");
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let app = app();

        let (status, body) = send(&app, Method::PUT, "/api/customers/42", Some(jane())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Customer with id 42 not found.");
    }

    #[tokio::test]
    async fn invalid_ids_are_rejected_before_lookup() {
        let app = app();

        for uri in ["/api/customers/0", "/api/customers/-3", "/api/customers/abc"] {
            let (status, body) = send(&app, Method::DELETE, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "uri {uri}");
            assert_eq!(body["message"], "Customer id is invalid. It should be greater than zero.");
        }
    }

    #[tokio::test]
    async fn delete_returns_no_content_then_not_found() {
        let app = app();
        send(&app, Method::POST, "/api/customers", Some(jane())).await;

        let (status, body) = send(&app, Method::DELETE, "/api/customers/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = send(&app, Method::DELETE, "/api/customers/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Customer with id 1 not found.");
    }
}
