//! JSON responses and error mapping.
//!
//! Error bodies are `{ "error": <text>, "origin": <component> }`. Input faults
//! are 400, everything else 500.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::registry::{RegistryError, WriteOutcome};

/// Handler error.
#[derive(Debug)]
pub enum ApiError {
    Registry(RegistryError),
    /// Body could not be parsed as the expected JSON.
    MalformedBody(String),
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        ApiError::Registry(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Registry(e) if e.is_client_fault() => StatusCode::BAD_REQUEST,
            ApiError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, origin) = match &self {
            ApiError::MalformedBody(text) => (text.clone(), "input"),
            ApiError::Registry(e) => (e.to_string(), e.origin()),
        };

        if status.is_server_error() {
            tracing::error!(%error, origin, "Request failed");
        } else {
            tracing::debug!(%error, origin, "Request rejected");
        }

        (status, Json(json!({ "error": error, "origin": origin }))).into_response()
    }
}

/// `Json` extractor whose rejection uses the gateway's error body.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::MalformedBody(rejection.body_text())),
        }
    }
}

/// Response for a write that reached the chain.
pub fn write_response(outcome: WriteOutcome) -> Response {
    match outcome {
        WriteOutcome::Success { tx_hash } => {
            (StatusCode::OK, Json(json!({ "status": "success", "tx_hash": tx_hash }))).into_response()
        }
        WriteOutcome::Unconfirmed { tx_hash } => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "unconfirmed", "tx_hash": tx_hash })),
        )
            .into_response(),
        WriteOutcome::Reverted { tx_hash } => reverted_response(tx_hash),
    }
}

pub fn reverted_response(tx_hash: alloy::primitives::TxHash) -> Response {
    tracing::warn!(tx_hash = %tx_hash, "Transaction reverted");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "transaction reverted", "tx_hash": tx_hash, "origin": "chain" })),
    )
        .into_response()
}
