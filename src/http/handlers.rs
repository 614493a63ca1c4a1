//! Route handlers. Each one translates a request into a registry call and
//! the registry's result into the documented JSON shape.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::http::response::{reverted_response, write_response, ApiError, JsonBody};
use crate::http::server::AppState;
use crate::registry::{SubmitProjectRequest, SubmitReviewRequest, VerifyOutcome, VerifyUserRequest, WriteOutcome};

/// Builders a client scan could not read, comma separated.
pub const X_SKIPPED_BUILDERS: HeaderName = HeaderName::from_static("x-skipped-builders");

const UNCONFIRMED_VERIFICATION: &str = "verification transaction unconfirmed; poll again";

pub async fn verify_user(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<VerifyUserRequest>,
) -> Result<Response, ApiError> {
    let response = match state.registry.verify_user(request).await? {
        VerifyOutcome::Rejected { reason } => {
            (StatusCode::OK, Json(json!({ "verified": false, "reason": reason }))).into_response()
        }
        VerifyOutcome::Submitted(WriteOutcome::Success { tx_hash }) => {
            (StatusCode::OK, Json(json!({ "verified": true, "tx": tx_hash }))).into_response()
        }
        VerifyOutcome::Submitted(WriteOutcome::Unconfirmed { tx_hash }) => (
            StatusCode::ACCEPTED,
            Json(json!({ "verified": false, "tx": tx_hash, "reason": UNCONFIRMED_VERIFICATION })),
        )
            .into_response(),
        VerifyOutcome::Submitted(WriteOutcome::Reverted { tx_hash }) => reverted_response(tx_hash),
    };
    Ok(response)
}

pub async fn submit_project(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SubmitProjectRequest>,
) -> Result<Response, ApiError> {
    let outcome = state.registry.submit_project(request).await?;
    Ok(write_response(outcome))
}

pub async fn submit_review(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SubmitReviewRequest>,
) -> Result<Response, ApiError> {
    let outcome = state.registry.submit_review(request).await?;
    Ok(write_response(outcome))
}

pub async fn get_all_projects(
    State(state): State<AppState>,
    Path(builder): Path<String>,
) -> Result<Response, ApiError> {
    let projects = state.registry.get_projects_for_builder(&builder).await?;
    Ok(Json(json!({ "builder": builder, "projects": projects })).into_response())
}

pub async fn get_projects_for_client(
    State(state): State<AppState>,
    Path(client): Path<String>,
) -> Result<Response, ApiError> {
    let scan = state.registry.get_projects_for_client(&client).await?;

    let mut headers = HeaderMap::new();
    if !scan.skipped.is_empty() {
        let skipped: Vec<&str> = scan.skipped.iter().map(|s| s.builder.as_str()).collect();
        match HeaderValue::from_str(&skipped.join(",")) {
            Ok(value) => {
                headers.insert(X_SKIPPED_BUILDERS, value);
            }
            Err(_) => tracing::warn!(count = skipped.len(), "Skipped builder list is not a valid header value"),
        }
    }

    Ok((headers, Json(scan.projects)).into_response())
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub chain_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_wei: Option<String>,
    pub contract_loaded: bool,
}

/// Liveness plus chain reachability. 503 when the chain or contract is unusable.
pub async fn health(State(state): State<AppState>) -> Response {
    let block_number = match state.chain.get_block_number().await {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the chain");
            None
        }
    };

    let signer = state.registry.signer();
    let balance_wei = match signer {
        Some(address) if block_number.is_some() => match state.chain.get_balance(address).await {
            Ok(balance) => Some(balance.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Health check could not read signer balance");
                None
            }
        },
        _ => None,
    };

    let contract_loaded = state.registry.binding().is_available();
    let healthy = block_number.is_some() && contract_loaded;

    let report = HealthReport {
        status: if healthy { "ok" } else { "degraded" },
        chain_id: state.chain.chain_id(),
        block_number,
        signer: signer.map(|a| a.to_string()),
        balance_wei,
        contract_loaded,
    };
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(report)).into_response()
}
