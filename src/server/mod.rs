//! HTTP interface
//!
//! Axum router over [`JobAdmissionController`]. Handlers only move data
//! between HTTP and the controller; status mapping lives in [`response`].

pub mod response;

use anyhow::{Context, Result};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::admission::{AccountView, JobAdmissionController, SubmitReview, UpdateAccount};
use crate::error::GatewayError;
use crate::jobs::JobView;
use crate::quota::PlanTier;

pub use response::rate_limit_headers;

type SharedController = Arc<JobAdmissionController>;

/// Query string for `GET /jobs`
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

/// Body for the admin plan change
#[derive(Debug, Deserialize)]
pub struct PlanChange {
    pub plan: PlanTier,
}

/// Build the gateway router
pub fn router(controller: JobAdmissionController) -> Router {
    let admin_enabled = controller.admin_enabled();

    let mut router = Router::new()
        .route("/jobs", post(submit_job).get(list_jobs))
        .route("/jobs/{job_id}", get(get_job))
        .route(
            "/account",
            get(get_account).patch(update_account).delete(delete_account),
        );

    if admin_enabled {
        router = router
            .route("/admin/accounts/{identity}/plan", put(change_plan))
            .route("/admin/billing-period/reset", post(reset_billing_period));
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(controller))
}

/// Serve the gateway until ctrl-c
pub async fn serve(bind_address: &str, controller: JobAdmissionController) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Gateway listening on {}", bind_address);

    axum::serve(listener, router(controller))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Gateway server error")?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
}

fn body_error(rejection: JsonRejection) -> GatewayError {
    GatewayError::InvalidInput(rejection.body_text())
}

async fn submit_job(
    State(controller): State<SharedController>,
    headers: HeaderMap,
    body: Result<Json<SubmitReview>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(body) = body.map_err(body_error)?;
    let admission = controller.submit(authorization(&headers), body).await?;
    Ok((rate_limit_headers(&admission.rate), Json(admission.body())))
}

async fn list_jobs(
    State(controller): State<SharedController>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<JobView>>, GatewayError> {
    let Query(params) = params.map_err(|e| GatewayError::InvalidInput(e.body_text()))?;
    let jobs = controller
        .list_jobs(authorization(&headers), params.limit)
        .await?;
    Ok(Json(jobs))
}

async fn get_job(
    State(controller): State<SharedController>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>, GatewayError> {
    let view = controller
        .get_status(authorization(&headers), &job_id)
        .await?;
    Ok(Json(view))
}

async fn get_account(
    State(controller): State<SharedController>,
    headers: HeaderMap,
) -> Result<Json<AccountView>, GatewayError> {
    Ok(Json(controller.account_view(authorization(&headers)).await?))
}

async fn update_account(
    State(controller): State<SharedController>,
    headers: HeaderMap,
    body: Result<Json<UpdateAccount>, JsonRejection>,
) -> Result<Json<AccountView>, GatewayError> {
    let Json(update) = body.map_err(body_error)?;
    let view = controller
        .update_email(authorization(&headers), update)
        .await?;
    Ok(Json(view))
}

async fn delete_account(
    State(controller): State<SharedController>,
    headers: HeaderMap,
) -> Result<StatusCode, GatewayError> {
    controller.erase_account(authorization(&headers)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn change_plan(
    State(controller): State<SharedController>,
    headers: HeaderMap,
    Path(identity): Path<String>,
    body: Result<Json<PlanChange>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(change) = body.map_err(body_error)?;
    let account = controller
        .change_plan(authorization(&headers), &identity, change.plan)
        .await?;
    Ok(Json(json!({
        "identity": account.identity,
        "usage": account.usage(),
    })))
}

async fn reset_billing_period(
    State(controller): State<SharedController>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let count = controller
        .reset_all_periods(authorization(&headers))
        .await?;
    Ok(Json(json!({ "accountsReset": count })))
}
