use super::{ApiError, ApiState, RequestActor};
use crate::core::{StatusHistoryEntry, Status, TechnicianId, Ticket, TicketId};
use crate::engine::WorkloadReport;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTicketRequest {
    pub ticket_id: TicketId,
    pub technician_id: TechnicianId,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTicketRequest {
    pub ticket_id: TicketId,
    pub status: Status,
    pub resolution_notes: String,
    #[serde(default)]
    pub time_spent_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionTicketRequest {
    pub ticket_id: TicketId,
    pub status: Status,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateTicketRequest {
    pub ticket_id: TicketId,
    pub rating: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub ticket_id: TicketId,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub ticket: Ticket,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub ticket_id: TicketId,
    pub entries: Vec<StatusHistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn assign_ticket(
    State(state): State<Arc<ApiState>>,
    RequestActor(actor): RequestActor,
    payload: Result<Json<AssignTicketRequest>, JsonRejection>,
) -> ApiResult<TicketResponse> {
    let Json(request) = payload?;
    debug!("assign-ticket {} -> {}", request.ticket_id, request.technician_id);
    let ticket = state
        .engine
        .assign(
            &request.ticket_id,
            &request.technician_id,
            &actor,
            request.reason.as_deref(),
        )
        .await?;
    Ok(Json(TicketResponse { ticket }))
}

pub async fn complete_ticket(
    State(state): State<Arc<ApiState>>,
    RequestActor(actor): RequestActor,
    payload: Result<Json<CompleteTicketRequest>, JsonRejection>,
) -> ApiResult<TicketResponse> {
    let Json(request) = payload?;
    debug!("complete-ticket {} as {}", request.ticket_id, request.status);
    let ticket = state
        .engine
        .complete(
            &request.ticket_id,
            &actor,
            request.status,
            &request.resolution_notes,
            request.time_spent_hours,
        )
        .await?;
    Ok(Json(TicketResponse { ticket }))
}

pub async fn transition_ticket(
    State(state): State<Arc<ApiState>>,
    RequestActor(actor): RequestActor,
    payload: Result<Json<TransitionTicketRequest>, JsonRejection>,
) -> ApiResult<TicketResponse> {
    let Json(request) = payload?;
    let ticket = state
        .engine
        .transition(
            &request.ticket_id,
            &actor,
            request.status,
            request.reason.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(TicketResponse { ticket }))
}

pub async fn rate_ticket(
    State(state): State<Arc<ApiState>>,
    RequestActor(actor): RequestActor,
    payload: Result<Json<RateTicketRequest>, JsonRejection>,
) -> ApiResult<TicketResponse> {
    let Json(request) = payload?;
    let ticket = state
        .engine
        .record_rating(&request.ticket_id, &actor, request.rating)
        .await?;
    Ok(Json(TicketResponse { ticket }))
}

pub async fn ticket_status_history(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<HistoryResponse> {
    let Query(query) = query?;
    let entries = state.engine.status_history(&query.ticket_id).await?;
    Ok(Json(HistoryResponse {
        ticket_id: query.ticket_id,
        entries,
    }))
}

pub async fn technician_workload(State(state): State<Arc<ApiState>>) -> ApiResult<WorkloadReport> {
    Ok(Json(state.engine.workload().await?))
}
