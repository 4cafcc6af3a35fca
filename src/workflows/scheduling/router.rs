use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use super::contract::ContractService;
use super::domain::{CenterId, ContractId, RequestId, TutorId};
use super::error::{ErrorKind, SchedulingError};
use super::placement::PlacementService;
use super::repository::{
    BookingGateway, CenterDirectory, ContractFilter, ContractStore, RefundLedger, RequestFilter,
    RescheduleStore, TutorDirectory,
};
use super::reschedule::{RescheduleService, RescheduleSubmission};

fn error_response(err: SchedulingError) -> Response {
    let status = match err.kind() {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Precondition => StatusCode::PRECONDITION_FAILED,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
    };

    let body = Json(json!({
        "kind": err.kind().label(),
        "error": err.to_string(),
    }));
    (status, body).into_response()
}

/// Router builder for contract listing, assignment, and status changes.
pub fn contract_router<C, D>(service: Arc<ContractService<C, D>>) -> Router
where
    C: ContractStore + 'static,
    D: TutorDirectory + 'static,
{
    Router::new()
        .route("/api/v1/contracts", get(list_contracts::<C, D>))
        .route(
            "/api/v1/contracts/:contract_id/candidates",
            get(candidate_tutors::<C, D>),
        )
        .route(
            "/api/v1/contracts/:contract_id/tutors",
            post(assign_tutors::<C, D>),
        )
        .route(
            "/api/v1/contracts/:contract_id/status",
            post(update_status::<C, D>),
        )
        .with_state(service)
}

async fn list_contracts<C, D>(
    State(service): State<Arc<ContractService<C, D>>>,
    Query(filter): Query<ContractFilter>,
) -> Response
where
    C: ContractStore + 'static,
    D: TutorDirectory + 'static,
{
    match service.list(&filter) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.view()).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn candidate_tutors<C, D>(
    State(service): State<Arc<ContractService<C, D>>>,
    Path(contract_id): Path<String>,
) -> Response
where
    C: ContractStore + 'static,
    D: TutorDirectory + 'static,
{
    match service.candidate_tutors(&ContractId(contract_id)) {
        Ok(tutors) => (StatusCode::OK, Json(tutors)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct AssignTutorsRequest {
    #[serde(default)]
    main_tutor_id: Option<TutorId>,
    #[serde(default)]
    substitute1_id: Option<TutorId>,
    #[serde(default)]
    substitute2_id: Option<TutorId>,
}

async fn assign_tutors<C, D>(
    State(service): State<Arc<ContractService<C, D>>>,
    Path(contract_id): Path<String>,
    Json(payload): Json<AssignTutorsRequest>,
) -> Response
where
    C: ContractStore + 'static,
    D: TutorDirectory + 'static,
{
    match service.assign_tutors(
        &ContractId(contract_id),
        payload.main_tutor_id,
        payload.substitute1_id,
        payload.substitute2_id,
    ) {
        Ok(record) => (StatusCode::OK, Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: String,
}

async fn update_status<C, D>(
    State(service): State<Arc<ContractService<C, D>>>,
    Path(contract_id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Response
where
    C: ContractStore + 'static,
    D: TutorDirectory + 'static,
{
    match service.update_status(&ContractId(contract_id), &payload.status) {
        Ok(record) => (StatusCode::OK, Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

/// Router builder for the reschedule approval workflow.
pub fn reschedule_router<R, D, B, W>(service: Arc<RescheduleService<R, D, B, W>>) -> Router
where
    R: RescheduleStore + 'static,
    D: TutorDirectory + 'static,
    B: BookingGateway + 'static,
    W: RefundLedger + 'static,
{
    Router::new()
        .route(
            "/api/v1/reschedules",
            get(list_reschedules::<R, D, B, W>).post(submit_reschedule::<R, D, B, W>),
        )
        .route(
            "/api/v1/reschedules/:request_id/substitutes",
            get(list_substitutes::<R, D, B, W>),
        )
        .route(
            "/api/v1/reschedules/:request_id/approve",
            post(approve_reschedule::<R, D, B, W>),
        )
        .route(
            "/api/v1/reschedules/:request_id/reject",
            post(reject_reschedule::<R, D, B, W>),
        )
        .route(
            "/api/v1/reschedules/:request_id/cancel",
            post(cancel_reschedule::<R, D, B, W>),
        )
        .with_state(service)
}

async fn list_reschedules<R, D, B, W>(
    State(service): State<Arc<RescheduleService<R, D, B, W>>>,
    Query(filter): Query<RequestFilter>,
) -> Response
where
    R: RescheduleStore + 'static,
    D: TutorDirectory + 'static,
    B: BookingGateway + 'static,
    W: RefundLedger + 'static,
{
    match service.list(&filter) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.view()).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn submit_reschedule<R, D, B, W>(
    State(service): State<Arc<RescheduleService<R, D, B, W>>>,
    Json(submission): Json<RescheduleSubmission>,
) -> Response
where
    R: RescheduleStore + 'static,
    D: TutorDirectory + 'static,
    B: BookingGateway + 'static,
    W: RefundLedger + 'static,
{
    match service.submit(submission) {
        Ok(record) => (StatusCode::CREATED, Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_substitutes<R, D, B, W>(
    State(service): State<Arc<RescheduleService<R, D, B, W>>>,
    Path(request_id): Path<String>,
) -> Response
where
    R: RescheduleStore + 'static,
    D: TutorDirectory + 'static,
    B: BookingGateway + 'static,
    W: RefundLedger + 'static,
{
    match service.available_substitutes(&RequestId(request_id)) {
        Ok(tutors) => (StatusCode::OK, Json(tutors)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct ApproveRequest {
    #[serde(default)]
    new_tutor_id: Option<TutorId>,
    #[serde(default)]
    note: Option<String>,
}

async fn approve_reschedule<R, D, B, W>(
    State(service): State<Arc<RescheduleService<R, D, B, W>>>,
    Path(request_id): Path<String>,
    Json(payload): Json<ApproveRequest>,
) -> Response
where
    R: RescheduleStore + 'static,
    D: TutorDirectory + 'static,
    B: BookingGateway + 'static,
    W: RefundLedger + 'static,
{
    let now = Local::now().naive_local();
    match service.approve(
        &RequestId(request_id),
        payload.new_tutor_id,
        payload.note,
        now,
    ) {
        Ok(record) => (StatusCode::OK, Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    reason: String,
}

async fn reject_reschedule<R, D, B, W>(
    State(service): State<Arc<RescheduleService<R, D, B, W>>>,
    Path(request_id): Path<String>,
    Json(payload): Json<RejectRequest>,
) -> Response
where
    R: RescheduleStore + 'static,
    D: TutorDirectory + 'static,
    B: BookingGateway + 'static,
    W: RefundLedger + 'static,
{
    match service.reject(&RequestId(request_id), &payload.reason) {
        Ok(record) => (StatusCode::OK, Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

async fn cancel_reschedule<R, D, B, W>(
    State(service): State<Arc<RescheduleService<R, D, B, W>>>,
    Path(request_id): Path<String>,
) -> Response
where
    R: RescheduleStore + 'static,
    D: TutorDirectory + 'static,
    B: BookingGateway + 'static,
    W: RefundLedger + 'static,
{
    let now = Local::now().naive_local();
    match service.cancel_with_refund(&RequestId(request_id), now) {
        Ok(record) => {
            let body = Json(json!({
                "message": "session cancelled and refund requested",
                "request": record.view(),
            }));
            (StatusCode::OK, body).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// Router builder for tutor-to-center placement.
pub fn placement_router<D, C>(service: Arc<PlacementService<D, C>>) -> Router
where
    D: TutorDirectory + 'static,
    C: CenterDirectory + 'static,
{
    Router::new()
        .route("/api/v1/tutors/unassigned", get(unassigned_tutors::<D, C>))
        .route(
            "/api/v1/tutors/:tutor_id/center-suggestions",
            get(center_suggestions::<D, C>),
        )
        .route(
            "/api/v1/centers/:center_id/tutors",
            post(assign_to_center::<D, C>),
        )
        .with_state(service)
}

async fn unassigned_tutors<D, C>(State(service): State<Arc<PlacementService<D, C>>>) -> Response
where
    D: TutorDirectory + 'static,
    C: CenterDirectory + 'static,
{
    match service.unassigned_tutors() {
        Ok(tutors) => (StatusCode::OK, Json(tutors)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct RadiusQuery {
    #[serde(default = "default_radius_km")]
    radius_km: f64,
}

fn default_radius_km() -> f64 {
    10.0
}

async fn center_suggestions<D, C>(
    State(service): State<Arc<PlacementService<D, C>>>,
    Path(tutor_id): Path<String>,
    Query(query): Query<RadiusQuery>,
) -> Response
where
    D: TutorDirectory + 'static,
    C: CenterDirectory + 'static,
{
    match service.suggest_centers(&TutorId(tutor_id), query.radius_km) {
        Ok(suggestions) => (StatusCode::OK, Json(suggestions)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct AssignToCenterRequest {
    tutor_id: TutorId,
}

async fn assign_to_center<D, C>(
    State(service): State<Arc<PlacementService<D, C>>>,
    Path(center_id): Path<String>,
    Json(payload): Json<AssignToCenterRequest>,
) -> Response
where
    D: TutorDirectory + 'static,
    C: CenterDirectory + 'static,
{
    let center = CenterId(center_id);
    match service.assign(&payload.tutor_id, &center) {
        Ok(()) => {
            let body = Json(json!({
                "message": format!("tutor {} assigned to center {}", payload.tutor_id, center),
            }));
            (StatusCode::OK, body).into_response()
        }
        Err(err) => error_response(err),
    }
}
