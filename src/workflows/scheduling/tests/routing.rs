use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::scheduling::domain::{ContractStatus, RequestId};
use crate::workflows::scheduling::router::{contract_router, placement_router, reschedule_router};
use serde_json::json;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

/// A session start that stays outside the cutoff no matter when the suite runs.
const FUTURE_SESSION: &str = "2030-01-01T10:00:00";
/// A session start that is always inside the cutoff.
const PAST_SESSION: &str = "2020-01-01T10:00:00";

#[tokio::test]
async fn contract_listing_returns_views() {
    let (service, store, _) = contract_service();
    insert_contract(&store, contract("c-1", ContractStatus::Pending, false));
    insert_contract(&store, contract("c-2", ContractStatus::Active, true));
    let app = contract_router(service);

    let response = app
        .oneshot(get("/api/v1/contracts?status=pending"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    let contracts = body.as_array().expect("array body");
    assert_eq!(contracts.len(), 1);
    assert_eq!(contracts[0]["status"], "pending");
}

#[tokio::test]
async fn unknown_status_maps_to_unprocessable_entity() {
    let (service, store, _) = contract_service();
    insert_contract(&store, contract("c-1", ContractStatus::Pending, false));
    let app = contract_router(service);

    let response = app
        .oneshot(post_json(
            "/api/v1/contracts/c-1/status",
            json!({ "status": "archived" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn blocked_transition_maps_to_precondition_failed() {
    let (service, store, _) = contract_service();
    insert_contract(&store, contract("c-1", ContractStatus::Pending, false));
    let app = contract_router(service);

    let response = app
        .oneshot(post_json(
            "/api/v1/contracts/c-1/status",
            json!({ "status": "active" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);

    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "precondition");
}

#[tokio::test]
async fn missing_contract_maps_to_not_found() {
    let (service, _, _) = contract_service();
    let app = contract_router(service);

    let response = app
        .oneshot(get("/api/v1/contracts/ghost/candidates"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assignment_round_trip_over_http() {
    let (service, store, _) = contract_service();
    insert_contract(&store, contract("c-1", ContractStatus::Pending, false));
    let app = contract_router(service);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/contracts/c-1/tutors",
            json!({
                "main_tutor_id": "T1",
                "substitute1_id": "T2",
                "substitute2_id": "T3",
            }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/api/v1/contracts/c-1/status",
            json!({ "status": "active" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    assert_eq!(body["status"], "active");
}

#[tokio::test]
async fn submission_over_http_is_created() {
    let setup = reschedule_setup();
    let app = reschedule_router(setup.service.clone());

    let response = app
        .oneshot(post_json(
            "/api/v1/reschedules",
            json!({
                "id": "r-1",
                "booking_id": "booking-1",
                "contract_id": "c-1",
                "original_session_date": FUTURE_SESSION,
                "requested_date": "2030-01-05",
                "requested_slot": { "start": "16:30:00", "end": "18:00:00" },
                "reason": "[CHANGE TUTOR] schedule clash",
            }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_json_body(response).await;
    assert_eq!(body["origin"], "tutor");
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn approve_inside_cutoff_maps_to_precondition_failed() {
    let setup = reschedule_setup();
    let id = seeded_request(&setup, "r-1", PAST_SESSION, vec!["T2"]);
    let app = reschedule_router(setup.service.clone());

    let response = app
        .oneshot(post_json(
            &format!("/api/v1/reschedules/{}/approve", id.0),
            json!({}),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);

    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "precondition");
}

#[tokio::test]
async fn cancel_over_http_reports_the_refund() {
    let setup = reschedule_setup();
    let id = seeded_request(&setup, "r-1", FUTURE_SESSION, vec![]);
    let app = reschedule_router(setup.service.clone());

    let response = app
        .oneshot(post_json(
            &format!("/api/v1/reschedules/{}/cancel", id.0),
            json!({}),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    assert_eq!(body["message"], "session cancelled and refund requested");
    assert_eq!(body["request"]["status"], "cancelled");
    assert_eq!(setup.ledger.instructions().len(), 1);
}

#[tokio::test]
async fn duplicate_submission_maps_to_conflict() {
    let setup = reschedule_setup();
    seeded_request(&setup, "r-1", FUTURE_SESSION, vec![]);
    let app = reschedule_router(setup.service.clone());

    let response = app
        .oneshot(post_json(
            "/api/v1/reschedules",
            json!({
                "id": "r-2",
                "booking_id": "booking-r-1",
                "contract_id": "c-1",
                "original_session_date": FUTURE_SESSION,
                "requested_date": "2030-01-05",
                "requested_slot": { "start": "16:30:00", "end": "18:00:00" },
                "reason": "second thoughts",
            }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn substitutes_endpoint_lists_candidates() {
    let setup = reschedule_setup();
    let id = seeded_request(&setup, "r-1", FUTURE_SESSION, vec!["T2", "T3"]);
    let app = reschedule_router(setup.service.clone());

    let response = app
        .oneshot(get(&format!("/api/v1/reschedules/{}/substitutes", id.0)))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    let tutors = body.as_array().expect("array body");
    assert_eq!(tutors.len(), 2);

    let missing = RequestId("ghost".to_string());
    let app = reschedule_router(setup.service.clone());
    let response = app
        .oneshot(get(&format!("/api/v1/reschedules/{}/substitutes", missing.0)))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn placement_routes_cover_suggestion_and_assignment() {
    let setup = placement_setup();
    let app = placement_router(setup.service.clone());

    let response = app
        .clone()
        .oneshot(get(
            "/api/v1/tutors/T6/center-suggestions?radius_km=10",
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let suggestions = body.as_array().expect("array body");
    assert_eq!(suggestions.len(), 2);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/centers/center-2/tutors",
            json!({ "tutor_id": "T6" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/api/v1/centers/center-2/tutors",
            json!({ "tutor_id": "T4" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
}
