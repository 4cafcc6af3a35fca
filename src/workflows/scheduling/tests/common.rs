use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::workflows::scheduling::contract::ContractService;
use crate::workflows::scheduling::domain::{
    BookingId, Center, CenterId, Contract, ContractId, ContractStatus, GeoPoint, RequestId,
    RequestOrigin, TimeSlot, Tutor, TutorAssignment, TutorId, VerificationStatus,
};
use crate::workflows::scheduling::memory::{
    InMemoryCenterDirectory, InMemoryContractStore, InMemoryRescheduleStore,
    InMemoryTutorDirectory, RecordingBookingGateway, RecordingRefundLedger,
};
use crate::workflows::scheduling::placement::PlacementService;
use crate::workflows::scheduling::repository::{
    BookingChange, BookingGateway, ContractStore, GatewayError, LedgerError, RefundInstruction,
    RefundLedger,
};
use crate::workflows::scheduling::reschedule::{RescheduleService, RescheduleSubmission};

/// Fixed evaluation instant used across the workflow tests.
pub(super) fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 9, 10)
        .expect("valid date")
        .and_hms_opt(8, 0, 0)
        .expect("valid time")
}

pub(super) fn slot() -> TimeSlot {
    TimeSlot {
        start: NaiveTime::from_hms_opt(16, 30, 0).expect("valid time"),
        end: NaiveTime::from_hms_opt(18, 0, 0).expect("valid time"),
    }
}

pub(super) fn tutor(id: &str, verification: VerificationStatus, center: Option<&str>) -> Tutor {
    Tutor {
        user_id: TutorId(id.to_string()),
        full_name: format!("Tutor {id}"),
        location: Some(GeoPoint {
            latitude: 10.78,
            longitude: 106.69,
        }),
        verification,
        center_id: center.map(|center| CenterId(center.to_string())),
    }
}

pub(super) fn roster() -> Vec<Tutor> {
    vec![
        tutor("T1", VerificationStatus::Approved, Some("center-1")),
        tutor("T2", VerificationStatus::Approved, Some("center-1")),
        tutor("T3", VerificationStatus::Approved, Some("center-1")),
        tutor("T4", VerificationStatus::NotVerified, None),
        tutor("T5", VerificationStatus::Rejected, None),
        tutor("T6", VerificationStatus::Approved, None),
    ]
}

pub(super) fn contract(id: &str, status: ContractStatus, assigned: bool) -> Contract {
    Contract {
        id: ContractId(id.to_string()),
        child_id: "child-1".to_string(),
        package_id: "pkg-1".to_string(),
        center_id: Some(CenterId("center-1".to_string())),
        start_date: NaiveDate::from_ymd_opt(2026, 9, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2026, 12, 1).expect("valid date"),
        time_slot: slot(),
        is_online: false,
        tutors: assigned.then(|| TutorAssignment {
            main: TutorId("T1".to_string()),
            substitute1: TutorId("T2".to_string()),
            substitute2: TutorId("T3".to_string()),
        }),
        status,
    }
}

pub(super) type TestContractService = ContractService<InMemoryContractStore, InMemoryTutorDirectory>;

pub(super) fn contract_service() -> (
    Arc<TestContractService>,
    Arc<InMemoryContractStore>,
    Arc<InMemoryTutorDirectory>,
) {
    let store = Arc::new(InMemoryContractStore::default());
    let directory = Arc::new(InMemoryTutorDirectory::with_tutors(roster()));
    let service = Arc::new(ContractService::new(store.clone(), directory.clone()));
    (service, store, directory)
}

pub(super) type TestRescheduleService = RescheduleService<
    InMemoryRescheduleStore,
    InMemoryTutorDirectory,
    RecordingBookingGateway,
    RecordingRefundLedger,
>;

pub(super) struct RescheduleSetup {
    pub(super) service: Arc<TestRescheduleService>,
    pub(super) requests: Arc<InMemoryRescheduleStore>,
    pub(super) directory: Arc<InMemoryTutorDirectory>,
    pub(super) gateway: Arc<RecordingBookingGateway>,
    pub(super) ledger: Arc<RecordingRefundLedger>,
}

pub(super) fn reschedule_setup() -> RescheduleSetup {
    let requests = Arc::new(InMemoryRescheduleStore::default());
    let directory = Arc::new(InMemoryTutorDirectory::with_tutors(roster()));
    let gateway = Arc::new(RecordingBookingGateway::default());
    let ledger = Arc::new(RecordingRefundLedger::default());
    let service = Arc::new(RescheduleService::new(
        requests.clone(),
        directory.clone(),
        gateway.clone(),
        ledger.clone(),
    ));
    RescheduleSetup {
        service,
        requests,
        directory,
        gateway,
        ledger,
    }
}

pub(super) fn submission(id: &str, booking: &str, session: &str) -> RescheduleSubmission {
    RescheduleSubmission {
        id: RequestId(id.to_string()),
        booking_id: BookingId(booking.to_string()),
        contract_id: ContractId("c-1".to_string()),
        origin: Some(RequestOrigin::Parent),
        original_session_date: session.to_string(),
        original_start_time: None,
        original_end_time: None,
        original_tutor_id: Some(TutorId("T1".to_string())),
        requested_date: NaiveDate::from_ymd_opt(2026, 9, 20).expect("valid date"),
        requested_slot: slot(),
        requested_tutor_id: None,
        reason: "family trip".to_string(),
    }
}

/// Submit a pending request and configure its substitute candidate set.
pub(super) fn seeded_request(
    setup: &RescheduleSetup,
    id: &str,
    session: &str,
    substitutes: Vec<&str>,
) -> RequestId {
    let request_id = RequestId(id.to_string());
    setup
        .service
        .submit(submission(id, &format!("booking-{id}"), session))
        .expect("submission accepted");
    setup.directory.set_substitutes(
        request_id.clone(),
        substitutes
            .into_iter()
            .map(|tutor| TutorId(tutor.to_string()))
            .collect(),
    );
    request_id
}

/// A session comfortably outside the four-hour cutoff relative to `now()`.
pub(super) const FAR_SESSION: &str = "2026-09-12T16:30:00";
/// A session two hours after `now()`, inside the cutoff.
pub(super) const NEAR_SESSION: &str = "2026-09-10T10:00:00";

pub(super) struct PlacementSetup {
    pub(super) service: Arc<PlacementService<InMemoryTutorDirectory, InMemoryCenterDirectory>>,
    pub(super) directory: Arc<InMemoryTutorDirectory>,
    pub(super) centers: Arc<InMemoryCenterDirectory>,
}

pub(super) fn center(id: &str, latitude: f64, longitude: f64, tutor_count: u32) -> Center {
    Center {
        id: CenterId(id.to_string()),
        name: format!("Center {id}"),
        latitude,
        longitude,
        tutor_count,
    }
}

pub(super) fn placement_setup() -> PlacementSetup {
    let directory = Arc::new(InMemoryTutorDirectory::with_tutors(roster()));
    let centers = Arc::new(InMemoryCenterDirectory::with_centers(vec![
        center("center-1", 10.7769, 106.7009, 3),
        center("center-2", 10.8231, 106.6297, 1),
        center("center-far", 21.0278, 105.8342, 0),
    ]));
    let service = Arc::new(PlacementService::new(directory.clone(), centers.clone()));
    PlacementSetup {
        service,
        directory,
        centers,
    }
}

pub(super) fn insert_contract(
    store: &InMemoryContractStore,
    contract: Contract,
) -> crate::workflows::scheduling::repository::ContractRecord {
    store.insert(contract).expect("contract inserts")
}

/// Booking gateway that refuses every call, for upstream-failure tests.
pub(super) struct OfflineGateway;

impl BookingGateway for OfflineGateway {
    fn apply_reschedule(&self, _change: &BookingChange) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("booking api offline".to_string()))
    }

    fn cancel_session(&self, _booking: &BookingId) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("booking api offline".to_string()))
    }
}

/// Refund ledger that refuses every call.
pub(super) struct OfflineLedger;

impl RefundLedger for OfflineLedger {
    fn request_refund(&self, _instruction: RefundInstruction) -> Result<(), LedgerError> {
        Err(LedgerError::Unavailable("wallet offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
