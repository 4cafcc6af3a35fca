use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::domain::{
    BookingId, Center, CenterId, Contract, ContractId, ContractStatus, RequestId, RequestOrigin,
    RescheduleRequest, RescheduleStatus, TimeSlot, Tutor, TutorId,
};

/// A contract plus the version stamp the store checks on commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub contract: Contract,
    pub version: u64,
}

impl ContractRecord {
    pub fn view(&self) -> ContractView {
        ContractView {
            contract_id: self.contract.id.clone(),
            child_id: self.contract.child_id.clone(),
            package_id: self.contract.package_id.clone(),
            center_id: self.contract.center_id.clone(),
            status: self.contract.status.label(),
            main_tutor_id: self.contract.main_tutor_id().cloned(),
            start_date: self.contract.start_date,
            end_date: self.contract.end_date,
            is_online: self.contract.is_online,
        }
    }
}

/// A reschedule request plus its version stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub request: RescheduleRequest,
    pub version: u64,
}

impl RequestRecord {
    pub fn view(&self) -> RequestView {
        RequestView {
            request_id: self.request.id.clone(),
            booking_id: self.request.booking_id.clone(),
            contract_id: self.request.contract_id.clone(),
            origin: self.request.origin.label(),
            status: self.request.status.label(),
            reason: self.request.reason.clone(),
            session_start: self.request.session_start(),
            requested_date: self.request.requested_date,
            requested_tutor_id: self.request.requested_tutor_id.clone(),
            resolution_note: self.request.resolution_note.clone(),
            rejected_reason: self.request.rejected_reason.clone(),
        }
    }
}

/// Server-side filter for contract listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractFilter {
    #[serde(default)]
    pub status: Option<ContractStatus>,
}

/// Server-side filter for reschedule-request listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestFilter {
    #[serde(default)]
    pub status: Option<RescheduleStatus>,
    #[serde(default)]
    pub origin: Option<RequestOrigin>,
}

/// Storage abstraction for contract records. `update` is compare-and-swap on
/// the record version: a stale version fails with `Conflict` so two staff
/// actions cannot both commit against the same contract.
pub trait ContractStore: Send + Sync {
    fn insert(&self, contract: Contract) -> Result<ContractRecord, StoreError>;
    fn fetch(&self, id: &ContractId) -> Result<Option<ContractRecord>, StoreError>;
    fn update(&self, record: ContractRecord) -> Result<ContractRecord, StoreError>;
    fn list(&self, filter: &ContractFilter) -> Result<Vec<ContractRecord>, StoreError>;
}

/// Storage abstraction for reschedule requests, with the same CAS contract.
pub trait RescheduleStore: Send + Sync {
    fn insert(&self, request: RescheduleRequest) -> Result<RequestRecord, StoreError>;
    fn fetch(&self, id: &RequestId) -> Result<Option<RequestRecord>, StoreError>;
    fn update(&self, record: RequestRecord) -> Result<RequestRecord, StoreError>;
    fn list(&self, filter: &RequestFilter) -> Result<Vec<RequestRecord>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a concurrent update to this record won the race")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Candidate listing query: either scoped to a center or to online delivery.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CandidateQuery {
    #[serde(default)]
    pub center_id: Option<CenterId>,
    #[serde(default)]
    pub is_online: bool,
}

/// Read access to the tutor roster, plus the center-binding write used by
/// placement. Candidate listings are expected to already exclude tutors with
/// overlapping bookings.
pub trait TutorDirectory: Send + Sync {
    fn tutor(&self, id: &TutorId) -> Result<Option<Tutor>, DirectoryError>;
    fn candidate_tutors(&self, query: &CandidateQuery) -> Result<Vec<Tutor>, DirectoryError>;
    fn available_substitutes(&self, request: &RequestId) -> Result<Vec<Tutor>, DirectoryError>;
    fn unassigned_tutors(&self) -> Result<Vec<Tutor>, DirectoryError>;
    fn bind_center(&self, tutor: &TutorId, center: &CenterId) -> Result<(), DirectoryError>;
}

/// Read access to the center catalog plus the tutor-count bookkeeping write.
pub trait CenterDirectory: Send + Sync {
    fn center(&self, id: &CenterId) -> Result<Option<Center>, DirectoryError>;
    fn centers(&self) -> Result<Vec<Center>, DirectoryError>;
    fn adjust_tutor_count(&self, id: &CenterId, delta: i64) -> Result<(), DirectoryError>;
}

/// Directory collaborator failure (network, upstream 5xx).
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Concrete session change an approval pushes to the booking system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingChange {
    pub booking_id: BookingId,
    pub new_date: NaiveDate,
    pub new_slot: TimeSlot,
    pub new_tutor: Option<TutorId>,
}

/// Outbound calls to the booking system that owns session instances.
pub trait BookingGateway: Send + Sync {
    fn apply_reschedule(&self, change: &BookingChange) -> Result<(), GatewayError>;
    fn cancel_session(&self, booking: &BookingId) -> Result<(), GatewayError>;
}

/// Booking gateway failure.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("booking gateway unavailable: {0}")]
    Unavailable(String),
    #[error("booking gateway rejected the call: {0}")]
    Rejected(String),
}

/// Refund order handed to the wallet collaborator. This core only emits the
/// instruction; money movement happens elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefundInstruction {
    pub booking_id: BookingId,
    pub contract_id: ContractId,
    pub request_id: RequestId,
    pub note: String,
}

/// Outbound hook into the wallet/payment ledger.
pub trait RefundLedger: Send + Sync {
    fn request_refund(&self, instruction: RefundInstruction) -> Result<(), LedgerError>;
}

/// Wallet ledger failure.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("wallet ledger unavailable: {0}")]
    Unavailable(String),
}

/// Contract shape exposed to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct ContractView {
    pub contract_id: ContractId,
    pub child_id: String,
    pub package_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_id: Option<CenterId>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_tutor_id: Option<TutorId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_online: bool,
}

/// Reschedule request shape exposed to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub request_id: RequestId,
    pub booking_id: BookingId,
    pub contract_id: ContractId,
    pub origin: &'static str,
    pub status: &'static str,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_start: Option<NaiveDateTime>,
    pub requested_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_tutor_id: Option<TutorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_reason: Option<String>,
}
