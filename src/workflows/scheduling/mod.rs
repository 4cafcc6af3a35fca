//! Contract lifecycle, tutor assignment, reschedule approval, and center
//! placement for the tutoring marketplace.
//!
//! Each operation validates its preconditions before touching shared state
//! and commits through a version-checked store update, so a failed check or
//! a lost race never leaves a partial mutation behind.

pub mod assignment;
pub mod contract;
pub mod domain;
pub mod error;
pub mod geo;
pub mod memory;
pub mod placement;
pub mod repository;
pub mod reschedule;
pub mod router;

#[cfg(test)]
mod tests;

pub use assignment::{validate_assignment, AssignmentError, AssignmentRole};
pub use contract::{check_transition, ContractService, TransitionError};
pub use domain::{
    BookingId, Center, CenterId, Contract, ContractId, ContractSnapshot, ContractStatus, GeoPoint,
    RequestId, RequestOrigin, RescheduleRequest, RescheduleStatus, TimeSlot, Tutor,
    TutorAssignment, TutorId, TutorSnapshot, UnknownStatus, VerificationStatus,
};
pub use error::{ErrorKind, SchedulingError};
pub use geo::{haversine_km, suggest_centers, CenterDistance};
pub use memory::{
    InMemoryCenterDirectory, InMemoryContractStore, InMemoryRescheduleStore,
    InMemoryTutorDirectory, RecordingBookingGateway, RecordingRefundLedger,
};
pub use placement::{PlacementError, PlacementService};
pub use repository::{
    BookingChange, BookingGateway, CandidateQuery, CenterDirectory, ContractFilter,
    ContractRecord, ContractStore, ContractView, DirectoryError, GatewayError, LedgerError,
    RefundInstruction, RefundLedger, RequestFilter, RequestRecord, RequestView, RescheduleStore,
    StoreError, TutorDirectory,
};
pub use reschedule::{
    is_within_cutoff, RescheduleError, RescheduleService, RescheduleSubmission, CUTOFF_HOURS,
};
pub use router::{contract_router, placement_router, reschedule_router};
