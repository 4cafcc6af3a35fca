use serde::Serialize;

use super::assignment::AssignmentError;
use super::contract::TransitionError;
use super::domain::UnknownStatus;
use super::placement::PlacementError;
use super::repository::{DirectoryError, GatewayError, LedgerError, StoreError};
use super::reschedule::RescheduleError;

/// Coarse classification of a failure, kept separate from the human-readable
/// reason so callers can branch without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Precondition,
    Conflict,
    NotFound,
    Upstream,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Precondition => "precondition",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Upstream => "upstream",
        }
    }
}

/// Composite error surfaced by the scheduling services. Every variant keeps
/// its source's display text as the user-visible reason.
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Reschedule(#[from] RescheduleError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Booking(#[from] GatewayError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl SchedulingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Assignment(_) | Self::UnknownStatus(_) => ErrorKind::Validation,
            Self::Reschedule(RescheduleError::EmptyReason) => ErrorKind::Validation,
            Self::Reschedule(RescheduleError::DuplicateInFlight { .. }) => ErrorKind::Conflict,
            Self::Transition(_) | Self::Reschedule(_) | Self::Placement(_) => {
                ErrorKind::Precondition
            }
            Self::NotFound { .. } | Self::Store(StoreError::NotFound) => ErrorKind::NotFound,
            Self::Store(StoreError::Conflict) => ErrorKind::Conflict,
            Self::Store(StoreError::Unavailable(_))
            | Self::Directory(_)
            | Self::Booking(_)
            | Self::Ledger(_) => ErrorKind::Upstream,
        }
    }
}
