use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{info, warn};

use super::domain::{
    BookingId, ContractId, RequestId, RequestOrigin, RescheduleRequest, RescheduleStatus, TimeSlot,
    Tutor, TutorId,
};
use super::error::SchedulingError;
use super::repository::{
    BookingChange, BookingGateway, RefundInstruction, RefundLedger, RequestFilter, RequestRecord,
    RescheduleStore, TutorDirectory,
};

/// Mutations against a session are blocked once its start is this close.
pub const CUTOFF_HOURS: i64 = 4;

/// Failures specific to the reschedule workflow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RescheduleError {
    #[error("request is already {}", status.label())]
    AlreadyResolved { status: RescheduleStatus },
    #[error("the original session starts within the {CUTOFF_HOURS}-hour cutoff")]
    TooLateToReschedule,
    #[error("a rejection requires a non-empty reason")]
    EmptyReason,
    #[error("booking {booking} already has a pending reschedule request")]
    DuplicateInFlight { booking: BookingId },
    #[error("no substitute tutor is available for this request")]
    NoSubstituteAvailable,
    #[error("{count} substitute tutor(s) are still available; cancellation with refund applies only when none are")]
    SubstitutesAvailable { count: usize },
    #[error("tutor {tutor} is not in the available substitute set for this request")]
    SubstituteNotCandidate { tutor: TutorId },
}

/// True when the request's original session starts within the cutoff window
/// of `now`. Unparseable session times are permissive: the action proceeds
/// and the gap is logged rather than blocking staff.
pub fn is_within_cutoff(request: &RescheduleRequest, now: NaiveDateTime) -> bool {
    match request.session_start() {
        Some(start) => start - now <= Duration::hours(CUTOFF_HOURS),
        None => {
            warn!(
                request = %request.id,
                date = %request.original_session_date,
                "original session time unparseable, skipping cutoff check"
            );
            false
        }
    }
}

/// Inbound shape for a new reschedule request. The origin is first-class;
/// when a legacy client omits it, the old reason-prefix convention is
/// consulted before falling back to `parent`.
#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleSubmission {
    pub id: RequestId,
    pub booking_id: BookingId,
    pub contract_id: ContractId,
    #[serde(default)]
    pub origin: Option<RequestOrigin>,
    pub original_session_date: String,
    #[serde(default)]
    pub original_start_time: Option<String>,
    #[serde(default)]
    pub original_end_time: Option<String>,
    #[serde(default)]
    pub original_tutor_id: Option<TutorId>,
    pub requested_date: NaiveDate,
    pub requested_slot: TimeSlot,
    #[serde(default)]
    pub requested_tutor_id: Option<TutorId>,
    pub reason: String,
}

/// Service owning the reschedule-request lifecycle.
pub struct RescheduleService<R, D, B, W> {
    requests: Arc<R>,
    directory: Arc<D>,
    bookings: Arc<B>,
    wallet: Arc<W>,
}

impl<R, D, B, W> RescheduleService<R, D, B, W>
where
    R: RescheduleStore + 'static,
    D: TutorDirectory + 'static,
    B: BookingGateway + 'static,
    W: RefundLedger + 'static,
{
    pub fn new(requests: Arc<R>, directory: Arc<D>, bookings: Arc<B>, wallet: Arc<W>) -> Self {
        Self {
            requests,
            directory,
            bookings,
            wallet,
        }
    }

    pub fn list(&self, filter: &RequestFilter) -> Result<Vec<RequestRecord>, SchedulingError> {
        Ok(self.requests.list(filter)?)
    }

    /// Record a new pending request. Rejects a second in-flight request for
    /// the same booking.
    pub fn submit(
        &self,
        submission: RescheduleSubmission,
    ) -> Result<RequestRecord, SchedulingError> {
        let pending = self.requests.list(&RequestFilter {
            status: Some(RescheduleStatus::Pending),
            origin: None,
        })?;
        if pending
            .iter()
            .any(|record| record.request.booking_id == submission.booking_id)
        {
            return Err(RescheduleError::DuplicateInFlight {
                booking: submission.booking_id,
            }
            .into());
        }

        let origin = submission
            .origin
            .or_else(|| RequestOrigin::from_reason_prefix(&submission.reason))
            .unwrap_or(RequestOrigin::Parent);

        let request = RescheduleRequest {
            id: submission.id,
            booking_id: submission.booking_id,
            contract_id: submission.contract_id,
            origin,
            original_session_date: submission.original_session_date,
            original_start_time: submission.original_start_time,
            original_end_time: submission.original_end_time,
            original_tutor_id: submission.original_tutor_id,
            requested_date: submission.requested_date,
            requested_slot: submission.requested_slot,
            requested_tutor_id: submission.requested_tutor_id,
            reason: submission.reason,
            status: RescheduleStatus::Pending,
            resolution_note: None,
            rejected_reason: None,
        };

        let record = self.requests.insert(request)?;
        info!(request = %record.request.id, origin = origin.label(), "reschedule request submitted");
        Ok(record)
    }

    /// Substitute tutors the directory considers available for this request.
    pub fn available_substitutes(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<Tutor>, SchedulingError> {
        self.fetch(request_id)?;
        Ok(self.directory.available_substitutes(request_id)?)
    }

    /// Approve a pending request, optionally substituting a tutor. The
    /// booking change is pushed to the booking system before the approval is
    /// committed, so an upstream failure leaves the request untouched.
    pub fn approve(
        &self,
        request_id: &RequestId,
        new_tutor: Option<TutorId>,
        note: Option<String>,
        now: NaiveDateTime,
    ) -> Result<RequestRecord, SchedulingError> {
        let mut record = self.fetch(request_id)?;
        self.ensure_pending(&record)?;

        if is_within_cutoff(&record.request, now) {
            return Err(RescheduleError::TooLateToReschedule.into());
        }

        let candidates = self.directory.available_substitutes(request_id)?;
        if candidates.is_empty() {
            return Err(RescheduleError::NoSubstituteAvailable.into());
        }
        if let Some(tutor) = &new_tutor {
            if !candidates
                .iter()
                .any(|candidate| &candidate.user_id == tutor)
            {
                return Err(RescheduleError::SubstituteNotCandidate {
                    tutor: tutor.clone(),
                }
                .into());
            }
        }

        let change = BookingChange {
            booking_id: record.request.booking_id.clone(),
            new_date: record.request.requested_date,
            new_slot: record.request.requested_slot,
            new_tutor: new_tutor.clone(),
        };
        self.bookings.apply_reschedule(&change)?;

        record.request.status = RescheduleStatus::Approved;
        record.request.resolution_note = note;
        let committed = self.requests.update(record)?;
        info!(
            request = %request_id,
            substituted = new_tutor.is_some(),
            "reschedule request approved"
        );
        Ok(committed)
    }

    /// Reject a pending request with a mandatory reason. Exempt from the
    /// cutoff: staff may decline at any time.
    pub fn reject(
        &self,
        request_id: &RequestId,
        reason: &str,
    ) -> Result<RequestRecord, SchedulingError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(RescheduleError::EmptyReason.into());
        }

        let mut record = self.fetch(request_id)?;
        self.ensure_pending(&record)?;

        record.request.status = RescheduleStatus::Rejected;
        record.request.rejected_reason = Some(reason.to_string());
        let committed = self.requests.update(record)?;
        info!(request = %request_id, "reschedule request rejected");
        Ok(committed)
    }

    /// Cancel the underlying session and emit one refund instruction. Only
    /// permitted when the substitute candidate set is empty.
    pub fn cancel_with_refund(
        &self,
        request_id: &RequestId,
        now: NaiveDateTime,
    ) -> Result<RequestRecord, SchedulingError> {
        let mut record = self.fetch(request_id)?;
        self.ensure_pending(&record)?;

        if is_within_cutoff(&record.request, now) {
            return Err(RescheduleError::TooLateToReschedule.into());
        }

        let candidates = self.directory.available_substitutes(request_id)?;
        if !candidates.is_empty() {
            return Err(RescheduleError::SubstitutesAvailable {
                count: candidates.len(),
            }
            .into());
        }

        self.bookings.cancel_session(&record.request.booking_id)?;
        self.wallet.request_refund(RefundInstruction {
            booking_id: record.request.booking_id.clone(),
            contract_id: record.request.contract_id.clone(),
            request_id: record.request.id.clone(),
            note: "session cancelled: no substitute tutor available".to_string(),
        })?;

        record.request.status = RescheduleStatus::Cancelled;
        record.request.resolution_note =
            Some("session cancelled with refund; no substitute available".to_string());
        let committed = self.requests.update(record)?;
        info!(request = %request_id, "session cancelled with refund");
        Ok(committed)
    }

    fn fetch(&self, request_id: &RequestId) -> Result<RequestRecord, SchedulingError> {
        self.requests
            .fetch(request_id)?
            .ok_or(SchedulingError::NotFound {
                entity: "reschedule request",
                id: request_id.0.clone(),
            })
    }

    fn ensure_pending(&self, record: &RequestRecord) -> Result<(), SchedulingError> {
        if record.request.status.is_terminal() {
            return Err(RescheduleError::AlreadyResolved {
                status: record.request.status,
            }
            .into());
        }
        Ok(())
    }
}
