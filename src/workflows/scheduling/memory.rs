//! Mutex-guarded in-memory implementations of the store and collaborator
//! traits. The binary serves from these; the tests assert against them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{
    BookingId, Center, CenterId, Contract, ContractId, RequestId, RescheduleRequest, Tutor,
    TutorId,
};
use super::repository::{
    BookingChange, BookingGateway, CandidateQuery, CenterDirectory, ContractFilter,
    ContractRecord, ContractStore, DirectoryError, GatewayError, LedgerError, RefundInstruction,
    RefundLedger, RequestFilter, RequestRecord, RescheduleStore, StoreError, TutorDirectory,
};

#[derive(Default, Clone)]
pub struct InMemoryContractStore {
    records: Arc<Mutex<HashMap<ContractId, ContractRecord>>>,
}

impl ContractStore for InMemoryContractStore {
    fn insert(&self, contract: Contract) -> Result<ContractRecord, StoreError> {
        let mut guard = self.records.lock().expect("contract mutex poisoned");
        if guard.contains_key(&contract.id) {
            return Err(StoreError::Conflict);
        }
        let record = ContractRecord {
            contract,
            version: 1,
        };
        guard.insert(record.contract.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ContractId) -> Result<Option<ContractRecord>, StoreError> {
        let guard = self.records.lock().expect("contract mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, record: ContractRecord) -> Result<ContractRecord, StoreError> {
        let mut guard = self.records.lock().expect("contract mutex poisoned");
        let existing = guard
            .get_mut(&record.contract.id)
            .ok_or(StoreError::NotFound)?;
        if existing.version != record.version {
            return Err(StoreError::Conflict);
        }
        let committed = ContractRecord {
            contract: record.contract,
            version: record.version + 1,
        };
        *existing = committed.clone();
        Ok(committed)
    }

    fn list(&self, filter: &ContractFilter) -> Result<Vec<ContractRecord>, StoreError> {
        let guard = self.records.lock().expect("contract mutex poisoned");
        let mut records: Vec<ContractRecord> = guard
            .values()
            .filter(|record| {
                filter
                    .status
                    .map(|status| record.contract.status == status)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| a.contract.id.0.cmp(&b.contract.id.0));
        Ok(records)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryRescheduleStore {
    records: Arc<Mutex<HashMap<RequestId, RequestRecord>>>,
}

impl RescheduleStore for InMemoryRescheduleStore {
    fn insert(&self, request: RescheduleRequest) -> Result<RequestRecord, StoreError> {
        let mut guard = self.records.lock().expect("request mutex poisoned");
        if guard.contains_key(&request.id) {
            return Err(StoreError::Conflict);
        }
        let record = RequestRecord {
            request,
            version: 1,
        };
        guard.insert(record.request.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<RequestRecord>, StoreError> {
        let guard = self.records.lock().expect("request mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, record: RequestRecord) -> Result<RequestRecord, StoreError> {
        let mut guard = self.records.lock().expect("request mutex poisoned");
        let existing = guard
            .get_mut(&record.request.id)
            .ok_or(StoreError::NotFound)?;
        if existing.version != record.version {
            return Err(StoreError::Conflict);
        }
        let committed = RequestRecord {
            request: record.request,
            version: record.version + 1,
        };
        *existing = committed.clone();
        Ok(committed)
    }

    fn list(&self, filter: &RequestFilter) -> Result<Vec<RequestRecord>, StoreError> {
        let guard = self.records.lock().expect("request mutex poisoned");
        let mut records: Vec<RequestRecord> = guard
            .values()
            .filter(|record| {
                filter
                    .status
                    .map(|status| record.request.status == status)
                    .unwrap_or(true)
                    && filter
                        .origin
                        .map(|origin| record.request.origin == origin)
                        .unwrap_or(true)
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| a.request.id.0.cmp(&b.request.id.0));
        Ok(records)
    }
}

/// Tutor roster backed by maps. Substitute availability per request is
/// configured explicitly, standing in for the upstream overlap query.
#[derive(Default, Clone)]
pub struct InMemoryTutorDirectory {
    tutors: Arc<Mutex<HashMap<TutorId, Tutor>>>,
    substitutes: Arc<Mutex<HashMap<RequestId, Vec<TutorId>>>>,
}

impl InMemoryTutorDirectory {
    pub fn with_tutors(tutors: Vec<Tutor>) -> Self {
        let map = tutors
            .into_iter()
            .map(|tutor| (tutor.user_id.clone(), tutor))
            .collect();
        Self {
            tutors: Arc::new(Mutex::new(map)),
            substitutes: Arc::default(),
        }
    }

    pub fn set_tutor(&self, tutor: Tutor) {
        self.tutors
            .lock()
            .expect("tutor mutex poisoned")
            .insert(tutor.user_id.clone(), tutor);
    }

    pub fn set_substitutes(&self, request: RequestId, tutors: Vec<TutorId>) {
        self.substitutes
            .lock()
            .expect("substitute mutex poisoned")
            .insert(request, tutors);
    }
}

impl TutorDirectory for InMemoryTutorDirectory {
    fn tutor(&self, id: &TutorId) -> Result<Option<Tutor>, DirectoryError> {
        let guard = self.tutors.lock().expect("tutor mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn candidate_tutors(&self, query: &CandidateQuery) -> Result<Vec<Tutor>, DirectoryError> {
        let guard = self.tutors.lock().expect("tutor mutex poisoned");
        let mut candidates: Vec<Tutor> = guard
            .values()
            .filter(|tutor| {
                tutor.verification == super::domain::VerificationStatus::Approved
                    && match (&query.center_id, query.is_online) {
                        (Some(center), _) => tutor.center_id.as_ref() == Some(center),
                        (None, true) => true,
                        (None, false) => false,
                    }
            })
            .cloned()
            .collect();
        candidates.sort_by(|a, b| a.user_id.0.cmp(&b.user_id.0));
        Ok(candidates)
    }

    fn available_substitutes(&self, request: &RequestId) -> Result<Vec<Tutor>, DirectoryError> {
        let ids = self
            .substitutes
            .lock()
            .expect("substitute mutex poisoned")
            .get(request)
            .cloned()
            .unwrap_or_default();
        let guard = self.tutors.lock().expect("tutor mutex poisoned");
        Ok(ids
            .iter()
            .filter_map(|id| guard.get(id).cloned())
            .collect())
    }

    fn unassigned_tutors(&self) -> Result<Vec<Tutor>, DirectoryError> {
        let guard = self.tutors.lock().expect("tutor mutex poisoned");
        let mut unassigned: Vec<Tutor> = guard
            .values()
            .filter(|tutor| tutor.center_id.is_none())
            .cloned()
            .collect();
        unassigned.sort_by(|a, b| a.user_id.0.cmp(&b.user_id.0));
        Ok(unassigned)
    }

    fn bind_center(&self, tutor: &TutorId, center: &CenterId) -> Result<(), DirectoryError> {
        let mut guard = self.tutors.lock().expect("tutor mutex poisoned");
        if let Some(tutor) = guard.get_mut(tutor) {
            tutor.center_id = Some(center.clone());
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCenterDirectory {
    centers: Arc<Mutex<HashMap<CenterId, Center>>>,
}

impl InMemoryCenterDirectory {
    pub fn with_centers(centers: Vec<Center>) -> Self {
        let map = centers
            .into_iter()
            .map(|center| (center.id.clone(), center))
            .collect();
        Self {
            centers: Arc::new(Mutex::new(map)),
        }
    }
}

impl CenterDirectory for InMemoryCenterDirectory {
    fn center(&self, id: &CenterId) -> Result<Option<Center>, DirectoryError> {
        let guard = self.centers.lock().expect("center mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn centers(&self) -> Result<Vec<Center>, DirectoryError> {
        let guard = self.centers.lock().expect("center mutex poisoned");
        let mut centers: Vec<Center> = guard.values().cloned().collect();
        centers.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(centers)
    }

    fn adjust_tutor_count(&self, id: &CenterId, delta: i64) -> Result<(), DirectoryError> {
        let mut guard = self.centers.lock().expect("center mutex poisoned");
        if let Some(center) = guard.get_mut(id) {
            let adjusted = i64::from(center.tutor_count) + delta;
            center.tutor_count = adjusted.max(0) as u32;
        }
        Ok(())
    }
}

/// Booking gateway that records the calls it receives.
#[derive(Default, Clone)]
pub struct RecordingBookingGateway {
    reschedules: Arc<Mutex<Vec<BookingChange>>>,
    cancellations: Arc<Mutex<Vec<BookingId>>>,
}

impl RecordingBookingGateway {
    pub fn reschedules(&self) -> Vec<BookingChange> {
        self.reschedules
            .lock()
            .expect("reschedule mutex poisoned")
            .clone()
    }

    pub fn cancellations(&self) -> Vec<BookingId> {
        self.cancellations
            .lock()
            .expect("cancellation mutex poisoned")
            .clone()
    }
}

impl BookingGateway for RecordingBookingGateway {
    fn apply_reschedule(&self, change: &BookingChange) -> Result<(), GatewayError> {
        self.reschedules
            .lock()
            .expect("reschedule mutex poisoned")
            .push(change.clone());
        Ok(())
    }

    fn cancel_session(&self, booking: &BookingId) -> Result<(), GatewayError> {
        self.cancellations
            .lock()
            .expect("cancellation mutex poisoned")
            .push(booking.clone());
        Ok(())
    }
}

/// Refund ledger that records the instructions it receives.
#[derive(Default, Clone)]
pub struct RecordingRefundLedger {
    instructions: Arc<Mutex<Vec<RefundInstruction>>>,
}

impl RecordingRefundLedger {
    pub fn instructions(&self) -> Vec<RefundInstruction> {
        self.instructions
            .lock()
            .expect("refund mutex poisoned")
            .clone()
    }
}

impl RefundLedger for RecordingRefundLedger {
    fn request_refund(&self, instruction: RefundInstruction) -> Result<(), LedgerError> {
        self.instructions
            .lock()
            .expect("refund mutex poisoned")
            .push(instruction);
        Ok(())
    }
}
