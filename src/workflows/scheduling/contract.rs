use std::sync::Arc;

use tracing::info;

use super::assignment::validate_assignment;
use super::domain::{Contract, ContractId, ContractStatus, Tutor, TutorId};
use super::error::SchedulingError;
use super::repository::{
    CandidateQuery, ContractFilter, ContractRecord, ContractStore, TutorDirectory,
};

/// Rejected contract status transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move contract from {} to {}", from.label(), to.label())]
    InvalidTransition {
        from: ContractStatus,
        to: ContractStatus,
    },
    #[error("a main tutor must be assigned before the contract can activate")]
    TutorRequired,
}

/// Check whether `contract` may move to `target`.
///
/// Self-loops are rejected, `unpaid` may only cancel, terminal states are
/// frozen, and activation requires a bound tutor assignment. The check never
/// mutates; callers commit only after it passes.
pub fn check_transition(
    contract: &Contract,
    target: ContractStatus,
) -> Result<(), TransitionError> {
    let from = contract.status;
    if from == target {
        return Err(TransitionError::InvalidTransition { from, to: target });
    }

    match (from, target) {
        (ContractStatus::Pending, ContractStatus::Active) => {
            if contract.tutors.is_some() {
                Ok(())
            } else {
                Err(TransitionError::TutorRequired)
            }
        }
        (ContractStatus::Pending, ContractStatus::Cancelled)
        | (ContractStatus::Active, ContractStatus::Completed)
        | (ContractStatus::Active, ContractStatus::Cancelled)
        | (ContractStatus::Unpaid, ContractStatus::Cancelled) => Ok(()),
        _ => Err(TransitionError::InvalidTransition { from, to: target }),
    }
}

/// Service owning contract listing, tutor assignment, and status changes.
pub struct ContractService<C, D> {
    contracts: Arc<C>,
    directory: Arc<D>,
}

impl<C, D> ContractService<C, D>
where
    C: ContractStore + 'static,
    D: TutorDirectory + 'static,
{
    pub fn new(contracts: Arc<C>, directory: Arc<D>) -> Self {
        Self {
            contracts,
            directory,
        }
    }

    pub fn list(&self, filter: &ContractFilter) -> Result<Vec<ContractRecord>, SchedulingError> {
        Ok(self.contracts.list(filter)?)
    }

    /// Tutors eligible for this contract's center (or for online delivery).
    /// The directory has already excluded tutors with overlapping bookings
    /// and unverified accounts.
    pub fn candidate_tutors(&self, contract_id: &ContractId) -> Result<Vec<Tutor>, SchedulingError> {
        let record = self.fetch(contract_id)?;
        let query = CandidateQuery {
            center_id: record.contract.center_id.clone(),
            is_online: record.contract.is_online,
        };
        Ok(self.directory.candidate_tutors(&query)?)
    }

    /// Bind the main tutor and both substitutes in one all-or-nothing step.
    pub fn assign_tutors(
        &self,
        contract_id: &ContractId,
        main: Option<TutorId>,
        substitute1: Option<TutorId>,
        substitute2: Option<TutorId>,
    ) -> Result<ContractRecord, SchedulingError> {
        let mut record = self.fetch(contract_id)?;

        let assignment =
            validate_assignment(main.as_ref(), substitute1.as_ref(), substitute2.as_ref())?;

        for tutor_id in [
            &assignment.main,
            &assignment.substitute1,
            &assignment.substitute2,
        ] {
            if self.directory.tutor(tutor_id)?.is_none() {
                return Err(SchedulingError::NotFound {
                    entity: "tutor",
                    id: tutor_id.0.clone(),
                });
            }
        }

        record.contract.tutors = Some(assignment);
        let committed = self.contracts.update(record)?;
        info!(
            contract = %contract_id,
            main = %committed.contract.tutors.as_ref().map(|a| a.main.0.as_str()).unwrap_or_default(),
            "tutor assignment committed"
        );
        Ok(committed)
    }

    /// Apply a staff-requested status change. The raw value is parsed
    /// strictly: an unknown status is a validation error here, never a
    /// silent default.
    pub fn update_status(
        &self,
        contract_id: &ContractId,
        raw_status: &str,
    ) -> Result<ContractRecord, SchedulingError> {
        let target = ContractStatus::parse(raw_status)?;
        let mut record = self.fetch(contract_id)?;

        check_transition(&record.contract, target)?;

        record.contract.status = target;
        let committed = self.contracts.update(record)?;
        info!(contract = %contract_id, status = target.label(), "contract status updated");
        Ok(committed)
    }

    fn fetch(&self, contract_id: &ContractId) -> Result<ContractRecord, SchedulingError> {
        self.contracts
            .fetch(contract_id)?
            .ok_or(SchedulingError::NotFound {
                entity: "contract",
                id: contract_id.0.clone(),
            })
    }
}
