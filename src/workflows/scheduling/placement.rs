use std::sync::Arc;

use tracing::info;

use super::domain::{CenterId, Tutor, TutorId, VerificationStatus};
use super::error::SchedulingError;
use super::geo::{self, CenterDistance};
use super::repository::{CenterDirectory, TutorDirectory};

/// Failures specific to binding a tutor to a center.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("tutor is {} and only approved tutors can be placed", status.label())]
    TutorNotVerified { status: VerificationStatus },
    #[error("tutor is already assigned to center {center}")]
    AlreadyAssigned { center: CenterId },
    #[error("tutor has no coordinates on file; an address must be supplied first")]
    LocationNotSet,
}

/// Service binding unassigned tutors to centers via geo suggestions.
pub struct PlacementService<D, C> {
    tutors: Arc<D>,
    centers: Arc<C>,
}

impl<D, C> PlacementService<D, C>
where
    D: TutorDirectory + 'static,
    C: CenterDirectory + 'static,
{
    pub fn new(tutors: Arc<D>, centers: Arc<C>) -> Self {
        Self { tutors, centers }
    }

    pub fn unassigned_tutors(&self) -> Result<Vec<Tutor>, SchedulingError> {
        Ok(self.tutors.unassigned_tutors()?)
    }

    /// Centers within `radius_km` of the tutor, nearest first. An empty list
    /// means no center is in range; callers typically retry with a wider
    /// radius.
    pub fn suggest_centers(
        &self,
        tutor_id: &TutorId,
        radius_km: f64,
    ) -> Result<Vec<CenterDistance>, SchedulingError> {
        let tutor = self.fetch_tutor(tutor_id)?;
        let origin = tutor.location.ok_or(PlacementError::LocationNotSet)?;
        let centers = self.centers.centers()?;
        Ok(geo::suggest_centers(origin, radius_km, &centers))
    }

    /// Bind a verified tutor to a center, keeping both centers' tutor counts
    /// in step. Rebinding to the current center is rejected.
    pub fn assign(&self, tutor_id: &TutorId, center_id: &CenterId) -> Result<(), SchedulingError> {
        let tutor = self.fetch_tutor(tutor_id)?;

        if tutor.verification != VerificationStatus::Approved {
            return Err(PlacementError::TutorNotVerified {
                status: tutor.verification,
            }
            .into());
        }

        let previous = tutor.center_id.clone();
        if previous.as_ref() == Some(center_id) {
            return Err(PlacementError::AlreadyAssigned {
                center: center_id.clone(),
            }
            .into());
        }

        if self.centers.center(center_id)?.is_none() {
            return Err(SchedulingError::NotFound {
                entity: "center",
                id: center_id.0.clone(),
            });
        }

        self.tutors.bind_center(tutor_id, center_id)?;
        self.centers.adjust_tutor_count(center_id, 1)?;
        if let Some(previous) = previous {
            self.centers.adjust_tutor_count(&previous, -1)?;
        }

        info!(tutor = %tutor_id, center = %center_id, "tutor placed at center");
        Ok(())
    }

    fn fetch_tutor(&self, tutor_id: &TutorId) -> Result<Tutor, SchedulingError> {
        self.tutors
            .tutor(tutor_id)?
            .ok_or(SchedulingError::NotFound {
                entity: "tutor",
                id: tutor_id.0.clone(),
            })
    }
}
