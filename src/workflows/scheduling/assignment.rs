use serde::{Deserialize, Serialize};

use super::domain::{TutorAssignment, TutorId};

/// The three roles a contract binds tutors into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentRole {
    Main,
    Substitute1,
    Substitute2,
}

impl AssignmentRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Substitute1 => "substitute1",
            Self::Substitute2 => "substitute2",
        }
    }
}

/// Validation failures for a proposed tutor assignment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("no tutor supplied for the {} role", role.label())]
    IncompleteAssignment { role: AssignmentRole },
    #[error("tutor {tutor} cannot hold both the {} and {} roles", first.label(), second.label())]
    DuplicateTutor {
        tutor: TutorId,
        first: AssignmentRole,
        second: AssignmentRole,
    },
}

/// Check role completeness and pairwise distinctness for a proposed
/// assignment, returning the bound roles on success.
///
/// Availability against overlapping bookings is the candidate directory's
/// concern; by the time ids reach this function the listing has already
/// excluded busy tutors.
pub fn validate_assignment(
    main: Option<&TutorId>,
    substitute1: Option<&TutorId>,
    substitute2: Option<&TutorId>,
) -> Result<TutorAssignment, AssignmentError> {
    let main = require(main, AssignmentRole::Main)?;
    let substitute1 = require(substitute1, AssignmentRole::Substitute1)?;
    let substitute2 = require(substitute2, AssignmentRole::Substitute2)?;

    let roles = [
        (AssignmentRole::Main, main),
        (AssignmentRole::Substitute1, substitute1),
        (AssignmentRole::Substitute2, substitute2),
    ];

    for (index, (first_role, first_id)) in roles.iter().enumerate() {
        for (second_role, second_id) in roles.iter().skip(index + 1) {
            if first_id == second_id {
                return Err(AssignmentError::DuplicateTutor {
                    tutor: (*first_id).clone(),
                    first: *first_role,
                    second: *second_role,
                });
            }
        }
    }

    Ok(TutorAssignment {
        main: main.clone(),
        substitute1: substitute1.clone(),
        substitute2: substitute2.clone(),
    })
}

fn require(
    id: Option<&TutorId>,
    role: AssignmentRole,
) -> Result<&TutorId, AssignmentError> {
    id.ok_or(AssignmentError::IncompleteAssignment { role })
}
