//! Scheduling and assignment core for a tutoring marketplace.
//!
//! The crate owns the contract lifecycle state machine, tutor assignment
//! validation, the reschedule approval workflow, and center placement for
//! unassigned tutors. Transport and persistence live behind traits so the
//! same services back the HTTP binary and the tests.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
