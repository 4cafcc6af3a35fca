use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Identifier wrapper for tutoring contracts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId(pub String);

/// Identifier wrapper for tutor accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TutorId(pub String);

/// Identifier wrapper for tutoring centers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CenterId(pub String);

/// Identifier wrapper for reschedule requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// Identifier wrapper for individual session bookings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CenterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a tutoring contract.
///
/// `Unpaid` is only ever set by the external payment flow; this core can move
/// it to `Cancelled` and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Pending,
    Unpaid,
    Active,
    Completed,
    Cancelled,
}

/// Raised when a raw status string does not map onto any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown contract status '{0}'")]
pub struct UnknownStatus(pub String);

impl ContractStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Unpaid => "unpaid",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Strict parse used on operation input, where an unknown value must be a
    /// distinguishable error rather than a silent default.
    pub fn parse(raw: &str) -> Result<Self, UnknownStatus> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "unpaid" => Ok(Self::Unpaid),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(UnknownStatus(raw.trim().to_string())),
        }
    }

    /// Lenient parse used when hydrating records from an external source. An
    /// unrecognized value degrades to `Pending` with a warning so one bad
    /// record does not block a whole listing.
    pub fn normalize_or_default(raw: &str) -> Self {
        match Self::parse(raw) {
            Ok(status) => status,
            Err(UnknownStatus(value)) => {
                warn!(%value, "unrecognized contract status, defaulting to pending");
                Self::Pending
            }
        }
    }
}

/// Daily start/end window a contract's sessions run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// The three tutor roles bound to a contract, filled all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorAssignment {
    pub main: TutorId,
    pub substitute1: TutorId,
    pub substitute2: TutorId,
}

impl TutorAssignment {
    pub fn contains(&self, tutor: &TutorId) -> bool {
        &self.main == tutor || &self.substitute1 == tutor || &self.substitute2 == tutor
    }
}

/// A booked tutoring engagement between a child and a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub child_id: String,
    pub package_id: String,
    pub center_id: Option<CenterId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub is_online: bool,
    pub tutors: Option<TutorAssignment>,
    pub status: ContractStatus,
}

impl Contract {
    pub fn main_tutor_id(&self) -> Option<&TutorId> {
        self.tutors.as_ref().map(|assignment| &assignment.main)
    }

    /// Hydrate a contract from an externally sourced snapshot, normalizing
    /// the loosely typed status field.
    pub fn from_snapshot(snapshot: ContractSnapshot) -> Self {
        let status = ContractStatus::normalize_or_default(&snapshot.status);
        Self {
            id: snapshot.id,
            child_id: snapshot.child_id,
            package_id: snapshot.package_id,
            center_id: snapshot.center_id,
            start_date: snapshot.start_date,
            end_date: snapshot.end_date,
            time_slot: snapshot.time_slot,
            is_online: snapshot.is_online,
            tutors: snapshot.tutors,
            status,
        }
    }
}

/// Raw contract shape as delivered by the upstream booking system, with the
/// status still a free-form string.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractSnapshot {
    pub id: ContractId,
    pub child_id: String,
    pub package_id: String,
    #[serde(default)]
    pub center_id: Option<CenterId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub time_slot: TimeSlot,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub tutors: Option<TutorAssignment>,
    pub status: String,
}

/// Who filed a reschedule request. First-class field; the reason-prefix
/// convention of the previous system survives only as a migration shim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOrigin {
    Parent,
    Tutor,
}

/// Legacy reason prefix that used to mark tutor-originated requests.
pub const LEGACY_TUTOR_PREFIX: &str = "[CHANGE TUTOR]";

impl RequestOrigin {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Tutor => "tutor",
        }
    }

    /// Migration shim: recover the origin from the old free-text convention.
    /// Returns `None` when the reason carries no recognizable marker.
    pub fn from_reason_prefix(reason: &str) -> Option<Self> {
        if reason.trim_start().starts_with(LEGACY_TUTOR_PREFIX) {
            Some(Self::Tutor)
        } else {
            None
        }
    }
}

/// Resolution state of a reschedule request. `Cancelled` is the dedicated
/// terminal state for the no-substitute refund path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl RescheduleStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A petition to move or reassign a single session within a contract.
///
/// The original session fields stay as raw strings: the upstream booking
/// system sends either a combined datetime or separate date and time-of-day
/// values, and an unparseable pair must degrade permissively rather than
/// block staff actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub id: RequestId,
    pub booking_id: BookingId,
    pub contract_id: ContractId,
    pub origin: RequestOrigin,
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
    pub status: RescheduleStatus,
    #[serde(default)]
    pub resolution_note: Option<String>,
    #[serde(default)]
    pub rejected_reason: Option<String>,
}

impl RescheduleRequest {
    /// Best-effort start instant of the original session. `None` when neither
    /// the combined nor the split representation parses.
    pub fn session_start(&self) -> Option<NaiveDateTime> {
        parse_session_start(
            &self.original_session_date,
            self.original_start_time.as_deref(),
        )
    }
}

const COMBINED_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Parse the original session start from a combined datetime string, or from
/// a date string plus a separate time-of-day.
pub fn parse_session_start(date: &str, start_time: Option<&str>) -> Option<NaiveDateTime> {
    let date = date.trim().trim_end_matches('Z');

    for format in COMBINED_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(date, format) {
            return Some(parsed);
        }
    }

    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let raw_time = start_time?.trim();
    for format in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(raw_time, format) {
            return Some(day.and_time(time));
        }
    }

    None
}

/// A physical tutoring center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub id: CenterId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub tutor_count: u32,
}

impl Center {
    pub fn location(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Resolved coordinates for a tutor or a center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Staff-controlled approval state gating center and contract assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    NotVerified,
    Approved,
    Rejected,
}

/// Raised when a raw verification string does not map onto a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown verification status '{0}'")]
pub struct UnknownVerification(pub String);

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotVerified => "not_verified",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a raw verification value. The legacy `active` value is an
    /// accepted synonym for `approved`.
    pub fn parse(raw: &str) -> Result<Self, UnknownVerification> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "not_verified" | "not verified" => Ok(Self::NotVerified),
            "approved" | "active" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownVerification(raw.trim().to_string())),
        }
    }

    pub fn normalize_or_default(raw: &str) -> Self {
        match Self::parse(raw) {
            Ok(status) => status,
            Err(UnknownVerification(value)) => {
                warn!(%value, "unrecognized verification status, treating as not verified");
                Self::NotVerified
            }
        }
    }
}

/// A tutor account as the directory exposes it to this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tutor {
    pub user_id: TutorId,
    pub full_name: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    pub verification: VerificationStatus,
    #[serde(default)]
    pub center_id: Option<CenterId>,
}

impl Tutor {
    /// Hydrate a tutor from an externally sourced snapshot, normalizing the
    /// loosely typed verification field.
    pub fn from_snapshot(snapshot: TutorSnapshot) -> Self {
        let verification = VerificationStatus::normalize_or_default(&snapshot.verification);
        Self {
            user_id: snapshot.user_id,
            full_name: snapshot.full_name,
            location: snapshot.location,
            verification,
            center_id: snapshot.center_id,
        }
    }
}

/// Raw tutor shape as delivered by the account system, with the verification
/// state still a free-form string.
#[derive(Debug, Clone, Deserialize)]
pub struct TutorSnapshot {
    pub user_id: TutorId,
    pub full_name: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    pub verification: String,
    #[serde(default)]
    pub center_id: Option<CenterId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn status_parse_trims_and_lowercases() {
        assert_eq!(
            ContractStatus::parse("  Active "),
            Ok(ContractStatus::Active)
        );
        assert_eq!(
            ContractStatus::parse("COMPLETED"),
            Ok(ContractStatus::Completed)
        );
    }

    #[test]
    fn status_parse_rejects_unknown_values() {
        let err = ContractStatus::parse("archived").expect_err("unknown status");
        assert_eq!(err, UnknownStatus("archived".to_string()));
    }

    #[test]
    fn normalize_defaults_unknown_status_to_pending() {
        assert_eq!(
            ContractStatus::normalize_or_default("archived"),
            ContractStatus::Pending
        );
        assert_eq!(
            ContractStatus::normalize_or_default(" unpaid"),
            ContractStatus::Unpaid
        );
    }

    #[test]
    fn terminal_statuses_are_flagged() {
        assert!(ContractStatus::Completed.is_terminal());
        assert!(ContractStatus::Cancelled.is_terminal());
        assert!(!ContractStatus::Pending.is_terminal());
        assert!(!ContractStatus::Unpaid.is_terminal());
        assert!(!ContractStatus::Active.is_terminal());
    }

    #[test]
    fn legacy_reason_prefix_marks_tutor_origin() {
        assert_eq!(
            RequestOrigin::from_reason_prefix("[CHANGE TUTOR] prefers mornings"),
            Some(RequestOrigin::Tutor)
        );
        assert_eq!(
            RequestOrigin::from_reason_prefix("  [CHANGE TUTOR] clash"),
            Some(RequestOrigin::Tutor)
        );
        assert_eq!(RequestOrigin::from_reason_prefix("family trip"), None);
    }

    #[test]
    fn verification_parse_accepts_legacy_active() {
        assert_eq!(
            VerificationStatus::parse("active"),
            Ok(VerificationStatus::Approved)
        );
        assert_eq!(
            VerificationStatus::parse("Approved"),
            Ok(VerificationStatus::Approved)
        );
        assert!(VerificationStatus::parse("banned").is_err());
    }

    #[test]
    fn session_start_parses_combined_datetime() {
        let parsed = parse_session_start("2026-09-10T14:30:00", None).expect("combined parses");
        assert_eq!(
            parsed,
            NaiveDate::from_ymd_opt(2026, 9, 10)
                .expect("valid date")
                .and_hms_opt(14, 30, 0)
                .expect("valid time")
        );

        assert!(parse_session_start("2026-09-10T14:30:00Z", None).is_some());
        assert!(parse_session_start("2026-09-10 14:30:00", None).is_some());
    }

    #[test]
    fn session_start_parses_split_date_and_time() {
        let parsed =
            parse_session_start("2026-09-10", Some("09:15")).expect("split representation parses");
        assert_eq!(
            parsed,
            NaiveDate::from_ymd_opt(2026, 9, 10)
                .expect("valid date")
                .and_hms_opt(9, 15, 0)
                .expect("valid time")
        );
    }

    #[test]
    fn session_start_is_none_when_nothing_parses() {
        assert!(parse_session_start("next tuesday", Some("morning")).is_none());
        assert!(parse_session_start("2026-09-10", None).is_none());
    }

    #[test]
    fn tutor_snapshot_accepts_the_legacy_active_verification() {
        let snapshot = TutorSnapshot {
            user_id: TutorId("T1".to_string()),
            full_name: "An Nguyen".to_string(),
            location: None,
            verification: "Active".to_string(),
            center_id: None,
        };

        let tutor = Tutor::from_snapshot(snapshot);
        assert_eq!(tutor.verification, VerificationStatus::Approved);

        let snapshot = TutorSnapshot {
            user_id: TutorId("T2".to_string()),
            full_name: "Binh Tran".to_string(),
            location: None,
            verification: "suspended".to_string(),
            center_id: None,
        };
        assert_eq!(
            Tutor::from_snapshot(snapshot).verification,
            VerificationStatus::NotVerified
        );
    }

    #[test]
    fn snapshot_hydration_normalizes_status() {
        let snapshot = ContractSnapshot {
            id: ContractId("c-1".to_string()),
            child_id: "child-1".to_string(),
            package_id: "pkg-1".to_string(),
            center_id: None,
            start_date: NaiveDate::from_ymd_opt(2026, 9, 1).expect("valid date"),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 1).expect("valid date"),
            time_slot: TimeSlot {
                start: NaiveTime::from_hms_opt(16, 0, 0).expect("valid time"),
                end: NaiveTime::from_hms_opt(17, 30, 0).expect("valid time"),
            },
            is_online: true,
            tutors: None,
            status: "ACTIVE??".to_string(),
        };

        let contract = Contract::from_snapshot(snapshot);
        assert_eq!(contract.status, ContractStatus::Pending);
    }
}
