use ulid::Ulid;

use crate::store::StoreError;

/// Terminal outcome of an engine or gate call. The surrounding transport maps
/// each variant to its own status code; nothing here is retried.
#[derive(Debug)]
pub enum EngineError {
    /// A mandatory request field is absent.
    MissingFields(&'static str),
    /// A field is present but outside its domain (bad day name, bad slot,
    /// malformed machine name, inverted interval).
    InvalidValue(&'static str),
    /// Dated request strictly before the current calendar day.
    PastDate,
    /// The requester already holds an active reservation, anywhere.
    DuplicateBooking,
    /// The machine slot or interval is already held.
    SlotTaken,
    NotFound(Ulid),
    /// A unique key (machine name, username, email) is already in use.
    AlreadyExists(&'static str),
    PermissionDenied,
    /// Cancellation attempted with 30 minutes or less of lead time.
    TooLateToCancel { lead_minutes: i64 },
    StoreUnavailable(String),
}

impl EngineError {
    /// Short label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::MissingFields(_) => "missing_fields",
            EngineError::InvalidValue(_) => "invalid_value",
            EngineError::PastDate => "past_date",
            EngineError::DuplicateBooking => "duplicate_booking",
            EngineError::SlotTaken => "slot_taken",
            EngineError::NotFound(_) => "not_found",
            EngineError::AlreadyExists(_) => "already_exists",
            EngineError::PermissionDenied => "permission_denied",
            EngineError::TooLateToCancel { .. } => "too_late_to_cancel",
            EngineError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::MissingFields(fields) => write!(f, "required: {fields}"),
            EngineError::InvalidValue(field) => write!(f, "invalid value: {field}"),
            EngineError::PastDate => write!(f, "requested date is in the past"),
            EngineError::DuplicateBooking => {
                write!(f, "requester already has an active booking")
            }
            EngineError::SlotTaken => write!(f, "slot already reserved"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(key) => write!(f, "{key} must be unique"),
            EngineError::PermissionDenied => write!(f, "permission denied"),
            EngineError::TooLateToCancel { lead_minutes } => write!(
                f,
                "cannot cancel less than 30 minutes before start ({lead_minutes} min left)"
            ),
            EngineError::StoreUnavailable(e) => write!(f, "store unavailable: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Constraint violations reported by the store are the canonical conflict
/// signals; the engine's own pre-checks only reject early.
impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> EngineError {
        match e {
            StoreError::OwnerConflict => EngineError::DuplicateBooking,
            StoreError::SlotConflict => EngineError::SlotTaken,
            StoreError::DuplicateKey(key) => EngineError::AlreadyExists(key),
            StoreError::Unavailable(msg) => EngineError::StoreUnavailable(msg),
        }
    }
}
