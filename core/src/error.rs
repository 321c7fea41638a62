use thiserror::Error;

/// The desk's error taxonomy. Validation / NotFound / Forbidden /
/// Conflict carry a stable machine-readable `code` so callers can
/// render "need admin" vs "need prior sale" distinctly.
#[derive(Error, Debug)]
pub enum DeskError {
    #[error("validation failed [{code}]: {message}")]
    Validation { code: &'static str, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("forbidden [{code}]: {message}")]
    Forbidden { code: &'static str, message: String },

    #[error("conflict [{code}]: {message}")]
    Conflict { code: &'static str, message: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DeskError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        DeskError::Validation { code, message: message.into() }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DeskError::NotFound { entity, id: id.into() }
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        DeskError::Forbidden { code, message: message.into() }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        DeskError::Conflict { code, message: message.into() }
    }

    /// The reason code, when this is one of the caller-facing variants.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            DeskError::Validation { code, .. }
            | DeskError::Forbidden { code, .. }
            | DeskError::Conflict { code, .. } => Some(code),
            DeskError::NotFound { .. } => Some("not_found"),
            _ => None,
        }
    }

    /// True when the underlying SQLite error is a UNIQUE-constraint
    /// violation (the opportunity-race / duplicate-edge backstops).
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DeskError::Database(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}

pub type DeskResult<T> = Result<T, DeskError>;

/// Reason codes, kept in one place so services and tests agree.
pub mod codes {
    pub const NEED_PRIOR_SALE: &str = "need_prior_sale";
    pub const MAX_OPPORTUNITIES: &str = "max_opportunities";
    pub const OPPORTUNITY_RACE: &str = "opportunity_race";
    pub const OUT_OF_SEQUENCE: &str = "out_of_sequence";
    pub const COMMISSION_LOCKED: &str = "commission_locked";
    pub const COMMISSION_ON_CREATE: &str = "commission_on_create";
    pub const ADMIN_ONLY: &str = "admin_only";
    pub const NOT_OWNER: &str = "not_owner";
    pub const STATUS_TRANSITION: &str = "status_transition";
    pub const TERMINAL_STATUS: &str = "terminal_status";
    pub const DUPLICATE_COSIGNER: &str = "duplicate_cosigner";
    pub const SELF_COSIGNER: &str = "self_cosigner";
    pub const VERSION_MISMATCH: &str = "version_mismatch";
    pub const DATE_WITHOUT_TIME: &str = "date_without_time";
    pub const NOT_SCHEDULED: &str = "not_scheduled";
    pub const RECORDS_EXIST: &str = "records_exist";
    pub const NOT_DELETED: &str = "not_deleted";
    pub const NOT_LOCKED: &str = "not_locked";
    pub const MISSING_FIELD: &str = "missing_field";
}
