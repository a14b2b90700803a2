use thiserror::Error;

#[derive(Debug, Error)]
pub enum CareError {
    #[error("not initialized: run 'mindcare init'")]
    NotInitialized,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("appointment not found: {0}")]
    AppointmentNotFound(String),

    #[error("counsellor not found: {0}")]
    CounsellorNotFound(String),

    #[error("counsellor profile not found for user {0}")]
    CounsellorProfileMissing(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("institution not found: {0}")]
    InstitutionNotFound(String),

    #[error("institution already exists for domain: {0}")]
    InstitutionExists(String),

    #[error("time slot is already booked: {date} {slot} for counsellor {counsellor}")]
    SlotTaken {
        counsellor: String,
        date: String,
        slot: String,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("invalid screening tool: {0}")]
    InvalidTool(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CareError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        CareError::Unauthorized(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        CareError::InvalidState(msg.into())
    }
}

// redb reports one error type per API layer; they all surface as `Store`.
macro_rules! store_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CareError {
                fn from(e: $ty) -> Self {
                    CareError::Store(e.to_string())
                }
            }
        )*
    };
}

store_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

pub type Result<T> = std::result::Result<T, CareError>;
