use serde::Serialize;
use thiserror::Error;

/// SQLite primary result codes that mean another writer holds the lock.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Error, Debug)]
pub enum TasklineError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid priority {0}: priority must be greater than zero")]
    InvalidPriority(i64),

    #[error("Lock contention for owner '{0}', retry later")]
    LockContention(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<sqlx::Error> for TasklineError {
    fn from(err: sqlx::Error) -> Self {
        if is_busy(&err) {
            TasklineError::LockContention("*".to_string())
        } else {
            TasklineError::DatabaseError(err)
        }
    }
}

/// SQLite reports extended result codes; the low byte is the primary code.
fn is_busy(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };

    db_err
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub retryable: bool,
}

impl TasklineError {
    pub fn to_error_code(&self) -> &'static str {
        match self {
            TasklineError::TaskNotFound(_) => "TASK_NOT_FOUND",
            TasklineError::InvalidInput(_) => "INVALID_INPUT",
            TasklineError::InvalidPriority(_) => "INVALID_PRIORITY",
            TasklineError::LockContention(_) => "LOCK_CONTENTION",
            TasklineError::DatabaseError(_) | TasklineError::StorageFailure(_) => {
                "STORAGE_FAILURE"
            },
            _ => "INTERNAL_ERROR",
        }
    }

    /// Only contention is worth retrying; everything else fails the same way twice.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TasklineError::LockContention(_))
    }

    /// Attach the owner whose lock could not be taken.
    pub(crate) fn for_owner(self, owner: &str) -> Self {
        match self {
            TasklineError::LockContention(_) => TasklineError::LockContention(owner.to_string()),
            other => other,
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.to_error_code().to_string(),
            retryable: self.is_retryable(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TasklineError>;
