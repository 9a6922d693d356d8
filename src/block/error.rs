use crate::orm::block_entries::BlockKind;
use sea_orm::DbErr;
use serde::Serialize;

/// Stable machine-readable error code for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthorized,
    Capacity,
    Conflict,
    Store,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Capacity => "capacity",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Store => "store",
        }
    }
}

/// Block list operation errors.
#[derive(Debug)]
pub enum BlockError {
    /// Malformed value, unsafe pattern or self-targeting
    Validation(String),
    /// Target user or rule does not exist
    NotFound(String),
    /// Credential check failed
    Unauthorized,
    /// Per-kind rule cap reached
    Capacity { kind: BlockKind, cap: u64 },
    /// Rule already exists
    Conflict { kind: BlockKind, value: String },
    /// Underlying database call failed
    Store(DbErr),
}

impl BlockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlockError::Validation(_) => ErrorKind::Validation,
            BlockError::NotFound(_) => ErrorKind::NotFound,
            BlockError::Unauthorized => ErrorKind::Unauthorized,
            BlockError::Capacity { .. } => ErrorKind::Capacity,
            BlockError::Conflict { .. } => ErrorKind::Conflict,
            BlockError::Store(_) => ErrorKind::Store,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        BlockError::Validation(msg.into())
    }
}

impl std::fmt::Display for BlockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockError::Validation(msg) => write!(f, "Invalid rule: {}", msg),
            BlockError::NotFound(msg) => write!(f, "Not found: {}", msg),
            BlockError::Unauthorized => write!(f, "Authentication failed"),
            BlockError::Capacity { kind, cap } => {
                write!(f, "Too many {} rules (limit {})", kind, cap)
            }
            BlockError::Conflict { kind, value } => {
                write!(f, "A {} rule for '{}' already exists", kind, value)
            }
            // Driver messages stay in the log, not in responses.
            BlockError::Store(_) => write!(f, "Block list storage is unavailable"),
        }
    }
}

impl std::error::Error for BlockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlockError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbErr> for BlockError {
    fn from(e: DbErr) -> Self {
        BlockError::Store(e)
    }
}

/// True when a driver error reports a unique constraint violation.
///
/// The driver only exposes the message text, so this matches the wording
/// used by PostgreSQL ("duplicate key value") and SQLite ("UNIQUE constraint").
pub(crate) fn is_unique_violation(e: &DbErr) -> bool {
    let msg = e.to_string();
    msg.contains("duplicate key value") || msg.contains("UNIQUE constraint failed")
}
