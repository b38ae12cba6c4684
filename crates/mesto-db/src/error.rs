use rusqlite::ErrorCode;
use thiserror::Error;

/// Failures surfaced by the store. Constraint violations are classified so
/// callers can tell a duplicate apart from an infrastructure fault.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    Duplicate,

    #[error("referenced record does not exist")]
    MissingReference,

    #[error("database lock poisoned")]
    Poisoned,

    #[error("sqlite: {0}")]
    Sqlite(rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
            if failure.code == ErrorCode::ConstraintViolation {
                match failure.extended_code {
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => return Self::Duplicate,
                    rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::MissingReference,
                    _ => {}
                }
            }
        }
        Self::Sqlite(err)
    }
}
