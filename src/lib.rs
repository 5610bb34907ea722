//! Cashbook is the bookkeeping core of a small-business accounting app.
//!
//! It records cash movements in a local SQLite database, links salary
//! payments to employees, and keeps a read-through view of the recent
//! history for a presentation layer to render.
//!
//! The pieces, from the bottom up:
//! - [Store] owns the database connection. Statements run through its
//!   [StatementExecutor] and multi-statement writes are grouped with
//!   [Store::begin].
//! - [LedgerRepository] implements the ledger operations on top of the store.
//! - [HistoryView] and [CashPage] hold what the presentation layer shows.
//! - [backup] copies the database file somewhere safe in the background.

#![warn(missing_docs)]

pub mod backup;
mod cash_page;
mod cash_transaction;
mod database_id;
mod db;
mod employee;
mod format;
mod history;
mod ledger;
mod settings;
mod store;

pub use cash_page::{CashForm, CashPage};
pub use cash_transaction::{CashTransaction, NewCashTransaction, normalize_comment, parse_amount};
pub use database_id::{DatabaseId, EmployeeId, TransactionId};
pub use db::initialize as initialize_db;
pub use employee::Employee;
pub use format::{confirmation_text, format_amount, format_date};
pub use history::{DEFAULT_PREVIEW_SIZE, HistoryMode, HistoryView};
pub use ledger::LedgerRepository;
pub use settings::{Settings, default_input_date, local_today, parse_date_offset};
pub use store::{
    CommitError, Param, ParamValue, ResultCode, Scope, ScopeOutcome, ScopeState,
    StatementExecutor, Store, Table, TableRow, TransactionCoordinator,
};

use rust_decimal::Decimal;

/// Input that was rejected before any statement reached the database.
///
/// The caller should show the message and let the user correct the input.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The sum could not be read as a decimal number.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// No date was selected for the record.
    #[error("a date must be selected")]
    MissingDate,

    /// A salary payment must not be income.
    ///
    /// Salaries are money spent, so they are recorded with a negative sum, or
    /// zero for a trial period.
    #[error("a salary payment must not be positive, got {0}")]
    PositiveSalary(Decimal),

    /// An employee was given an empty name.
    #[error("employee name cannot be empty")]
    EmptyEmployeeName,
}

/// The errors that may occur in the ledger.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller supplied input that fails a precondition.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A write did not apply, or its commit failed. Any open scope has been
    /// rolled back.
    ///
    /// Holds the last error message reported by the database.
    #[error("could not save the record to the database: {0}")]
    WriteFailed(String),

    /// A delete affected no rows, either because the record did not exist or
    /// because the database rejected it.
    #[error("could not delete record {id} from the database: {message}")]
    DeleteFailed {
        /// The ID of the cash operation that was to be deleted.
        id: TransactionId,
        /// The last error message reported by the database, if any.
        message: String,
    },

    /// A query could not be evaluated by the database.
    ///
    /// This is different from a query that matched no rows, which is not an
    /// error.
    #[error("the query could not be evaluated: {0}")]
    QueryUnavailable(String),

    /// A transaction scope was requested while another one is still open.
    #[error("a database transaction is already in progress")]
    ScopeInProgress,

    /// The database could not be opened or initialised.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// A file operation failed, e.g. while copying a backup.
    #[error("file operation failed: {0}")]
    Io(String),
}

/// The broad category of an [Error], for callers that only need to branch on
/// how to present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [Error::Validation].
    Validation,
    /// See [Error::WriteFailed] and [Error::ScopeInProgress].
    Write,
    /// See [Error::DeleteFailed].
    Delete,
    /// See [Error::QueryUnavailable].
    QueryUnavailable,
    /// See [Error::SqlError].
    Store,
    /// See [Error::Io].
    Io,
}

impl Error {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::WriteFailed(_) | Error::ScopeInProgress => ErrorKind::Write,
            Error::DeleteFailed { .. } => ErrorKind::Delete,
            Error::QueryUnavailable(_) => ErrorKind::QueryUnavailable,
            Error::SqlError(_) => ErrorKind::Store,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {}", value);
        Error::SqlError(value)
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::{Error, ErrorKind, ValidationError};

    #[test]
    fn validation_errors_convert_into_error() {
        let error: Error = ValidationError::MissingDate.into();

        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.to_string(), "a date must be selected");
    }

    #[test]
    fn write_error_message_includes_store_message() {
        let error = Error::WriteFailed("FOREIGN KEY constraint failed".to_owned());

        assert_eq!(
            error.to_string(),
            "could not save the record to the database: FOREIGN KEY constraint failed"
        );
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            Error::Validation(ValidationError::PositiveSalary(Decimal::ONE)).kind(),
            Error::WriteFailed(String::new()).kind(),
            Error::DeleteFailed {
                id: 1,
                message: String::new(),
            }
            .kind(),
            Error::QueryUnavailable(String::new()).kind(),
        ];

        assert_eq!(
            kinds,
            [
                ErrorKind::Validation,
                ErrorKind::Write,
                ErrorKind::Delete,
                ErrorKind::QueryUnavailable
            ]
        );
    }
}
