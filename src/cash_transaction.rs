//! Defines the cash operation model, the validation of new records and the
//! cash operations table.

use std::str::FromStr;

use rusqlite::{
    Connection,
    types::{FromSqlError, FromSqlResult, ValueRef},
};
use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, macros::format_description};

use crate::{
    ValidationError,
    database_id::{EmployeeId, TransactionId},
    store::TableRow,
};

// ============================================================================
// MODELS
// ============================================================================

/// A ledger entry: money that came in or went out on a given day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashTransaction {
    /// The ID assigned by the database on insert.
    pub id: TransactionId,
    /// The day the money moved.
    pub date: Date,
    /// Positive for income, negative for expenses. Salary payments are
    /// negative.
    pub sum: Decimal,
    /// An optional note. Never `Some("")`.
    pub comment: Option<String>,
    /// The name of the employee this operation paid, if it is a salary
    /// payment.
    pub employee_full_name: Option<String>,
}

/// A cash operation that passed validation and may be written to the
/// database.
///
/// To create one from user input, use [NewCashTransaction::validate].
#[derive(Debug, Clone, PartialEq)]
pub struct NewCashTransaction {
    /// The day the money moved.
    pub date: Date,
    /// The signed amount.
    pub sum: Decimal,
    /// The note, `None` if the user left it empty.
    pub comment: Option<String>,
    /// The employee to post this operation to as salary.
    pub employee_id: Option<EmployeeId>,
}

impl NewCashTransaction {
    /// Check the raw input of the cash page and convert it into a record.
    ///
    /// # Errors
    /// Returns a:
    /// - [ValidationError::MissingDate] if no date was selected,
    /// - [ValidationError::InvalidAmount] if `sum` is not a decimal number,
    /// - or [ValidationError::PositiveSalary] if `employee_id` is set and the
    ///   sum is greater than zero.
    pub fn validate(
        date: Option<Date>,
        sum: &str,
        comment: &str,
        employee_id: Option<EmployeeId>,
    ) -> Result<Self, ValidationError> {
        let date = date.ok_or(ValidationError::MissingDate)?;
        let sum = parse_amount(sum)?;

        if employee_id.is_some() && sum > Decimal::ZERO {
            return Err(ValidationError::PositiveSalary(sum));
        }

        Ok(Self {
            date,
            sum,
            comment: normalize_comment(comment),
            employee_id,
        })
    }
}

/// Parse the amount the user typed.
///
/// Surrounding whitespace is ignored and a decimal comma is accepted in place
/// of a decimal point, e.g. "-1500,50".
///
/// # Errors
/// Returns [ValidationError::InvalidAmount] if the text is not a decimal
/// number.
pub fn parse_amount(text: &str) -> Result<Decimal, ValidationError> {
    let trimmed = text.trim();
    let invalid = || ValidationError::InvalidAmount(text.to_owned());

    // Decimal parsing would skip `_` digit separators.
    if trimmed.is_empty() || trimmed.contains('_') {
        return Err(invalid());
    }

    let normalized = if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_owned()
    };

    Decimal::from_str(&normalized).map_err(|_| invalid())
}

/// An empty comment is stored as no comment.
pub fn normalize_comment(comment: &str) -> Option<String> {
    if comment.is_empty() {
        None
    } else {
        Some(comment.to_owned())
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the cash operations table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_cash_operation_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS ba_cash_operations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                datestamp TEXT NOT NULL,
                summa TEXT NOT NULL,
                comment TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Map a history row to a [CashTransaction].
///
/// Expects the columns `id, datestamp, summa, comment, fullname`.
pub(crate) fn map_history_row(row: &TableRow) -> FromSqlResult<CashTransaction> {
    let id = row.get(0)?;
    let date = row.get_with(1, date_from_sql)?;
    let sum = row.get_with(2, decimal_from_sql)?;
    let comment = row.get::<Option<String>>(3)?.filter(|text| !text.is_empty());
    let employee_full_name = row.get(4)?;

    Ok(CashTransaction {
        id,
        date,
        sum,
        comment,
        employee_full_name,
    })
}

/// Read the calendar date of a stored timestamp.
///
/// Accepts `YYYY-MM-DD` optionally followed by a time, separated by a space
/// or `T`.
pub(crate) fn date_from_sql(value: ValueRef<'_>) -> FromSqlResult<Date> {
    let text = value.as_str()?;
    let date_part = text
        .split([' ', 'T'])
        .next()
        .ok_or(FromSqlError::InvalidType)?;

    Date::parse(date_part, format_description!("[year]-[month]-[day]"))
        .map_err(|error| FromSqlError::Other(Box::new(error)))
}

/// Read an amount stored as an integer, a real or decimal text.
pub(crate) fn decimal_from_sql(value: ValueRef<'_>) -> FromSqlResult<Decimal> {
    match value {
        ValueRef::Integer(integer) => Ok(Decimal::from(integer)),
        ValueRef::Real(real) => {
            Decimal::try_from(real).map_err(|error| FromSqlError::Other(Box::new(error)))
        }
        ValueRef::Text(_) => Decimal::from_str(value.as_str()?.trim())
            .map_err(|error| FromSqlError::Other(Box::new(error))),
        _ => Err(FromSqlError::InvalidType),
    }
}

// ============================================================================
// TESTS
// ============================================================================
