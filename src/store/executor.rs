//! Runs parameterised statements against the ledger database.
//!
//! The executor never lets a database error escape. Writes report a
//! [ResultCode], selects report `None` when the query could not be evaluated,
//! and the text of the most recent failure is kept for
//! [StatementExecutor::last_error_message].

use std::cell::RefCell;

use rusqlite::{
    Connection, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef},
};
use rust_decimal::Decimal;
use time::Date;

use crate::database_id::DatabaseId;

/// The outcome of a write statement.
///
/// Ordered so that `code >= ResultCode::ChangesApplied` reads as "succeeded".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResultCode {
    /// The database rejected the statement. See
    /// [StatementExecutor::last_error_message].
    Error,
    /// The statement ran but no rows were changed.
    NothingChanged,
    /// The statement changed at least one row.
    ChangesApplied,
}

/// A typed value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A calendar date, stored as a midnight timestamp.
    Date(Date),
    /// An exact decimal amount, stored as text.
    Decimal(Decimal),
    /// Text that must not be null.
    Text(String),
    /// An integer, e.g. a row ID.
    Integer(i64),
    /// Text that may be null.
    NullableText(Option<String>),
}

impl ToSql for ParamValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            ParamValue::Date(date) => Ok(ToSqlOutput::from(format!("{date} 00:00:00"))),
            ParamValue::Decimal(amount) => Ok(ToSqlOutput::from(amount.to_string())),
            ParamValue::Text(text) => text.to_sql(),
            ParamValue::Integer(integer) => integer.to_sql(),
            ParamValue::NullableText(text) => text.to_sql(),
        }
    }
}

/// A named statement parameter, e.g. `:summa`.
///
/// Values are always bound by name, never spliced into the statement text.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: &'static str,
    value: ParamValue,
}

impl Param {
    /// Bind a date to `name`.
    pub fn date(name: &'static str, value: Date) -> Self {
        Self {
            name,
            value: ParamValue::Date(value),
        }
    }

    /// Bind a decimal amount to `name`.
    pub fn decimal(name: &'static str, value: Decimal) -> Self {
        Self {
            name,
            value: ParamValue::Decimal(value),
        }
    }

    /// Bind non-null text to `name`.
    pub fn text(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: ParamValue::Text(value.into()),
        }
    }

    /// Bind an integer to `name`.
    pub fn integer(name: &'static str, value: i64) -> Self {
        Self {
            name,
            value: ParamValue::Integer(value),
        }
    }

    /// Bind text or null to `name`.
    pub fn nullable_text(name: &'static str, value: Option<String>) -> Self {
        Self {
            name,
            value: ParamValue::NullableText(value),
        }
    }

    /// The parameter name including its prefix, e.g. `:id`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The bound value.
    pub fn value(&self) -> &ParamValue {
        &self.value
    }
}

fn bind(params: &[Param]) -> Vec<(&str, &dyn ToSql)> {
    params
        .iter()
        .map(|param| (param.name, &param.value as &dyn ToSql))
        .collect()
}

/// One row of a [Table], with cells in the order of the selected columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    cells: Vec<Value>,
}

impl TableRow {
    /// The raw cells of the row.
    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    /// Convert the cell at `index` into a Rust type.
    ///
    /// # Errors
    /// Returns an error if there is no cell at `index` or the cell cannot be
    /// converted into `T`.
    pub fn get<T: FromSql>(&self, index: usize) -> FromSqlResult<T> {
        self.get_with(index, T::column_result)
    }

    /// Convert the cell at `index` with a custom conversion, for types that do
    /// not implement [FromSql].
    ///
    /// # Errors
    /// Returns an error if there is no cell at `index` or `convert` fails.
    pub fn get_with<T>(
        &self,
        index: usize,
        convert: impl FnOnce(ValueRef<'_>) -> FromSqlResult<T>,
    ) -> FromSqlResult<T> {
        let cell = self
            .cells
            .get(index)
            .ok_or_else(|| FromSqlError::Other(format!("no column at index {index}").into()))?;

        convert(ValueRef::from(cell))
    }
}

/// The rows returned by [StatementExecutor::select].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<TableRow>,
}

impl Table {
    /// The rows in the order the query returned them.
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the query matched no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl IntoIterator for Table {
    type Item = TableRow;
    type IntoIter = std::vec::IntoIter<TableRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Executes statements on the single connection to the ledger database.
#[derive(Debug)]
pub struct StatementExecutor {
    connection: Connection,
    last_error: RefCell<String>,
}

impl StatementExecutor {
    /// Take ownership of `connection`.
    ///
    /// The schema is expected to exist already, see [crate::initialize_db].
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            last_error: RefCell::new(String::new()),
        }
    }

    /// Execute a write statement with named `params`.
    pub fn execute_write(&self, statement: &str, params: &[Param]) -> ResultCode {
        let result = self
            .connection
            .prepare_cached(statement)
            .and_then(|mut prepared| prepared.execute(bind(params).as_slice()));

        match result {
            Ok(0) => {
                self.clear_error();
                ResultCode::NothingChanged
            }
            Ok(_) => {
                self.clear_error();
                ResultCode::ChangesApplied
            }
            Err(error) => {
                self.record_error(statement, &error);
                ResultCode::Error
            }
        }
    }

    /// Execute an insert that returns the generated key of the new row, e.g.
    /// `INSERT ... RETURNING id`.
    ///
    /// Returns `None` if the database rejected the insert or inserted nothing.
    pub fn insert_returning_id(&self, statement: &str, params: &[Param]) -> Option<DatabaseId> {
        let result = self.connection.prepare_cached(statement).and_then(|mut prepared| {
            prepared.query_row(bind(params).as_slice(), |row| row.get::<_, DatabaseId>(0))
        });

        match result {
            Ok(id) => {
                self.clear_error();
                Some(id)
            }
            Err(error) => {
                self.record_error(statement, &error);
                None
            }
        }
    }

    /// Run a query and collect every row it returns.
    ///
    /// Returns an empty table when nothing matched and `None` when the query
    /// itself could not be evaluated.
    pub fn select(&self, query: &str, params: &[Param]) -> Option<Table> {
        let result = self.connection.prepare_cached(query).and_then(|mut prepared| {
            let column_count = prepared.column_count();
            let bound = bind(params);

            let rows = prepared
                .query_map(bound.as_slice(), |row| {
                    (0..column_count)
                        .map(|index| row.get::<_, Value>(index))
                        .collect::<Result<Vec<_>, _>>()
                        .map(|cells| TableRow { cells })
                })?
                .collect::<Result<Vec<_>, _>>();

            rows
        });

        match result {
            Ok(rows) => {
                self.clear_error();
                Some(Table { rows })
            }
            Err(error) => {
                self.record_error(query, &error);
                None
            }
        }
    }

    /// Run a parameterless control statement such as `BEGIN` or `COMMIT`.
    pub(crate) fn execute_control(&self, statement: &str) -> ResultCode {
        match self.connection.execute_batch(statement) {
            Ok(()) => {
                self.clear_error();
                ResultCode::ChangesApplied
            }
            Err(error) => {
                self.record_error(statement, &error);
                ResultCode::Error
            }
        }
    }

    /// Whether the connection is outside of an explicit transaction.
    pub(crate) fn is_autocommit(&self) -> bool {
        self.connection.is_autocommit()
    }

    /// The description of the most recent failure.
    ///
    /// Empty if the most recent operation succeeded.
    pub fn last_error_message(&self) -> String {
        self.last_error.borrow().clone()
    }

    fn record_error(&self, statement: &str, error: &rusqlite::Error) {
        let message = match error {
            rusqlite::Error::QueryReturnedNoRows => "the statement did not return a row".to_owned(),
            error => error.to_string(),
        };

        tracing::error!("statement failed: {message}\nstatement: {statement}");
        *self.last_error.borrow_mut() = message;
    }

    fn clear_error(&self) {
        self.last_error.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::{Connection, types::Value};
    use rust_decimal::Decimal;
    use time::macros::date;

    use super::{Param, ResultCode, StatementExecutor};

    fn get_test_executor() -> StatementExecutor {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute_batch(
                "CREATE TABLE item (id INTEGER PRIMARY KEY, label TEXT NOT NULL UNIQUE, note TEXT, day TEXT, amount TEXT);",
            )
            .unwrap();

        StatementExecutor::new(connection)
    }

    #[test]
    fn write_reports_changes_applied() {
        let executor = get_test_executor();

        let code = executor.execute_write(
            "INSERT INTO item (label) VALUES (:label)",
            &[Param::text(":label", "first")],
        );

        assert_eq!(code, ResultCode::ChangesApplied);
        assert_eq!(executor.last_error_message(), "");
    }

    #[test]
    fn write_reports_nothing_changed() {
        let executor = get_test_executor();

        let code = executor.execute_write(
            "DELETE FROM item WHERE id = :id",
            &[Param::integer(":id", 42)],
        );

        assert_eq!(code, ResultCode::NothingChanged);
    }

    #[test]
    fn write_captures_constraint_violation() {
        let executor = get_test_executor();
        let insert = "INSERT INTO item (label) VALUES (:label)";
        executor.execute_write(insert, &[Param::text(":label", "twin")]);

        let code = executor.execute_write(insert, &[Param::text(":label", "twin")]);

        assert_eq!(code, ResultCode::Error);
        assert!(
            executor.last_error_message().contains("UNIQUE"),
            "got {:?}",
            executor.last_error_message()
        );
    }

    #[test]
    fn malformed_statement_is_an_error_not_a_panic() {
        let executor = get_test_executor();

        let code = executor.execute_write("INSERT INTO nowhere VALUES (1)", &[]);

        assert_eq!(code, ResultCode::Error);
        assert!(!executor.last_error_message().is_empty());
    }

    #[test]
    fn last_error_is_cleared_on_success() {
        let executor = get_test_executor();
        executor.execute_write("INSERT INTO nowhere VALUES (1)", &[]);

        executor.execute_write(
            "INSERT INTO item (label) VALUES (:label)",
            &[Param::text(":label", "ok")],
        );

        assert_eq!(executor.last_error_message(), "");
    }

    #[test]
    fn result_codes_are_ordered_by_success() {
        assert!(ResultCode::ChangesApplied > ResultCode::NothingChanged);
        assert!(ResultCode::NothingChanged > ResultCode::Error);
    }

    #[test]
    fn insert_returning_id_returns_generated_key() {
        let executor = get_test_executor();
        let insert = "INSERT INTO item (label) VALUES (:label) RETURNING id";

        let first = executor.insert_returning_id(insert, &[Param::text(":label", "a")]);
        let second = executor.insert_returning_id(insert, &[Param::text(":label", "b")]);

        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));
    }

    #[test]
    fn insert_returning_id_returns_none_on_failure() {
        let executor = get_test_executor();
        let insert = "INSERT INTO item (label) VALUES (:label) RETURNING id";
        executor.insert_returning_id(insert, &[Param::text(":label", "a")]);

        let duplicate = executor.insert_returning_id(insert, &[Param::text(":label", "a")]);

        assert_eq!(duplicate, None);
        assert!(!executor.last_error_message().is_empty());
    }

    #[test]
    fn typed_params_are_stored_as_expected() {
        let executor = get_test_executor();

        executor.execute_write(
            "INSERT INTO item (label, note, day, amount) VALUES (:label, :note, :day, :amount)",
            &[
                Param::text(":label", "typed"),
                Param::nullable_text(":note", None),
                Param::date(":day", date!(2024 - 01 - 05)),
                Param::decimal(":amount", Decimal::new(-5050, 2)),
            ],
        );

        let table = executor
            .select("SELECT note, day, amount FROM item", &[])
            .unwrap();
        assert_eq!(
            table.rows()[0].cells(),
            &[
                Value::Null,
                Value::Text("2024-01-05 00:00:00".to_owned()),
                Value::Text("-50.50".to_owned()),
            ]
        );
    }

    #[test]
    fn select_returns_empty_table_when_nothing_matches() {
        let executor = get_test_executor();

        let table = executor.select("SELECT id, label FROM item", &[]);

        assert_eq!(table.map(|table| table.len()), Some(0));
    }

    #[test]
    fn select_returns_none_when_query_cannot_be_evaluated() {
        let executor = get_test_executor();

        let table = executor.select("SELECT id FROM missing_table", &[]);

        assert!(table.is_none());
        assert!(executor.last_error_message().contains("missing_table"));
    }

    #[test]
    fn select_binds_named_params() {
        let executor = get_test_executor();
        for label in ["a", "b", "c"] {
            executor.execute_write(
                "INSERT INTO item (label) VALUES (:label)",
                &[Param::text(":label", label)],
            );
        }

        let table = executor
            .select(
                "SELECT label FROM item WHERE id > :id ORDER BY id",
                &[Param::integer(":id", 1)],
            )
            .unwrap();

        let labels: Vec<String> = table
            .rows()
            .iter()
            .map(|row| row.get(0).unwrap())
            .collect();
        assert_eq!(labels, vec!["b", "c"]);
    }

    #[test]
    fn row_get_out_of_range_is_an_error() {
        let executor = get_test_executor();
        executor.execute_write(
            "INSERT INTO item (label) VALUES (:label)",
            &[Param::text(":label", "a")],
        );
        let table = executor.select("SELECT id FROM item", &[]).unwrap();

        let result = table.rows()[0].get::<i64>(3);

        assert!(result.is_err());
    }
}
