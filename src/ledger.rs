//! The ledger operations: recording, deleting and listing cash operations and
//! maintaining the employees they can be posted to.

use rusqlite::types::FromSqlResult;
use time::Date;

use crate::{
    Error, ValidationError,
    cash_transaction::{CashTransaction, NewCashTransaction, map_history_row},
    database_id::{EmployeeId, TransactionId},
    employee::{Employee, map_employee_row},
    store::{Param, ResultCode, Scope, Store, TableRow},
};

const INSERT_CASH_OPERATION: &str = "INSERT INTO ba_cash_operations (datestamp, summa, comment)
     VALUES (:datestamp, :summa, :comment)
     RETURNING id";

// Inserts nothing unless the employee exists and has not been dismissed.
const INSERT_SALARY_POSTING: &str = "INSERT INTO ba_employees_cash (emid, opid)
     SELECT id, :opid FROM ba_employees_cardindex
     WHERE id = :emid AND fired IS NULL";

const DELETE_SALARY_POSTING: &str = "DELETE FROM ba_employees_cash WHERE opid = :id";

const DELETE_CASH_OPERATION: &str = "DELETE FROM ba_cash_operations WHERE id = :id";

// A negative limit means no limit in SQLite.
const SELECT_HISTORY: &str = "SELECT c.id, c.datestamp, c.summa, c.comment, e.fullname
     FROM ba_cash_operations AS c
     LEFT JOIN ba_employees_cash AS ec ON ec.opid = c.id
     LEFT JOIN ba_employees_cardindex AS e ON e.id = ec.emid
     ORDER BY c.id DESC
     LIMIT :limit";

const SELECT_CASH_OPERATION: &str = "SELECT c.id, c.datestamp, c.summa, c.comment, e.fullname
     FROM ba_cash_operations AS c
     LEFT JOIN ba_employees_cash AS ec ON ec.opid = c.id
     LEFT JOIN ba_employees_cardindex AS e ON e.id = ec.emid
     WHERE c.id = :id";

const SELECT_ACTIVE_EMPLOYEES: &str =
    "SELECT id, fullname FROM ba_employees_cardindex WHERE fired IS NULL ORDER BY id";

/// Records and reads cash operations.
///
/// The repository is the only owner of the [Store]. Every operation either
/// finishes completely or leaves the database as it was.
#[derive(Debug)]
pub struct LedgerRepository {
    store: Store,
}

impl LedgerRepository {
    /// Create a repository that takes ownership of `store`.
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Validate the input and record a cash operation.
    ///
    /// If `employee_id` is set, the operation is posted to that employee as a
    /// salary payment. Only employees who have not been dismissed can be
    /// paid. Both rows are written in one scope, so either both
    /// exist afterwards or neither does.
    ///
    /// Returns the ID of the new cash operation.
    ///
    /// # Errors
    /// Returns a:
    /// - [Error::Validation] if the input is invalid, no statement is issued,
    /// - [Error::WriteFailed] if an insert or the commit fails,
    /// - or [Error::ScopeInProgress] if another scope is open.
    pub fn record_transaction(
        &self,
        date: Option<Date>,
        sum: &str,
        comment: &str,
        employee_id: Option<EmployeeId>,
    ) -> Result<TransactionId, Error> {
        let record = NewCashTransaction::validate(date, sum, comment, employee_id)?;

        self.insert(record)
    }

    /// Record an already validated cash operation.
    ///
    /// # Errors
    /// See [LedgerRepository::record_transaction].
    pub fn insert(&self, record: NewCashTransaction) -> Result<TransactionId, Error> {
        let Some(employee_id) = record.employee_id else {
            return self
                .insert_cash_operation(&record)
                .ok_or_else(|| self.write_error());
        };

        let scope = self.store.begin()?;

        let Some(transaction_id) = self.insert_cash_operation(&record) else {
            return Err(self.rollback_with_write_error(scope));
        };

        let code = self.store.executor().execute_write(
            INSERT_SALARY_POSTING,
            &[
                Param::integer(":emid", employee_id),
                Param::integer(":opid", transaction_id),
            ],
        );

        match code {
            ResultCode::ChangesApplied => {}
            ResultCode::NothingChanged => {
                scope.rollback();
                return Err(Error::WriteFailed(format!(
                    "there is no active employee with the ID {employee_id}"
                )));
            }
            ResultCode::Error => return Err(self.rollback_with_write_error(scope)),
        }

        scope
            .commit()
            .map_err(|failed| Error::WriteFailed(failed.rollback()))?;

        tracing::info!("recorded salary payment {transaction_id} for employee {employee_id}");

        Ok(transaction_id)
    }

    /// Delete the cash operation `id` together with its salary posting, if it
    /// has one.
    ///
    /// # Errors
    /// Returns [Error::DeleteFailed] if no cash operation was deleted, either
    /// because `id` does not exist or because the database rejected the
    /// delete. Nothing is deleted in that case.
    pub fn delete_transaction(&self, id: TransactionId) -> Result<(), Error> {
        let executor = self.store.executor();
        let delete_error = |message: String| Error::DeleteFailed { id, message };

        let scope = self.store.begin()?;

        if executor.execute_write(DELETE_SALARY_POSTING, &[Param::integer(":id", id)])
            == ResultCode::Error
        {
            let message = executor.last_error_message();
            scope.rollback();
            return Err(delete_error(message));
        }

        match executor.execute_write(DELETE_CASH_OPERATION, &[Param::integer(":id", id)]) {
            ResultCode::ChangesApplied => {}
            ResultCode::NothingChanged => {
                scope.rollback();
                return Err(delete_error(format!("cash operation {id} does not exist")));
            }
            ResultCode::Error => {
                let message = executor.last_error_message();
                scope.rollback();
                return Err(delete_error(message));
            }
        }

        scope
            .commit()
            .map_err(|failed| delete_error(failed.rollback()))?;

        tracing::info!("deleted cash operation {id}");

        Ok(())
    }

    /// List cash operations newest first, at most `limit` of them or all of
    /// them if `limit` is `None`.
    ///
    /// Salary payments carry the name of the employee they were posted to.
    ///
    /// # Errors
    /// Returns [Error::QueryUnavailable] if the query cannot be evaluated. An
    /// empty ledger is not an error.
    pub fn list_history(&self, limit: Option<usize>) -> Result<Vec<CashTransaction>, Error> {
        let limit = limit.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));

        self.select_rows(
            SELECT_HISTORY,
            &[Param::integer(":limit", limit)],
            map_history_row,
        )
    }

    /// Retrieve the cash operation `id`, `None` if it does not exist.
    ///
    /// # Errors
    /// Returns [Error::QueryUnavailable] if the query cannot be evaluated.
    pub fn get_transaction(&self, id: TransactionId) -> Result<Option<CashTransaction>, Error> {
        let mut rows = self.select_rows(
            SELECT_CASH_OPERATION,
            &[Param::integer(":id", id)],
            map_history_row,
        )?;

        Ok(rows.pop())
    }

    /// List the employees who have not been dismissed, ordered by ID.
    ///
    /// # Errors
    /// Returns [Error::QueryUnavailable] if the query cannot be evaluated.
    pub fn list_active_employees(&self) -> Result<Vec<Employee>, Error> {
        self.select_rows(SELECT_ACTIVE_EMPLOYEES, &[], map_employee_row)
    }

    /// Add an employee to the card index.
    ///
    /// # Errors
    /// Returns a:
    /// - [ValidationError::EmptyEmployeeName] if `full_name` is blank,
    /// - or [Error::WriteFailed] if the insert fails.
    pub fn add_employee(&self, full_name: &str) -> Result<Employee, Error> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ValidationError::EmptyEmployeeName.into());
        }

        let id = self
            .store
            .executor()
            .insert_returning_id(
                "INSERT INTO ba_employees_cardindex (fullname) VALUES (:fullname) RETURNING id",
                &[Param::text(":fullname", full_name)],
            )
            .ok_or_else(|| self.write_error())?;

        Ok(Employee {
            id,
            full_name: full_name.to_owned(),
        })
    }

    /// Record that employee `id` left on `date`.
    ///
    /// Dismissed employees keep their past salary postings but are no longer
    /// listed by [LedgerRepository::list_active_employees].
    ///
    /// # Errors
    /// Returns [Error::WriteFailed] if no active employee has the ID `id`.
    pub fn dismiss_employee(&self, id: EmployeeId, date: Date) -> Result<(), Error> {
        let executor = self.store.executor();

        match executor.execute_write(
            "UPDATE ba_employees_cardindex SET fired = :fired WHERE id = :id AND fired IS NULL",
            &[Param::date(":fired", date), Param::integer(":id", id)],
        ) {
            ResultCode::ChangesApplied => Ok(()),
            ResultCode::NothingChanged => Err(Error::WriteFailed(format!(
                "there is no active employee with the ID {id}"
            ))),
            ResultCode::Error => Err(self.write_error()),
        }
    }

    fn insert_cash_operation(&self, record: &NewCashTransaction) -> Option<TransactionId> {
        self.store.executor().insert_returning_id(
            INSERT_CASH_OPERATION,
            &[
                Param::date(":datestamp", record.date),
                Param::decimal(":summa", record.sum),
                Param::nullable_text(":comment", record.comment.clone()),
            ],
        )
    }

    fn select_rows<T>(
        &self,
        query: &str,
        params: &[Param],
        map_row: fn(&TableRow) -> FromSqlResult<T>,
    ) -> Result<Vec<T>, Error> {
        let executor = self.store.executor();

        let table = executor
            .select(query, params)
            .ok_or_else(|| Error::QueryUnavailable(executor.last_error_message()))?;

        table
            .rows()
            .iter()
            .map(|row| {
                map_row(row).map_err(|error| {
                    tracing::error!("could not read row {:?}: {error}", row.cells());
                    Error::QueryUnavailable(format!("could not read a stored row: {error}"))
                })
            })
            .collect()
    }

    fn write_error(&self) -> Error {
        Error::WriteFailed(self.store.executor().last_error_message())
    }

    fn rollback_with_write_error(&self, scope: Scope<'_>) -> Error {
        // Read the message first, a successful rollback clears it.
        let error = self.write_error();
        scope.rollback();
        error
    }
}
