//! Employees and the salary postings that link them to cash operations.

use rusqlite::{Connection, types::FromSqlResult};
use serde::Serialize;

use crate::{database_id::EmployeeId, store::TableRow};

/// A person in the employee card index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Employee {
    /// The ID of the employee.
    pub id: EmployeeId,
    /// The name shown next to salary payments.
    pub full_name: String,
}

/// Create the employee card index table.
///
/// An employee with a `fired` date can no longer receive salary postings.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_employee_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS ba_employees_cardindex (
                id INTEGER PRIMARY KEY,
                fullname TEXT NOT NULL,
                fired TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Create the salary posting table.
///
/// Each cash operation has at most one posting. Deleting a cash operation that
/// still has a posting is rejected, the posting has to be removed first.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_salary_posting_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS ba_employees_cash (
            opid INTEGER NOT NULL UNIQUE,
            emid INTEGER NOT NULL,
            FOREIGN KEY(opid) REFERENCES ba_cash_operations(id),
            FOREIGN KEY(emid) REFERENCES ba_employees_cardindex(id)
        );

        CREATE INDEX IF NOT EXISTS idx_employees_cash_emid ON ba_employees_cash(emid);",
    )?;

    Ok(())
}

/// Map a row with the columns `id, fullname` to an [Employee].
pub(crate) fn map_employee_row(row: &TableRow) -> FromSqlResult<Employee> {
    let id = row.get(0)?;
    let full_name = row.get(1)?;

    Ok(Employee { id, full_name })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::db::initialize;

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn posting_for_unknown_employee_is_rejected() {
        let connection = get_test_connection();
        connection
            .execute(
                "INSERT INTO ba_cash_operations (datestamp, summa) VALUES ('2024-01-06 00:00:00', '-50')",
                (),
            )
            .unwrap();

        let result = connection.execute(
            "INSERT INTO ba_employees_cash (opid, emid) VALUES (1, 404)",
            (),
        );

        assert!(result.is_err());
    }

    #[test]
    fn cash_operation_with_posting_cannot_be_deleted_alone() {
        let connection = get_test_connection();
        connection
            .execute_batch(
                "INSERT INTO ba_employees_cardindex (id, fullname) VALUES (7, 'Jane Doe');
                 INSERT INTO ba_cash_operations (datestamp, summa) VALUES ('2024-01-06 00:00:00', '-50');
                 INSERT INTO ba_employees_cash (opid, emid) VALUES (1, 7);",
            )
            .unwrap();

        let result = connection.execute("DELETE FROM ba_cash_operations WHERE id = 1", ());

        assert!(result.is_err());
    }

    #[test]
    fn cash_operation_can_only_be_posted_once() {
        let connection = get_test_connection();
        connection
            .execute_batch(
                "INSERT INTO ba_employees_cardindex (id, fullname) VALUES (7, 'Jane Doe');
                 INSERT INTO ba_cash_operations (datestamp, summa) VALUES ('2024-01-06 00:00:00', '-50');
                 INSERT INTO ba_employees_cash (opid, emid) VALUES (1, 7);",
            )
            .unwrap();

        let result = connection.execute(
            "INSERT INTO ba_employees_cash (opid, emid) VALUES (1, 7)",
            (),
        );

        assert!(result.is_err());
    }
}
