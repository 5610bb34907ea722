//! The owned handle to the ledger database.

mod executor;
mod scope;

use std::path::{Path, PathBuf};

use rusqlite::Connection;

pub use executor::{Param, ParamValue, ResultCode, StatementExecutor, Table, TableRow};
pub use scope::{CommitError, Scope, ScopeOutcome, ScopeState, TransactionCoordinator};

use crate::{Error, db::initialize};

/// The single connection to the ledger database together with the
/// coordinator that guards its transaction scope.
///
/// Construct one at startup and hand it to the
/// [LedgerRepository](crate::LedgerRepository), which is then its only owner.
#[derive(Debug)]
pub struct Store {
    executor: StatementExecutor,
    coordinator: TransactionCoordinator,
    path: Option<PathBuf>,
}

impl Store {
    /// Open the database file at `path`, creating it and the ledger tables if
    /// they do not exist.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the file cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        tracing::debug!("opening ledger database at {}", path.display());

        let connection = Connection::open(path)?;
        let mut store = Self::from_connection(connection)?;
        store.path = Some(path.to_path_buf());

        Ok(store)
    }

    /// Open a fresh in-memory database with the ledger tables.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Take ownership of `connection` and make sure the ledger tables exist.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the schema cannot be created.
    pub fn from_connection(connection: Connection) -> Result<Self, Error> {
        initialize(&connection)?;

        Ok(Self {
            executor: StatementExecutor::new(connection),
            coordinator: TransactionCoordinator::default(),
            path: None,
        })
    }

    /// The executor for running statements.
    pub fn executor(&self) -> &StatementExecutor {
        &self.executor
    }

    /// Open a transaction scope.
    ///
    /// # Errors
    /// See [TransactionCoordinator::begin].
    pub fn begin(&self) -> Result<Scope<'_>, Error> {
        self.coordinator.begin(&self.executor)
    }

    /// Whether a transaction scope is open.
    pub fn scope_state(&self) -> ScopeState {
        self.coordinator.state()
    }

    /// How the most recently closed transaction scope ended.
    pub fn last_scope_outcome(&self) -> Option<ScopeOutcome> {
        self.coordinator.last_outcome()
    }

    /// The database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
