//! Groups several statements into one all-or-nothing unit of work.
//!
//! A [Scope] is obtained from [TransactionCoordinator::begin] and borrows the
//! store for as long as it is open, so a scope cannot outlive the operation
//! that opened it. Dropping a scope that was neither committed nor rolled back
//! rolls it back.

use std::cell::Cell;

use crate::{
    Error,
    store::executor::{ResultCode, StatementExecutor},
};

/// Whether a transaction scope is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeState {
    /// No scope is open.
    #[default]
    Idle,
    /// A scope has begun and has not been committed or rolled back yet.
    InProgress,
}

/// How the most recent scope ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOutcome {
    /// Every statement in the scope was made permanent.
    Committed,
    /// Every statement in the scope was undone.
    RolledBack,
}

/// Tracks the one transaction scope the single connection can have open.
#[derive(Debug, Default)]
pub struct TransactionCoordinator {
    state: Cell<ScopeState>,
    last_outcome: Cell<Option<ScopeOutcome>>,
}

impl TransactionCoordinator {
    /// Whether a scope is open.
    pub fn state(&self) -> ScopeState {
        self.state.get()
    }

    /// How the most recently closed scope ended, `None` if no scope has closed.
    pub fn last_outcome(&self) -> Option<ScopeOutcome> {
        self.last_outcome.get()
    }

    /// Open a scope on `executor`.
    ///
    /// # Errors
    /// Returns [Error::ScopeInProgress] if a scope is already open, this fails
    /// fast rather than waiting. Returns [Error::WriteFailed] if the database
    /// refuses to begin a transaction.
    pub fn begin<'s>(&'s self, executor: &'s StatementExecutor) -> Result<Scope<'s>, Error> {
        if self.state.get() == ScopeState::InProgress || !executor.is_autocommit() {
            return Err(Error::ScopeInProgress);
        }

        if executor.execute_control("BEGIN IMMEDIATE") == ResultCode::Error {
            return Err(Error::WriteFailed(executor.last_error_message()));
        }

        tracing::debug!("began transaction scope");
        self.state.set(ScopeState::InProgress);

        Ok(Scope {
            coordinator: self,
            executor,
            open: true,
        })
    }

    fn finish(&self, outcome: ScopeOutcome) {
        self.state.set(ScopeState::Idle);
        self.last_outcome.set(Some(outcome));
    }
}

/// An open transaction scope.
///
/// Statements issued through the store's executor while the scope is open are
/// part of the scope and are visible to each other before commit.
#[derive(Debug)]
#[must_use = "dropping a scope rolls it back"]
pub struct Scope<'s> {
    coordinator: &'s TransactionCoordinator,
    executor: &'s StatementExecutor,
    open: bool,
}

impl<'s> Scope<'s> {
    /// Make every statement in the scope permanent.
    ///
    /// # Errors
    /// If the database rejects the commit the scope stays open and is handed
    /// back inside the [CommitError]. The caller decides when to roll it back.
    pub fn commit(mut self) -> Result<(), CommitError<'s>> {
        if self.executor.execute_control("COMMIT") == ResultCode::Error {
            let message = self.executor.last_error_message();
            tracing::warn!("commit failed: {message}");

            return Err(CommitError {
                scope: self,
                message,
            });
        }

        tracing::debug!("committed transaction scope");
        self.open = false;
        self.coordinator.finish(ScopeOutcome::Committed);

        Ok(())
    }

    /// Undo every statement issued since the scope began.
    ///
    /// The coordinator returns to [ScopeState::Idle] even if the database
    /// reports an error, e.g. because it already rolled back on its own.
    pub fn rollback(mut self) -> ScopeOutcome {
        self.rollback_in_place();
        ScopeOutcome::RolledBack
    }

    fn rollback_in_place(&mut self) {
        if !self.open {
            return;
        }

        if self.executor.is_autocommit() {
            tracing::warn!("transaction was already rolled back by the database");
        } else if self.executor.execute_control("ROLLBACK") == ResultCode::Error {
            tracing::warn!(
                "rollback reported an error: {}",
                self.executor.last_error_message()
            );
        } else {
            tracing::warn!("rolled back transaction scope");
        }

        self.open = false;
        self.coordinator.finish(ScopeOutcome::RolledBack);
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.rollback_in_place();
    }
}

/// A commit that the database rejected.
///
/// Holds the still-open scope. Call [CommitError::rollback] to undo it, or drop
/// the error to the same effect.
#[derive(Debug)]
pub struct CommitError<'s> {
    scope: Scope<'s>,
    message: String,
}

impl CommitError<'_> {
    /// The database's description of why the commit failed.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Roll back the scope and return the commit failure message.
    pub fn rollback(self) -> String {
        self.scope.rollback();
        self.message
    }
}
