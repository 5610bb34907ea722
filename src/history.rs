//! The history shown on the cash page.
//!
//! The view is a read-through cache of [LedgerRepository::list_history]. It
//! never changes its entries itself, it reloads them after every committed
//! write or delete.

use crate::{Error, LedgerRepository, cash_transaction::CashTransaction};

/// How many records are shown until the user asks for the full history.
pub const DEFAULT_PREVIEW_SIZE: usize = 30;

const HISTORY_HEADER: &str = "History";
const NO_RECORDS_HEADER: &str = "No recent records";

/// Which part of the history the view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    /// Only the newest `n` records.
    Preview(usize),
    /// Every record.
    Full,
}

impl HistoryMode {
    fn limit(self) -> Option<usize> {
        match self {
            HistoryMode::Preview(size) => Some(size),
            HistoryMode::Full => None,
        }
    }
}

/// The cash operations currently on display, newest first.
///
/// Starts in [HistoryMode::Preview]. Once switched to [HistoryMode::Full] with
/// [HistoryView::load_all] it stays there until the view is recreated.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    mode: HistoryMode,
    entries: Vec<CashTransaction>,
    unavailable: Option<String>,
}

impl HistoryView {
    /// Create an empty view that previews at most `preview_size` records.
    ///
    /// Call [HistoryView::refresh] to load the records.
    pub fn new(preview_size: usize) -> Self {
        Self {
            mode: HistoryMode::Preview(preview_size),
            entries: Vec::new(),
            unavailable: None,
        }
    }

    /// Reload the records for the current mode.
    ///
    /// If the history cannot be queried the view is emptied and marked
    /// unavailable instead of returning an error.
    pub fn refresh(&mut self, ledger: &LedgerRepository) {
        match ledger.list_history(self.mode.limit()) {
            Ok(entries) => {
                tracing::debug!("loaded {} history records in {:?} mode", entries.len(), self.mode);
                self.entries = entries;
                self.unavailable = None;
            }
            Err(Error::QueryUnavailable(message)) => {
                tracing::warn!("history is unavailable: {message}");
                self.entries.clear();
                self.unavailable = Some(message);
            }
            Err(error) => {
                tracing::error!("could not load history: {error}");
                self.entries.clear();
                self.unavailable = Some(error.to_string());
            }
        }
    }

    /// Switch to the full history and reload it.
    pub fn load_all(&mut self, ledger: &LedgerRepository) {
        self.mode = HistoryMode::Full;
        self.refresh(ledger);
    }

    /// Whether [HistoryView::load_all] would show more than is shown now.
    pub fn can_load_all(&self) -> bool {
        matches!(self.mode, HistoryMode::Preview(_))
    }

    /// The current mode.
    pub fn mode(&self) -> HistoryMode {
        self.mode
    }

    /// The records on display, newest first.
    pub fn entries(&self) -> &[CashTransaction] {
        &self.entries
    }

    /// Find a displayed record by its ID.
    pub fn find(&self, id: crate::TransactionId) -> Option<&CashTransaction> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Whether the last refresh could not query the history.
    pub fn is_unavailable(&self) -> bool {
        self.unavailable.is_some()
    }

    /// Why the last refresh could not query the history.
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    /// The heading for the history panel.
    pub fn header(&self) -> &'static str {
        if self.is_unavailable() {
            NO_RECORDS_HEADER
        } else {
            HISTORY_HEADER
        }
    }
}

impl Default for HistoryView {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{LedgerRepository, Store};

    use super::{DEFAULT_PREVIEW_SIZE, HistoryMode, HistoryView};

    fn get_ledger_with_records(count: usize) -> LedgerRepository {
        let ledger = LedgerRepository::new(Store::open_in_memory().unwrap());
        for sum in 1..=count {
            ledger
                .record_transaction(Some(date!(2024 - 01 - 05)), &sum.to_string(), "", None)
                .unwrap();
        }
        ledger
    }

    #[test]
    fn starts_in_preview_mode_with_default_size() {
        let view = HistoryView::default();

        assert_eq!(view.mode(), HistoryMode::Preview(DEFAULT_PREVIEW_SIZE));
        assert!(view.entries().is_empty());
        assert!(view.can_load_all());
    }

    #[test]
    fn preview_is_capped() {
        let ledger = get_ledger_with_records(5);
        let mut view = HistoryView::new(3);

        view.refresh(&ledger);

        let ids: Vec<i64> = view.entries().iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[test]
    fn load_all_shows_everything_and_stays_full() {
        let ledger = get_ledger_with_records(5);
        let mut view = HistoryView::new(3);
        view.refresh(&ledger);

        view.load_all(&ledger);
        assert_eq!(view.entries().len(), 5);
        assert_eq!(view.mode(), HistoryMode::Full);
        assert!(!view.can_load_all());

        ledger
            .record_transaction(Some(date!(2024 - 01 - 06)), "6", "", None)
            .unwrap();
        view.refresh(&ledger);

        assert_eq!(view.mode(), HistoryMode::Full);
        assert_eq!(view.entries().len(), 6);
    }

    #[test]
    fn refresh_reflects_deletes() {
        let ledger = get_ledger_with_records(2);
        let mut view = HistoryView::default();
        view.refresh(&ledger);

        ledger.delete_transaction(2).unwrap();
        view.refresh(&ledger);

        assert_eq!(view.entries().len(), 1);
        assert!(view.find(2).is_none());
        assert!(view.find(1).is_some());
    }

    #[test]
    fn unavailable_history_shows_placeholder() {
        let ledger = get_ledger_with_records(2);
        let mut view = HistoryView::default();
        view.refresh(&ledger);
        ledger
            .store()
            .executor()
            .execute_write("DROP TABLE ba_employees_cash", &[]);

        view.refresh(&ledger);

        assert!(view.is_unavailable());
        assert!(view.entries().is_empty());
        assert_eq!(view.header(), "No recent records");
        assert!(view.unavailable_reason().is_some());
    }

    #[test]
    fn empty_ledger_is_available() {
        let ledger = get_ledger_with_records(0);
        let mut view = HistoryView::default();

        view.refresh(&ledger);

        assert!(!view.is_unavailable());
        assert_eq!(view.header(), "History");
    }
}
