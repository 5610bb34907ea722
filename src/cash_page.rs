//! The cash page: the entry form, the employee picker and the history, wired
//! to the ledger.
//!
//! A presentation layer drives a [CashPage] and renders its state. The page
//! reloads the history after every successful save or delete.

use time::Date;

use crate::{
    Error, LedgerRepository, Settings,
    cash_transaction::{CashTransaction, NewCashTransaction},
    database_id::{EmployeeId, TransactionId},
    employee::Employee,
    format::confirmation_text,
    history::HistoryView,
};

/// The raw input of the entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CashForm {
    /// The selected date.
    pub date: Option<Date>,
    /// The amount as typed.
    pub sum: String,
    /// The note as typed.
    pub comment: String,
    /// The employee to pay. Setting this turns the record into a salary
    /// payment.
    pub employee_id: Option<EmployeeId>,
}

impl CashForm {
    /// An empty form starting on `date`.
    pub fn new(date: Option<Date>) -> Self {
        Self {
            date,
            ..Default::default()
        }
    }
}

/// The state behind the cash page.
#[derive(Debug)]
pub struct CashPage {
    ledger: LedgerRepository,
    history: HistoryView,
    employees: Vec<Employee>,
    default_input_date: Option<Date>,
    form: CashForm,
}

impl CashPage {
    /// Open the page on `ledger` and load the history preview and the active
    /// employees.
    pub fn open(ledger: LedgerRepository, settings: &Settings) -> Self {
        let default_input_date = settings.default_input_date();

        let mut page = Self {
            ledger,
            history: HistoryView::new(settings.preview_size),
            employees: Vec::new(),
            default_input_date,
            form: CashForm::new(default_input_date),
        };

        page.history.refresh(&page.ledger);
        page.reload_employees();

        page
    }

    /// The ledger the page writes to.
    pub fn ledger(&self) -> &LedgerRepository {
        &self.ledger
    }

    /// The history on display.
    pub fn history(&self) -> &HistoryView {
        &self.history
    }

    /// The employees that can be paid a salary.
    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    /// The date the form is reset to after a save.
    pub fn default_input_date(&self) -> Option<Date> {
        self.default_input_date
    }

    /// The current form input.
    pub fn form(&self) -> &CashForm {
        &self.form
    }

    /// Edit the form input.
    pub fn form_mut(&mut self) -> &mut CashForm {
        &mut self.form
    }

    /// Whether the form input would pass validation.
    pub fn can_save(&self) -> bool {
        NewCashTransaction::validate(
            self.form.date,
            &self.form.sum,
            &self.form.comment,
            self.form.employee_id,
        )
        .is_ok()
    }

    /// Save the form as a new record.
    ///
    /// On success the form is reset and the history reloaded. On failure the
    /// form keeps its input so the user can correct it and try again.
    ///
    /// # Errors
    /// See [LedgerRepository::record_transaction].
    pub fn save(&mut self) -> Result<TransactionId, Error> {
        let id = self.ledger.record_transaction(
            self.form.date,
            &self.form.sum,
            &self.form.comment,
            self.form.employee_id,
        )?;

        self.form = CashForm::new(self.default_input_date);
        self.history.refresh(&self.ledger);

        Ok(id)
    }

    /// The record `id` and the text to confirm its deletion with.
    ///
    /// Looks in the displayed history first and falls back to the ledger.
    pub fn delete_confirmation(&self, id: TransactionId) -> Option<(CashTransaction, String)> {
        let transaction = match self.history.find(id) {
            Some(transaction) => Some(transaction.clone()),
            None => self.ledger.get_transaction(id).ok().flatten(),
        }?;
        let text = confirmation_text(&transaction);

        Some((transaction, text))
    }

    /// Delete the record `id` and reload the history.
    ///
    /// # Errors
    /// See [LedgerRepository::delete_transaction].
    pub fn delete(&mut self, id: TransactionId) -> Result<(), Error> {
        self.ledger.delete_transaction(id)?;
        self.history.refresh(&self.ledger);

        Ok(())
    }

    /// Show the full history instead of the preview.
    pub fn load_all(&mut self) {
        self.history.load_all(&self.ledger);
    }

    /// Reload the employee picker.
    ///
    /// If the employees cannot be queried the picker is left empty.
    pub fn reload_employees(&mut self) {
        self.employees = self.ledger.list_active_employees().unwrap_or_else(|error| {
            tracing::error!("could not load employees: {error}");
            Vec::new()
        });
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        Error, ErrorKind, HistoryMode, LedgerRepository, Settings, Store, employee::Employee,
    };

    use super::{CashForm, CashPage};

    fn get_test_page(settings: &Settings) -> CashPage {
        let ledger = LedgerRepository::new(Store::open_in_memory().unwrap());
        ledger.add_employee("Jane Doe").unwrap();
        CashPage::open(ledger, settings)
    }

    #[test]
    fn opens_with_employees_and_empty_history() {
        let page = get_test_page(&Settings::default());

        assert_eq!(
            page.employees(),
            &[Employee {
                id: 1,
                full_name: "Jane Doe".to_owned()
            }]
        );
        assert!(page.history().entries().is_empty());
        assert_eq!(page.form(), &CashForm::default());
    }

    #[test]
    fn form_starts_on_configured_offset() {
        let settings = Settings {
            default_date_offset: Some(0),
            ..Default::default()
        };

        let page = get_test_page(&settings);

        assert_eq!(page.form().date, Some(settings.today()));
        assert_eq!(page.default_input_date(), Some(settings.today()));
    }

    #[test]
    fn save_resets_form_and_reloads_history() {
        let mut page = get_test_page(&Settings::default());
        *page.form_mut() = CashForm {
            date: Some(date!(2024 - 01 - 06)),
            sum: "-50,00".to_owned(),
            comment: "bonus".to_owned(),
            employee_id: Some(1),
        };
        assert!(page.can_save());

        let id = page.save().unwrap();

        assert_eq!(page.form(), &CashForm::default());
        assert_eq!(page.history().entries()[0].id, id);
        assert_eq!(page.history().entries()[0].sum, Decimal::new(-5000, 2));
        assert_eq!(
            page.history().entries()[0].employee_full_name.as_deref(),
            Some("Jane Doe")
        );
    }

    #[test]
    fn failed_save_keeps_input() {
        let mut page = get_test_page(&Settings::default());
        page.form_mut().date = Some(date!(2024 - 01 - 06));
        page.form_mut().sum = "lots".to_owned();
        assert!(!page.can_save());

        let result = page.save();

        assert_eq!(result.map_err(|error| error.kind()), Err(ErrorKind::Validation));
        assert_eq!(page.form().sum, "lots");
    }

    #[test]
    fn delete_reloads_history() {
        let mut page = get_test_page(&Settings::default());
        page.form_mut().date = Some(date!(2024 - 01 - 05));
        page.form_mut().sum = "100".to_owned();
        let id = page.save().unwrap();

        let (transaction, text) = page.delete_confirmation(id).unwrap();
        assert_eq!(transaction.id, id);
        assert!(text.starts_with("Date: 05 January 2024"));

        page.delete(id).unwrap();

        assert!(page.history().entries().is_empty());
        assert!(page.delete_confirmation(id).is_none());
    }

    #[test]
    fn deleting_missing_record_is_reported() {
        let mut page = get_test_page(&Settings::default());

        let result = page.delete(99);

        assert!(matches!(result, Err(Error::DeleteFailed { id: 99, .. })));
    }

    #[test]
    fn load_all_switches_history_to_full() {
        let settings = Settings {
            preview_size: 1,
            ..Default::default()
        };
        let mut page = get_test_page(&settings);
        for sum in ["1", "2"] {
            page.form_mut().date = Some(date!(2024 - 01 - 05));
            page.form_mut().sum = sum.to_owned();
            page.save().unwrap();
        }
        assert_eq!(page.history().entries().len(), 1);

        page.load_all();

        assert_eq!(page.history().mode(), HistoryMode::Full);
        assert_eq!(page.history().entries().len(), 2);
    }
}
