//! Formats ledger values for display.

use rust_decimal::{Decimal, RoundingStrategy};
use time::{Date, macros::format_description};

use crate::cash_transaction::CashTransaction;

/// Format an amount with two decimal places and a leading sign for expenses,
/// e.g. "1500.00" or "-50.50".
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    format!("{rounded:.2}")
}

/// Format a date as e.g. "05 January 2024".
pub fn format_date(date: Date) -> String {
    date.format(format_description!("[day] [month repr:long] [year]"))
        .unwrap_or_else(|_| date.to_string())
}

/// The summary shown to the user before `transaction` is deleted.
pub fn confirmation_text(transaction: &CashTransaction) -> String {
    format!(
        "Date: {}\nSum: {}\nComment: {}\nEmployee: {}",
        format_date(transaction.date),
        format_amount(transaction.sum),
        transaction.comment.as_deref().unwrap_or(""),
        transaction.employee_full_name.as_deref().unwrap_or(""),
    )
}
