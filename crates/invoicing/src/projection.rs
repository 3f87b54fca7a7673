//! Read-only facts derived from an invoice snapshot.
//!
//! Every function here is pure: it takes an immutable snapshot plus the
//! current time or a display locale, and the caller recomputes whenever the
//! snapshot changes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use billbook_core::{DomainResult, Locale, Money};

use crate::invoice::{Invoice, InvoiceStatus, MAX_LINE_ITEMS};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// `balance > 0 ∧ now > due_date ∧ status ≠ Paid`.
pub fn is_overdue(invoice: &Invoice, now: DateTime<Utc>) -> bool {
    let Some(due) = invoice.due_date() else {
        return false;
    };
    invoice.balance().is_positive() && now > due && invoice.status() != InvoiceStatus::Paid
}

/// Whole days until the due date, rounded up; negative once past due.
pub fn days_until_due(invoice: &Invoice, now: DateTime<Utc>) -> Option<i64> {
    let due = invoice.due_date()?;
    let millis = (due - now).num_milliseconds();
    // ceil(a / b) == -floor(-a / b)
    Some(-(-millis).div_euclid(MILLIS_PER_DAY))
}

pub fn can_add_line_items(invoice: &Invoice) -> bool {
    !invoice.is_deleted()
        && invoice.status() == InvoiceStatus::Draft
        && invoice.line_items().len() < MAX_LINE_ITEMS
}

pub fn can_record_payment(invoice: &Invoice) -> bool {
    !invoice.is_deleted()
        && matches!(invoice.status(), InvoiceStatus::Sent | InvoiceStatus::Paid)
        && invoice.balance().is_positive()
}

pub fn can_delete(invoice: &Invoice) -> bool {
    !invoice.is_deleted() && invoice.status() == InvoiceStatus::Draft
}

pub fn can_send(invoice: &Invoice) -> bool {
    !invoice.is_deleted()
        && invoice.status() == InvoiceStatus::Draft
        && !invoice.line_items().is_empty()
}

/// CSS class for the status badge.
pub fn status_badge_class(invoice: &Invoice, now: DateTime<Utc>) -> &'static str {
    if invoice.is_deleted() {
        return "badge-deleted";
    }
    match invoice.status() {
        InvoiceStatus::Draft => "badge-draft",
        InvoiceStatus::Sent if is_overdue(invoice, now) => "badge-overdue",
        InvoiceStatus::Sent => "badge-sent",
        InvoiceStatus::Paid => "badge-paid",
    }
}

pub fn format_money(amount: Money, locale: Locale) -> String {
    amount.format(locale)
}

pub fn format_date(date: DateTime<Utc>, locale: Locale) -> String {
    date.format(locale.date_pattern()).to_string()
}

/// Every display fact for one snapshot, computed in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub badge_class: &'static str,
    pub is_overdue: bool,
    pub days_until_due: Option<i64>,
    pub can_add_line_items: bool,
    pub can_record_payment: bool,
    pub can_delete: bool,
    pub can_send: bool,
    pub formatted_subtotal: String,
    pub formatted_tax_amount: String,
    pub formatted_total: String,
    pub formatted_amount_paid: String,
    pub formatted_balance: String,
    pub formatted_issue_date: Option<String>,
    pub formatted_due_date: Option<String>,
}

impl InvoiceSummary {
    pub fn build(invoice: &Invoice, now: DateTime<Utc>, locale: Locale) -> DomainResult<Self> {
        let totals = invoice.try_totals()?;
        Ok(Self {
            invoice_number: invoice.invoice_number().to_string(),
            status: invoice.status(),
            badge_class: status_badge_class(invoice, now),
            is_overdue: is_overdue(invoice, now),
            days_until_due: days_until_due(invoice, now),
            can_add_line_items: can_add_line_items(invoice),
            can_record_payment: can_record_payment(invoice),
            can_delete: can_delete(invoice),
            can_send: can_send(invoice),
            formatted_subtotal: format_money(totals.subtotal, locale),
            formatted_tax_amount: format_money(totals.tax_amount, locale),
            formatted_total: format_money(totals.total, locale),
            formatted_amount_paid: format_money(totals.amount_paid, locale),
            formatted_balance: format_money(totals.balance, locale),
            formatted_issue_date: invoice.issue_date().map(|d| format_date(d, locale)),
            formatted_due_date: invoice.due_date().map(|d| format_date(d, locale)),
        })
    }
}
