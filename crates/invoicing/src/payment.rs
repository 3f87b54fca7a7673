//! Payments applied against an invoice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult, Entity, Money, PaymentId};

use crate::invoice::InvoiceId;

pub const MAX_REFERENCE_LEN: usize = 100;
pub const MAX_PAYMENT_NOTES_LEN: usize = 1000;

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Check,
    BankTransfer,
    CreditCard,
    DebitCard,
    Other,
}

/// A payment recorded against an invoice. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    invoice_id: InvoiceId,
    amount: Money,
    method: PaymentMethod,
    payment_date: DateTime<Utc>,
    reference: Option<String>,
    notes: Option<String>,
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for [`Payment::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment<'a> {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
    pub reference: Option<&'a str>,
    pub notes: Option<&'a str>,
}

impl Payment {
    pub fn create(input: NewPayment<'_>) -> DomainResult<Self> {
        if !input.amount.is_positive() {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        let reference = normalize(input.reference);
        if let Some(r) = &reference {
            if r.chars().count() > MAX_REFERENCE_LEN {
                return Err(DomainError::validation(format!(
                    "payment reference must be at most {MAX_REFERENCE_LEN} characters"
                )));
            }
        }

        let notes = normalize(input.notes);
        if let Some(n) = &notes {
            if n.chars().count() > MAX_PAYMENT_NOTES_LEN {
                return Err(DomainError::validation(format!(
                    "payment notes must be at most {MAX_PAYMENT_NOTES_LEN} characters"
                )));
            }
        }

        Ok(Self {
            id: input.id,
            invoice_id: input.invoice_id,
            amount: input.amount,
            method: input.method,
            payment_date: input.payment_date,
            reference,
            notes,
        })
    }

    pub fn payment_id(&self) -> PaymentId {
        self.id
    }

    pub fn invoice_id(&self) -> InvoiceId {
        self.invoice_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn payment_date(&self) -> DateTime<Utc> {
        self.payment_date
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

/// Blank optional text is treated as absent.
pub(crate) fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
