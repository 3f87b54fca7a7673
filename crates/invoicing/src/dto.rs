//! Boundary snapshot of an invoice.
//!
//! Monetary fields are plain numbers in major units (`110.0` dollars). Inside
//! the domain everything stays in integer minor units; conversion happens only
//! here, and converting back rounds to the nearest minor unit so a snapshot
//! survives the trip unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billbook_core::{
    Currency, CustomerId, DomainError, DomainResult, LineItemId, Money, PaymentId, Rate,
};

use crate::invoice::{CompanyInfo, Invoice, InvoiceId, InvoiceStatus, MAX_LINE_ITEMS, Totals};
use crate::line_item::{LineItem, Quantity};
use crate::payment::{NewPayment, Payment, PaymentMethod};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDto {
    pub id: LineItemId,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: f64,
    pub payment_method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDto {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub customer_id: CustomerId,
    pub company_info: Option<CompanyInfo>,
    pub currency: Currency,
    pub status: InvoiceStatus,
    pub line_items: Vec<LineItemDto>,
    pub payments: Vec<PaymentDto>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub amount_paid: f64,
    pub balance: f64,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub sent_date: Option<DateTime<Utc>>,
    pub paid_date: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl From<&LineItem> for LineItemDto {
    fn from(line: &LineItem) -> Self {
        Self {
            id: line.line_item_id(),
            description: line.description().to_string(),
            quantity: line.quantity().as_f64(),
            unit_price: line.unit_price().to_major(),
            amount: line.amount().to_major(),
        }
    }
}

impl From<&Payment> for PaymentDto {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.payment_id(),
            invoice_id: payment.invoice_id(),
            amount: payment.amount().to_major(),
            payment_method: payment.method(),
            payment_date: payment.payment_date(),
            reference: payment.reference().map(str::to_string),
            notes: payment.notes().map(str::to_string),
        }
    }
}

impl TryFrom<&Invoice> for InvoiceDto {
    type Error = DomainError;

    /// Only created invoices have a snapshot to expose.
    fn try_from(invoice: &Invoice) -> Result<Self, Self::Error> {
        let missing = |field: &str| DomainError::invariant(format!("created invoice has no {field}"));
        if !invoice.is_created() {
            return Err(DomainError::not_found(format!("invoice {}", invoice.id_typed())));
        }
        let totals = invoice.try_totals()?;
        Ok(Self {
            id: invoice.id_typed(),
            invoice_number: invoice.invoice_number().to_string(),
            customer_id: invoice.customer_id().ok_or_else(|| missing("customer_id"))?,
            company_info: invoice.company_info().cloned(),
            currency: invoice.currency(),
            status: invoice.status(),
            line_items: invoice.line_items().iter().map(LineItemDto::from).collect(),
            payments: invoice.payments().iter().map(PaymentDto::from).collect(),
            subtotal: totals.subtotal.to_major(),
            tax_rate: invoice.tax_rate().as_f64(),
            tax_amount: totals.tax_amount.to_major(),
            total: totals.total.to_major(),
            amount_paid: totals.amount_paid.to_major(),
            balance: totals.balance.to_major(),
            notes: invoice.notes().map(str::to_string),
            terms: invoice.terms().map(str::to_string),
            issue_date: invoice.issue_date().ok_or_else(|| missing("issue_date"))?,
            due_date: invoice.due_date().ok_or_else(|| missing("due_date"))?,
            sent_date: invoice.sent_date(),
            paid_date: invoice.paid_date(),
            deleted_at: invoice.deleted_at(),
            created_at: invoice.created_at(),
            updated_at: invoice.updated_at(),
            version: invoice.version,
        })
    }
}

impl TryFrom<InvoiceDto> for Invoice {
    type Error = DomainError;

    /// Rebuild a snapshot. Recomputed totals must match the figures the DTO
    /// carried, and the lifecycle fields must describe a state the invoice
    /// could have reached through commands.
    fn try_from(dto: InvoiceDto) -> Result<Self, Self::Error> {
        let currency = dto.currency;
        let money = |amount: f64| Money::from_major(amount, currency);

        if dto.invoice_number.trim().is_empty() {
            return Err(DomainError::validation("invoice_number must not be empty"));
        }
        if dto.customer_id.is_nil() {
            return Err(DomainError::validation("customer_id is required"));
        }
        if let Some(info) = &dto.company_info {
            info.validate()?;
        }
        if dto.issue_date > dto.due_date {
            return Err(DomainError::validation(
                "issue_date must not be after due_date",
            ));
        }
        if dto.status == InvoiceStatus::Draft && dto.line_items.len() > MAX_LINE_ITEMS {
            return Err(DomainError::capacity(format!(
                "draft invoice holds more than {MAX_LINE_ITEMS} line items"
            )));
        }
        if let Some(foreign) = dto.payments.iter().find(|p| p.invoice_id != dto.id) {
            return Err(DomainError::validation(format!(
                "payment {} belongs to invoice {}",
                foreign.id, foreign.invoice_id
            )));
        }

        let line_items = dto
            .line_items
            .into_iter()
            .map(|l| -> DomainResult<LineItem> {
                let rebuilt = LineItem::create(
                    l.id,
                    &l.description,
                    Quantity::from_f64(l.quantity)?,
                    money(l.unit_price)?,
                )?;
                let amount = money(l.amount)?;
                if rebuilt.amount() != amount {
                    return Err(DomainError::validation(format!(
                        "line item {} amount does not match quantity × unit_price",
                        l.id
                    )));
                }
                Ok(rebuilt)
            })
            .collect::<DomainResult<Vec<_>>>()?;

        let payments = dto
            .payments
            .into_iter()
            .map(|p| -> DomainResult<Payment> {
                Payment::create(NewPayment {
                    id: p.id,
                    invoice_id: p.invoice_id,
                    amount: money(p.amount)?,
                    method: p.payment_method,
                    payment_date: p.payment_date,
                    reference: p.reference.as_deref(),
                    notes: p.notes.as_deref(),
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        let tax_rate = Rate::from_f64(dto.tax_rate)?;
        if !tax_rate.is_fraction() {
            return Err(DomainError::validation("tax_rate must be between 0 and 1"));
        }

        let totals = Totals::compute(currency, &line_items, tax_rate, &payments)?;
        let carried = Totals {
            subtotal: money(dto.subtotal)?,
            tax_amount: money(dto.tax_amount)?,
            total: money(dto.total)?,
            amount_paid: money(dto.amount_paid)?,
            balance: money(dto.balance)?,
        };
        if totals != carried {
            return Err(DomainError::validation(
                "invoice totals do not match its line items and payments",
            ));
        }
        if totals.balance.is_negative() {
            return Err(DomainError::invariant("invoice balance is negative"));
        }
        check_lifecycle(
            dto.status,
            [dto.sent_date, dto.paid_date, dto.deleted_at],
            !payments.is_empty(),
            &totals,
        )?;

        Ok(Invoice {
            id: dto.id,
            invoice_number: dto.invoice_number,
            customer_id: Some(dto.customer_id),
            company_info: dto.company_info,
            currency,
            status: dto.status,
            line_items,
            tax_rate,
            notes: dto.notes,
            terms: dto.terms,
            issue_date: Some(dto.issue_date),
            due_date: Some(dto.due_date),
            sent_date: dto.sent_date,
            paid_date: dto.paid_date,
            payments,
            deleted_at: dto.deleted_at,
            created_at: dto.created_at,
            updated_at: dto.updated_at,
            version: dto.version,
            created: true,
        })
    }
}

/// Status and lifecycle stamps (`[sent, paid, deleted]`) must agree.
fn check_lifecycle(
    status: InvoiceStatus,
    [sent, paid, deleted]: [Option<DateTime<Utc>>; 3],
    has_payments: bool,
    totals: &Totals,
) -> DomainResult<()> {
    let inconsistent = |why: &str| -> DomainResult<()> {
        Err(DomainError::validation(format!("{status} invoice {why}")))
    };
    match status {
        InvoiceStatus::Draft => {
            if has_payments {
                return inconsistent("carries payments");
            }
            if sent.is_some() || paid.is_some() {
                return inconsistent("carries a sent or paid date");
            }
        }
        InvoiceStatus::Sent => {
            if sent.is_none() {
                return inconsistent("has no sent date");
            }
            if paid.is_some() {
                return inconsistent("carries a paid date");
            }
            // A zero-total invoice can be sent, but payments stop at a zero balance.
            if has_payments && totals.balance.is_zero() {
                return inconsistent("is fully paid");
            }
        }
        InvoiceStatus::Paid => {
            if sent.is_none() || paid.is_none() {
                return inconsistent("is missing its sent or paid date");
            }
            if !totals.balance.is_zero() {
                return inconsistent("has an outstanding balance");
            }
        }
    }
    if deleted.is_some() && status != InvoiceStatus::Draft {
        return inconsistent("is marked deleted");
    }
    Ok(())
}

impl Invoice {
    pub fn to_dto(&self) -> DomainResult<InvoiceDto> {
        InvoiceDto::try_from(self)
    }

    pub fn from_dto(dto: InvoiceDto) -> DomainResult<Self> {
        Self::try_from(dto)
    }
}
