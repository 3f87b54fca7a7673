//! Invoice application service.
//!
//! Turns caller intent into fully stamped commands (ids, invoice numbers,
//! clock time), runs them through the [`CommandDispatcher`] and hands back
//! the resulting snapshot. Queries rehydrate from the store on every call.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use billbook_core::{
    AggregateId, AggregateRoot, Clock, Currency, CustomerId, DomainError, LineItemId, Locale,
    Money, PaymentId, Rate,
};
use billbook_events::Event;
use billbook_invoicing::{
    AddLineItem, CompanyInfo, CreateInvoice, DeleteInvoice, Invoice, InvoiceCommand, InvoiceDto,
    InvoiceId, InvoiceSummary, MarkInvoiceAsSent, PaymentMethod, Quantity, RecordPayment,
    RemoveLineItem, UpdateInvoice, UpdateLineItem,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::Settings;
use crate::customers::CustomerDirectory;
use crate::event_store::EventStore;
use crate::numbering::InvoiceNumberSequence;

/// Stream type recorded with every invoice event.
pub const INVOICE_AGGREGATE_TYPE: &str = "invoicing.invoice";

/// Input for [`InvoiceService::create_invoice`].
///
/// Omitted values fall back to [`Settings`]: the default currency, an issue
/// date of now and a due date `default_payment_terms_days` after issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub customer_id: CustomerId,
    pub company_info: Option<CompanyInfo>,
    pub currency: Option<Currency>,
    pub tax_rate: Option<Rate>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewInvoice {
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            company_info: None,
            currency: None,
            tax_rate: None,
            notes: None,
            terms: None,
            issue_date: None,
            due_date: None,
        }
    }
}

/// Metadata changes; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceChanges {
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: Quantity,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInput {
    pub amount: Money,
    pub method: PaymentMethod,
    /// Defaults to now.
    pub payment_date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

pub struct InvoiceService<S, D, C> {
    dispatcher: CommandDispatcher<S>,
    customers: D,
    clock: C,
    numbers: InvoiceNumberSequence,
    settings: Settings,
}

impl<S, D, C> InvoiceService<S, D, C>
where
    S: EventStore,
    D: CustomerDirectory,
    C: Clock,
{
    pub fn new(store: S, customers: D, clock: C, settings: Settings) -> Self {
        let numbers = InvoiceNumberSequence::new(settings.invoice_number_prefix.trim());
        Self {
            dispatcher: CommandDispatcher::new(store),
            customers,
            clock,
            numbers,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        self.dispatcher.store()
    }

    pub fn create_invoice(&self, input: NewInvoice) -> Result<(InvoiceId, Invoice), DispatchError> {
        let now = self.clock.now();
        let invoice_id = InvoiceId::new(AggregateId::new());

        if !self.customers.exists(input.customer_id) {
            let err = DispatchError::from(DomainError::not_found(format!(
                "customer {}",
                input.customer_id
            )));
            warn!(
                invoice_id = %invoice_id,
                customer_id = %input.customer_id,
                command = "create_invoice",
                kind = err.label(),
                "command rejected"
            );
            return Err(err);
        }

        let issue_date = input.issue_date.unwrap_or(now);
        let due_date = input.due_date.unwrap_or_else(|| {
            issue_date + Duration::days(i64::from(self.settings.default_payment_terms_days))
        });

        let invoice = self.execute(InvoiceCommand::CreateInvoice(CreateInvoice {
            invoice_id,
            invoice_number: self.numbers.next_number(),
            customer_id: input.customer_id,
            company_info: input.company_info,
            currency: input.currency.unwrap_or(self.settings.default_currency),
            tax_rate: input.tax_rate,
            notes: input.notes,
            terms: input.terms,
            issue_date,
            due_date,
            occurred_at: now,
        }))?;
        Ok((invoice_id, invoice))
    }

    pub fn update_invoice(
        &self,
        invoice_id: InvoiceId,
        changes: InvoiceChanges,
    ) -> Result<Invoice, DispatchError> {
        self.execute(InvoiceCommand::UpdateInvoice(UpdateInvoice {
            invoice_id,
            notes: changes.notes,
            terms: changes.terms,
            due_date: changes.due_date,
            occurred_at: self.clock.now(),
        }))
    }

    pub fn add_line_item(
        &self,
        invoice_id: InvoiceId,
        line: LineItemInput,
    ) -> Result<(LineItemId, Invoice), DispatchError> {
        let line_item_id = LineItemId::new();
        let invoice = self.execute(InvoiceCommand::AddLineItem(AddLineItem {
            invoice_id,
            line_item_id,
            description: line.description,
            quantity: line.quantity,
            unit_price: line.unit_price,
            occurred_at: self.clock.now(),
        }))?;
        Ok((line_item_id, invoice))
    }

    pub fn update_line_item(
        &self,
        invoice_id: InvoiceId,
        line_item_id: LineItemId,
        line: LineItemInput,
    ) -> Result<Invoice, DispatchError> {
        self.execute(InvoiceCommand::UpdateLineItem(UpdateLineItem {
            invoice_id,
            line_item_id,
            description: line.description,
            quantity: line.quantity,
            unit_price: line.unit_price,
            occurred_at: self.clock.now(),
        }))
    }

    pub fn remove_line_item(
        &self,
        invoice_id: InvoiceId,
        line_item_id: LineItemId,
    ) -> Result<Invoice, DispatchError> {
        self.execute(InvoiceCommand::RemoveLineItem(RemoveLineItem {
            invoice_id,
            line_item_id,
            occurred_at: self.clock.now(),
        }))
    }

    pub fn mark_as_sent(&self, invoice_id: InvoiceId) -> Result<Invoice, DispatchError> {
        self.execute(InvoiceCommand::MarkInvoiceAsSent(MarkInvoiceAsSent {
            invoice_id,
            occurred_at: self.clock.now(),
        }))
    }

    pub fn record_payment(
        &self,
        invoice_id: InvoiceId,
        payment: PaymentInput,
    ) -> Result<(PaymentId, Invoice), DispatchError> {
        let now = self.clock.now();
        let payment_id = PaymentId::new();
        let invoice = self.execute(InvoiceCommand::RecordPayment(RecordPayment {
            invoice_id,
            payment_id,
            amount: payment.amount,
            method: payment.method,
            payment_date: payment.payment_date.unwrap_or(now),
            reference: payment.reference,
            notes: payment.notes,
            occurred_at: now,
        }))?;
        Ok((payment_id, invoice))
    }

    pub fn delete_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, DispatchError> {
        self.execute(InvoiceCommand::DeleteInvoice(DeleteInvoice {
            invoice_id,
            occurred_at: self.clock.now(),
        }))
    }

    /// Current snapshot, deleted invoices included.
    pub fn invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, DispatchError> {
        let invoice = self.dispatcher.load(invoice_id.0, |id| Invoice::empty(InvoiceId::new(id)))?;
        if !invoice.is_created() {
            return Err(DomainError::not_found(format!("invoice {invoice_id}")).into());
        }
        Ok(invoice)
    }

    pub fn get_invoice(&self, invoice_id: InvoiceId) -> Result<InvoiceDto, DispatchError> {
        Ok(self.invoice(invoice_id)?.to_dto()?)
    }

    /// Display facts for the invoice as of the service clock's now.
    ///
    /// `None` formats with the configured `default_locale`.
    pub fn summary(
        &self,
        invoice_id: InvoiceId,
        locale: Option<Locale>,
    ) -> Result<InvoiceSummary, DispatchError> {
        let invoice = self.invoice(invoice_id)?;
        let locale = locale.unwrap_or(self.settings.default_locale);
        Ok(InvoiceSummary::build(&invoice, self.clock.now(), locale)?)
    }

    fn execute(&self, command: InvoiceCommand) -> Result<Invoice, DispatchError> {
        let invoice_id = command.invoice_id();
        let name = command.name();

        match self.dispatcher.dispatch(
            invoice_id.0,
            INVOICE_AGGREGATE_TYPE,
            command,
            |id| Invoice::empty(InvoiceId::new(id)),
        ) {
            Ok(outcome) if outcome.events.is_empty() => {
                debug!(invoice_id = %invoice_id, command = name, "command changed nothing");
                Ok(outcome.aggregate)
            }
            Ok(outcome) => {
                let event_types: Vec<&'static str> =
                    outcome.events.iter().map(|e| e.payload().event_type()).collect();
                info!(
                    invoice_id = %invoice_id,
                    command = name,
                    events = ?event_types,
                    version = outcome.aggregate.version(),
                    status = %outcome.aggregate.status(),
                    "command committed"
                );
                Ok(outcome.aggregate)
            }
            Err(err) => {
                warn!(
                    invoice_id = %invoice_id,
                    command = name,
                    kind = err.label(),
                    error = %err,
                    "command rejected"
                );
                Err(err)
            }
        }
    }
}
