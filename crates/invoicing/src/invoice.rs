use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billbook_core::{
    Aggregate, AggregateId, AggregateRoot, Currency, CustomerId, DomainError, DomainResult,
    LineItemId, Money, PaymentId, Rate,
};
use billbook_events::Event;

use crate::line_item::{LineItem, Quantity};
use crate::payment::{NewPayment, Payment, PaymentMethod, normalize};

/// Line items an invoice may hold.
pub const MAX_LINE_ITEMS: usize = 100;

/// Longest accepted `notes` / `terms`, in characters.
pub const MAX_TEXT_LEN: usize = 2000;

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Invoice status lifecycle: `Draft → Sent → Paid`, forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seller details printed on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
}

impl CompanyInfo {
    pub(crate) fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("company name must not be empty"));
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(DomainError::validation("company email is malformed"));
            }
        }
        Ok(())
    }
}

/// Monetary figures derived from an invoice's lines, tax rate and payments.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub balance: Money,
}

impl Totals {
    /// `subtotal = Σ line.amount`, `tax = round(subtotal × rate)`,
    /// `total = subtotal + tax`, `balance = total − Σ payment.amount`.
    pub fn compute(
        currency: Currency,
        line_items: &[LineItem],
        tax_rate: Rate,
        payments: &[Payment],
    ) -> DomainResult<Self> {
        let subtotal = Money::sum(currency, line_items.iter().map(LineItem::amount))?;
        let tax_amount = subtotal.multiply_by_rate(tax_rate)?;
        let total = subtotal.add(&tax_amount)?;
        let amount_paid = Money::sum(currency, payments.iter().map(Payment::amount))?;
        let balance = total.subtract(&amount_paid)?;
        Ok(Self {
            subtotal,
            tax_amount,
            total,
            amount_paid,
            balance,
        })
    }

    fn zero(currency: Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            subtotal: zero,
            tax_amount: zero,
            total: zero,
            amount_paid: zero,
            balance: zero,
        }
    }
}

/// Aggregate root: Invoice, with its owned line items and payments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub(crate) id: InvoiceId,
    pub(crate) invoice_number: String,
    pub(crate) customer_id: Option<CustomerId>,
    pub(crate) company_info: Option<CompanyInfo>,
    pub(crate) currency: Currency,
    pub(crate) status: InvoiceStatus,
    pub(crate) line_items: Vec<LineItem>,
    pub(crate) tax_rate: Rate,
    pub(crate) notes: Option<String>,
    pub(crate) terms: Option<String>,
    pub(crate) issue_date: Option<DateTime<Utc>>,
    pub(crate) due_date: Option<DateTime<Utc>>,
    pub(crate) sent_date: Option<DateTime<Utc>>,
    pub(crate) paid_date: Option<DateTime<Utc>>,
    pub(crate) payments: Vec<Payment>,
    pub(crate) deleted_at: Option<DateTime<Utc>>,
    pub(crate) created_at: Option<DateTime<Utc>>,
    pub(crate) updated_at: Option<DateTime<Utc>>,
    pub(crate) version: u64,
    pub(crate) created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            invoice_number: String::new(),
            customer_id: None,
            company_info: None,
            currency: Currency::usd(),
            status: InvoiceStatus::Draft,
            line_items: Vec::new(),
            tax_rate: Rate::zero(),
            notes: None,
            terms: None,
            issue_date: None,
            due_date: None,
            sent_date: None,
            paid_date: None,
            payments: Vec::new(),
            deleted_at: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn company_info(&self) -> Option<&CompanyInfo> {
        self.company_info.as_ref()
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn line_item(&self, id: LineItemId) -> Option<&LineItem> {
        self.line_items.iter().find(|l| l.line_item_id() == id)
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn tax_rate(&self) -> Rate {
        self.tax_rate
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn terms(&self) -> Option<&str> {
        self.terms.as_deref()
    }

    pub fn issue_date(&self) -> Option<DateTime<Utc>> {
        self.issue_date
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn sent_date(&self) -> Option<DateTime<Utc>> {
        self.sent_date
    }

    pub fn paid_date(&self) -> Option<DateTime<Utc>> {
        self.paid_date
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Derived totals, recomputed on every call.
    pub fn try_totals(&self) -> DomainResult<Totals> {
        Totals::compute(self.currency, &self.line_items, self.tax_rate, &self.payments)
    }

    /// Derived totals of a validated snapshot.
    ///
    /// Commands reject any change whose totals overflow and `from_dto` checks
    /// them, so only a hand-edited event stream can fail here. Such a snapshot
    /// reports zero totals; boundary code reads `try_totals` instead.
    pub fn totals(&self) -> Totals {
        self.try_totals()
            .unwrap_or_else(|_| Totals::zero(self.currency))
    }

    pub fn subtotal(&self) -> Money {
        self.totals().subtotal
    }

    pub fn tax_amount(&self) -> Money {
        self.totals().tax_amount
    }

    pub fn total(&self) -> Money {
        self.totals().total
    }

    pub fn amount_paid(&self) -> Money {
        self.totals().amount_paid
    }

    pub fn balance(&self) -> Money {
        self.totals().balance
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub customer_id: CustomerId,
    pub company_info: Option<CompanyInfo>,
    pub currency: Currency,
    pub tax_rate: Option<Rate>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateInvoice. `None` leaves a field unchanged; blank text clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInvoice {
    pub invoice_id: InvoiceId,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLineItem {
    pub invoice_id: InvoiceId,
    pub line_item_id: LineItemId,
    pub description: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLineItem {
    pub invoice_id: InvoiceId,
    pub line_item_id: LineItemId,
    pub description: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLineItem {
    pub invoice_id: InvoiceId,
    pub line_item_id: LineItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkInvoiceAsSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkInvoiceAsSent {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub invoice_id: InvoiceId,
    pub payment_id: PaymentId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteInvoice (soft delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteInvoice {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateInvoice(CreateInvoice),
    UpdateInvoice(UpdateInvoice),
    AddLineItem(AddLineItem),
    UpdateLineItem(UpdateLineItem),
    RemoveLineItem(RemoveLineItem),
    MarkInvoiceAsSent(MarkInvoiceAsSent),
    RecordPayment(RecordPayment),
    DeleteInvoice(DeleteInvoice),
}

impl InvoiceCommand {
    pub fn invoice_id(&self) -> InvoiceId {
        match self {
            InvoiceCommand::CreateInvoice(c) => c.invoice_id,
            InvoiceCommand::UpdateInvoice(c) => c.invoice_id,
            InvoiceCommand::AddLineItem(c) => c.invoice_id,
            InvoiceCommand::UpdateLineItem(c) => c.invoice_id,
            InvoiceCommand::RemoveLineItem(c) => c.invoice_id,
            InvoiceCommand::MarkInvoiceAsSent(c) => c.invoice_id,
            InvoiceCommand::RecordPayment(c) => c.invoice_id,
            InvoiceCommand::DeleteInvoice(c) => c.invoice_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InvoiceCommand::CreateInvoice(_) => "create_invoice",
            InvoiceCommand::UpdateInvoice(_) => "update_invoice",
            InvoiceCommand::AddLineItem(_) => "add_line_item",
            InvoiceCommand::UpdateLineItem(_) => "update_line_item",
            InvoiceCommand::RemoveLineItem(_) => "remove_line_item",
            InvoiceCommand::MarkInvoiceAsSent(_) => "mark_invoice_as_sent",
            InvoiceCommand::RecordPayment(_) => "record_payment",
            InvoiceCommand::DeleteInvoice(_) => "delete_invoice",
        }
    }
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub customer_id: CustomerId,
    pub company_info: Option<CompanyInfo>,
    pub currency: Currency,
    pub tax_rate: Rate,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceUpdated. Carries the resulting metadata values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceUpdated {
    pub invoice_id: InvoiceId,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub due_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemAdded {
    pub invoice_id: InvoiceId,
    pub line_item: LineItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemUpdated {
    pub invoice_id: InvoiceId,
    pub line_item: LineItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRemoved {
    pub invoice_id: InvoiceId,
    pub line_item_id: LineItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSent {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub invoice_id: InvoiceId,
    pub payment: Payment,
    pub new_balance: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoicePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePaid {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDeleted {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    InvoiceUpdated(InvoiceUpdated),
    LineItemAdded(LineItemAdded),
    LineItemUpdated(LineItemUpdated),
    LineItemRemoved(LineItemRemoved),
    InvoiceSent(InvoiceSent),
    PaymentRecorded(PaymentRecorded),
    InvoicePaid(InvoicePaid),
    InvoiceDeleted(InvoiceDeleted),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "invoicing.invoice.created",
            InvoiceEvent::InvoiceUpdated(_) => "invoicing.invoice.updated",
            InvoiceEvent::LineItemAdded(_) => "invoicing.invoice.line_item_added",
            InvoiceEvent::LineItemUpdated(_) => "invoicing.invoice.line_item_updated",
            InvoiceEvent::LineItemRemoved(_) => "invoicing.invoice.line_item_removed",
            InvoiceEvent::InvoiceSent(_) => "invoicing.invoice.sent",
            InvoiceEvent::PaymentRecorded(_) => "invoicing.invoice.payment_recorded",
            InvoiceEvent::InvoicePaid(_) => "invoicing.invoice.paid",
            InvoiceEvent::InvoiceDeleted(_) => "invoicing.invoice.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::InvoiceUpdated(e) => e.occurred_at,
            InvoiceEvent::LineItemAdded(e) => e.occurred_at,
            InvoiceEvent::LineItemUpdated(e) => e.occurred_at,
            InvoiceEvent::LineItemRemoved(e) => e.occurred_at,
            InvoiceEvent::InvoiceSent(e) => e.occurred_at,
            InvoiceEvent::PaymentRecorded(e) => e.occurred_at,
            InvoiceEvent::InvoicePaid(e) => e.occurred_at,
            InvoiceEvent::InvoiceDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.id = e.invoice_id;
                self.invoice_number = e.invoice_number.clone();
                self.customer_id = Some(e.customer_id);
                self.company_info = e.company_info.clone();
                self.currency = e.currency;
                self.status = InvoiceStatus::Draft;
                self.line_items.clear();
                self.tax_rate = e.tax_rate;
                self.notes = e.notes.clone();
                self.terms = e.terms.clone();
                self.issue_date = Some(e.issue_date);
                self.due_date = Some(e.due_date);
                self.payments.clear();
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            InvoiceEvent::InvoiceUpdated(e) => {
                self.notes = e.notes.clone();
                self.terms = e.terms.clone();
                self.due_date = Some(e.due_date);
            }
            InvoiceEvent::LineItemAdded(e) => {
                self.line_items.push(e.line_item.clone());
            }
            InvoiceEvent::LineItemUpdated(e) => {
                let id = e.line_item.line_item_id();
                if let Some(slot) = self.line_items.iter_mut().find(|l| l.line_item_id() == id) {
                    *slot = e.line_item.clone();
                }
            }
            InvoiceEvent::LineItemRemoved(e) => {
                self.line_items.retain(|l| l.line_item_id() != e.line_item_id);
            }
            InvoiceEvent::InvoiceSent(e) => {
                self.status = InvoiceStatus::Sent;
                self.sent_date = Some(e.occurred_at);
            }
            InvoiceEvent::PaymentRecorded(e) => {
                self.payments.push(e.payment.clone());
            }
            InvoiceEvent::InvoicePaid(e) => {
                // Fires once: a replayed or duplicated event never moves paid_date.
                if self.status == InvoiceStatus::Sent {
                    self.status = InvoiceStatus::Paid;
                    self.paid_date = Some(e.occurred_at);
                }
            }
            InvoiceEvent::InvoiceDeleted(e) => {
                self.deleted_at = Some(e.occurred_at);
            }
        }

        self.updated_at = Some(event.occurred_at());
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> DomainResult<Vec<Self::Event>> {
        match command {
            InvoiceCommand::CreateInvoice(cmd) => self.handle_create(cmd),
            InvoiceCommand::UpdateInvoice(cmd) => self.handle_update(cmd),
            InvoiceCommand::AddLineItem(cmd) => self.handle_add_line_item(cmd),
            InvoiceCommand::UpdateLineItem(cmd) => self.handle_update_line_item(cmd),
            InvoiceCommand::RemoveLineItem(cmd) => self.handle_remove_line_item(cmd),
            InvoiceCommand::MarkInvoiceAsSent(cmd) => self.handle_mark_as_sent(cmd),
            InvoiceCommand::RecordPayment(cmd) => self.handle_record_payment(cmd),
            InvoiceCommand::DeleteInvoice(cmd) => self.handle_delete(cmd),
        }
    }
}

fn validate_text(field: &str, value: Option<&str>) -> DomainResult<Option<String>> {
    let value = normalize(value);
    if let Some(v) = &value {
        if v.chars().count() > MAX_TEXT_LEN {
            return Err(DomainError::validation(format!(
                "{field} must be at most {MAX_TEXT_LEN} characters"
            )));
        }
    }
    Ok(value)
}

impl Invoice {
    /// Shared preconditions for every command except creation.
    fn ensure_live(&self, invoice_id: InvoiceId) -> DomainResult<()> {
        if !self.created {
            return Err(DomainError::not_found(format!("invoice {invoice_id}")));
        }
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch"));
        }
        if self.is_deleted() {
            return Err(DomainError::invalid_state("invoice is deleted"));
        }
        Ok(())
    }

    fn ensure_draft(&self, action: &str) -> DomainResult<()> {
        if self.status != InvoiceStatus::Draft {
            return Err(DomainError::invalid_state(format!(
                "cannot {action} on a {} invoice",
                self.status
            )));
        }
        Ok(())
    }

    fn ensure_currency(&self, amount: &Money) -> DomainResult<()> {
        if amount.currency() != self.currency {
            return Err(DomainError::currency_mismatch(
                self.currency.code(),
                amount.currency().code(),
            ));
        }
        Ok(())
    }

    /// Totals over `line_items` must compute and leave a non-negative balance.
    fn ensure_covers_payments(&self, line_items: &[LineItem]) -> DomainResult<()> {
        let totals = Totals::compute(self.currency, line_items, self.tax_rate, &self.payments)?;
        if totals.balance.is_negative() {
            return Err(DomainError::invariant(
                "line item change would leave the balance negative",
            ));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateInvoice) -> DomainResult<Vec<InvoiceEvent>> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }
        if cmd.customer_id.is_nil() {
            return Err(DomainError::validation("customer_id is required"));
        }
        let invoice_number = cmd.invoice_number.trim();
        if invoice_number.is_empty() {
            return Err(DomainError::validation("invoice_number must not be empty"));
        }
        if cmd.issue_date > cmd.due_date {
            return Err(DomainError::validation(
                "issue_date must not be after due_date",
            ));
        }
        let tax_rate = cmd.tax_rate.unwrap_or_default();
        if !tax_rate.is_fraction() {
            return Err(DomainError::validation("tax_rate must be between 0 and 1"));
        }
        if let Some(info) = &cmd.company_info {
            info.validate()?;
        }
        let notes = validate_text("notes", cmd.notes.as_deref())?;
        let terms = validate_text("terms", cmd.terms.as_deref())?;

        Ok(vec![InvoiceEvent::InvoiceCreated(InvoiceCreated {
            invoice_id: cmd.invoice_id,
            invoice_number: invoice_number.to_string(),
            customer_id: cmd.customer_id,
            company_info: cmd.company_info.clone(),
            currency: cmd.currency,
            tax_rate,
            notes,
            terms,
            issue_date: cmd.issue_date,
            due_date: cmd.due_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateInvoice) -> DomainResult<Vec<InvoiceEvent>> {
        self.ensure_live(cmd.invoice_id)?;

        if cmd.notes.is_none() && cmd.terms.is_none() && cmd.due_date.is_none() {
            return Ok(vec![]);
        }

        let notes = match &cmd.notes {
            Some(n) => validate_text("notes", Some(n))?,
            None => self.notes.clone(),
        };
        let terms = match &cmd.terms {
            Some(t) => validate_text("terms", Some(t))?,
            None => self.terms.clone(),
        };
        let current_due = self
            .due_date
            .ok_or_else(|| DomainError::invariant("created invoice has no due_date"))?;
        let due_date = cmd.due_date.unwrap_or(current_due);
        if let Some(issue) = self.issue_date {
            if due_date < issue {
                return Err(DomainError::validation(
                    "due_date must not be before issue_date",
                ));
            }
        }

        Ok(vec![InvoiceEvent::InvoiceUpdated(InvoiceUpdated {
            invoice_id: cmd.invoice_id,
            notes,
            terms,
            due_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line_item(&self, cmd: &AddLineItem) -> DomainResult<Vec<InvoiceEvent>> {
        self.ensure_live(cmd.invoice_id)?;
        self.ensure_draft("add line items")?;

        if self.line_items.len() >= MAX_LINE_ITEMS {
            return Err(DomainError::capacity(format!(
                "invoice already holds {MAX_LINE_ITEMS} line items"
            )));
        }
        if self.line_item(cmd.line_item_id).is_some() {
            return Err(DomainError::conflict("line item id already in use"));
        }
        self.ensure_currency(&cmd.unit_price)?;

        let line_item =
            LineItem::create(cmd.line_item_id, &cmd.description, cmd.quantity, cmd.unit_price)?;

        let mut next = self.line_items.clone();
        next.push(line_item.clone());
        Totals::compute(self.currency, &next, self.tax_rate, &self.payments)?;

        Ok(vec![InvoiceEvent::LineItemAdded(LineItemAdded {
            invoice_id: cmd.invoice_id,
            line_item,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_line_item(&self, cmd: &UpdateLineItem) -> DomainResult<Vec<InvoiceEvent>> {
        self.ensure_live(cmd.invoice_id)?;
        self.ensure_draft("update line items")?;

        let existing = self
            .line_item(cmd.line_item_id)
            .ok_or_else(|| DomainError::not_found(format!("line item {}", cmd.line_item_id)))?;
        self.ensure_currency(&cmd.unit_price)?;

        let line_item = existing.revise(&cmd.description, cmd.quantity, cmd.unit_price)?;

        let next: Vec<LineItem> = self
            .line_items
            .iter()
            .map(|l| {
                if l.line_item_id() == cmd.line_item_id {
                    line_item.clone()
                } else {
                    l.clone()
                }
            })
            .collect();
        self.ensure_covers_payments(&next)?;

        Ok(vec![InvoiceEvent::LineItemUpdated(LineItemUpdated {
            invoice_id: cmd.invoice_id,
            line_item,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_line_item(&self, cmd: &RemoveLineItem) -> DomainResult<Vec<InvoiceEvent>> {
        self.ensure_live(cmd.invoice_id)?;
        self.ensure_draft("remove line items")?;

        if self.line_item(cmd.line_item_id).is_none() {
            return Err(DomainError::not_found(format!(
                "line item {}",
                cmd.line_item_id
            )));
        }
        let next: Vec<LineItem> = self
            .line_items
            .iter()
            .filter(|l| l.line_item_id() != cmd.line_item_id)
            .cloned()
            .collect();
        self.ensure_covers_payments(&next)?;

        Ok(vec![InvoiceEvent::LineItemRemoved(LineItemRemoved {
            invoice_id: cmd.invoice_id,
            line_item_id: cmd.line_item_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_as_sent(&self, cmd: &MarkInvoiceAsSent) -> DomainResult<Vec<InvoiceEvent>> {
        self.ensure_live(cmd.invoice_id)?;
        self.ensure_draft("send")?;

        if self.line_items.is_empty() {
            return Err(DomainError::invalid_state(
                "cannot send an invoice without line items",
            ));
        }

        Ok(vec![InvoiceEvent::InvoiceSent(InvoiceSent {
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_payment(&self, cmd: &RecordPayment) -> DomainResult<Vec<InvoiceEvent>> {
        self.ensure_live(cmd.invoice_id)?;

        if self.status == InvoiceStatus::Draft {
            return Err(DomainError::invalid_state(
                "cannot record a payment on a draft invoice",
            ));
        }
        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        self.ensure_currency(&cmd.amount)?;

        let balance = Totals::compute(self.currency, &self.line_items, self.tax_rate, &self.payments)?
            .balance;
        if cmd.amount > balance {
            return Err(DomainError::overpayment(format!(
                "payment of {} exceeds outstanding balance of {}",
                cmd.amount, balance
            )));
        }
        if self.payments.iter().any(|p| p.payment_id() == cmd.payment_id) {
            return Err(DomainError::conflict("payment id already recorded"));
        }

        let payment = Payment::create(NewPayment {
            id: cmd.payment_id,
            invoice_id: cmd.invoice_id,
            amount: cmd.amount,
            method: cmd.method,
            payment_date: cmd.payment_date,
            reference: cmd.reference.as_deref(),
            notes: cmd.notes.as_deref(),
        })?;
        let new_balance = balance.subtract(&payment.amount())?;

        let mut events = vec![InvoiceEvent::PaymentRecorded(PaymentRecorded {
            invoice_id: cmd.invoice_id,
            payment,
            new_balance,
            occurred_at: cmd.occurred_at,
        })];

        if new_balance.is_zero() && self.status == InvoiceStatus::Sent {
            events.push(InvoiceEvent::InvoicePaid(InvoicePaid {
                invoice_id: cmd.invoice_id,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_delete(&self, cmd: &DeleteInvoice) -> DomainResult<Vec<InvoiceEvent>> {
        self.ensure_live(cmd.invoice_id)?;
        self.ensure_draft("delete")?;

        Ok(vec![InvoiceEvent::InvoiceDeleted(InvoiceDeleted {
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::ErrorKind;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn usd(minor: i64) -> Money {
        Money::from_minor(minor, Currency::usd())
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn test_invoice_id() -> InvoiceId {
        InvoiceId::new(AggregateId::new())
    }

    fn create_cmd(invoice_id: InvoiceId, tax_rate: Rate) -> CreateInvoice {
        CreateInvoice {
            invoice_id,
            invoice_number: "INV-000001".to_string(),
            customer_id: CustomerId::new(),
            company_info: None,
            currency: Currency::usd(),
            tax_rate: Some(tax_rate),
            notes: None,
            terms: Some("Net 30".to_string()),
            issue_date: test_time(),
            due_date: test_time() + Duration::days(30),
            occurred_at: test_time(),
        }
    }

    fn run(invoice: &Invoice, cmd: InvoiceCommand) -> DomainResult<Invoice> {
        invoice.execute(&cmd).map(|(next, _)| next)
    }

    fn draft(tax_rate: Rate) -> Invoice {
        let id = test_invoice_id();
        run(
            &Invoice::empty(id),
            InvoiceCommand::CreateInvoice(create_cmd(id, tax_rate)),
        )
        .unwrap()
    }

    fn add_line(invoice: &Invoice, qty: u32, unit_price: i64) -> DomainResult<Invoice> {
        run(
            invoice,
            InvoiceCommand::AddLineItem(AddLineItem {
                invoice_id: invoice.id_typed(),
                line_item_id: LineItemId::new(),
                description: "Widget".to_string(),
                quantity: Quantity::whole(qty).unwrap(),
                unit_price: usd(unit_price),
                occurred_at: test_time(),
            }),
        )
    }

    fn send(invoice: &Invoice) -> DomainResult<Invoice> {
        run(
            invoice,
            InvoiceCommand::MarkInvoiceAsSent(MarkInvoiceAsSent {
                invoice_id: invoice.id_typed(),
                occurred_at: test_time() + Duration::days(1),
            }),
        )
    }

    fn pay_cmd(invoice: &Invoice, amount: i64, at: DateTime<Utc>) -> InvoiceCommand {
        InvoiceCommand::RecordPayment(RecordPayment {
            invoice_id: invoice.id_typed(),
            payment_id: PaymentId::new(),
            amount: usd(amount),
            method: PaymentMethod::BankTransfer,
            payment_date: at,
            reference: None,
            notes: None,
            occurred_at: at,
        })
    }

    fn pay(invoice: &Invoice, amount: i64) -> DomainResult<Invoice> {
        run(invoice, pay_cmd(invoice, amount, test_time() + Duration::days(2)))
    }

    fn delete(invoice: &Invoice) -> DomainResult<Invoice> {
        run(
            invoice,
            InvoiceCommand::DeleteInvoice(DeleteInvoice {
                invoice_id: invoice.id_typed(),
                occurred_at: test_time(),
            }),
        )
    }

    fn ten_percent() -> Rate {
        Rate::from_ppm(100_000)
    }

    #[test]
    fn create_invoice_emits_invoice_created_event() {
        let id = test_invoice_id();
        let cmd = create_cmd(id, ten_percent());
        let events = Invoice::empty(id)
            .handle(&InvoiceCommand::CreateInvoice(cmd.clone()))
            .unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            InvoiceEvent::InvoiceCreated(e) => {
                assert_eq!(e.invoice_id, id);
                assert_eq!(e.customer_id, cmd.customer_id);
                assert_eq!(e.tax_rate, ten_percent());
                assert_eq!(e.terms.as_deref(), Some("Net 30"));
            }
            _ => panic!("Expected InvoiceCreated event"),
        }
    }

    #[test]
    fn created_invoice_is_an_empty_draft() {
        let invoice = draft(ten_percent());
        assert_eq!(invoice.status(), InvoiceStatus::Draft);
        assert!(invoice.line_items().is_empty());
        assert!(invoice.balance().is_zero());
        assert_eq!(invoice.version(), 1);
    }

    #[test]
    fn create_rejects_due_date_before_issue_date() {
        let id = test_invoice_id();
        let mut cmd = create_cmd(id, ten_percent());
        cmd.due_date = cmd.issue_date - Duration::days(1);
        let err = Invoice::empty(id)
            .handle(&InvoiceCommand::CreateInvoice(cmd))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn create_rejects_tax_rate_above_one() {
        let id = test_invoice_id();
        let cmd = create_cmd(id, Rate::from_ppm(1_000_001));
        let err = Invoice::empty(id)
            .handle(&InvoiceCommand::CreateInvoice(cmd))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn create_rejects_nil_customer_and_duplicate_creation() {
        let id = test_invoice_id();
        let mut cmd = create_cmd(id, ten_percent());
        cmd.customer_id = CustomerId::from_uuid(Default::default());
        let err = Invoice::empty(id)
            .handle(&InvoiceCommand::CreateInvoice(cmd))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let invoice = draft(ten_percent());
        let err = invoice
            .handle(&InvoiceCommand::CreateInvoice(create_cmd(
                invoice.id_typed(),
                ten_percent(),
            )))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn commands_on_missing_invoice_are_not_found() {
        let invoice = Invoice::empty(test_invoice_id());
        let err = send(&invoice).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn reference_scenario_ten_percent_tax() {
        let invoice = draft(ten_percent());
        let invoice = add_line(&invoice, 2, 5_000).unwrap();
        let totals = invoice.totals();
        assert_eq!(totals.subtotal, usd(10_000));
        assert_eq!(totals.tax_amount, usd(1_000));
        assert_eq!(totals.total, usd(11_000));
        assert_eq!(totals.balance, usd(11_000));

        let invoice = send(&invoice).unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Sent);

        let invoice = pay(&invoice, 11_000).unwrap();
        assert!(invoice.balance().is_zero());
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        assert!(invoice.paid_date().is_some());

        let err = pay(&invoice, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overpayment);
    }

    #[test]
    fn add_line_item_requires_draft() {
        let invoice = add_line(&draft(ten_percent()), 1, 100).unwrap();
        let sent = send(&invoice).unwrap();
        let err = add_line(&sent, 1, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn add_line_item_enforces_capacity() {
        let mut invoice = draft(Rate::zero());
        for _ in 0..MAX_LINE_ITEMS {
            invoice = add_line(&invoice, 1, 100).unwrap();
        }
        assert_eq!(invoice.line_items().len(), MAX_LINE_ITEMS);
        let err = add_line(&invoice, 1, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn add_line_item_rejects_foreign_currency() {
        let invoice = draft(Rate::zero());
        let err = run(
            &invoice,
            InvoiceCommand::AddLineItem(AddLineItem {
                invoice_id: invoice.id_typed(),
                line_item_id: LineItemId::new(),
                description: "Import".to_string(),
                quantity: Quantity::whole(1).unwrap(),
                unit_price: Money::from_minor(100, Currency::eur()),
                occurred_at: test_time(),
            }),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CurrencyMismatch);
    }

    #[test]
    fn update_and_remove_line_items() {
        let invoice = add_line(&draft(Rate::zero()), 1, 1_000).unwrap();
        let invoice = add_line(&invoice, 1, 2_000).unwrap();
        let first = invoice.line_items()[0].line_item_id();

        let invoice = run(
            &invoice,
            InvoiceCommand::UpdateLineItem(UpdateLineItem {
                invoice_id: invoice.id_typed(),
                line_item_id: first,
                description: "Widget XL".to_string(),
                quantity: Quantity::whole(3).unwrap(),
                unit_price: usd(1_000),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(invoice.line_items()[0].description(), "Widget XL");
        assert_eq!(invoice.subtotal(), usd(5_000));

        let invoice = run(
            &invoice,
            InvoiceCommand::RemoveLineItem(RemoveLineItem {
                invoice_id: invoice.id_typed(),
                line_item_id: first,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(invoice.line_items().len(), 1);
        assert_eq!(invoice.subtotal(), usd(2_000));

        let err = run(
            &invoice,
            InvoiceCommand::RemoveLineItem(RemoveLineItem {
                invoice_id: invoice.id_typed(),
                line_item_id: first,
                occurred_at: test_time(),
            }),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    fn update_line_cmd(invoice: &Invoice, line_item_id: LineItemId, unit_price: i64) -> InvoiceCommand {
        InvoiceCommand::UpdateLineItem(UpdateLineItem {
            invoice_id: invoice.id_typed(),
            line_item_id,
            description: "Widget".to_string(),
            quantity: Quantity::whole(1).unwrap(),
            unit_price: usd(unit_price),
            occurred_at: test_time(),
        })
    }

    fn remove_line_cmd(invoice: &Invoice, line_item_id: LineItemId) -> InvoiceCommand {
        InvoiceCommand::RemoveLineItem(RemoveLineItem {
            invoice_id: invoice.id_typed(),
            line_item_id,
            occurred_at: test_time(),
        })
    }

    #[test]
    fn update_line_item_requires_draft() {
        let invoice = add_line(&draft(ten_percent()), 1, 1_000).unwrap();
        let line = invoice.line_items()[0].line_item_id();
        let sent = send(&invoice).unwrap();

        let err = run(&sent, update_line_cmd(&sent, line, 500)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(sent.line_items()[0].unit_price(), usd(1_000));
    }

    #[test]
    fn update_unknown_line_item_is_not_found() {
        let invoice = add_line(&draft(ten_percent()), 1, 1_000).unwrap();
        let err = run(&invoice, update_line_cmd(&invoice, LineItemId::new(), 500)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn remove_line_item_requires_draft() {
        let invoice = add_line(&draft(ten_percent()), 1, 1_000).unwrap();
        let line = invoice.line_items()[0].line_item_id();
        let sent = send(&invoice).unwrap();

        let err = run(&sent, remove_line_cmd(&sent, line)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn line_item_changes_never_drop_balance_below_zero() {
        // A draft can only hold payments if a snapshot was assembled by hand.
        let mut invoice = add_line(&draft(Rate::zero()), 1, 1_000).unwrap();
        let line = invoice.line_items()[0].line_item_id();
        invoice.payments.push(
            Payment::create(NewPayment {
                id: PaymentId::new(),
                invoice_id: invoice.id_typed(),
                amount: usd(400),
                method: PaymentMethod::Cash,
                payment_date: test_time(),
                reference: None,
                notes: None,
            })
            .unwrap(),
        );

        let err = run(&invoice, remove_line_cmd(&invoice, line)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        let err = run(&invoice, update_line_cmd(&invoice, line, 399)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);

        let lowered = run(&invoice, update_line_cmd(&invoice, line, 400)).unwrap();
        assert!(lowered.balance().is_zero());
    }

    #[test]
    fn overflowing_totals_surface_as_errors() {
        let mut invoice = add_line(&draft(Rate::zero()), 1, i64::MAX / 2 + 1).unwrap();
        let extra = LineItem::create(
            LineItemId::new(),
            "Overflow",
            Quantity::whole(1).unwrap(),
            usd(i64::MAX / 2 + 1),
        )
        .unwrap();
        invoice.line_items.push(extra);

        assert!(invoice.try_totals().is_err());
        assert!(invoice.to_dto().is_err());
    }

    #[test]
    fn mark_as_sent_requires_line_items() {
        let invoice = draft(ten_percent());
        let err = send(&invoice).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let invoice = add_line(&invoice, 1, 100).unwrap();
        let sent = send(&invoice).unwrap();
        assert_eq!(sent.status(), InvoiceStatus::Sent);
        assert_eq!(sent.sent_date(), Some(test_time() + Duration::days(1)));

        let err = send(&sent).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn record_payment_rejected_on_draft() {
        let invoice = add_line(&draft(Rate::zero()), 1, 1_000).unwrap();
        let err = pay(&invoice, 500).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn record_payment_rejects_non_positive_amounts() {
        let invoice = send(&add_line(&draft(Rate::zero()), 1, 1_000).unwrap()).unwrap();
        for amount in [0, -100] {
            let err = pay(&invoice, amount).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn overpayment_is_rejected_without_partial_application() {
        let invoice = send(&add_line(&draft(Rate::zero()), 1, 1_000).unwrap()).unwrap();
        let err = pay(&invoice, 1_001).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overpayment);
        assert!(invoice.payments().is_empty());
        assert_eq!(invoice.balance(), usd(1_000));
    }

    #[test]
    fn installments_reach_paid_exactly_once() {
        let invoice = send(&add_line(&draft(ten_percent()), 2, 5_000).unwrap()).unwrap();

        let first_at = test_time() + Duration::days(3);
        let invoice = run(&invoice, pay_cmd(&invoice, 6_000, first_at)).unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Sent);
        assert_eq!(invoice.balance(), usd(5_000));
        assert_eq!(invoice.paid_date(), None);

        let second_at = test_time() + Duration::days(10);
        let (invoice, events) = invoice.execute(&pay_cmd(&invoice, 5_000, second_at)).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], InvoiceEvent::InvoicePaid(_)));
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        assert_eq!(invoice.paid_date(), Some(second_at));

        // Re-applying the transition leaves the original paid_date in place.
        let mut replayed = invoice.clone();
        replayed.apply(&InvoiceEvent::InvoicePaid(InvoicePaid {
            invoice_id: invoice.id_typed(),
            occurred_at: second_at + Duration::days(5),
        }));
        assert_eq!(replayed.paid_date(), Some(second_at));
        assert_eq!(replayed.status(), InvoiceStatus::Paid);
    }

    #[test]
    fn delete_only_from_draft() {
        let invoice = add_line(&draft(Rate::zero()), 1, 1_000).unwrap();
        let sent = send(&invoice).unwrap();
        assert_eq!(delete(&sent).unwrap_err().kind(), ErrorKind::InvalidState);

        let paid = pay(&sent, 1_000).unwrap();
        assert_eq!(delete(&paid).unwrap_err().kind(), ErrorKind::InvalidState);

        let deleted = delete(&invoice).unwrap();
        assert!(deleted.is_deleted());
        assert_eq!(deleted.status(), InvoiceStatus::Draft);
    }

    #[test]
    fn deleted_invoice_rejects_every_command() {
        let deleted = delete(&add_line(&draft(Rate::zero()), 1, 1_000).unwrap()).unwrap();
        assert_eq!(add_line(&deleted, 1, 1).unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(send(&deleted).unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(delete(&deleted).unwrap_err().kind(), ErrorKind::InvalidState);
        let err = run(
            &deleted,
            InvoiceCommand::UpdateInvoice(UpdateInvoice {
                invoice_id: deleted.id_typed(),
                notes: Some("late".to_string()),
                terms: None,
                due_date: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn update_invoice_changes_metadata_only() {
        let invoice = add_line(&draft(ten_percent()), 1, 1_000).unwrap();
        let before = invoice.totals();
        let new_due = test_time() + Duration::days(45);

        let updated = run(
            &invoice,
            InvoiceCommand::UpdateInvoice(UpdateInvoice {
                invoice_id: invoice.id_typed(),
                notes: Some("Thanks for your business".to_string()),
                terms: Some("  ".to_string()),
                due_date: Some(new_due),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(updated.notes(), Some("Thanks for your business"));
        assert_eq!(updated.terms(), None);
        assert_eq!(updated.due_date(), Some(new_due));
        assert_eq!(updated.totals(), before);

        let err = run(
            &invoice,
            InvoiceCommand::UpdateInvoice(UpdateInvoice {
                invoice_id: invoice.id_typed(),
                notes: None,
                terms: None,
                due_date: Some(test_time() - Duration::days(1)),
                occurred_at: test_time(),
            }),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let invoice = draft(Rate::zero());
        let (next, events) = invoice
            .execute(&InvoiceCommand::UpdateInvoice(UpdateInvoice {
                invoice_id: invoice.id_typed(),
                notes: None,
                terms: None,
                due_date: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(next, invoice);
    }

    #[test]
    fn paid_invoice_allows_metadata_update() {
        let invoice = send(&add_line(&draft(Rate::zero()), 1, 1_000).unwrap()).unwrap();
        let paid = pay(&invoice, 1_000).unwrap();
        let updated = run(
            &paid,
            InvoiceCommand::UpdateInvoice(UpdateInvoice {
                invoice_id: paid.id_typed(),
                notes: Some("Settled".to_string()),
                terms: None,
                due_date: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(updated.status(), InvoiceStatus::Paid);
        assert_eq!(updated.notes(), Some("Settled"));
    }

    #[test]
    fn replaying_events_rebuilds_the_same_snapshot() {
        let id = test_invoice_id();
        let mut history = Vec::new();
        let mut invoice = Invoice::empty(id);
        let commands = vec![
            InvoiceCommand::CreateInvoice(create_cmd(id, ten_percent())),
            InvoiceCommand::AddLineItem(AddLineItem {
                invoice_id: id,
                line_item_id: LineItemId::new(),
                description: "Hosting".to_string(),
                quantity: Quantity::whole(12).unwrap(),
                unit_price: usd(2_500),
                occurred_at: test_time(),
            }),
            InvoiceCommand::MarkInvoiceAsSent(MarkInvoiceAsSent {
                invoice_id: id,
                occurred_at: test_time(),
            }),
        ];
        for cmd in &commands {
            let (next, events) = invoice.execute(cmd).unwrap();
            history.extend(events);
            invoice = next;
        }

        let mut rebuilt = Invoice::empty(id);
        rebuilt.replay(&history);
        assert_eq!(rebuilt, invoice);
        assert_eq!(rebuilt.version(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: the subtotal is the exact integer sum of line amounts,
        /// independent of insertion order.
        #[test]
        fn subtotal_is_exact_and_order_independent(
            lines in prop::collection::vec((1u32..50u32, 0i64..1_000_000i64), 1..30)
        ) {
            let mut forward = draft(Rate::from_ppm(72_500));
            for (qty, price) in &lines {
                forward = add_line(&forward, *qty, *price).unwrap();
            }
            let mut backward = draft(Rate::from_ppm(72_500));
            for (qty, price) in lines.iter().rev() {
                backward = add_line(&backward, *qty, *price).unwrap();
            }

            let expected: i64 = lines.iter().map(|(q, p)| i64::from(*q) * p).sum();
            prop_assert_eq!(forward.subtotal(), usd(expected));
            prop_assert_eq!(forward.totals(), backward.totals());
        }

        /// Property: the balance never goes negative, whatever payments are attempted.
        #[test]
        fn balance_never_negative(
            payments in prop::collection::vec(1i64..20_000i64, 1..20)
        ) {
            let mut invoice = send(&add_line(&draft(ten_percent()), 3, 10_000).unwrap()).unwrap();
            for amount in payments {
                match pay(&invoice, amount) {
                    Ok(next) => invoice = next,
                    Err(e) => prop_assert_eq!(e.kind(), ErrorKind::Overpayment),
                }
                prop_assert!(!invoice.balance().is_negative());
                prop_assert_eq!(
                    invoice.status() == InvoiceStatus::Paid,
                    invoice.balance().is_zero()
                );
            }
        }
    }
}
