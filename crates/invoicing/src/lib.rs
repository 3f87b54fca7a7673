//! Invoicing domain module (event-sourced).
//!
//! Business rules for invoices, their line items and the payments applied to
//! them, implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod dto;
pub mod invoice;
pub mod line_item;
pub mod payment;
pub mod projection;

pub use dto::{InvoiceDto, LineItemDto, PaymentDto};
pub use invoice::{
    AddLineItem, CompanyInfo, CreateInvoice, DeleteInvoice, Invoice, InvoiceCommand,
    InvoiceCreated, InvoiceDeleted, InvoiceEvent, InvoiceId, InvoicePaid, InvoiceSent,
    InvoiceStatus, InvoiceUpdated, LineItemAdded, LineItemRemoved, LineItemUpdated,
    MAX_LINE_ITEMS, MarkInvoiceAsSent, PaymentRecorded, RecordPayment, RemoveLineItem, Totals,
    UpdateInvoice, UpdateLineItem,
};
pub use line_item::{LineItem, Quantity};
pub use payment::{NewPayment, Payment, PaymentMethod};
pub use projection::InvoiceSummary;
