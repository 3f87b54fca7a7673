//! Infrastructure layer: event storage, command dispatch, configuration and
//! the invoice application service.

pub mod command_dispatcher;
pub mod config;
pub mod customers;
pub mod event_store;
pub mod numbering;
pub mod service;


pub use command_dispatcher::{CommandDispatcher, DispatchError, Dispatched};
pub use config::Settings;
pub use customers::{CustomerDirectory, InMemoryCustomerDirectory};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use numbering::InvoiceNumberSequence;
pub use service::{
    INVOICE_AGGREGATE_TYPE, InvoiceChanges, InvoiceService, LineItemInput, NewInvoice, PaymentInput,
};
