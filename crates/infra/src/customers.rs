//! Customer lookup used to validate invoice creation.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use billbook_core::CustomerId;

/// Read-only view of the customers an invoice may be issued to.
pub trait CustomerDirectory: Send + Sync {
    fn exists(&self, customer_id: CustomerId) -> bool;
}

impl<D> CustomerDirectory for Arc<D>
where
    D: CustomerDirectory + ?Sized,
{
    fn exists(&self, customer_id: CustomerId) -> bool {
        (**self).exists(customer_id)
    }
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCustomerDirectory {
    customers: RwLock<HashSet<CustomerId>>,
}

impl InMemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customers(customers: impl IntoIterator<Item = CustomerId>) -> Self {
        Self {
            customers: RwLock::new(customers.into_iter().collect()),
        }
    }

    /// Register a customer. Returns `false` if it was already known.
    pub fn register(&self, customer_id: CustomerId) -> bool {
        match self.customers.write() {
            Ok(mut guard) => guard.insert(customer_id),
            Err(poisoned) => poisoned.into_inner().insert(customer_id),
        }
    }
}

impl CustomerDirectory for InMemoryCustomerDirectory {
    fn exists(&self, customer_id: CustomerId) -> bool {
        match self.customers.read() {
            Ok(guard) => guard.contains(&customer_id),
            Err(poisoned) => poisoned.into_inner().contains(&customer_id),
        }
    }
}
