//! Human-facing invoice numbers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out `PREFIX-000001`, `PREFIX-000002`, ... in issue order.
///
/// Numbers consumed by commands that are later rejected are not reused, so
/// the sequence may have gaps.
#[derive(Debug)]
pub struct InvoiceNumberSequence {
    prefix: String,
    next: AtomicU64,
}

impl InvoiceNumberSequence {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 1)
    }

    /// Resume a sequence, e.g. after loading the highest issued number.
    pub fn starting_at(prefix: impl Into<String>, first: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(first),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn next_number(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n:06}", self.prefix)
    }
}
