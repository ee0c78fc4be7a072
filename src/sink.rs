//! Per-item report sinks
//!
//! The comparator hands every non-identical outcome to a [`ReportSink`] as an
//! [`ItemReport`]. The CLI prints them with their `DIR`/`FILE`/... prefixes;
//! tests usually collect them with [`CollectingSink`].
//!
//! Sinks are shared across worker threads when sibling comparisons run in
//! parallel, so they take `&self` and must be `Sync`.

use crate::types::ItemReport;
use parking_lot::Mutex;

/// Receiver of per-item log lines
pub trait ReportSink: Send + Sync {
    /// Called once per reported item
    fn report(&self, item: &ItemReport);
}

impl<F> ReportSink for F
where
    F: Fn(&ItemReport) + Send + Sync,
{
    fn report(&self, item: &ItemReport) {
        self(item)
    }
}

/// Sink that drops every report
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn report(&self, _item: &ItemReport) {}
}

/// Sink that keeps every report in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    items: Mutex<Vec<ItemReport>>,
}

impl CollectingSink {
    /// Create an empty collecting sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the reports collected so far
    pub fn items(&self) -> Vec<ItemReport> {
        self.items.lock().clone()
    }

    /// Take the collected reports, leaving the sink empty
    pub fn take(&self) -> Vec<ItemReport> {
        std::mem::take(&mut *self.items.lock())
    }
}

impl ReportSink for CollectingSink {
    fn report(&self, item: &ItemReport) {
        self.items.lock().push(item.clone());
    }
}
