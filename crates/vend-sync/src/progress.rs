//! # Import Progress
//!
//! Observational progress hooks. Nothing here affects what is written.
//!
//! ```text
//! Outlets..
//! Products.......
//! RegisterSales....
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use vend_core::inflect::pluralize;

/// Receives progress notifications from the importer.
pub trait ImportProgress: Send + Sync {
    /// A class pass is starting.
    fn class_started(&self, class_name: &str);

    /// One resource was flattened.
    fn resource_consumed(&self);

    /// A class pass ended, successfully or not.
    fn class_finished(&self, class_name: &str);
}

/// No-op progress reporter for tests and quiet runs.
pub struct NoOpProgress;

impl ImportProgress for NoOpProgress {
    fn class_started(&self, _class_name: &str) {}
    fn resource_consumed(&self) {}
    fn class_finished(&self, _class_name: &str) {}
}

/// Prints the plural class name, a dot per resource, then a newline.
#[derive(Default)]
pub struct ConsoleProgress {
    consumed: AtomicU64,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resources seen since this reporter was created.
    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }
}

impl ImportProgress for ConsoleProgress {
    fn class_started(&self, class_name: &str) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "{}", pluralize(class_name));
        let _ = out.flush();
    }

    fn resource_consumed(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
        let mut out = std::io::stdout().lock();
        let _ = write!(out, ".");
        let _ = out.flush();
    }

    fn class_finished(&self, _class_name: &str) {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_progress_counts_resources() {
        let progress = ConsoleProgress::new();
        progress.class_started("RegisterSale");
        progress.resource_consumed();
        progress.resource_consumed();
        progress.class_finished("RegisterSale");
        assert_eq!(progress.consumed(), 2);
    }

    #[test]
    fn test_plural_class_names() {
        assert_eq!(pluralize("RegisterSale"), "RegisterSales");
        assert_eq!(pluralize("Tax"), "Taxes");
    }
}
