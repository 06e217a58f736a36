//! Extension point for extra preparation work.

use vista_core::Record;

/// Work run by the preparer on every package before it is filtered, for
/// example warming a thumbnail cache or loading data a custom view needs.
///
/// Hooks run on the blocking pool and may perform I/O. They see every package
/// while registered, whatever the current filter needs.
pub trait PrepareHook: Send + Sync {
    fn prepare(&self, records: &[Record]);
}

impl<F> PrepareHook for F
where
    F: Fn(&[Record]) + Send + Sync,
{
    fn prepare(&self, records: &[Record]) {
        self(records)
    }
}
