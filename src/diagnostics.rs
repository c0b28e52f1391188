//! Structured failure reporting.
//!
//! Every error raised by the crate passes through [`Diagnostics::fail`], which
//! hands a [`DiagnosticRecord`] to the registered sink (if any) before the
//! error propagates to the caller. The sink is carried by value: a list owns
//! one, and the bridge operations borrow the one of the list they work on.
use std::fmt;
use std::panic::Location;
use std::sync::{Arc, Mutex};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub error_class_name: String,
    pub message: String,
    pub tag: String,
    pub context: String,
    pub call_site: String,
}

/// Observer for failures. Must not alter the outcome.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, record: &DiagnosticRecord);
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for CollectingSink {
    fn record(&self, record: &DiagnosticRecord) {
        let mut guard = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(record.clone());
    }
}

/// Handle to an optional sink. Cheap to clone.
#[derive(Clone, Default)]
pub struct Diagnostics {
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("sink", &self.sink.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Diagnostics {
    pub fn none() -> Self {
        Self { sink: None }
    }

    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Reports `error` and gives it back for propagation.
    #[track_caller]
    pub fn fail(&self, tag: &str, context: impl fmt::Display, error: Error) -> Error {
        let caller = Location::caller();
        let record = DiagnosticRecord {
            error_class_name: error.class_name().to_string(),
            message: error.to_string(),
            tag: tag.to_string(),
            context: context.to_string(),
            call_site: format!("{}:{}", caller.file(), caller.line()),
        };
        tracing::debug!(
            class = %record.error_class_name,
            tag = %record.tag,
            context = %record.context,
            call_site = %record.call_site,
            "{}",
            record.message
        );
        if let Some(sink) = &self.sink {
            sink.record(&record);
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn sink_observes_record_and_error_is_returned() {
        let sink = Arc::new(CollectingSink::new());
        let diagnostics = Diagnostics::with_sink(sink.clone());
        let err = diagnostics.fail("add", "key `a`", ErrorKind::DuplicateKey("a".into()).into());
        assert!(matches!(err.kind(), ErrorKind::DuplicateKey(k) if k == "a"));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].error_class_name, "DuplicateKey");
        assert_eq!(records[0].tag, "add");
        assert_eq!(records[0].context, "key `a`");
        assert!(records[0].call_site.contains("diagnostics.rs"));
    }

    #[test]
    fn no_sink_is_a_no_op() {
        let diagnostics = Diagnostics::none();
        let err = diagnostics.fail("add", "", ErrorKind::InvalidIdentifier("1x".into()).into());
        assert_eq!(err.class_name(), "InvalidIdentifier");
    }
}
