//! Reporter trait for dependency injection
//!
//! This trait lets catalog and build logic report progress, warnings, and
//! build messages without being coupled to a specific output surface.

pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Refreshing").
    fn section(&self, title: &str);

    /// Scope marker for a unit of build work, with its source path as
    /// context (e.g. `job("building package alpha", "/src/alpha")`).
    fn job(&self, label: &str, context: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message. Warnings are non-fatal by definition.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title)
    }
    fn job(&self, label: &str, context: &str) {
        (**self).job(label, context)
    }
    fn info(&self, msg: &str) {
        (**self).info(msg)
    }
    fn success(&self, msg: &str) {
        (**self).success(msg)
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg)
    }
    fn error(&self, msg: &str) {
        (**self).error(msg)
    }
}

/// Plain line-oriented console reporter used by the CLI.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!("==> {title}");
    }
    fn job(&self, label: &str, context: &str) {
        println!("  {label} ({context})");
    }
    fn info(&self, msg: &str) {
        println!("  {msg}");
    }
    fn success(&self, msg: &str) {
        println!("✓ {msg}");
    }
    fn warning(&self, msg: &str) {
        eprintln!("warning: {msg}");
    }
    fn error(&self, msg: &str) {
        eprintln!("error: {msg}");
    }
}

/// Discards everything. Useful in tests and embedding contexts.
#[derive(Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _title: &str) {}
    fn job(&self, _label: &str, _context: &str) {}
    fn info(&self, _msg: &str) {}
    fn success(&self, _msg: &str) {}
    fn warning(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}
