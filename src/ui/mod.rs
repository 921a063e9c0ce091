//! User-facing output.

mod reporter;

pub use reporter::{ConsoleReporter, NullReporter, Reporter};
