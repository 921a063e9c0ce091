//! Building local packages: artifacts, the compiler seam, and the lazy
//! build driver.

pub mod artifact;
mod builder;
mod compile;

pub use artifact::BuiltPackage;
pub use builder::local_version_of;
pub use compile::{BuildOrderConstraint, CompileError, Compiler, SourceCompiler};
