//! SWIRL front end - Common Types and Utilities
//!
//! This crate contains the error taxonomy and source locations shared by
//! the IR, the front end and the driver.

pub mod error;
pub mod source_loc;

pub use error::{Diagnostic, ErrorReporter, ModuleFailure, Severity, SwirlError};
pub use source_loc::SourceLocation;

/// Result alias used across the workspace
pub type SwirlResult<T> = Result<T, SwirlError>;
