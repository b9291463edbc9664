//! Error handling for the SWIRL front end
//!
//! This module defines the error taxonomy shared by parsing, lowering,
//! the passes and the module merger, plus a small reporter the driver uses
//! to collect and summarise diagnostics.

use crate::source_loc::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type that encompasses every phase of IR construction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwirlError {
    /// Malformed text in either dialect
    #[error("Syntax error at {location}: {message}")]
    Syntax {
        location: SourceLocation,
        message: String,
    },

    /// An operand names a value that is not (yet) in scope
    #[error("Unresolved name '{name}' in {scope}")]
    UnresolvedName { name: String, scope: String },

    /// Two values, or two body-bearing functions, claim one identity
    #[error("Duplicate name '{name}' in {scope}")]
    DuplicateName { name: String, scope: String },

    /// Conflicting definitions across modules during whole-program assembly
    #[error("Merge conflict for '{name}': {message}")]
    Merge { name: String, message: String },

    /// A pass produced IR that breaks a structural invariant
    #[error("Invariant violation in '{function}': {message}")]
    InvariantViolation { function: String, message: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl SwirlError {
    /// Create a syntax error
    pub fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        SwirlError::Syntax {
            location,
            message: message.into(),
        }
    }

    /// Create an unresolved-name error
    pub fn unresolved(name: &str, scope: &str) -> Self {
        SwirlError::UnresolvedName {
            name: name.to_string(),
            scope: scope.to_string(),
        }
    }

    /// Create a duplicate-name error
    pub fn duplicate(name: &str, scope: &str) -> Self {
        SwirlError::DuplicateName {
            name: name.to_string(),
            scope: scope.to_string(),
        }
    }

    /// Create a merge conflict
    pub fn merge(name: &str, message: impl Into<String>) -> Self {
        SwirlError::Merge {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Create an invariant violation
    pub fn invariant(function: &str, message: impl Into<String>) -> Self {
        SwirlError::InvariantViolation {
            function: function.to_string(),
            message: message.into(),
        }
    }

    /// Location of the error, if it has one
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            SwirlError::Syntax { location, .. } => Some(location),
            _ => None,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for SwirlError {
    fn from(err: std::io::Error) -> Self {
        SwirlError::Io {
            message: err.to_string(),
        }
    }
}

/// A translation unit that could not be turned into a module
#[derive(Error, Debug, Clone, PartialEq)]
#[error("module '{module}': {error}")]
pub struct ModuleFailure {
    pub module: String,
    pub error: SwirlError,
}

impl ModuleFailure {
    pub fn new(module: &str, error: SwirlError) -> Self {
        Self {
            module: module.to_string(),
            error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}: {}", location, self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Error reporter for collecting diagnostics across a batch of modules
#[derive(Debug, Default)]
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an error diagnostic
    pub fn error(&mut self, message: String, location: Option<SourceLocation>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message,
            location,
        });
        self.error_count += 1;
    }

    /// Report a warning diagnostic
    pub fn warning(&mut self, message: String, location: Option<SourceLocation>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            location,
        });
        self.warning_count += 1;
    }

    /// Report a module that failed to translate
    pub fn module_failure(&mut self, failure: &ModuleFailure) {
        let location = failure.error.location().cloned();
        self.error(failure.to_string(), location);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Create a summary string
    pub fn summary(&self) -> String {
        match (self.error_count, self.warning_count) {
            (0, 0) => "No errors or warnings".to_string(),
            (0, w) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (e, 0) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (e, w) => format!(
                "{} error{} and {} warning{}",
                e,
                if e == 1 { "" } else { "s" },
                w,
                if w == 1 { "" } else { "s" }
            ),
        }
    }
}
