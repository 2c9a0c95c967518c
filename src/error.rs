//! Diagnostics reported to the user.
//!
//! Every stage of the pipeline records its findings as [`Diagnostic`]s and
//! keeps going, substituting sentinels (error symbol, error type) so that a
//! single compilation reports as many problems as possible.
use std::{error::Error, fmt::Display};

use crate::ast::Position;

/// The category of a diagnostic, matching the stage that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Duplicate declaration in the same scope.
    Declaration,
    /// Use of an undeclared identifier.
    ResolveSymbol,
    /// Any type rule violation.
    Type,
}

impl Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DiagnosticKind::Declaration => "DeclarationError",
            DiagnosticKind::ResolveSymbol => "ResolveSymbolError",
            DiagnosticKind::Type => "TypeError",
        })
    }
}

/// A single user-facing error record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn declaration(position: Position, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Declaration,
            position,
            message: message.into(),
        }
    }

    pub fn resolve(position: Position, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::ResolveSymbol,
            position,
            message: message.into(),
        }
    }

    pub fn type_error(position: Position, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Type,
            position,
            message: message.into(),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (line, _) = self.position;
        write!(f, "{}(line: {})[{}]", self.kind, line, self.message)
    }
}

impl Error for Diagnostic {}
