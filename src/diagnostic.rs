//! Diagnostics produced by the lexer, parser and resolver.
//!
//! Every diagnostic carries a stable `code`, a severity, a source position
//! and a message. The query engine never raises on a malformed tree; missing
//! links simply resolve to empty results. Diagnostics are plain data — the
//! transport layer is responsible for turning them into
//! `textDocument/publishDiagnostics` notifications.

use std::fmt;

use crate::lexer::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Hint,
    Warning,
    Error,
    Fatal,
}

/// Stable diagnostic codes, one per distinguishable error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    /// E100 - lexer hit an unterminated string or comment.
    UnterminatedLiteral,
    /// E101 - lexer saw a punctuator or numeric literal it does not recognize.
    UnexpectedToken,
    /// E102 - parser could not continue and recovered at a synchronization point.
    ParseRecovery,
    /// E103 - an identifier used in an expression or type position has no declaration.
    UnknownIdentifier,
    /// E104 - two declarations share a name in a scope that forbids it.
    DuplicateDeclaration,
    /// E105 - operand types are incompatible with an operator or assignment.
    TypeMismatch,
    /// E106 - a record's parent chain cycles back to itself.
    InheritanceCycle,
    /// E107 - a module header is missing its exe/lib/dll kind.
    MissingModuleKind,
    /// E108 - an import could not be resolved to a file on the search path.
    UnresolvedImport,
    /// E109 - an overload group has two members with identical parameter types.
    InvalidOverload,
    /// E110 - `AS`/`IS` used against a type that is not an ancestor/descendant.
    MisuseOfCast,
    /// E111 - a call matches more than one overload equally well.
    AmbiguousCall,
    /// E112 - a case branch uses a string literal as a selector.
    StringCaseSelector,
}

impl Code {
    pub fn as_str(self) -> &'static str {
        match self {
            Code::UnterminatedLiteral => "E100",
            Code::UnexpectedToken => "E101",
            Code::ParseRecovery => "E102",
            Code::UnknownIdentifier => "E103",
            Code::DuplicateDeclaration => "E104",
            Code::TypeMismatch => "E105",
            Code::InheritanceCycle => "E106",
            Code::MissingModuleKind => "E107",
            Code::UnresolvedImport => "E108",
            Code::InvalidOverload => "E109",
            Code::MisuseOfCast => "E110",
            Code::AmbiguousCall => "E111",
            Code::StringCaseSelector => "E112",
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            Code::UnterminatedLiteral
            | Code::UnexpectedToken
            | Code::ParseRecovery
            | Code::UnknownIdentifier
            | Code::DuplicateDeclaration
            | Code::TypeMismatch
            | Code::InheritanceCycle
            | Code::MissingModuleKind
            | Code::UnresolvedImport
            | Code::InvalidOverload
            | Code::AmbiguousCall
            | Code::StringCaseSelector => Severity::Error,
            Code::MisuseOfCast => Severity::Warning,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Code,
    pub severity: Severity,
    pub file: String,
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: Code, file: impl Into<String>, position: Position, message: impl Into<String>) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            file: file.into(),
            position,
            message: message.into(),
        }
    }
}
