//! Structured unit errors
//!
//! Errors never crash the engine. Each one is a value carrying the
//! identifier text that caused it verbatim, tagged with an [`ErrorKind`]
//! so callers branch on the kind directly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const UNKNOWN_UNIT: &str = "UNKNOWN_UNIT";
    pub const INCOMPATIBLE_UNITS: &str = "INCOMPATIBLE_UNITS";
    pub const BAD_UNIT_ORDER: &str = "BAD_UNIT_ORDER";
    pub const DEGENERATE_MIXED_UNIT: &str = "DEGENERATE_MIXED_UNIT";
    pub const UNSUPPORTED_COMPOSITION: &str = "UNSUPPORTED_COMPOSITION";
    pub const AMOUNT_MISMATCH: &str = "AMOUNT_MISMATCH";
    pub const CATALOG_ERROR: &str = "CATALOG_ERROR";
    pub const UNDEFINED_RESULT: &str = "UNDEFINED_RESULT";
}

/// Failure kind, for branching without matching on fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    UnknownUnit,
    IncompatibleUnits,
    BadUnitOrder,
    DegenerateMixedUnit,
    UnsupportedComposition,
    AmountMismatch,
    Catalog,
    UndefinedResult,
}

/// Every way a unit operation can fail
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitError {
    /// Malformed identifier syntax
    #[error("cannot parse «{identifier}»: {reason}")]
    Parse { identifier: String, reason: String },

    /// Atomic unit absent from the catalog
    #[error("unknown unit «{unit}» in «{identifier}»")]
    UnknownUnit { identifier: String, unit: String },

    /// Neither the units nor the source's reciprocal share a base
    #[error("«{from}» and «{to}» are not convertible")]
    IncompatibleUnits { from: String, to: String },

    /// Mixed-unit components not strictly decreasing
    #[error("«{identifier}»: {previous} is not larger than {next}")]
    BadUnitOrder { identifier: String, previous: String, next: String },

    /// Fewer than two usable components
    #[error("«{identifier}» has {count} distinct unit(s), a mixed unit needs at least 2")]
    DegenerateMixedUnit { identifier: String, count: usize },

    /// Special or offset unit inside a larger expression
    #[error("«{identifier}»: {unit} cannot be combined: {reason}")]
    UnsupportedComposition { identifier: String, unit: String, reason: String },

    /// Amount list does not fit the unit's components
    #[error("«{identifier}» takes {expected} amount(s), got {actual}")]
    AmountMismatch { identifier: String, expected: usize, actual: usize },

    /// Malformed catalog record
    #[error("catalog line {line}: {reason} in «{record}»")]
    Catalog { line: usize, record: String, reason: String },

    /// Result has no finite value on a surface without NaN
    #[error("converting into «{identifier}» has no finite result")]
    UndefinedResult { identifier: String },
}

impl UnitError {
    // ========== Common Error Constructors ==========

    pub fn parse(identifier: &str, reason: impl Into<String>) -> Self {
        Self::Parse { identifier: identifier.to_string(), reason: reason.into() }
    }

    pub fn unknown_unit(identifier: &str, unit: &str) -> Self {
        Self::UnknownUnit { identifier: identifier.to_string(), unit: unit.to_string() }
    }

    pub fn incompatible(from: &str, to: &str) -> Self {
        Self::IncompatibleUnits { from: from.to_string(), to: to.to_string() }
    }

    pub fn bad_order(identifier: &str, previous: &str, next: &str) -> Self {
        Self::BadUnitOrder {
            identifier: identifier.to_string(),
            previous: previous.to_string(),
            next: next.to_string(),
        }
    }

    pub fn degenerate(identifier: &str, count: usize) -> Self {
        Self::DegenerateMixedUnit { identifier: identifier.to_string(), count }
    }

    pub fn unsupported(identifier: &str, unit: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedComposition {
            identifier: identifier.to_string(),
            unit: unit.to_string(),
            reason: reason.into(),
        }
    }

    pub fn amount_mismatch(identifier: &str, expected: usize, actual: usize) -> Self {
        Self::AmountMismatch { identifier: identifier.to_string(), expected, actual }
    }

    pub fn catalog(line: usize, record: &str, reason: impl Into<String>) -> Self {
        Self::Catalog { line, record: record.to_string(), reason: reason.into() }
    }

    pub fn undefined(identifier: &str) -> Self {
        Self::UndefinedResult { identifier: identifier.to_string() }
    }

    // ========== Inspection ==========

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::UnknownUnit { .. } => ErrorKind::UnknownUnit,
            Self::IncompatibleUnits { .. } => ErrorKind::IncompatibleUnits,
            Self::BadUnitOrder { .. } => ErrorKind::BadUnitOrder,
            Self::DegenerateMixedUnit { .. } => ErrorKind::DegenerateMixedUnit,
            Self::UnsupportedComposition { .. } => ErrorKind::UnsupportedComposition,
            Self::AmountMismatch { .. } => ErrorKind::AmountMismatch,
            Self::Catalog { .. } => ErrorKind::Catalog,
            Self::UndefinedResult { .. } => ErrorKind::UndefinedResult,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Parse => codes::PARSE_ERROR,
            ErrorKind::UnknownUnit => codes::UNKNOWN_UNIT,
            ErrorKind::IncompatibleUnits => codes::INCOMPATIBLE_UNITS,
            ErrorKind::BadUnitOrder => codes::BAD_UNIT_ORDER,
            ErrorKind::DegenerateMixedUnit => codes::DEGENERATE_MIXED_UNIT,
            ErrorKind::UnsupportedComposition => codes::UNSUPPORTED_COMPOSITION,
            ErrorKind::AmountMismatch => codes::AMOUNT_MISMATCH,
            ErrorKind::Catalog => codes::CATALOG_ERROR,
            ErrorKind::UndefinedResult => codes::UNDEFINED_RESULT,
        }
    }

    /// The identifier (or catalog record) the error is about
    pub fn identifier(&self) -> &str {
        match self {
            Self::Parse { identifier, .. }
            | Self::UnknownUnit { identifier, .. }
            | Self::BadUnitOrder { identifier, .. }
            | Self::DegenerateMixedUnit { identifier, .. }
            | Self::UnsupportedComposition { identifier, .. }
            | Self::AmountMismatch { identifier, .. }
            | Self::UndefinedResult { identifier } => identifier,
            Self::IncompatibleUnits { from, .. } => from,
            Self::Catalog { record, .. } => record,
        }
    }

    /// Suggestion for fixing the error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::Parse => Some("Join atomic units with '-', use at most one 'per', and put square/cubic/powN before a unit"),
            ErrorKind::UnknownUnit => Some("Check spelling; only catalog units and SI/binary prefixed forms are known"),
            ErrorKind::IncompatibleUnits => Some("Both units must measure the same quantity (or its reciprocal)"),
            ErrorKind::BadUnitOrder => Some("List mixed-unit components from largest to smallest, e.g. foot-and-inch"),
            ErrorKind::DegenerateMixedUnit => None,
            ErrorKind::UnsupportedComposition => Some("Use offset or special units (celsius, beaufort) on their own"),
            ErrorKind::AmountMismatch => None,
            ErrorKind::Catalog => None,
            ErrorKind::UndefinedResult => Some("The amount maps to a division by zero; use the rational surface to get NaN instead"),
        }
    }

    /// Flat report for wire formats
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code().to_string(),
            message: self.to_string(),
            identifier: self.identifier().to_string(),
            suggestion: self.suggestion().map(str::to_string),
        }
    }
}

/// Serializable summary of a [`UnitError`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Offending identifier, verbatim
    pub identifier: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}
