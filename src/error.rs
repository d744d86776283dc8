// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use thiserror::Error;

/// Errors raised while building real numbers, modules, elements and fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("at most one generator can be rational")]
    TwoRationalGenerators,
    #[error("generators must be distinct")]
    DuplicateGenerator,
    #[error("expected {expected} coefficients but got {actual}")]
    CoefficientCountMismatch { expected: usize, actual: usize },
    #[error("interval must have an interior")]
    EmptyInterval,
    #[error("value must be finite")]
    NonFinite,
    #[error("object belongs to a different registry")]
    ForeignRegistry,
    #[error("invalid precision policy: {0}")]
    InvalidPrecisionPolicy(String),
    #[error("invalid number field: {0}")]
    InvalidNumberField(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// the exact result is not a finite combination of generators with ring coefficients
    #[error("result is not representable")]
    NotRepresentable,
    /// a ball-arithmetic decision could not be made; retry at a higher precision
    #[error("insufficient precision to decide at {precision} bits")]
    PrecisionInsufficient { precision: u64 },
    #[error("division by zero")]
    DivisionByZero,
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error(transparent)]
    InvalidConstruction(#[from] ConstructionError),
    #[error("archive error: {0}")]
    Archive(String),
}

impl Error {
    pub fn not_implemented(what: impl Into<String>) -> Self {
        Error::NotImplemented(what.into())
    }
    pub fn archive(what: impl Into<String>) -> Self {
        Error::Archive(what.into())
    }
    pub fn is_precision_insufficient(&self) -> bool {
        matches!(self, Error::PrecisionInsufficient { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Archive(error.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
