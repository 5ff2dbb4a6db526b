//! Error types for fixed-point arithmetic
//!
//! Covers overflow, division by zero, invalid square-root input and
//! conversion failures across the Decimal boundary.

use thiserror::Error;

/// Errors that can occur during fixed-point arithmetic operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FixedPointError {
    /// Result does not fit the 1e18-scaled i128 representation
    #[error("Overflow in fixed-point {operation}")]
    Overflow { operation: &'static str },

    /// Division by zero in fixed-point arithmetic
    #[error("Division by zero in fixed-point arithmetic")]
    DivisionByZero,

    /// Square root of a negative value
    #[error("Cannot take square root of negative value (raw {raw})")]
    NegativeSqrt { raw: i128 },

    /// Vector operands of different lengths
    #[error("Vector length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    /// Operation requires at least one element
    #[error("Operation requires a non-empty vector")]
    EmptyVector,

    /// Invalid decimal string format
    #[error("Invalid decimal string: '{input}' - expected numeric format")]
    InvalidDecimal { input: String },
}
