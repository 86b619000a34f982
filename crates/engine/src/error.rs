//! The module contains the errors the engine can throw.
//!
//! The errors are:
//!
//! - [`Range`] thrown when a logical index falls outside the table.
//! - [`Format`] thrown when a sheet row or cell cannot be decoded.
//! - [`Overwrite`] and [`EmptyTarget`] thrown when a low level write finds the
//!   target rows in an unexpected state.
//! - [`Remote`] thrown when the range store fails.
//!
//!  [`Range`]: EngineError::Range
//!  [`Format`]: EngineError::Format
//!  [`Overwrite`]: EngineError::Overwrite
//!  [`EmptyTarget`]: EngineError::EmptyTarget
//!  [`Remote`]: EngineError::Remote
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Index out of range: {0}")]
    Range(String),
    #[error("Badly formatted data: {0}")]
    Format(String),
    #[error("Refusing to overwrite: {0}")]
    Overwrite(String),
    #[error("Refusing to clear an empty target: {0}")]
    EmptyTarget(String),
    #[error("Range store failure: {0}")]
    Remote(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Table is not in normal form: {0}")]
    Unhealthy(String),
}
