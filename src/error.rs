//! Error types for tidepool.
//!
//! Every fallible operation in the crate returns [`SimError`]. The simulators
//! are deterministic numerical routines, so there is nothing transient to
//! retry: an error always points at the offending call's arguments.

use thiserror::Error;

/// Errors raised by the wave field, the swarm and the driver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Invalid construction parameters or parameter updates.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A disturbance targeted a cell outside the grid interior.
    #[error("cell ({row}, {col}) is outside the interior of a {rows}x{cols} grid")]
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// The shared driver lock was poisoned by a panicking thread.
    #[error("simulation driver lock poisoned")]
    Poisoned,
}

impl SimError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }
}

/// Check that `value` is finite and strictly positive.
pub(crate) fn ensure_positive(name: &str, value: f32) -> Result<(), SimError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::config(format!("{name} must be finite and > 0, got {value}")))
    }
}

/// Check that `value` is finite and not negative.
pub(crate) fn ensure_non_negative(name: &str, value: f32) -> Result<(), SimError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::config(format!("{name} must be finite and >= 0, got {value}")))
    }
}
