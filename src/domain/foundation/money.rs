//! Money amount value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Non-negative money amount used for base prices and bids.
///
/// Comparisons between amounts are strict: bid acceptance requires the new
/// amount to be strictly greater than the floor, so ties are never accepted.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(f64);

impl Amount {
    /// Creates an amount, rejecting negative or non-finite values.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::invalid_format(
                "amount",
                "must be a finite number",
            ));
        }
        if value < 0.0 {
            return Err(ValidationError::invalid_format(
                "amount",
                "must not be negative",
            ));
        }
        Ok(Self(value))
    }

    /// Zero amount, the floor when an auction has no recorded bids yet.
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Returns the raw value.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
