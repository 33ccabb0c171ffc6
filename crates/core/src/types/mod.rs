//! Shared type definitions and newtypes

use serde::{Deserialize, Serialize};

/// Floating-point multiplier applied to a base point amount.
///
/// Multiplied results are truncated to whole points, never rounded up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multiplier(pub f64);

impl Multiplier {
    pub fn new(factor: f64) -> Self {
        Multiplier(factor)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Apply to a base amount, truncating to integer points
    pub fn apply(&self, base: i64) -> i64 {
        ((base as f64) * self.0).trunc() as i64
    }
}
