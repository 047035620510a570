//! Ordering options
//!
//! Options can be read from a JSON file and overridden from the command
//! line. Missing fields take their defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Divisor applied to the scheduled predecessor probability when deciding
/// whether a merge block is deferred in the linear-scan order.
pub const DEFAULT_MERGE_PENALTY: f64 = 10.0;

fn default_merge_penalty() -> f64 {
    DEFAULT_MERGE_PENALTY
}

fn default_verify() -> bool {
    true
}

/// Options for computing block orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderOptions {
    /// A merge block is deferred while the probability of its unscheduled
    /// predecessors exceeds the scheduled probability divided by this value
    #[serde(default = "default_merge_penalty")]
    pub merge_penalty: f64,
    /// Check the post-conditions of the computed orders
    #[serde(default = "default_verify")]
    pub verify: bool,
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self {
            merge_penalty: DEFAULT_MERGE_PENALTY,
            verify: true,
        }
    }
}

impl OrderOptions {
    /// Parse options from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let options: OrderOptions = serde_json::from_str(json).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&data)
    }

    pub fn with_merge_penalty(mut self, merge_penalty: f64) -> Self {
        self.merge_penalty = merge_penalty;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Reject values the ordering cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.merge_penalty.is_finite() || self.merge_penalty <= 0.0 {
            return Err(Error::Config {
                message: format!(
                    "merge_penalty must be a positive finite number, got {}",
                    self.merge_penalty
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let options = OrderOptions::from_json("{}").unwrap();
        assert_eq!(options, OrderOptions::default());
        assert_eq!(options.merge_penalty, 10.0);
        assert!(options.verify);
    }

    #[test]
    fn test_rejects_bad_penalty() {
        assert!(matches!(
            OrderOptions::from_json(r#"{"merge_penalty": 0}"#),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            OrderOptions::from_json(r#"{"merge_penalty": -3.5}"#),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(OrderOptions::from_json(r#"{"penalty": 4}"#).is_err());
    }
}
