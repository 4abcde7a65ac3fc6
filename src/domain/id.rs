//! Entity ID system for vessels, batches, and recipes
//!
//! ID Format:
//! - Vessel IDs: `v-{7-char-hash}` (e.g., `v-7f2b4c1`)
//! - Batch IDs:  `b-{7-char-hash}` (e.g., `b-9d3e5f2`)
//! - Recipe IDs: `r-{7-char-hash}` (e.g., `r-4a8c0d9`)
//!
//! Hash is derived from name + creation timestamp, ensuring uniqueness.
//! Same name at different times produces different IDs (by design).

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid vessel ID format: expected 'v-{{7-char-hash}}', got '{0}'")]
    InvalidVesselId(String),

    #[error("Invalid batch ID format: expected 'b-{{7-char-hash}}', got '{0}'")]
    InvalidBatchId(String),

    #[error("Invalid recipe ID format: expected 'r-{{7-char-hash}}', got '{0}'")]
    InvalidRecipeId(String),
}

/// Generates a 7-character hash from a name and timestamp
fn generate_hash(name: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", name, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

fn is_valid_hash(hash: &str) -> bool {
    hash.len() == 7 && hash.chars().all(|c| c.is_ascii_hexdigit())
}

/// Defines a prefixed hash ID type. All three entity IDs share the same
/// structure and differ only in prefix and error variant.
macro_rules! define_id {
    ($name:ident, $prefix:literal, $error:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name {
            hash: String,
        }

        impl $name {
            /// Creates a new ID from a name and timestamp
            pub fn new(name: &str, timestamp: DateTime<Utc>) -> Self {
                Self {
                    hash: generate_hash(name, timestamp),
                }
            }

            /// Returns the hash portion of the ID
            pub fn hash(&self) -> &str {
                &self.hash
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.hash)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                let hash = s
                    .strip_prefix(concat!($prefix, "-"))
                    .ok_or_else(|| IdError::$error(s.to_string()))?;

                if !is_valid_hash(hash) {
                    return Err(IdError::$error(s.to_string()));
                }

                Ok(Self {
                    hash: hash.to_string(),
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.to_string()
            }
        }
    };
}

define_id!(VesselId, "v", InvalidVesselId);
define_id!(BatchId, "b", InvalidBatchId);
define_id!(RecipeId, "r", InvalidRecipeId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vessel_id_generation_is_unique_for_different_timestamps() {
        let name = "Fermenter 1";
        let ts1 = Utc::now();
        let ts2 = ts1 + chrono::Duration::nanoseconds(1);

        let id1 = VesselId::new(name, ts1);
        let id2 = VesselId::new(name, ts2);

        assert_ne!(id1, id2);
    }

    #[test]
    fn vessel_id_format_is_correct() {
        let id = VesselId::new("Still 1", Utc::now());
        let s = id.to_string();

        assert!(s.starts_with("v-"));
        assert_eq!(s.len(), 9); // "v-" + 7 chars
    }

    #[test]
    fn vessel_id_parses_correctly() {
        let original = VesselId::new("Barrel 42", Utc::now());
        let s = original.to_string();
        let parsed: VesselId = s.parse().unwrap();

        assert_eq!(original, parsed);
    }

    #[test]
    fn vessel_id_rejects_invalid_format() {
        assert!("invalid".parse::<VesselId>().is_err());
        assert!("v-short".parse::<VesselId>().is_err());
        assert!("v-toolonggg".parse::<VesselId>().is_err());
        assert!("v-gggggg1".parse::<VesselId>().is_err()); // 'g' is not hex
        assert!("b-1234567".parse::<VesselId>().is_err()); // wrong prefix
    }

    #[test]
    fn batch_id_format_is_correct() {
        let id = BatchId::new("Batch 17", Utc::now());
        let s = id.to_string();

        assert!(s.starts_with("b-"));
        assert_eq!(s.len(), 9);
    }

    #[test]
    fn batch_id_roundtrip() {
        let original = BatchId::new("Bourbon Spring Run", Utc::now());
        let parsed: BatchId = original.to_string().parse().unwrap();

        assert_eq!(original, parsed);
    }

    #[test]
    fn recipe_id_roundtrip() {
        let original = RecipeId::new("Single Malt", Utc::now());
        let parsed: RecipeId = original.to_string().parse().unwrap();

        assert_eq!(original, parsed);
    }

    #[test]
    fn recipe_id_rejects_vessel_prefix() {
        let vessel = VesselId::new("Tank 3", Utc::now());
        assert!(vessel.to_string().parse::<RecipeId>().is_err());
    }

    #[test]
    fn serde_roundtrip_vessel_id() {
        let original = VesselId::new("Mash Tun", Utc::now());
        let json = serde_json::to_string(&original).unwrap();
        let parsed: VesselId = serde_json::from_str(&json).unwrap();

        assert_eq!(original, parsed);
    }

    #[test]
    fn serde_roundtrip_batch_id() {
        let original = BatchId::new("Rye 22", Utc::now());
        let json = serde_json::to_string(&original).unwrap();
        let parsed: BatchId = serde_json::from_str(&json).unwrap();

        assert_eq!(original, parsed);
    }

    #[test]
    fn serde_rejects_malformed_id() {
        let result: Result<BatchId, _> = serde_json::from_str("\"b-xyz\"");
        assert!(result.is_err());
    }

    #[test]
    fn parse_trims_whitespace() {
        let id = VesselId::new("Tank", Utc::now());
        let padded = format!("  {}  ", id);
        let parsed: VesselId = padded.parse().unwrap();

        assert_eq!(id, parsed);
    }
}
