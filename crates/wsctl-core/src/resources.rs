//! Resource quantity value objects.

use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents a byte quantity for memory or storage requests.
///
/// Internally stored as bytes for precision. Parsed from and rendered as
/// the platform's quantity strings ("8G", "512M", "16Gi").
/// Avoids unit-confusion bugs in resource comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity {
    bytes: u64,
}

impl Quantity {
    /// Creates a Quantity from a raw byte count.
    pub const fn from_bytes(bytes: u64) -> Self {
        Self { bytes }
    }

    /// Creates a zero Quantity.
    pub const fn zero() -> Self {
        Self { bytes: 0 }
    }

    /// Returns the quantity in bytes.
    pub fn as_bytes(&self) -> u64 {
        self.bytes
    }

    /// Returns true if the quantity is zero.
    pub fn is_zero(&self) -> bool {
        self.bytes == 0
    }

    /// Parses a platform quantity string.
    ///
    /// Accepts a bare byte count ("1048576"), decimal unit suffixes
    /// ("8G", "512M", "1.5T"), and binary suffixes ("16Gi", "512Mi").
    /// Suffixes are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidQuantity`] for empty input, unknown
    /// suffixes, or a non-numeric coefficient.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let text = input.trim();
        if text.is_empty() {
            return Err(DomainError::InvalidQuantity {
                value: input.to_string(),
                reason: "empty string".to_string(),
            });
        }

        let (number_part, multiplier) = split_unit(text).ok_or_else(|| DomainError::InvalidQuantity {
            value: input.to_string(),
            reason: "unknown unit suffix".to_string(),
        })?;

        let coefficient: f64 = number_part.parse().map_err(|_| DomainError::InvalidQuantity {
            value: input.to_string(),
            reason: "non-numeric coefficient".to_string(),
        })?;

        if coefficient < 0.0 {
            return Err(DomainError::InvalidQuantity {
                value: input.to_string(),
                reason: "negative quantity".to_string(),
            });
        }

        let bytes = (coefficient * multiplier as f64).round() as u64;
        Ok(Self { bytes })
    }

    /// Formats the quantity using the largest decimal unit that fits.
    ///
    /// Returns format like "8G", "512M", "1.5G", "100" (bare bytes).
    pub fn format(&self) -> String {
        const UNITS: [(u64, &str); 4] = [
            (1_000_000_000_000, "T"),
            (1_000_000_000, "G"),
            (1_000_000, "M"),
            (1_000, "K"),
        ];

        for (scale, suffix) in UNITS {
            if self.bytes >= scale {
                if self.bytes % scale == 0 {
                    return format!("{}{suffix}", self.bytes / scale);
                }
                let value = self.bytes as f64 / scale as f64;
                return format!("{value:.1}{suffix}");
            }
        }
        format!("{}", self.bytes)
    }
}

/// Splits a quantity string into its numeric part and the unit multiplier.
///
/// Returns `None` when the suffix is not a recognized unit.
fn split_unit(text: &str) -> Option<(&str, u64)> {
    let lower = text.to_ascii_lowercase();
    let suffixes: [(&str, u64); 9] = [
        ("ki", 1u64 << 10),
        ("mi", 1u64 << 20),
        ("gi", 1u64 << 30),
        ("ti", 1u64 << 40),
        ("k", 1_000),
        ("m", 1_000_000),
        ("g", 1_000_000_000),
        ("t", 1_000_000_000_000),
        ("", 1),
    ];

    for (suffix, multiplier) in suffixes {
        if let Some(stripped) = lower.strip_suffix(suffix) {
            // Reject suffix-only input like "G" and interior garbage like "8x G"
            if stripped.is_empty() && !suffix.is_empty() {
                return None;
            }
            if stripped.chars().all(|c| c.is_ascii_digit() || c == '.') {
                return Some((&text[..stripped.len()], multiplier));
            }
        }
    }
    None
}

impl FromStr for Quantity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

impl Serialize for Quantity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Serialize as the platform quantity string
        serializer.serialize_str(&self.format())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Bytes(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => Quantity::parse(&s).map_err(serde::de::Error::custom),
            Repr::Bytes(b) => Ok(Quantity::from_bytes(b)),
        }
    }
}

// ============================================================================
// Resource Requests
// ============================================================================

/// Compute resources requested for a session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceRequests {
    /// CPU cores (fractional values allowed)
    #[serde(default)]
    pub cpu: f64,

    /// Memory request
    #[serde(default)]
    pub memory: Quantity,

    /// Workspace disk request
    #[serde(default)]
    pub storage: Quantity,

    /// GPU count
    #[serde(default)]
    pub gpu: u32,
}

impl ResourceRequests {
    /// Formats the request for single-line display.
    ///
    /// Returns format like "2 CPU / 8G RAM / 32G disk" with a GPU
    /// segment only when GPUs are requested.
    pub fn format(&self) -> String {
        let mut out = format!(
            "{} CPU / {} RAM / {} disk",
            format_cpu(self.cpu),
            self.memory.format(),
            self.storage.format()
        );
        if self.gpu > 0 {
            out.push_str(&format!(" / {} GPU", self.gpu));
        }
        out
    }
}

/// Resource section of a session record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionResources {
    /// Requested resources as granted by the scheduler
    #[serde(default)]
    pub requests: ResourceRequests,
}

/// Formats a CPU core count without a trailing ".0" for whole cores.
fn format_cpu(cores: f64) -> String {
    if cores.fract() == 0.0 {
        format!("{}", cores as u64)
    } else {
        format!("{cores:.1}")
    }
}
