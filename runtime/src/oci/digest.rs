//! Content digest parsing and computation.
//!
//! Digests have the form `algorithm:hex` where the hex part is lowercase and
//! has the exact length produced by the algorithm.

use std::fmt;
use std::str::FromStr;

use a3s_imagetools_core::error::{Result, ToolsError};
use sha2::{Digest as _, Sha256};

/// Digest algorithms accepted in content digests, with their hex length.
const ALGORITHMS: &[(&str, usize)] = &[("sha256", 64), ("sha384", 96), ("sha512", 128)];

/// A validated content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: String,
    hex: String,
}

impl Digest {
    /// Parse and validate a digest string.
    pub fn parse(s: &str) -> Result<Self> {
        let (algorithm, hex) = match s.split_once(':') {
            Some((a, h)) if !a.is_empty() && !h.is_empty() => (a, h),
            _ => {
                return Err(ToolsError::InvalidDigest(format!(
                    "'{}': expected algorithm:hex",
                    s
                )))
            }
        };

        let expected_len = ALGORITHMS
            .iter()
            .find(|(name, _)| *name == algorithm)
            .map(|(_, len)| *len)
            .ok_or_else(|| {
                ToolsError::InvalidDigest(format!(
                    "'{}': unsupported algorithm '{}'",
                    s, algorithm
                ))
            })?;

        if hex.len() != expected_len {
            return Err(ToolsError::InvalidDigest(format!(
                "'{}': expected {} hex characters for {}, got {}",
                s,
                expected_len,
                algorithm,
                hex.len()
            )));
        }
        if !hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(ToolsError::InvalidDigest(format!(
                "'{}': hex part must be lowercase hexadecimal",
                s
            )));
        }

        Ok(Self {
            algorithm: algorithm.to_string(),
            hex: hex.to_string(),
        })
    }

    /// Compute the sha256 digest of a byte buffer.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            algorithm: "sha256".to_string(),
            hex: hex::encode(Sha256::digest(data)),
        }
    }

    /// Whether the string starts with the label of a known digest algorithm.
    ///
    /// Such tokens are never reinterpreted as repository names.
    pub fn has_algorithm_prefix(s: &str) -> bool {
        ALGORITHMS.iter().any(|(name, _)| s.starts_with(name))
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Digest {
    type Err = ToolsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
