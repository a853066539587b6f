use crate::error::{BaccError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// Encoded group element, or a concatenation of them (an accumulator)
pub type Element = Vec<u8>;

// Byte offset of an entry inside a log file
pub type LogOffset = u64;

/// Security level `l`, fixed for the lifetime of a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum SecurityLevel {
    L128,
    L192,
    L256,
}

impl SecurityLevel {
    pub const ALL: [SecurityLevel; 3] = [SecurityLevel::L128, SecurityLevel::L192, SecurityLevel::L256];

    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            128 => Ok(SecurityLevel::L128),
            192 => Ok(SecurityLevel::L192),
            256 => Ok(SecurityLevel::L256),
            other => Err(BaccError::Params(format!(
                "unsupported security level {} (expected 128, 192 or 256)",
                other
            ))),
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            SecurityLevel::L128 => 128,
            SecurityLevel::L192 => 192,
            SecurityLevel::L256 => 256,
        }
    }

    /// Private key length in octets (`l/4`).
    pub fn key_len(self) -> usize {
        usize::from(self.bits()) / 4
    }

    /// Little-endian file header carrying the level.
    pub fn to_header(self) -> [u8; 2] {
        self.bits().to_le_bytes()
    }

    pub fn from_header(header: [u8; 2]) -> Result<Self> {
        Self::from_bits(u16::from_le_bytes(header))
    }
}

impl TryFrom<u16> for SecurityLevel {
    type Error = BaccError;

    fn try_from(bits: u16) -> Result<Self> {
        Self::from_bits(bits)
    }
}

impl From<SecurityLevel> for u16 {
    fn from(level: SecurityLevel) -> u16 {
        level.bits()
    }
}

impl Default for SecurityLevel {
    fn default() -> Self {
        SecurityLevel::L128
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}
