// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Trace and span identifiers.
//!
//! A [`TraceId`] is a 128-bit value; a [`SpanId`] is 64-bit. Both render as
//! lowercase hex, matching the wire representation the CLI and filesystem
//! adapter expect.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 128-bit trace identifier, rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(pub u128);

/// 64-bit span identifier, rendered as 16 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpanId(pub u64);

#[derive(Debug, thiserror::Error)]
pub enum IdParseError {
    #[error("invalid hex id: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("wrong id length: expected {expected} bytes, got {got}")]
    WrongLength { expected: usize, got: usize },
}

impl TraceId {
    /// Generate a new random trace id.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        TraceId(u128::from_be_bytes(bytes))
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl SpanId {
    /// Generate a new random span id.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        SpanId(u64::from_be_bytes(bytes))
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for TraceId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 16 {
            return Err(IdParseError::WrongLength {
                expected: 16,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(TraceId(u128::from_be_bytes(arr)))
    }
}

impl FromStr for SpanId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 8 {
            return Err(IdParseError::WrongLength {
                expected: 8,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&bytes);
        Ok(SpanId(u64::from_be_bytes(arr)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_id_round_trips_through_hex() {
        let id = TraceId::generate();
        let s = id.to_string();
        assert_eq!(s.len(), 32);
        assert_eq!(TraceId::from_str(&s).unwrap(), id);
    }

    #[test]
    fn span_id_round_trips_through_hex() {
        let id = SpanId::generate();
        let s = id.to_string();
        assert_eq!(s.len(), 16);
        assert_eq!(SpanId::from_str(&s).unwrap(), id);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            TraceId::from_str("abcd"),
            Err(IdParseError::WrongLength { .. })
        ));
    }

    #[test]
    fn generated_ids_are_not_all_zero() {
        // Astronomically unlikely with a real RNG; guards against a stubbed-out generator.
        let a = TraceId::generate();
        let b = TraceId::generate();
        assert_ne!(a, b);
    }
}
