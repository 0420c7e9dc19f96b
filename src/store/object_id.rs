//! Document identifiers
//!
//! Twelve-byte identifiers rendered as 24 lowercase hex characters: a 4-byte
//! big-endian creation timestamp, 5 random bytes and a 3-byte counter.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Raised when a string is not a 24-character hex identifier.
///
/// Carries the offending literal so it can be echoed back to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid object id: '{0}'")]
pub struct ObjectIdError(pub String);

static COUNTER: AtomicU32 = AtomicU32::new(0);

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        let mut bytes = [0u8; 12];
        let seconds = Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());

        let random: [u8; 5] = rand::thread_rng().gen();
        bytes[4..9].copy_from_slice(&random);

        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);

        Self(bytes)
    }

    /// Parse a 24-character hex string
    pub fn parse_str(raw: &str) -> Result<Self, ObjectIdError> {
        let trimmed = raw.trim();
        if trimmed.len() != 24 {
            return Err(ObjectIdError(raw.to_string()));
        }

        let decoded = hex::decode(trimmed).map_err(|_| ObjectIdError(raw.to_string()))?;
        let bytes: [u8; 12] = decoded
            .try_into()
            .map_err(|_| ObjectIdError(raw.to_string()))?;

        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Seconds since the epoch at which the identifier was generated
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ObjectId::parse_str(&raw).map_err(de::Error::custom)
    }
}
