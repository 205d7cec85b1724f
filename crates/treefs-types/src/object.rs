use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Longest digest an id can carry.
const MAX_LEN: usize = 32;

/// Content-addressed identifier for any stored object.
///
/// The digest is whatever the backing store addresses objects by: a
/// 32-byte BLAKE3 hash for the in-memory store, a 20-byte SHA-1 for a Git
/// repository. Identical content in the same store always produces the same
/// `ObjectId`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    len: u8,
    bytes: [u8; MAX_LEN],
}

impl ObjectId {
    /// Build an id from a 20- or 32-byte digest.
    pub fn from_digest(digest: &[u8]) -> Result<Self, TypeError> {
        match digest.len() {
            20 | MAX_LEN => {
                let mut bytes = [0u8; MAX_LEN];
                bytes[..digest.len()].copy_from_slice(digest);
                Ok(Self {
                    len: digest.len() as u8,
                    bytes,
                })
            }
            other => Err(TypeError::InvalidLength(other)),
        }
    }

    /// The raw digest.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.bytes[..4])
    }

    /// Parse from a hex string of 40 or 64 characters.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_digest(&bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for ObjectId {
    fn from(bytes: [u8; 32]) -> Self {
        Self { len: 32, bytes }
    }
}

impl From<[u8; 20]> for ObjectId {
    fn from(digest: [u8; 20]) -> Self {
        let mut bytes = [0u8; MAX_LEN];
        bytes[..20].copy_from_slice(&digest);
        Self { len: 20, bytes }
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
