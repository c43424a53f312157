//! Identifiers: content hashes (Hid) and entry identities (Gid).

use crate::error::{Result, TangleError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A 32-byte BLAKE3 content hash identifying a blob.
///
/// The same content always produces the same Hid, so a Hid is all a change
/// step needs to materialize file or symlink content.
///
/// # Examples
///
/// ```
/// use tangle_core::Hid;
///
/// let hid = Hid::from_bytes([0xab; 32]);
/// assert_eq!(hid.as_hex().len(), 64);
/// assert_eq!(hid.shard(), "ab");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hid([u8; 32]);

impl Hid {
    /// The length of a Hid as a hex string.
    pub const HEX_LEN: usize = 64;

    /// Creates a Hid from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying hash bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns this Hid as a lowercase hex string.
    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the shard prefix (first 2 hex characters).
    ///
    /// Blobs live at `.tangle/blobs/{shard}/{full_hex}`.
    pub fn shard(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Parses a Hid from a hex string.
    ///
    /// # Errors
    ///
    /// Returns `TangleError::InvalidHex` if the string is not valid hex
    /// or is not exactly 64 characters long.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != Self::HEX_LEN {
            return Err(TangleError::InvalidHex(format!(
                "expected {} hex chars, got {}",
                Self::HEX_LEN,
                s.len()
            )));
        }

        let bytes = hex::decode(s).map_err(|e| TangleError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TangleError::InvalidHex("invalid length".to_string()))?;

        Ok(Self(arr))
    }

    /// Computes the Hid of blob content.
    pub fn for_content(data: &[u8]) -> Self {
        let canonical = canonical_bytes(data);
        Self(*blake3::hash(&canonical).as_bytes())
    }
}

impl fmt::Display for Hid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

impl fmt::Debug for Hid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hid({}...)", &self.as_hex()[..12])
    }
}

impl Serialize for Hid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hid::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Canonical envelope magic bytes for blobs.
pub(crate) const MAGIC: &[u8; 5] = b"TNGB1";

/// Size of the envelope header: magic + u64 LE length.
pub(crate) const HEADER_LEN: usize = 5 + 8;

/// Constructs canonical bytes for hashing and storage.
///
/// Format:
/// - Magic: "TNGB1" (5 bytes)
/// - Length: u64 LE (8 bytes)
/// - Payload: variable bytes
pub(crate) fn canonical_bytes(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Stable identity of one versioned entry.
///
/// A Gid survives renames, moves and merges; two branches that both touched
/// the same entry agree on its Gid. Textual form is `g` followed by 32 hex
/// digits.
///
/// ```
/// use tangle_core::Gid;
///
/// let gid = Gid::new();
/// let text = gid.to_string();
/// assert!(text.starts_with('g'));
/// assert_eq!(text.parse::<Gid>().unwrap(), gid);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gid(Uuid);

impl Gid {
    /// Allocates a fresh, random Gid.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Builds a Gid from a fixed 128-bit value.
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for Gid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0.simple())
    }
}

impl fmt::Debug for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gid({})", self)
    }
}

impl FromStr for Gid {
    type Err = TangleError;

    fn from_str(s: &str) -> Result<Self> {
        let hex_part = s
            .strip_prefix('g')
            .ok_or_else(|| TangleError::InvalidGid(format!("'{}' does not start with 'g'", s)))?;
        if hex_part.len() != 32 {
            return Err(TangleError::InvalidGid(format!(
                "'{}' must have 32 hex digits",
                s
            )));
        }
        Uuid::try_parse(hex_part)
            .map(Self)
            .map_err(|e| TangleError::InvalidGid(format!("'{}': {}", s, e)))
    }
}

impl Serialize for Gid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Gid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
