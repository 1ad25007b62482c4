//! Binary values that appear in metadata documents as encoded strings.

use crate::schema::error::{self, Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::ResultExt;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::str::FromStr;

/// A scheme for encoding binary data as a string.
pub trait Encode {
    /// Encodes bytes as a string.
    fn encode(bytes: &[u8]) -> String;
}

/// A scheme for decoding binary data from a string.
pub trait Decode {
    /// Decodes a string into bytes.
    fn decode(s: &str) -> Result<Vec<u8>>;
}

/// Lowercase hexadecimal encoding, used for key IDs, signatures, and digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hex;

impl Encode for Hex {
    fn encode(bytes: &[u8]) -> String {
        hex::encode(bytes)
    }
}

impl Decode for Hex {
    fn decode(s: &str) -> Result<Vec<u8>> {
        hex::decode(s).context(error::HexDecodeSnafu)
    }
}

/// Binary data decoded from a string field of a metadata document. The
/// original string is retained so that re-serialization reproduces the exact
/// bytes that were signed.
pub struct Decoded<T> {
    bytes: Vec<u8>,
    original: String,
    spooky: PhantomData<T>,
}

impl<T> Decoded<T> {
    /// Consume this object and return its decoded bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl<T: Encode> From<Vec<u8>> for Decoded<T> {
    fn from(bytes: Vec<u8>) -> Self {
        let original = T::encode(&bytes);
        Self {
            bytes,
            original,
            spooky: PhantomData,
        }
    }
}

impl<T: Decode> FromStr for Decoded<T> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self {
            bytes: T::decode(s)?,
            original: s.to_owned(),
            spooky: PhantomData,
        })
    }
}

// Equality, ordering, and hashing are over the decoded bytes alone, so that
// two encodings of the same value compare equal.

impl<T> Clone for Decoded<T> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            original: self.original.clone(),
            spooky: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Decoded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.original, f)
    }
}

impl<T> fmt::Display for Decoded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.original, f)
    }
}

impl<T> Deref for Decoded<T> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<T> AsRef<[u8]> for Decoded<T> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<T> PartialEq for Decoded<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<T> Eq for Decoded<T> {}

impl<T> Hash for Decoded<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl<'de, T: Decode> Deserialize<'de> for Decoded<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let original = String::deserialize(deserializer)?;
        Ok(Self {
            bytes: T::decode(&original).map_err(serde::de::Error::custom)?,
            original,
            spooky: PhantomData,
        })
    }
}

impl<T> Serialize for Decoded<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.original)
    }
}

#[cfg(test)]
mod tests {
    use super::{Decoded, Hex};
    use std::str::FromStr;

    #[test]
    fn round_trip() {
        let decoded = Decoded::<Hex>::from_str("cafef00d").unwrap();
        assert_eq!(&*decoded, &[0xca, 0xfe, 0xf0, 0x0d]);
        assert_eq!(decoded.to_string(), "cafef00d");
    }

    #[test]
    fn equality_over_bytes() {
        let a = Decoded::<Hex>::from_str("CAFEF00D").unwrap();
        let b = Decoded::<Hex>::from(vec![0xca, 0xfe, 0xf0, 0x0d]);
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(Decoded::<Hex>::from_str("not hex").is_err());
    }
}
