//! Error types for the metadata schema layer.

use crate::schema::RoleType;
use snafu::Snafu;

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for metadata parsing and signature verification.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum Error {
    /// Two keys in a key list hashed to the same key ID.
    #[snafu(display("Duplicate key ID: {}", keyid))]
    DuplicateKeyId { keyid: String },

    /// A string failed to decode as hexadecimal.
    #[snafu(display("Invalid hex string: {}", source))]
    HexDecode { source: hex::FromHexError },

    /// A key's declared ID did not match the digest of its contents.
    #[snafu(display("Invalid key ID {}: calculated {}", keyid, calculated))]
    InvalidKeyId { keyid: String, calculated: String },

    /// An object could not be serialized to canonical JSON.
    #[snafu(display("Failed to serialize {} to JSON: {}", what, source))]
    JsonSerialization {
        what: String,
        source: serde_json::Error,
    },

    /// The root metadata does not describe keys for a role.
    #[snafu(display("Role '{}' is not described by the root metadata", role))]
    MissingRole { role: RoleType },

    /// Fewer distinct valid signatures than the role's threshold requires.
    #[snafu(display(
        "Signature threshold of {} not met for role '{}' ({} valid signatures)",
        threshold,
        role,
        valid
    ))]
    SignatureThreshold {
        role: RoleType,
        threshold: u64,
        valid: u64,
    },
}
