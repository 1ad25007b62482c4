//! Public keys as they appear in root metadata.

use crate::schema::decoded::{Decoded, Hex};
use crate::schema::error::{self, Result};
use olpc_cjson::CanonicalFormatter;
use ring::digest::{digest, SHA256};
use ring::signature::UnparsedPublicKey;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

/// A public key and the signature scheme it is used with. Serialized as
/// `{"keytype": ..., "scheme": ..., "keyval": ...}`; the tag is the key type.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "keytype")]
pub enum Key {
    /// An ed25519 key.
    #[serde(rename = "ed25519")]
    Ed25519 {
        /// The public key value.
        keyval: Ed25519Key,
        /// The signature scheme the key is used with.
        scheme: Ed25519Scheme,
    },
}

/// The ed25519 signature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Ed25519Scheme {
    /// `ed25519`: EdDSA over Curve25519.
    #[serde(rename = "ed25519")]
    Ed25519,
}

/// An ed25519 public key value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ed25519Key {
    /// The hex-encoded public key.
    pub public: Decoded<Hex>,
}

impl Key {
    /// Verify a signature over `msg` made with this key.
    pub fn verify(&self, msg: &[u8], signature: &[u8]) -> bool {
        match self {
            Key::Ed25519 {
                keyval,
                scheme: Ed25519Scheme::Ed25519,
            } => UnparsedPublicKey::new(&ring::signature::ED25519, keyval.public.as_ref())
                .verify(msg, signature)
                .is_ok(),
        }
    }

    /// Calculate this key's ID: the SHA-256 digest of the key's canonical JSON
    /// form. Clients must recalculate and compare this for every key they load.
    pub fn key_id(&self) -> Result<Decoded<Hex>> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, CanonicalFormatter::new());
        self.serialize(&mut ser)
            .context(error::JsonSerializationSnafu { what: "key" })?;
        Ok(Decoded::from(digest(&SHA256, &buf).as_ref().to_vec()))
    }
}
