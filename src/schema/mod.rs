#![allow(clippy::used_underscore_binding)]

//! Provides the signed metadata objects: root, timestamp, snapshot, and
//! targets, along with signature-threshold verification of each.

mod de;
pub mod decoded;
mod error;
pub mod key;
mod verify;

use crate::schema::decoded::{Decoded, Hex};
pub use crate::schema::error::{Error, Result};
use crate::schema::key::Key;
use chrono::{DateTime, Utc};
use olpc_cjson::CanonicalFormatter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_plain::{forward_display_to_serde, forward_from_str_to_serde};
use snafu::ResultExt;
use std::collections::HashMap;
use std::num::NonZeroU64;

/// The hashes-map key under which a target's content address is stored. A
/// content address is sufficient on its own for integrity verification
/// because the transport's addressing scheme binds content to address.
pub const CONTENT_ADDRESS_ALGORITHM: &str = "ipfs";

/// The type of metadata role.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RoleType {
    /// The root role delegates trust to specific keys trusted for all other
    /// top-level roles used in the system.
    Root,
    /// The timestamp role is used to prevent an adversary from replaying an
    /// out-of-date signed metadata file whose signature has not yet expired.
    Timestamp,
    /// The snapshot role signs a metadata file that provides information about
    /// the latest version of all targets metadata on the repository.
    Snapshot,
    /// The targets role's signature indicates which target files are trusted
    /// by clients.
    Targets,
}

forward_display_to_serde!(RoleType);
forward_from_str_to_serde!(RoleType);

/// Common trait implemented by all roles.
pub trait Role: Serialize {
    /// The type of role this object represents.
    const TYPE: RoleType;

    /// Determines when metadata should be considered expired and no longer
    /// trusted by clients.
    fn expires(&self) -> DateTime<Utc>;

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    fn version(&self) -> NonZeroU64;

    /// The filename the role's metadata is published under on the repository.
    fn filename(&self, consistent_snapshot: bool) -> String;

    /// A deterministic JSON serialization used when signing a metadata object
    /// and when calculating its digest.
    /// [More info on canonical JSON](http://wiki.laptop.org/go/Canonical_JSON)
    fn canonical_form(&self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut data, CanonicalFormatter::new());
        self.serialize(&mut ser)
            .context(error::JsonSerializationSnafu { what: "role" })?;
        Ok(data)
    }
}

/// A signed metadata object.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Signed<T> {
    /// The role that is signed.
    pub signed: T,
    /// A list of signatures and their key IDs.
    pub signatures: Vec<Signature>,
}

/// A signature and the key ID that made it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Signature {
    /// The key ID (listed in root.json) that made this signature.
    pub keyid: Decoded<Hex>,
    /// A hex-encoded signature of the canonical JSON form of a role.
    pub sig: Decoded<Hex>,
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// The root.json file is signed by the root role's keys. It indicates which
/// keys are authorized for all top-level roles, including the root role
/// itself. Revocation and replacement of top-level role keys is done by
/// changing the keys listed for the roles in this file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type")]
#[serde(rename = "root")]
pub struct Root {
    /// A string that contains the version number of the TUF specification.
    pub spec_version: String,

    /// A boolean indicating whether the repository supports consistent
    /// snapshots. When true, snapshot and targets metadata filenames are
    /// prefixed with their version number.
    pub consistent_snapshot: bool,

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    pub version: NonZeroU64,

    /// Determines when metadata should be considered expired and no longer
    /// trusted by clients.
    pub expires: DateTime<Utc>,

    /// The public keys for all roles. The KEYID must be correct for the
    /// specified KEY; clients recalculate each key ID and refuse keys for
    /// which it does not match.
    #[serde(deserialize_with = "de::deserialize_keys")]
    pub keys: HashMap<Decoded<Hex>, Key>,

    /// A list of roles, the keys associated with each role, and the threshold
    /// of signatures used for each role.
    pub roles: HashMap<RoleType, RoleKeys>,

    /// Extra arguments found during deserialization.
    ///
    /// We must store these to correctly verify signatures for this object.
    ///
    /// If you're instantiating this struct, you should make this
    /// `HashMap::new()`.
    #[serde(flatten)]
    #[serde(deserialize_with = "de::extra_skip_type")]
    pub _extra: HashMap<String, Value>,
}

/// Represents the key IDs used for a role and the threshold of signatures
/// required to validate it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RoleKeys {
    /// The key IDs used for the role.
    pub keyids: Vec<Decoded<Hex>>,

    /// The threshold of signatures required to validate the role.
    pub threshold: NonZeroU64,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

impl Role for Root {
    const TYPE: RoleType = RoleType::Root;

    fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    fn version(&self) -> NonZeroU64 {
        self.version
    }

    fn filename(&self, _consistent_snapshot: bool) -> String {
        format!("{}.root.json", self.version())
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// Represents a `timestamp.json` file. The timestamp file is signed by a
/// timestamp key. It indicates the latest version of the snapshot metadata
/// and is frequently resigned to limit the amount of time a client can be
/// kept unaware of interference with obtaining updates.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type")]
#[serde(rename = "timestamp")]
pub struct Timestamp {
    /// A string that contains the version number of the TUF specification.
    pub spec_version: String,

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    pub version: NonZeroU64,

    /// Determines when metadata should be considered expired and no longer
    /// trusted by clients.
    pub expires: DateTime<Utc>,

    /// A description of the snapshot metadata file. This MUST only include a
    /// description of the snapshot.json file.
    pub meta: HashMap<String, TimestampMeta>,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    #[serde(deserialize_with = "de::extra_skip_type")]
    pub _extra: HashMap<String, Value>,
}

/// Describes the snapshot.json file in a `timestamp.json` file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TimestampMeta {
    /// The integer length in bytes of the snapshot.json file. OPTIONAL; when
    /// omitted the client bounds the download with its own limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,

    /// Hashes of the snapshot.json file. OPTIONAL; when omitted the version
    /// number alone identifies the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<Hashes>,

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    pub version: NonZeroU64,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

impl Timestamp {
    /// The meta entry describing the current snapshot.
    pub fn snapshot_meta(&self) -> Option<&TimestampMeta> {
        self.meta.get("snapshot.json")
    }
}

impl Role for Timestamp {
    const TYPE: RoleType = RoleType::Timestamp;

    fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    fn version(&self) -> NonZeroU64 {
        self.version
    }

    fn filename(&self, _consistent_snapshot: bool) -> String {
        "timestamp.json".to_string()
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// Represents a `snapshot.json` file. It lists the version numbers of the
/// targets metadata, and MAY also list its length and file hashes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type")]
#[serde(rename = "snapshot")]
pub struct Snapshot {
    /// A string that contains the version number of the TUF specification.
    pub spec_version: String,

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    pub version: NonZeroU64,

    /// Determines when metadata should be considered expired and no longer
    /// trusted by clients.
    pub expires: DateTime<Utc>,

    /// The expected version (and optionally length and hashes) of every other
    /// metadata file, keyed by its filename on the repository.
    pub meta: HashMap<String, SnapshotMeta>,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    #[serde(deserialize_with = "de::extra_skip_type")]
    pub _extra: HashMap<String, Value>,
}

/// Represents a metadata file described in a `snapshot.json` file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SnapshotMeta {
    /// The integer length in bytes of the metadata file. OPTIONAL; when
    /// omitted the client bounds the download with its own limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,

    /// Hashes of the metadata file. OPTIONAL; when omitted the repository
    /// must guarantee that the version alone unambiguously identifies it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<Hashes>,

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    pub version: NonZeroU64,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

/// Represents the hash dictionary for a metadata file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Hashes {
    /// The SHA-256 digest of a metadata file.
    pub sha256: Decoded<Hex>,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

impl Role for Snapshot {
    const TYPE: RoleType = RoleType::Snapshot;

    fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    fn version(&self) -> NonZeroU64 {
        self.version
    }

    fn filename(&self, consistent_snapshot: bool) -> String {
        if consistent_snapshot {
            format!("{}.snapshot.json", self.version())
        } else {
            "snapshot.json".to_string()
        }
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// Represents a `targets.json` file, mapping each trusted target path to the
/// record a client needs to download and verify it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type")]
#[serde(rename = "targets")]
pub struct Targets {
    /// A string that contains the version number of the TUF specification.
    pub spec_version: String,

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    pub version: NonZeroU64,

    /// Determines when metadata should be considered expired and no longer
    /// trusted by clients.
    pub expires: DateTime<Utc>,

    /// Each key is a target path: a path to a file, relative to the logical
    /// root of the repository's target tree.
    pub targets: HashMap<String, Target>,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    #[serde(deserialize_with = "de::extra_skip_type")]
    pub _extra: HashMap<String, Value>,
}

/// The record for a single target path.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Target {
    /// The integer length in bytes of the target file. OPTIONAL for
    /// content-addressed targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,

    /// One or more hashes of the target file, keyed by algorithm name. The
    /// reserved [`CONTENT_ADDRESS_ALGORITHM`] entry holds the target's
    /// content address; other entries hold hex digests.
    pub hashes: HashMap<String, String>,

    /// If defined, the elements and values of "custom" will be made available
    /// to the client application. The information in "custom" is opaque to the
    /// framework.
    #[serde(default)]
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub custom: HashMap<String, Value>,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

impl Target {
    /// The content address of this target, if its record declares one.
    pub fn content_address(&self) -> Option<&str> {
        self.hashes.get(CONTENT_ADDRESS_ALGORITHM).map(String::as_str)
    }
}

impl Role for Targets {
    const TYPE: RoleType = RoleType::Targets;

    fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    fn version(&self) -> NonZeroU64 {
        self.version
    }

    fn filename(&self, consistent_snapshot: bool) -> String {
        if consistent_snapshot {
            format!("{}.targets.json", self.version())
        } else {
            "targets.json".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use maplit::hashmap;

    fn nz(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    #[test]
    fn canonical_form_is_deterministic() {
        let timestamp = Timestamp {
            spec_version: "1.0.0".to_string(),
            version: nz(3),
            expires: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            meta: hashmap! {
                "snapshot.json".to_string() => TimestampMeta {
                    length: None,
                    hashes: None,
                    version: nz(3),
                    _extra: HashMap::new(),
                },
            },
            _extra: HashMap::new(),
        };
        let first = timestamp.canonical_form().unwrap();
        let second = timestamp.canonical_form().unwrap();
        assert_eq!(first, second);
        let json = String::from_utf8(first).unwrap();
        assert!(json.contains("\"_type\":\"timestamp\""));
    }

    #[test]
    fn content_address_lookup() {
        let target = Target {
            length: Some(14),
            hashes: hashmap! {
                CONTENT_ADDRESS_ALGORITHM.to_string() => "QmTestCid".to_string(),
            },
            custom: HashMap::new(),
            _extra: HashMap::new(),
        };
        assert_eq!(target.content_address(), Some("QmTestCid"));

        let bare = Target {
            length: None,
            hashes: HashMap::new(),
            custom: HashMap::new(),
            _extra: HashMap::new(),
        };
        assert_eq!(bare.content_address(), None);
    }

    #[test]
    fn role_names_round_trip() {
        assert_eq!(RoleType::Timestamp.to_string(), "timestamp");
        assert_eq!("targets".parse::<RoleType>().unwrap(), RoleType::Targets);
        assert!("mirrors".parse::<RoleType>().is_err());
    }
}
