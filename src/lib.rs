// Copyright 2019 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

//! `holdfast` is a client for [TUF](https://theupdateframework.github.io/)
//! repositories whose target files are retrieved by content address from an
//! IPFS-style HTTP gateway.
//!
//! The client walks the ordered TUF workflow on every refresh: it extends the
//! root-of-trust chain one version at a time, then verifies and adopts the
//! timestamp, snapshot, and targets metadata, enforcing signature thresholds,
//! version monotonicity, and expiration along the way. A failed step never
//! disturbs previously trusted metadata.
//!
//! Targets are downloaded by the content address recorded in their metadata
//! rather than by repository path. Because the addressing scheme binds the
//! returned bytes to the address, no separate digest recomputation is needed
//! for the address entry itself; declared lengths and any legacy digest
//! entries are still cross-checked before a download is accepted.

mod cache;
mod datastore;
pub mod error;
mod fetch;
mod gateway;
#[cfg(feature = "http")]
mod http;
mod io;
pub mod schema;
mod transport;

use crate::datastore::Datastore;
use crate::fetch::{fetch_max_size, fetch_sha256};
use crate::schema::{Role, RoleType, Root, Signed, Snapshot, Targets, Timestamp};
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use snafu::{ensure, OptionExt, ResultExt};
use std::fmt;
use std::path::PathBuf;
use url::Url;

pub use crate::error::{Error, Result};
#[cfg(feature = "http")]
pub use crate::http::{ClientSettings, HttpTransport};
pub use crate::schema::Target;
pub use crate::transport::{
    DefaultTransport, FilesystemTransport, Transport, TransportError, TransportErrorKind,
};

/// Characters to percent-encode when converting a target name to a filename.
/// Everything except unreserved characters is escaped, including `/`, so a
/// target name maps to a single path component.
const CHARACTERS_TO_ESCAPE: AsciiSet = NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'_')
    .remove(b'-')
    .remove(b'~');

/// Percent-encode a string so it is safe to use as a filename.
pub(crate) fn encode_filename<S: AsRef<str>>(name: S) -> String {
    utf8_percent_encode(name.as_ref(), &CHARACTERS_TO_ESCAPE).to_string()
}

/// Appends a `/` to a base URL's path if it lacks one, so that `Url::join`
/// treats the last segment as a directory.
fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// The name of a target in the repository: a `/`-separated path from the
/// logical root of the target tree, matched verbatim against the trusted
/// targets metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetName {
    raw: String,
}

impl TargetName {
    /// Creates a new `TargetName`, rejecting names whose path segments could
    /// resolve outside the download directory.
    pub fn new<S: Into<String>>(raw: S) -> Result<Self> {
        let raw = raw.into();
        ensure!(
            !raw.is_empty(),
            error::UnsafeTargetNameSnafu { name: raw.as_str() }
        );
        ensure!(
            raw.split('/').all(|segment| segment != "." && segment != ".."),
            error::UnsafeTargetNameSnafu { name: raw.as_str() }
        );
        Ok(Self { raw })
    }

    /// The target name as it appears in targets metadata.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// Limits the size of documents fetched from the repository, bounding what an
/// endpoint can be made to download when metadata does not declare lengths.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// The maximum allowable size in bytes for a downloaded root.json file.
    pub max_root_size: u64,

    /// The maximum allowable size in bytes for a downloaded timestamp.json
    /// file.
    pub max_timestamp_size: u64,

    /// The maximum allowable size in bytes for a downloaded snapshot.json
    /// file, used when the timestamp metadata does not declare its length.
    pub max_snapshot_size: u64,

    /// The maximum allowable size in bytes for a downloaded targets.json
    /// file, used when the snapshot metadata does not declare its length.
    pub max_targets_size: u64,

    /// The maximum number of root updates a single refresh will accept. A
    /// repository that keeps publishing new root versions past this bound
    /// fails the refresh rather than walking the chain forever.
    pub max_root_updates: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_root_size: 1024 * 1024,
            max_timestamp_size: 1024 * 1024,
            max_snapshot_size: 10 * 1024 * 1024,
            max_targets_size: 10 * 1024 * 1024,
            max_root_updates: 1024,
        }
    }
}

/// Whether or not to fail the refresh when metadata is expired.
///
/// TUF metadata expires as a defense against freeze attacks, where an
/// adversary keeps replaying old, correctly signed metadata to hide newer
/// updates from a client. `Unsafe` skips the expiration checks; it exists for
/// working with repositories that are known-stale, and should not be used
/// against a live repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationEnforcement {
    /// Expirations are treated as fatal, as the TUF specification requires.
    Safe,
    /// Expirations are ignored.
    Unsafe,
}

/// Settings for an [`Updater`].
#[derive(Debug, Clone)]
pub struct Settings {
    /// The local directory holding trusted metadata. It must contain a
    /// `root.json` trust anchor, obtained out-of-band, before the first use;
    /// the updater persists every newly trusted document here.
    pub metadata_dir: PathBuf,

    /// The base URL that metadata files are fetched from.
    pub metadata_base_url: Url,

    /// The base URL of the content-addressed gateway that target files are
    /// fetched from.
    pub gateway_url: Url,

    /// The local directory that downloaded targets are written to.
    pub targets_dir: PathBuf,

    /// Size limits for fetched documents.
    pub limits: Limits,

    /// Whether to fail the refresh when metadata is expired.
    pub expiration_enforcement: ExpirationEnforcement,
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// A TUF repository client that downloads targets by content address.
///
/// Create one with [`Updater::new`], bring its trusted metadata up to date
/// with [`Updater::refresh`], then look up and download targets.
#[derive(Debug, Clone)]
pub struct Updater {
    pub(crate) transport: Box<dyn Transport>,
    metadata_base_url: Url,
    pub(crate) gateway_url: Url,
    pub(crate) targets_dir: PathBuf,
    limits: Limits,
    expiration_enforcement: ExpirationEnforcement,
    datastore: Datastore,
    root: Signed<Root>,
    timestamp: Option<Signed<Timestamp>>,
    snapshot: Option<Signed<Snapshot>>,
    targets: Option<Signed<Targets>>,
}

impl Updater {
    /// Creates a new `Updater`, loading and verifying the `root.json` trust
    /// anchor from the metadata directory. Trusted timestamp and snapshot
    /// documents persisted by earlier runs are picked up as well, so that
    /// rollback protection spans restarts.
    pub fn new(transport: Box<dyn Transport>, settings: Settings) -> Result<Self> {
        let Settings {
            metadata_dir,
            metadata_base_url,
            gateway_url,
            targets_dir,
            limits,
            expiration_enforcement,
        } = settings;

        let datastore = Datastore::new(metadata_dir.clone());
        let data = datastore
            .bytes("root.json")?
            .context(error::RootNotFoundSnafu {
                path: metadata_dir.join("root.json"),
            })?;
        let root: Signed<Root> = serde_json::from_slice(&data)
            .context(error::ParseTrustedMetadataSnafu { role: RoleType::Root })?;
        // The trust anchor vouches for itself; its own threshold must hold.
        root.signed
            .verify_role(&root)
            .context(error::VerifyTrustedMetadataSnafu { role: RoleType::Root })?;

        let mut updater = Self {
            transport,
            metadata_base_url: ensure_trailing_slash(metadata_base_url),
            gateway_url: ensure_trailing_slash(gateway_url),
            targets_dir,
            limits,
            expiration_enforcement,
            datastore,
            root,
            timestamp: None,
            snapshot: None,
            targets: None,
        };
        updater.timestamp = updater.load_cached("timestamp.json");
        updater.snapshot = updater.load_cached("snapshot.json");
        Ok(updater)
    }

    /// Refreshes the trusted metadata, walking the TUF client workflow in
    /// order: root chain, then timestamp, then snapshot, then targets. Each
    /// document is adopted (and persisted) only after it fully verifies; a
    /// failure at any step returns immediately and leaves every previously
    /// trusted document in force.
    pub fn refresh(&mut self) -> Result<()> {
        self.update_root()?;
        self.update_timestamp()?;
        self.update_snapshot()?;
        self.update_targets()?;
        Ok(())
    }

    /// Looks up the trusted record for a target, refreshing first if no
    /// targets metadata has been trusted yet. Returns `Ok(None)` for a name
    /// that is not in the trusted targets metadata.
    pub fn get_target_info(&mut self, name: &TargetName) -> Result<Option<Target>> {
        if self.targets.is_none() {
            self.refresh()?;
        }
        Ok(self
            .targets
            .as_ref()
            .and_then(|targets| targets.signed.targets.get(name.raw()).cloned()))
    }

    /// The trusted root metadata.
    pub fn root(&self) -> &Signed<Root> {
        &self.root
    }

    /// The trusted timestamp metadata, if any refresh has adopted one.
    pub fn timestamp(&self) -> Option<&Signed<Timestamp>> {
        self.timestamp.as_ref()
    }

    /// The trusted snapshot metadata, if any refresh has adopted one.
    pub fn snapshot(&self) -> Option<&Signed<Snapshot>> {
        self.snapshot.as_ref()
    }

    /// The trusted targets metadata, if any refresh has adopted one.
    pub fn targets(&self) -> Option<&Signed<Targets>> {
        self.targets.as_ref()
    }

    /// Walks the root chain forward one version at a time, starting from the
    /// currently trusted root, until the repository reports that no newer
    /// version exists.
    ///
    /// Each candidate must satisfy the threshold of the root it supersedes
    /// (the rotation proof) and its own declared threshold, and must carry
    /// exactly the version that was requested. An expired final root blocks
    /// all further trust extension.
    fn update_root(&mut self) -> Result<()> {
        let mut updates: u64 = 0;
        loop {
            let version = self.root.signed.version.get() + 1;
            let filename = format!("{}.root.json", version);
            let url = self
                .metadata_base_url
                .join(&filename)
                .with_context(|_| error::JoinUrlSnafu {
                    path: filename.clone(),
                    url: self.metadata_base_url.clone(),
                })?;
            let reader = match fetch_max_size(
                self.transport.as_ref(),
                url,
                self.limits.max_root_size,
                "max_root_size argument",
            ) {
                Ok(reader) => reader,
                Err(Error::Transport { ref source, .. })
                    if matches!(source.kind, TransportErrorKind::FileNotFound) =>
                {
                    break;
                }
                Err(err) => return Err(err),
            };
            ensure!(
                updates < self.limits.max_root_updates,
                error::MaxRootUpdatesExceededSnafu {
                    max_root_updates: self.limits.max_root_updates
                }
            );

            let new_root: Signed<Root> = serde_json::from_reader(reader)
                .context(error::ParseMetadataSnafu { role: RoleType::Root })?;
            self.root
                .signed
                .verify_role(&new_root)
                .context(error::VerifyMetadataSnafu { role: RoleType::Root })?;
            new_root
                .signed
                .verify_role(&new_root)
                .context(error::VerifyMetadataSnafu { role: RoleType::Root })?;
            ensure!(
                new_root.signed.version.get() == version,
                error::VersionMismatchSnafu {
                    role: RoleType::Root,
                    fetched: new_root.signed.version.get(),
                    expected: version,
                }
            );

            self.datastore.create("root.json", &new_root)?;
            self.root = new_root;
            updates += 1;
            debug!("updated root to version {}", version);
        }
        self.check_expired(&self.root.signed)
    }

    /// Fetches the timestamp metadata, which is never version-prefixed, and
    /// adopts it if it verifies and advances. Re-fetching the version already
    /// trusted is a no-op, so that re-polling an unchanged repository
    /// succeeds.
    fn update_timestamp(&mut self) -> Result<()> {
        let url = self
            .metadata_base_url
            .join("timestamp.json")
            .with_context(|_| error::JoinUrlSnafu {
                path: "timestamp.json",
                url: self.metadata_base_url.clone(),
            })?;
        let reader = fetch_max_size(
            self.transport.as_ref(),
            url,
            self.limits.max_timestamp_size,
            "max_timestamp_size argument",
        )?;
        let timestamp: Signed<Timestamp> = serde_json::from_reader(reader).context(
            error::ParseMetadataSnafu {
                role: RoleType::Timestamp,
            },
        )?;
        self.root
            .signed
            .verify_role(&timestamp)
            .context(error::VerifyMetadataSnafu {
                role: RoleType::Timestamp,
            })?;
        let new_snapshot_version = timestamp
            .signed
            .snapshot_meta()
            .context(error::MetaMissingSnafu {
                file: "snapshot.json",
                role: RoleType::Timestamp,
            })?
            .version
            .get();

        if let Some(trusted) = &self.timestamp {
            let trusted_version = trusted.signed.version.get();
            let new_version = timestamp.signed.version.get();
            if new_version == trusted_version {
                // The repository re-served the timestamp we already trust.
                debug!("timestamp version {} unchanged", new_version);
                return Ok(());
            }
            ensure!(
                new_version > trusted_version,
                error::OlderMetadataSnafu {
                    role: RoleType::Timestamp,
                    current_version: trusted_version,
                    new_version,
                }
            );
            let trusted_snapshot_version = trusted
                .signed
                .snapshot_meta()
                .context(error::MetaMissingSnafu {
                    file: "snapshot.json",
                    role: RoleType::Timestamp,
                })?
                .version
                .get();
            ensure!(
                new_snapshot_version >= trusted_snapshot_version,
                error::OlderSnapshotVersionSnafu {
                    current_version: trusted_snapshot_version,
                    new_version: new_snapshot_version,
                }
            );
        }
        self.check_expired(&timestamp.signed)?;

        self.datastore.create("timestamp.json", &timestamp)?;
        self.timestamp = Some(timestamp);
        Ok(())
    }

    /// Fetches the snapshot metadata at the version the trusted timestamp
    /// names, cross-checking any length and hashes the timestamp declares for
    /// it. Every meta entry previously observed must still be present and
    /// must not regress; any regression is treated as a rollback attack.
    fn update_snapshot(&mut self) -> Result<()> {
        let meta = {
            let timestamp = self
                .timestamp
                .as_ref()
                .context(error::MissingTrustedRoleSnafu {
                    role: RoleType::Timestamp,
                })?;
            self.check_expired(&timestamp.signed)?;
            timestamp
                .signed
                .snapshot_meta()
                .context(error::MetaMissingSnafu {
                    file: "snapshot.json",
                    role: RoleType::Timestamp,
                })?
                .clone()
        };

        let filename = if self.root.signed.consistent_snapshot {
            format!("{}.snapshot.json", meta.version)
        } else {
            "snapshot.json".to_string()
        };
        let url = self
            .metadata_base_url
            .join(&filename)
            .with_context(|_| error::JoinUrlSnafu {
                path: filename.clone(),
                url: self.metadata_base_url.clone(),
            })?;
        let max_size = meta.length.unwrap_or(self.limits.max_snapshot_size);
        let reader = match &meta.hashes {
            Some(hashes) => fetch_sha256(
                self.transport.as_ref(),
                url,
                max_size,
                "timestamp.json",
                &hashes.sha256,
            )?,
            None => fetch_max_size(
                self.transport.as_ref(),
                url,
                max_size,
                "max_snapshot_size argument",
            )?,
        };
        let snapshot: Signed<Snapshot> = serde_json::from_reader(reader).context(
            error::ParseMetadataSnafu {
                role: RoleType::Snapshot,
            },
        )?;
        self.root
            .signed
            .verify_role(&snapshot)
            .context(error::VerifyMetadataSnafu {
                role: RoleType::Snapshot,
            })?;
        ensure!(
            snapshot.signed.version == meta.version,
            error::VersionMismatchSnafu {
                role: RoleType::Snapshot,
                fetched: snapshot.signed.version.get(),
                expected: meta.version.get(),
            }
        );

        if let Some(trusted) = &self.snapshot {
            for (file, trusted_meta) in &trusted.signed.meta {
                let new_meta =
                    snapshot
                        .signed
                        .meta
                        .get(file)
                        .context(error::MetaMissingSnafu {
                            file: file.clone(),
                            role: RoleType::Snapshot,
                        })?;
                ensure!(
                    new_meta.version.get() >= trusted_meta.version.get(),
                    error::OlderMetaVersionSnafu {
                        file: file.clone(),
                        current_version: trusted_meta.version.get(),
                        new_version: new_meta.version.get(),
                    }
                );
            }
        }
        self.check_expired(&snapshot.signed)?;

        self.datastore.create("snapshot.json", &snapshot)?;
        self.snapshot = Some(snapshot);
        Ok(())
    }

    /// Fetches the targets metadata at the version the trusted snapshot
    /// names, cross-checking any declared length and hashes, and adopts it as
    /// the trusted view that target lookups are served from.
    fn update_targets(&mut self) -> Result<()> {
        let meta = {
            let snapshot = self
                .snapshot
                .as_ref()
                .context(error::MissingTrustedRoleSnafu {
                    role: RoleType::Snapshot,
                })?;
            self.check_expired(&snapshot.signed)?;
            snapshot
                .signed
                .meta
                .get("targets.json")
                .context(error::MetaMissingSnafu {
                    file: "targets.json",
                    role: RoleType::Snapshot,
                })?
                .clone()
        };

        let filename = if self.root.signed.consistent_snapshot {
            format!("{}.targets.json", meta.version)
        } else {
            "targets.json".to_string()
        };
        let url = self
            .metadata_base_url
            .join(&filename)
            .with_context(|_| error::JoinUrlSnafu {
                path: filename.clone(),
                url: self.metadata_base_url.clone(),
            })?;
        let max_size = meta.length.unwrap_or(self.limits.max_targets_size);
        let reader = match &meta.hashes {
            Some(hashes) => fetch_sha256(
                self.transport.as_ref(),
                url,
                max_size,
                "snapshot.json",
                &hashes.sha256,
            )?,
            None => fetch_max_size(
                self.transport.as_ref(),
                url,
                max_size,
                "max_targets_size argument",
            )?,
        };
        let targets: Signed<Targets> = serde_json::from_reader(reader).context(
            error::ParseMetadataSnafu {
                role: RoleType::Targets,
            },
        )?;
        self.root
            .signed
            .verify_role(&targets)
            .context(error::VerifyMetadataSnafu {
                role: RoleType::Targets,
            })?;
        ensure!(
            targets.signed.version == meta.version,
            error::VersionMismatchSnafu {
                role: RoleType::Targets,
                fetched: targets.signed.version.get(),
                expected: meta.version.get(),
            }
        );
        self.check_expired(&targets.signed)?;

        self.datastore.create("targets.json", &targets)?;
        self.targets = Some(targets);
        Ok(())
    }

    /// Checks for a freeze attack: no document is trusted past its expiration
    /// at the moment of use.
    fn check_expired<T: Role>(&self, role: &T) -> Result<()> {
        if self.expiration_enforcement == ExpirationEnforcement::Unsafe {
            return Ok(());
        }
        let sys_time = self.datastore.system_time()?;
        ensure!(
            role.expires() > sys_time,
            error::ExpiredMetadataSnafu { role: T::TYPE }
        );
        Ok(())
    }

    /// Loads a trusted document persisted by an earlier run. Anything
    /// unreadable or unverifiable is discarded; the role is simply untrusted
    /// until the next refresh.
    fn load_cached<T>(&self, file: &str) -> Option<Signed<T>>
    where
        T: Role + DeserializeOwned,
    {
        let data = match self.datastore.bytes(file) {
            Ok(Some(data)) => data,
            _ => return None,
        };
        let doc: Signed<T> = match serde_json::from_slice(&data) {
            Ok(doc) => doc,
            Err(err) => {
                debug!("discarding cached {}: {}", file, err);
                let _ = self.datastore.remove(file);
                return None;
            }
        };
        match self.root.signed.verify_role(&doc) {
            Ok(()) => Some(doc),
            Err(err) => {
                debug!("discarding cached {}: {}", file, err);
                let _ = self.datastore.remove(file);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_filename, ensure_trailing_slash, TargetName};
    use url::Url;

    #[test]
    fn filenames_are_escaped() {
        assert_eq!(encode_filename("file.txt"), "file.txt");
        assert_eq!(encode_filename("dir/file.txt"), "dir%2Ffile.txt");
        assert_eq!(encode_filename("with space"), "with%20space");
        assert_eq!(encode_filename("semi;colon"), "semi%3Bcolon");
    }

    #[test]
    fn target_names_reject_traversal() {
        assert!(TargetName::new("file.txt").is_ok());
        assert!(TargetName::new("dir/file.txt").is_ok());
        assert!(TargetName::new("").is_err());
        assert!(TargetName::new("..").is_err());
        assert!(TargetName::new("dir/../escape").is_err());
        assert!(TargetName::new("./file.txt").is_err());
    }

    #[test]
    fn trailing_slashes_are_added() {
        let url = Url::parse("http://localhost:8080/gateway").unwrap();
        assert_eq!(ensure_trailing_slash(url).path(), "/gateway/");
        let url = Url::parse("http://localhost:8080/gateway/").unwrap();
        assert_eq!(ensure_trailing_slash(url).path(), "/gateway/");
    }
}
