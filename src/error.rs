// Copyright 2019 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains the error type for this library.

use crate::schema::RoleType;
use crate::transport::TransportError;
use chrono::{DateTime, Utc};
use snafu::Snafu;
use std::path::PathBuf;
use url::Url;

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for this library.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum Error {
    /// A metadata file could not be removed from the datastore.
    #[snafu(display("Failed to remove '{}': {}", path.display(), source))]
    DatastoreRemove {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A metadata file could not be opened from the datastore.
    #[snafu(display("Failed to open '{}': {}", path.display(), source))]
    DatastoreOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A temporary file could not be created in the datastore directory.
    #[snafu(display("Failed to create temporary file in '{}': {}", path.display(), source))]
    DatastoreCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A fully-written metadata file could not be moved into place.
    #[snafu(display("Failed to persist '{}': {}", path.display(), source))]
    DatastorePersist {
        path: PathBuf,
        source: tempfile::PersistError,
    },

    #[snafu(display("Failed to serialize {} to JSON for '{}': {}", what, path.display(), source))]
    DatastoreSerialize {
        what: String,
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The target download directory could not be created.
    #[snafu(display("Failed to create directory '{}': {}", path.display(), source))]
    CacheDirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A downloaded target could not be written to its destination.
    #[snafu(display("Failed to write target to '{}': {}", path.display(), source))]
    CacheFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A fully-written target file could not be moved into place.
    #[snafu(display("Failed to persist target at '{}': {}", path.display(), source))]
    CacheTargetPersist {
        path: PathBuf,
        source: tempfile::PersistError,
    },

    /// A role's metadata is expired and `ExpirationEnforcement` is `Safe`.
    #[snafu(display("Found expired metadata for role '{}'", role))]
    ExpiredMetadata { role: RoleType },

    /// A downloaded document or target did not match a digest declared for it.
    #[snafu(display(
        "Hash mismatch for '{}': calculated '{}', expected '{}'",
        context,
        calculated,
        expected
    ))]
    HashMismatch {
        context: String,
        calculated: String,
        expected: String,
    },

    /// A path could not be joined onto a base URL.
    #[snafu(display("Failed to join '{}' to URL '{}': {}", path, url, source))]
    JoinUrl {
        path: String,
        url: Url,
        source: url::ParseError,
    },

    /// A downloaded target's size did not match the length its record declares.
    #[snafu(display(
        "Downloaded target from '{}' is {} bytes, but its metadata declares {} bytes",
        url,
        actual,
        expected
    ))]
    LengthMismatch { url: Url, expected: u64, actual: u64 },

    /// The repository kept publishing new root versions past the configured bound.
    #[snafu(display(
        "Root metadata updated more than the maximum allowed {} times",
        max_root_updates
    ))]
    MaxRootUpdatesExceeded { max_root_updates: u64 },

    /// A fetched document exceeded a size limit.
    #[snafu(display("Downloaded data exceeded the maximum size of {} bytes from {}", max_size, specifier))]
    MaxSizeExceeded {
        max_size: u64,
        specifier: &'static str,
    },

    /// A file expected to be described by a role's `meta` map was not present.
    #[snafu(display("Role '{}' is missing the '{}' meta entry", role, file))]
    MetaMissing { file: String, role: RoleType },

    /// A target record has no content-address entry to download it by.
    #[snafu(display("Target '{}' has no content address in its hashes", name))]
    MissingContentAddress { name: String },

    /// A refresh step ran before the step that provides its input.
    #[snafu(display("No trusted metadata is available for role '{}'", role))]
    MissingTrustedRole { role: RoleType },

    /// A fetched document's version regressed below the trusted one.
    #[snafu(display(
        "Found version {} of {} metadata when version {} is already trusted",
        new_version,
        role,
        current_version
    ))]
    OlderMetadata {
        role: RoleType,
        current_version: u64,
        new_version: u64,
    },

    /// A snapshot meta entry's version regressed below the trusted one.
    #[snafu(display(
        "Snapshot lists version {} for '{}' when version {} is already trusted",
        new_version,
        file,
        current_version
    ))]
    OlderMetaVersion {
        file: String,
        current_version: u64,
        new_version: u64,
    },

    /// The timestamp's referenced snapshot version regressed below the trusted one.
    #[snafu(display(
        "Timestamp references snapshot version {} when version {} is already trusted",
        new_version,
        current_version
    ))]
    OlderSnapshotVersion {
        current_version: u64,
        new_version: u64,
    },

    /// A fetched document failed to parse.
    #[snafu(display("Failed to parse {} metadata: {}", role, source))]
    ParseMetadata {
        role: RoleType,
        source: serde_json::Error,
    },

    /// A locally stored trusted document failed to parse.
    #[snafu(display("Failed to parse trusted {} metadata: {}", role, source))]
    ParseTrustedMetadata {
        role: RoleType,
        source: serde_json::Error,
    },

    /// The bytes of a downloaded target could not be read from the transport.
    #[snafu(display("Failed to read '{}': {}", url, source))]
    Read {
        url: Url,
        source: std::io::Error,
    },

    /// The bootstrap trust anchor is absent. There is no embedded root to fall
    /// back to, so the caller must provision one.
    #[snafu(display("No trusted root metadata found at '{}'", path.display()))]
    RootNotFound { path: PathBuf },

    /// The system clock reported an earlier time than a previous run observed.
    #[snafu(display(
        "System time stepped backward: system time '{}', last known time '{}'",
        sys_time,
        latest_known_time
    ))]
    SystemTimeSteppedBackward {
        sys_time: DateTime<Utc>,
        latest_known_time: DateTime<Utc>,
    },

    /// A transport-level retrieval failure; carries the attempted URL.
    #[snafu(display("Failed to fetch '{}': {}", url, source))]
    Transport { url: Url, source: TransportError },

    /// A target name would escape the download directory.
    #[snafu(display("Unsafe target name '{}'", name))]
    UnsafeTargetName { name: String },

    /// A fetched document did not carry enough valid signatures.
    #[snafu(display("Failed to verify {} metadata: {}", role, source))]
    VerifyMetadata {
        role: RoleType,
        source: crate::schema::Error,
    },

    /// A locally stored trusted document did not carry enough valid signatures.
    #[snafu(display("Failed to verify trusted {} metadata: {}", role, source))]
    VerifyTrustedMetadata {
        role: RoleType,
        source: crate::schema::Error,
    },

    /// A fetched document reported a different version than the one requested.
    #[snafu(display(
        "Fetched {} metadata reports version {}, expected version {}",
        role,
        fetched,
        expected
    ))]
    VersionMismatch {
        role: RoleType,
        fetched: u64,
        expected: u64,
    },
}
