// Copyright 2020 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Utilities for tests. Not every test module uses every helper, so we
//! suppress unused warnings.
#![allow(unused)]

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use url::Url;

/// The on-disk layout for a test client: a metadata directory seeded with the
/// bootstrap root and an empty targets directory.
pub struct TestDirs {
    pub tmp: TempDir,
    pub metadata_dir: PathBuf,
    pub targets_dir: PathBuf,
}

/// Creates the client directories and writes the bootstrap `root.json`.
pub fn test_dirs(bootstrap_root: &[u8]) -> TestDirs {
    let tmp = TempDir::new().unwrap();
    let metadata_dir = tmp.path().join("metadata");
    let targets_dir = tmp.path().join("targets");
    fs::create_dir(&metadata_dir).unwrap();
    fs::create_dir(&targets_dir).unwrap();
    fs::write(metadata_dir.join("root.json"), bootstrap_root).unwrap();
    TestDirs {
        tmp,
        metadata_dir,
        targets_dir,
    }
}

/// The metadata base URL the simulator answers for.
pub fn metadata_base_url() -> Url {
    Url::parse("https://example.com/metadata/").unwrap()
}

/// The gateway base URL the simulator answers for.
pub fn gateway_url() -> Url {
    Url::parse("http://127.0.0.1:8080").unwrap()
}
