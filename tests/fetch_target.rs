// Copyright 2020 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT OR Apache-2.0

mod test_utils;

use holdfast::schema::Target;
use holdfast::{Error, ExpirationEnforcement, Limits, Settings, TargetName, Updater};
use maplit::hashmap;
use ring::digest::{digest, SHA256};
use simulator::{RepositorySimulator, SimulatorTransport};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use test_utils::{gateway_url, metadata_base_url, test_dirs, TestDirs};

type SharedSim = Arc<Mutex<RepositorySimulator>>;

const FILE_CONTENT: &[u8] = b"file 1 content";
const FILE_CID: &str = "QmWATWQ7fVPP2EFGu71UkfnqhYXDYH566qy47CnJDgvs8u";

fn init(sim: RepositorySimulator) -> (SharedSim, TestDirs, Updater) {
    let dirs = test_dirs(&sim.signed_roots[0]);
    let shared = Arc::new(Mutex::new(sim));
    let updater = Updater::new(
        Box::new(SimulatorTransport(Arc::clone(&shared))),
        Settings {
            metadata_dir: dirs.metadata_dir.clone(),
            metadata_base_url: metadata_base_url(),
            gateway_url: gateway_url(),
            targets_dir: dirs.targets_dir.clone(),
            limits: Limits::default(),
            expiration_enforcement: ExpirationEnforcement::Safe,
        },
    )
    .unwrap();
    (shared, dirs, updater)
}

#[test]
fn download_target_writes_file() {
    let mut sim = RepositorySimulator::new();
    sim.add_target(
        "file.txt",
        FILE_CID,
        FILE_CONTENT,
        Some(FILE_CONTENT.len() as u64),
    );
    sim.bump_targets();
    let (_shared, dirs, mut updater) = init(sim);

    let name = TargetName::new("file.txt").unwrap();
    assert_eq!(updater.find_cached_target(&name, None), None);

    // get_target_info refreshes on first use
    let target = updater.get_target_info(&name).unwrap().expect("target record");
    assert_eq!(updater.targets().unwrap().signed.version.get(), 2);

    let path = updater.download_target(&name, &target, None).unwrap();
    assert_eq!(path, dirs.targets_dir.join("file.txt"));
    assert_eq!(fs::read(&path).unwrap(), FILE_CONTENT);
    assert_eq!(updater.find_cached_target(&name, None), Some(path));
}

#[test]
fn download_target_to_explicit_destination() {
    let mut sim = RepositorySimulator::new();
    sim.add_target("file.txt", FILE_CID, FILE_CONTENT, None);
    sim.bump_targets();
    let (_shared, dirs, mut updater) = init(sim);

    let name = TargetName::new("file.txt").unwrap();
    let target = updater.get_target_info(&name).unwrap().unwrap();
    let dest = dirs.tmp.path().join("custom-name.bin");
    let path = updater
        .download_target(&name, &target, Some(&dest))
        .unwrap();
    assert_eq!(path, dest);
    assert_eq!(fs::read(&dest).unwrap(), FILE_CONTENT);
}

#[test]
fn default_destination_is_percent_encoded() {
    let mut sim = RepositorySimulator::new();
    sim.add_target("dir/nested file.txt", FILE_CID, FILE_CONTENT, None);
    sim.bump_targets();
    let (_shared, dirs, mut updater) = init(sim);

    let name = TargetName::new("dir/nested file.txt").unwrap();
    let target = updater.get_target_info(&name).unwrap().unwrap();
    let path = updater.download_target(&name, &target, None).unwrap();
    assert_eq!(path, dirs.targets_dir.join("dir%2Fnested%20file.txt"));
}

#[test]
fn missing_content_address_fails_before_gateway() {
    let mut sim = RepositorySimulator::new();
    // a record carrying only a legacy digest, with no content address
    sim.targets.targets.insert(
        "orphan.bin".to_string(),
        Target {
            length: Some(4),
            hashes: hashmap! {
                "sha256".to_string() => hex::encode(digest(&SHA256, b"data")),
            },
            custom: HashMap::new(),
            _extra: HashMap::new(),
        },
    );
    sim.bump_targets();
    let (shared, dirs, mut updater) = init(sim);

    let name = TargetName::new("orphan.bin").unwrap();
    let target = updater.get_target_info(&name).unwrap().unwrap();
    match updater.download_target(&name, &target, None) {
        Err(Error::MissingContentAddress { name }) if name == "orphan.bin" => {}
        r => panic!("unexpected result: {:?}", r),
    }
    assert_eq!(shared.lock().unwrap().gateway_hits, 0);
    assert!(!dirs.targets_dir.join("orphan.bin").exists());
}

#[test]
fn gateway_missing_content_writes_nothing() {
    let mut sim = RepositorySimulator::new();
    sim.add_target("file.txt", FILE_CID, FILE_CONTENT, None);
    sim.bump_targets();
    sim.remove_content(FILE_CID);
    let (_shared, dirs, mut updater) = init(sim);

    let name = TargetName::new("file.txt").unwrap();
    let target = updater.get_target_info(&name).unwrap().unwrap();
    match updater.download_target(&name, &target, None) {
        Err(Error::Transport { url, .. }) => assert!(url.to_string().contains(FILE_CID)),
        r => panic!("unexpected result: {:?}", r),
    }
    assert!(!dirs.targets_dir.join("file.txt").exists());
}

#[test]
fn declared_length_mismatch_rejected() {
    let mut sim = RepositorySimulator::new();
    sim.add_target("file.txt", FILE_CID, FILE_CONTENT, Some(9999));
    sim.bump_targets();
    let (_shared, dirs, mut updater) = init(sim);

    let name = TargetName::new("file.txt").unwrap();
    let target = updater.get_target_info(&name).unwrap().unwrap();
    match updater.download_target(&name, &target, None) {
        Err(Error::LengthMismatch {
            expected: 9999,
            actual,
            ..
        }) => assert_eq!(actual, FILE_CONTENT.len() as u64),
        r => panic!("unexpected result: {:?}", r),
    }
    assert!(!dirs.targets_dir.join("file.txt").exists());
}

#[test]
fn legacy_digest_verified_when_present() {
    let mut sim = RepositorySimulator::new();
    sim.add_target(
        "file.txt",
        FILE_CID,
        FILE_CONTENT,
        Some(FILE_CONTENT.len() as u64),
    );
    let digest_hex = hex::encode(digest(&SHA256, FILE_CONTENT));
    sim.targets
        .targets
        .get_mut("file.txt")
        .unwrap()
        .hashes
        .insert("sha256".to_string(), digest_hex);
    sim.bump_targets();
    let (_shared, _dirs, mut updater) = init(sim);

    let name = TargetName::new("file.txt").unwrap();
    let target = updater.get_target_info(&name).unwrap().unwrap();
    let path = updater.download_target(&name, &target, None).unwrap();
    assert_eq!(fs::read(path).unwrap(), FILE_CONTENT);
}

#[test]
fn legacy_digest_mismatch_rejected() {
    let mut sim = RepositorySimulator::new();
    sim.add_target("file.txt", FILE_CID, FILE_CONTENT, None);
    let wrong_digest = hex::encode(digest(&SHA256, b"some other content"));
    sim.targets
        .targets
        .get_mut("file.txt")
        .unwrap()
        .hashes
        .insert("sha256".to_string(), wrong_digest);
    sim.bump_targets();
    let (_shared, dirs, mut updater) = init(sim);

    let name = TargetName::new("file.txt").unwrap();
    let target = updater.get_target_info(&name).unwrap().unwrap();
    match updater.download_target(&name, &target, None) {
        Err(Error::HashMismatch { .. }) => {}
        r => panic!("unexpected result: {:?}", r),
    }
    assert!(!dirs.targets_dir.join("file.txt").exists());
}

#[test]
fn plain_snapshot_repository_end_to_end() {
    let mut sim = RepositorySimulator::with_consistent_snapshot(false);
    sim.add_target(
        "file.txt",
        FILE_CID,
        FILE_CONTENT,
        Some(FILE_CONTENT.len() as u64),
    );
    sim.bump_targets();
    let (_shared, _dirs, mut updater) = init(sim);

    let name = TargetName::new("file.txt").unwrap();
    let target = updater.get_target_info(&name).unwrap().unwrap();
    let path = updater.download_target(&name, &target, None).unwrap();
    assert_eq!(fs::read(path).unwrap(), FILE_CONTENT);
}
