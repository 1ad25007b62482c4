// Copyright 2019 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::error::{self, Result};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use snafu::{ensure, ResultExt};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tempfile::NamedTempFile;

/// `Datastore` persists trusted metadata files. Every write lands in a
/// temporary file in the same directory and is renamed into place, so a
/// concurrent reader never observes a half-written document.
#[derive(Debug, Clone)]
pub(crate) struct Datastore {
    /// A lock around the datastore path.
    path_lock: Arc<RwLock<PathBuf>>,
    /// A lock to treat the `system_time` function as a critical section.
    time_lock: Arc<Mutex<()>>,
}

impl Datastore {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path_lock: Arc::new(RwLock::new(path)),
            time_lock: Arc::new(Mutex::new(())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PathBuf> {
        match self.path_lock.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, PathBuf> {
        match self.path_lock.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Get the contents of a file in the datastore, or `None` if it does not
    /// exist. This function is thread safe.
    pub(crate) fn bytes(&self, file: &str) -> Result<Option<Vec<u8>>> {
        let lock = self.read();
        let path = lock.join(file);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) => match err.kind() {
                ErrorKind::NotFound => Ok(None),
                _ => Err(err).context(error::DatastoreOpenSnafu { path: &path }),
            },
        }
    }

    /// Writes a JSON metadata file in the datastore atomically. This function
    /// is thread safe.
    pub(crate) fn create<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let lock = self.write();
        let path = lock.join(file);
        let mut tmp =
            NamedTempFile::new_in(&*lock).context(error::DatastoreCreateSnafu { path: &path })?;
        serde_json::to_writer(&mut tmp, value).with_context(|_| error::DatastoreSerializeSnafu {
            what: format!("{} in datastore", file),
            path: path.clone(),
        })?;
        tmp.persist(&path)
            .context(error::DatastorePersistSnafu { path: &path })?;
        debug!("wrote '{}'", path.display());
        Ok(())
    }

    /// Deletes a file from the datastore. This function is thread safe.
    pub(crate) fn remove(&self, file: &str) -> Result<()> {
        let lock = self.write();
        let path = lock.join(file);
        debug!("removing '{}'", path.display());
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) => match err.kind() {
                ErrorKind::NotFound => Ok(()),
                _ => Err(err).context(error::DatastoreRemoveSnafu { path: &path }),
            },
        }
    }

    /// Ensures that system time has not stepped backward since it was last
    /// sampled. This function is protected by a lock guard to ensure thread
    /// safety.
    pub(crate) fn system_time(&self) -> Result<DateTime<Utc>> {
        // Treat this function as a critical section. This lock is not used for
        // anything else.
        let lock = match self.time_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let file = "latest_known_time.json";
        // Load the latest known system time, if it exists
        let poss_latest_known_time = self
            .bytes(file)?
            .map(|b| serde_json::from_slice::<DateTime<Utc>>(&b));

        // Get 'current' system time
        let sys_time = Utc::now();

        if let Some(Ok(latest_known_time)) = poss_latest_known_time {
            // Make sure the sampled system time did not go back in time
            ensure!(
                sys_time >= latest_known_time,
                error::SystemTimeSteppedBackwardSnafu {
                    sys_time,
                    latest_known_time
                }
            );
        }
        // Store the latest known time as an RFC 3339 string
        self.create(file, &sys_time)?;

        drop(lock);
        Ok(sys_time)
    }
}
