//! Downloading targets into the local cache directory.

use crate::error::{self, Result};
use crate::schema::Target;
use crate::{encode_filename, gateway, TargetName, Updater};
use log::debug;
use snafu::ResultExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

impl Updater {
    /// Downloads a target's bytes from the content-addressed gateway, verifies
    /// them against `target`, and writes them to `filepath`, or to the default
    /// location for `name` under the targets directory. The write is atomic; a
    /// failed download leaves nothing at the destination.
    pub fn download_target(
        &self,
        name: &TargetName,
        target: &Target,
        filepath: Option<&Path>,
    ) -> Result<PathBuf> {
        let path = self.resolve_target_path(name, filepath);
        let data = gateway::fetch_target(self.transport.as_ref(), &self.gateway_url, name, target)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).context(error::CacheDirectoryCreateSnafu { path: dir })?;
        let mut tmp =
            NamedTempFile::new_in(dir).context(error::CacheFileWriteSnafu { path: &path })?;
        tmp.write_all(&data)
            .context(error::CacheFileWriteSnafu { path: &path })?;
        tmp.persist(&path)
            .context(error::CacheTargetPersistSnafu { path: &path })?;

        debug!("downloaded target '{}' to '{}'", name, path.display());
        Ok(path)
    }

    /// Returns the local path for `name` if a file already exists there,
    /// without verifying its contents.
    pub fn find_cached_target(
        &self,
        name: &TargetName,
        filepath: Option<&Path>,
    ) -> Option<PathBuf> {
        let path = self.resolve_target_path(name, filepath);
        if path.is_file() {
            Some(path)
        } else {
            None
        }
    }

    /// The destination used when the caller does not name one: the
    /// percent-encoded target name under the targets directory.
    fn resolve_target_path(&self, name: &TargetName, filepath: Option<&Path>) -> PathBuf {
        match filepath {
            Some(path) => path.to_path_buf(),
            None => self.targets_dir.join(encode_filename(name.raw())),
        }
    }
}
