// Copyright 2019 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::error::{self, Result};
use crate::io::{DigestAdapter, MaxSizeAdapter};
use crate::transport::Transport;
use snafu::ResultExt;
use std::io::Read;
use url::Url;

/// Fetches `url` through `transport`, failing if more than `max_size` bytes
/// are read. `specifier` names the source of the size limit for the error
/// message.
pub(crate) fn fetch_max_size(
    transport: &dyn Transport,
    url: Url,
    max_size: u64,
    specifier: &'static str,
) -> Result<Box<dyn Read + Send>> {
    let reader = transport
        .fetch(url.clone())
        .with_context(|_| error::TransportSnafu { url: url.clone() })?;
    Ok(Box::new(MaxSizeAdapter::new(reader, specifier, max_size)))
}

/// Fetches `url` through `transport`, failing if more than `size` bytes are
/// read or if the bytes read do not match the given SHA-256 digest.
pub(crate) fn fetch_sha256(
    transport: &dyn Transport,
    url: Url,
    size: u64,
    specifier: &'static str,
    sha256: &[u8],
) -> Result<Box<dyn Read + Send>> {
    let reader = fetch_max_size(transport, url.clone(), size, specifier)?;
    Ok(Box::new(DigestAdapter::sha256(reader, sha256, url)))
}
