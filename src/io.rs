// Copyright 2019 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::error;
use ring::digest::{Context, SHA256};
use std::io::{self, ErrorKind, Read};
use url::Url;

/// Wraps a `Read` object and verifies the SHA-256 digest of everything read
/// through it once the underlying reader is exhausted.
pub(crate) struct DigestAdapter<R> {
    url: Url,
    reader: R,
    hash: Vec<u8>,
    digest: Option<Context>,
}

impl<R: Read> DigestAdapter<R> {
    pub(crate) fn sha256(reader: R, hash: &[u8], url: Url) -> Self {
        Self {
            url,
            reader,
            hash: hash.to_owned(),
            digest: Some(Context::new(&SHA256)),
        }
    }
}

impl<R: Read> Read for DigestAdapter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.reader.read(buf)?;
        if size == 0 {
            // EOF; the digest is finished and checked exactly once.
            if let Some(context) = self.digest.take() {
                let result = context.finish();
                if result.as_ref() != self.hash.as_slice() {
                    let err = error::HashMismatchSnafu {
                        context: self.url.to_string(),
                        calculated: hex::encode(&result),
                        expected: hex::encode(&self.hash),
                    }
                    .build();
                    return Err(io::Error::new(ErrorKind::InvalidData, err));
                }
            }
            Ok(0)
        } else {
            if let Some(context) = &mut self.digest {
                context.update(&buf[..size]);
            }
            Ok(size)
        }
    }
}

/// Wraps a `Read` object and fails with an error if more than `max_size`
/// bytes come out of it.
pub(crate) struct MaxSizeAdapter<R> {
    reader: R,
    specifier: &'static str,
    max_size: u64,
    size: u64,
}

impl<R: Read> MaxSizeAdapter<R> {
    pub(crate) fn new(reader: R, specifier: &'static str, max_size: u64) -> Self {
        Self {
            reader,
            specifier,
            max_size,
            size: 0,
        }
    }
}

impl<R: Read> Read for MaxSizeAdapter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.reader.read(buf)?;
        self.size = self.size.saturating_add(size as u64);
        if self.size > self.max_size {
            let err = error::MaxSizeExceededSnafu {
                max_size: self.max_size,
                specifier: self.specifier,
            }
            .build();
            return Err(io::Error::new(ErrorKind::InvalidData, err));
        }
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use crate::io::{DigestAdapter, MaxSizeAdapter};
    use hex_literal::hex;
    use std::io::{Cursor, Read};
    use url::Url;

    #[test]
    fn test_max_size_adapter() {
        let mut reader = MaxSizeAdapter::new(Cursor::new(b"hello".to_vec()), "test", 5);
        let mut buf = Vec::new();
        assert!(reader.read_to_end(&mut buf).is_ok());
        assert_eq!(buf, b"hello");

        let mut reader = MaxSizeAdapter::new(Cursor::new(b"hello".to_vec()), "test", 4);
        let mut buf = Vec::new();
        assert!(reader.read_to_end(&mut buf).is_err());
    }

    #[test]
    fn test_digest_adapter() {
        let mut reader = DigestAdapter::sha256(
            Cursor::new(b"hello".to_vec()),
            &hex!("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"),
            Url::parse("file:///").unwrap(),
        );
        let mut buf = Vec::new();
        assert!(reader.read_to_end(&mut buf).is_ok());
        assert_eq!(buf, b"hello");

        let mut reader = DigestAdapter::sha256(
            Cursor::new(b"hello".to_vec()),
            &hex!("0ebdc3317b75839f643387d783535adc360ca01f33c75f7c1e7373adcd675c0b"),
            Url::parse("file:///").unwrap(),
        );
        let mut buf = Vec::new();
        assert!(reader.read_to_end(&mut buf).is_err());
    }
}
