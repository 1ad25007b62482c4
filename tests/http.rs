// Copyright 2020 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT OR Apache-2.0

#![cfg(feature = "http")]

use holdfast::{HttpTransport, Transport, TransportErrorKind};
use httptest::{matchers::request, responders::status_code, Expectation, Server};
use std::io::Read;
use url::Url;

#[test]
fn http_transport_fetches_content() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/ipfs/QmTestCid"))
            .respond_with(status_code(200).body("file 1 content")),
    );

    let url = Url::parse(&server.url_str("/ipfs/QmTestCid")).unwrap();
    let mut reader = HttpTransport::new().fetch(url).unwrap();
    let mut data = Vec::new();
    reader.read_to_end(&mut data).unwrap();
    assert_eq!(data, b"file 1 content".to_vec());
}

#[test]
fn http_transport_reports_not_found() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/ipfs/QmMissing"))
            .respond_with(status_code(404)),
    );

    let url = Url::parse(&server.url_str("/ipfs/QmMissing")).unwrap();
    match HttpTransport::new().fetch(url) {
        Err(err) => assert!(matches!(err.kind, TransportErrorKind::FileNotFound)),
        Ok(_) => panic!("expected an error for HTTP 404"),
    }
}
