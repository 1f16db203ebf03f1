//! Shared helpers for wiremock-backed integration tests.

#![allow(dead_code)]

#[path = "../../src/test_support/socket_guard.rs"]
pub mod socket_guard;

use bookdl_core::Config;
use wiremock::MockServer;

pub(crate) use socket_guard::start_mock_server_or_skip;

/// Configuration pointing every index request at `server`, with the
/// auxiliary aggregator disabled so no request leaves localhost.
#[must_use]
pub fn config_for(server: &MockServer) -> Config {
    Config {
        base_url: server.uri(),
        allow_aux_mirror: false,
        countdown_retries: 1,
        connect_timeout_secs: 5,
        read_timeout_secs: 5,
        ..Config::default()
    }
}
