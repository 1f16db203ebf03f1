//! Shared helpers for unit tests: socket guards and an in-memory transport.

pub(crate) mod fake_transport;
pub(crate) mod socket_guard;
