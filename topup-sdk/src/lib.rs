//! Wire types and HTTP clients for the wallet top-up backends.
//!
//! The [`objects`] module is always available. The typed clients in
//! [`client`] are gated behind the `client` cargo feature.

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
