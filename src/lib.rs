//! # Gardi
//!
//! `gardi` authenticates users and issues time-bounded bearer tokens. One
//! session engine is exposed over two independent transports:
//!
//! - an HTTP API (`/login`, `/logout`, `/validate`, `/user`), and
//! - a line-framed JSON RPC protocol with a single `validate` method used by
//!   sibling services to refresh token pairs without a round-trip to the
//!   HTTP surface.
//!
//! Tokens are self-contained (subject + expiry, HMAC-SHA256 signed) and are
//! never stored server-side: an access token is valid until its embedded
//! expiry, a refresh token is exchanged for a new pair once the access token
//! has expired. Both listeners run under a small supervisor that waits for
//! the first of: OS signal, HTTP fatal error, RPC fatal error, and then
//! drives a bounded graceful shutdown of both.

pub mod api;
pub mod cli;
pub mod password;
pub mod rpc;
pub mod session;
pub mod store;
pub mod supervisor;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
