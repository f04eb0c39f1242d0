//! Broker-domain identifiers and redacted secrets.

pub mod id;
pub mod secret;

pub use id::*;
pub use secret::*;
