//! Wire types, framing and configuration shared by the ampd client crates.

pub mod config;
pub mod platform;
pub mod protocol;
pub mod wire;
