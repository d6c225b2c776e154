//! Iterative DNS resolution: walk root -> TLD -> authoritative servers for an
//! IPv4 address, with a recursive (system resolver) baseline.

pub mod classify;
pub mod cli;
pub mod config;
pub mod dns;
pub mod iterative;
pub mod journey;
pub mod nameservers;
pub mod recursive;
pub mod roots;
pub mod stub;
pub mod transport;
