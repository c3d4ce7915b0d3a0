//! ipblacklist - adaptive IP blacklist filter for HTTP services.
//!
//! Rejects requests from a static list of addresses and from addresses
//! promoted to a persistent blacklist after exceeding a per-URL request rate
//! inside a sliding window. Counters and the blacklist live in SQLite.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod metrics;
pub mod security;

pub use config::{BlacklistConfig, Config, DynamicBlacklistConfig};
pub use db::Database;
pub use error::FilterError;
pub use security::{AddressResolver, BlacklistFilter, Decision, RejectReason, Verdict};
