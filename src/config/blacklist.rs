//! Blacklist filter configuration.

use serde::Deserialize;
use std::net::IpAddr;

/// Configuration consumed by [`crate::security::BlacklistFilter`].
#[derive(Debug, Clone, Deserialize)]
pub struct BlacklistConfig {
    /// Addresses always rejected. Matched by exact string equality against
    /// the resolved address's canonical form.
    #[serde(default)]
    pub static_blacklist: Vec<String>,
    /// Rate-based promotion to the persistent blacklist.
    #[serde(default)]
    pub dynamic: DynamicBlacklistConfig,
    /// Which comma-separated hop of the proxy headers to trust (0 = leftmost).
    #[serde(default)]
    pub real_ip_depth: usize,
    /// SQLite database path, or `:memory:`.
    pub db_path: String,
}

impl BlacklistConfig {
    /// Warn about static entries that can never match a resolved address.
    pub fn warn_unmatchable_entries(&self) {
        for entry in &self.static_blacklist {
            match entry.parse::<IpAddr>() {
                Ok(ip) if ip.to_string() != *entry => {
                    tracing::warn!(
                        entry = %entry,
                        canonical = %ip,
                        "static blacklist entry is not in canonical form and will never match"
                    );
                }
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!(entry = %entry, "static blacklist entry is not an IP address and will never match");
                }
            }
        }
    }
}

/// Dynamic blacklist configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DynamicBlacklistConfig {
    /// Enable request accounting and automatic promotion (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Sliding window length in seconds (default: 60).
    #[serde(default = "default_period_seconds")]
    pub period_seconds: u64,
    /// Windowed count at which an address is promoted (default: 100).
    #[serde(default = "default_rate_limit_threshold")]
    pub rate_limit_threshold: u64,
}

impl Default for DynamicBlacklistConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            period_seconds: default_period_seconds(),
            rate_limit_threshold: default_rate_limit_threshold(),
        }
    }
}

fn default_period_seconds() -> u64 {
    60
}

fn default_rate_limit_threshold() -> u64 {
    100
}
