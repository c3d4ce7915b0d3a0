//! Per-request blacklist decision.
//!
//! # Pipeline
//!
//! 1. Resolve the client address from the proxy header chain.
//! 2. Reject on an exact match against the static blacklist.
//! 3. Reject if dynamic blacklisting is enabled and the address is stored.
//! 4. Allow. With dynamic blacklisting enabled, a detached task records the
//!    request against (address, URL) and promotes the address once its
//!    windowed count reaches the threshold.
//!
//! Steps 1-3 are the only work on the response path. Lookup errors fail open
//! and accounting errors are logged, never surfaced to the requester.

use crate::config::{BlacklistConfig, DynamicBlacklistConfig, validate_blacklist};
use crate::db::{Database, DbError};
use crate::error::FilterError;
use crate::metrics;
use crate::security::resolver::AddressResolver;
use chrono::{DateTime, Utc};
use http::HeaderMap;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Address is on the operator's static list.
    Static,
    /// Address was promoted to the persistent blacklist.
    Dynamic,
}

impl RejectReason {
    /// Static label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

/// Outcome of the synchronous checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Forward to the inner handler. `client` is `None` when no address resolved.
    Allow { client: Option<IpAddr> },
    /// Answer with 403 Forbidden.
    Reject { client: IpAddr, reason: RejectReason },
}

impl Verdict {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Reject { .. })
    }
}

/// A verdict plus the accounting task it started, if any.
///
/// Dropping `accounting` detaches the task; it still runs to completion.
#[derive(Debug)]
pub struct Decision {
    pub verdict: Verdict,
    pub accounting: Option<JoinHandle<()>>,
}

/// Rate promotion settings, present only when dynamic blacklisting is on.
#[derive(Debug, Clone, Copy)]
struct DynamicPolicy {
    window_secs: u64,
    threshold: i64,
}

impl DynamicPolicy {
    fn from_config(config: &DynamicBlacklistConfig) -> Option<Self> {
        config.enabled.then(|| Self {
            window_secs: config.period_seconds,
            threshold: i64::try_from(config.rate_limit_threshold).unwrap_or(i64::MAX),
        })
    }
}

/// Decision engine combining the static list with the persistent stores.
///
/// Cheap to clone; clones share the static list and the connection pool.
#[derive(Clone)]
pub struct BlacklistFilter {
    resolver: AddressResolver,
    static_list: Arc<HashSet<String>>,
    dynamic: Option<DynamicPolicy>,
    db: Database,
}

impl BlacklistFilter {
    /// Validate `config`, open its database, and build the filter.
    pub async fn new(config: &BlacklistConfig) -> Result<Self, FilterError> {
        validate_blacklist(config).map_err(FilterError::Config)?;
        config.warn_unmatchable_entries();

        let db = Database::new(&config.db_path).await?;
        let filter = Self::with_database(config, db);

        info!(
            static_entries = filter.static_list.len(),
            dynamic = filter.dynamic.is_some(),
            depth = filter.resolver.depth(),
            "Blacklist filter initialized"
        );
        Ok(filter)
    }

    /// Build the filter over an already opened database.
    pub fn with_database(config: &BlacklistConfig, db: Database) -> Self {
        Self {
            resolver: AddressResolver::new(config.real_ip_depth),
            static_list: Arc::new(config.static_blacklist.iter().cloned().collect()),
            dynamic: DynamicPolicy::from_config(&config.dynamic),
            db,
        }
    }

    /// Replace the header chain used to resolve the client address.
    pub fn with_resolver(mut self, resolver: AddressResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn dynamic_enabled(&self) -> bool {
        self.dynamic.is_some()
    }

    /// Decide on a request and start its accounting task.
    pub async fn decide(&self, headers: &HeaderMap, url: &str) -> Decision {
        let verdict = self.check(headers).await;

        let accounting = match verdict {
            Verdict::Allow { client: Some(ip) } => self.spawn_accounting(ip, url),
            _ => None,
        };

        match verdict {
            Verdict::Allow { .. } => metrics::record_allowed(),
            Verdict::Reject { client, reason } => {
                debug!(ip = %client, url = %url, reason = reason.as_str(), "request rejected");
                metrics::record_rejected(reason.as_str());
            }
        }

        Decision { verdict, accounting }
    }

    /// Run the synchronous checks only.
    pub async fn check(&self, headers: &HeaderMap) -> Verdict {
        let Some(client) = self.resolver.resolve(headers) else {
            return Verdict::Allow { client: None };
        };

        let ip = client.to_string();

        if self.static_list.contains(&ip) {
            return Verdict::Reject {
                client,
                reason: RejectReason::Static,
            };
        }

        if self.dynamic.is_some() && self.is_dynamically_blacklisted(&ip).await {
            return Verdict::Reject {
                client,
                reason: RejectReason::Dynamic,
            };
        }

        Verdict::Allow {
            client: Some(client),
        }
    }

    /// Membership test that fails open.
    async fn is_dynamically_blacklisted(&self, ip: &str) -> bool {
        match self.db.blacklist().contains(ip).await {
            Ok(found) => found,
            Err(e) => {
                warn!(ip = %ip, error = %e, "blacklist lookup failed, allowing request");
                metrics::record_lookup_failure();
                false
            }
        }
    }

    /// Spawn the accounting step for an allowed request.
    ///
    /// Returns `None` when dynamic blacklisting is disabled. Errors inside the
    /// task are logged and dropped.
    pub fn spawn_accounting(&self, client: IpAddr, url: &str) -> Option<JoinHandle<()>> {
        if self.dynamic.is_none() {
            return None;
        }

        let filter = self.clone();
        let url = url.to_string();
        let span = info_span!("accounting", ip = %client, url = %url);

        Some(tokio::spawn(
            async move {
                if let Err(e) = filter.record(client, &url).await {
                    warn!(error = %e, "request accounting failed");
                    metrics::record_accounting_failure();
                }
            }
            .instrument(span),
        ))
    }

    /// Record one request now. See [`Self::record_at`].
    pub async fn record(&self, client: IpAddr, url: &str) -> Result<bool, DbError> {
        self.record_at(client, url, Utc::now()).await
    }

    /// Record one request from `client` to `url` observed at `now`.
    ///
    /// Returns `true` when this step promoted the address (or found it
    /// already promoted while the count stays at or over the threshold).
    pub async fn record_at(&self, client: IpAddr, url: &str, now: DateTime<Utc>) -> Result<bool, DbError> {
        let Some(policy) = self.dynamic else {
            return Ok(false);
        };

        let ip = client.to_string();
        let count = self
            .db
            .counters()
            .upsert_at(&ip, url, policy.window_secs, now)
            .await?;

        // A fresh row starts at 0, so reaching the threshold means the address
        // made threshold + 1 requests inside the window.
        if count < policy.threshold {
            return Ok(false);
        }

        if self.db.blacklist().add(&ip).await? {
            info!(ip = %ip, url = %url, count, "address promoted to dynamic blacklist");
            metrics::record_promotion();
        }
        Ok(true)
    }
}
