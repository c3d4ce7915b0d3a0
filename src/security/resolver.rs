//! Client address resolution from proxy headers.
//!
//! Proxies record the hop chain in comma-separated header values. The
//! resolver walks a fixed, ordered list of headers and reads the token at the
//! configured trust depth from each, returning the first that parses as an IP.

use http::{HeaderMap, HeaderName};
use std::net::IpAddr;

pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_ORIGINAL_FORWARDED_FOR: &str = "x-original-forwarded-for";

/// Extracts the client's address from a prioritized header chain.
#[derive(Debug, Clone)]
pub struct AddressResolver {
    headers: Vec<HeaderName>,
    depth: usize,
}

impl AddressResolver {
    /// Resolver over `X-Real-Ip`, `X-Forwarded-For`, `X-Original-Forwarded-For`, in that order.
    pub fn new(depth: usize) -> Self {
        let chain = [X_REAL_IP, X_FORWARDED_FOR, X_ORIGINAL_FORWARDED_FOR];
        Self::with_headers(chain.into_iter().map(HeaderName::from_static).collect(), depth)
    }

    /// Resolver over a custom header chain, highest priority first.
    pub fn with_headers(headers: Vec<HeaderName>, depth: usize) -> Self {
        Self { headers, depth }
    }

    /// Trust depth: index of the comma-separated token read from each header.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Resolve the client address, or `None` if no header yields one.
    ///
    /// A missing header, a non-ASCII value, a token that does not parse, and a
    /// depth past the end of the token list all fall through to the next header.
    ///
    /// Tokens are trimmed before parsing, which is wider than strict token
    /// parsing: `"1.1.1.1, 2.2.2.2"` at depth 1 yields `2.2.2.2` rather than
    /// falling through on `" 2.2.2.2"`.
    pub fn resolve(&self, headers: &HeaderMap) -> Option<IpAddr> {
        self.headers
            .iter()
            .find_map(|name| self.token_at_depth(headers, name))
    }

    fn token_at_depth(&self, headers: &HeaderMap, name: &HeaderName) -> Option<IpAddr> {
        let value = headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        value.split(',').nth(self.depth)?.trim().parse().ok()
    }
}

impl Default for AddressResolver {
    fn default() -> Self {
        Self::new(0)
    }
}
