//! Request screening.
//!
//! - **Resolver**: client address from the `X-Real-Ip` / `X-Forwarded-For` /
//!   `X-Original-Forwarded-For` chain at a configured trust depth
//! - **Filter**: static and dynamic blacklist checks plus sliding-window
//!   request accounting that promotes abusive addresses
//!
//! # Architecture
//!
//! ```text
//! request ─▶ AddressResolver ─▶ BlacklistFilter ─┬─▶ static set (in memory)
//!                                               ├─▶ blacklist table (SQLite)
//!                                               └─▶ spawn: request_logs upsert ─▶ promote
//! ```

pub mod filter;
pub mod resolver;

pub use filter::{BlacklistFilter, Decision, RejectReason, Verdict};
pub use resolver::AddressResolver;
