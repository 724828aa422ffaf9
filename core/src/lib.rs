//! fleetstats-core — monthly aggregation of fleet-participation events.
//!
//! Raw participation records from two heterogeneous sources (the real-time
//! fleet tracker and spreadsheet imports) are accreted into monthly
//! per-user, per-corporation, and per-creator counter tables keyed by
//! fleet type. Presentation code reads the counters through the store's
//! query layer; it never touches the aggregation pipeline.
//!
//! RULE: Only the store talks to the database.
//! The aggregator, registry, and resolver call store methods — they never
//! execute SQL directly.

pub mod aggregator;
pub mod directory;
pub mod error;
pub mod event;
pub mod import_source;
pub mod period;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod store;
pub mod tracker_source;
pub mod types;
