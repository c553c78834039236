//! Control-plane data model: local SIDs, SR policies, and counters.
//!
//! Everything here is consumed by the engines read-only. Mutation
//! (`register_local_sid`, `register_policy`) is the host's job — the
//! core only defines the shape the host populates and the lookup
//! operations the engines run against it.

pub mod config;
pub mod counters;
pub mod local_sid;
pub mod policy;

pub use config::CoreConfig;
pub use counters::{InterfaceCounters, NodeCounters, SidCounters};
pub use local_sid::{LocalSid, LocalSidTable, PluginParams};
pub use policy::{PolicyTable, SegmentList, SrPolicy};
