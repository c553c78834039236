//! Per-SID and per-node counters.
//!
//! `spec.md` §5 requires per-SID valid/invalid arrays sharded per
//! thread (each engine instance writes only its own shard) and
//! per-node error counters updated once per invocation via atomic
//! add. A `Buffer`-processing engine owns one `NodeCounters` and one
//! `SidCounters` shard; the control plane sums shards across threads
//! when reporting, which is out of scope here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// One thread's valid/invalid tally for a single local SID.
#[derive(Debug, Default)]
struct SidTally {
    valid: AtomicU64,
    invalid: AtomicU64,
}

/// Per-thread shard of per-SID valid/invalid counters.
///
/// Not `Sync` in the sense of being shared across threads — one
/// `SidCounters` belongs to one worker; the host sums shards.
#[derive(Debug, Default)]
pub struct SidCounters {
    by_adj_index: HashMap<u32, SidTally>,
}

impl SidCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_valid(&mut self, adj_index: u32) {
        self.by_adj_index
            .entry(adj_index)
            .or_insert_with(SidTally::default)
            .valid
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&mut self, adj_index: u32) {
        self.by_adj_index
            .entry(adj_index)
            .or_insert_with(SidTally::default)
            .invalid
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn valid(&self, adj_index: u32) -> u64 {
        self.by_adj_index
            .get(&adj_index)
            .map_or(0, |t| t.valid.load(Ordering::Relaxed))
    }

    pub fn invalid(&self, adj_index: u32) -> u64 {
        self.by_adj_index
            .get(&adj_index)
            .map_or(0, |t| t.invalid.load(Ordering::Relaxed))
    }
}

/// Per-node `PACKETS` / `BAD_PACKETS` counters (`spec.md` §7).
#[derive(Debug, Default)]
pub struct NodeCounters {
    packets: AtomicU64,
    bad_packets: AtomicU64,
}

impl NodeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_good(&self) {
        self.packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bad(&self) {
        self.bad_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn bad_packets(&self) -> u64 {
        self.bad_packets.load(Ordering::Relaxed)
    }
}

/// Per-interface TX-error counters; currently only `NO_BUFFERS_FOR_GSO`
/// (`spec.md` §7).
#[derive(Debug, Default)]
pub struct InterfaceCounters {
    no_buffers_for_gso: AtomicU64,
}

impl InterfaceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_no_buffers_for_gso(&self) {
        self.no_buffers_for_gso.fetch_add(1, Ordering::Relaxed);
    }

    pub fn no_buffers_for_gso(&self) -> u64 {
        self.no_buffers_for_gso.load(Ordering::Relaxed)
    }
}
