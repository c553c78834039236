//! SR policies and their segment lists.
//!
//! Mirrors `sr_policy_t` / `sr_sl_t` from the original plugin: a
//! policy is keyed by its binding SID and owns one or more candidate
//! segment lists; the data plane always takes the first present one
//! (`spec.md` §4.3 "Policy lookup").

use crate::headers::{Ipv6Header, SrhHeader};
use std::collections::HashMap;
use std::net::Ipv6Addr;

/// A precomputed rewrite template: `header` is the outer IPv6 header
/// baked in at registration (its source and destination are never
/// touched by the data plane when a policy applies — see
/// `engine::gtp6d`); `segments` is the tail of waypoints (wire/last-
/// first order) cloned in after the TEID-spliced destination a decap
/// engine inserts at `segments[0]`.
#[derive(Clone, Debug)]
pub struct SegmentList {
    pub header: Ipv6Header,
    pub segments: Vec<Ipv6Addr>,
}

impl SegmentList {
    /// Builds a list with a default (zeroed-address) outer header —
    /// convenient for tests and for configs that patch the header
    /// separately.
    pub fn new(segments: Vec<Ipv6Addr>) -> Self {
        SegmentList {
            header: Ipv6Header::default(),
            segments,
        }
    }

    pub fn with_header(header: Ipv6Header, segments: Vec<Ipv6Addr>) -> Self {
        SegmentList { header, segments }
    }

    /// `2 * (segments.len() + extra_segments)`, the `hdr_ext_len` an
    /// SRH carries once the caller's own inserted segment(s) are
    /// accounted for.
    pub fn hdr_ext_len(&self, extra_segments: usize) -> u8 {
        (2 * (self.segments.len() + extra_segments)) as u8
    }

    /// A fresh SRH fixed header sized for this list plus
    /// `extra_segments` more entries the caller will prepend.
    pub fn srh_template(&self, extra_segments: usize, next_header: u8) -> SrhHeader {
        let n = self.segments.len() + extra_segments;
        SrhHeader {
            next_header,
            hdr_ext_len: (2 * n) as u8,
            routing_type: crate::headers::SRH_ROUTING_TYPE,
            segments_left: (n - 1) as u8,
            last_entry: (n - 1) as u8,
            flags: 0,
            tag: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SrPolicy {
    pub binding_sid: Ipv6Addr,
    pub segment_lists: Vec<SegmentList>,
}

impl SrPolicy {
    /// The first non-empty segment list, per `spec.md` §4.3.
    pub fn first_segment_list(&self) -> Option<&SegmentList> {
        self.segment_lists.first()
    }
}

/// Keyed by binding SID; read-only from the data plane.
#[derive(Debug, Default)]
pub struct PolicyTable {
    policies: HashMap<Ipv6Addr, SrPolicy>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_policy(&mut self, binding_sid: Ipv6Addr, segment_lists: Vec<SegmentList>) {
        self.policies.insert(
            binding_sid,
            SrPolicy {
                binding_sid,
                segment_lists,
            },
        );
    }

    pub fn lookup(&self, binding_sid: &Ipv6Addr) -> Option<&SrPolicy> {
        self.policies.get(binding_sid)
    }
}
