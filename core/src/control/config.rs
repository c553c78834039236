//! Control-plane configuration loading.
//!
//! `spec.md` §1 places `register_local_sid`/`register_policy` out of
//! scope as host-provided bindings; this loader is the one concrete
//! way the ambient stack in this repo exercises that contract — it
//! turns a TOML (or environment-overridden) source into the
//! `LocalSidTable`/`PolicyTable` pair the engines read from, the way
//! a host would at startup.

use crate::control::local_sid::{LocalSid, LocalSidTable};
use crate::control::policy::{PolicyTable, SegmentList};
use crate::headers::Ipv6Header;
use crate::Result;
use serde::Deserialize;
use std::net::Ipv6Addr;

#[derive(Debug, Deserialize)]
struct LocalSidEntry {
    adj_index: u32,
    prefix_len: u8,
    #[serde(default)]
    sr_prefix: Option<Ipv6Addr>,
    #[serde(default)]
    sr_prefixlen: Option<u8>,
    #[serde(default)]
    encap_src: Option<Ipv6Addr>,
}

#[derive(Debug, Deserialize)]
struct PolicyEntry {
    binding_sid: Ipv6Addr,
    segment_lists: Vec<SegmentListEntry>,
}

#[derive(Debug, Deserialize)]
struct SegmentListEntry {
    /// Outer IPv6 source/destination baked into this list's rewrite
    /// template; the data plane never touches them once a policy
    /// applies (see `engine::gtp6d`).
    outer_src: Ipv6Addr,
    outer_dst: Ipv6Addr,
    segments: Vec<Ipv6Addr>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    local_sids: Vec<LocalSidEntry>,
    #[serde(default)]
    policies: Vec<PolicyEntry>,
    #[serde(default = "default_gso_mss")]
    gso_mss: u16,
}

fn default_gso_mss() -> u16 {
    1460
}

/// Parsed control-plane configuration: the populated lookup tables
/// plus scalar settings the engines consult (GSO target segment
/// size).
pub struct CoreConfig {
    pub local_sids: LocalSidTable,
    pub policies: PolicyTable,
    pub gso_mss: u16,
}

impl CoreConfig {
    /// Loads configuration from `path` (TOML), with `SRV6MOBILE_`
    /// prefixed environment variables overriding individual scalar
    /// fields (e.g. `SRV6MOBILE_GSO_MSS`).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SRV6MOBILE"))
            .build()
            .map_err(|e| failure::Error::from_boxed_compat(Box::new(e)))?;
        let raw: RawConfig = settings
            .try_deserialize()
            .map_err(|e| failure::Error::from_boxed_compat(Box::new(e)))?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let mut local_sids = LocalSidTable::new();
        for entry in raw.local_sids {
            let sid = match (entry.sr_prefix, entry.sr_prefixlen, entry.encap_src) {
                (Some(sr_prefix), Some(sr_prefixlen), Some(encap_src)) => {
                    LocalSid::decap(entry.prefix_len, sr_prefix, sr_prefixlen, encap_src)
                }
                _ => LocalSid::encap(entry.prefix_len),
            };
            local_sids.register_local_sid(entry.adj_index, sid);
        }

        let mut policies = PolicyTable::new();
        for entry in raw.policies {
            let lists = entry
                .segment_lists
                .into_iter()
                .map(|sl| {
                    let mut header = Ipv6Header::default();
                    header.set_src(sl.outer_src);
                    header.set_dst(sl.outer_dst);
                    SegmentList::with_header(header, sl.segments)
                })
                .collect();
            policies.register_policy(entry.binding_sid, lists);
        }

        CoreConfig {
            local_sids,
            policies,
            gso_mss: raw.gso_mss,
        }
    }
}
