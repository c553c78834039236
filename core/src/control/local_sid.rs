//! The local-SID table: per-endpoint binding parameters keyed by the
//! adjacency id carried on an inbound buffer.

use std::collections::HashMap;
use std::net::Ipv6Addr;

/// Per-engine parameters attached to a local SID binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PluginParams {
    /// GTP4.E / GTP6.E carry no extra parameters beyond `prefix_len`.
    Encap,
    /// GTP6.D / GTP6.D.DI decap targets: the outbound prefix the
    /// extracted TEID is spliced into, and the encap source used when
    /// no policy matches.
    Decap {
        sr_prefix: Ipv6Addr,
        sr_prefixlen: u8,
        encap_src: Ipv6Addr,
    },
}

/// `{ prefix_len, plugin_params }`, immutable for the life of the
/// binding (`spec.md` §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalSid {
    pub prefix_len: u8,
    pub params: PluginParams,
}

impl LocalSid {
    pub fn encap(prefix_len: u8) -> Self {
        LocalSid {
            prefix_len,
            params: PluginParams::Encap,
        }
    }

    pub fn decap(prefix_len: u8, sr_prefix: Ipv6Addr, sr_prefixlen: u8, encap_src: Ipv6Addr) -> Self {
        LocalSid {
            prefix_len,
            params: PluginParams::Decap {
                sr_prefix,
                sr_prefixlen,
                encap_src,
            },
        }
    }

    /// Bit offset of the embedded TEID window: `prefix_len + 8`, per
    /// every engine that reads or writes a TEID.
    #[inline]
    pub fn teid_bit_offset(&self) -> usize {
        self.prefix_len as usize + 8
    }
}

/// Keyed by `adj_index`, the lookup key carried on the buffer.
/// Populated by the control plane via `register_local_sid`; read-only
/// from the data plane (`spec.md` §5).
#[derive(Debug, Default)]
pub struct LocalSidTable {
    sids: HashMap<u32, LocalSid>,
}

impl LocalSidTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_local_sid(&mut self, adj_index: u32, sid: LocalSid) {
        self.sids.insert(adj_index, sid);
    }

    pub fn get(&self, adj_index: u32) -> Option<&LocalSid> {
        self.sids.get(&adj_index)
    }
}
