//! GTP6.E: SRv6 (IPv6+SRH) -> GTP-U over IPv6 (`spec.md` §4.2).
//!
//! Strictness fix (REDESIGN FLAG / `spec.md` §9 open question 3):
//! validation additionally requires `hdr_ext_len >= 1` so a chain with
//! `next_header == IPv6-Route` but `hdr_ext_len == 0` (no real SRH
//! payload) is rejected instead of passing the length check vacuously.

use crate::batch::{Dispatched, NextHop};
use crate::bits::read_teid_window;
use crate::buffer::{Buffer, SizeOf};
use crate::control::{LocalSidTable, NodeCounters, SidCounters};
use crate::hash::hash_to_port;
use crate::headers::{Ipv6GtpuTemplate, Ipv6Header, IPV6_ROUTE};
use crate::headers::SrhHeader;
use crate::Result;
use std::convert::TryInto;
use std::net::Ipv6Addr;

pub struct Gtp6Engine {
    template: Ipv6GtpuTemplate,
    counters: NodeCounters,
}

impl Gtp6Engine {
    pub fn new(template: Ipv6GtpuTemplate) -> Self {
        Gtp6Engine {
            template,
            counters: NodeCounters::new(),
        }
    }

    pub fn counters(&self) -> &NodeCounters {
        &self.counters
    }

    pub fn process(
        &self,
        mut buf: Buffer,
        sids: &LocalSidTable,
        sid_counters: &mut SidCounters,
    ) -> Result<Dispatched> {
        let adj_index = buf.adj_index();
        let sid = sids
            .get(adj_index)
            .expect("buffer admitted with no matching local SID binding");

        let combo_len = Ipv6Header::size_of() + SrhHeader::size_of();
        if buf.total_length() < combo_len {
            self.counters.record_bad();
            sid_counters.record_invalid(adj_index);
            return Ok(Dispatched {
                buffer: buf,
                next_hop: NextHop::Drop,
            });
        }

        let ip6 = *buf.read_data::<Ipv6Header>(0)?;

        let valid = ip6.next_header == IPV6_ROUTE && {
            let srh = *buf.read_data::<SrhHeader>(Ipv6Header::size_of())?;
            srh.hdr_ext_len >= 1
                && buf.total_length() >= combo_len + 8 * srh.hdr_ext_len as usize
        };

        if !valid {
            self.counters.record_bad();
            sid_counters.record_invalid(adj_index);
            return Ok(Dispatched {
                buffer: buf,
                next_hop: NextHop::Drop,
            });
        }

        let srh = *buf.read_data::<SrhHeader>(Ipv6Header::size_of())?;
        let seg0_offset = combo_len;
        let seg0_bytes: [u8; 16] = buf.read_slice(seg0_offset, 16)?.try_into().unwrap();
        let seg0 = Ipv6Addr::from(seg0_bytes);

        buf.advance((combo_len + 8 * srh.hdr_ext_len as usize) as isize)?;

        let port = {
            let inner_len = buf.current_length();
            let payload = buf.read_slice(0, inner_len)?;
            hash_to_port(payload)
        };
        let inner_len = buf.total_length();

        buf.advance(-(Ipv6GtpuTemplate::size_of() as isize))?;
        buf.write_data(0, &self.template)?;

        let teid = read_teid_window(&ip6.dst(), sid.teid_bit_offset());

        let tpl = buf.data_mut::<Ipv6GtpuTemplate>(0)?;
        tpl.gtpu.teid = teid;
        tpl.gtpu.set_length(inner_len as u16);
        tpl.udp.set_length((inner_len + 16) as u16);
        // Raw hash output, not byte-swapped — an entropy value, not a
        // length or address field (see gtp4e's UDP source port).
        tpl.udp.src_port = port;
        tpl.ip6.set_src(ip6.dst());
        tpl.ip6.set_dst(seg0);
        tpl.ip6.set_payload_length((inner_len + 16) as u16);

        self.counters.record_good();
        sid_counters.record_valid(adj_index);

        if buf.is_traced() {
            tracing::trace!(
                engine = "gtp6e",
                adj_index,
                teid = u32::from_be_bytes(teid),
                "srv6 end-m-gtp6-e rewrite"
            );
        }

        Ok(Dispatched {
            buffer: buf,
            next_hop: NextHop::LookupV6,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::LocalSid;

    fn wire_ipv6_srh(dst: Ipv6Addr, seg0: Ipv6Addr, payload: &[u8]) -> Vec<u8> {
        let mut ip6 = Ipv6Header::default();
        ip6.set_dst(dst);
        ip6.next_header = IPV6_ROUTE;
        let srh = SrhHeader {
            next_header: 17,
            hdr_ext_len: 2,
            segments_left: 0,
            last_entry: 0,
            ..Default::default()
        };
        let mut bytes = unsafe {
            std::slice::from_raw_parts(&ip6 as *const _ as *const u8, Ipv6Header::size_of()).to_vec()
        };
        bytes.extend_from_slice(unsafe {
            std::slice::from_raw_parts(&srh as *const _ as *const u8, SrhHeader::size_of())
        });
        bytes.extend_from_slice(&seg0.octets());
        ip6.set_payload_length((SrhHeader::size_of() + 16 + payload.len()) as u16);
        bytes[0..Ipv6Header::size_of()].copy_from_slice(unsafe {
            std::slice::from_raw_parts(&ip6 as *const _ as *const u8, Ipv6Header::size_of())
        });
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn rewrites_outer_to_seg0_and_extracts_teid() {
        let dst: Ipv6Addr = "2001:db8::aa:bbcc:dd00:0".parse().unwrap();
        let seg0: Ipv6Addr = "fd00:e::1".parse().unwrap();
        let wire = wire_ipv6_srh(dst, seg0, &[0x11; 16]);

        let mut sids = LocalSidTable::new();
        sids.register_local_sid(0, LocalSid::encap(64));
        let mut sid_counters = SidCounters::new();

        let engine = Gtp6Engine::new(Ipv6GtpuTemplate::default());
        let dispatched = engine
            .process(Buffer::from_bytes(&wire), &sids, &mut sid_counters)
            .unwrap();

        assert_eq!(dispatched.next_hop, NextHop::LookupV6);
        let tpl = dispatched.buffer.read_data::<Ipv6GtpuTemplate>(0).unwrap();
        assert_eq!(tpl.gtpu.teid, [0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!({ tpl.udp.dst_port }, crate::headers::GTPU_UDP_PORT.to_be());
        assert_eq!(tpl.ip6.dst(), seg0);
        assert_eq!(tpl.ip6.src(), dst);
    }

    #[test]
    fn rejects_hdr_ext_len_zero_even_with_route_header() {
        let dst: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let mut ip6 = Ipv6Header::default();
        ip6.set_dst(dst);
        ip6.next_header = IPV6_ROUTE;
        let srh = SrhHeader {
            hdr_ext_len: 0,
            ..Default::default()
        };
        let mut wire = unsafe {
            std::slice::from_raw_parts(&ip6 as *const _ as *const u8, Ipv6Header::size_of()).to_vec()
        };
        wire.extend_from_slice(unsafe {
            std::slice::from_raw_parts(&srh as *const _ as *const u8, SrhHeader::size_of())
        });

        let mut sids = LocalSidTable::new();
        sids.register_local_sid(0, LocalSid::encap(64));
        let mut sid_counters = SidCounters::new();
        let engine = Gtp6Engine::new(Ipv6GtpuTemplate::default());
        let dispatched = engine
            .process(Buffer::from_bytes(&wire), &sids, &mut sid_counters)
            .unwrap();
        assert_eq!(dispatched.next_hop, NextHop::Drop);
    }
}
