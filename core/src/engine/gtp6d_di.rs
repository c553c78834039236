//! GTP6.D.DI: GTP-U over IPv6 -> SRv6, drop-in variant that preserves
//! the original outer destination as a segment (`spec.md` §4.4).
//!
//! Identical to GTP6.D except that the list always gains *two* inserted
//! segments — the original outer destination, then the TEID-spliced SR
//! prefix — and, unlike GTP6.D, the no-policy path still synthesizes an
//! SRH rather than falling back to a bare IPv6 header: source is the
//! local SID's configured encap source, destination is the spliced
//! segment, and the two-entry list is `[original_dst, seg0]`.

use crate::batch::{Dispatched, NextHop};
use crate::buffer::{Buffer, SizeOf};
use crate::control::{LocalSidTable, NodeCounters, SidCounters};
use crate::engine::decap_common;
use crate::headers::{Ipv6Header, SrhHeader, IP_PROTOCOL_IP_IN_IP, IP_PROTOCOL_IPV6, IPV6_ROUTE, SRH_ROUTING_TYPE};
use crate::Result;

pub struct Gtp6DropInEngine {
    counters: NodeCounters,
}

impl Gtp6DropInEngine {
    pub fn new() -> Self {
        Gtp6DropInEngine {
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
        policies: &crate::control::PolicyTable,
        sid_counters: &mut SidCounters,
    ) -> Result<Dispatched> {
        let adj_index = buf.adj_index();
        let sid = sids
            .get(adj_index)
            .expect("buffer admitted with no matching local SID binding");

        if !decap_common::is_valid(&buf)? {
            self.counters.record_bad();
            sid_counters.record_invalid(adj_index);
            return Ok(Dispatched {
                buffer: buf,
                next_hop: NextHop::Drop,
            });
        }

        let prep = decap_common::prepare(&mut buf, sid, policies)?;
        let inner_protocol = if prep.inner_is_ipv6 {
            IP_PROTOCOL_IPV6
        } else {
            IP_PROTOCOL_IP_IN_IP
        };

        let hdr_len = match prep.policy.and_then(|p| p.first_segment_list()) {
            Some(sl) => {
                let n = sl.segments.len() + 2;
                let hdr_len = Ipv6Header::size_of() + SrhHeader::size_of() + n * 16;
                buf.advance(-(hdr_len as isize))?;

                buf.write_data(0, &sl.header)?;
                let header = buf.data_mut::<Ipv6Header>(0)?;
                header.next_header = IPV6_ROUTE;

                let srh = sl.srh_template(2, inner_protocol);
                buf.write_data(Ipv6Header::size_of(), &srh)?;

                let segs_off = Ipv6Header::size_of() + SrhHeader::size_of();
                buf.write_at(segs_off, &prep.dst0.octets())?;
                buf.write_at(segs_off + 16, &prep.seg0.octets())?;
                for (i, seg) in sl.segments.iter().enumerate() {
                    buf.write_at(segs_off + 16 * (i + 2), &seg.octets())?;
                }
                hdr_len
            }
            None => {
                let hdr_len = Ipv6Header::size_of() + SrhHeader::size_of() + 2 * 16;
                buf.advance(-(hdr_len as isize))?;

                let mut header = Ipv6Header::default();
                header.set_src(prep.encap_src);
                header.set_dst(prep.seg0);
                header.next_header = IPV6_ROUTE;
                buf.write_data(0, &header)?;

                let srh = SrhHeader {
                    next_header: inner_protocol,
                    hdr_ext_len: 4,
                    routing_type: SRH_ROUTING_TYPE,
                    segments_left: 1,
                    last_entry: 1,
                    flags: 0,
                    tag: 0,
                };
                buf.write_data(Ipv6Header::size_of(), &srh)?;

                let segs_off = Ipv6Header::size_of() + SrhHeader::size_of();
                buf.write_at(segs_off, &prep.dst0.octets())?;
                buf.write_at(segs_off + 16, &prep.seg0.octets())?;
                hdr_len
            }
        };

        let header = buf.data_mut::<Ipv6Header>(0)?;
        header.set_payload_length((prep.inner_len + hdr_len - Ipv6Header::size_of()) as u16);

        self.counters.record_good();
        sid_counters.record_valid(adj_index);

        if buf.is_traced() {
            tracing::trace!(
                engine = "gtp6d_di",
                adj_index,
                dst = %prep.seg0,
                "srv6 end-m-gtp6-d-di rewrite"
            );
        }

        Ok(Dispatched {
            buffer: buf,
            next_hop: NextHop::LookupV6,
        })
    }
}

impl Default for Gtp6DropInEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{LocalSid, PolicyTable, SegmentList};
    use crate::headers::{GtpuHeader, UdpHeader};
    use std::convert::TryInto;
    use std::net::Ipv6Addr;

    fn wire_gtpu(dst: Ipv6Addr, teid: [u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut ip6 = Ipv6Header::default();
        ip6.set_dst(dst);
        ip6.next_header = crate::headers::IP_PROTOCOL_UDP;
        ip6.set_payload_length((UdpHeader::size_of() + GtpuHeader::size_of() + payload.len()) as u16);
        let mut udp = UdpHeader::default();
        udp.set_dst_port(crate::headers::GTPU_UDP_PORT);
        let mut gtpu = GtpuHeader::default();
        gtpu.teid = teid;
        gtpu.set_length(payload.len() as u16);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(unsafe {
            std::slice::from_raw_parts(&ip6 as *const _ as *const u8, Ipv6Header::size_of())
        });
        bytes.extend_from_slice(unsafe {
            std::slice::from_raw_parts(&udp as *const _ as *const u8, UdpHeader::size_of())
        });
        bytes.extend_from_slice(unsafe {
            std::slice::from_raw_parts(&gtpu as *const _ as *const u8, GtpuHeader::size_of())
        });
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn no_policy_synthesizes_two_entry_srh_from_encap_src() {
        let dst: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let wire = wire_gtpu(dst, [0x01, 0x02, 0x03, 0x04], &[0x60, 0, 0, 0]);

        let encap_src: Ipv6Addr = "fd00:9::".parse().unwrap();
        let mut sids = LocalSidTable::new();
        sids.register_local_sid(0, LocalSid::decap(64, "fd00::".parse().unwrap(), 64, encap_src));
        let policies = PolicyTable::new();
        let mut sid_counters = SidCounters::new();

        let engine = Gtp6DropInEngine::new();
        let dispatched = engine
            .process(Buffer::from_bytes(&wire), &sids, &policies, &mut sid_counters)
            .unwrap();

        let buf = dispatched.buffer;
        let header = buf.read_data::<Ipv6Header>(0).unwrap();
        assert_eq!(header.next_header, IPV6_ROUTE);
        assert_eq!(header.src(), encap_src);
        assert_eq!(header.dst(), "fd00::1:203:400:0".parse::<Ipv6Addr>().unwrap());

        let srh = buf.read_data::<SrhHeader>(Ipv6Header::size_of()).unwrap();
        assert_eq!(srh.hdr_ext_len, 4);
        assert_eq!(srh.segments_left, 1);
        assert_eq!(srh.last_entry, 1);

        let segs_off = Ipv6Header::size_of() + SrhHeader::size_of();
        let seg0: [u8; 16] = buf.read_slice(segs_off, 16).unwrap().try_into().unwrap();
        assert_eq!(Ipv6Addr::from(seg0), dst);
        let seg1: [u8; 16] = buf.read_slice(segs_off + 16, 16).unwrap().try_into().unwrap();
        assert_eq!(Ipv6Addr::from(seg1), "fd00::1:203:400:0".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn with_policy_inserts_original_dst_then_spliced_seg0() {
        let dst: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let wire = wire_gtpu(dst, [0, 0, 0, 0], &[0x60, 0, 0, 0]);

        let sr_prefix: Ipv6Addr = "fd00::".parse().unwrap();
        let mut sids = LocalSidTable::new();
        sids.register_local_sid(0, LocalSid::decap(64, sr_prefix, 0, "fd00:9::".parse().unwrap()));

        let tail: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let mut policies = PolicyTable::new();
        let mut header = Ipv6Header::default();
        header.set_src("fd00:1::".parse().unwrap());
        policies.register_policy(sr_prefix, vec![SegmentList::with_header(header, vec![tail])]);

        let mut sid_counters = SidCounters::new();
        let engine = Gtp6DropInEngine::new();
        let dispatched = engine
            .process(Buffer::from_bytes(&wire), &sids, &policies, &mut sid_counters)
            .unwrap();

        let buf = dispatched.buffer;
        let srh = buf.read_data::<SrhHeader>(Ipv6Header::size_of()).unwrap();
        // 1 tail + 2 inserted = 3 total.
        assert_eq!(srh.hdr_ext_len, 6);
        assert_eq!(srh.segments_left, 2);
        assert_eq!(srh.last_entry, 2);

        let segs_off = Ipv6Header::size_of() + SrhHeader::size_of();
        let seg0: [u8; 16] = buf.read_slice(segs_off, 16).unwrap().try_into().unwrap();
        assert_eq!(Ipv6Addr::from(seg0), dst);
        let seg1: [u8; 16] = buf.read_slice(segs_off + 16, 16).unwrap().try_into().unwrap();
        assert_eq!(Ipv6Addr::from(seg1), sr_prefix);
        let seg2: [u8; 16] = buf.read_slice(segs_off + 32, 16).unwrap().try_into().unwrap();
        assert_eq!(Ipv6Addr::from(seg2), tail);
    }
}
