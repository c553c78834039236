//! GTP4.E: SRv6 (IPv6+SRH) -> GTP-U over IPv4 (`spec.md` §4.1).

use crate::batch::{Dispatched, NextHop};
use crate::bits::read_teid_window;
use crate::buffer::{Buffer, SizeOf};
use crate::control::{LocalSidTable, NodeCounters, SidCounters};
use crate::headers::{Ipv4GtpuTemplate, Ipv6Header, IPV6_ROUTE};
use crate::headers::SrhHeader;
use crate::Result;

/// Owns the precomputed IPv4+UDP+GTP-U header skeleton this engine
/// blits into every encapsulated packet.
pub struct Gtp4Engine {
    template: Ipv4GtpuTemplate,
    counters: NodeCounters,
}

impl Gtp4Engine {
    pub fn new(template: Ipv4GtpuTemplate) -> Self {
        Gtp4Engine {
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

        if buf.total_length() < Ipv6Header::size_of() {
            self.counters.record_bad();
            sid_counters.record_invalid(adj_index);
            return Ok(Dispatched {
                buffer: buf,
                next_hop: NextHop::Drop,
            });
        }

        let ip6 = *buf.read_data::<Ipv6Header>(0)?;
        let has_srh = ip6.next_header == IPV6_ROUTE;

        let outer_len = if has_srh {
            if buf.total_length() < Ipv6Header::size_of() + SrhHeader::size_of() {
                self.counters.record_bad();
                sid_counters.record_invalid(adj_index);
                return Ok(Dispatched {
                    buffer: buf,
                    next_hop: NextHop::Drop,
                });
            }
            let srh = *buf.read_data::<SrhHeader>(Ipv6Header::size_of())?;
            Ipv6Header::size_of() + 8 + 8 * srh.hdr_ext_len as usize
        } else {
            Ipv6Header::size_of()
        };

        if buf.total_length() < outer_len {
            self.counters.record_bad();
            sid_counters.record_invalid(adj_index);
            return Ok(Dispatched {
                buffer: buf,
                next_hop: NextHop::Drop,
            });
        }

        buf.advance(outer_len as isize)?;
        let inner_len = buf.total_length();

        buf.advance(-(Ipv4GtpuTemplate::size_of() as isize))?;
        buf.write_data(0, &self.template)?;

        let teid = read_teid_window(&ip6.dst(), sid.teid_bit_offset());
        let src_octets = ip6.src().octets();
        let dst_octets = ip6.dst().octets();

        let tpl = buf.data_mut::<Ipv4GtpuTemplate>(0)?;
        tpl.gtpu.teid = teid;
        tpl.gtpu.set_length(inner_len as u16);

        // Raw passthrough entropy value, not a length or address field:
        // stored exactly as the two source bytes read, no conversion.
        tpl.udp.src_port = u16::from_ne_bytes([dst_octets[12], dst_octets[13]]);
        tpl.udp.set_length((inner_len + 16) as u16);

        tpl.ip4.src.copy_from_slice(&src_octets[8..12]);
        tpl.ip4.dst.copy_from_slice(&dst_octets[4..8]);
        tpl.ip4.set_total_length((inner_len + Ipv4GtpuTemplate::size_of()) as u16);
        tpl.ip4.fix_checksum();

        self.counters.record_good();
        sid_counters.record_valid(adj_index);

        if buf.is_traced() {
            tracing::trace!(
                engine = "gtp4e",
                adj_index,
                teid = u32::from_be_bytes(teid),
                "srv6 end-m-gtp4-e rewrite"
            );
        }

        Ok(Dispatched {
            buffer: buf,
            next_hop: NextHop::LookupV4,
        })
    }
}
