//! GTP6.D: GTP-U over IPv6 -> SRv6, inserting an SRH from policy
//! (`spec.md` §4.3).

use crate::batch::{Dispatched, NextHop};
use crate::buffer::{Buffer, SizeOf};
use crate::control::{LocalSidTable, NodeCounters, SidCounters};
use crate::engine::decap_common::{self, COMBO_LEN};
use crate::headers::{Ipv6Header, SrhHeader, IP_PROTOCOL_IP_IN_IP, IP_PROTOCOL_IPV6, IPV6_ROUTE};
use crate::Result;

/// Owns the bare-IPv6 fallback template used when no policy matches.
pub struct Gtp6DecapEngine {
    bare_template: Ipv6Header,
    counters: NodeCounters,
}

impl Gtp6DecapEngine {
    pub fn new(bare_template: Ipv6Header) -> Self {
        Gtp6DecapEngine {
            bare_template,
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
                let n = sl.segments.len();
                let hdr_len = Ipv6Header::size_of() + SrhHeader::size_of() + (n + 1) * 16;
                buf.advance(-(hdr_len as isize))?;

                buf.write_data(0, &sl.header)?;
                let header = buf.data_mut::<Ipv6Header>(0)?;
                header.next_header = IPV6_ROUTE;

                let srh = sl.srh_template(1, inner_protocol);
                buf.write_data(Ipv6Header::size_of(), &srh)?;
                buf.write_at(Ipv6Header::size_of() + SrhHeader::size_of(), &prep.seg0.octets())?;
                for (i, seg) in sl.segments.iter().enumerate() {
                    let offset = Ipv6Header::size_of() + SrhHeader::size_of() + 16 * (i + 1);
                    buf.write_at(offset, &seg.octets())?;
                }
                hdr_len
            }
            None => {
                let hdr_len = Ipv6Header::size_of();
                buf.advance(-(hdr_len as isize))?;
                buf.write_data(0, &self.bare_template)?;
                let header = buf.data_mut::<Ipv6Header>(0)?;
                header.set_src(prep.dst0);
                header.set_dst(prep.seg0);
                header.next_header = inner_protocol;
                hdr_len
            }
        };

        let header = buf.data_mut::<Ipv6Header>(0)?;
        header.set_payload_length((prep.inner_len + hdr_len - Ipv6Header::size_of()) as u16);

        self.counters.record_good();
        sid_counters.record_valid(adj_index);

        if buf.is_traced() {
            tracing::trace!(
                engine = "gtp6d",
                adj_index,
                dst = %prep.seg0,
                "srv6 end-m-gtp6-d rewrite"
            );
        }

        Ok(Dispatched {
            buffer: buf,
            next_hop: NextHop::LookupV6,
        })
    }
}

const _: () = assert!(COMBO_LEN == 56);
