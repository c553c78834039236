//! Shared GTP-U-over-IPv6 decap validation and TEID-splice logic used
//! by both GTP6.D and GTP6.D.DI (`spec.md` §4.3/§4.4).

use crate::bits::splice_teid;
use crate::buffer::{Buffer, SizeOf};
use crate::control::local_sid::PluginParams;
use crate::control::{LocalSid, PolicyTable, SrPolicy};
use crate::headers::{GtpuHeader, Ipv6Header, UdpHeader, GTPU_UDP_PORT, IP_PROTOCOL_UDP};
use crate::Result;
use std::net::Ipv6Addr;

pub const COMBO_LEN: usize =
    std::mem::size_of::<Ipv6Header>() + std::mem::size_of::<UdpHeader>() + std::mem::size_of::<GtpuHeader>();

pub fn is_valid(buf: &Buffer) -> Result<bool> {
    if buf.total_length() < COMBO_LEN {
        return Ok(false);
    }
    let ip6 = *buf.read_data::<Ipv6Header>(0)?;
    let udp = *buf.read_data::<UdpHeader>(Ipv6Header::size_of())?;
    Ok(ip6.next_header == IP_PROTOCOL_UDP && udp.dst_port == GTPU_UDP_PORT.to_be())
}

pub struct DecapPrep<'p> {
    pub dst0: Ipv6Addr,
    pub seg0: Ipv6Addr,
    pub encap_src: Ipv6Addr,
    pub policy: Option<&'p SrPolicy>,
    pub inner_is_ipv6: bool,
    pub inner_len: usize,
}

/// Splices the TEID into the configured SR prefix, resolves the SR
/// policy keyed by that (unspliced) prefix, advances past the fixed
/// IPv6+UDP+GTP-U header, and reports the inner payload's protocol
/// family and remaining length — everything both decap engines need
/// before building their own SRH shape.
pub fn prepare<'p>(buf: &mut Buffer, sid: &LocalSid, policies: &'p PolicyTable) -> Result<DecapPrep<'p>> {
    let (sr_prefix, sr_prefixlen, encap_src) = match sid.params {
        PluginParams::Decap { sr_prefix, sr_prefixlen, encap_src } => (sr_prefix, sr_prefixlen, encap_src),
        PluginParams::Encap => panic!("decap engine invoked on an encap-bound local SID"),
    };

    let ip6 = *buf.read_data::<Ipv6Header>(0)?;
    let gtpu = *buf.read_data::<GtpuHeader>(Ipv6Header::size_of() + UdpHeader::size_of())?;
    let dst0 = ip6.dst();

    let mut seg0 = sr_prefix;
    if sr_prefixlen != 0 {
        splice_teid(&mut seg0, sr_prefixlen, gtpu.teid);
    }

    let policy = policies.lookup(&sr_prefix);

    buf.advance(COMBO_LEN as isize)?;
    let inner_is_ipv6 = (buf.read_slice(0, 1)?[0] & 0xF0) == 0x60;
    let inner_len = buf.total_length();

    Ok(DecapPrep {
        dst0,
        seg0,
        encap_src,
        policy,
        inner_is_ipv6,
        inner_len,
    })
}
