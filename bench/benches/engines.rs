use criterion::{black_box, criterion_group, criterion_main, Criterion};
use srv6_mobile::batch::NextHop;
use srv6_mobile::buffer::Buffer;
use srv6_mobile::control::{LocalSid, LocalSidTable, SidCounters};
use srv6_mobile::engine::{Gtp4Engine, Gtp6Engine};
use srv6_mobile::headers::{Ipv4GtpuTemplate, Ipv6GtpuTemplate, Ipv6Header, SrhHeader, IPV6_ROUTE};
use std::net::Ipv6Addr;

fn wire_bare_ipv6(dst: Ipv6Addr, src: Ipv6Addr, payload: &[u8]) -> Vec<u8> {
    let mut ip6 = Ipv6Header::default();
    ip6.set_src(src);
    ip6.set_dst(dst);
    ip6.next_header = 17;
    ip6.set_payload_length(payload.len() as u16);
    let mut bytes = unsafe {
        std::slice::from_raw_parts(&ip6 as *const _ as *const u8, std::mem::size_of::<Ipv6Header>()).to_vec()
    };
    bytes.extend_from_slice(payload);
    bytes
}

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
    ip6.set_payload_length((std::mem::size_of::<SrhHeader>() + 16 + payload.len()) as u16);
    let mut bytes = unsafe {
        std::slice::from_raw_parts(&ip6 as *const _ as *const u8, std::mem::size_of::<Ipv6Header>()).to_vec()
    };
    bytes.extend_from_slice(unsafe {
        std::slice::from_raw_parts(&srh as *const _ as *const u8, std::mem::size_of::<SrhHeader>())
    });
    bytes.extend_from_slice(&seg0.octets());
    bytes.extend_from_slice(payload);
    bytes
}

fn encap_sids() -> LocalSidTable {
    let mut sids = LocalSidTable::new();
    sids.register_local_sid(0, LocalSid::encap(64));
    sids
}

fn encap_engine_benchmark(c: &mut Criterion) {
    c.bench_function("engine::gtp4e_process", move |b| {
        let sids = encap_sids();
        let wire = wire_bare_ipv6(
            "2001:db8::AA:BB:CC:DD".parse().unwrap(),
            "2001:db8::1:2:3:4".parse().unwrap(),
            &[0xAB; 64],
        );
        let engine = Gtp4Engine::new(Ipv4GtpuTemplate::default());
        b.iter(|| {
            let mut counters = SidCounters::new();
            let buf = Buffer::from_bytes(&wire);
            let dispatched = engine.process(buf, &sids, &mut counters).unwrap();
            assert_eq!(dispatched.next_hop, NextHop::LookupV4);
            black_box(dispatched);
        });
    });

    c.bench_function("engine::gtp6e_process", move |b| {
        let sids = encap_sids();
        let wire = wire_ipv6_srh(
            "2001:db8::AA:BB:CC:DD".parse().unwrap(),
            "fd00:e::1".parse().unwrap(),
            &[0x11; 64],
        );
        let engine = Gtp6Engine::new(Ipv6GtpuTemplate::default());
        b.iter(|| {
            let mut counters = SidCounters::new();
            let buf = Buffer::from_bytes(&wire);
            let dispatched = engine.process(buf, &sids, &mut counters).unwrap();
            assert_eq!(dispatched.next_hop, NextHop::LookupV6);
            black_box(dispatched);
        });
    });
}

fn bench_config() -> Criterion {
    Criterion::default().sample_size(50)
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = encap_engine_benchmark
}

criterion_main!(benches);
