//! Jenkins-style hash used to pick the GTP6.E UDP source port.
//!
//! The original data plane hashes the inner payload with VPP's
//! `hash_memory` (a Bob Jenkins "lookup3" derivative) and XOR-folds
//! words of the resulting `uword` down to 16 bits; on a 64-bit build
//! the fold indexes past the hash's own storage (`spec.md` §9 open
//! question 2). This is a deliberately distinct, well-defined 64-bit
//! Jenkins one-at-a-time hash with the same two-halves XOR-fold the
//! spec calls for — a resolved conformance point, not a claim of
//! bit-parity with any particular VPP build.

/// Jenkins' one-at-a-time hash, extended to produce a 64-bit digest
/// by running two interleaved 32-bit accumulators.
fn jenkins_one_at_a_time_64(seed: u64, data: &[u8]) -> u64 {
    let mut lo: u32 = seed as u32;
    let mut hi: u32 = (seed >> 32) as u32;

    for (i, &byte) in data.iter().enumerate() {
        if i % 2 == 0 {
            lo = lo.wrapping_add(byte as u32);
            lo = lo.wrapping_add(lo << 10);
            lo ^= lo >> 6;
        } else {
            hi = hi.wrapping_add(byte as u32);
            hi = hi.wrapping_add(hi << 10);
            hi ^= hi >> 6;
        }
    }

    lo = lo.wrapping_add(lo << 3);
    lo ^= lo >> 11;
    lo = lo.wrapping_add(lo << 15);

    hi = hi.wrapping_add(hi << 3);
    hi ^= hi >> 11;
    hi = hi.wrapping_add(hi << 15);

    ((hi as u64) << 32) | lo as u64
}

/// Hashes `data` and XOR-folds the two 16-bit halves of the low
/// 32-bit word into a single `u16`, used verbatim as a UDP source
/// port entropy value. This is the resolution of `spec.md` §9 open
/// question 2: "XOR-fold the hash words to a 16-bit value."
pub fn hash_to_port(data: &[u8]) -> u16 {
    let h = jenkins_one_at_a_time_64(0, data);
    let w0 = h as u16;
    let w1 = (h >> 16) as u16;
    w0 ^ w1
}
