//! The one-at-a-time string digest.
//!
//! This is the classic byte-mixing hash: accumulate each byte with two
//! shift-mixes, then run three finalisation mixes over the accumulator.
//! It is pure and deterministic, so the digest for a name is stable
//! across calls, threads and processes. Records carry the full 32-bit
//! digest; reduction to a bucket index happens at the table layer.

/// Digest a name to its full 32-bit value.
///
/// All arithmetic is wrapping. Identical byte sequences always produce
/// identical digests.
pub fn one_at_a_time(name: &str) -> u32 {
    let mut h: u32 = 0;
    for b in name.bytes() {
        h = h.wrapping_add(u32::from(b));
        h = h.wrapping_add(h << 10);
        h ^= h >> 6;
    }
    h = h.wrapping_add(h << 3);
    h ^= h >> 11;
    h.wrapping_add(h << 15)
}
