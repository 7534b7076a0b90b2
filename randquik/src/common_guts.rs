use core::array;

use crate::Rounds;

// The constant words in the first row of the initial state
pub(crate) const C0: u32 = u32::from_le_bytes(*b"expa");
pub(crate) const C1: u32 = u32::from_le_bytes(*b"nd 3");
pub(crate) const C2: u32 = u32::from_le_bytes(*b"2-by");
pub(crate) const C3: u32 = u32::from_le_bytes(*b"te k");

/// Replicates each state word across one SIMD register (or leaves it scalar,
/// with the identity for `splat`). The batch backends overwrite rows 12 and
/// 13 with their per-lane counters before running any rounds.
#[inline(always)]
pub(crate) fn splat_state<T: Copy>(state: &[u32; 16], splat: impl Fn(u32) -> T) -> [T; 16] {
    array::from_fn(|i| splat(state[i]))
}

// NB: if `qr` is a closure and dynamic feature detection is involved, that
// closure really needs to be inline(always) so it gets inlined and we get
// reasonable codegen.
#[inline(always)]
pub(crate) fn double_rounds<T: Copy>(x: &mut [T; 16], rounds: Rounds, qr: impl Fn([T; 4]) -> [T; 4]) {
    for _ in 0..rounds.double_rounds() {
        // Odd round: columns
        [x[0], x[4], x[8], x[12]] = qr([x[0], x[4], x[8], x[12]]);
        [x[1], x[5], x[9], x[13]] = qr([x[1], x[5], x[9], x[13]]);
        [x[2], x[6], x[10], x[14]] = qr([x[2], x[6], x[10], x[14]]);
        [x[3], x[7], x[11], x[15]] = qr([x[3], x[7], x[11], x[15]]);
        // Even round: diagonals
        [x[0], x[5], x[10], x[15]] = qr([x[0], x[5], x[10], x[15]]);
        [x[1], x[6], x[11], x[12]] = qr([x[1], x[6], x[11], x[12]]);
        [x[2], x[7], x[8], x[13]] = qr([x[2], x[7], x[8], x[13]]);
        [x[3], x[4], x[9], x[14]] = qr([x[3], x[4], x[9], x[14]]);
    }
}
