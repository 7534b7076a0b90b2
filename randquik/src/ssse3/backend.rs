use arrayref::array_mut_ref;

use crate::{
    common_guts::{double_rounds, splat_state},
    counter, set_counter,
    ssse3::safe_arch::{Ssse3, __m128i},
    Backend, Rounds,
};

/// Four blocks per step, one per 128-bit lane.
const BATCH: usize = 256;

pub(crate) fn detect() -> Option<Backend> {
    if Ssse3::new().is_some() {
        // SAFETY: `fill_buf` is only unsafe because it enables the SSE2 and
        // SSSE3 target features, and we've just checked that they are
        // available, so it's now effectively a safe function.
        unsafe { Some(Backend::new_unchecked(fill_buf)) }
    } else {
        None
    }
}

/// # Safety
///
/// Requires the SSE2 and SSSE3 target features. No other safety
/// requirements.
#[target_feature(enable = "sse2")]
#[target_feature(enable = "ssse3")]
unsafe fn fill_buf(state: &mut [u32; 16], out: &mut [u8], rounds: Rounds) -> usize {
    // Since we're already inside a function enabling the target features,
    // the `expect` is too late to prevent UB. But it still has a chance to
    // panic if that UB is triggered, and it's free next to the work below.
    let m = Ssse3::new().expect("SSSE3 must be available if this backend is invoked");

    // Rotates by 16 and 8 are byte permutations of each 32-bit lane, which
    // the shuffle unit does in one instruction.
    let rot16 = m.bytes([2, 3, 0, 1, 6, 7, 4, 5, 10, 11, 8, 9, 14, 15, 12, 13]);
    let rot8 = m.bytes([3, 0, 1, 2, 7, 4, 5, 6, 11, 8, 9, 10, 15, 12, 13, 14]);

    let mut orig = splat_state(state, |w| m.splat(w));
    let mut ctr = counter(state);

    let batches = out.len() / BATCH;
    for batch in 0..batches {
        // Lane counters ctr+0..ctr+3 as 64-bit values, interleaved into a
        // low-words row and a high-words row.
        let c01 = m.add_u64(m.splat_u64(ctr), m.pair_u64(0, 1));
        let c23 = m.add_u64(m.splat_u64(ctr), m.pair_u64(2, 3));
        let lo = m.unpack_lo_u32(c01, c23);
        let hi = m.unpack_hi_u32(c01, c23);
        orig[12] = m.unpack_lo_u32(lo, hi);
        orig[13] = m.unpack_hi_u32(lo, hi);

        let mut x = orig;
        double_rounds(
            &mut x,
            rounds,
            #[inline(always)]
            |abcd| quarter_round(m, rot16, rot8, abcd),
        );

        for i in 0..16 {
            x[i] = m.add_u32(x[i], orig[i]);
        }

        let group = array_mut_ref![out, batch * BATCH, BATCH];
        emit_quad(m, [x[0], x[1], x[2], x[3]], group, 0);
        emit_quad(m, [x[4], x[5], x[6], x[7]], group, 16);
        emit_quad(m, [x[8], x[9], x[10], x[11]], group, 32);
        emit_quad(m, [x[12], x[13], x[14], x[15]], group, 48);

        ctr = ctr.wrapping_add(4);
    }

    set_counter(state, ctr);
    batches * BATCH
}

/// Four rows of four words each, one row per lane, land as the same quarter
/// of four consecutive blocks: a 4x4 word transpose followed by strided
/// stores.
#[inline(always)]
fn emit_quad(m: Ssse3, [a, b, c, d]: [__m128i; 4], out: &mut [u8; BATCH], offset: usize) {
    let abl = m.unpack_lo_u32(a, b);
    let cdl = m.unpack_lo_u32(c, d);
    let abh = m.unpack_hi_u32(a, b);
    let cdh = m.unpack_hi_u32(c, d);
    let rows = [
        m.unpack_lo_u64(abl, cdl), // a0 b0 c0 d0
        m.unpack_hi_u64(abl, cdl), // a1 b1 c1 d1
        m.unpack_lo_u64(abh, cdh), // a2 b2 c2 d2
        m.unpack_hi_u64(abh, cdh), // a3 b3 c3 d3
    ];
    for (block, row) in rows.into_iter().enumerate() {
        m.storeu(row, array_mut_ref![out, offset + block * 64, 16]);
    }
}

#[inline(always)]
fn quarter_round(
    m: Ssse3,
    rot16: __m128i,
    rot8: __m128i,
    [mut a, mut b, mut c, mut d]: [__m128i; 4],
) -> [__m128i; 4] {
    a = m.add_u32(a, b);
    d = m.shuffle_bytes(m.xor(d, a), rot16);

    c = m.add_u32(c, d);
    b = rotl::<12, 20>(m, m.xor(b, c));

    a = m.add_u32(a, b);
    d = m.shuffle_bytes(m.xor(d, a), rot8);

    c = m.add_u32(c, d);
    b = rotl::<7, 25>(m, m.xor(b, c));

    [a, b, c, d]
}

#[inline(always)]
fn rotl<const SH_LEFT: i32, const SH_RIGHT: i32>(m: Ssse3, x: __m128i) -> __m128i {
    const {
        assert!(SH_RIGHT == (32 - SH_LEFT));
    }
    m.or(m.shift_left_u32::<SH_LEFT>(x), m.shift_right_u32::<SH_RIGHT>(x))
}
