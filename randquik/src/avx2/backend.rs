use arrayref::array_mut_ref;

use crate::{
    avx2::safe_arch::{Avx2, __m256i},
    common_guts::{double_rounds, splat_state},
    counter, set_counter, Backend, Rounds,
};

/// Eight blocks per step, one per 32-bit element of a 256-bit register.
const BATCH: usize = 512;

pub(crate) fn detect() -> Option<Backend> {
    if std::is_x86_feature_detected!("avx2") {
        // SAFETY: `fill_buf` is only unsafe because it enables the AVX2
        // `target_feature`, and we've ensured that AVX2 is available, so
        // it's now effectively a safe function.
        unsafe { Some(Backend::new_unchecked(fill_buf)) }
    } else {
        None
    }
}

/// # Safety
///
/// Requires the AVX2 target feature. No other safety requirements.
#[target_feature(enable = "avx2")]
unsafe fn fill_buf(state: &mut [u32; 16], out: &mut [u8], rounds: Rounds) -> usize {
    // Since we're already inside a function with `target_feature(enable =
    // "avx2")`, the `expect` is too late to prevent UB. But there is still a
    // chance that it panics if that UB is triggered, and the check is
    // basically free compared to the work we're doing below.
    let m = Avx2::new().expect("AVX2 must be available if this backend is invoked");

    let rot16 = m.bytes([
        2, 3, 0, 1, 6, 7, 4, 5, 10, 11, 8, 9, 14, 15, 12, 13, //
        2, 3, 0, 1, 6, 7, 4, 5, 10, 11, 8, 9, 14, 15, 12, 13,
    ]);
    let rot8 = m.bytes([
        3, 0, 1, 2, 7, 4, 5, 6, 11, 8, 9, 10, 15, 12, 13, 14, //
        3, 0, 1, 2, 7, 4, 5, 6, 11, 8, 9, 10, 15, 12, 13, 14,
    ]);
    // The 32-bit unpacks below interleave within 128-bit halves, so the lane
    // counters come out half-shuffled and need one cross-half fixup.
    let fixup = m.elems([0, 1, 4, 5, 2, 3, 6, 7]);

    let mut orig = splat_state(state, |w| m.splat(w));
    let mut ctr = counter(state);

    let batches = out.len() / BATCH;
    for batch in 0..batches {
        // Lane counters ctr+0..ctr+7 as 64-bit values, interleaved into a
        // low-words row and a high-words row.
        let base = m.splat_u64(ctr);
        let c0123 = m.add_u64(base, m.elems([0, 0, 1, 0, 2, 0, 3, 0]));
        let c4567 = m.add_u64(base, m.elems([4, 0, 5, 0, 6, 0, 7, 0]));
        let lo = m.unpack_lo_u32(c0123, c4567);
        let hi = m.unpack_hi_u32(c0123, c4567);
        orig[12] = m.permute_u32(m.unpack_lo_u32(lo, hi), fixup);
        orig[13] = m.permute_u32(m.unpack_hi_u32(lo, hi), fixup);

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
        emit_octo(m, [x[0], x[1], x[2], x[3]], [x[4], x[5], x[6], x[7]], group, 0);
        emit_octo(m, [x[8], x[9], x[10], x[11]], [x[12], x[13], x[14], x[15]], group, 32);

        ctr = ctr.wrapping_add(8);
    }

    set_counter(state, ctr);
    batches * BATCH
}

/// Emits eight rows (two quads of four state words) into the right quarter
/// of all eight blocks: transpose each quad within its 128-bit halves, then
/// pair low halves (blocks 0..3) and high halves (blocks 4..7) with
/// cross-half concatenations.
#[inline(always)]
fn emit_octo(m: Avx2, q1: [__m256i; 4], q2: [__m256i; 4], out: &mut [u8; BATCH], offset: usize) {
    let q1 = transpose_quad(m, q1);
    let q2 = transpose_quad(m, q2);
    for i in 0..4 {
        let lo = m.cat_lo_lo(q1[i], q2[i]);
        let hi = m.cat_hi_hi(q1[i], q2[i]);
        m.storeu(lo, array_mut_ref![out, offset + i * 64, 32]);
        m.storeu(hi, array_mut_ref![out, offset + 256 + i * 64, 32]);
    }
}

#[inline(always)]
fn transpose_quad(m: Avx2, [a, b, c, d]: [__m256i; 4]) -> [__m256i; 4] {
    let abl = m.unpack_lo_u32(a, b);
    let cdl = m.unpack_lo_u32(c, d);
    let abh = m.unpack_hi_u32(a, b);
    let cdh = m.unpack_hi_u32(c, d);
    [
        m.unpack_lo_u64(abl, cdl),
        m.unpack_hi_u64(abl, cdl),
        m.unpack_lo_u64(abh, cdh),
        m.unpack_hi_u64(abh, cdh),
    ]
}

#[inline(always)]
fn quarter_round(
    m: Avx2,
    rot16: __m256i,
    rot8: __m256i,
    [mut a, mut b, mut c, mut d]: [__m256i; 4],
) -> [__m256i; 4] {
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
fn rotl<const SH_LEFT: i32, const SH_RIGHT: i32>(m: Avx2, x: __m256i) -> __m256i {
    const {
        assert!(SH_RIGHT == (32 - SH_LEFT));
    }
    m.or(m.shift_left_u32::<SH_LEFT>(x), m.shift_right_u32::<SH_RIGHT>(x))
}
