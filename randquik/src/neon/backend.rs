use core::arch::aarch64::{uint32x4_t, uint8x16_t};

use arrayref::array_mut_ref;

use crate::{
    common_guts::{double_rounds, splat_state},
    neon::safe_arch::{
        add_u32, combine_high_u32, combine_low_u32, lane0_u32, lt_u32, reinterpret_u16x8_as_u32x4,
        reinterpret_u32x4_as_u16x8, reinterpret_u32x4_as_u8x16, reinterpret_u8x16_as_u32x4,
        rev32_u16, shift_left_u32, shift_right_insert_u32, shift_right_u32, splat, store_u8x16,
        tbl_u8x16, trn1_u32, trn2_u32, u32x4_from_elems, u8x16_from_elems, xor,
    },
    Backend, Rounds,
};

/// Four blocks per step, one per 128-bit vector lane.
const BATCH: usize = 256;

pub(crate) fn detect() -> Option<Backend> {
    #[cfg(feature = "std")]
    let has_neon = std::arch::is_aarch64_feature_detected!("neon");
    #[cfg(not(feature = "std"))]
    let has_neon = cfg!(target_feature = "neon");
    if has_neon {
        Some(Backend::new(fill_buf))
    } else {
        None
    }
}

fn fill_buf(state: &mut [u32; 16], out: &mut [u8], rounds: Rounds) -> usize {
    // Rotate-left by 8 as a byte shuffle with VTBL, which has better
    // throughput and latency than a shift -> shift-insert chain on every
    // core I've checked.
    #[rustfmt::skip]
    let rot8_idx = u8x16_from_elems([
         3,  0,  1,  2,
         7,  4,  5,  6,
        11,  8,  9, 10,
        15, 12, 13, 14,
    ]);

    let mut orig = splat_state(state, splat);
    // Turn the splatted counter rows into per-lane counters ctr+0..ctr+3;
    // 32-bit adds with the carry propagated into the high row.
    increment_counters(&mut orig, u32x4_from_elems([0, 1, 2, 3]));
    let step = splat(4);

    let batches = out.len() / BATCH;
    for batch in 0..batches {
        let mut x = orig;
        double_rounds(
            &mut x,
            rounds,
            #[inline(always)]
            |abcd| quarter_round(rot8_idx, abcd),
        );

        for i in 0..16 {
            x[i] = add_u32(x[i], orig[i]);
        }

        let group = array_mut_ref![out, batch * BATCH, BATCH];
        emit_quad([x[0], x[1], x[2], x[3]], group, 0);
        emit_quad([x[4], x[5], x[6], x[7]], group, 16);
        emit_quad([x[8], x[9], x[10], x[11]], group, 32);
        emit_quad([x[12], x[13], x[14], x[15]], group, 48);

        increment_counters(&mut orig, step);
    }

    // Lane 0 always holds the next unemitted block's counter.
    state[12] = lane0_u32(orig[12]);
    state[13] = lane0_u32(orig[13]);
    batches * BATCH
}

fn increment_counters(orig: &mut [uint32x4_t; 16], addv: uint32x4_t) {
    let low = add_u32(orig[12], addv);
    // Unsigned wrap iff the sum came out smaller than the addend.
    let carry = shift_right_u32::<31>(lt_u32(low, addv));
    orig[12] = low;
    orig[13] = add_u32(orig[13], carry);
}

/// Four rows of four words each, one row per lane, land as the same quarter
/// of four consecutive blocks: transpose, then strided stores.
#[inline(always)]
fn emit_quad([a, b, c, d]: [uint32x4_t; 4], out: &mut [u8; BATCH], offset: usize) {
    let ab_even = trn1_u32(a, b); // a0 b0 a2 b2
    let ab_odd = trn2_u32(a, b); // a1 b1 a3 b3
    let cd_even = trn1_u32(c, d);
    let cd_odd = trn2_u32(c, d);
    let rows = [
        combine_low_u32(ab_even, cd_even),  // a0 b0 c0 d0
        combine_low_u32(ab_odd, cd_odd),    // a1 b1 c1 d1
        combine_high_u32(ab_even, cd_even), // a2 b2 c2 d2
        combine_high_u32(ab_odd, cd_odd),   // a3 b3 c3 d3
    ];
    for (block, row) in rows.into_iter().enumerate() {
        store_u8x16(
            reinterpret_u32x4_as_u8x16(row),
            array_mut_ref![out, offset + block * 64, 16],
        );
    }
}

#[inline(always)]
fn quarter_round(rot8_idx: uint8x16_t, [mut a, mut b, mut c, mut d]: [uint32x4_t; 4]) -> [uint32x4_t; 4] {
    a = add_u32(a, b);
    d = rotl16(xor(d, a));

    c = add_u32(c, d);
    b = rotl::<12, 20>(xor(b, c));

    a = add_u32(a, b);
    d = rotl8(xor(d, a), rot8_idx);

    c = add_u32(c, d);
    b = rotl::<7, 25>(xor(b, c));

    [a, b, c, d]
}

#[inline(always)]
fn rotl16(x: uint32x4_t) -> uint32x4_t {
    // There's a dedicated instruction for swapping the 16-bit halves of
    // every 32-bit lane, which is faster than generic rotate-left-by-k
    // sequences but gives the same result.
    const {
        assert!(0x1234_5678u32.rotate_left(16) == 0x5678_1234);
    }
    reinterpret_u16x8_as_u32x4(rev32_u16(reinterpret_u32x4_as_u16x8(x)))
}

#[inline(always)]
fn rotl8(x: uint32x4_t, idx: uint8x16_t) -> uint32x4_t {
    reinterpret_u8x16_as_u32x4(tbl_u8x16(reinterpret_u32x4_as_u8x16(x), idx))
}

#[inline(always)]
fn rotl<const SH_LEFT: i32, const SH_RIGHT: i32>(x: uint32x4_t) -> uint32x4_t {
    const {
        assert!(SH_RIGHT == (32 - SH_LEFT));
    }
    // The other rotates (by 12 and by 7) don't seem to have faster
    // implementations than a pair of shift and shift-insert.
    shift_right_insert_u32::<SH_RIGHT>(shift_left_u32::<SH_LEFT>(x), x)
}
