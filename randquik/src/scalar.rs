use arrayref::array_mut_ref;

use crate::{
    common_guts::double_rounds, counter, set_counter, Backend, Rounds, BLOCK_LEN,
};

pub(crate) fn backend() -> Backend {
    Backend::new(fill_buf)
}

/// The scalar path is a "batch" of one block, so it serves every whole
/// 64-byte chunk of `out` and leaves only a sub-block tail to the caller.
/// It doubles as the finishing stage after a SIMD backend has emitted its
/// whole batches.
pub(crate) fn fill_buf(state: &mut [u32; 16], out: &mut [u8], rounds: Rounds) -> usize {
    let blocks = out.len() / BLOCK_LEN;
    for i in 0..blocks {
        block(state, array_mut_ref![out, i * BLOCK_LEN, BLOCK_LEN], rounds);
    }
    blocks * BLOCK_LEN
}

/// One ChaCha block: mixes a copy of the state, adds the original back in,
/// emits the 16 words little-endian, and steps the counter. This is the
/// reference the vectorized backends must agree with bit-for-bit.
pub(crate) fn block(state: &mut [u32; 16], out: &mut [u8; BLOCK_LEN], rounds: Rounds) {
    let mut x = *state;

    double_rounds(&mut x, rounds, quarter_round);

    for (i, xi) in x.iter().enumerate() {
        *array_mut_ref![out, 4 * i, 4] = xi.wrapping_add(state[i]).to_le_bytes();
    }

    set_counter(state, counter(state).wrapping_add(1));
}

#[inline(always)]
fn quarter_round([mut a, mut b, mut c, mut d]: [u32; 4]) -> [u32; 4] {
    a = a.wrapping_add(b);
    d ^= a;
    d = d.rotate_left(16);

    c = c.wrapping_add(d);
    b ^= c;
    b = b.rotate_left(12);

    a = a.wrapping_add(b);
    d ^= a;
    d = d.rotate_left(8);

    c = c.wrapping_add(d);
    b ^= c;
    b = b.rotate_left(7);

    [a, b, c, d]
}
