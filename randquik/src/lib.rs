//! Fast, seekable ChaCha keystream generation.
//!
//! This crate produces the raw keystream of the ChaCha stream cipher family
//! (8, 12 or 20 rounds; 20 is ChaCha20) as an arbitrary-length, seekable byte
//! sequence. It is the engine behind the `randquik` command line tool, which
//! writes a seeded pseudo-random stream to a file or pipe at multiple
//! gigabytes per second, and it is equally usable as a library: a
//! deterministic, cryptographically strong source of bytes, integers and
//! doubles for simulations, disk exercisers, or as a bit-generator back-end
//! for numerical libraries.
//!
//! # Quick Start
//!
//! There is no global or thread-local generator. You always pick a 32-byte
//! key and a 16-byte IV (the first eight bytes are the initial block counter,
//! normally zero; the last eight are the nonce) and create a [`ChaCha`]
//! context from them:
//!
//! ```
//! use randquik::{ChaCha, Rounds};
//!
//! let key = [0x42; 32];
//! let iv = [0; 16];
//! let mut cha = ChaCha::new(&key, &iv, Rounds::R20);
//!
//! let mut bytes = [0; 100];
//! cha.fill_bytes(&mut bytes);
//! let coin = if cha.next_u32() & 1 == 0 { "heads" } else { "tails" };
//! ```
//!
//! The output for a given `(rounds, key, IV)` triple is exact and portable:
//! it is the ChaCha keystream as specified in RFC 7539 (with a 64-bit
//! counter), independent of platform endianness and of the SIMD backend in
//! use. Requests may have any length and any alignment; generated-but-unread
//! bytes are carried over to the next call. [`ChaCha::seek_blocks`]
//! repositions the stream in 64-byte block units without generating
//! anything, which is what makes counter-partitioned parallel generation
//! (see [`pipeline`]) bitwise identical to a single-threaded stream.
//!
//! # Not an Encryption Library
//!
//! The output is pure keystream. There is no authentication, no AEAD mode,
//! and no API that XORs caller data; if you want to encrypt something you
//! should reach for a higher-level construction instead. The counter wraps
//! modulo 2⁶⁴ without any notion of "keystream exhausted".
//!
//! # SIMD Backends
//!
//! Block generation is batched: 8 blocks per step with AVX2, 4 blocks per
//! step with SSSE3 on x86 or NEON on AArch64, with a portable scalar
//! fallback. The implementation is picked once when a context is created
//! (runtime detection needs the `std` feature; without it, statically
//! enabled target features are used) and never changes for the context's
//! lifetime. Every backend produces output bit-identical to the scalar
//! block function.
//!
//! # Crate Features
//!
//! * **`std`** (default): runtime CPU feature detection and the [`pipeline`]
//!   module. Without it the crate is `no_std`.
//! * **`cli`** (default): support code for the `randquik` binary.
//! * **`rand_core_0_6`**: `RngCore` and `SeedableRng` impls for integration
//!   with rand v0.6 ecosystem crates.
#![forbid(unsafe_op_in_unsafe_fn)]
#![no_std]

#[cfg(any(feature = "std", test))]
extern crate std;

use core::{cmp, fmt};

use arrayref::array_ref;
use zeroize::Zeroize;

mod backend;
mod common_guts;
#[cfg(feature = "rand_core_0_6")]
mod rand_core_0_6;
mod scalar;
#[cfg(test)]
mod tests;

#[cfg(feature = "std")]
pub mod cli;
#[cfg(feature = "std")]
pub mod pipeline;

#[cfg(feature = "unstable_internals")]
pub use backend::Backend;
#[cfg(not(feature = "unstable_internals"))]
use backend::Backend;

use common_guts::{C0, C1, C2, C3};

/// Key length in bytes. Only 256-bit keys are supported.
pub const KEY_LEN: usize = 32;
/// IV length in bytes: 64-bit initial counter followed by a 64-bit nonce,
/// both little-endian.
pub const IV_LEN: usize = 16;
/// One ChaCha block: the output for a single counter value.
pub const BLOCK_LEN: usize = 64;
/// The widest batch any backend produces per step.
pub const BATCH_LEN: usize = 512;

/// Number of ChaCha rounds. `R20` is the ChaCha20 everyone means by default;
/// the reduced-round variants trade margin for speed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rounds {
    /// 8 rounds.
    R8,
    /// 12 rounds.
    R12,
    /// 20 rounds (ChaCha20).
    #[default]
    R20,
}

impl Rounds {
    /// The round count as a number, e.g. for display.
    pub const fn count(self) -> u32 {
        match self {
            Rounds::R8 => 8,
            Rounds::R12 => 12,
            Rounds::R20 => 20,
        }
    }

    /// The inverse of [`Rounds::count`]. Anything other than 8, 12 or 20
    /// returns `None`.
    pub const fn from_count(count: u32) -> Option<Self> {
        match count {
            8 => Some(Rounds::R8),
            12 => Some(Rounds::R12),
            20 => Some(Rounds::R20),
            _ => None,
        }
    }

    pub(crate) const fn double_rounds(self) -> u32 {
        self.count() / 2
    }
}

/// A seekable ChaCha keystream.
///
/// The context owns the 16-word cipher state plus a carry-over of up to one
/// 64-byte block of generated-but-unread keystream, so that requests of any
/// length compose into one continuous byte sequence: after `fill_bytes`
/// with `n` bytes, the next byte delivered is the `n`-th-plus-one byte of
/// the stream, no matter how the requests were sized. Large requests are
/// handed to the SIMD batch implementation in a single call so vectorized
/// code runs at full speed; the sub-batch remainder cascades down to single
/// blocks, so the counter never runs more than one block ahead of the bytes
/// actually requested.
///
/// # Counter and seeking
///
/// State words 12 and 13 form a little-endian 64-bit block counter that
/// increments once per 64-byte block and wraps modulo 2⁶⁴.
/// [`ChaCha::seek_blocks`] adds a signed block delta to it directly —
/// constant time, no keystream computed — and discards any carry-over.
/// Disjoint, counter-partitioned contexts are the supported way to
/// parallelize: a single context is not thread-safe to share.
///
/// # Key hygiene
///
/// [`ChaCha::wipe`] zeroes the key, the counter and any buffered keystream;
/// dropping the context does the same.
#[derive(Clone)]
pub struct ChaCha {
    backend: Backend,
    rounds: Rounds,
    state: [u32; 16],
    /// `carry[off..end]` is generated keystream not yet delivered.
    off: usize,
    end: usize,
    carry: [u8; BLOCK_LEN],
}

impl fmt::Debug for ChaCha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChaCha { .. }")
    }
}

impl ChaCha {
    /// Creates a context positioned at the start of the keystream described
    /// by `iv` (i.e. at the initial counter in its first eight bytes).
    ///
    /// The fastest batch implementation the running CPU supports is resolved
    /// here, once, and bound to the context.
    #[inline]
    pub fn new(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], rounds: Rounds) -> Self {
        // On x86, prefer the 8-block AVX2 batch over the 4-block SSSE3 one.
        // NEON is for a mutually exclusive target, but chaining the probes is
        // less of a mess than replicating the `cfg` soup here.
        let backend = avx2::detect()
            .or_else(ssse3::detect)
            .or_else(neon::detect)
            .unwrap_or_else(scalar::backend);
        Self::with_backend_impl(key, iv, rounds, backend)
    }

    #[cfg(feature = "unstable_internals")]
    #[inline]
    pub fn with_backend(
        key: &[u8; KEY_LEN],
        iv: &[u8; IV_LEN],
        rounds: Rounds,
        backend: Backend,
    ) -> Self {
        Self::with_backend_impl(key, iv, rounds, backend)
    }

    fn with_backend_impl(
        key: &[u8; KEY_LEN],
        iv: &[u8; IV_LEN],
        rounds: Rounds,
        backend: Backend,
    ) -> Self {
        let mut state = [C0, C1, C2, C3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        for i in 0..8 {
            state[4 + i] = u32::from_le_bytes(*array_ref![key, 4 * i, 4]);
        }
        for i in 0..4 {
            state[12 + i] = u32::from_le_bytes(*array_ref![iv, 4 * i, 4]);
        }
        ChaCha {
            backend,
            rounds,
            state,
            off: 0,
            end: 0,
            carry: [0; BLOCK_LEN],
        }
    }

    /// Fills `out` with the next `out.len()` bytes of the keystream.
    ///
    /// A zero-length `out` is a no-op. There is no failure mode: generation
    /// is pure computation and the counter simply wraps.
    pub fn fill_bytes(&mut self, out: &mut [u8]) {
        // Deliver buffered bytes first.
        let mut start = 0;
        if self.off < self.end {
            let n = cmp::min(self.end - self.off, out.len());
            out[..n].copy_from_slice(&self.carry[self.off..self.off + n]);
            self.off += n;
            start = n;
        }
        let rest = &mut out[start..];
        if rest.is_empty() {
            return;
        }

        // Whole batches go straight into the caller's buffer, however many
        // there are, in one backend call.
        let direct = self.backend.fill(&mut self.state, rest, self.rounds);
        let rest = &mut rest[direct..];

        // Cascade down to single blocks for whatever stayed below the batch
        // width, so the counter advances by exactly the blocks the request
        // needs.
        let whole = rest.len() - rest.len() % BLOCK_LEN;
        scalar::fill_buf(&mut self.state, &mut rest[..whole], self.rounds);

        // A sub-block tail costs one more block; the unread remainder is
        // kept for the next request.
        let tail = rest.len() - whole;
        if tail > 0 {
            scalar::block(&mut self.state, &mut self.carry, self.rounds);
            rest[whole..].copy_from_slice(&self.carry[..tail]);
            self.off = tail;
            self.end = BLOCK_LEN;
        }
    }

    /// Moves the stream position by `delta` 64-byte blocks, wrapping modulo
    /// 2⁶⁴. Constant time; no keystream is generated. Any carried-over bytes
    /// belong to the old position and are discarded.
    pub fn seek_blocks(&mut self, delta: i64) {
        let ctr = counter(&self.state).wrapping_add(delta as u64);
        set_counter(&mut self.state, ctr);
        self.off = 0;
        self.end = 0;
    }

    /// The next 4 keystream bytes as a little-endian integer.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut bytes = [0; 4];
        self.fill_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    /// The next 8 keystream bytes as a little-endian integer.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut bytes = [0; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    /// A uniform double in `[0, 1)`: the top 53 bits of a `u64` draw times
    /// 2⁻⁵³. Every representable result is an exact multiple of 2⁻⁵³, so 1.0
    /// can never be rounded to.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Zeroes the key, counter, nonce and all buffered keystream. The
    /// context stays usable but produces the all-zero-key stream afterwards,
    /// so this is meant as the last thing done with it. Also runs on drop.
    pub fn wipe(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for ChaCha {
    fn zeroize(&mut self) {
        self.state.zeroize();
        self.carry.zeroize();
        self.off = 0;
        self.end = 0;
    }
}

impl Drop for ChaCha {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// One-shot convenience: fills `out` from a throwaway context and wipes it.
pub fn generate(out: &mut [u8], key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], rounds: Rounds) {
    let mut cha = ChaCha::new(key, iv, rounds);
    cha.fill_bytes(out);
}

/// The 64-bit block counter, words 12 and 13 read as one little-endian
/// integer. This interpretation is the single source of truth; the SIMD
/// paths build their per-lane counters from it.
#[inline]
pub(crate) fn counter(state: &[u32; 16]) -> u64 {
    (state[12] as u64) | ((state[13] as u64) << 32)
}

#[inline]
pub(crate) fn set_counter(state: &mut [u32; 16], ctr: u64) {
    state[12] = ctr as u32;
    state[13] = (ctr >> 32) as u32;
}

macro_rules! arch_backends {
    ($(#[cfg($cond:meta)] mod $name:ident;)+) => {
        $(
            #[cfg($cond)]
            mod $name {
                mod safe_arch;
                mod backend;
                pub(crate) use backend::detect;
            }

            #[cfg(not($cond))]
            mod $name {
                pub fn detect() -> Option<crate::Backend> {
                    None
                }
            }
        )+
    };
}

arch_backends! {
    // This backend uses dynamic feature detection, so it's disabled in
    // no_std mode and only gated on `target_arch`.
    #[cfg(all(any(target_arch = "x86_64", target_arch = "x86"), feature = "std"))]
    mod avx2;

    // SSSE3 also detects dynamically when std is available; without std it
    // still works if the target feature is statically enabled.
    #[cfg(all(
        any(target_arch = "x86_64", target_arch = "x86"),
        any(feature = "std", target_feature = "ssse3")
    ))]
    mod ssse3;

    // Little-endian only: the core::arch intrinsics currently don't work on
    // aarch64be (https://github.com/rust-lang/stdarch/issues/1484).
    #[cfg(all(target_arch = "aarch64", target_feature = "neon", target_endian = "little"))]
    mod neon;
}

// These constructors only exist so the benchmark harness (compiled as a
// separate crate) can override backend selection and compare performance.
// They're not in the `backend` module to minimize the code that has to worry
// about upholding `Backend`'s invariant.
#[cfg(feature = "unstable_internals")]
impl Backend {
    pub fn scalar() -> Self {
        scalar::backend()
    }

    pub fn x86_avx2() -> Option<Self> {
        avx2::detect()
    }

    pub fn x86_ssse3() -> Option<Self> {
        ssse3::detect()
    }

    pub fn aarch64_neon() -> Option<Self> {
        neon::detect()
    }
}
