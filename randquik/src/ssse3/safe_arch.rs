#[cfg(target_arch = "x86")]
use core::arch::x86 as arch;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64 as arch;

pub use arch::__m128i;
use arch::{
    _mm_add_epi32, _mm_add_epi64, _mm_loadu_si128, _mm_or_si128, _mm_set1_epi32, _mm_set1_epi64x,
    _mm_set_epi64x, _mm_shuffle_epi8, _mm_slli_epi32, _mm_srli_epi32, _mm_storeu_si128,
    _mm_unpackhi_epi32, _mm_unpackhi_epi64, _mm_unpacklo_epi32, _mm_unpacklo_epi64, _mm_xor_si128,
};

pub(crate) use detect::Ssse3;

mod detect {
    // Safety invariant: can only be constructed if SSSE3 (and therefore its
    // SSE2 baseline) is available.
    #[derive(Clone, Copy)]
    pub(crate) struct Ssse3 {
        _feature_detected: (),
    }

    impl Ssse3 {
        pub(crate) fn new() -> Option<Self> {
            #[cfg(feature = "std")]
            let available = std::is_x86_feature_detected!("ssse3");
            #[cfg(not(feature = "std"))]
            let available = cfg!(target_feature = "ssse3");
            if available {
                Some(Self {
                    _feature_detected: (),
                })
            } else {
                None
            }
        }
    }
}

impl Ssse3 {
    #[inline(always)]
    pub(crate) fn splat(self, x: u32) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_set1_epi32(x as i32) }
    }

    #[inline(always)]
    pub(crate) fn splat_u64(self, x: u64) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_set1_epi64x(x as i64) }
    }

    #[inline(always)]
    pub(crate) fn pair_u64(self, lo: u64, hi: u64) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_set_epi64x(hi as i64, lo as i64) }
    }

    #[inline(always)]
    pub(crate) fn bytes(self, elems: [u8; 16]) -> __m128i {
        // SAFETY: (1) Only needs SSE2, `self` proves that we have it.
        // (2) Loads 128 bits (no alignment requirement) from the address of
        // a `[u8; 16]`.
        unsafe { _mm_loadu_si128(elems.as_ptr().cast()) }
    }

    #[inline(always)]
    pub(crate) fn add_u32(self, x: __m128i, y: __m128i) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_add_epi32(x, y) }
    }

    #[inline(always)]
    pub(crate) fn add_u64(self, x: __m128i, y: __m128i) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_add_epi64(x, y) }
    }

    #[inline(always)]
    pub(crate) fn xor(self, x: __m128i, y: __m128i) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_xor_si128(x, y) }
    }

    #[inline(always)]
    pub(crate) fn or(self, x: __m128i, y: __m128i) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_or_si128(x, y) }
    }

    #[inline(always)]
    pub(crate) fn shift_left_u32<const IMM8: i32>(self, x: __m128i) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_slli_epi32::<IMM8>(x) }
    }

    #[inline(always)]
    pub(crate) fn shift_right_u32<const IMM8: i32>(self, x: __m128i) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_srli_epi32::<IMM8>(x) }
    }

    #[inline(always)]
    pub(crate) fn shuffle_bytes(self, x: __m128i, idx: __m128i) -> __m128i {
        // SAFETY: needs SSSE3, `self` proves that we have it.
        unsafe { _mm_shuffle_epi8(x, idx) }
    }

    #[inline(always)]
    pub(crate) fn unpack_lo_u32(self, x: __m128i, y: __m128i) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_unpacklo_epi32(x, y) }
    }

    #[inline(always)]
    pub(crate) fn unpack_hi_u32(self, x: __m128i, y: __m128i) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_unpackhi_epi32(x, y) }
    }

    #[inline(always)]
    pub(crate) fn unpack_lo_u64(self, x: __m128i, y: __m128i) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_unpacklo_epi64(x, y) }
    }

    #[inline(always)]
    pub(crate) fn unpack_hi_u64(self, x: __m128i, y: __m128i) -> __m128i {
        // SAFETY: only needs SSE2, `self` proves that we have it.
        unsafe { _mm_unpackhi_epi64(x, y) }
    }

    #[inline(always)]
    pub(crate) fn storeu(self, x: __m128i, dest: &mut [u8; 16]) {
        // SAFETY: (1) Only needs SSE2, `self` proves that we have it.
        // (2) Stores 128 bits (no alignment requirement) through a pointer
        // derived from a mutable reference to `[u8; 16]`.
        unsafe { _mm_storeu_si128(dest.as_mut_ptr().cast(), x) }
    }
}
