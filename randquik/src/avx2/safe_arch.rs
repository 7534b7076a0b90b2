#[cfg(target_arch = "x86")]
use core::arch::x86 as arch;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64 as arch;

pub use arch::__m256i;
use arch::{
    _mm256_add_epi32, _mm256_add_epi64, _mm256_loadu_si256, _mm256_or_si256,
    _mm256_permute2x128_si256, _mm256_permutevar8x32_epi32, _mm256_set1_epi32, _mm256_set1_epi64x,
    _mm256_setr_epi32, _mm256_shuffle_epi8, _mm256_slli_epi32, _mm256_srli_epi32,
    _mm256_storeu_si256, _mm256_unpackhi_epi32, _mm256_unpackhi_epi64, _mm256_unpacklo_epi32,
    _mm256_unpacklo_epi64, _mm256_xor_si256,
};

pub(crate) use detect::Avx2;

mod detect {
    // Safety invariant: can only be constructed if AVX2 is available.
    #[derive(Clone, Copy)]
    pub(crate) struct Avx2 {
        _feature_detected: (),
    }

    impl Avx2 {
        pub(crate) fn new() -> Option<Self> {
            if std::is_x86_feature_detected!("avx2") {
                Some(Self {
                    _feature_detected: (),
                })
            } else {
                None
            }
        }
    }
}

impl Avx2 {
    #[inline(always)]
    pub(crate) fn elems(self, elems: [u32; 8]) -> __m256i {
        let [e0, e1, e2, e3, e4, e5, e6, e7] = elems.map(|e| e as i32);
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_setr_epi32(e0, e1, e2, e3, e4, e5, e6, e7) }
    }

    #[inline(always)]
    pub(crate) fn bytes(self, elems: [u8; 32]) -> __m256i {
        // SAFETY: (1) Only needs AVX2, `self` proves that we have AVX2.
        // (2) Loads 256 bits (no alignment requirement) from the address of
        // a `[u8; 32]`.
        unsafe { _mm256_loadu_si256(elems.as_ptr().cast()) }
    }

    #[inline(always)]
    pub(crate) fn splat(self, x: u32) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_set1_epi32(x as i32) }
    }

    #[inline(always)]
    pub(crate) fn splat_u64(self, x: u64) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_set1_epi64x(x as i64) }
    }

    #[inline(always)]
    pub(crate) fn add_u32(self, x: __m256i, y: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_add_epi32(x, y) }
    }

    #[inline(always)]
    pub(crate) fn add_u64(self, x: __m256i, y: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_add_epi64(x, y) }
    }

    #[inline(always)]
    pub(crate) fn xor(self, x: __m256i, y: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_xor_si256(x, y) }
    }

    #[inline(always)]
    pub(crate) fn or(self, x: __m256i, y: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_or_si256(x, y) }
    }

    #[inline(always)]
    pub(crate) fn shift_left_u32<const IMM8: i32>(self, x: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_slli_epi32::<IMM8>(x) }
    }

    #[inline(always)]
    pub(crate) fn shift_right_u32<const IMM8: i32>(self, x: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_srli_epi32::<IMM8>(x) }
    }

    #[inline(always)]
    pub(crate) fn shuffle_bytes(self, x: __m256i, idx: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_shuffle_epi8(x, idx) }
    }

    #[inline(always)]
    pub(crate) fn unpack_lo_u32(self, x: __m256i, y: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_unpacklo_epi32(x, y) }
    }

    #[inline(always)]
    pub(crate) fn unpack_hi_u32(self, x: __m256i, y: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_unpackhi_epi32(x, y) }
    }

    #[inline(always)]
    pub(crate) fn unpack_lo_u64(self, x: __m256i, y: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_unpacklo_epi64(x, y) }
    }

    #[inline(always)]
    pub(crate) fn unpack_hi_u64(self, x: __m256i, y: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_unpackhi_epi64(x, y) }
    }

    /// Permutes 32-bit elements across the full register; `idx` selects a
    /// source element per destination element.
    #[inline(always)]
    pub(crate) fn permute_u32(self, x: __m256i, idx: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_permutevar8x32_epi32(x, idx) }
    }

    /// Concatenates the low 128-bit halves of `x` and `y`.
    #[inline(always)]
    pub(crate) fn cat_lo_lo(self, x: __m256i, y: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_permute2x128_si256::<0x20>(x, y) }
    }

    /// Concatenates the high 128-bit halves of `x` and `y`.
    #[inline(always)]
    pub(crate) fn cat_hi_hi(self, x: __m256i, y: __m256i) -> __m256i {
        // SAFETY: only needs AVX2, `self` proves that we have AVX2.
        unsafe { _mm256_permute2x128_si256::<0x31>(x, y) }
    }

    #[inline(always)]
    pub(crate) fn storeu(self, x: __m256i, dest: &mut [u8; 32]) {
        // SAFETY: (1) Only needs AVX2, `self` proves that we have AVX2.
        // (2) Stores 256 bits (no alignment requirement) through a pointer
        // derived from a mutable reference to `[u8; 32]`.
        unsafe { _mm256_storeu_si256(dest.as_mut_ptr().cast(), x) }
    }
}
