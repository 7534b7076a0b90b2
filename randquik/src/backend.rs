use crate::Rounds;

// Safety invariant: only constructed with functions that are safe to call.
// Either because it's actually a safe function, or because the function only
// requires certain target features that were checked to be available at
// runtime.
//
// (The latter case is the whole reason why it's an `unsafe` fn to begin
// with.)
#[derive(Clone, Copy)]
pub struct Backend {
    fill_impl: unsafe fn(&mut [u32; 16], &mut [u8], Rounds) -> usize,
}

impl Backend {
    pub(crate) fn new(fill_impl: fn(&mut [u32; 16], &mut [u8], Rounds) -> usize) -> Self {
        // SAFETY: `fill_impl` is a safe function, so it's always safe to call.
        Backend { fill_impl }
    }

    /// Create a backend from a fill function gated by dynamic feature
    /// detection.
    ///
    /// ## Safety
    ///
    /// The given function must be safe to call, as if it was an ordinary
    /// `fn(...)` without `unsafe` qualifier. For the intended use case of
    /// runtime `target_feature` detection, that means the function must be
    /// completely safe *except* for requiring certain target features to be
    /// available, and those target features are in fact available.
    pub(crate) unsafe fn new_unchecked(
        fill_impl: unsafe fn(&mut [u32; 16], &mut [u8], Rounds) -> usize,
    ) -> Self {
        // SAFETY: precondition passed on to the caller.
        Self { fill_impl }
    }

    /// Writes as many whole batches of keystream into `out` as fit, advances
    /// the counter in `state` by the number of blocks emitted, and returns
    /// the number of bytes written. The sub-batch tail of `out` is left
    /// untouched; the caller deals with it.
    #[doc(hidden)]
    pub fn fill(self, state: &mut [u32; 16], out: &mut [u8], rounds: Rounds) -> usize {
        // SAFETY: function is safe to call because that's literally what
        // this type's invariant states.
        unsafe { (self.fill_impl)(state, out, rounds) }
    }
}
