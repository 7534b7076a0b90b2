use rand_core::{RngCore, SeedableRng};

use crate::{ChaCha, Rounds, IV_LEN};

impl RngCore for ChaCha {
    fn next_u32(&mut self) -> u32 {
        ChaCha::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        ChaCha::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        ChaCha::fill_bytes(self, dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        ChaCha::fill_bytes(self, dest);
        Ok(())
    }
}

impl SeedableRng for ChaCha {
    type Seed = [u8; 32];

    /// ChaCha20 at counter zero with a zero nonce. Use [`ChaCha::new`]
    /// directly for other round counts or IVs.
    fn from_seed(seed: [u8; 32]) -> Self {
        ChaCha::new(&seed, &[0; IV_LEN], Rounds::R20)
    }
}
