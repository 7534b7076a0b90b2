//! Parallel keystream delivery to a single writer.
//!
//! A fixed pool of producer threads each owns a private [`ChaCha`] context
//! whose counter is pre-partitioned, and fills a private buffer of
//! [`BLOCK_BYTES`] bytes. The consumer (normally the calling thread) drains
//! the slots in strict round-robin order and writes them out; under that
//! ordering the concatenated output is bitwise identical to one
//! single-threaded stream from the same key and IV, for any worker count
//! and any buffer size that is a multiple of 64.
//!
//! Each slot is a single-producer/single-consumer channel with its own
//! mutex and condvar, so there is no cross-slot contention in steady state:
//! the writer blocks on output I/O (the designed bottleneck) while every
//! producer regenerates its buffer.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread;
use std::vec;
use std::vec::Vec;

use crate::{counter, ChaCha, Rounds, BLOCK_LEN, IV_LEN, KEY_LEN};

/// Size of one producer buffer. 2 MiB is empirically the throughput sweet
/// spot for piped and file output.
pub const BLOCK_BYTES: usize = 1 << 21;

/// Pipeline parameters.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of producer threads.
    pub workers: usize,
    /// Bytes per hand-off buffer; must be a nonzero multiple of 64.
    pub block_bytes: usize,
    /// Stop after exactly this many bytes; 0 means run until `quit`.
    pub max_bytes: u64,
    pub rounds: Rounds,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workers: 8,
            block_bytes: BLOCK_BYTES,
            max_bytes: 0,
            rounds: Rounds::R20,
        }
    }
}

struct SlotBuf {
    buf: Vec<u8>,
    ready: bool,
}

struct Slot {
    buf: Mutex<SlotBuf>,
    cond: Condvar,
}

/// Runs the pipeline until the byte cap is reached, `quit` is set, or the
/// writer fails. Returns the number of bytes written; a write error is
/// returned as-is after the workers have been torn down (whatever was
/// already written stays written).
///
/// `quit` is shared so signal handlers (or another thread) can stop the run;
/// it is also how the pipeline announces shutdown to its workers, so it
/// should start out false. `progress` is called with the running byte count
/// after every completed write.
pub fn run<W: Write>(
    out: W,
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    config: &Config,
    quit: &AtomicBool,
    progress: impl FnMut(u64),
) -> io::Result<u64> {
    assert!(config.workers >= 1, "need at least one producer");
    assert!(
        config.block_bytes >= BLOCK_LEN && config.block_bytes % BLOCK_LEN == 0,
        "block_bytes must be a nonzero multiple of {BLOCK_LEN}"
    );

    let slots: Vec<Slot> = (0..config.workers)
        .map(|_| Slot {
            buf: Mutex::new(SlotBuf {
                buf: vec![0; config.block_bytes],
                ready: false,
            }),
            cond: Condvar::new(),
        })
        .collect();

    let blocks_per_buf = (config.block_bytes / BLOCK_LEN) as i64;
    let mut writer = Writer {
        out,
        quit,
        max_bytes: config.max_bytes,
        bytes_written: 0,
        progress,
    };
    let mut result = Ok(());

    thread::scope(|scope| {
        for (i, slot) in slots.iter().enumerate() {
            // Each producer gets a private context positioned at the slot's
            // first block; the round-robin drain below stitches the slot
            // outputs back into the canonical stream order.
            let mut cha = ChaCha::new(key, iv, config.rounds);
            cha.seek_blocks(i as i64 * blocks_per_buf);
            let workers = config.workers;
            scope.spawn(move || produce(slot, cha, workers, blocks_per_buf, quit));
        }

        result = writer.drain(&slots);

        // Shut down: wake every producer, whether it's waiting for its slot
        // to drain or about to check `quit`. The scope joins them.
        quit.store(true, Ordering::Relaxed);
        for slot in &slots {
            let mut state = slot.buf.lock().unwrap();
            state.ready = false;
            slot.cond.notify_all();
        }
    });

    result.map(|()| writer.bytes_written)
}

fn produce(slot: &Slot, mut cha: ChaCha, workers: usize, blocks_per_buf: i64, quit: &AtomicBool) {
    // Each fill must start exactly one round-robin cycle of blocks past
    // where the previous one started, so the seek delta is computed from
    // the counter advance the fill actually made rather than assumed.
    let cycle = workers as i64 * blocks_per_buf;
    loop {
        let mut state = slot.buf.lock().unwrap();
        while state.ready && !quit.load(Ordering::Relaxed) {
            state = slot.cond.wait(state).unwrap();
        }
        if quit.load(Ordering::Relaxed) {
            // Observed under the slot lock, so the writer is either not in
            // this slot's wait yet (it will check `quit` before waiting) or
            // gets woken here. Either way nobody stays blocked on us.
            slot.cond.notify_all();
            // Dropping the context wipes the copied key.
            return;
        }
        let before = counter(&cha.state);
        cha.fill_bytes(&mut state.buf);
        let advanced = counter(&cha.state).wrapping_sub(before) as i64;
        cha.seek_blocks(cycle - advanced);
        state.ready = true;
        slot.cond.notify_one();
    }
}

struct Writer<'q, W, P> {
    out: W,
    quit: &'q AtomicBool,
    max_bytes: u64,
    bytes_written: u64,
    progress: P,
}

impl<W: Write, P: FnMut(u64)> Writer<'_, W, P> {
    fn drain(&mut self, slots: &[Slot]) -> io::Result<()> {
        // Strict round-robin. This ordering is what makes the counter
        // partitioning reconstruct the canonical stream; nothing else about
        // cross-slot timing matters.
        while !self.quit.load(Ordering::Relaxed) {
            for slot in slots {
                let mut state = slot.buf.lock().unwrap();
                while !state.ready {
                    if self.quit.load(Ordering::Relaxed) {
                        return Ok(());
                    }
                    state = slot.cond.wait(state).unwrap();
                }

                let mut len = state.buf.len() as u64;
                if self.max_bytes != 0 && self.bytes_written + len >= self.max_bytes {
                    len = self.max_bytes - self.bytes_written;
                    self.quit.store(true, Ordering::Relaxed);
                }
                if let Err(err) = self.out.write_all(&state.buf[..len as usize]) {
                    self.quit.store(true, Ordering::Relaxed);
                    return Err(err);
                }
                self.bytes_written += len;
                state.ready = false;
                slot.cond.notify_one();
                drop(state);

                (self.progress)(self.bytes_written);
                if self.quit.load(Ordering::Relaxed) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}
