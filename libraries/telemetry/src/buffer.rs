use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use parking_lot::RwLock;

use crate::{MarkerSample, MarkerSlot, MARKER_COUNT};

/// Latest sample per slot. Each slot is replaced as a whole value, so a
/// reader never sees fields from two different messages in one sample.
#[derive(Debug)]
struct MarkerCycleBuffer {
    slots: [RwLock<MarkerSample>; MARKER_COUNT],
    writes: AtomicU64,
    last_write: RwLock<Option<Instant>>,
}

impl MarkerCycleBuffer {
    fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| RwLock::new(MarkerSample::ZERO)),
            writes: AtomicU64::new(0),
            last_write: RwLock::new(None),
        }
    }
}

/// Create a zeroed cycle buffer, returning its only writer and a reader.
pub fn marker_buffer() -> (MarkerWriter, MarkerReader) {
    let buffer = Arc::new(MarkerCycleBuffer::new());
    (
        MarkerWriter {
            buffer: buffer.clone(),
            next: MarkerSlot::FIRST,
        },
        MarkerReader { buffer },
    )
}

/// Write side of the cycle buffer. Not `Clone`: there is exactly one writer,
/// and it alone advances the slot index.
#[derive(Debug)]
pub struct MarkerWriter {
    buffer: Arc<MarkerCycleBuffer>,
    next: MarkerSlot,
}

impl MarkerWriter {
    /// Store `sample` in the next slot, wrapping from 4 back to 1.
    pub fn write(&mut self, sample: MarkerSample) -> MarkerSlot {
        let slot = self.next;
        *self.buffer.slots[slot.index()].write() = sample;
        *self.buffer.last_write.write() = Some(Instant::now());
        self.buffer.writes.fetch_add(1, Ordering::Release);
        self.next = slot.next();
        slot
    }

    /// Slot the next `write` will target.
    pub fn next_slot(&self) -> MarkerSlot {
        self.next
    }

    pub fn reader(&self) -> MarkerReader {
        MarkerReader {
            buffer: self.buffer.clone(),
        }
    }
}

/// Read side of the cycle buffer; cheap to clone and share between threads.
#[derive(Debug, Clone)]
pub struct MarkerReader {
    buffer: Arc<MarkerCycleBuffer>,
}

impl MarkerReader {
    /// Copy of all four slots, indexed by `MarkerSlot::index`.
    ///
    /// Slots are copied one after another, so they may differ in age by up to
    /// one cycle. Each individual sample is always whole.
    pub fn snapshot(&self) -> [MarkerSample; MARKER_COUNT] {
        std::array::from_fn(|i| *self.buffer.slots[i].read())
    }

    pub fn get(&self, slot: MarkerSlot) -> MarkerSample {
        *self.buffer.slots[slot.index()].read()
    }

    /// Number of samples written since startup.
    pub fn writes(&self) -> u64 {
        self.buffer.writes.load(Ordering::Acquire)
    }

    /// Slot written most recently, `None` before the first write.
    ///
    /// The counter is bumped after the slot is stored, so while writes are in
    /// flight this is advisory only and may lag a `snapshot` taken just
    /// before it.
    pub fn active_slot(&self) -> Option<MarkerSlot> {
        MarkerSlot::after_writes(self.writes())
    }

    pub fn last_write(&self) -> Option<Instant> {
        *self.buffer.last_write.read()
    }

    /// Time since the last write; `None` if nothing was ever written.
    pub fn age(&self) -> Option<Duration> {
        self.last_write().map(|at| at.elapsed())
    }
}
