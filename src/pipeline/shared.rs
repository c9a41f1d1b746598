use std::sync::{Mutex, MutexGuard, PoisonError};

use super::accumulator::{BandAccumulator, Snapshot};
use super::record::ErrorReport;

/// State shared between the audio callback and the aggregation loop.
///
/// Each operation takes its lock exactly once, so neither side can observe a
/// partially folded block, a half-reset accumulator or a half-drained queue.
/// A poisoned lock is recovered: the data is plain sums and records, and the
/// audio thread must never unwind on a lock.
#[derive(Debug)]
pub struct SharedSpectrum {
    accumulator: Mutex<BandAccumulator>,
    pending: Mutex<Vec<ErrorReport>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SharedSpectrum {
    pub fn new(fft_size: usize) -> Self {
        Self {
            accumulator: Mutex::new(BandAccumulator::new(fft_size)),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Fold every spectrum of one block in a single critical section.
    pub fn accumulate(&self, spectra: &[Vec<f32>]) {
        if spectra.is_empty() {
            return;
        }
        let mut acc = lock(&self.accumulator);
        for power in spectra {
            acc.accumulate(power);
        }
    }

    pub fn snapshot_and_reset(&self) -> Snapshot {
        lock(&self.accumulator).take()
    }

    pub fn enqueue(&self, report: ErrorReport) {
        lock(&self.pending).push(report);
    }

    /// Take every queued report, oldest first.
    pub fn drain(&self) -> Vec<ErrorReport> {
        std::mem::take(&mut *lock(&self.pending))
    }
}
