use std::sync::Arc;

use super::record::{ErrorKind, ErrorReport};
use super::shared::SharedSpectrum;
use crate::audio::spectrum::{frames, SpectrumTransformer};

/// Callback-side half of the pipeline. Owned by the capture callback.
///
/// Anomalies are queued as records, never returned: the audio thread has
/// nobody to report to.
pub struct BlockProcessor {
    transformer: SpectrumTransformer,
    shared: Arc<SharedSpectrum>,
}

impl BlockProcessor {
    pub fn new(fft_size: usize, shared: Arc<SharedSpectrum>) -> Self {
        Self {
            transformer: SpectrumTransformer::new(fft_size),
            shared,
        }
    }

    /// Handle one block and return how many frames were folded in.
    pub fn process_block(&mut self, samples: &[f32], status: Option<&str>) -> usize {
        let got_status = match status {
            Some(text) if !text.is_empty() => {
                log::warn!("Got error status: {}", text);
                self.shared
                    .enqueue(ErrorReport::new(ErrorKind::GotStatus, text));
                true
            }
            _ => false,
        };

        if !samples.iter().any(|&s| s != 0.0) {
            log::warn!("No data received in callback ({} samples)", samples.len());
            // A block already reported via its status is not reported twice
            if !got_status {
                self.shared
                    .enqueue(ErrorReport::new(ErrorKind::EmptyData, "Empty data"));
            }
            return 0;
        }

        // Transform outside the lock; only the fold is shared
        let fft_size = self.transformer.fft_size();
        let spectra: Vec<Vec<f32>> = frames(samples, fft_size)
            .map(|window| self.transformer.power_spectrum(window))
            .collect();
        self.shared.accumulate(&spectra);

        log::debug!(
            "Folded {} frames from a {}-sample block ({} trailing samples dropped)",
            spectra.len(),
            samples.len(),
            samples.len() % fft_size
        );
        spectra.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::spectrum::FFT_SIZE;

    fn processor() -> (BlockProcessor, Arc<SharedSpectrum>) {
        let shared = Arc::new(SharedSpectrum::new(FFT_SIZE));
        (BlockProcessor::new(FFT_SIZE, Arc::clone(&shared)), shared)
    }

    fn noise(len: usize) -> Vec<f32> {
        (0..len).map(|i| ((i * 7919) % 13) as f32 / 13.0 - 0.5).collect()
    }

    #[test]
    fn audible_block_folds_whole_windows() {
        let (mut proc, shared) = processor();
        let folded = proc.process_block(&noise(3 * FFT_SIZE + 17), None);
        assert_eq!(folded, 3);
        assert!(shared.drain().is_empty());

        let snap = shared.snapshot_and_reset();
        assert_eq!(snap.frames, 3);
        assert!(snap.power_over(1..FFT_SIZE / 2) > 0.0);
    }

    #[test]
    fn silent_block_queues_empty_data() {
        let (mut proc, shared) = processor();
        assert_eq!(proc.process_block(&vec![0.0; 4 * FFT_SIZE], None), 0);

        let pending = shared.drain();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, ErrorKind::EmptyData);
        assert_eq!(shared.snapshot_and_reset().frames, 0);
    }

    #[test]
    fn status_takes_precedence_over_empty_block() {
        let (mut proc, shared) = processor();
        proc.process_block(&vec![0.0; FFT_SIZE], Some("input overflow"));

        let pending = shared.drain();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, ErrorKind::GotStatus);
        assert_eq!(pending[0].status_text, "input overflow");
    }

    #[test]
    fn status_with_audio_still_accumulates() {
        let (mut proc, shared) = processor();
        let folded = proc.process_block(&noise(FFT_SIZE), Some("input overflow"));
        assert_eq!(folded, 1);
        assert_eq!(shared.drain().len(), 1);
        assert_eq!(shared.snapshot_and_reset().frames, 1);
    }

    #[test]
    fn empty_status_text_is_ignored() {
        let (mut proc, shared) = processor();
        proc.process_block(&noise(FFT_SIZE), Some(""));
        assert!(shared.drain().is_empty());
    }
}
