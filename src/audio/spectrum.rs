use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::slice::ChunksExact;
use std::sync::Arc;

/// Fixed capture rate. Band layout and bin math assume this.
pub const SAMPLE_RATE: u32 = 48_000;
/// Samples per FFT frame.
pub const FFT_SIZE: usize = 2048;

/// Turns one window of `fft_size` samples into a power spectrum of
/// `fft_size / 2 + 1` bins, each the squared magnitude of the DFT coefficient.
///
/// The planned FFT and its buffers are reused between calls; no state carries
/// over from one frame to the next.
pub struct SpectrumTransformer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumTransformer {
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            fft,
            fft_size,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins in every spectrum this transformer produces.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Power spectrum of exactly one window. No window function is applied.
    ///
    /// Panics if `window.len() != fft_size`; callers slice blocks with [`frames`].
    pub fn power_spectrum(&mut self, window: &[f32]) -> Vec<f32> {
        assert_eq!(
            window.len(),
            self.fft_size,
            "FFT window must be exactly {} samples, got {}",
            self.fft_size,
            window.len()
        );

        for (slot, &s) in self.buffer.iter_mut().zip(window) {
            *slot = Complex::new(s, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        // Real input: bins above fft_size/2 mirror the lower half.
        self.buffer[..self.bin_count()]
            .iter()
            .map(|c| c.norm_sqr())
            .collect()
    }
}

/// Non-overlapping windows of `fft_size` samples starting at offset 0.
///
/// A trailing remainder shorter than one window is dropped, not carried into
/// the next block.
pub fn frames(block: &[f32], fft_size: usize) -> ChunksExact<'_, f32> {
    block.chunks_exact(fft_size)
}
