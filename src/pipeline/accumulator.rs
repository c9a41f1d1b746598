/// Per-bin power sums for the frames folded in since the last reset.
///
/// Only bins `1 .. fft_size/2` are ever written; DC and Nyquist stay zero.
/// While `frames_folded == 0` every sum is zero.
#[derive(Debug)]
pub struct BandAccumulator {
    sums: Vec<f64>,
    frames_folded: u64,
}

/// What a reset hands back: the sums and how many frames they cover.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub sums: Vec<f64>,
    pub frames: u64,
}

impl Snapshot {
    /// Sum of accumulated power over `bins`.
    pub fn power_over(&self, bins: impl IntoIterator<Item = usize>) -> f64 {
        bins.into_iter().map(|i| self.sums[i]).sum()
    }
}

impl BandAccumulator {
    pub fn new(fft_size: usize) -> Self {
        Self {
            sums: vec![0.0; fft_size / 2 + 1],
            frames_folded: 0,
        }
    }

    /// Fold one power spectrum of `fft_size/2 + 1` bins into the sums.
    pub fn accumulate(&mut self, power: &[f32]) {
        debug_assert_eq!(power.len(), self.sums.len());
        let nyquist = self.sums.len() - 1;
        for (sum, &p) in self.sums[1..nyquist].iter_mut().zip(&power[1..nyquist]) {
            *sum += p as f64;
        }
        self.frames_folded += 1;
    }

    /// Return the current sums and frame count, leaving the accumulator empty.
    pub fn take(&mut self) -> Snapshot {
        let len = self.sums.len();
        Snapshot {
            sums: std::mem::replace(&mut self.sums, vec![0.0; len]),
            frames: std::mem::take(&mut self.frames_folded),
        }
    }
}
