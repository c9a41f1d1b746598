use std::ops::Range;

use crate::error::ConfigError;

/// Cut frequencies used when nothing else is configured.
pub const DEFAULT_CUTS: &[u32] = &[100, 500, 1000, 2500, 5000, 10000];

/// A `[low_hz, high_hz)` band and the half-open FFT bin range it covers.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyBand {
    pub low_hz: u32,
    pub high_hz: u32,
    pub first_bin: usize,
    pub end_bin: usize,
}

impl FrequencyBand {
    pub fn bins(&self) -> Range<usize> {
        self.first_bin..self.end_bin
    }

    pub fn bin_count(&self) -> usize {
        self.end_bin - self.first_bin
    }

    /// Report field name, e.g. `f100-500`.
    pub fn label(&self) -> String {
        format!("f{}-{}", self.low_hz, self.high_hz)
    }
}

/// Maps an ascending cut list onto contiguous bin ranges for one
/// sample rate / FFT size pairing.
///
/// The first band starts at 0 Hz. A band with `low` and `high` cuts covers bins
/// `floor(low / hz_per_bin) + 1 .. floor(high / hz_per_bin)`, so every bin it
/// holds sits strictly inside `[low, high)`. The bin a cut falls in belongs to
/// neither neighbour, and DC and Nyquist are never included. Bands whose upper
/// cut lies above Nyquist are dropped along with everything after them.
#[derive(Clone, Debug)]
pub struct BandLayout {
    bands: Vec<FrequencyBand>,
    sample_rate: u32,
    fft_size: usize,
}

impl BandLayout {
    pub fn new(cuts: &[u32], sample_rate: u32, fft_size: usize) -> Result<Self, ConfigError> {
        if cuts.is_empty() {
            return Err(ConfigError::NoCuts);
        }
        let mut prev = 0;
        for &cut in cuts {
            if cut <= prev {
                return Err(ConfigError::UnorderedCuts { prev, next: cut });
            }
            prev = cut;
        }

        let nyquist_hz = sample_rate / 2;
        let hz_per_bin = sample_rate as f64 / fft_size as f64;
        let bin_for = |hz: u32| (hz as f64 / hz_per_bin).floor() as usize;
        // Nyquist bin itself is never accumulated
        let nyquist_bin = fft_size / 2;

        let mut bands = Vec::with_capacity(cuts.len());
        let mut low_hz = 0;
        for &high_hz in cuts {
            if high_hz > nyquist_hz {
                log::debug!("Dropping bands from {} Hz up (above Nyquist {} Hz)", low_hz, nyquist_hz);
                break;
            }

            let first_bin = bin_for(low_hz) + 1;
            let end_bin = bin_for(high_hz).min(nyquist_bin);
            if end_bin <= first_bin {
                return Err(ConfigError::EmptyBand { low_hz, high_hz });
            }

            bands.push(FrequencyBand {
                low_hz,
                high_hz,
                first_bin,
                end_bin,
            });
            low_hz = high_hz;
        }

        if bands.is_empty() {
            return Err(ConfigError::NothingBelowNyquist { nyquist_hz });
        }

        Ok(Self {
            bands,
            sample_rate,
            fft_size,
        })
    }

    pub fn bands(&self) -> &[FrequencyBand] {
        &self.bands
    }

    pub fn hz_per_bin(&self) -> f64 {
        self.sample_rate as f64 / self.fft_size as f64
    }

    /// Bins that take part in accumulation and overall RMS: DC and Nyquist excluded.
    pub fn retained_bins(&self) -> Range<usize> {
        1..self.fft_size / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::spectrum::{FFT_SIZE, SAMPLE_RATE};

    fn layout(cuts: &[u32]) -> Result<BandLayout, ConfigError> {
        BandLayout::new(cuts, SAMPLE_RATE, FFT_SIZE)
    }

    #[test]
    fn default_cuts_map_to_expected_bins() {
        let layout = layout(DEFAULT_CUTS).unwrap();
        assert!((layout.hz_per_bin() - 23.4375).abs() < 1e-9);

        let bands = layout.bands();
        assert_eq!(bands.len(), 6);
        assert_eq!(bands[0].bins(), 1..4);
        assert_eq!(bands[1].low_hz, 100);
        assert_eq!(bands[1].high_hz, 500);
        assert_eq!(bands[1].bins(), 5..21);
        assert_eq!(bands[1].bin_count(), 16);
        assert_eq!(bands[1].label(), "f100-500");
        assert_eq!(bands[5].bins(), 214..426);
    }

    #[test]
    fn bands_are_ordered_disjoint_and_skip_dc() {
        let layout = layout(&[50, 300, 1200, 7000, 15000, 24000]).unwrap();
        let bands = layout.bands();
        assert_eq!(bands[0].first_bin, 1);
        for pair in bands.windows(2) {
            assert_eq!(pair[0].high_hz, pair[1].low_hz);
            assert!(pair[0].end_bin < pair[1].first_bin);
        }
    }

    #[test]
    fn every_bin_lies_inside_its_band() {
        let layout = layout(&[50, 300, 1200, 7000, 15000, 24000]).unwrap();
        let hz = layout.hz_per_bin();
        for band in layout.bands() {
            for bin in band.bins() {
                let freq = bin as f64 * hz;
                assert!(freq > band.low_hz as f64 && freq < band.high_hz as f64);
            }
        }
    }

    #[test]
    fn cut_on_exact_bin_belongs_to_neither_band() {
        // 12000 Hz is exactly bin 512
        let layout = layout(&[12000, 24000]).unwrap();
        let bands = layout.bands();
        assert_eq!(bands[0].bins(), 1..512);
        assert_eq!(bands[1].bins(), 513..1024);
        assert!(!bands[0].bins().contains(&512));
        assert!(!bands[1].bins().contains(&(FFT_SIZE / 2)));
        assert_eq!(layout.retained_bins(), 1..FFT_SIZE / 2);
    }

    #[test]
    fn bands_above_nyquist_are_dropped() {
        let layout = layout(&[1000, 20000, 30000, 40000]).unwrap();
        let labels: Vec<String> = layout.bands().iter().map(|b| b.label()).collect();
        assert_eq!(labels, vec!["f0-1000", "f1000-20000"]);
        assert!(layout.bands().iter().all(|b| b.low_hz < 24000));
    }

    #[test]
    fn rejects_unordered_cuts() {
        assert_eq!(
            layout(&[100, 500, 400]).unwrap_err(),
            ConfigError::UnorderedCuts { prev: 500, next: 400 }
        );
        assert_eq!(
            layout(&[0, 500]).unwrap_err(),
            ConfigError::UnorderedCuts { prev: 0, next: 0 }
        );
        assert_eq!(layout(&[]).unwrap_err(), ConfigError::NoCuts);
    }

    #[test]
    fn rejects_band_without_bins() {
        assert_eq!(
            layout(&[10, 500]).unwrap_err(),
            ConfigError::EmptyBand { low_hz: 0, high_hz: 10 }
        );
    }

    #[test]
    fn rejects_layout_entirely_above_nyquist() {
        assert_eq!(
            layout(&[30000]).unwrap_err(),
            ConfigError::NothingBelowNyquist { nyquist_hz: 24000 }
        );
    }
}
