use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

use super::accumulator::Snapshot;
use crate::audio::bands::BandLayout;
use crate::sink::{DataPoint, FieldValue};

/// Tags attached to every point this sensor writes.
#[derive(Clone, Debug)]
pub struct Tags {
    pub version: String,
    pub sensor_id: u32,
    pub nodename: String,
}

impl Tags {
    pub fn new(sensor_id: u32, nodename: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            sensor_id,
            nodename: nodename.into(),
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("version".to_string(), self.version.clone()),
            ("sensorId".to_string(), self.sensor_id.to_string()),
            ("nodename".to_string(), self.nodename.clone()),
        ])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Capture reported a non-empty status alongside a block.
    GotStatus,
    /// A block arrived with no non-zero sample.
    EmptyData,
    /// Watchdog gave up on the audio path.
    Stalled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GotStatus => "got_status",
            Self::EmptyData => "empty_data",
            Self::Stalled => "stalled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub status_text: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorReport {
    pub fn new(kind: ErrorKind, status_text: impl Into<String>) -> Self {
        Self {
            kind,
            status_text: status_text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BandValue {
    pub label: String,
    pub rms: f64,
}

/// Banded and overall RMS over one reporting interval.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectralReport {
    pub frames: u64,
    pub rms: f64,
    pub bands: Vec<BandValue>,
    pub timestamp: DateTime<Utc>,
}

impl SpectralReport {
    /// RMS values from accumulated power: `sqrt(sum / bins / frames)`.
    ///
    /// Returns `None` for an empty snapshot.
    pub fn compute(
        snapshot: &Snapshot,
        layout: &BandLayout,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        if snapshot.frames == 0 {
            return None;
        }
        let frames = snapshot.frames as f64;

        let retained = layout.retained_bins();
        let bin_count = retained.len() as f64;
        let rms = (snapshot.power_over(retained) / bin_count / frames).sqrt();

        let bands = layout
            .bands()
            .iter()
            .map(|band| BandValue {
                label: band.label(),
                rms: (snapshot.power_over(band.bins()) / band.bin_count() as f64 / frames).sqrt(),
            })
            .collect();

        Some(Self {
            frames: snapshot.frames,
            rms,
            bands,
            timestamp,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PendingRecord {
    Spectral(SpectralReport),
    Error(ErrorReport),
}

impl PendingRecord {
    /// Spectral reports go to `measurement`, errors to `<measurement>_error`
    /// with an extra `error` tag.
    pub fn to_point(&self, measurement: &str, tags: &Tags) -> DataPoint {
        let mut tag_map = tags.to_map();
        match self {
            Self::Spectral(report) => {
                let mut fields = Vec::with_capacity(report.bands.len() + 2);
                fields.push(("frames".to_string(), FieldValue::Integer(report.frames as i64)));
                fields.push(("rms".to_string(), FieldValue::Float(report.rms)));
                for band in &report.bands {
                    fields.push((band.label.clone(), FieldValue::Float(band.rms)));
                }
                DataPoint {
                    measurement: measurement.to_string(),
                    tags: tag_map,
                    fields,
                    timestamp: report.timestamp,
                }
            }
            Self::Error(report) => {
                tag_map.insert("error".to_string(), report.kind.as_str().to_string());
                DataPoint {
                    measurement: format!("{}_error", measurement),
                    tags: tag_map,
                    fields: vec![(
                        "status_text".to_string(),
                        FieldValue::Text(report.status_text.clone()),
                    )],
                    timestamp: report.timestamp,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::bands::DEFAULT_CUTS;
    use crate::audio::spectrum::{FFT_SIZE, SAMPLE_RATE};

    fn default_layout() -> BandLayout {
        BandLayout::new(DEFAULT_CUTS, SAMPLE_RATE, FFT_SIZE).unwrap()
    }

    #[test]
    fn band_rms_of_uniform_power_is_its_root() {
        let layout = default_layout();
        let mut sums = vec![0.0; FFT_SIZE / 2 + 1];
        for i in 5..21 {
            sums[i] = 4.0;
        }
        // Bins holding the 100 Hz and 500 Hz cuts are outside the band
        sums[4] = 1000.0;
        sums[21] = 1000.0;
        let snapshot = Snapshot { sums, frames: 1 };

        let report = SpectralReport::compute(&snapshot, &layout, Utc::now()).unwrap();
        let band = report.bands.iter().find(|b| b.label == "f100-500").unwrap();
        assert_eq!(band.rms, 2.0);
        assert_eq!(report.frames, 1);
    }

    #[test]
    fn rms_divides_by_frame_count() {
        let layout = default_layout();
        let snapshot = Snapshot {
            sums: vec![36.0; FFT_SIZE / 2 + 1],
            frames: 4,
        };
        let report = SpectralReport::compute(&snapshot, &layout, Utc::now()).unwrap();
        assert!((report.rms - 3.0).abs() < 1e-12);
        assert!(report.bands.iter().all(|b| (b.rms - 3.0).abs() < 1e-12));
    }

    #[test]
    fn empty_snapshot_has_no_report() {
        let snapshot = Snapshot {
            sums: vec![0.0; FFT_SIZE / 2 + 1],
            frames: 0,
        };
        assert!(SpectralReport::compute(&snapshot, &default_layout(), Utc::now()).is_none());
    }

    #[test]
    fn bands_above_nyquist_never_reach_report() {
        let layout = BandLayout::new(&[500, 23000, 24000, 30000, 96000], SAMPLE_RATE, FFT_SIZE)
            .unwrap();
        let snapshot = Snapshot {
            sums: vec![1.0; FFT_SIZE / 2 + 1],
            frames: 1,
        };
        let report = SpectralReport::compute(&snapshot, &layout, Utc::now()).unwrap();
        let point = PendingRecord::Spectral(report).to_point("fftmag", &Tags::new(0, "node"));

        let names: Vec<&str> = point.fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["frames", "rms", "f0-500", "f500-23000", "f23000-24000"]);
    }

    #[test]
    fn error_point_carries_discriminator_tag() {
        let tags = Tags::new(3, "attic");
        let record = PendingRecord::Error(ErrorReport::new(ErrorKind::EmptyData, "Empty data"));
        let point = record.to_point("fftmag", &tags);

        assert_eq!(point.measurement, "fftmag_error");
        assert_eq!(point.tags["error"], "empty_data");
        assert_eq!(point.tags["sensorId"], "3");
        assert_eq!(point.tags["nodename"], "attic");
        assert_eq!(point.tags["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(
            point.fields,
            vec![("status_text".to_string(), FieldValue::Text("Empty data".into()))]
        );
    }
}
