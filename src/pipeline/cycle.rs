use chrono::Utc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use super::accumulator::Snapshot;
use super::record::{ErrorKind, ErrorReport, PendingRecord, SpectralReport, Tags};
use super::shared::SharedSpectrum;
use super::watchdog::{StallWatchdog, Verdict};
use crate::audio::bands::BandLayout;
use crate::error::SensorError;
use crate::sink::Sink;

#[derive(Debug, PartialEq)]
pub enum CycleOutcome {
    Reported(SpectralReport),
    Idle { cycles: u32 },
    Stalled { cycles: u32 },
}

/// Timing-loop half of the pipeline: drains, resets, checks for stalls and
/// reports, once per interval.
pub struct AggregationCycle<S> {
    shared: Arc<SharedSpectrum>,
    layout: BandLayout,
    measurement: String,
    tags: Tags,
    watchdog: StallWatchdog,
    sink: S,
}

impl<S: Sink> AggregationCycle<S> {
    pub fn new(
        shared: Arc<SharedSpectrum>,
        layout: BandLayout,
        measurement: impl Into<String>,
        tags: Tags,
        stall_threshold: u32,
        sink: S,
    ) -> Self {
        Self {
            shared,
            layout,
            measurement: measurement.into(),
            tags,
            watchdog: StallWatchdog::new(stall_threshold),
            sink,
        }
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Fire-and-forget: a failed write is logged and dropped.
    fn submit(&self, records: &[PendingRecord]) {
        if records.is_empty() {
            return;
        }
        let points: Vec<_> = records
            .iter()
            .map(|r| r.to_point(&self.measurement, &self.tags))
            .collect();
        if let Err(err) = self.sink.write_points(&points) {
            log::warn!("Failed to submit {} point(s): {}", points.len(), err);
        }
    }

    fn flush_errors(&self) -> usize {
        let records: Vec<PendingRecord> = self
            .shared
            .drain()
            .into_iter()
            .map(PendingRecord::Error)
            .collect();
        self.submit(&records);
        records.len()
    }

    fn report(&self, snapshot: &Snapshot) -> Option<SpectralReport> {
        let report = SpectralReport::compute(snapshot, &self.layout, Utc::now())?;
        self.submit(&[PendingRecord::Spectral(report.clone())]);
        Some(report)
    }

    /// One full aggregation cycle. Queued errors always go out before the
    /// spectral point they may explain.
    pub fn run_once(&mut self) -> CycleOutcome {
        if self.watchdog.is_stalled() {
            return CycleOutcome::Stalled {
                cycles: self.watchdog.idle_cycles(),
            };
        }

        let errors = self.flush_errors();
        if errors > 0 {
            log::warn!("Submitted {} queued error record(s)", errors);
        }

        let snapshot = self.shared.snapshot_and_reset();
        match self.watchdog.observe(snapshot.frames) {
            Some(Verdict::Active) => {}
            Some(Verdict::Idle { cycles }) => return CycleOutcome::Idle { cycles },
            Some(Verdict::Stalled { cycles }) => {
                let text = format!("No audio frames for {} consecutive reporting cycles", cycles);
                log::error!("{}", text);
                self.submit(&[PendingRecord::Error(ErrorReport::new(ErrorKind::Stalled, text))]);
                return CycleOutcome::Stalled { cycles };
            }
            None => {
                return CycleOutcome::Stalled {
                    cycles: self.watchdog.idle_cycles(),
                }
            }
        }

        match self.report(&snapshot) {
            Some(report) => CycleOutcome::Reported(report),
            None => CycleOutcome::Idle { cycles: 0 },
        }
    }

    /// Best-effort flush on shutdown: queued errors plus whatever frames have
    /// accumulated, without charging the watchdog.
    pub fn flush_final(&mut self) {
        let errors = self.flush_errors();
        let snapshot = self.shared.snapshot_and_reset();
        let frames = self.report(&snapshot).map_or(0, |r| r.frames);
        log::info!("Final flush: {} error record(s), {} frames", errors, frames);
    }

    /// Sleep one interval at a time and run a cycle after each, until a
    /// shutdown message arrives or the watchdog gives up.
    pub fn run(&mut self, interval: Duration, shutdown: &Receiver<()>) -> Result<(), SensorError> {
        loop {
            match shutdown.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => match self.run_once() {
                    CycleOutcome::Reported(report) => log::info!(
                        "Reported {} frames, rms={:.4}, {} band(s)",
                        report.frames,
                        report.rms,
                        report.bands.len()
                    ),
                    CycleOutcome::Idle { cycles } => {
                        log::warn!("No frames accumulated this cycle ({} in a row)", cycles)
                    }
                    CycleOutcome::Stalled { cycles } => {
                        return Err(SensorError::Stalled { cycles })
                    }
                },
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    log::info!("Shutdown requested");
                    self.flush_final();
                    return Ok(());
                }
            }
        }
    }
}
