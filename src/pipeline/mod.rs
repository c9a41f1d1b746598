//! Real-time accumulation pipeline.
//!
//! The capture callback feeds [`block::BlockProcessor`], which folds power
//! spectra into [`shared::SharedSpectrum`]. The timing loop runs
//! [`cycle::AggregationCycle`] once per interval to drain, reset and report.

pub mod accumulator;
pub mod block;
pub mod cycle;
pub mod record;
pub mod shared;
pub mod watchdog;
