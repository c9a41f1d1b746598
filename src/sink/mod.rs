pub mod influx;
pub mod line_protocol;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::Write;

use crate::error::SinkError;

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Text(String),
}

/// One time-series point: measurement, sorted tags, ordered fields.
#[derive(Clone, Debug, PartialEq)]
pub struct DataPoint {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: Vec<(String, FieldValue)>,
    pub timestamp: DateTime<Utc>,
}

/// Destination for batches of points.
///
/// Delivery is best effort. Callers log a failed write and move on.
pub trait Sink {
    fn write_points(&self, points: &[DataPoint]) -> Result<(), SinkError>;
}

/// Writes line protocol to stdout instead of a database.
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write_points(&self, points: &[DataPoint]) -> Result<(), SinkError> {
        let mut out = std::io::stdout().lock();
        out.write_all(line_protocol::encode_batch(points).as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write_points(&self, points: &[DataPoint]) -> Result<(), SinkError> {
        (**self).write_points(points)
    }
}
