//! InfluxDB line protocol encoding.
//!
//! `measurement[,tag=value...] field=value[,field=value...] <unix nanos>`

use super::{DataPoint, FieldValue};

fn escape_measurement(s: &str) -> String {
    escape(s, &[',', ' '])
}

fn escape_key(s: &str) -> String {
    escape(s, &[',', ' ', '='])
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn encode_field(value: &FieldValue) -> String {
    match value {
        FieldValue::Float(v) => format!("{:?}", v),
        FieldValue::Integer(v) => format!("{}i", v),
        FieldValue::Text(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
    }
}

/// Encode one point. Non-finite floats have no line protocol form, so those
/// fields are dropped; a point left without fields encodes to `None`.
pub fn encode_point(point: &DataPoint) -> Option<String> {
    let fields: Vec<String> = point
        .fields
        .iter()
        .filter(|(key, value)| match value {
            FieldValue::Float(v) if !v.is_finite() => {
                log::warn!("Dropping non-finite field {}={} from {}", key, v, point.measurement);
                false
            }
            _ => true,
        })
        .map(|(key, value)| format!("{}={}", escape_key(key), encode_field(value)))
        .collect();
    if fields.is_empty() {
        log::warn!("Dropping {} point without encodable fields", point.measurement);
        return None;
    }

    let mut line = escape_measurement(&point.measurement);

    // Empty tag values are not allowed in line protocol
    for (key, value) in point.tags.iter().filter(|(_, v)| !v.is_empty()) {
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }

    line.push(' ');
    line.push_str(&fields.join(","));

    if let Some(nanos) = point.timestamp.timestamp_nanos_opt() {
        line.push(' ');
        line.push_str(&nanos.to_string());
    }
    Some(line)
}

/// Newline-terminated lines, one per point.
pub fn encode_batch(points: &[DataPoint]) -> String {
    let mut body = String::new();
    for line in points.iter().filter_map(encode_point) {
        body.push_str(&line);
        body.push('\n');
    }
    body
}
