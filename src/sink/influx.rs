use reqwest::blocking::{Client, Response};
use std::time::Duration;

use super::{line_protocol, DataPoint, Sink};
use crate::error::SinkError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// InfluxDB 1.x HTTP API client.
pub struct InfluxSink {
    client: Client,
    base_url: String,
    database: String,
}

/// `host` may be a bare hostname or a full `http(s)://` URL.
fn base_url(host: &str, port: u16) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}:{}", host, port)
    }
}

fn check(response: Response) -> Result<(), SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().unwrap_or_default();
    Err(SinkError::Rejected {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

impl InfluxSink {
    pub fn new(host: &str, port: u16, database: &str) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url(host, port),
            database: database.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    /// `CREATE DATABASE` is a no-op when the database already exists.
    pub fn create_database(&self) -> Result<(), SinkError> {
        let query = format!("CREATE DATABASE \"{}\"", self.database.replace('"', "\\\""));
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .query(&[("q", query.as_str())])
            .send()?;
        check(response)?;
        log::info!("Using database '{}' at {}", self.database, self.base_url);
        Ok(())
    }
}

impl Sink for InfluxSink {
    fn write_points(&self, points: &[DataPoint]) -> Result<(), SinkError> {
        let body = line_protocol::encode_batch(points);
        if body.is_empty() {
            return Ok(());
        }
        let response = self
            .client
            .post(format!("{}/write", self.base_url))
            .query(&[("db", self.database.as_str()), ("precision", "ns")])
            .body(body)
            .send()?;
        check(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_scheme_and_port() {
        assert_eq!(base_url("127.0.0.1", 8086), "http://127.0.0.1:8086");
    }

    #[test]
    fn full_url_is_kept() {
        assert_eq!(base_url("https://influx.lan:9999/", 8086), "https://influx.lan:9999");
    }

    #[test]
    fn empty_batch_skips_request() {
        // Port 9 (discard) would fail if a request were made
        let sink = InfluxSink::new("127.0.0.1", 9, "soundlevel").unwrap();
        assert!(sink.write_points(&[]).is_ok());
        assert_eq!(sink.endpoint(), "http://127.0.0.1:9");
    }

    #[test]
    fn batch_of_unencodable_points_skips_request() {
        use crate::sink::FieldValue;
        use chrono::Utc;
        use std::collections::BTreeMap;

        let sink = InfluxSink::new("127.0.0.1", 9, "soundlevel").unwrap();
        let point = DataPoint {
            measurement: "fftmag".into(),
            tags: BTreeMap::new(),
            fields: vec![("rms".into(), FieldValue::Float(f64::NAN))],
            timestamp: Utc::now(),
        };
        assert!(sink.write_points(&[point]).is_ok());
    }
}
