use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::bands::{BandLayout, DEFAULT_CUTS};
use crate::audio::spectrum::{FFT_SIZE, SAMPLE_RATE};
use crate::cli::Cli;
use crate::error::ConfigError;
use crate::pipeline::watchdog::DEFAULT_STALL_THRESHOLD;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub influx: InfluxConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default = "default_blocksize")]
    pub blocksize: usize,
}

#[derive(Debug, Deserialize)]
pub struct InfluxConfig {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_measurement")]
    pub measurement: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SensorConfig {
    #[serde(default)]
    pub sensor_id: u32,
    #[serde(default)]
    pub nodename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_bands")]
    pub bands: Vec<u32>,
    #[serde(default = "default_stall_threshold")]
    pub stall_threshold: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            blocksize: default_blocksize(),
        }
    }
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            database: default_database(),
            measurement: default_measurement(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            bands: default_bands(),
            stall_threshold: default_stall_threshold(),
        }
    }
}

fn default_blocksize() -> usize { SAMPLE_RATE as usize }
fn default_server() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8086 }
fn default_database() -> String { format!("soundlevel_v{}", env!("CARGO_PKG_VERSION")) }
fn default_measurement() -> String { "fftmag".into() }
fn default_interval() -> u64 { 30 }
fn default_bands() -> Vec<u32> { DEFAULT_CUTS.to_vec() }
fn default_stall_threshold() -> u32 { DEFAULT_STALL_THRESHOLD }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Explicit path first, then `./soundlevel.toml`, then the user config dirs.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("soundlevel.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("soundlevel").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("soundlevel").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(unix)]
fn host_name() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".into())
}

#[cfg(not(unix))]
fn host_name() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "unknown".into())
}

/// Every constructor-time parameter of the sensor, after merging the
/// command line over the config file.
#[derive(Clone, Debug)]
pub struct SensorSettings {
    pub device: Option<String>,
    pub block_size: usize,
    pub interval: Duration,
    pub cuts: Vec<u32>,
    pub stall_threshold: u32,
    pub server: String,
    pub port: u16,
    pub database: String,
    pub measurement: String,
    pub sensor_id: u32,
    pub nodename: String,
    pub stdout: bool,
}

impl SensorSettings {
    pub fn resolve(cli: &Cli, config: Config) -> Self {
        Self {
            device: cli.device.clone().or(config.audio.device),
            block_size: cli.blocksize.unwrap_or(config.audio.blocksize),
            interval: Duration::from_secs(cli.interval.unwrap_or(config.report.interval_secs)),
            cuts: if cli.bands.is_empty() {
                config.report.bands
            } else {
                cli.bands.clone()
            },
            stall_threshold: cli.stall_threshold.unwrap_or(config.report.stall_threshold),
            server: cli.server.clone().unwrap_or(config.influx.server),
            port: cli.port.unwrap_or(config.influx.port),
            database: cli.database.clone().unwrap_or(config.influx.database),
            measurement: cli
                .measurement_name
                .clone()
                .unwrap_or(config.influx.measurement),
            sensor_id: cli.sensor_id.unwrap_or(config.sensor.sensor_id),
            nodename: cli
                .nodename
                .clone()
                .or(config.sensor.nodename)
                .unwrap_or_else(host_name),
            stdout: cli.stdout,
        }
    }

    /// Check every startup precondition and build the band layout.
    pub fn validate(&self) -> Result<BandLayout, ConfigError> {
        if self.block_size < FFT_SIZE {
            return Err(ConfigError::BlockTooSmall {
                block_size: self.block_size,
                fft_size: FFT_SIZE,
            });
        }
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.stall_threshold == 0 {
            return Err(ConfigError::ZeroStallThreshold);
        }
        BandLayout::new(&self.cuts, SAMPLE_RATE, FFT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn settings(args: &[&str], toml_src: &str) -> SensorSettings {
        let mut argv = vec!["soundlevel"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let config: Config = toml::from_str(toml_src).unwrap();
        SensorSettings::resolve(&cli, config)
    }

    #[test]
    fn empty_config_uses_defaults() {
        let s = settings(&[], "");
        assert_eq!(s.block_size, 48_000);
        assert_eq!(s.interval, Duration::from_secs(30));
        assert_eq!(s.cuts, DEFAULT_CUTS);
        assert_eq!(s.stall_threshold, 3);
        assert_eq!(s.server, "127.0.0.1");
        assert_eq!(s.port, 8086);
        assert_eq!(s.database, format!("soundlevel_v{}", env!("CARGO_PKG_VERSION")));
        assert_eq!(s.measurement, "fftmag");
        assert!(!s.nodename.is_empty());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn command_line_overrides_file() {
        let toml_src = r#"
            [influx]
            server = "influx.lan"
            measurement = "noise"

            [report]
            interval_secs = 60
            bands = [250, 2000]

            [sensor]
            sensor_id = 7
            nodename = "garage"
        "#;
        let s = settings(&["--interval", "10", "--nodename", "porch"], toml_src);
        assert_eq!(s.interval, Duration::from_secs(10));
        assert_eq!(s.nodename, "porch");
        assert_eq!(s.server, "influx.lan");
        assert_eq!(s.measurement, "noise");
        assert_eq!(s.sensor_id, 7);
        assert_eq!(s.cuts, vec![250, 2000]);
        assert_eq!(s.port, 8086);
    }

    #[test]
    fn validate_rejects_small_blocks() {
        let s = settings(&["--blocksize", "1024"], "");
        assert_eq!(
            s.validate().unwrap_err(),
            ConfigError::BlockTooSmall { block_size: 1024, fft_size: FFT_SIZE }
        );
    }

    #[test]
    fn validate_rejects_zero_interval_and_threshold() {
        assert_eq!(
            settings(&["--interval", "0"], "").validate().unwrap_err(),
            ConfigError::ZeroInterval
        );
        assert_eq!(
            settings(&["--stall-threshold", "0"], "").validate().unwrap_err(),
            ConfigError::ZeroStallThreshold
        );
    }

    #[test]
    fn validate_rejects_bad_bands() {
        assert!(matches!(
            settings(&["--bands", "500,100"], "").validate(),
            Err(ConfigError::UnorderedCuts { .. })
        ));
    }

    #[test]
    fn loads_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[audio]\ndevice = \"USB Mic\"\nblocksize = 96000").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.audio.device.as_deref(), Some("USB Mic"));
        assert_eq!(config.audio.blocksize, 96000);
        assert_eq!(config.report.stall_threshold, 3);
        assert_eq!(find_config(Some(file.path())).as_deref(), Some(file.path()));
    }

    #[test]
    fn malformed_config_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[report]\ninterval_secs = \"soon\"").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
