use clap::Parser;
use std::path::PathBuf;

/// Options left unset fall back to the config file, then to built-in defaults.
#[derive(Parser, Debug)]
#[command(
    name = "soundlevel",
    version,
    about = "Sends banded spectral sound level readings to InfluxDB"
)]
pub struct Cli {
    /// Show list of audio input devices and exit
    #[arg(short, long)]
    pub list_devices: bool,

    /// Input device (numeric index or name substring)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Samples per analysed block (default 48000, must be >= 2048)
    #[arg(short, long, value_name = "NSAMPLES")]
    pub blocksize: Option<usize>,

    /// InfluxDB hostname or URL (default 127.0.0.1)
    #[arg(long, value_name = "HOSTNAME")]
    pub server: Option<String>,

    /// InfluxDB HTTP port (default 8086)
    #[arg(long)]
    pub port: Option<u16>,

    /// InfluxDB database to use (default soundlevel_v<version>)
    #[arg(long)]
    pub database: Option<String>,

    /// Name of measurement (default fftmag)
    #[arg(long)]
    pub measurement_name: Option<String>,

    /// Hostname to use when submitting data (default: this host)
    #[arg(long)]
    pub nodename: Option<String>,

    /// Sensor id tag (default 0)
    #[arg(long)]
    pub sensor_id: Option<u32>,

    /// Reporting interval in seconds (default 30)
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Band cut frequencies in Hz, comma-separated and ascending
    #[arg(long, value_delimiter = ',', value_name = "HZ")]
    pub bands: Vec<u32>,

    /// Empty reporting cycles tolerated before exiting (default 3)
    #[arg(long)]
    pub stall_threshold: Option<u32>,

    /// Print line protocol to stdout instead of writing to InfluxDB
    #[arg(long)]
    pub stdout: bool,

    /// Config file (default: ./soundlevel.toml or ~/.config/soundlevel/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
