use thiserror::Error;

/// Startup precondition violations. All of these are fatal and never retried.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("block size {block_size} is smaller than one FFT window ({fft_size} samples)")]
    BlockTooSmall { block_size: usize, fft_size: usize },
    #[error("reporting interval must be greater than zero")]
    ZeroInterval,
    #[error("stall threshold must be at least 1")]
    ZeroStallThreshold,
    #[error("band cut list is empty")]
    NoCuts,
    #[error("band cuts must be positive and strictly ascending (got {prev} Hz then {next} Hz)")]
    UnorderedCuts { prev: u32, next: u32 },
    #[error("band {low_hz}-{high_hz} Hz covers no FFT bins")]
    EmptyBand { low_hz: u32, high_hz: u32 },
    #[error("no configured band lies below the Nyquist frequency ({nyquist_hz} Hz)")]
    NothingBelowNyquist { nyquist_hz: u32 },
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no default input device available")]
    NoDefaultDevice,
    #[error("input device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),
    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of the daemon as seen by `main`.
#[derive(Error, Debug)]
pub enum SensorError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("no audio frames received for {cycles} consecutive reporting cycles")]
    Stalled { cycles: u32 },
}
