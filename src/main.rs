mod audio;
mod cli;
mod config;
mod error;
mod pipeline;
mod sink;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::{mpsc, Arc};

use audio::bands::BandLayout;
use audio::capture;
use audio::spectrum::{FFT_SIZE, SAMPLE_RATE};
use cli::Cli;
use config::{Config, SensorSettings};
use error::SensorError;
use pipeline::block::BlockProcessor;
use pipeline::cycle::AggregationCycle;
use pipeline::record::Tags;
use pipeline::shared::SharedSpectrum;
use sink::influx::InfluxSink;
use sink::{DataPoint, FieldValue, Sink, StdoutSink};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        let devices = capture::list_devices()?;
        println!("Available input devices:");
        for dev in &devices {
            let marker = if dev.is_default { "*" } else { " " };
            let channels = dev
                .channels
                .map_or_else(|| "?".to_string(), |c| c.to_string());
            println!("{} {:>3}  {}  ({} ch)", marker, dev.index, dev.name, channels);
        }
        return Ok(());
    }

    let config = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            // An explicitly requested file must load; an auto-detected one may not
            Err(err) if cli.config.is_some() => return Err(err),
            Err(err) => {
                log::warn!("{:#}, using defaults", err);
                Config::default()
            }
        },
        None => Config::default(),
    };

    let settings = SensorSettings::resolve(&cli, config);
    let layout = settings.validate().context("Invalid configuration")?;

    log::info!("soundlevel v{} - spectral sound level sensor", env!("CARGO_PKG_VERSION"));
    log::info!(
        "Sample rate {} Hz, FFT {} ({:.4} Hz/bin), block {} samples, interval {}s",
        SAMPLE_RATE,
        FFT_SIZE,
        layout.hz_per_bin(),
        settings.block_size,
        settings.interval.as_secs()
    );
    for band in layout.bands() {
        log::info!("Band {}: bins {}..{}", band.label(), band.first_bin, band.end_bin);
    }

    run_sensor(&settings, layout).context("Sensor stopped")?;

    log::info!("Stopped");
    Ok(())
}

/// Open the sink and the capture stream, then run aggregation cycles until
/// shutdown. A stall comes back as an error so the process exits non-zero and
/// the supervisor restarts it.
fn run_sensor(settings: &SensorSettings, layout: BandLayout) -> Result<(), SensorError> {
    let sink: Box<dyn Sink> = if settings.stdout {
        Box::new(StdoutSink)
    } else {
        let influx = InfluxSink::new(&settings.server, settings.port, &settings.database)?;
        log::info!("Connecting to InfluxDB at {}", influx.endpoint());
        influx.create_database()?;
        Box::new(influx)
    };

    let tags = Tags::new(settings.sensor_id, settings.nodename.clone());
    let startup = DataPoint {
        measurement: "startup".into(),
        tags: tags.to_map(),
        fields: vec![("i".into(), FieldValue::Integer(1))],
        timestamp: Utc::now(),
    };
    if let Err(err) = sink.write_points(&[startup]) {
        log::warn!("Failed to write startup marker: {}", err);
    }

    let shared = Arc::new(SharedSpectrum::new(FFT_SIZE));
    let mut processor = BlockProcessor::new(FFT_SIZE, Arc::clone(&shared));
    let _stream = capture::start_capture(
        settings.device.as_deref(),
        settings.block_size,
        move |block, status| {
            processor.process_block(block, status);
        },
    )?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })?;

    let mut cycle = AggregationCycle::new(
        shared,
        layout,
        settings.measurement.clone(),
        tags,
        settings.stall_threshold,
        sink,
    );
    cycle.run(settings.interval, &shutdown_rx)
}
