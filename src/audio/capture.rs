//! Audio capture via cpal.
//!
//! Opens the selected input device at the fixed sample rate, keeps channel 0
//! of the interleaved input and re-chunks device buffers into blocks of the
//! configured size before handing them to the block callback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleRate, Stream, StreamConfig};
use std::sync::{Arc, Mutex, PoisonError};

use super::spectrum::SAMPLE_RATE;
use crate::error::CaptureError;

#[derive(Debug)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
    pub channels: Option<u16>,
}

pub fn list_devices() -> Result<Vec<DeviceInfo>, CaptureError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut infos = Vec::new();
    for (index, device) in host.input_devices()?.enumerate() {
        let name = device.name().unwrap_or_else(|_| "unknown".into());
        let channels = device.default_input_config().ok().map(|c| c.channels());
        infos.push(DeviceInfo {
            index,
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            channels,
        });
    }
    Ok(infos)
}

/// Resolve a device by numeric index or case-insensitive name substring,
/// falling back to the host default when no selector is given.
fn select_device(selector: Option<&str>) -> Result<Device, CaptureError> {
    let host = cpal::default_host();
    let Some(selector) = selector else {
        return host.default_input_device().ok_or(CaptureError::NoDefaultDevice);
    };

    if let Ok(index) = selector.parse::<usize>() {
        return host
            .input_devices()?
            .nth(index)
            .ok_or_else(|| CaptureError::DeviceNotFound(selector.to_string()));
    }

    let needle = selector.to_lowercase();
    host.input_devices()?
        .find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
        .ok_or_else(|| CaptureError::DeviceNotFound(selector.to_string()))
}

/// Collects channel 0 of interleaved device buffers into fixed-size blocks.
pub struct BlockAssembler {
    block_size: usize,
    channels: usize,
    pending: Vec<f32>,
}

impl BlockAssembler {
    pub fn new(block_size: usize, channels: usize) -> Self {
        Self {
            block_size,
            channels: channels.max(1),
            pending: Vec::with_capacity(block_size),
        }
    }

    /// Append one device buffer and call `emit` once per completed block.
    pub fn push(&mut self, interleaved: &[f32], mut emit: impl FnMut(&[f32])) {
        for frame in interleaved.chunks_exact(self.channels) {
            self.pending.push(frame[0]);
            if self.pending.len() == self.block_size {
                emit(&self.pending);
                self.pending.clear();
            }
        }
    }
}

/// Start capturing. The returned `Stream` must be kept alive.
///
/// `on_block` runs on the audio thread with each complete block and the
/// status text of any stream error reported since the previous block.
pub fn start_capture<F>(
    selector: Option<&str>,
    block_size: usize,
    mut on_block: F,
) -> Result<Stream, CaptureError>
where
    F: FnMut(&[f32], Option<&str>) + Send + 'static,
{
    let device = select_device(selector)?;
    let name = device.name().unwrap_or_else(|_| "unknown".into());

    let channels = match device.default_input_config() {
        Ok(cfg) => cfg.channels(),
        Err(err) => {
            log::warn!("No default input config for {} ({}), requesting mono", name, err);
            1
        }
    };
    let config = StreamConfig {
        channels,
        sample_rate: SampleRate(SAMPLE_RATE),
        buffer_size: BufferSize::Default,
    };
    log::info!(
        "Capturing from '{}' at {} Hz, {} channel(s), {} samples per block",
        name,
        SAMPLE_RATE,
        channels,
        block_size
    );

    let status: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let status_writer = Arc::clone(&status);
    let mut assembler = BlockAssembler::new(block_size, channels as usize);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            assembler.push(data, |block| {
                let pending = status
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                on_block(block, pending.as_deref());
            });
        },
        move |err| {
            log::error!("Audio input stream error: {}", err);
            *status_writer.lock().unwrap_or_else(PoisonError::into_inner) = Some(err.to_string());
        },
        None,
    )?;

    stream.play()?;
    Ok(stream)
}
