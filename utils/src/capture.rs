//! Claims the microphone for the length of a session.
//!
//! The input stream is opened and played so that a missing, busy or refused
//! device is reported up front. Samples are not kept: nothing in this
//! workspace encodes audio, so no captured media reaches the peer.
//!
//! A cpal `Stream` is not `Send`, so the stream lives on its own OS thread for
//! its whole life. The returned [`Capture`] handle is `Send` and stops the
//! thread on [`Capture::stop`] or drop.

use std::sync::mpsc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};

use crate::{device, DeviceError};

/// The size of each audio chunk requested from the input stream.
pub const INPUT_CHUNK_SIZE: u32 = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureInfo {
    pub device_name: String,
    pub channels: u16,
    pub sample_rate: u32,
}

pub struct Capture {
    info: CaptureInfo,
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Capture {
    /// Opens the input device and starts streaming. Returns once the stream is
    /// playing, or with the reason it could not be opened.
    pub fn start(device_name: Option<String>) -> Result<Self, DeviceError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<CaptureInfo, DeviceError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref()) {
                    Ok((stream, info)) => {
                        let _ = ready_tx.send(Ok(info));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Blocks until stop() or the handle is dropped.
                let _ = stop_rx.recv();
                drop(stream);
                tracing::debug!("capture stream released");
            })
            .map_err(|e| DeviceError::Unsupported(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(info)) => Ok(Self {
                info,
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(DeviceError::Unsupported(
                    "capture thread exited before the stream opened".to_string(),
                ))
            }
        }
    }

    pub fn info(&self) -> &CaptureInfo {
        &self.info
    }

    /// Releases the device. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("capture thread panicked");
            }
        }
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_stream(
    device_name: Option<&str>,
) -> Result<(cpal::Stream, CaptureInfo), DeviceError> {
    let input = device::get_or_default_input(device_name)?;
    let name = input.name().unwrap_or_else(|_| "unknown".to_string());

    let default_config = input
        .default_input_config()
        .map_err(|e| DeviceError::Unsupported(e.to_string()))?;
    let config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE)),
    };
    tracing::debug!("input: device={:?}, config={:?}", &name, &config);

    let stream = input
        .build_input_stream(
            &config,
            // Samples are discarded.
            move |_: &[f32], _: &cpal::InputCallbackInfo| {},
            move |err| tracing::error!("an error occurred on input stream: {}", err),
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => DeviceError::NoDevice(e.to_string()),
            cpal::BuildStreamError::StreamConfigNotSupported
            | cpal::BuildStreamError::InvalidArgument => DeviceError::Unsupported(e.to_string()),
            _ => DeviceError::Denied(e.to_string()),
        })?;
    stream
        .play()
        .map_err(|e| DeviceError::Denied(e.to_string()))?;

    Ok((
        stream,
        CaptureInfo {
            device_name: name,
            channels: config.channels,
            sample_rate: config.sample_rate.0,
        },
    ))
}
