/// Audio capture via cpal. The default output device's stream is opened and
/// every callback converts its samples to interleaved 16-bit little-endian
/// PCM bytes, which is all the downstream mapper ever sees.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::sample_buffer::SampleBuffer;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("failed to get stream config: {0}")]
    Configuration(String),
    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),
    #[error("stream creation failed: {0}")]
    StreamCreation(String),
}

/// Owns the capture stream and its thread. The callback only ever appends to
/// the shared sample buffer; it never blocks on anything slower than the
/// buffer mutex (one producer, one consumer).
pub struct CaptureManager {
    buffer: Arc<Mutex<SampleBuffer>>,
    shutdown: Arc<AtomicBool>,
    capture_thread: Option<thread::JoinHandle<()>>,
}

impl CaptureManager {
    pub fn new(buffer: Arc<Mutex<SampleBuffer>>) -> Self {
        Self {
            buffer,
            shutdown: Arc::new(AtomicBool::new(false)),
            capture_thread: None,
        }
    }

    /// Start capturing on the default output device.
    ///
    /// Device and config lookup happen on the caller's thread so failures
    /// surface immediately; the stream itself lives on a dedicated thread.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(CaptureError::NoDevice)?;

        // Capturing what is playing, so the *output* config is the one that
        // matters (WASAPI exposes loopback through it)
        let config = device
            .default_output_config()
            .map_err(|e| CaptureError::Configuration(e.to_string()))?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        tracing::info!(
            "[Capture] Starting: {} @ {} Hz, {} channels, {:?}",
            device_name,
            config.sample_rate().0,
            config.channels(),
            config.sample_format()
        );

        let buffer = Arc::clone(&self.buffer);
        let shutdown = Arc::clone(&self.shutdown);

        let handle = thread::spawn(move || {
            if let Err(e) = Self::capture_loop(&device, &config, buffer, &shutdown) {
                tracing::error!("[Capture] {}", e);
            }
        });

        self.capture_thread = Some(handle);
        Ok(())
    }

    fn capture_loop(
        device: &cpal::Device,
        config: &cpal::SupportedStreamConfig,
        buffer: Arc<Mutex<SampleBuffer>>,
        shutdown: &Arc<AtomicBool>,
    ) -> Result<(), CaptureError> {
        let stream_config = config.config();
        let err_fn = |err| tracing::error!("[Capture] Stream error: {}", err);

        // Each format gets its own callback because the slice types differ;
        // all of them end up pushing the same 16-bit LE byte stream
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let buffer = Arc::clone(&buffer);
                device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[f32], _| {
                            let bytes = f32_to_pcm_bytes(data);
                            if let Ok(mut buf) = buffer.lock() {
                                buf.push(&bytes);
                            }
                        },
                        err_fn,
                        None,
                    )
                    .map_err(|e| CaptureError::StreamCreation(e.to_string()))?
            }
            cpal::SampleFormat::I16 => {
                let buffer = Arc::clone(&buffer);
                device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[i16], _| {
                            let bytes = i16_to_pcm_bytes(data);
                            if let Ok(mut buf) = buffer.lock() {
                                buf.push(&bytes);
                            }
                        },
                        err_fn,
                        None,
                    )
                    .map_err(|e| CaptureError::StreamCreation(e.to_string()))?
            }
            cpal::SampleFormat::U16 => {
                let buffer = Arc::clone(&buffer);
                device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[u16], _| {
                            let bytes = u16_to_pcm_bytes(data);
                            if let Ok(mut buf) = buffer.lock() {
                                buf.push(&bytes);
                            }
                        },
                        err_fn,
                        None,
                    )
                    .map_err(|e| CaptureError::StreamCreation(e.to_string()))?
            }
            other => return Err(CaptureError::UnsupportedFormat(other)),
        };

        stream
            .play()
            .map_err(|e| CaptureError::StreamCreation(e.to_string()))?;

        tracing::info!("[Capture] Audio stream started");

        // The callback does all the work; this thread just keeps the stream
        // alive until teardown
        while !shutdown.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(100));
        }

        tracing::info!("[Capture] Shutting down");
        drop(stream);
        Ok(())
    }

    /// Stop capturing and join the stream thread
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CaptureManager {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============ Sample format conversions ============

/// f32 samples in [-1.0, 1.0] to 16-bit LE bytes
fn f32_to_pcm_bytes(data: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(data.len() * 2);
    for &s in data {
        let clamped = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        bytes.extend_from_slice(&clamped.to_le_bytes());
    }
    bytes
}

fn i16_to_pcm_bytes(data: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(data.len() * 2);
    for &s in data {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    bytes
}

/// u16 samples (midpoint 32768) to signed 16-bit LE bytes
fn u16_to_pcm_bytes(data: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(data.len() * 2);
    for &s in data {
        let signed = (s as i32 - 32768) as i16;
        bytes.extend_from_slice(&signed.to_le_bytes());
    }
    bytes
}

// ========== Tests ============
