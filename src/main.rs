mod audio_capture;
mod gui;
mod sample_buffer;
mod shared_state;
mod spectrum;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

use crate::audio_capture::CaptureManager;
use crate::gui::OverlayApp;
use crate::sample_buffer::SampleBuffer;
use crate::shared_state::{OverlayConfig, SharedState};
use crate::spectrum::{SpectrumMapper, FRAME_BYTES};

/// Buffer capacity is twice the frame size: enough slack to ride out tick
/// jitter while keeping the displayed audio recent
const BUFFER_CAPACITY: usize = FRAME_BYTES * 2;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// ========================================================================
// TICK THREAD
// ========================================================================
//    Periodic frame read -> spectrum mapping -> heights into shared state.
//    The GUI thread applies published batches on its own schedule, so bar
//    state is never touched from here.

fn start_tick_thread(
    buffer: Arc<Mutex<SampleBuffer>>,
    shared_state: Arc<Mutex<SharedState>>,
    shutdown: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let (interval_ms, spectrum_config) = {
            let state = shared_state.lock().unwrap();
            (state.config.tick_interval_ms, state.config.spectrum())
        };

        tracing::info!("[Tick] Starting, interval {} ms", interval_ms);

        let mut mapper = SpectrumMapper::new(spectrum_config);
        let mut frame = vec![0u8; FRAME_BYTES];
        let ticker = crossbeam_channel::tick(Duration::from_millis(interval_ms));

        let mut tick_count = 0u64;
        let mut total_time = Duration::ZERO;
        let mut min_time = Duration::MAX;
        let mut max_time = Duration::ZERO;

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            match ticker.recv_timeout(Duration::from_millis(100)) {
                Ok(_) => {
                    tick_count += 1;

                    {
                        let mut buf = buffer.lock().unwrap();
                        buf.read_frame(&mut frame);
                    }

                    let start = Instant::now();
                    let heights = mapper.tick(&frame);
                    let elapsed = start.elapsed();

                    total_time += elapsed;
                    min_time = min_time.min(elapsed);
                    max_time = max_time.max(elapsed);

                    let mut state = shared_state.lock().unwrap();

                    // Pick up live tuning changes before publishing
                    let wanted = state.config.spectrum();
                    if &wanted != mapper.config() {
                        tracing::info!("[Tick] Applying updated spectrum tuning");
                        mapper.update_config(wanted);
                    }

                    state.visualization.heights = heights;
                    state.visualization.timestamp = Instant::now();

                    state.performance.tick_count = tick_count;
                    state.performance.tick_ave_time = total_time / tick_count as u32;
                    state.performance.tick_min_time = min_time;
                    state.performance.tick_max_time = max_time;
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::info!("[Tick] Shutdown after {} ticks", tick_count);
        if tick_count > 0 {
            tracing::info!(
                "[Tick] Timing: avg {:?}, min {:?}, max {:?}",
                total_time / tick_count as u32,
                min_time,
                max_time
            );
        }
    })
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = OverlayConfig::load();
    let window_height = config.window_height_px;
    let always_on_top = config.always_on_top;
    let overflow_policy = config.overflow_policy;

    let shared_state = Arc::new(Mutex::new(SharedState::new(config)));
    let buffer = Arc::new(Mutex::new(SampleBuffer::new(
        BUFFER_CAPACITY,
        overflow_policy,
    )));
    let shutdown = Arc::new(AtomicBool::new(false));

    // Capture pushes bytes in; a failure here just means a silent overlay,
    // not a dead process
    let mut capture = CaptureManager::new(Arc::clone(&buffer));
    if let Err(e) = capture.start() {
        tracing::error!("[Main] Audio capture unavailable, overlay stays silent: {}", e);
    }

    let tick_handle = start_tick_thread(
        Arc::clone(&buffer),
        Arc::clone(&shared_state),
        Arc::clone(&shutdown),
    );

    tracing::info!("[Main] Starting overlay window");

    // Width is a placeholder; the app stretches itself across the monitor
    // and docks to the bottom edge on its first frame
    let mut viewport_builder = egui::ViewportBuilder::default()
        .with_inner_size([1280.0, window_height])
        .with_title("Spectrum Overlay")
        .with_decorations(false)
        .with_transparent(true);

    if always_on_top {
        viewport_builder = viewport_builder.with_always_on_top();
    }

    let options = eframe::NativeOptions {
        viewport: viewport_builder,
        ..Default::default()
    };

    let app_state = Arc::clone(&shared_state);
    let run_result = eframe::run_native(
        "spectrum-overlay",
        options,
        Box::new(|_cc| Ok(Box::new(OverlayApp::new(app_state)))),
    );

    // Window is gone: persist settings and take the audio threads down
    // before any of the resources they touch
    if let Ok(state) = shared_state.lock() {
        state.config.save();
        tracing::info!("[Main] Session stats: {}", state.performance.summary());
    }

    tracing::info!("[Main] Shutting down audio threads");
    shutdown.store(true, Ordering::Relaxed);
    capture.stop();
    let _ = tick_handle.join();

    run_result.map_err(|e| anyhow::anyhow!("overlay window failed: {}", e))?;

    tracing::info!("[Main] Shutdown complete");
    Ok(())
}
