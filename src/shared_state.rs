use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::sample_buffer::OverflowPolicy;
use crate::spectrum::{HeightScale, SpectrumConfig, POINTS};

/// Main shared state container - wrapped in Arc<Mutex<>> for thread safety
///
/// This struct is shared between:
/// - tick thread (writes visualization data, reads config)
/// - GUI thread (reads visualization data, writes config)
pub struct SharedState {
    /// Latest heights batch published by the tick thread
    pub visualization: VisualizationData,

    /// Performance metrics (tick timing, GUI fps)
    pub performance: PerformanceStats,

    /// Application configuration (user settings)
    pub config: OverlayConfig,
}

impl SharedState {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            visualization: VisualizationData::new(),
            performance: PerformanceStats::default(),
            config,
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}

/// Current visualization data (updated by the tick thread)
#[derive(Clone)]
pub struct VisualizationData {
    /// Bar heights in pixels, POINTS entries, mirrored
    pub heights: Vec<f32>,

    /// When this batch was published
    pub timestamp: Instant,
}

impl VisualizationData {
    pub fn new() -> Self {
        Self {
            heights: vec![0.0; POINTS],
            timestamp: Instant::now(),
        }
    }
}

impl Default for VisualizationData {
    fn default() -> Self {
        Self::new()
    }
}

/// Performance statistics (updated by both threads)
#[derive(Clone, Default)]
pub struct PerformanceStats {
    /// Total ticks processed
    pub tick_count: u64,

    /// Average tick processing time
    pub tick_ave_time: Duration,

    /// Min tick processing time
    pub tick_min_time: Duration,

    /// Max tick processing time
    pub tick_max_time: Duration,

    /// Current GUI frame rate (updated by GUI)
    pub gui_fps: f32,
}

impl PerformanceStats {
    /// One-line digest for the shutdown log
    pub fn summary(&self) -> String {
        format!(
            "{} ticks, avg {:?}, min {:?}, max {:?}, gui {:.1} fps",
            self.tick_count,
            self.tick_ave_time,
            self.tick_min_time,
            self.tick_max_time,
            self.gui_fps
        )
    }
}

/// Application configuration (user settings)
///
/// GUI owns window-shaped values, tick thread reads the spectrum tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    // === Window settings ===
    /// Overlay height in pixels (docked to the bottom of the screen)
    pub window_height_px: f32,

    /// Keep the overlay above all other windows
    pub always_on_top: bool,

    // === Visual settings ===
    /// Gap between bars in pixels
    pub bar_gap_px: f32,

    // === Spectrum tuning ===
    /// Timer interval driving the tick thread, in milliseconds
    pub tick_interval_ms: u64,

    /// Maximum bar height change per tick, in pixels (5 and 10 are the
    /// observed tunings)
    pub step_px: f32,

    /// Minimum bar height in pixels (0 or 2 in the observed tunings)
    pub floor_px: f32,

    /// Gain applied by the height scale
    pub gain: f32,

    /// Linear or logarithmic magnitude-to-height mapping
    pub height_scale: HeightScale,

    /// Consecutive silent ticks before the fade-out starts
    pub silence_threshold: u32,

    // === Buffering ===
    /// Backpressure policy when the capture callback outruns the tick
    pub overflow_policy: OverflowPolicy,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            window_height_px: 400.0,
            always_on_top: true,
            bar_gap_px: 2.0,
            tick_interval_ms: 5,
            step_px: 10.0,
            floor_px: 0.0,
            gain: 10.0,
            height_scale: HeightScale::Linear,
            silence_threshold: 10,
            overflow_policy: OverflowPolicy::DiscardOldest,
        }
    }
}

impl OverlayConfig {
    /// The subset the spectrum mapper cares about
    pub fn spectrum(&self) -> SpectrumConfig {
        SpectrumConfig {
            window_height: self.window_height_px,
            step_px: self.step_px,
            floor_px: self.floor_px,
            gain: self.gain,
            height_scale: self.height_scale,
            silence_threshold: self.silence_threshold,
        }
    }

    fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "spectrum-overlay")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load saved settings, falling back to defaults on any failure
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("[Config] Loaded {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("[Config] Ignoring malformed {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist settings to the platform config directory
    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };

        let result = path
            .parent()
            .map(fs::create_dir_all)
            .transpose()
            .and_then(|_| {
                let json = serde_json::to_string_pretty(self)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
                fs::write(&path, json)
            });

        match result {
            Ok(_) => tracing::info!("[Config] Saved {}", path.display()),
            Err(e) => tracing::error!("[Config] Failed to save {}: {}", path.display(), e),
        }
    }
}

// === Tests ====
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_sane() {
        let config = OverlayConfig::default();

        assert!(config.window_height_px > 0.0);
        assert!(config.step_px > 0.0);
        assert!(config.floor_px >= 0.0);
        assert!(config.floor_px < config.window_height_px);
        assert!(config.tick_interval_ms > 0);
        assert_eq!(config.overflow_policy, OverflowPolicy::DiscardOldest);
    }

    #[test]
    fn test_config_json_round_trip() {
        let mut config = OverlayConfig::default();
        config.step_px = 5.0;
        config.floor_px = 2.0;
        config.height_scale = HeightScale::Log;
        config.overflow_policy = OverflowPolicy::RejectNewest;

        let json = serde_json::to_string(&config).unwrap();
        let back: OverlayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        // Older config files may miss newer fields
        let back: OverlayConfig = serde_json::from_str(r#"{"step_px": 5.0}"#).unwrap();
        assert_eq!(back.step_px, 5.0);
        assert_eq!(back.window_height_px, 400.0);
        assert_eq!(back.height_scale, HeightScale::Linear);
    }

    #[test]
    fn test_spectrum_config_projection() {
        let mut config = OverlayConfig::default();
        config.window_height_px = 300.0;
        config.step_px = 5.0;

        let spectrum = config.spectrum();
        assert_eq!(spectrum.window_height, 300.0);
        assert_eq!(spectrum.step_px, 5.0);
        assert_eq!(spectrum.silence_threshold, config.silence_threshold);
    }

    #[test]
    fn test_performance_summary_reports_gui_fps() {
        let mut stats = PerformanceStats::default();
        stats.tick_count = 42;
        stats.gui_fps = 59.64;

        let summary = stats.summary();
        assert!(summary.contains("42 ticks"), "summary was: {}", summary);
        assert!(summary.contains("59.6 fps"), "summary was: {}", summary);
    }

    #[test]
    fn test_visualization_data_sized_to_points() {
        let data = VisualizationData::new();
        assert_eq!(data.heights.len(), POINTS);
        assert!(data.heights.iter().all(|&h| h == 0.0));
    }
}
