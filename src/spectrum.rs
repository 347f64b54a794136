/// Spectrum mapper: one fixed-size frame of 16-bit PCM in, 256 mirrored bar
/// heights out. All mutable state (heights, silence counter) lives in the
/// mapper struct so ticks are deterministic and testable without a device.

use std::cmp::Ordering;
use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

/// Bytes per frame. 2 bytes per sample, so 4096 samples per tick.
pub const FRAME_BYTES: usize = 8192;

/// Samples per frame (16-bit, little-endian)
pub const FRAME_SAMPLES: usize = FRAME_BYTES / 2;

/// Number of visual bars. Heights are assigned in mirrored pairs, so only
/// POINTS / 2 magnitude ranks are mapped each tick.
pub const POINTS: usize = 256;

/// How a magnitude becomes a target height in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeightScale {
    /// magnitude * gain
    Linear,
    /// ln(1 + magnitude) * gain, compresses loud peaks
    Log,
}

/// Tuning knobs for the mapper. The step/floor/scale values observed in the
/// wild disagree (5 vs 10 px, floor 0 vs 2, linear vs log), so all three are
/// configuration rather than behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumConfig {
    /// Maximum bar height in pixels (the overlay height)
    pub window_height: f32,
    /// Maximum height change per tick, in pixels
    pub step_px: f32,
    /// Minimum bar height in pixels
    pub floor_px: f32,
    /// Height gain applied by the scale function
    pub gain: f32,
    pub height_scale: HeightScale,
    /// Consecutive silent ticks before bars start decaying
    pub silence_threshold: u32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            window_height: 400.0,
            step_px: 10.0,
            floor_px: 0.0,
            gain: 10.0,
            height_scale: HeightScale::Linear,
            silence_threshold: 10,
        }
    }
}

/// Main mapper - decodes a frame, runs the FFT, and animates bar heights
pub struct SpectrumMapper {
    config: SpectrumConfig,

    // FFT state (reusable, no per-frame allocation)
    fft: Arc<dyn RealToComplex<f32>>,
    input_buffer: Vec<f32>,
    spectrum: Vec<num_complex::Complex<f32>>,
    scratch: Vec<num_complex::Complex<f32>>,

    /// Magnitudes of the non-mirrored half, sorted descending each live tick
    magnitudes: Vec<f32>,

    /// Per-bar heights in pixels, persists between ticks
    heights: Vec<f32>,

    /// Consecutive ticks whose gate byte was zero
    silent_ticks: u32,
}

impl SpectrumMapper {
    pub fn new(config: SpectrumConfig) -> Self {
        let config = Self::sanitized(config);

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FRAME_SAMPLES);

        // Allocate all buffers upfront
        let input_buffer = vec![0.0; FRAME_SAMPLES];
        let spectrum = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();

        let floor = config.floor_px;

        Self {
            fft,
            input_buffer,
            spectrum,
            scratch,
            magnitudes: vec![0.0; FRAME_SAMPLES / 2],
            heights: vec![floor; POINTS],
            silent_ticks: 0,
            config,
        }
    }

    /// Process one frame and return the full heights batch for the renderer.
    ///
    /// The returned vector always has POINTS entries; entry i equals entry
    /// POINTS - 1 - i, and every entry is within [floor_px, window_height].
    pub fn tick(&mut self, frame: &[u8]) -> Vec<f32> {
        debug_assert_eq!(frame.len(), FRAME_BYTES);

        // Silence gate: the low byte of the last sample is our probe. Zero
        // means the buffer ran dry (read_frame zero-fills) or the mix is
        // actually silent; either way skip the FFT and, once the signal has
        // been quiet long enough, fade the bars out.
        if frame[FRAME_BYTES - 2] == 0 {
            self.silent_ticks = self.silent_ticks.saturating_add(1);
            if self.silent_ticks > self.config.silence_threshold {
                self.decay_all();
            }
            return self.heights.clone();
        }
        self.silent_ticks = 0;

        let targets = self.compute_targets(frame);

        for (rank, &target) in targets.iter().enumerate() {
            let next = self.approach(self.heights[rank], target);
            self.heights[rank] = next;
            // Left/right bars at mirrored indices share the same height
            self.heights[POINTS - 1 - rank] = next;
        }

        self.heights.clone()
    }

    /// Target heights for the POINTS / 2 magnitude ranks, before smoothing.
    ///
    /// Separated from `tick` so the signal-to-target mapping can be exercised
    /// without the animation state.
    pub fn compute_targets(&mut self, frame: &[u8]) -> Vec<f32> {
        self.decode_frame(frame);
        self.forward_fft();

        // Rank by magnitude: the bars visualize loudness order, not a
        // frequency axis
        self.magnitudes
            .sort_unstable_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        (0..POINTS / 2)
            .map(|rank| self.target_height(self.magnitudes[rank]))
            .collect()
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// Swap in new tuning. Heights are re-clamped so a shrunken window never
    /// leaves a bar sticking out past the new bounds.
    pub fn update_config(&mut self, config: SpectrumConfig) {
        self.config = Self::sanitized(config);
        for h in &mut self.heights {
            *h = h.clamp(self.config.floor_px, self.config.window_height);
        }
    }

    // ============ Private implementation ============

    /// Repair tuning from the user-editable config file so the clamp bounds
    /// stay ordered: a floor above the window (or a non-finite value) must
    /// degrade to something drawable, never panic the tick thread
    fn sanitized(mut config: SpectrumConfig) -> SpectrumConfig {
        if !config.window_height.is_finite() || config.window_height < 0.0 {
            config.window_height = 0.0;
        }
        if !config.floor_px.is_finite() {
            config.floor_px = 0.0;
        }
        config.floor_px = config.floor_px.clamp(0.0, config.window_height);

        if !config.step_px.is_finite() || config.step_px < 0.0 {
            config.step_px = 0.0;
        }
        config
    }

    /// Decode 16-bit little-endian samples and normalize to the two-sided
    /// percentage range (+/- 100, nominal width 200)
    fn decode_frame(&mut self, frame: &[u8]) {
        for (i, pair) in frame.chunks_exact(2).enumerate() {
            let raw = i16::from_le_bytes([pair[0], pair[1]]);
            self.input_buffer[i] = raw as f32 / 65536.0 * 200.0;
        }
    }

    /// Forward FFT; fills `magnitudes` with the first (non-conjugate) half,
    /// normalized by the transform length
    fn forward_fft(&mut self) {
        self.fft
            .process_with_scratch(&mut self.input_buffer, &mut self.spectrum, &mut self.scratch)
            .expect("FFT processing failed");

        for (i, slot) in self.magnitudes.iter_mut().enumerate() {
            *slot = self.spectrum[i].norm() / FRAME_SAMPLES as f32;
        }
    }

    /// Monotonic magnitude -> pixels mapping
    fn target_height(&self, magnitude: f32) -> f32 {
        let px = match self.config.height_scale {
            HeightScale::Linear => magnitude * self.config.gain,
            HeightScale::Log => (1.0 + magnitude).ln() * self.config.gain,
        };
        px.clamp(0.0, self.config.window_height)
    }

    /// Move `current` toward `target`, at most one step per tick
    fn approach(&self, current: f32, target: f32) -> f32 {
        let step = self.config.step_px;
        let next = if target > current {
            (current + step).min(target)
        } else {
            (current - step).max(target)
        };
        next.clamp(self.config.floor_px, self.config.window_height)
    }

    /// Fade every bar one step toward the floor
    fn decay_all(&mut self) {
        for h in &mut self.heights {
            *h = (*h - self.config.step_px).max(self.config.floor_px);
        }
    }
}
