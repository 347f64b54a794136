// src/gui/mod.rs
pub mod palette;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use eframe::egui;

use crate::shared_state::SharedState;
use crate::spectrum::POINTS;

/// The overlay window - reads the latest heights batch each frame and paints
/// the mirrored bar field. All visual mutation happens here, on the UI thread;
/// the tick thread only ever publishes complete batches into shared state.
pub struct OverlayApp {
    /// Shared state between the tick thread and the GUI
    shared_state: Arc<Mutex<SharedState>>,

    /// Fixed per-bar colors, assigned once at startup
    bar_colors: Vec<egui::Color32>,

    /// Whether the window has been docked to the bottom of the screen yet
    docked: bool,

    /// Performance tracking
    last_frame_time: Instant,
    frame_times: Vec<f32>,
}

impl OverlayApp {
    pub fn new(shared_state: Arc<Mutex<SharedState>>) -> Self {
        Self {
            shared_state,
            bar_colors: palette::bar_colors(),
            docked: false,
            last_frame_time: Instant::now(),
            frame_times: Vec::with_capacity(60),
        }
    }

    /// Stretch across the primary monitor and pin to its bottom edge.
    /// Monitor size is only known once the window exists, so this runs on the
    /// first frame instead of at viewport-build time.
    fn dock_to_bottom(&mut self, ctx: &egui::Context) {
        if self.docked {
            return;
        }

        let Some(monitor) = ctx.input(|i| i.viewport().monitor_size) else {
            return;
        };

        let height = self
            .shared_state
            .lock()
            .map(|s| s.config.window_height_px)
            .unwrap_or(400.0);

        tracing::info!(
            "[GUI] Docking overlay: {}x{} at bottom of {}x{} screen",
            monitor.x,
            height,
            monitor.x,
            monitor.y
        );

        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(egui::vec2(
            monitor.x, height,
        )));
        ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(egui::pos2(
            0.0,
            monitor.y - height,
        )));
        self.docked = true;
    }
}

impl eframe::App for OverlayApp {
    // Called by eframe periodically and on exit
    fn save(&mut self, _storage: &mut dyn eframe::Storage) {
        if let Ok(state) = self.shared_state.lock() {
            state.config.save();
        }
    }

    /// Fully transparent clear so the desktop shows through between bars
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0, 0.0, 0.0, 0.0]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.dock_to_bottom(ctx);

        // === Performance stats (FPS) ===
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        // Rolling buffer of frame times
        self.frame_times.push(frame_time);
        if self.frame_times.len() > 60 {
            self.frame_times.remove(0);
        }
        let avg_frame_time =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;

        // Snapshot everything the painter needs in one short lock
        let (heights, bar_gap) = {
            let mut state = self.shared_state.lock().unwrap();
            state.performance.gui_fps = 1.0 / avg_frame_time.max(1e-6);
            (state.visualization.heights.clone(), state.config.bar_gap_px)
        };

        // The tick thread publishes continuously, so keep repainting
        ctx.request_repaint();

        let frame = egui::Frame::central_panel(&ctx.style())
            .fill(egui::Color32::TRANSPARENT)
            .inner_margin(0.0);

        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            let rect = ui.available_rect_before_wrap();
            draw_bars(ui.painter(), rect, &heights, &self.bar_colors, bar_gap);
        });
    }
}

/// Paint the bar field bottom-up. Heights arrive already smoothed and
/// clamped; the only clamp here guards against a window shorter than the
/// configured overlay height.
fn draw_bars(
    painter: &egui::Painter,
    rect: egui::Rect,
    heights: &[f32],
    colors: &[egui::Color32],
    bar_gap: f32,
) {
    let slot_width = rect.width() / POINTS as f32;
    let bar_width = (slot_width - bar_gap).max(1.0);

    for (i, &height) in heights.iter().enumerate().take(POINTS) {
        let height = height.min(rect.height());
        if height <= 0.0 {
            continue;
        }

        let x = rect.left() + i as f32 * slot_width;
        let bar_rect = egui::Rect::from_min_max(
            egui::pos2(x, rect.bottom() - height),
            egui::pos2(x + bar_width, rect.bottom()),
        );

        painter.rect_filled(bar_rect, 0.0, colors[i]);
    }
}
