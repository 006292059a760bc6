#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for the stabilisation minigames.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment.
//! To keep `cargo test` usable everywhere we depend on macroquad without its
//! default `audio` feature.

mod overlays;
mod raster;

use anyhow::{Context, Result};
use macroquad::input::{
    is_key_pressed, is_mouse_button_pressed, is_mouse_button_released, mouse_position, KeyCode,
    MouseButton,
};
use stabilize_core::{Point, SurfaceSize};
use stabilize_rendering::{
    Color, FrameControl, FrameInput, OverlaySet, Presentation, RenderingBackend, Scene,
};
use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::mpsc,
    time::{Duration, Instant},
};

pub use overlays::OverlayAtlas;

/// Longest frame delta handed to the simulation.
///
/// A stalled window (dragged, minimised, paused in a debugger) would
/// otherwise deliver one huge step when it resumes.
pub const DEFAULT_MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

const WINDOW_WIDTH: i32 = 1280;
const WINDOW_HEIGHT: i32 = 720;

/// Converts raw frame times reported by the window into simulation deltas.
#[doc(hidden)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameClock {
    max_delta: Duration,
}

impl FrameClock {
    /// Creates a clock that caps deltas at `max_delta`.
    #[must_use]
    pub const fn new(max_delta: Duration) -> Self {
        Self { max_delta }
    }

    /// Delta to simulate for a frame that took `seconds` of wall time.
    ///
    /// Negative or non-finite readings count as an empty frame.
    #[must_use]
    pub fn delta(&self, seconds: f32) -> Duration {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f32(seconds)
            .map_or(self.max_delta, |delta| delta.min(self.max_delta))
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_DELTA)
    }
}

/// Snapshot of edge-triggered keyboard shortcuts observed during a single frame.
#[derive(Clone, Copy, Debug, Default)]
struct KeyboardShortcuts {
    /// `Q` or `Escape` to quit the game loop.
    quit_requested: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        Self {
            quit_requested: is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q),
        }
    }
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
    manifest_path: Option<PathBuf>,
    frame_clock: FrameClock,
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self {
            swap_interval: None,
            show_fps: false,
            manifest_path: None,
            frame_clock: FrameClock::default(),
        }
    }
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend logs frame timing metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }

    /// Loads overlay images from the manifest at `path` when the window opens.
    ///
    /// `None` disables overlays entirely.
    #[must_use]
    pub fn with_overlay_manifest(mut self, path: Option<PathBuf>) -> Self {
        self.manifest_path = path;
        self
    }
}

/// Tracks the average frames-per-second produced by the render loop.
#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    frame_times: VecDeque<Duration>,
    window_duration: Duration,
    render_accum: Duration,
}

#[derive(Clone, Copy, Debug)]
struct FpsMetrics {
    per_second: f32,
    trailing_ten_seconds: f32,
    avg_render: Duration,
}

impl FpsCounter {
    /// Records a rendered frame and returns the per-second and trailing ten-second averages once
    /// one second has elapsed.
    fn record_frame(&mut self, frame: Duration, render: Duration) -> Option<FpsMetrics> {
        self.elapsed += frame;
        self.frames = self.frames.saturating_add(1);
        self.render_accum += render;

        self.frame_times.push_back(frame);
        self.window_duration += frame;

        let trailing_window = Duration::from_secs(10);
        while self.window_duration > trailing_window {
            if let Some(removed) = self.frame_times.pop_front() {
                self.window_duration = self.window_duration.saturating_sub(removed);
            } else {
                break;
            }
        }

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let seconds = self.elapsed.as_secs_f32();
        let per_second = self.frames as f32 / seconds;
        let window_seconds = self.window_duration.as_secs_f32();
        let trailing_ten_seconds = if window_seconds <= f32::EPSILON {
            per_second
        } else {
            self.frame_times.len() as f32 / window_seconds
        };
        let avg_render = self.render_accum / self.frames.max(1);

        self.elapsed = Duration::ZERO;
        self.frames = 0;
        self.render_accum = Duration::ZERO;
        Some(FpsMetrics {
            per_second,
            trailing_ten_seconds,
            avg_render,
        })
    }
}

fn load_overlays(manifest_path: Option<PathBuf>) -> Result<Option<OverlayAtlas>> {
    let Some(path) = manifest_path else {
        return Ok(None);
    };
    if !path.exists() {
        log::info!(
            "no overlay manifest at {}; using fallback visuals",
            path.display()
        );
        return Ok(None);
    }
    let atlas = OverlayAtlas::from_manifest_path(&path)
        .with_context(|| format!("failed to load overlays from {}", path.display()))?;
    Ok(Some(atlas))
}

fn pointer_position() -> Point {
    let (x, y) = mouse_position();
    Point::new(x, y)
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> FrameControl + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
            manifest_path,
            frame_clock,
        } = self;

        let Presentation {
            window_title,
            clear_color,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: WINDOW_WIDTH,
            window_height: WINDOW_HEIGHT,
            high_dpi: true,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        let (atlas_init_sender, atlas_init_receiver) = mpsc::channel::<Result<()>>();

        macroquad::Window::from_config(config, async move {
            let atlas = match load_overlays(manifest_path) {
                Ok(atlas) => atlas,
                Err(error) => {
                    let _ = atlas_init_sender.send(Err(error));
                    return;
                }
            };
            let _ = atlas_init_sender.send(Ok(()));

            let overlays = atlas
                .as_ref()
                .map_or_else(OverlaySet::empty, OverlayAtlas::available);
            let background = to_macroquad_color(clear_color);
            let mut scene = scene;
            let mut fps_counter = FpsCounter::default();

            loop {
                let keyboard = KeyboardShortcuts::poll();
                if keyboard.quit_requested {
                    log::info!("quit requested");
                    break;
                }

                macroquad::window::clear_background(background);

                let surface = SurfaceSize::new(
                    macroquad::window::screen_width(),
                    macroquad::window::screen_height(),
                );
                let raw_dt = macroquad::time::get_frame_time();
                let frame_dt = frame_clock.delta(raw_dt);
                let frame_input = FrameInput {
                    surface,
                    pointer_down: is_mouse_button_pressed(MouseButton::Left)
                        .then(pointer_position),
                    pointer_up: is_mouse_button_released(MouseButton::Left)
                        .then(pointer_position),
                    overlays,
                };

                let control = update_scene(frame_dt, frame_input, &mut scene);

                let render_start = Instant::now();
                raster::draw_scene(&scene, surface, atlas.as_ref());
                let render_duration = render_start.elapsed();

                let wall_dt = Duration::try_from_secs_f32(raw_dt).unwrap_or(Duration::ZERO);
                if let Some(FpsMetrics {
                    per_second,
                    trailing_ten_seconds,
                    avg_render,
                }) = fps_counter.record_frame(wall_dt, render_duration)
                {
                    if show_fps {
                        log::info!(
                            "FPS: {:.2} (10s avg: {:.2}) | render: {:>6.2}ms",
                            per_second,
                            trailing_ten_seconds,
                            avg_render.as_secs_f64() * 1_000.0,
                        );
                    }
                }

                if control == FrameControl::Exit {
                    break;
                }

                macroquad::window::next_frame().await;
            }
        });

        atlas_init_receiver.recv().unwrap_or_else(|_| Ok(()))?;

        Ok(())
    }
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_counter_reports_after_one_second() {
        let mut counter = FpsCounter::default();
        let frame = Duration::from_millis(100);
        for _ in 0..9 {
            assert!(counter.record_frame(frame, Duration::ZERO).is_none());
        }
        let metrics = counter
            .record_frame(frame, Duration::from_millis(10))
            .expect("one second elapsed");
        assert!((metrics.per_second - 10.0).abs() < 1e-3);
        assert!((metrics.trailing_ten_seconds - 10.0).abs() < 1e-3);
        assert_eq!(metrics.avg_render, Duration::from_millis(1));
    }

    #[test]
    fn color_conversion_preserves_channels() {
        let converted = to_macroquad_color(Color::new(0.1, 0.2, 0.3, 0.4));
        assert_eq!(
            (converted.r, converted.g, converted.b, converted.a),
            (0.1, 0.2, 0.3, 0.4)
        );
    }
}
