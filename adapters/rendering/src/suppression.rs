//! Scene construction for the focus and noise suppression minigame.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use stabilize_core::SurfaceSize;
use stabilize_system_suppression::Suppression;

use crate::{
    font_size, palette, Color, OverlayFit, OverlayKey, OverlaySet, Primitive, Rect, Scene,
};

const PANEL_FALLBACK: Color = Color::from_rgba_u8(20, 20, 20, 0.85);
const WAVEFORM_POINTS: usize = 60;
const HINT_TEXT: &str = "Hold to stabilize";
const HINT_SECONDS: f32 = 3.0;

/// Screen geometry shared by the suppression visuals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelLayout {
    /// Waveform panel.
    pub panel: Rect,
    /// Focus meter track above the panel.
    pub meter: Rect,
    /// Centre of the hold button.
    pub button_center: Vec2,
    /// Diameter of the hold button.
    pub button_size: f32,
}

impl PanelLayout {
    /// Computes the layout for `surface`.
    ///
    /// The button sits on the top edge of the control region, which starts at
    /// `control_top` pixels from the top of the surface.
    #[must_use]
    pub fn new(surface: SurfaceSize, control_top: f32) -> Self {
        let width = (surface.width * 0.85).min(600.0);
        let height = (surface.height * 0.35).min(220.0);
        let panel = Rect::new(
            (surface.width - width) / 2.0,
            surface.height * 0.25,
            width,
            height,
        );

        let meter_width = width * 0.8;
        let meter = Rect::new(
            panel.origin.x + (width - meter_width) / 2.0,
            panel.origin.y - 20.0,
            meter_width,
            6.0,
        );

        Self {
            panel,
            meter,
            button_center: Vec2::new(surface.width / 2.0, control_top),
            button_size: (surface.width * 0.18).min(100.0),
        }
    }
}

/// Rebuilds `scene` to show `engine` on a surface of size `surface`.
///
/// `rng` only feeds the cosmetic waveform jitter.
pub fn build_scene(
    engine: &Suppression,
    surface: SurfaceSize,
    overlays: OverlaySet,
    rng: &mut impl Rng,
    scene: &mut Scene,
) {
    let layout = PanelLayout::new(surface, engine.control_region(surface).top());
    let noise = engine.noise_level();
    let t = engine.elapsed();

    scene.clear();
    scene.push(Primitive::Fill {
        color: palette::BACKGROUND,
    });
    if overlays.contains(OverlayKey::BgGrainVignette) {
        scene.push(Primitive::Overlay {
            key: OverlayKey::BgGrainVignette,
            rect: Rect::surface(surface),
            fit: OverlayFit::Stretch,
            alpha: 0.35,
            clip_radius: None,
        });
    }

    if overlays.contains(OverlayKey::WaveformPanelBg) {
        scene.push(Primitive::Overlay {
            key: OverlayKey::WaveformPanelBg,
            rect: layout.panel,
            fit: OverlayFit::Stretch,
            alpha: 1.0,
            clip_radius: None,
        });
    } else {
        scene.push(Primitive::RoundedRect {
            rect: layout.panel,
            radius: 12.0,
            color: PANEL_FALLBACK,
        });
    }

    scene.push(Primitive::Polyline {
        points: waveform(layout.panel, noise, t, rng),
        color: palette::GOLD.with_alpha(0.75),
        width: 2.0,
    });

    let meter = layout.meter;
    scene.push(Primitive::RoundedRect {
        rect: meter,
        radius: 3.0,
        color: Color::new(1.0, 1.0, 1.0, 0.15),
    });
    scene.push(Primitive::RoundedRect {
        rect: Rect {
            size: Vec2::new(meter.size.x * engine.focus(), meter.size.y),
            ..meter
        },
        radius: 3.0,
        color: palette::GOLD.with_alpha(0.75),
    });

    push_hold_button(scene, &layout, engine.is_holding(), overlays);

    scene.push(Primitive::Text {
        text: engine.message().to_owned(),
        center: Vec2::new(surface.width / 2.0, surface.height * 0.12),
        size: font_size(surface, 0.028, 18.0, 28.0),
        color: palette::TEXT_PRIMARY,
    });

    if let Some(alpha) = hint_alpha(t, engine.is_ended()) {
        let secondary = palette::TEXT_SECONDARY;
        scene.push(Primitive::Text {
            text: HINT_TEXT.to_owned(),
            center: Vec2::new(
                surface.width / 2.0,
                layout.button_center.y + layout.button_size / 2.0 + 30.0,
            ),
            size: font_size(surface, 0.018, 14.0, 18.0),
            color: secondary.with_alpha(secondary.alpha * alpha),
        });
    }
}

/// Opacity of the "hold" hint at simulated time `t`, or `None` once hidden.
///
/// Fully visible for two seconds, then fades out over the third.
#[must_use]
pub fn hint_alpha(t: f32, ended: bool) -> Option<f32> {
    if ended || t >= HINT_SECONDS {
        return None;
    }
    let fade = if t < 2.0 { 1.0 } else { HINT_SECONDS - t };
    Some(fade * 0.7)
}

/// Procedural waveform across `panel` whose amplitude and busyness follow `noise`.
pub fn waveform(panel: Rect, noise: f32, t: f32, rng: &mut impl Rng) -> Vec<Vec2> {
    let center_y = panel.origin.y + panel.size.y / 2.0;
    let spacing = panel.size.x / (WAVEFORM_POINTS - 1) as f32;
    let base_amplitude = panel.size.y * 0.25 * noise;
    let primary = 0.08 + noise * 0.05;
    let secondary = 0.15 + noise * 0.08;
    let phase = t * 1.2;

    (0..WAVEFORM_POINTS)
        .map(|index| {
            let i = index as f32;
            let wave = ((i * primary + phase) * TAU).sin()
                + ((i * secondary + phase * 0.7) * TAU).sin() * 0.5;
            let jitter = (rng.gen::<f32>() - 0.5) * noise * 0.3;
            Vec2::new(
                panel.origin.x + i * spacing,
                center_y + (wave + jitter) * base_amplitude,
            )
        })
        .collect()
}

fn push_hold_button(
    scene: &mut Scene,
    layout: &PanelLayout,
    holding: bool,
    overlays: OverlaySet,
) {
    let size = layout.button_size;
    let rect = Rect::new(
        layout.button_center.x - size / 2.0,
        layout.button_center.y - size / 2.0,
        size,
        size,
    );

    let overlay = if holding && overlays.contains(OverlayKey::PlayPressed) {
        Some(OverlayKey::PlayPressed)
    } else if overlays.contains(OverlayKey::PlayIdle) {
        Some(OverlayKey::PlayIdle)
    } else {
        None
    };

    if let Some(key) = overlay {
        scene.push(Primitive::Overlay {
            key,
            rect,
            fit: OverlayFit::Stretch,
            alpha: 1.0,
            clip_radius: None,
        });
        return;
    }

    let fill = if holding { 0.5 } else { 0.3 };
    scene.push(Primitive::Circle {
        center: layout.button_center,
        radius: size / 2.0,
        color: palette::GOLD.with_alpha(fill),
    });
    scene.push(Primitive::CircleOutline {
        center: layout.button_center,
        radius: size / 2.0,
        color: palette::GOLD.with_alpha(0.8),
        width: 2.0,
    });
}
