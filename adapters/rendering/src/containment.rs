//! Scene construction for the multi-lane containment minigame.

use std::f32::consts::TAU;

use glam::Vec2;
use stabilize_core::SurfaceSize;
use stabilize_system_containment::{Containment, LaneLayout, LaneRect};

use crate::{
    font_size, palette, Color, ColorStop, OverlayFit, OverlayKey, OverlaySet, Primitive, Rect,
    Scene,
};

const LANE_UNDERLAY: Color = Color::from_rgb_u8(0x0E, 0x0E, 0x0E);
const LANE_FILL: Color = Color::from_rgb_u8(0x11, 0x11, 0x11);
const LANE_STROKE: Color = Color::from_rgba_u8(242, 193, 78, 0.25);
const LANE_STROKE_HOT: Color = Color::from_rgba_u8(242, 193, 78, 0.55);

const TRAIL_THRESHOLD: f32 = 0.70;
const TRAIL_LENGTH: f32 = 18.0;
const TRAIL_MAX_ALPHA: f32 = 0.08;

/// Rebuilds `scene` to show `engine` on a surface of size `surface`.
pub fn build_scene<R>(
    engine: &Containment<R>,
    surface: SurfaceSize,
    overlays: OverlaySet,
    scene: &mut Scene,
) {
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

    let tuning = engine.tuning();
    let layout = LaneLayout::new(surface, tuning.lanes);
    scene.push(Primitive::Text {
        text: engine.message().to_owned(),
        center: Vec2::new(surface.width / 2.0, layout.area().y * 0.45),
        size: font_size(surface, 0.03, 18.0, 34.0),
        color: palette::TEXT_PRIMARY,
    });

    let calm_channel = engine.calm_channel();
    for (index, channel) in engine.channels().iter().enumerate() {
        let lane = to_rect(layout.lane_rect(index));
        let radius = 26.0_f32.min(lane.size.x * 0.12);
        let amplitude = channel.amplitude();
        let calm = calm_channel == Some(index);

        scene.push(Primitive::RoundedRect {
            rect: lane,
            radius,
            color: LANE_UNDERLAY,
        });
        scene.push(Primitive::RoundedRect {
            rect: lane,
            radius,
            color: LANE_FILL,
        });
        if overlays.contains(OverlayKey::LaneGlassOverlay) {
            scene.push(Primitive::Overlay {
                key: OverlayKey::LaneGlassOverlay,
                rect: lane,
                fit: OverlayFit::Cover,
                alpha: 0.25,
                clip_radius: Some(radius),
            });
        }

        scene.push(Primitive::RoundedRectOutline {
            rect: lane,
            radius,
            color: LANE_STROKE.lerp(LANE_STROKE_HOT, heat(amplitude, tuning.warn, tuning.max)),
            width: 2.0,
        });

        if calm {
            scene.push(Primitive::RoundedRect {
                rect: lane,
                radius,
                color: palette::GOLD.with_alpha(0.10),
            });
        }

        let dot = signal_position(lane, amplitude);
        if amplitude > TRAIL_THRESHOLD {
            let alpha =
                ((amplitude - TRAIL_THRESHOLD) / 0.30 * TRAIL_MAX_ALPHA).min(TRAIL_MAX_ALPHA);
            scene.push(Primitive::VerticalGradient {
                rect: Rect::new(dot.x - 1.0, dot.y + 4.0, 2.0, TRAIL_LENGTH),
                top: palette::GOLD.with_alpha(alpha),
                bottom: palette::GOLD.with_alpha(0.0),
            });
        }

        push_signal_pulse(
            scene,
            dot,
            10.0 + amplitude * 6.0,
            if calm { 0.85 } else { 0.65 },
            engine.elapsed(),
        );

        if amplitude >= tuning.critical {
            scene.push(Primitive::RoundedRect {
                rect: lane,
                radius,
                color: palette::GOLD.with_alpha(0.12),
            });
        }
    }

    if engine.is_ended() {
        scene.push(Primitive::Fill {
            color: palette::BLACK.with_alpha(0.10),
        });
    }
    if engine.is_recalibrating() {
        scene.push(Primitive::Fill {
            color: palette::BLACK.with_alpha(0.18),
        });
    }
}

/// How far `amplitude` has climbed from `warn` towards `max`, in `[0, 1]`.
#[must_use]
pub fn heat(amplitude: f32, warn: f32, max: f32) -> f32 {
    let span = max - warn;
    if span <= 0.0 {
        return if amplitude >= max { 1.0 } else { 0.0 };
    }
    ((amplitude - warn) / span).clamp(0.0, 1.0)
}

/// Centre of the signal pulse for a lane at `amplitude`.
///
/// Zero sits near the bottom of the lane and the ceiling near the top, with
/// an eight percent margin at each end.
#[must_use]
pub fn signal_position(lane: Rect, amplitude: f32) -> Vec2 {
    Vec2::new(
        lane.origin.x + lane.size.x * 0.5,
        lane.origin.y + (1.0 - amplitude) * lane.size.y * 0.86 + lane.size.y * 0.08,
    )
}

fn push_signal_pulse(
    scene: &mut Scene,
    center: Vec2,
    base_radius: f32,
    base_alpha: f32,
    t: f32,
) {
    let breath = 1.0 + ((t * 1.8) % TAU).sin() * 0.045;
    let aura = base_alpha * 0.15 * breath;
    scene.push(Primitive::RadialGlow {
        center,
        radius: base_radius * 2.8 * breath,
        stops: vec![
            ColorStop::new(0.0, palette::GOLD.with_alpha(aura * 0.6)),
            ColorStop::new(0.4, palette::GOLD.with_alpha(aura * 0.3)),
            ColorStop::new(1.0, palette::GOLD.with_alpha(0.0)),
        ],
    });

    let core = base_alpha * 0.92;
    scene.push(Primitive::RadialGlow {
        center,
        radius: base_radius * 0.75,
        stops: vec![
            ColorStop::new(0.0, palette::WARM_WHITE.with_alpha(core)),
            ColorStop::new(0.5, palette::GOLD.with_alpha(core * 0.85)),
            ColorStop::new(1.0, palette::GOLD.with_alpha(core * 0.4)),
        ],
    });
}

fn to_rect(lane: LaneRect) -> Rect {
    Rect::new(lane.x, lane.y, lane.width, lane.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stabilize_core::{CompletionNotice, Point};
    use stabilize_system_containment::ContainmentTuning;
    use std::time::Duration;

    fn surface() -> SurfaceSize {
        SurfaceSize::new(1200.0, 800.0)
    }

    fn engine() -> Containment {
        Containment::with_seed(ContainmentTuning::default(), 4, CompletionNotice::silent())
            .expect("valid tuning")
    }

    fn count(scene: &Scene, predicate: impl Fn(&Primitive) -> bool) -> usize {
        scene.primitives().iter().filter(|p| predicate(p)).count()
    }

    #[test]
    fn heat_is_zero_below_warn_and_one_at_max() {
        assert_eq!(heat(0.5, 0.7, 1.0), 0.0);
        assert!((heat(0.85, 0.7, 1.0) - 0.5).abs() < 1e-5);
        assert_eq!(heat(1.0, 0.7, 1.0), 1.0);
        assert_eq!(heat(0.6, 0.7, 0.7), 0.0);
        assert_eq!(heat(0.7, 0.7, 0.7), 1.0);
    }

    #[test]
    fn signal_rises_as_amplitude_grows() {
        let lane = Rect::new(0.0, 100.0, 50.0, 500.0);
        let low = signal_position(lane, 0.0);
        let high = signal_position(lane, 1.0);
        assert!((low.y - (100.0 + 0.94 * 500.0)).abs() < 1e-3);
        assert!((high.y - (100.0 + 0.08 * 500.0)).abs() < 1e-3);
        assert_eq!(low.x, 25.0);
    }

    #[test]
    fn fallback_scene_draws_no_overlays() {
        let mut scene = Scene::new();
        build_scene(&engine(), surface(), OverlaySet::empty(), &mut scene);

        assert_eq!(scene.overlays().count(), 0);
        assert_eq!(scene.texts().collect::<Vec<_>>(), vec!["Slow what's rising."]);
        let outlines = count(&scene, |p| matches!(p, Primitive::RoundedRectOutline { .. }));
        assert_eq!(outlines, 3);
        let glows = count(&scene, |p| matches!(p, Primitive::RadialGlow { .. }));
        assert_eq!(glows, 6);
    }

    #[test]
    fn available_overlays_are_layered_per_lane() {
        let overlays: OverlaySet = [OverlayKey::BgGrainVignette, OverlayKey::LaneGlassOverlay]
            .into_iter()
            .collect();
        let mut scene = Scene::new();
        build_scene(&engine(), surface(), overlays, &mut scene);

        let keys: Vec<_> = scene.overlays().collect();
        assert_eq!(keys.first(), Some(&OverlayKey::BgGrainVignette));
        assert_eq!(
            keys.iter()
                .filter(|key| **key == OverlayKey::LaneGlassOverlay)
                .count(),
            3
        );
    }

    #[test]
    fn calm_and_critical_lanes_receive_tints() {
        let mut engine = engine();
        let mut events = Vec::new();
        let lane = LaneLayout::new(surface(), 3).lane_rect(0);
        let _ = engine.pointer_down(
            Point::new(lane.x + 5.0, lane.y + 5.0),
            surface(),
            &mut events,
        );
        engine.force_amplitude(2, 0.9);

        let mut scene = Scene::new();
        build_scene(&engine, surface(), OverlaySet::empty(), &mut scene);

        let calm_tint = palette::GOLD.with_alpha(0.10);
        let critical_tint = palette::GOLD.with_alpha(0.12);
        assert_eq!(
            count(&scene, |p| matches!(p, Primitive::RoundedRect { color, .. } if *color == calm_tint)),
            1
        );
        assert_eq!(
            count(&scene, |p| matches!(p, Primitive::RoundedRect { color, .. } if *color == critical_tint)),
            1
        );
        assert_eq!(
            count(&scene, |p| matches!(p, Primitive::VerticalGradient { .. })),
            1
        );
    }

    #[test]
    fn recalibration_dims_the_surface() {
        let mut engine = engine();
        let mut events = Vec::new();
        for lane in 0..3 {
            engine.force_amplitude(lane, 1.0);
        }
        engine.update(Duration::from_millis(16), &mut events);
        assert!(engine.is_recalibrating());

        let mut scene = Scene::new();
        build_scene(&engine, surface(), OverlaySet::empty(), &mut scene);

        assert_eq!(
            scene.primitives().last(),
            Some(&Primitive::Fill {
                color: palette::BLACK.with_alpha(0.18)
            })
        );
        assert_eq!(scene.texts().next(), Some("Recalibrating…"));
    }
}
