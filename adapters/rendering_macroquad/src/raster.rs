//! Rasterisation of scene primitives with macroquad's immediate-mode shapes.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;
use macroquad::{
    math::{Rect as MacroquadRect, Vec2 as MacroquadVec2},
    shapes::{draw_circle, draw_circle_lines, draw_line, draw_rectangle, draw_triangle},
    text::{draw_text, measure_text},
    texture::{draw_texture_ex, DrawTextureParams},
};
use stabilize_core::SurfaceSize;
use stabilize_rendering::{sample_gradient, Color, ColorStop, Primitive, Rect, Scene};

use crate::{to_macroquad_color, OverlayAtlas};

const ARC_SEGMENTS: usize = 8;
const CIRCLE_SEGMENTS: usize = 48;
const GLOW_RINGS: usize = 24;
const GRADIENT_SLICES: usize = 24;

/// Draws every primitive of `scene` in order.
pub(crate) fn draw_scene(scene: &Scene, surface: SurfaceSize, atlas: Option<&OverlayAtlas>) {
    for primitive in scene.primitives() {
        draw_primitive(primitive, surface, atlas);
    }
}

fn draw_primitive(primitive: &Primitive, surface: SurfaceSize, atlas: Option<&OverlayAtlas>) {
    match primitive {
        Primitive::Fill { color } => fill_rect(Rect::surface(surface), *color),
        Primitive::Rect { rect, color } => fill_rect(*rect, *color),
        Primitive::RoundedRect {
            rect,
            radius,
            color,
        } => fill_rounded_rect(*rect, *radius, *color),
        Primitive::RoundedRectOutline {
            rect,
            radius,
            color,
            width,
        } => stroke_rounded_rect(*rect, *radius, *color, *width),
        Primitive::Circle {
            center,
            radius,
            color,
        } => draw_circle(center.x, center.y, *radius, to_macroquad_color(*color)),
        Primitive::CircleOutline {
            center,
            radius,
            color,
            width,
        } => draw_circle_lines(
            center.x,
            center.y,
            *radius,
            *width,
            to_macroquad_color(*color),
        ),
        Primitive::RadialGlow {
            center,
            radius,
            stops,
        } => fill_radial_glow(*center, *radius, stops),
        Primitive::VerticalGradient { rect, top, bottom } => {
            fill_vertical_gradient(*rect, *top, *bottom);
        }
        Primitive::Polyline {
            points,
            color,
            width,
        } => {
            let color = to_macroquad_color(*color);
            for pair in points.windows(2) {
                draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, *width, color);
            }
        }
        Primitive::Text {
            text,
            center,
            size,
            color,
        } => draw_centered_text(text, *center, *size, *color),
        // Macroquad offers no stencil clip, so `clip_radius` is not applied and
        // rounded overlays keep square corners.
        Primitive::Overlay {
            key,
            rect,
            fit,
            alpha,
            clip_radius: _,
        } => {
            let Some(texture) = atlas.and_then(|atlas| atlas.texture(*key)) else {
                return;
            };
            let image = Vec2::new(texture.width(), texture.height());
            let source = fit.source_rect(image, rect.size).map(|source| {
                MacroquadRect::new(
                    source.origin.x,
                    source.origin.y,
                    source.size.x,
                    source.size.y,
                )
            });
            let params = DrawTextureParams {
                dest_size: Some(MacroquadVec2::new(rect.size.x, rect.size.y)),
                source,
                ..DrawTextureParams::default()
            };
            draw_texture_ex(
                texture,
                rect.origin.x,
                rect.origin.y,
                to_macroquad_color(Color::new(1.0, 1.0, 1.0, *alpha)),
                params,
            );
        }
    }
}

fn fill_rect(rect: Rect, color: Color) {
    draw_rectangle(
        rect.origin.x,
        rect.origin.y,
        rect.size.x,
        rect.size.y,
        to_macroquad_color(color),
    );
}

fn clamp_radius(rect: Rect, radius: f32) -> f32 {
    radius.min(rect.size.x / 2.0).min(rect.size.y / 2.0).max(0.0)
}

/// Fills a rounded rectangle from non-overlapping pieces so translucent
/// colors blend evenly.
fn fill_rounded_rect(rect: Rect, radius: f32, color: Color) {
    if rect.size.x <= 0.0 || rect.size.y <= 0.0 {
        return;
    }
    let r = clamp_radius(rect, radius);
    let Rect { origin, size } = rect;
    let mq = to_macroquad_color(color);

    draw_rectangle(origin.x, origin.y + r, size.x, size.y - 2.0 * r, mq);
    draw_rectangle(origin.x + r, origin.y, size.x - 2.0 * r, r, mq);
    draw_rectangle(origin.x + r, origin.y + size.y - r, size.x - 2.0 * r, r, mq);

    if r <= 0.0 {
        return;
    }
    for (corner, start) in corners(rect, r) {
        for segment in 0..ARC_SEGMENTS {
            let a0 = start + FRAC_PI_2 * segment as f32 / ARC_SEGMENTS as f32;
            let a1 = start + FRAC_PI_2 * (segment + 1) as f32 / ARC_SEGMENTS as f32;
            draw_triangle(
                to_mq(corner),
                to_mq(corner + Vec2::new(a0.cos(), a0.sin()) * r),
                to_mq(corner + Vec2::new(a1.cos(), a1.sin()) * r),
                mq,
            );
        }
    }
}

fn stroke_rounded_rect(rect: Rect, radius: f32, color: Color, width: f32) {
    let r = clamp_radius(rect, radius);
    let Rect { origin, size } = rect;
    let mq = to_macroquad_color(color);
    let (left, top) = (origin.x, origin.y);
    let (right, bottom) = (origin.x + size.x, origin.y + size.y);

    draw_line(left + r, top, right - r, top, width, mq);
    draw_line(right, top + r, right, bottom - r, width, mq);
    draw_line(right - r, bottom, left + r, bottom, width, mq);
    draw_line(left, bottom - r, left, top + r, width, mq);

    if r <= 0.0 {
        return;
    }
    for (corner, start) in corners(rect, r) {
        let mut previous = corner + Vec2::new(start.cos(), start.sin()) * r;
        for segment in 1..=ARC_SEGMENTS {
            let angle = start + FRAC_PI_2 * segment as f32 / ARC_SEGMENTS as f32;
            let next = corner + Vec2::new(angle.cos(), angle.sin()) * r;
            draw_line(previous.x, previous.y, next.x, next.y, width, mq);
            previous = next;
        }
    }
}

/// Arc centres and start angles for the four corners, in screen space
/// where positive y points down.
fn corners(rect: Rect, r: f32) -> [(Vec2, f32); 4] {
    let Rect { origin, size } = rect;
    [
        (Vec2::new(origin.x + r, origin.y + r), PI),
        (Vec2::new(origin.x + size.x - r, origin.y + r), -FRAC_PI_2),
        (Vec2::new(origin.x + size.x - r, origin.y + size.y - r), 0.0),
        (Vec2::new(origin.x + r, origin.y + size.y - r), FRAC_PI_2),
    ]
}

/// Approximates a radial gradient with concentric annuli of flat color.
fn fill_radial_glow(center: Vec2, radius: f32, stops: &[ColorStop]) {
    if radius <= 0.0 {
        return;
    }
    for ring in 0..GLOW_RINGS {
        let inner = radius * ring as f32 / GLOW_RINGS as f32;
        let outer = radius * (ring + 1) as f32 / GLOW_RINGS as f32;
        let color = sample_gradient(stops, (ring as f32 + 0.5) / GLOW_RINGS as f32);
        if color.alpha <= 0.0 {
            continue;
        }
        fill_annulus(center, inner, outer, to_macroquad_color(color));
    }
}

fn fill_annulus(center: Vec2, inner: f32, outer: f32, color: macroquad::color::Color) {
    for segment in 0..CIRCLE_SEGMENTS {
        let a0 = 2.0 * PI * segment as f32 / CIRCLE_SEGMENTS as f32;
        let a1 = 2.0 * PI * (segment + 1) as f32 / CIRCLE_SEGMENTS as f32;
        let (d0, d1) = (Vec2::new(a0.cos(), a0.sin()), Vec2::new(a1.cos(), a1.sin()));
        let outer0 = center + d0 * outer;
        let outer1 = center + d1 * outer;
        if inner <= 0.0 {
            draw_triangle(to_mq(center), to_mq(outer0), to_mq(outer1), color);
            continue;
        }
        let inner0 = center + d0 * inner;
        let inner1 = center + d1 * inner;
        draw_triangle(to_mq(inner0), to_mq(outer0), to_mq(outer1), color);
        draw_triangle(to_mq(inner0), to_mq(outer1), to_mq(inner1), color);
    }
}

fn fill_vertical_gradient(rect: Rect, top: Color, bottom: Color) {
    let slice = rect.size.y / GRADIENT_SLICES as f32;
    for index in 0..GRADIENT_SLICES {
        let t = (index as f32 + 0.5) / GRADIENT_SLICES as f32;
        draw_rectangle(
            rect.origin.x,
            rect.origin.y + slice * index as f32,
            rect.size.x,
            slice,
            to_macroquad_color(top.lerp(bottom, t)),
        );
    }
}

fn draw_centered_text(text: &str, center: Vec2, size: f32, color: Color) {
    let font_size = size.round().clamp(1.0, f32::from(u16::MAX)) as u16;
    let dimensions = measure_text(text, None, font_size, 1.0);
    let _ = draw_text(
        text,
        center.x - dimensions.width / 2.0,
        center.y + dimensions.offset_y / 2.0,
        f32::from(font_size),
        to_macroquad_color(color),
    );
}

fn to_mq(point: Vec2) -> MacroquadVec2 {
    MacroquadVec2::new(point.x, point.y)
}
