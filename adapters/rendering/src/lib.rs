#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for the stabilisation minigames.
//!
//! Engines never draw. Each frame the host asks [`containment::build_scene`]
//! or [`suppression::build_scene`] to describe the engine as an ordered list
//! of [`Primitive`] values, and a [`RenderingBackend`] rasterises that list.

pub mod containment;
pub mod suppression;

use anyhow::Result as AnyResult;
use glam::Vec2;
use stabilize_core::{Point, SurfaceSize};
use std::time::Duration;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self::from_rgba_u8(red, green, blue, 1.0)
    }

    /// Creates a color from byte RGB values and a floating point alpha.
    #[must_use]
    pub const fn from_rgba_u8(red: u8, green: u8, blue: u8, alpha: f32) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha,
        }
    }

    /// Returns the same color with its alpha replaced.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    /// Interpolates every channel towards `other` by `t`, clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            red: stabilize_core::lerp(self.red, other.red, t),
            green: stabilize_core::lerp(self.green, other.green, t),
            blue: stabilize_core::lerp(self.blue, other.blue, t),
            alpha: stabilize_core::lerp(self.alpha, other.alpha, t),
        }
    }
}

/// Colors shared by both minigames.
pub mod palette {
    use super::Color;

    /// Near-black backdrop.
    pub const BACKGROUND: Color = Color::from_rgb_u8(0x0B, 0x0B, 0x0B);
    /// Accent used for signals, meters and highlights.
    pub const GOLD: Color = Color::from_rgb_u8(242, 193, 78);
    /// Warm near-white at the centre of a signal pulse.
    pub const WARM_WHITE: Color = Color::from_rgb_u8(255, 248, 235);
    /// Headline text.
    pub const TEXT_PRIMARY: Color = Color::from_rgba_u8(255, 255, 255, 0.92);
    /// Secondary hints.
    pub const TEXT_SECONDARY: Color = Color::from_rgba_u8(255, 255, 255, 0.70);
    /// Opaque black used for dimming tints.
    pub const BLACK: Color = Color::from_rgb_u8(0, 0, 0);
}

/// Axis-aligned rectangle in surface pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Top-left corner.
    pub origin: Vec2,
    /// Width and height.
    pub size: Vec2,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    /// Rectangle covering the whole surface.
    #[must_use]
    pub const fn surface(surface: SurfaceSize) -> Self {
        Self::new(0.0, 0.0, surface.width, surface.height)
    }

    /// Centre point of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }
}

/// Color at a fractional distance along a gradient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorStop {
    /// Position along the gradient in `[0, 1]`.
    pub offset: f32,
    /// Color at that position.
    pub color: Color,
}

impl ColorStop {
    /// Creates a new gradient stop.
    #[must_use]
    pub const fn new(offset: f32, color: Color) -> Self {
        Self { offset, color }
    }
}

/// Samples a gradient described by `stops` at `offset`.
///
/// Stops must be sorted by offset. Offsets before the first stop or after the
/// last one take that stop's color; an empty gradient is transparent.
#[must_use]
pub fn sample_gradient(stops: &[ColorStop], offset: f32) -> Color {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Color::new(0.0, 0.0, 0.0, 0.0);
    };
    if offset <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        if offset <= to.offset {
            let span = to.offset - from.offset;
            let t = if span > 0.0 {
                (offset - from.offset) / span
            } else {
                1.0
            };
            return from.color.lerp(to.color, t);
        }
    }
    last.color
}

/// Optional cosmetic images layered over the procedural visuals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverlayKey {
    /// Full-screen film grain and vignette.
    BgGrainVignette,
    /// Glass texture laid over each containment lane.
    LaneGlassOverlay,
    /// Backdrop of the suppression waveform panel.
    WaveformPanelBg,
    /// Hold button at rest.
    PlayIdle,
    /// Hold button while held.
    PlayPressed,
}

impl OverlayKey {
    /// Every overlay in manifest order.
    pub const ALL: [Self; 5] = [
        Self::BgGrainVignette,
        Self::LaneGlassOverlay,
        Self::WaveformPanelBg,
        Self::PlayIdle,
        Self::PlayPressed,
    ];

    /// Name used for the overlay in asset manifests.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BgGrainVignette => "bg_grain_vignette",
            Self::LaneGlassOverlay => "lane_glass_overlay",
            Self::WaveformPanelBg => "waveform_panel_bg",
            Self::PlayIdle => "play_idle",
            Self::PlayPressed => "play_pressed",
        }
    }

    /// Resolves a manifest name back into an overlay key.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Set of overlays the backend managed to load.
///
/// Scene builders consult the set and fall back to procedural visuals for
/// anything missing, so an empty set is always a valid configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OverlaySet {
    bits: u8,
}

impl OverlaySet {
    /// Set with no overlays available.
    #[must_use]
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Marks `key` as available.
    pub fn insert(&mut self, key: OverlayKey) {
        self.bits |= key.bit();
    }

    /// Reports whether `key` is available.
    #[must_use]
    pub const fn contains(&self, key: OverlayKey) -> bool {
        self.bits & key.bit() != 0
    }

    /// Reports whether no overlay is available.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl FromIterator<OverlayKey> for OverlaySet {
    fn from_iter<I: IntoIterator<Item = OverlayKey>>(iter: I) -> Self {
        let mut set = Self::empty();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

/// How an overlay image is mapped onto its destination rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayFit {
    /// Stretch the whole image to the destination.
    Stretch,
    /// Scale uniformly until the destination is covered, cropping the
    /// centred excess.
    Cover,
}

impl OverlayFit {
    /// Source region of an `image`-sized texture to sample for `dest`.
    ///
    /// Returns `None` when the whole image is used.
    #[must_use]
    pub fn source_rect(self, image: Vec2, dest: Vec2) -> Option<Rect> {
        match self {
            Self::Stretch => None,
            Self::Cover => {
                let image = image.max(Vec2::ONE);
                let scale = (dest.x / image.x).max(dest.y / image.y);
                if scale <= 0.0 {
                    return None;
                }
                let size = dest / scale;
                let origin = (image - size) * 0.5;
                Some(Rect { origin, size })
            }
        }
    }
}

/// Single draw instruction, rendered in list order.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    /// Tint covering the whole surface.
    Fill {
        /// Tint color.
        color: Color,
    },
    /// Filled rectangle.
    Rect {
        /// Rectangle to fill.
        rect: Rect,
        /// Fill color.
        color: Color,
    },
    /// Filled rectangle with rounded corners.
    RoundedRect {
        /// Rectangle to fill.
        rect: Rect,
        /// Corner radius, limited to half the shorter side.
        radius: f32,
        /// Fill color.
        color: Color,
    },
    /// Outline of a rectangle with rounded corners.
    RoundedRectOutline {
        /// Rectangle to outline.
        rect: Rect,
        /// Corner radius, limited to half the shorter side.
        radius: f32,
        /// Stroke color.
        color: Color,
        /// Stroke width in pixels.
        width: f32,
    },
    /// Filled circle.
    Circle {
        /// Centre of the circle.
        center: Vec2,
        /// Radius in pixels.
        radius: f32,
        /// Fill color.
        color: Color,
    },
    /// Outline of a circle.
    CircleOutline {
        /// Centre of the circle.
        center: Vec2,
        /// Radius in pixels.
        radius: f32,
        /// Stroke color.
        color: Color,
        /// Stroke width in pixels.
        width: f32,
    },
    /// Disc filled with a radial gradient from the centre outwards.
    RadialGlow {
        /// Centre of the glow.
        center: Vec2,
        /// Outer radius in pixels.
        radius: f32,
        /// Gradient stops from centre (0) to rim (1).
        stops: Vec<ColorStop>,
    },
    /// Rectangle filled with a top-to-bottom gradient.
    VerticalGradient {
        /// Rectangle to fill.
        rect: Rect,
        /// Color along the top edge.
        top: Color,
        /// Color along the bottom edge.
        bottom: Color,
    },
    /// Connected line segments.
    Polyline {
        /// Vertices in drawing order.
        points: Vec<Vec2>,
        /// Stroke color.
        color: Color,
        /// Stroke width in pixels.
        width: f32,
    },
    /// Text centred on a point.
    Text {
        /// Text to draw.
        text: String,
        /// Centre of the text block.
        center: Vec2,
        /// Font size in pixels.
        size: f32,
        /// Text color.
        color: Color,
    },
    /// Overlay image.
    ///
    /// Backends may approximate the rounded clip with a rectangular one.
    Overlay {
        /// Image to draw.
        key: OverlayKey,
        /// Destination rectangle.
        rect: Rect,
        /// How the image maps onto the rectangle.
        fit: OverlayFit,
        /// Opacity applied to the image.
        alpha: f32,
        /// Corner radius of the clip region, if clipped.
        clip_radius: Option<f32>,
    },
}

/// Ordered list of primitives describing one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    primitives: Vec<Primitive>,
}

impl Scene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every primitive while keeping the allocation.
    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    /// Appends a primitive to the end of the draw list.
    pub fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    /// Primitives in draw order.
    #[must_use]
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Overlays referenced by the scene.
    pub fn overlays(&self) -> impl Iterator<Item = OverlayKey> + '_ {
        self.primitives.iter().filter_map(|primitive| match primitive {
            Primitive::Overlay { key, .. } => Some(*key),
            _ => None,
        })
    }

    /// Text strings in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.primitives.iter().filter_map(|primitive| match primitive {
            Primitive::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInput {
    /// Current surface dimensions.
    pub surface: SurfaceSize,
    /// Pointer position if the primary button was pressed this frame.
    pub pointer_down: Option<Point>,
    /// Pointer position if the primary button was released this frame.
    pub pointer_up: Option<Point>,
    /// Overlays the backend can draw.
    pub overlays: OverlaySet,
}

/// Decision returned by the per-frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameControl {
    /// Keep presenting frames.
    Continue,
    /// Close the window after this frame.
    Exit,
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting minigame scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the frame delta and the
    /// input captured by the adapter, advances the engine, and rebuilds the
    /// scene before it is rendered.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> FrameControl + 'static;
}

/// Font size scaled to the surface width within `[min, max]` pixels.
#[must_use]
pub fn font_size(surface: SurfaceSize, fraction: f32, min: f32, max: f32) -> f32 {
    (surface.width * fraction).min(max).max(min)
}
