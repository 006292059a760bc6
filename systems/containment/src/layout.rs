use stabilize_core::{Point, SurfaceSize};

/// Screen-space rectangle occupied by a single lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneRect {
    /// Left edge in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl LaneRect {
    /// Reports whether the point lies inside the rectangle, edges included.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// Deterministic lane layout for a surface.
///
/// Lanes share equal widths inside a padded area and are separated by a gap
/// proportional to the area width. Hit-testing and drawing both use this
/// layout so a click always lands on the lane the player sees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneLayout {
    area: LaneRect,
    lane_width: f32,
    gap: f32,
    lanes: usize,
}

impl LaneLayout {
    /// Computes the layout of `lanes` lanes on `surface`.
    #[must_use]
    pub fn new(surface: SurfaceSize, lanes: usize) -> Self {
        let lanes = lanes.max(1);
        let pad_x = 60.0_f32.min(surface.width * 0.06);
        let pad_top = 90.0_f32.min(surface.height * 0.10);
        let pad_bottom = 70.0_f32.min(surface.height * 0.10);

        let area = LaneRect {
            x: pad_x,
            y: pad_top,
            width: surface.width - pad_x * 2.0,
            height: surface.height - pad_top - pad_bottom,
        };
        let gap = 18.0_f32.max(area.width * 0.04);
        let lane_width = (area.width - gap * (lanes - 1) as f32) / lanes as f32;

        Self {
            area,
            lane_width,
            gap,
            lanes,
        }
    }

    /// Returns the lane under `point`, or `None` for padding, gaps and
    /// anything off the surface.
    #[must_use]
    pub fn lane_at(&self, point: Point) -> Option<usize> {
        if !self.area.contains(point) {
            return None;
        }
        (0..self.lanes).find(|&index| self.lane_rect(index).contains(point))
    }

    /// Rectangle occupied by the lane at `index`.
    #[must_use]
    pub fn lane_rect(&self, index: usize) -> LaneRect {
        LaneRect {
            x: self.area.x + index as f32 * (self.lane_width + self.gap),
            y: self.area.y,
            width: self.lane_width,
            height: self.area.height,
        }
    }

    /// Padded area that contains every lane.
    #[must_use]
    pub const fn area(&self) -> LaneRect {
        self.area
    }

    /// Number of lanes in the layout.
    #[must_use]
    pub const fn lanes(&self) -> usize {
        self.lanes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> LaneLayout {
        LaneLayout::new(SurfaceSize::new(1000.0, 800.0), 3)
    }

    #[test]
    fn padding_is_capped_in_pixels() {
        let area = layout().area();
        assert_eq!(area.x, 60.0);
        assert_eq!(area.y, 80.0);
        assert_eq!(area.width, 880.0);
        assert_eq!(area.height, 800.0 - 80.0 - 70.0);
    }

    #[test]
    fn lanes_share_width_and_leave_gaps() {
        let layout = layout();
        let first = layout.lane_rect(0);
        let second = layout.lane_rect(1);
        let gap = 880.0 * 0.04;
        assert!((first.width - (880.0 - gap * 2.0) / 3.0).abs() < 1e-3);
        assert!((second.x - (first.x + first.width + gap)).abs() < 1e-3);
    }

    #[test]
    fn hit_test_resolves_each_lane_centre() {
        let layout = layout();
        for index in 0..3 {
            let rect = layout.lane_rect(index);
            let centre = Point::new(rect.x + rect.width / 2.0, rect.y + rect.height / 2.0);
            assert_eq!(layout.lane_at(centre), Some(index));
        }
    }

    #[test]
    fn hit_test_misses_padding_and_gaps() {
        let layout = layout();
        assert_eq!(layout.lane_at(Point::new(10.0, 400.0)), None);
        assert_eq!(layout.lane_at(Point::new(500.0, 10.0)), None);
        assert_eq!(layout.lane_at(Point::new(500.0, 790.0)), None);

        let first = layout.lane_rect(0);
        let in_gap = Point::new(first.x + first.width + 5.0, 400.0);
        assert_eq!(layout.lane_at(in_gap), None);
    }

    #[test]
    fn small_surfaces_keep_minimum_gap() {
        let layout = LaneLayout::new(SurfaceSize::new(200.0, 200.0), 3);
        let first = layout.lane_rect(0);
        let second = layout.lane_rect(1);
        assert!((second.x - (first.x + first.width) - 18.0).abs() < 1e-3);
    }
}
