//! Floating-point rectangles and region-of-interest arithmetic.
//!
//! All geometry is kept in `f64`. Nothing here rounds implicitly; callers
//! that cross into pixel or sample units call [`Rectangle::round`] at the
//! boundary.

use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Selects a single field for [`Rectangle::geo1`] / [`Rectangle::set_geo1`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoField {
    X,
    Y,
    Width,
    Height,
}

/// An axis-aligned rectangle.
///
/// Depending on context the units are normalized ROI units (image width is
/// `1.0`), sample units or pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn set_geo(&mut self, x: f64, y: f64, width: f64, height: f64) {
        *self = Self::new(x, y, width, height);
    }

    /// Returns `(x, y, width, height)`.
    pub fn geo(&self) -> (f64, f64, f64, f64) {
        (self.x, self.y, self.width, self.height)
    }

    pub fn geo1(&self, field: GeoField) -> f64 {
        match field {
            GeoField::X => self.x,
            GeoField::Y => self.y,
            GeoField::Width => self.width,
            GeoField::Height => self.height,
        }
    }

    pub fn set_geo1(&mut self, field: GeoField, value: f64) {
        match field {
            GeoField::X => self.x = value,
            GeoField::Y => self.y = value,
            GeoField::Width => self.width = value,
            GeoField::Height => self.height = value,
        }
    }

    pub fn origin(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }

    /// Flip negative extents so width and height are non-negative.
    ///
    /// The covered area is unchanged; only the origin moves to the
    /// top-left-most corner.
    pub fn normalise(&mut self) {
        if self.width < 0.0 {
            self.x += self.width;
            self.width = self.width.abs();
        }
        if self.height < 0.0 {
            self.y += self.height;
            self.height = self.height.abs();
        }
    }

    /// Multiply all four fields by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.x *= factor;
        self.y *= factor;
        self.width *= factor;
        self.height *= factor;
    }

    /// Copying variant of [`scale`](Self::scale).
    pub fn scaled(mut self, factor: f64) -> Self {
        self.scale(factor);
        self
    }

    /// Clip this rectangle into `reference`.
    ///
    /// Extents that end up negative (no overlap) are clamped to zero before
    /// the result is normalised.
    pub fn trim(&mut self, reference: &Rectangle) {
        if self.x < reference.x {
            self.width -= reference.x - self.x;
            self.x = reference.x;
        }
        let right = reference.x + reference.width;
        if self.x + self.width > right {
            self.width -= (self.x + self.width) - right;
        }

        if self.y < reference.y {
            self.height -= reference.y - self.y;
            self.y = reference.y;
        }
        let bottom = reference.y + reference.height;
        if self.y + self.height > bottom {
            self.height -= (self.y + self.height) - bottom;
        }

        if self.width < 0.0 {
            self.width = 0.0;
        }
        if self.height < 0.0 {
            self.height = 0.0;
        }
        self.normalise();
    }

    /// Translate, never resize, so the rectangle lies inside `reference`.
    ///
    /// Each axis is only moved when the rectangle fits on that axis.
    pub fn move_inside(&mut self, reference: &Rectangle) {
        self.normalise();

        if self.width <= reference.width {
            if self.x < reference.x {
                self.x = reference.x;
            } else if self.x + self.width > reference.x + reference.width {
                self.x = reference.x + reference.width - self.width;
            }
        }

        if self.height <= reference.height {
            if self.y < reference.y {
                self.y = reference.y;
            } else if self.y + self.height > reference.y + reference.height {
                self.y = reference.y + reference.height - self.height;
            }
        }
    }

    /// Half-open containment: `x ∈ [self.x, self.x + width)`, same for y.
    pub fn point_is_inside(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// The four corners with the far edges pulled in by one unit.
    ///
    /// Extents below one unit collapse onto the origin.
    pub fn corners(&self) -> [DVec2; 4] {
        let far_x = self.x + (self.width - 1.0).max(0.0);
        let far_y = self.y + (self.height - 1.0).max(0.0);
        [
            DVec2::new(self.x, self.y),
            DVec2::new(far_x, self.y),
            DVec2::new(self.x, far_y),
            DVec2::new(far_x, far_y),
        ]
    }

    /// True when every corner of `self` is a point of `reference`.
    pub fn is_inside(&self, reference: &Rectangle) -> bool {
        self.corners()
            .iter()
            .all(|c| reference.point_is_inside(c.x, c.y))
    }

    /// Exact field equality.
    pub fn is_equal(&self, other: &Rectangle) -> bool {
        self == other
    }

    /// Row-major index of `(x, y)` for a grid of this rectangle's width.
    pub fn index(&self, x: f64, y: f64) -> usize {
        (y * self.width + x).max(0.0) as usize
    }

    pub fn count_points(&self) -> f64 {
        self.width * self.height
    }

    /// Round every field half-away-from-zero.
    pub fn round(&mut self) {
        self.x = self.x.round();
        self.y = self.y.round();
        self.width = self.width.round();
        self.height = self.height.round();
    }

    /// Copying variant of [`round`](Self::round).
    pub fn rounded(mut self) -> Self {
        self.round();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_rect_close(a: &Rectangle, b: &Rectangle) {
        for (x, y) in [(a.x, b.x), (a.y, b.y), (a.width, b.width), (a.height, b.height)] {
            assert!((x - y).abs() < EPSILON, "{a} vs {b}");
        }
    }

    #[test]
    fn test_normalise_flips_negative_extents() {
        let cases = [
            Rectangle::new(10.0, 10.0, -4.0, -3.0),
            Rectangle::new(0.0, 5.0, -0.5, 2.0),
            Rectangle::new(-2.0, -2.0, 3.0, -7.5),
        ];
        for original in cases {
            let mut r = original;
            r.normalise();
            assert!(r.width >= 0.0 && r.height >= 0.0);

            // the top-left-most corner of the original span is still covered
            let left = original.x.min(original.x + original.width);
            let top = original.y.min(original.y + original.height);
            assert!(r.point_is_inside(left, top), "{original} -> {r}");
        }
    }

    #[test]
    fn test_normalise_keeps_positive_rect() {
        let mut r = Rectangle::new(1.0, 2.0, 3.0, 4.0);
        r.normalise();
        assert_eq!(r, Rectangle::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_scale_roundtrip() {
        let r = Rectangle::new(0.25, 0.5, 0.125, 3.0);
        for k in [2.0, 0.1, -3.0, 1234.5] {
            let back = r.scaled(k).scaled(1.0 / k);
            assert_rect_close(&back, &r);
        }
    }

    #[test]
    fn test_trim_clips_to_reference() {
        let reference = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let mut r = Rectangle::new(-2.0, 5.0, 6.0, 8.0);
        r.trim(&reference);
        assert_eq!(r, Rectangle::new(0.0, 5.0, 4.0, 5.0));
    }

    #[test]
    fn test_trim_without_overlap_is_empty() {
        let reference = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let mut r = Rectangle::new(20.0, 20.0, 5.0, 5.0);
        r.trim(&reference);
        assert_eq!(r.width, 0.0);
        assert_eq!(r.height, 0.0);
        assert!(r.is_empty());
    }

    #[test]
    fn test_move_inside_translates_only() {
        let reference = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let mut r = Rectangle::new(8.0, -3.0, 4.0, 4.0);
        r.move_inside(&reference);
        assert_eq!(r, Rectangle::new(6.0, 0.0, 4.0, 4.0));
    }

    #[test]
    fn test_move_inside_leaves_oversized_axis() {
        let reference = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let mut r = Rectangle::new(-5.0, 12.0, 20.0, 2.0);
        r.move_inside(&reference);
        assert_eq!(r.x, -5.0);
        assert_eq!(r.y, 8.0);
        assert_eq!(r.width, 20.0);
    }

    #[test]
    fn test_point_is_inside_is_half_open() {
        let r = Rectangle::new(0.0, 0.0, 2.0, 2.0);
        assert!(r.point_is_inside(0.0, 0.0));
        assert!(r.point_is_inside(1.999, 1.0));
        assert!(!r.point_is_inside(2.0, 0.0));
        assert!(!r.point_is_inside(0.0, 2.0));
        assert!(!r.point_is_inside(-0.001, 0.0));
    }

    #[test]
    fn test_is_inside() {
        let reference = Rectangle::new(0.0, 0.0, 6.0, 2.0);
        assert!(Rectangle::new(0.0, 0.0, 6.0, 2.0).is_inside(&reference));
        assert!(Rectangle::new(3.0, 1.0, 3.0, 1.0).is_inside(&reference));
        assert!(!Rectangle::new(3.0, 1.0, 4.0, 1.0).is_inside(&reference));
        assert!(!Rectangle::new(-1.0, 0.0, 2.0, 1.0).is_inside(&reference));
        // sub-unit extents are tested at their origin
        assert!(Rectangle::new(0.5, 0.5, 0.5, 0.5).is_inside(&reference));
    }

    #[test]
    fn test_index_and_count() {
        let r = Rectangle::new(0.0, 0.0, 4.0, 3.0);
        assert_eq!(r.index(1.0, 2.0), 9);
        assert_eq!(r.count_points(), 12.0);
    }

    #[test]
    fn test_round_half_away_from_zero() {
        let mut r = Rectangle::new(0.5, -0.5, 2.5, 1.49);
        r.round();
        assert_eq!(r, Rectangle::new(1.0, -1.0, 3.0, 1.0));
    }

    #[test]
    fn test_field_accessors() {
        let mut r = Rectangle::default();
        r.set_geo(1.0, 2.0, 3.0, 4.0);
        assert_eq!(r.geo(), (1.0, 2.0, 3.0, 4.0));
        r.set_geo1(GeoField::Height, 9.0);
        assert_eq!(r.geo1(GeoField::Height), 9.0);
        assert_eq!(r.geo1(GeoField::X), 1.0);
        assert!(r.is_equal(&Rectangle::new(1.0, 2.0, 3.0, 9.0)));
    }

    #[test]
    fn test_display_geometry() {
        let r = Rectangle::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(r.to_string(), "3x4+1+2");
    }
}
