//! Primitive shapes: rectangle, circle and an arbitrary section known only by
//! its bulk properties.
//!
//! All coordinates are local: the origin is the bottom-left corner of the
//! shape's bounding box, `y` grows upward.

use serde::{Deserialize, Serialize};

use super::{param, Params, Section};
use crate::equations::section::{
    circle_area, circle_moment_of_inertia, circular_segment_area, circular_segment_first_moment,
    rectangular_area, rectangular_moment_of_inertia,
};
use crate::errors::{DeckError, DeckResult};

// =============================================================================
// RECTANGLE
// =============================================================================

/// Solid rectangle `b` wide and `h` tall.
///
/// ```rust
/// use deck_core::section::{Rectangle, Section};
///
/// let plate = Rectangle::new(100.0, 1.27);
/// assert!((plate.area() - 127.0).abs() < 1e-9);
/// assert_eq!(plate.centroid(), (50.0, 0.635));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub b: f64,
    pub h: f64,
}

impl Rectangle {
    pub fn new(b: f64, h: f64) -> Self {
        Rectangle { b, h }
    }

    /// Rebuild from `{"b", "h"}`.
    pub fn from_params(params: &Params) -> DeckResult<Self> {
        Ok(Rectangle::new(param(params, "b")?, param(params, "h")?))
    }

    /// The part of the rectangle above the cut, re-based at the cut line.
    pub fn sub_above(&self, y: f64) -> DeckResult<Rectangle> {
        self.check_y(y)?;
        Ok(Rectangle::new(self.b, self.h - y))
    }

    /// Area above the cut and the local height of its centroid.
    pub fn portion_above(&self, y: f64) -> DeckResult<(f64, f64)> {
        self.check_y(y)?;
        Ok((self.b * (self.h - y), 0.5 * (y + self.h)))
    }
}

impl Section for Rectangle {
    fn area(&self) -> f64 {
        rectangular_area(self.b, self.h)
    }

    fn centroid(&self) -> (f64, f64) {
        (0.5 * self.b, 0.5 * self.h)
    }

    fn moment_of_inertia(&self) -> f64 {
        rectangular_moment_of_inertia(self.b, self.h)
    }

    fn width(&self) -> f64 {
        self.b
    }

    fn height(&self) -> f64 {
        self.h
    }

    fn area_above(&self, y: f64) -> DeckResult<f64> {
        self.check_y(y)?;
        Ok(self.b * (self.h - y))
    }

    /// Q(y) = b(h − y) · y/2, measured about the rectangle's own centroid.
    fn q(&self, y: f64) -> DeckResult<f64> {
        let (area, centroid) = self.portion_above(y)?;
        Ok(area * (centroid - 0.5 * self.h))
    }

    fn params(&self) -> Params {
        Params::from([("b".to_string(), self.b), ("h".to_string(), self.h)])
    }
}

// =============================================================================
// CIRCLE
// =============================================================================

/// Solid circle of radius `r`; its bounding box is `2r` square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub r: f64,
}

impl Circle {
    pub fn new(r: f64) -> Self {
        Circle { r }
    }

    /// Rebuild from `{"r"}`.
    pub fn from_params(params: &Params) -> DeckResult<Self> {
        Ok(Circle::new(param(params, "r")?))
    }

    /// A circle cut by a chord has no primitive to represent it.
    pub fn sub_above(&self, _y: f64) -> DeckResult<Circle> {
        Err(DeckError::unsupported("circle", "sub_above"))
    }

    /// Segment area above the cut and the local height of its centroid.
    pub fn portion_above(&self, y: f64) -> DeckResult<(f64, f64)> {
        self.check_y(y)?;
        let chord = y - self.r;
        let area = circular_segment_area(self.r, chord);
        let first_moment = circular_segment_first_moment(self.r, chord);
        Ok((area, self.r + first_moment / area))
    }
}

impl Section for Circle {
    fn area(&self) -> f64 {
        circle_area(self.r)
    }

    fn centroid(&self) -> (f64, f64) {
        (self.r, self.r)
    }

    fn moment_of_inertia(&self) -> f64 {
        circle_moment_of_inertia(self.r)
    }

    fn width(&self) -> f64 {
        2.0 * self.r
    }

    fn height(&self) -> f64 {
        2.0 * self.r
    }

    fn width_at(&self, y: f64) -> f64 {
        let c = y - self.r;
        2.0 * (self.r * self.r - c * c).max(0.0).sqrt()
    }

    fn area_above(&self, y: f64) -> DeckResult<f64> {
        self.check_y(y)?;
        Ok(circular_segment_area(self.r, y - self.r))
    }

    fn q(&self, y: f64) -> DeckResult<f64> {
        self.check_y(y)?;
        Ok(circular_segment_first_moment(self.r, y - self.r))
    }

    fn params(&self) -> Params {
        Params::from([("r".to_string(), self.r)])
    }
}

// =============================================================================
// ARBITRARY
// =============================================================================

/// A section described only by its bulk properties.
///
/// Nothing is known about how material is distributed over the height, so
/// cut queries are only answered at `y = 0` where nothing is removed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arbitrary {
    pub area: f64,
    pub x_bar: f64,
    pub y_bar: f64,
    pub moment_of_inertia: f64,
    pub width: f64,
    pub height: f64,
}

impl Arbitrary {
    /// Rebuild from its six bulk properties.
    pub fn from_params(params: &Params) -> DeckResult<Self> {
        Ok(Arbitrary {
            area: param(params, "area")?,
            x_bar: param(params, "x_bar")?,
            y_bar: param(params, "y_bar")?,
            moment_of_inertia: param(params, "moment_of_inertia")?,
            width: param(params, "width")?,
            height: param(params, "height")?,
        })
    }

    pub fn sub_above(&self, _y: f64) -> DeckResult<Arbitrary> {
        Err(DeckError::unsupported("arbitrary", "sub_above"))
    }

    pub fn portion_above(&self, y: f64) -> DeckResult<(f64, f64)> {
        self.check_y(y)?;
        if y > 0.0 {
            return Err(DeckError::unsupported("arbitrary", "partial-height cut"));
        }
        Ok((self.area, self.y_bar))
    }
}

impl Section for Arbitrary {
    fn area(&self) -> f64 {
        self.area
    }

    fn centroid(&self) -> (f64, f64) {
        (self.x_bar, self.y_bar)
    }

    fn moment_of_inertia(&self) -> f64 {
        self.moment_of_inertia
    }

    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn area_above(&self, y: f64) -> DeckResult<f64> {
        Ok(self.portion_above(y)?.0)
    }

    fn q(&self, y: f64) -> DeckResult<f64> {
        let (area, centroid) = self.portion_above(y)?;
        Ok(area * (centroid - self.y_bar))
    }

    fn params(&self) -> Params {
        Params::from([
            ("area".to_string(), self.area),
            ("x_bar".to_string(), self.x_bar),
            ("y_bar".to_string(), self.y_bar),
            ("moment_of_inertia".to_string(), self.moment_of_inertia),
            ("width".to_string(), self.width),
            ("height".to_string(), self.height),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * b.abs().max(1.0)
    }

    #[test]
    fn test_rectangle_properties() {
        let r = Rectangle::new(2.0, 6.0);
        assert_eq!(r.area(), 12.0);
        assert_eq!(r.moment_of_inertia(), 36.0);
        assert_eq!(r.area_above(0.0).unwrap(), r.area());
        assert_eq!(r.area_above(4.0).unwrap(), 4.0);
    }

    #[test]
    fn test_rectangle_q_about_own_centroid() {
        let r = Rectangle::new(2.0, 6.0);
        // Peak at the centroid: bh²/8
        assert!(approx_eq(r.q_max().unwrap(), 9.0, 1e-12));
        // Nothing is excluded at the bottom fiber, so Q vanishes
        assert!(r.q(0.0).unwrap().abs() < 1e-12);
        // Above the centroid: b(h-y)·y/2
        assert!(approx_eq(r.q(4.0).unwrap(), 8.0, 1e-12));
    }

    #[test]
    fn test_rectangle_range_checks() {
        let r = Rectangle::new(2.0, 6.0);
        assert!(matches!(
            r.q(6.0),
            Err(DeckError::OutOfRange { .. })
        ));
        assert!(r.area_above(-0.1).is_err());
        assert_eq!(r.sub_above(2.0).unwrap(), Rectangle::new(2.0, 4.0));
    }

    #[test]
    fn test_circle_properties() {
        let c = Circle::new(5.0);
        assert!(approx_eq(c.area_above(0.0).unwrap(), c.area(), 1e-12));
        assert!(approx_eq(c.area_above(5.0).unwrap(), 12.5 * PI, 1e-12));
        // Half-disc: Q = 2r³/3
        assert!(approx_eq(c.q_max().unwrap(), 2.0 * 125.0 / 3.0, 1e-12));
        assert!(approx_eq(c.width_at(5.0), 10.0, 1e-12));
        assert!(matches!(
            c.sub_above(1.0),
            Err(DeckError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_arbitrary_only_answers_full_cut() {
        let a = Arbitrary {
            area: 100.0,
            x_bar: 5.0,
            y_bar: 4.0,
            moment_of_inertia: 900.0,
            width: 10.0,
            height: 10.0,
        };
        assert_eq!(a.area_above(0.0).unwrap(), 100.0);
        assert_eq!(a.q(0.0).unwrap(), 0.0);
        assert!(a.q(1.0).is_err());
        assert_eq!(Arbitrary::from_params(&a.params()).unwrap(), a);
    }
}
