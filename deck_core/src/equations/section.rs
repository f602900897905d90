//! # Cross-Section Property Formulas
//!
//! Formulas for the geometric properties of the primitive shapes.
//!
//! ## Notation
//!
//! - `A` = Cross-sectional area
//! - `I` = Moment of inertia about the horizontal centroidal axis
//! - `Q` = First moment of area about the centroidal axis
//! - `b` = Width of section
//! - `h` = Height of section
//! - `r` = Radius
//!
//! ## References
//!
//! - Roark's Formulas for Stress and Strain, 8th Edition, Table A.1
//! - Gere & Goodno, Mechanics of Materials, Appendix D

use std::f64::consts::PI;

// =============================================================================
// RECTANGULAR SECTION PROPERTIES
// =============================================================================

/// Calculate cross-sectional area for rectangular section
///
/// ```text
///     ┌─────────┐
///     │         │
///   h │         │
///     │         │
///     └─────────┘
///          b
/// ```
///
/// # Formula
/// A = b × h
#[inline]
pub fn rectangular_area(b: f64, h: f64) -> f64 {
    b * h
}

/// Calculate moment of inertia for rectangular section about its centroid
///
/// # Formula
/// I = bh³/12
///
/// # Example
/// ```rust
/// use deck_core::equations::section::rectangular_moment_of_inertia;
///
/// let i = rectangular_moment_of_inertia(100.0, 1.27);
/// assert!((i - 17.07).abs() < 0.01);
/// ```
#[inline]
pub fn rectangular_moment_of_inertia(b: f64, h: f64) -> f64 {
    b * h.powi(3) / 12.0
}

// =============================================================================
// CIRCULAR SECTION PROPERTIES
// =============================================================================

/// Area of a solid circle of radius r
///
/// # Formula
/// A = πr²
#[inline]
pub fn circle_area(r: f64) -> f64 {
    PI * r * r
}

/// Moment of inertia of a solid circle about a diameter
///
/// # Formula
/// I = πd⁴/64 = πr⁴/4
#[inline]
pub fn circle_moment_of_inertia(r: f64) -> f64 {
    PI * r.powi(4) / 4.0
}

/// Area of the circular segment above a horizontal chord
///
/// ```text
///        ___
///      /#####\      ← segment above the chord
///     |-------|     ← chord at signed distance c from the center
///     |   +   |
///      \_____/
/// ```
///
/// # Formula
/// A = r²·acos(c/r) − c·√(r² − c²)
///
/// where `c` is the signed height of the chord above the center
/// (c = −r keeps the whole disc, c = r keeps nothing).
///
/// # Example
/// ```rust
/// use deck_core::equations::section::{circle_area, circular_segment_area};
///
/// let full = circular_segment_area(10.0, -10.0);
/// assert!((full - circle_area(10.0)).abs() < 1e-9);
/// let half = circular_segment_area(10.0, 0.0);
/// assert!((half - circle_area(10.0) / 2.0).abs() < 1e-9);
/// ```
#[inline]
pub fn circular_segment_area(r: f64, c: f64) -> f64 {
    let c = c.clamp(-r, r);
    r * r * (c / r).acos() - c * (r * r - c * c).sqrt()
}

/// First moment of the segment above a chord about the circle's center line
///
/// # Formula
/// Q = ⅔·(r² − c²)^(3/2)
///
/// Dividing by the segment area gives the distance from the center to the
/// segment's centroid.
#[inline]
pub fn circular_segment_first_moment(r: f64, c: f64) -> f64 {
    let c = c.clamp(-r, r);
    2.0 / 3.0 * (r * r - c * c).powf(1.5)
}

// =============================================================================
// UNIT TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle() {
        assert_eq!(rectangular_area(2.0, 3.0), 6.0);
        assert!((rectangular_moment_of_inertia(2.0, 3.0) - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_circle() {
        assert!((circle_area(1.0) - PI).abs() < 1e-12);
        assert!((circle_moment_of_inertia(2.0) - PI * 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_half_disc_first_moment() {
        // Semicircle centroid sits 4r/(3π) above the center
        let r = 3.0;
        let q = circular_segment_first_moment(r, 0.0);
        let a = circular_segment_area(r, 0.0);
        assert!((q / a - 4.0 * r / (3.0 * PI)).abs() < 1e-12);
    }

    #[test]
    fn test_segment_vanishes_at_top() {
        assert!(circular_segment_area(5.0, 5.0).abs() < 1e-12);
        assert!(circular_segment_first_moment(5.0, 5.0).abs() < 1e-12);
        // Whole disc balances about its own center
        assert!(circular_segment_first_moment(5.0, -5.0).abs() < 1e-12);
    }
}
