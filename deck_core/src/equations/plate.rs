//! # Thin-Plate Buckling
//!
//! Elastic buckling stresses of the thin plates a built-up girder is made of.
//! All cases share the plate modulus `π²E / (12(1 − μ²))`; they differ in the
//! buckling coefficient `k` and in which dimension plays the role of `b`.
//!
//! ```text
//!   ┌──────────────────────────────┐  case 2: free overhang
//!   └──┬──┬────────────────┬──┬────┘  case 1: between webs
//!      │  │                │  │
//!      │  │  case 3: web   │  │       (compressed depth above the
//!      │  │  in flexure    │  │        neutral axis)
//! ```
//!
//! ## References
//!
//! - Timoshenko & Gere, Theory of Elastic Stability, Ch. 9
//! - CIV102 course notes, plate buckling cases 1–4

use std::f64::consts::PI;

/// Buckling coefficient for a plate restrained along both long edges
pub const FLANGE_BOTH_EDGES_K: f64 = 4.0;
/// Buckling coefficient for a plate restrained along one edge only
pub const FLANGE_ONE_EDGE_K: f64 = 0.425;
/// Buckling coefficient for a web under linearly varying compression
pub const WEB_FLEXURE_K: f64 = 6.0;
/// Buckling coefficient for shear in a web between stiffeners
const SHEAR_K: f64 = 5.0;

/// Plate modulus π²E / (12(1 − μ²))
#[inline]
fn plate_modulus(elastic_modulus: f64, poisson_ratio: f64) -> f64 {
    PI * PI * elastic_modulus / (12.0 * (1.0 - poisson_ratio * poisson_ratio))
}

/// Critical compressive stress of a thin plate
///
/// # Formula
/// σ_cr = k·π²E / (12(1 − μ²)) · (t/b)²
///
/// A non-positive `b` means the plate has no unsupported width and cannot
/// buckle; `f64::INFINITY` is returned.
///
/// # Example
/// ```rust
/// use deck_core::equations::plate::{plate_buckling_stress, FLANGE_BOTH_EDGES_K};
///
/// let sigma = plate_buckling_stress(FLANGE_BOTH_EDGES_K, 4000.0, 0.2, 1.27, 77.46);
/// assert!((sigma - 3.685).abs() < 0.01);
/// ```
pub fn plate_buckling_stress(
    k: f64,
    elastic_modulus: f64,
    poisson_ratio: f64,
    t: f64,
    b: f64,
) -> f64 {
    if b <= 0.0 {
        return f64::INFINITY;
    }
    k * plate_modulus(elastic_modulus, poisson_ratio) * (t / b).powi(2)
}

/// Critical shear stress of a web panel
///
/// # Formula
/// τ_cr = 5π²E / (12(1 − μ²)) · ((t/h)² + (t/a)²)
///
/// where `t` is the web thickness, `h` the web height and `a` the spacing of
/// stiffeners along the span.
pub fn shear_buckling_stress(
    elastic_modulus: f64,
    poisson_ratio: f64,
    t: f64,
    h: f64,
    a: f64,
) -> f64 {
    if h <= 0.0 {
        return f64::INFINITY;
    }
    let spacing_term = if a > 0.0 { (t / a).powi(2) } else { 0.0 };
    SHEAR_K * plate_modulus(elastic_modulus, poisson_ratio) * ((t / h).powi(2) + spacing_term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficients_scale_linearly() {
        let one = plate_buckling_stress(FLANGE_ONE_EDGE_K, 4000.0, 0.2, 1.27, 10.0);
        let both = plate_buckling_stress(FLANGE_BOTH_EDGES_K, 4000.0, 0.2, 1.27, 10.0);
        assert!((both / one - FLANGE_BOTH_EDGES_K / FLANGE_ONE_EDGE_K).abs() < 1e-9);
    }

    #[test]
    fn test_unsupported_width_never_buckles() {
        assert!(plate_buckling_stress(WEB_FLEXURE_K, 4000.0, 0.2, 1.27, 0.0).is_infinite());
        assert!(shear_buckling_stress(4000.0, 0.2, 1.27, 0.0, 100.0).is_infinite());
    }

    #[test]
    fn test_shear_buckling_web() {
        // 1.27 mm web, 100 mm tall, stiffeners every 400 mm
        let tau = shear_buckling_stress(4000.0, 0.2, 1.27, 100.0, 400.0);
        let expected = 5.0 * PI * PI * 4000.0 / (12.0 * 0.96)
            * ((1.27_f64 / 100.0).powi(2) + (1.27_f64 / 400.0).powi(2));
        assert!((tau - expected).abs() < 1e-12);
    }
}
