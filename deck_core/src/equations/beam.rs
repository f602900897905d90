//! # Simply-Supported Girder Formulas
//!
//! Equilibrium and stress formulas for a girder with a pin at the near end
//! (x = 0) and a roller at the far end (x = L).
//!
//! ## Notation
//!
//! - `L` = Span length
//! - `P_i` = Axle load i, at position `x_i` from the near support
//! - `M` = Bending moment, `V` = Shear force
//! - `I` = Moment of inertia, `Q` = First moment of area
//! - `c` = Distance from the neutral axis to a fiber
//! - `w` = Width resisting shear at the cut
//!
//! ## References
//!
//! - Hibbeler, Structural Analysis, Ch. 4 (internal loadings)
//! - Gere & Goodno, Mechanics of Materials, §5.8 (shear formula)

/// Far-end reaction of a simply supported span under point loads
///
/// ```text
///        P1    P2    Pn
///        ↓     ↓     ↓
///    ────┬─────┬─────┬────
///    △                    △
///   R1  ←──────L────────→ R2
/// ```
///
/// # Formula
/// R2 = Σ(P_i · x_i) / L, and the near reaction is R1 = ΣP_i − R2.
///
/// # Example
/// ```rust
/// use deck_core::equations::beam::far_reaction;
///
/// // 1000 N at 3 m on a 10 m span
/// let r2 = far_reaction(&[1000.0], &[3.0], 10.0);
/// assert!((r2 - 300.0).abs() < 1e-9);
/// ```
pub fn far_reaction(loads: &[f64], positions: &[f64], span: f64) -> f64 {
    loads
        .iter()
        .zip(positions)
        .map(|(p, x)| p * x)
        .sum::<f64>()
        / span
}

/// Bending (Navier) stress at a fiber
///
/// # Formula
/// σ = M·c / I
#[inline]
pub fn bending_stress(moment: f64, c: f64, moment_of_inertia: f64) -> f64 {
    moment * c / moment_of_inertia
}

/// Shear stress from the shear formula
///
/// # Formula
/// τ = V·Q / (I·w)
#[inline]
pub fn shear_flow_stress(shear: f64, q: f64, moment_of_inertia: f64, width: f64) -> f64 {
    shear * q / (moment_of_inertia * width)
}
