//! # Materials
//!
//! The flat material record consumed by the stress and buckling checks.
//! Units follow the rest of the crate: lengths in mm, forces in N, stresses
//! in MPa (N/mm²).
//!
//! ## Example
//!
//! ```rust
//! use deck_core::materials::Material;
//!
//! let board = Material::matboard().with_stiffener_spacing(125.0);
//! assert_eq!(board.compressive_strength, 6.0);
//! assert_eq!(board.stiffener_spacing, 125.0);
//! ```

use serde::{Deserialize, Serialize};

/// Strength and elastic properties of the girder material.
///
/// ## JSON Example
///
/// ```json
/// {
///   "tensile_strength": 30.0,
///   "compressive_strength": 6.0,
///   "shear_strength": 4.0,
///   "glue_strength": 2.0,
///   "density": 7.14946079338653e-7,
///   "elastic_modulus": 4000.0,
///   "poisson_ratio": 0.2,
///   "stiffener_spacing": 1250.0
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Ultimate tensile stress (MPa)
    pub tensile_strength: f64,
    /// Ultimate compressive stress (MPa)
    pub compressive_strength: f64,
    /// Ultimate shear stress of the material (MPa)
    pub shear_strength: f64,
    /// Ultimate shear stress of glued joints (MPa)
    pub glue_strength: f64,
    /// Mass density (kg/mm³)
    pub density: f64,
    /// Young's modulus E (MPa)
    pub elastic_modulus: f64,
    /// Poisson's ratio μ
    pub poisson_ratio: f64,
    /// Distance between diaphragms/stiffeners along the span (mm)
    pub stiffener_spacing: f64,
}

impl Material {
    /// Matboard as used for model bridge girders.
    pub fn matboard() -> Self {
        Material {
            tensile_strength: 30.0,
            compressive_strength: 6.0,
            shear_strength: 4.0,
            glue_strength: 2.0,
            density: 7.14946079338653e-7,
            elastic_modulus: 4000.0,
            poisson_ratio: 0.2,
            stiffener_spacing: 1250.0,
        }
    }

    /// Override the stiffener spacing used by the shear-buckling check.
    pub fn with_stiffener_spacing(mut self, spacing: f64) -> Self {
        self.stiffener_spacing = spacing;
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::matboard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_matboard() {
        let m = Material::default();
        assert_eq!(m, Material::matboard());
        assert_eq!(m.tensile_strength, 30.0);
        assert_eq!(m.glue_strength, 2.0);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let m = Material::matboard().with_stiffener_spacing(125.0);
        let json = serde_json::to_string(&m).unwrap();
        let roundtrip: Material = serde_json::from_str(&json).unwrap();
        assert_eq!(m, roundtrip);
    }
}
