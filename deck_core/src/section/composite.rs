//! # Composite Sections
//!
//! A composite is a set of primitive shapes placed at offsets in a common
//! local frame. Every derived quantity (area, centroid, inertia, narrowest
//! web, top flange, contact map) is computed once in [`Composite::new`] and
//! stored; a composite never changes after construction.
//!
//! Children are [`Shape`]s, which have no composite variant, so a composite of
//! composites cannot be expressed.
//!
//! ## Example
//!
//! ```rust
//! use deck_core::section::{Composite, Placed, Rectangle, Section, Shape};
//!
//! // Two 10 x 2 plates stacked into a 10 x 4 block
//! let stack = Composite::new(vec![
//!     Placed::new(Shape::Rectangle(Rectangle::new(10.0, 2.0)), 0.0, 0.0),
//!     Placed::new(Shape::Rectangle(Rectangle::new(10.0, 2.0)), 0.0, 2.0),
//! ])
//! .unwrap();
//!
//! assert!((stack.moment_of_inertia() - 10.0 * 64.0 / 12.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use super::presets::Preset;
use super::{param, Params, Section, Shape};
use crate::equations::plate::{
    plate_buckling_stress, shear_buckling_stress, FLANGE_BOTH_EDGES_K, FLANGE_ONE_EDGE_K,
    WEB_FLEXURE_K,
};
use crate::errors::{DeckError, DeckResult};
use crate::materials::Material;

/// Vertical gap (and minimum horizontal overlap) below which two components
/// count as touching.
pub const CONTACT_TOLERANCE: f64 = 1e-6;

/// A primitive shape with the offset of its local origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placed {
    pub shape: Shape,
    pub x: f64,
    pub y: f64,
}

impl Placed {
    pub fn new(shape: Shape, x: f64, y: f64) -> Self {
        Placed { shape, x, y }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.shape.width()
    }

    pub fn bottom(&self) -> f64 {
        self.y
    }

    pub fn top(&self) -> f64 {
        self.y + self.shape.height()
    }

    fn overlaps_horizontally(&self, other: &Placed) -> bool {
        self.right().min(other.right()) - self.left().max(other.left()) > CONTACT_TOLERANCE
    }
}

/// Horizontal plane along which two glued components transfer shear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlueInterface {
    /// Height of the glued plane in the section's local frame
    pub y: f64,
    /// Total glued width across that plane
    pub width: f64,
}

/// Component `upper` rests directly on component `lower`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub upper: usize,
    pub lower: usize,
}

/// Buckling stresses of the top flange and its webs, one per case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlangeBuckling {
    /// Flange between two webs (k = 4)
    pub between_webs: f64,
    /// Flange overhanging the outermost web (k = 0.425)
    pub overhang: f64,
    /// Compressed depth of the web itself (k = 6)
    pub web: f64,
}

impl FlangeBuckling {
    pub fn governing(&self) -> f64 {
        self.between_webs.min(self.overhang).min(self.web)
    }
}

/// Primitive shapes combined into one cross-section.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    parts: Vec<Placed>,
    glue: Option<GlueInterface>,
    preset: Option<Preset>,
    area: f64,
    centroid: (f64, f64),
    moment_of_inertia: f64,
    width: f64,
    height: f64,
    min_width: f64,
    top: usize,
    contacts: Vec<Contact>,
}

impl Composite {
    /// Combine placed shapes and precompute every derived property.
    ///
    /// Fails if there are no parts or if the total area is not positive.
    pub fn new(parts: Vec<Placed>) -> DeckResult<Self> {
        if parts.is_empty() {
            return Err(DeckError::structural(
                "composite section",
                "a composite needs at least one component",
            ));
        }

        let area: f64 = parts.iter().map(|p| p.shape.area()).sum();
        if area <= 0.0 {
            return Err(DeckError::structural(
                "composite section",
                format!("total area must be positive, got {}", area),
            ));
        }

        let (mut ax, mut ay) = (0.0, 0.0);
        for p in &parts {
            let (cx, cy) = p.shape.centroid();
            ax += p.shape.area() * (p.x + cx);
            ay += p.shape.area() * (p.y + cy);
        }
        let centroid = (ax / area, ay / area);

        // Parallel axis theorem, vertical distances only
        let moment_of_inertia = parts
            .iter()
            .map(|p| {
                let d = p.y + p.shape.centroid().1 - centroid.1;
                p.shape.moment_of_inertia() + p.shape.area() * d * d
            })
            .sum();

        let width = parts.iter().map(Placed::right).fold(0.0, f64::max);
        let height = parts.iter().map(Placed::top).fold(0.0, f64::max);

        let mut top = 0;
        for (i, p) in parts.iter().enumerate() {
            if p.top() > parts[top].top() {
                top = i;
            }
        }

        let mut contacts = Vec::new();
        for (i, upper) in parts.iter().enumerate() {
            for (j, lower) in parts.iter().enumerate() {
                if i != j
                    && (upper.bottom() - lower.top()).abs() <= CONTACT_TOLERANCE
                    && upper.overlaps_horizontally(lower)
                {
                    contacts.push(Contact { upper: i, lower: j });
                }
            }
        }

        let min_width = narrowest_band(&parts).unwrap_or(width);

        Ok(Composite {
            parts,
            glue: None,
            preset: None,
            area,
            centroid,
            moment_of_inertia,
            width,
            height,
            min_width,
            top,
            contacts,
        })
    }

    /// Declare a glued interface.
    pub fn with_glue(mut self, glue: GlueInterface) -> Self {
        self.glue = Some(glue);
        self
    }

    pub(crate) fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = Some(preset);
        self
    }

    pub fn parts(&self) -> &[Placed] {
        &self.parts
    }

    pub fn glue(&self) -> Option<GlueInterface> {
        self.glue
    }

    /// The named preset this section was generated from, if any.
    pub fn preset(&self) -> Option<&Preset> {
        self.preset.as_ref()
    }

    /// The component reaching highest, taken as the critical flange.
    pub fn top_component(&self) -> &Placed {
        &self.parts[self.top]
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Components directly supporting the top flange.
    pub fn webs(&self) -> Vec<&Placed> {
        self.contacts
            .iter()
            .filter(|c| c.upper == self.top)
            .map(|c| &self.parts[c.lower])
            .collect()
    }

    /// Components that lie at or above the cut.
    fn parts_above(&self, y: f64) -> impl Iterator<Item = &Placed> {
        self.parts.iter().filter(move |p| y < p.top())
    }

    /// The part of the composite above `y`, re-based so the cut is the new
    /// bottom edge. Fails for cuts through a circle or an arbitrary shape.
    pub fn sub_above(&self, y: f64) -> DeckResult<Composite> {
        self.check_y(y)?;
        let mut parts = Vec::new();
        for p in self.parts_above(y) {
            if p.bottom() >= y {
                parts.push(Placed::new(p.shape, p.x, p.y - y));
            } else {
                parts.push(Placed::new(p.shape.sub_above(y - p.y)?, p.x, 0.0));
            }
        }
        let mut sub = Composite::new(parts)?;
        if let Some(glue) = self.glue.filter(|g| g.y >= y) {
            sub = sub.with_glue(GlueInterface {
                y: glue.y - y,
                width: glue.width,
            });
        }
        Ok(sub)
    }

    /// Plate buckling stresses of the top flange, `None` when nothing
    /// supports it.
    pub fn flange_buckling(&self, material: &Material) -> Option<FlangeBuckling> {
        let webs = self.webs();
        let left = webs.iter().min_by(|a, b| a.left().total_cmp(&b.left()))?;
        let right = webs.iter().max_by(|a, b| a.right().total_cmp(&b.right()))?;
        let flange = self.top_component();
        let t = flange.shape.height();
        let (e, mu) = (material.elastic_modulus, material.poisson_ratio);

        let between_webs = if webs.len() > 1 {
            let free = right.left() - left.right();
            plate_buckling_stress(FLANGE_BOTH_EDGES_K, e, mu, t, free)
        } else {
            f64::INFINITY
        };

        let overhang_width = (left.left() - flange.left()).max(flange.right() - right.right());
        let overhang = plate_buckling_stress(FLANGE_ONE_EDGE_K, e, mu, t, overhang_width);

        let compressed_depth = flange.bottom() - self.centroid.1;
        let web = webs
            .iter()
            .map(|w| plate_buckling_stress(WEB_FLEXURE_K, e, mu, w.shape.width(), compressed_depth))
            .fold(f64::INFINITY, f64::min);

        Some(FlangeBuckling {
            between_webs,
            overhang,
            web,
        })
    }

    /// Governing plate buckling stress of the top flange.
    pub fn flexural_buckling_stress(&self, material: &Material) -> f64 {
        self.flange_buckling(material)
            .map_or(f64::INFINITY, |b| b.governing())
    }

    /// Lowest shear buckling stress over every component in a contact.
    pub fn shear_buckling_stress(&self, material: &Material) -> f64 {
        let mut stress = f64::INFINITY;
        for (i, p) in self.parts.iter().enumerate() {
            if self.contacts.iter().any(|c| c.upper == i || c.lower == i) {
                stress = stress.min(shear_buckling_stress(
                    material.elastic_modulus,
                    material.poisson_ratio,
                    p.shape.width(),
                    p.shape.height(),
                    material.stiffener_spacing,
                ));
            }
        }
        stress
    }

    /// Rebuild a generic composite from the flat keys written by
    /// [`Section::params`]: `"{i}.x"`, `"{i}.y"`, `"{i}.{kind}.{field}"`,
    /// plus `glue_y`/`glue_width` when glued.
    pub fn from_params(params: &Params) -> DeckResult<Self> {
        let mut groups: Vec<(usize, Params)> = Vec::new();
        for (key, value) in params {
            if key == "glue_y" || key == "glue_width" {
                continue;
            }
            let (index, rest) = key
                .split_once('.')
                .and_then(|(i, rest)| Some((i.parse::<usize>().ok()?, rest)))
                .ok_or_else(|| {
                    DeckError::structural("composite parameters", format!("unknown key '{}'", key))
                })?;
            match groups.iter_mut().find(|(i, _)| *i == index) {
                Some((_, group)) => {
                    group.insert(rest.to_string(), *value);
                }
                None => groups.push((index, Params::from([(rest.to_string(), *value)]))),
            }
        }
        groups.sort_by_key(|(i, _)| *i);

        let mut parts = Vec::with_capacity(groups.len());
        for (index, group) in &groups {
            let x = param(group, "x")?;
            let y = param(group, "y")?;
            let mut shapes = Vec::new();
            for kind in ["rect", "circle", "arbitrary"] {
                let prefix = format!("{}.", kind);
                let fields: Params = group
                    .iter()
                    .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|f| (f.to_string(), *v)))
                    .collect();
                if !fields.is_empty() {
                    shapes.push(Shape::from_tagged(kind, &fields)?);
                }
            }
            match shapes.as_slice() {
                [shape] => parts.push(Placed::new(*shape, x, y)),
                _ => {
                    return Err(DeckError::structural(
                        "composite parameters",
                        format!("component {} must name exactly one shape", index),
                    ))
                }
            }
        }

        let section = Composite::new(parts)?;
        match (params.get("glue_y"), params.get("glue_width")) {
            (Some(&y), Some(&width)) => Ok(section.with_glue(GlueInterface { y, width })),
            _ => Ok(section),
        }
    }
}

/// Narrowest total width over the horizontal bands between component edges.
/// Bands with no material are skipped.
fn narrowest_band(parts: &[Placed]) -> Option<f64> {
    let mut edges: Vec<f64> = parts.iter().flat_map(|p| [p.bottom(), p.top()]).collect();
    edges.sort_by(f64::total_cmp);
    edges.dedup_by(|a, b| (*a - *b).abs() <= CONTACT_TOLERANCE);

    edges
        .windows(2)
        .filter_map(|band| {
            let mid = 0.5 * (band[0] + band[1]);
            let width: f64 = parts
                .iter()
                .filter(|p| p.bottom() < mid && mid < p.top())
                .map(|p| p.shape.width_at(mid - p.y))
                .sum();
            (width > 0.0).then_some(width)
        })
        .reduce(f64::min)
}

impl Section for Composite {
    fn area(&self) -> f64 {
        self.area
    }

    fn centroid(&self) -> (f64, f64) {
        self.centroid
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

    fn min_width(&self) -> f64 {
        self.min_width
    }

    fn width_at(&self, y: f64) -> f64 {
        self.parts
            .iter()
            .filter(|p| p.bottom() <= y && y < p.top())
            .map(|p| p.shape.width_at(y - p.y))
            .sum()
    }

    fn area_above(&self, y: f64) -> DeckResult<f64> {
        self.check_y(y)?;
        let mut area = 0.0;
        for p in self.parts_above(y) {
            area += if p.bottom() >= y {
                p.shape.area()
            } else {
                p.shape.area_above(y - p.y)?
            };
        }
        Ok(area)
    }

    /// First moment of everything above `y` about this section's centroid.
    fn q(&self, y: f64) -> DeckResult<f64> {
        self.check_y(y)?;
        let mut q = 0.0;
        for p in self.parts_above(y) {
            let (area, local_centroid) = if p.bottom() >= y {
                (p.shape.area(), p.shape.centroid().1)
            } else {
                p.shape.portion_above(y - p.y)?
            };
            q += area * (p.y + local_centroid - self.centroid.1);
        }
        Ok(q)
    }

    fn params(&self) -> Params {
        if let Some(preset) = &self.preset {
            return preset.params();
        }
        let mut params = Params::new();
        for (i, p) in self.parts.iter().enumerate() {
            params.insert(format!("{}.x", i), p.x);
            params.insert(format!("{}.y", i), p.y);
            let tag = p.shape.tag();
            for (field, value) in p.shape.params() {
                params.insert(format!("{}.{}.{}", i, tag, field), value);
            }
        }
        if let Some(glue) = self.glue {
            params.insert("glue_y".to_string(), glue.y);
            params.insert("glue_width".to_string(), glue.width);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{Circle, Rectangle};

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * b.abs().max(1.0)
    }

    fn rect(b: f64, h: f64) -> Shape {
        Shape::Rectangle(Rectangle::new(b, h))
    }

    #[test]
    fn test_single_child_is_identity() {
        for shape in [rect(3.0, 7.0), Shape::Circle(Circle::new(2.5))] {
            let single = Composite::new(vec![Placed::new(shape, 0.0, 0.0)]).unwrap();
            assert_eq!(single.area(), shape.area());
            assert!(approx_eq(single.centroid().0, shape.centroid().0, 1e-12));
            assert!(approx_eq(single.centroid().1, shape.centroid().1, 1e-12));
            assert!(approx_eq(
                single.moment_of_inertia(),
                shape.moment_of_inertia(),
                1e-12
            ));
            for y in [0.0, 0.5, 1.2, 3.1, 4.9] {
                assert!(approx_eq(single.q(y).unwrap(), shape.q(y).unwrap(), 1e-12));
            }
        }
    }

    #[test]
    fn test_stacked_rectangles_parallel_axis() {
        let (b, h) = (4.0, 3.0);
        let stack = Composite::new(vec![
            Placed::new(rect(b, h), 0.0, 0.0),
            Placed::new(rect(b, h), 0.0, h),
        ])
        .unwrap();
        let one_i = b * h.powi(3) / 12.0;
        let d = h - h / 2.0;
        let expected = 2.0 * one_i + 2.0 * b * h * d * d;
        assert!(approx_eq(stack.moment_of_inertia(), expected, 1e-12));
        // Same as one solid 4 x 6 block
        assert!(approx_eq(expected, b * 216.0 / 12.0, 1e-12));
    }

    #[test]
    fn test_q_matches_solid_block() {
        let stack = Composite::new(vec![
            Placed::new(rect(4.0, 3.0), 0.0, 0.0),
            Placed::new(rect(4.0, 3.0), 0.0, 3.0),
        ])
        .unwrap();
        let solid = Rectangle::new(4.0, 6.0);
        for y in [0.0, 1.0, 2.5, 3.0, 4.5] {
            assert!(approx_eq(stack.q(y).unwrap(), solid.q(y).unwrap(), 1e-12));
            assert!(approx_eq(
                stack.area_above(y).unwrap(),
                solid.area_above(y).unwrap(),
                1e-12
            ));
        }
    }

    #[test]
    fn test_out_of_range_queries() {
        let c = Composite::new(vec![Placed::new(rect(1.0, 2.0), 0.0, 0.0)]).unwrap();
        assert!(matches!(c.q(2.0), Err(DeckError::OutOfRange { .. })));
        assert!(matches!(c.area_above(-1.0), Err(DeckError::OutOfRange { .. })));
        assert!(matches!(c.sub_above(5.0), Err(DeckError::OutOfRange { .. })));
    }

    #[test]
    fn test_empty_composite_rejected() {
        assert!(matches!(
            Composite::new(Vec::new()),
            Err(DeckError::StructuralValidity { .. })
        ));
    }

    #[test]
    fn test_contacts_and_top_component() {
        // Channel: flange on two webs
        let channel = Composite::new(vec![
            Placed::new(rect(1.0, 10.0), 0.0, 0.0),
            Placed::new(rect(1.0, 10.0), 19.0, 0.0),
            Placed::new(rect(20.0, 1.0), 0.0, 10.0),
        ])
        .unwrap();
        assert_eq!(channel.top_component().y, 10.0);
        assert_eq!(channel.webs().len(), 2);
        assert_eq!(channel.min_width(), 2.0);
        assert_eq!(channel.width_at(5.0), 2.0);
    }

    #[test]
    fn test_flange_buckling_cases() {
        let material = Material::matboard();
        let channel = Composite::new(vec![
            Placed::new(rect(1.0, 10.0), 5.0, 0.0),
            Placed::new(rect(1.0, 10.0), 24.0, 0.0),
            Placed::new(rect(30.0, 1.0), 0.0, 10.0),
        ])
        .unwrap();
        let cases = channel.flange_buckling(&material).unwrap();
        let (e, mu) = (material.elastic_modulus, material.poisson_ratio);
        assert!(approx_eq(
            cases.between_webs,
            plate_buckling_stress(FLANGE_BOTH_EDGES_K, e, mu, 1.0, 18.0),
            1e-12
        ));
        assert!(approx_eq(
            cases.overhang,
            plate_buckling_stress(FLANGE_ONE_EDGE_K, e, mu, 1.0, 5.0),
            1e-12
        ));
        let depth = 10.0 - channel.centroid().1;
        assert!(approx_eq(
            cases.web,
            plate_buckling_stress(WEB_FLEXURE_K, e, mu, 1.0, depth),
            1e-12
        ));
        assert_eq!(channel.flexural_buckling_stress(&material), cases.governing());
    }

    #[test]
    fn test_unsupported_flange_never_buckles() {
        let material = Material::matboard();
        let plate = Composite::new(vec![Placed::new(rect(10.0, 1.0), 0.0, 0.0)]).unwrap();
        assert!(plate.flexural_buckling_stress(&material).is_infinite());
        assert!(plate.shear_buckling_stress(&material).is_infinite());
    }

    #[test]
    fn test_sub_above_cuts_and_rebases() {
        let stack = Composite::new(vec![
            Placed::new(rect(4.0, 3.0), 0.0, 0.0),
            Placed::new(rect(2.0, 3.0), 1.0, 3.0),
        ])
        .unwrap();
        let sub = stack.sub_above(2.0).unwrap();
        assert_eq!(sub.parts().len(), 2);
        assert_eq!(sub.height(), 4.0);
        assert!(approx_eq(sub.area(), 4.0 + 6.0, 1e-12));

        let with_circle = Composite::new(vec![
            Placed::new(Shape::Circle(Circle::new(1.0)), 0.0, 0.0),
            Placed::new(rect(2.0, 1.0), 0.0, 2.0),
        ])
        .unwrap();
        assert!(with_circle.sub_above(2.0).is_ok());
        assert!(matches!(
            with_circle.sub_above(1.0),
            Err(DeckError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_params_round_trip() {
        let section = Composite::new(vec![
            Placed::new(rect(4.0, 1.0), 0.0, 0.0),
            Placed::new(Shape::Circle(Circle::new(0.5)), 1.5, 1.0),
        ])
        .unwrap()
        .with_glue(GlueInterface { y: 1.0, width: 1.0 });
        let rebuilt = Composite::from_params(&section.params()).unwrap();
        assert_eq!(rebuilt, section);
    }
}
