//! # Cross-Section Geometry
//!
//! Shapes a girder can be cut into, and the section properties the beam
//! model needs from them.
//!
//! ## Structure
//!
//! - [`Section`] - The capability set every shape provides
//! - [`Shape`] - A primitive: [`Rectangle`], [`Circle`] or [`Arbitrary`]
//! - [`Composite`] - Primitives placed at offsets, with the named
//!   [`Preset`]s built on top
//! - [`CrossSection`] - Any of the above, serialized as `{kind, params}`
//!
//! ## Coordinates
//!
//! Each shape has its own local frame with the origin at the bottom-left of
//! its bounding box and `y` upward. Cut queries (`area_above`, `q`,
//! `sub_above`) accept `0 <= y < height()`.
//!
//! ## Example
//!
//! ```rust
//! use deck_core::section::{CrossSection, SectionKind, Section};
//!
//! let girder = CrossSection::girder(Default::default()).unwrap();
//! let rebuilt = SectionKind::Girder.build(&girder.params()).unwrap();
//! assert_eq!(rebuilt.moment_of_inertia(), girder.moment_of_inertia());
//! ```

pub mod composite;
pub mod presets;
pub mod primitives;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use composite::{Composite, Contact, FlangeBuckling, GlueInterface, Placed, CONTACT_TOLERANCE};
pub use presets::{GirderParams, Preset};
pub use primitives::{Arbitrary, Circle, Rectangle};

use crate::errors::{DeckError, DeckResult};
use crate::materials::Material;

/// Named shape parameters, ordered by name.
pub type Params = BTreeMap<String, f64>;

/// Look up a required parameter.
pub(crate) fn param(params: &Params, key: &str) -> DeckResult<f64> {
    params.get(key).copied().ok_or_else(|| {
        DeckError::structural("section parameters", format!("missing parameter '{}'", key))
    })
}

/// Properties every cross-section provides.
pub trait Section {
    fn area(&self) -> f64;

    /// `(x̄, ȳ)` in the shape's local frame
    fn centroid(&self) -> (f64, f64);

    /// Second moment of area about the horizontal centroidal axis
    fn moment_of_inertia(&self) -> f64;

    fn width(&self) -> f64;

    fn height(&self) -> f64;

    /// Narrowest width resisting horizontal shear
    fn min_width(&self) -> f64 {
        self.width()
    }

    /// Material width along the horizontal line at local height `y`
    fn width_at(&self, _y: f64) -> f64 {
        self.width()
    }

    /// Area of the part above the cut at `y`
    fn area_above(&self, y: f64) -> DeckResult<f64>;

    /// First moment of the area above `y` about the section's centroid
    fn q(&self, y: f64) -> DeckResult<f64>;

    /// First moment at the neutral axis, where shear stress peaks
    fn q_max(&self) -> DeckResult<f64> {
        self.q(self.centroid().1)
    }

    /// The parameter mapping the shape can be rebuilt from
    fn params(&self) -> Params;

    /// Fail unless `0 <= y < height()`.
    fn check_y(&self, y: f64) -> DeckResult<()> {
        let height = self.height();
        if (0.0..height).contains(&y) {
            Ok(())
        } else {
            Err(DeckError::out_of_range("y", y, 0.0, height))
        }
    }
}

// =============================================================================
// LEAF SHAPES
// =============================================================================

/// A primitive shape, the only thing a [`Composite`] can hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Rectangle(Rectangle),
    Circle(Circle),
    Arbitrary(Arbitrary),
}

impl Shape {
    /// Short tag used in composite parameter keys
    pub fn tag(&self) -> &'static str {
        match self {
            Shape::Rectangle(_) => "rect",
            Shape::Circle(_) => "circle",
            Shape::Arbitrary(_) => "arbitrary",
        }
    }

    pub(crate) fn from_tagged(tag: &str, params: &Params) -> DeckResult<Shape> {
        match tag {
            "rect" => Ok(Shape::Rectangle(Rectangle::from_params(params)?)),
            "circle" => Ok(Shape::Circle(Circle::from_params(params)?)),
            "arbitrary" => Ok(Shape::Arbitrary(Arbitrary::from_params(params)?)),
            other => Err(DeckError::structural(
                "composite parameters",
                format!("unknown shape tag '{}'", other),
            )),
        }
    }

    pub fn sub_above(&self, y: f64) -> DeckResult<Shape> {
        Ok(match self {
            Shape::Rectangle(r) => Shape::Rectangle(r.sub_above(y)?),
            Shape::Circle(c) => Shape::Circle(c.sub_above(y)?),
            Shape::Arbitrary(a) => Shape::Arbitrary(a.sub_above(y)?),
        })
    }

    /// Area above the cut and the local height of its centroid
    pub fn portion_above(&self, y: f64) -> DeckResult<(f64, f64)> {
        match self {
            Shape::Rectangle(r) => r.portion_above(y),
            Shape::Circle(c) => c.portion_above(y),
            Shape::Arbitrary(a) => a.portion_above(y),
        }
    }

    fn as_section(&self) -> &dyn Section {
        match self {
            Shape::Rectangle(r) => r,
            Shape::Circle(c) => c,
            Shape::Arbitrary(a) => a,
        }
    }
}

impl Section for Shape {
    fn area(&self) -> f64 {
        self.as_section().area()
    }

    fn centroid(&self) -> (f64, f64) {
        self.as_section().centroid()
    }

    fn moment_of_inertia(&self) -> f64 {
        self.as_section().moment_of_inertia()
    }

    fn width(&self) -> f64 {
        self.as_section().width()
    }

    fn height(&self) -> f64 {
        self.as_section().height()
    }

    fn min_width(&self) -> f64 {
        self.as_section().min_width()
    }

    fn width_at(&self, y: f64) -> f64 {
        self.as_section().width_at(y)
    }

    fn area_above(&self, y: f64) -> DeckResult<f64> {
        self.as_section().area_above(y)
    }

    fn q(&self, y: f64) -> DeckResult<f64> {
        self.as_section().q(y)
    }

    fn params(&self) -> Params {
        self.as_section().params()
    }
}

impl TryFrom<CrossSection> for Shape {
    type Error = DeckError;

    fn try_from(section: CrossSection) -> DeckResult<Shape> {
        match section {
            CrossSection::Rectangle(r) => Ok(Shape::Rectangle(r)),
            CrossSection::Circle(c) => Ok(Shape::Circle(c)),
            CrossSection::Arbitrary(a) => Ok(Shape::Arbitrary(a)),
            CrossSection::Composite(_) => Err(DeckError::structural(
                "composite section",
                "a composite cannot contain another composite",
            )),
        }
    }
}

// =============================================================================
// CROSS-SECTION
// =============================================================================

/// Names a family of sections that can be built from a [`Params`] mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Rectangle,
    Circle,
    Arbitrary,
    Composite,
    HollowBox,
    IBeam,
    Girder,
}

impl SectionKind {
    /// Build a section of this kind from named parameters.
    pub fn build(&self, params: &Params) -> DeckResult<CrossSection> {
        Ok(match self {
            SectionKind::Rectangle => CrossSection::Rectangle(Rectangle::from_params(params)?),
            SectionKind::Circle => CrossSection::Circle(Circle::from_params(params)?),
            SectionKind::Arbitrary => CrossSection::Arbitrary(Arbitrary::from_params(params)?),
            SectionKind::Composite => CrossSection::Composite(Composite::from_params(params)?),
            SectionKind::HollowBox => {
                CrossSection::Composite(Preset::hollow_box_from_params(params)?.build()?)
            }
            SectionKind::IBeam => {
                CrossSection::Composite(Preset::i_beam_from_params(params)?.build()?)
            }
            SectionKind::Girder => CrossSection::Composite(
                Preset::Girder(GirderParams::from_params(params)?).build()?,
            ),
        })
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionKind::Rectangle => "rectangle",
            SectionKind::Circle => "circle",
            SectionKind::Arbitrary => "arbitrary",
            SectionKind::Composite => "composite",
            SectionKind::HollowBox => "hollow box",
            SectionKind::IBeam => "I-beam",
            SectionKind::Girder => "girder",
        };
        write!(f, "{}", name)
    }
}

/// Serialized form of a [`CrossSection`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    pub kind: SectionKind,
    pub params: Params,
}

/// Any cross-section the beam model accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SectionDescriptor", try_from = "SectionDescriptor")]
pub enum CrossSection {
    Rectangle(Rectangle),
    Circle(Circle),
    Arbitrary(Arbitrary),
    Composite(Composite),
}

impl CrossSection {
    pub fn rectangle(b: f64, h: f64) -> Self {
        CrossSection::Rectangle(Rectangle::new(b, h))
    }

    pub fn circle(r: f64) -> Self {
        CrossSection::Circle(Circle::new(r))
    }

    /// Combine sections at offsets. Only primitives may be combined.
    pub fn composite(parts: Vec<(CrossSection, f64, f64)>) -> DeckResult<Self> {
        let placed = parts
            .into_iter()
            .map(|(section, x, y)| Ok(Placed::new(Shape::try_from(section)?, x, y)))
            .collect::<DeckResult<Vec<_>>>()?;
        Ok(CrossSection::Composite(Composite::new(placed)?))
    }

    pub fn hollow_box(b: f64, h: f64, thickness: f64) -> DeckResult<Self> {
        Ok(CrossSection::Composite(
            Preset::HollowBox { b, h, thickness }.build()?,
        ))
    }

    pub fn i_beam(d: f64, bf: f64, t: f64, bw: f64) -> DeckResult<Self> {
        Ok(CrossSection::Composite(Preset::IBeam { d, bf, t, bw }.build()?))
    }

    pub fn girder(params: GirderParams) -> DeckResult<Self> {
        Ok(CrossSection::Composite(Preset::Girder(params).build()?))
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            CrossSection::Rectangle(_) => SectionKind::Rectangle,
            CrossSection::Circle(_) => SectionKind::Circle,
            CrossSection::Arbitrary(_) => SectionKind::Arbitrary,
            CrossSection::Composite(c) => match c.preset() {
                None => SectionKind::Composite,
                Some(Preset::HollowBox { .. }) => SectionKind::HollowBox,
                Some(Preset::IBeam { .. }) => SectionKind::IBeam,
                Some(Preset::Girder(_)) => SectionKind::Girder,
            },
        }
    }

    pub fn sub_above(&self, y: f64) -> DeckResult<CrossSection> {
        Ok(match self {
            CrossSection::Rectangle(r) => CrossSection::Rectangle(r.sub_above(y)?),
            CrossSection::Circle(c) => CrossSection::Circle(c.sub_above(y)?),
            CrossSection::Arbitrary(a) => CrossSection::Arbitrary(a.sub_above(y)?),
            CrossSection::Composite(c) => CrossSection::Composite(c.sub_above(y)?),
        })
    }

    /// Declared glue interface; only composites can be glued.
    pub fn glue(&self) -> Option<GlueInterface> {
        match self {
            CrossSection::Composite(c) => c.glue(),
            _ => None,
        }
    }

    /// Plate buckling stress of the top flange. Solid shapes do not buckle
    /// locally.
    pub fn flexural_buckling_stress(&self, material: &Material) -> f64 {
        match self {
            CrossSection::Composite(c) => c.flexural_buckling_stress(material),
            _ => f64::INFINITY,
        }
    }

    /// Shear buckling stress of the webs. Solid shapes do not buckle locally.
    pub fn shear_buckling_stress(&self, material: &Material) -> f64 {
        match self {
            CrossSection::Composite(c) => c.shear_buckling_stress(material),
            _ => f64::INFINITY,
        }
    }

    fn as_section(&self) -> &dyn Section {
        match self {
            CrossSection::Rectangle(r) => r,
            CrossSection::Circle(c) => c,
            CrossSection::Arbitrary(a) => a,
            CrossSection::Composite(c) => c,
        }
    }
}

impl Section for CrossSection {
    fn area(&self) -> f64 {
        self.as_section().area()
    }

    fn centroid(&self) -> (f64, f64) {
        self.as_section().centroid()
    }

    fn moment_of_inertia(&self) -> f64 {
        self.as_section().moment_of_inertia()
    }

    fn width(&self) -> f64 {
        self.as_section().width()
    }

    fn height(&self) -> f64 {
        self.as_section().height()
    }

    fn min_width(&self) -> f64 {
        self.as_section().min_width()
    }

    fn width_at(&self, y: f64) -> f64 {
        self.as_section().width_at(y)
    }

    fn area_above(&self, y: f64) -> DeckResult<f64> {
        self.as_section().area_above(y)
    }

    fn q(&self, y: f64) -> DeckResult<f64> {
        self.as_section().q(y)
    }

    fn params(&self) -> Params {
        self.as_section().params()
    }
}

impl From<CrossSection> for SectionDescriptor {
    fn from(section: CrossSection) -> Self {
        SectionDescriptor {
            kind: section.kind(),
            params: section.params(),
        }
    }
}

impl TryFrom<SectionDescriptor> for CrossSection {
    type Error = DeckError;

    fn try_from(descriptor: SectionDescriptor) -> DeckResult<CrossSection> {
        descriptor.kind.build(&descriptor.params)
    }
}
