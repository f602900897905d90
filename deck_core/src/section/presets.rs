//! # Named Composite Presets
//!
//! Parameterized composites that come up again and again in deck design:
//! a closed hollow box, a symmetric I-beam, and the trapezoidal built-up
//! girder with glue tabs under the deck plate.
//!
//! A preset composite reports its own short parameter set from
//! [`Section::params`](super::Section::params) instead of the per-component
//! keys, so the search can vary `height` without knowing where the webs go.
//!
//! ```text
//!   ==============================   ← deck plate (top × thickness)
//!     [  ]=====        =====[  ]     ← glue tabs (outreach × thickness)
//!     [  ]                  [  ]
//!     [  ]                  [  ]     ← webs
//!     ======================         ← bottom flange (bottom × thickness)
//! ```

use serde::{Deserialize, Serialize};

use super::composite::{Composite, GlueInterface, Placed};
use super::primitives::Rectangle;
use super::{param, Params, Shape};
use crate::errors::{DeckError, DeckResult};

fn rect(b: f64, h: f64, x: f64, y: f64) -> Placed {
    Placed::new(Shape::Rectangle(Rectangle::new(b, h)), x, y)
}

/// The parameter set a preset composite was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "preset", rename_all = "snake_case")]
pub enum Preset {
    HollowBox { b: f64, h: f64, thickness: f64 },
    IBeam { d: f64, bf: f64, t: f64, bw: f64 },
    Girder(GirderParams),
}

impl Preset {
    /// Generate the composite for this parameter set.
    pub fn build(&self) -> DeckResult<Composite> {
        let section = match *self {
            Preset::HollowBox { b, h, thickness } => Composite::new(vec![
                rect(b, thickness, 0.0, 0.0),
                rect(thickness, h - 2.0 * thickness, 0.0, thickness),
                rect(thickness, h - 2.0 * thickness, b - thickness, thickness),
                rect(b, thickness, 0.0, h - thickness),
            ])?,
            Preset::IBeam { d, bf, t, bw } => Composite::new(vec![
                rect(bf, t, 0.0, 0.0),
                rect(bw, d - 2.0 * t, 0.5 * (bf - bw), t),
                rect(bf, t, 0.0, d - t),
            ])?,
            Preset::Girder(g) => g.compose()?,
        };
        Ok(section.with_preset(*self))
    }

    pub fn params(&self) -> Params {
        match *self {
            Preset::HollowBox { b, h, thickness } => Params::from([
                ("b".to_string(), b),
                ("h".to_string(), h),
                ("thickness".to_string(), thickness),
            ]),
            Preset::IBeam { d, bf, t, bw } => Params::from([
                ("d".to_string(), d),
                ("bf".to_string(), bf),
                ("t".to_string(), t),
                ("bw".to_string(), bw),
            ]),
            Preset::Girder(g) => g.params(),
        }
    }

    pub fn hollow_box_from_params(params: &Params) -> DeckResult<Preset> {
        reject_unknown(params, &["b", "h", "thickness"], "hollow box")?;
        Ok(Preset::HollowBox {
            b: param(params, "b")?,
            h: param(params, "h")?,
            thickness: param(params, "thickness")?,
        })
    }

    pub fn i_beam_from_params(params: &Params) -> DeckResult<Preset> {
        reject_unknown(params, &["d", "bf", "t", "bw"], "I-beam")?;
        Ok(Preset::IBeam {
            d: param(params, "d")?,
            bf: param(params, "bf")?,
            t: param(params, "t")?,
            bw: param(params, "bw")?,
        })
    }
}

fn reject_unknown(params: &Params, known: &[&str], subject: &str) -> DeckResult<()> {
    match params.keys().find(|k| !known.contains(&k.as_str())) {
        Some(key) => Err(DeckError::structural(
            format!("{} parameters", subject),
            format!("unknown parameter '{}'", key),
        )),
        None => Ok(()),
    }
}

/// Dimensions of the trapezoidal built-up girder (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GirderParams {
    /// Width of the deck plate
    pub top: f64,
    /// Width of the bottom flange
    pub bottom: f64,
    /// Height of the top of the webs above the bottom of the section
    pub height: f64,
    /// Sheet thickness, shared by every component
    pub thickness: f64,
    /// Width of each glue tab
    pub outreach: f64,
    /// Whether the deck plate is glued onto the webs and tabs
    pub glue: bool,
}

impl Default for GirderParams {
    fn default() -> Self {
        GirderParams {
            top: 100.0,
            bottom: 80.0,
            height: 75.0,
            thickness: 1.27,
            outreach: 5.0,
            glue: true,
        }
    }
}

impl GirderParams {
    const KEYS: [&'static str; 8] = [
        "top",
        "bottom",
        "height",
        "thickness",
        "outreach",
        "glue",
        "glue_y",
        "glue_width",
    ];

    /// The glued plane: the underside of the deck plate, across both webs
    /// and both tabs.
    pub fn glue_interface(&self) -> GlueInterface {
        GlueInterface {
            y: self.height,
            width: 2.0 * (self.thickness + self.outreach),
        }
    }

    fn compose(&self) -> DeckResult<Composite> {
        let t = self.thickness;
        let left = 0.5 * (self.top - self.bottom);
        let right = 0.5 * (self.top + self.bottom);
        let section = Composite::new(vec![
            rect(self.top, t, 0.0, self.height),
            rect(self.outreach, t, left + t, self.height - t),
            rect(self.outreach, t, right - t - self.outreach, self.height - t),
            rect(t, self.height - t, left, t),
            rect(t, self.height - t, right - t, t),
            rect(self.bottom, t, left, 0.0),
        ])?;
        Ok(if self.glue {
            section.with_glue(self.glue_interface())
        } else {
            section
        })
    }

    /// Named parameters, including the derived glue plane when glued.
    pub fn params(&self) -> Params {
        let mut params = Params::from([
            ("top".to_string(), self.top),
            ("bottom".to_string(), self.bottom),
            ("height".to_string(), self.height),
            ("thickness".to_string(), self.thickness),
            ("outreach".to_string(), self.outreach),
            ("glue".to_string(), if self.glue { 1.0 } else { 0.0 }),
        ]);
        if self.glue {
            let glue = self.glue_interface();
            params.insert("glue_y".to_string(), glue.y);
            params.insert("glue_width".to_string(), glue.width);
        }
        params
    }

    /// Read girder dimensions; missing entries take the default girder's
    /// values and the derived glue entries are recomputed, not read.
    pub fn from_params(params: &Params) -> DeckResult<Self> {
        reject_unknown(params, &Self::KEYS, "girder")?;
        let base = GirderParams::default();
        let get = |key: &str, fallback: f64| params.get(key).copied().unwrap_or(fallback);
        Ok(GirderParams {
            top: get("top", base.top),
            bottom: get("bottom", base.bottom),
            height: get("height", base.height),
            thickness: get("thickness", base.thickness),
            outreach: get("outreach", base.outreach),
            glue: get("glue", 1.0) != 0.0,
        })
    }
}
