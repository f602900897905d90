//! # Safety Evaluation
//!
//! Runs a train across a [`BeamModel`] and turns the stresses at every stop
//! into safety factors, one series per failure mode.
//!
//! Safety factor = capacity / demand. Capacities are material strengths for
//! compression, tension, shear and glue, and geometric plate-buckling
//! stresses for the two buckling modes. A factor is infinite where the
//! demand is zero.
//!
//! ## Maximum Load
//!
//! Every stress is proportional to the train's weight, so every factor is
//! inversely proportional to it. The smallest factor found with a 1 N train
//! is therefore the weight at which that factor would reach 1.
//!
//! ## Example
//!
//! ```rust
//! use deck_core::calculations::beam_analysis::{BeamModel, GirderSection, Train};
//! use deck_core::calculations::evaluation::SafetyEvaluator;
//! use deck_core::materials::Material;
//! use deck_core::section::{CrossSection, GirderParams};
//!
//! let section = CrossSection::girder(GirderParams::default()).unwrap();
//! let model = BeamModel::new(1200.0, Train::default(), GirderSection::uniform(section), 400.0)
//!     .unwrap();
//! let material = Material::matboard();
//!
//! let evaluator = SafetyEvaluator::new(&model, &material);
//! let limit = evaluator.maximum_load(10.0).unwrap();
//! println!("Fails at {:.0} N by {}", limit.load, limit.mode);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::beam_analysis::{BeamModel, LoadCase};
use crate::errors::DeckResult;
use crate::materials::Material;

/// Independent ways the girder can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Crushing of the top fiber
    Compression,
    /// Rupture of the bottom fiber
    Tension,
    /// Shear of the material at the neutral axis
    Shear,
    /// Shear along the glued plane
    Glue,
    /// Local buckling of the compressed top flange or web
    FlexuralBuckling,
    /// Shear buckling of the webs
    ShearBuckling,
}

impl FailureMode {
    pub const ALL: [FailureMode; 6] = [
        FailureMode::Compression,
        FailureMode::Tension,
        FailureMode::Shear,
        FailureMode::Glue,
        FailureMode::FlexuralBuckling,
        FailureMode::ShearBuckling,
    ];
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureMode::Compression => "compression",
            FailureMode::Tension => "tension",
            FailureMode::Shear => "shear",
            FailureMode::Glue => "glue shear",
            FailureMode::FlexuralBuckling => "flexural buckling",
            FailureMode::ShearBuckling => "shear buckling",
        };
        write!(f, "{}", name)
    }
}

/// Per-mode safety factor series over one traversal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetySweep {
    /// Train step used for the traversal
    pub dx: f64,
    /// First-axle position of each stop
    pub positions: Vec<f64>,
    /// One factor per stop, for every mode that applies to the girder
    pub factors: BTreeMap<FailureMode, Vec<f64>>,
}

impl SafetySweep {
    /// Lowest factor of one mode over the traversal
    pub fn minimum(&self, mode: FailureMode) -> Option<f64> {
        self.factors
            .get(&mode)
            .and_then(|series| series.iter().copied().reduce(f64::min))
    }

    /// The mode with the lowest factor anywhere, and that factor.
    /// Ties go to the mode listed first in [`FailureMode`].
    pub fn governing(&self) -> Option<(FailureMode, f64)> {
        let mut best: Option<(FailureMode, f64)> = None;
        for mode in self.factors.keys() {
            if let Some(min) = self.minimum(*mode) {
                if best.map_or(true, |(_, b)| min < b) {
                    best = Some((*mode, min));
                }
            }
        }
        best
    }

    /// Position ranges where any mode falls below `threshold`, as closed
    /// intervals of `index · dx`.
    pub fn dead_zones(&self, threshold: f64) -> Vec<(f64, f64)> {
        let mask: Vec<bool> = (0..self.positions.len())
            .map(|i| {
                self.factors
                    .values()
                    .any(|series| series.get(i).is_some_and(|f| *f < threshold))
            })
            .collect();
        intervals(&mask, self.dx)
    }
}

/// Maximal runs of `true` as closed `(start, end)` intervals scaled by `dx`.
pub fn intervals(mask: &[bool], dx: f64) -> Vec<(f64, f64)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &flag) in mask.iter().enumerate() {
        match (flag, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s as f64 * dx, (i - 1) as f64 * dx));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s as f64 * dx, (mask.len() - 1) as f64 * dx));
    }
    runs
}

/// The train weight at which the girder first fails
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaximumLoad {
    /// Total train weight (N)
    pub load: f64,
    /// Mode reaching a factor of one at that weight
    pub mode: FailureMode,
}

/// Buckling capacities of one section, precomputed per material
#[derive(Debug, Clone, Copy, PartialEq)]
struct BucklingCapacity {
    flexural: f64,
    shear: f64,
}

#[inline]
fn factor(capacity: f64, demand: f64) -> f64 {
    if demand <= 0.0 {
        f64::INFINITY
    } else {
        capacity / demand
    }
}

/// Safety factors of a girder under its train
///
/// Borrows the model and never changes its load case: every sweep works on
/// explicit [`LoadCase`]s.
#[derive(Debug, Clone)]
pub struct SafetyEvaluator<'a> {
    model: &'a BeamModel,
    material: &'a Material,
    threshold: f64,
    buckling: Vec<BucklingCapacity>,
    glued: bool,
}

impl<'a> SafetyEvaluator<'a> {
    pub fn new(model: &'a BeamModel, material: &'a Material) -> Self {
        let buckling = model
            .section()
            .sections()
            .iter()
            .map(|s| BucklingCapacity {
                flexural: s.flexural_buckling_stress(material),
                shear: s.shear_buckling_stress(material),
            })
            .collect();
        let glued = model.properties().iter().any(|p| p.glue.is_some());
        SafetyEvaluator {
            model,
            material,
            threshold: 1.0,
            buckling,
            glued,
        }
    }

    /// Factor below which a position counts as failing (default 1.0)
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn model(&self) -> &BeamModel {
        self.model
    }

    pub fn material(&self) -> &Material {
        self.material
    }

    /// Modes that apply to this girder; glue only if a section is glued
    pub fn modes(&self) -> Vec<FailureMode> {
        FailureMode::ALL
            .into_iter()
            .filter(|m| *m != FailureMode::Glue || self.glued)
            .collect()
    }

    /// Safety factor of every applicable mode for one load case
    pub fn safety_factors(&self, case: &LoadCase) -> DeckResult<BTreeMap<FailureMode, f64>> {
        let mut factors: BTreeMap<FailureMode, f64> = self
            .modes()
            .into_iter()
            .map(|m| (m, f64::INFINITY))
            .collect();
        let m = self.material;

        for station in self.model.worst_stations(case)? {
            let stress = station.stresses();
            let buckling = self.buckling[station.index];
            let mut lower = |mode: FailureMode, value: f64| {
                if let Some(f) = factors.get_mut(&mode) {
                    *f = f.min(value);
                }
            };
            lower(
                FailureMode::Compression,
                factor(m.compressive_strength, stress.compression),
            );
            lower(
                FailureMode::Tension,
                factor(m.tensile_strength, stress.tension),
            );
            lower(FailureMode::Shear, factor(m.shear_strength, stress.shear));
            if let Some(glue) = stress.glue {
                lower(FailureMode::Glue, factor(m.glue_strength, glue));
            }
            lower(
                FailureMode::FlexuralBuckling,
                factor(buckling.flexural, stress.compression),
            );
            lower(
                FailureMode::ShearBuckling,
                factor(buckling.shear, stress.shear),
            );
        }
        Ok(factors)
    }

    /// Run a train of weight `magnitude` across the span in steps of `dx`.
    pub fn sweep(&self, dx: f64, magnitude: f64) -> DeckResult<SafetySweep> {
        let positions = self.model.train_positions(dx)?;
        let mut factors: BTreeMap<FailureMode, Vec<f64>> = self
            .modes()
            .into_iter()
            .map(|m| (m, Vec::with_capacity(positions.len())))
            .collect();

        for &position in &positions {
            let at = self.safety_factors(&LoadCase::new(position, magnitude))?;
            for (mode, value) in at {
                if let Some(series) = factors.get_mut(&mode) {
                    series.push(value);
                }
            }
        }

        debug!(
            stops = positions.len(),
            dx,
            magnitude,
            "swept train across girder"
        );
        Ok(SafetySweep {
            dx,
            positions,
            factors,
        })
    }

    /// Sweep with the train weight of the model's current load case.
    pub fn pass_train(&self, dx: f64) -> DeckResult<SafetySweep> {
        self.sweep(dx, self.model.load_case().magnitude)
    }

    /// Position ranges of a sweep where some factor is below the threshold
    pub fn dead_zones(&self, sweep: &SafetySweep) -> Vec<(f64, f64)> {
        sweep.dead_zones(self.threshold)
    }

    /// Heaviest train the girder carries, and the mode that limits it.
    pub fn maximum_load(&self, dx: f64) -> DeckResult<MaximumLoad> {
        let sweep = self.sweep(dx, 1.0)?;
        let (mode, load) = sweep.governing().unwrap_or((FailureMode::Compression, f64::INFINITY));
        debug!(load, %mode, "maximum load");
        Ok(MaximumLoad { load, mode })
    }
}
