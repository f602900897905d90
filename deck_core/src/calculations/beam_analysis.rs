//! Simply-Supported Girder Under a Moving Train
//!
//! Internal forces of a girder pinned at x = 0 and on a roller at x = L,
//! loaded by a train of co-moving axles. The girder's cross-section may be
//! constant or vary along the span.
//!
//! ## Load Cases
//!
//! Every force query takes an explicit [`LoadCase`]: where the first axle is
//! and how heavy the whole train is. The model also keeps a current load case
//! that the train helpers (`place_train`, `move_train`, ...) update, but the
//! analysis functions never read hidden state.
//!
//! ## Sign Convention
//! - Positive moment: tension on bottom fiber (sagging)
//! - Positive shear: left side up, right side down
//! - Axle loads: positive downward
//!
//! ## Example
//! ```rust
//! use deck_core::calculations::beam_analysis::{BeamModel, GirderSection, LoadCase, Train};
//! use deck_core::section::CrossSection;
//!
//! let section = GirderSection::uniform(CrossSection::rectangle(100.0, 75.0));
//! let model = BeamModel::new(1200.0, Train::default(), section, 400.0).unwrap();
//!
//! let case = LoadCase::new(0.0, 400.0);
//! let reactions = model.reactions(&case);
//! assert!((reactions.near + reactions.far - 400.0).abs() < 1e-9);
//!
//! let moments = model.bending_moments(&case).unwrap();
//! assert_eq!(moments[0], 0.0);
//! assert_eq!(*moments.last().unwrap(), 0.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::equations::beam::{bending_stress, far_reaction, shear_flow_stress};
use crate::errors::{DeckError, DeckResult};
use crate::section::{CrossSection, Section};

/// Span of the default deck (mm)
pub const DEFAULT_SPAN: f64 = 1200.0;
/// Axle offsets of the default train (mm)
pub const DEFAULT_AXLE_OFFSETS: [f64; 6] = [172.0, 348.0, 512.0, 688.0, 852.0, 1028.0];
/// Relative axle weights of the default train; the locomotive axles are heavier
pub const DEFAULT_LOAD_DISTRIBUTION: [f64; 6] = [1.35, 1.35, 1.0, 1.0, 1.0, 1.0];

/// Relative tolerance of the equilibrium checks
const CLOSURE_TOLERANCE: f64 = 1e-9;

/// Position and weight of the train for one analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadCase {
    /// Absolute position of the first axle (mm from the near support)
    pub position: f64,
    /// Total weight of the train (N)
    pub magnitude: f64,
}

impl LoadCase {
    pub fn new(position: f64, magnitude: f64) -> Self {
        LoadCase {
            position,
            magnitude,
        }
    }
}

/// Axle layout of the train and how its weight is shared between axles
///
/// Deserializing goes through [`Train::new`], so a train read from a file
/// is checked and normalized like one built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrainData")]
pub struct Train {
    offsets: Vec<f64>,
    fractions: Vec<f64>,
}

/// Unchecked wire form of a [`Train`]
#[derive(Debug, Clone, Deserialize)]
struct TrainData {
    offsets: Vec<f64>,
    fractions: Vec<f64>,
}

impl TryFrom<TrainData> for Train {
    type Error = DeckError;

    fn try_from(data: TrainData) -> DeckResult<Self> {
        Train::new(data.offsets, data.fractions)
    }
}

impl Train {
    /// Create a train from axle offsets and relative axle weights.
    ///
    /// Offsets must be non-decreasing; weights are normalized to sum to one.
    pub fn new(offsets: Vec<f64>, distribution: Vec<f64>) -> DeckResult<Self> {
        if offsets.is_empty() {
            return Err(DeckError::structural("train", "a train needs at least one axle"));
        }
        if offsets.len() != distribution.len() {
            return Err(DeckError::structural(
                "train",
                format!(
                    "{} axle offsets but {} load fractions",
                    offsets.len(),
                    distribution.len()
                ),
            ));
        }
        if offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(DeckError::structural(
                "train",
                "axle offsets must be in increasing order",
            ));
        }
        let total: f64 = distribution.iter().sum();
        if total <= 0.0 || distribution.iter().any(|f| *f < 0.0) {
            return Err(DeckError::structural(
                "train",
                "load fractions must be non-negative with a positive sum",
            ));
        }
        let fractions = distribution.iter().map(|f| f / total).collect();
        Ok(Train { offsets, fractions })
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// Normalized axle weights (sum to one)
    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    /// Distance from the first to the last axle
    pub fn length(&self) -> f64 {
        self.offsets[self.offsets.len() - 1] - self.offsets[0]
    }

    /// Absolute axle positions with the first axle at `case.position`
    pub fn axle_positions(&self, case: &LoadCase) -> Vec<f64> {
        let first = self.offsets[0];
        self.offsets
            .iter()
            .map(|o| case.position + o - first)
            .collect()
    }

    /// Axle loads for the total weight in `case`
    pub fn axle_loads(&self, case: &LoadCase) -> Vec<f64> {
        self.fractions.iter().map(|f| f * case.magnitude).collect()
    }
}

impl Default for Train {
    fn default() -> Self {
        Train {
            offsets: DEFAULT_AXLE_OFFSETS.to_vec(),
            fractions: {
                let total: f64 = DEFAULT_LOAD_DISTRIBUTION.iter().sum();
                DEFAULT_LOAD_DISTRIBUTION.iter().map(|f| f / total).collect()
            },
        }
    }
}

/// Support reactions, positive upward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reactions {
    /// Pin at x = 0
    pub near: f64,
    /// Roller at x = L
    pub far: f64,
}

/// Evenly spaced stations `0, step, ..., length`.
///
/// Fails with a discretization error unless `step` divides `length`.
pub fn position_grid(length: f64, step: f64) -> DeckResult<Vec<f64>> {
    if step <= 0.0 {
        return Err(DeckError::Discretization { step, length });
    }
    let n = length / step;
    let rounded = n.round();
    if (n - rounded).abs() > 1e-9 * n.max(1.0) {
        return Err(DeckError::Discretization { step, length });
    }
    Ok((0..=rounded as usize).map(|i| i as f64 * step).collect())
}

// =============================================================================
// SECTIONS ALONG THE SPAN
// =============================================================================

/// The cross-section of the girder as a function of position
#[derive(Debug, Clone, PartialEq)]
pub enum GirderSection {
    /// Same section over the whole span
    Uniform(CrossSection),
    /// One section per station of an even grid; a position uses the
    /// section of its nearest station
    Sampled {
        step: f64,
        stations: Vec<CrossSection>,
    },
}

impl GirderSection {
    pub fn uniform(section: CrossSection) -> Self {
        GirderSection::Uniform(section)
    }

    /// Sample a position-dependent section at every station of the grid.
    pub fn sampled<F>(span: f64, step: f64, mut section_at: F) -> DeckResult<Self>
    where
        F: FnMut(f64) -> DeckResult<CrossSection>,
    {
        let stations = position_grid(span, step)?
            .into_iter()
            .map(&mut section_at)
            .collect::<DeckResult<Vec<_>>>()?;
        Ok(GirderSection::Sampled { step, stations })
    }

    pub fn section_at(&self, x: f64) -> &CrossSection {
        match self {
            GirderSection::Uniform(section) => section,
            GirderSection::Sampled { step, stations } => {
                let i = (x / step).round().max(0.0) as usize;
                &stations[i.min(stations.len() - 1)]
            }
        }
    }

    /// Every distinct section, in station order
    pub fn sections(&self) -> &[CrossSection] {
        match self {
            GirderSection::Uniform(section) => std::slice::from_ref(section),
            GirderSection::Sampled { stations, .. } => stations,
        }
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self, GirderSection::Uniform(_))
    }
}

/// Section properties the stress formulas need, computed once per section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionProperties {
    /// Distance from the neutral axis to the top fiber
    pub top_fiber: f64,
    /// Distance from the neutral axis to the bottom fiber
    pub bottom_fiber: f64,
    pub moment_of_inertia: f64,
    /// First moment at the neutral axis
    pub q_max: f64,
    pub min_width: f64,
    /// First moment and width at the glued plane, if there is one
    pub glue: Option<(f64, f64)>,
}

impl SectionProperties {
    pub fn of(section: &CrossSection) -> DeckResult<Self> {
        let y_bar = section.centroid().1;
        let glue = match section.glue() {
            Some(g) => Some((section.q(g.y)?, g.width)),
            None => None,
        };
        Ok(SectionProperties {
            top_fiber: section.height() - y_bar,
            bottom_fiber: y_bar,
            moment_of_inertia: section.moment_of_inertia(),
            q_max: section.q_max()?,
            min_width: section.min_width(),
            glue,
        })
    }
}

/// Internal forces where a section is checked
#[derive(Debug, Clone, Copy)]
pub struct Station<'a> {
    /// Index into [`BeamModel::properties`]
    pub index: usize,
    pub x: f64,
    /// Bending moment magnitude governing this station
    pub moment: f64,
    /// Shear force magnitude governing this station
    pub shear: f64,
    pub properties: &'a SectionProperties,
}

/// Stresses at one station
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationStresses {
    /// Compressive stress in the top fiber
    pub compression: f64,
    /// Tensile stress in the bottom fiber
    pub tension: f64,
    /// Shear stress at the neutral axis
    pub shear: f64,
    /// Shear stress along the glued plane
    pub glue: Option<f64>,
}

impl Station<'_> {
    pub fn stresses(&self) -> StationStresses {
        let p = self.properties;
        StationStresses {
            compression: bending_stress(self.moment, p.top_fiber, p.moment_of_inertia),
            tension: bending_stress(self.moment, p.bottom_fiber, p.moment_of_inertia),
            shear: shear_flow_stress(self.shear, p.q_max, p.moment_of_inertia, p.min_width),
            glue: p
                .glue
                .map(|(q, width)| shear_flow_stress(self.shear, q, p.moment_of_inertia, width)),
        }
    }
}

/// Shear force and bending moment envelopes over a whole traversal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForceEnvelope {
    /// (x, max |V|)
    pub shear: Vec<(f64, f64)>,
    /// (x, max M)
    pub moment: Vec<(f64, f64)>,
}

// =============================================================================
// BEAM MODEL
// =============================================================================

/// A simply supported girder with a train of axle loads
#[derive(Debug, Clone)]
pub struct BeamModel {
    span: f64,
    train: Train,
    section: GirderSection,
    properties: Vec<SectionProperties>,
    load: LoadCase,
}

impl BeamModel {
    /// Create a model with the train at its own axle offsets.
    ///
    /// Fails if the train is longer than the span, if a sampled section does
    /// not match the span, or if a section cannot report its shear
    /// properties.
    pub fn new(
        span: f64,
        train: Train,
        section: GirderSection,
        total_load: f64,
    ) -> DeckResult<Self> {
        if span <= 0.0 {
            return Err(DeckError::structural("girder", "span must be positive"));
        }
        if train.length() > span {
            return Err(DeckError::structural(
                "girder",
                format!(
                    "span {} is shorter than the train ({})",
                    span,
                    train.length()
                ),
            ));
        }
        if let GirderSection::Sampled { step, stations } = &section {
            if position_grid(span, *step)?.len() != stations.len() {
                return Err(DeckError::structural(
                    "girder",
                    "sampled sections do not cover the span",
                ));
            }
        }
        let properties = section
            .sections()
            .iter()
            .map(SectionProperties::of)
            .collect::<DeckResult<Vec<_>>>()?;
        let load = LoadCase::new(train.offsets()[0], total_load);
        Ok(BeamModel {
            span,
            train,
            section,
            properties,
            load,
        })
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn train(&self) -> &Train {
        &self.train
    }

    pub fn section(&self) -> &GirderSection {
        &self.section
    }

    /// Precomputed properties, one per section in [`GirderSection::sections`]
    pub fn properties(&self) -> &[SectionProperties] {
        &self.properties
    }

    /// Swap in a new section, keeping the train and its load.
    pub fn set_section(&mut self, section: GirderSection) -> DeckResult<()> {
        let rebuilt = BeamModel::new(self.span, self.train.clone(), section, self.load.magnitude)?;
        self.section = rebuilt.section;
        self.properties = rebuilt.properties;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Train state
    // -------------------------------------------------------------------------

    /// The current load case
    pub fn load_case(&self) -> LoadCase {
        self.load
    }

    /// Put the first axle at absolute position `x`
    pub fn place_train(&mut self, x: f64) {
        self.load.position = x;
    }

    /// Shift every axle by `dx`
    pub fn move_train(&mut self, dx: f64) {
        self.load.position += dx;
    }

    pub fn set_total_load(&mut self, magnitude: f64) {
        self.load.magnitude = magnitude;
    }

    pub fn add_total_load(&mut self, delta: f64) {
        self.load.magnitude += delta;
    }

    pub fn axle_positions(&self, case: &LoadCase) -> Vec<f64> {
        self.train.axle_positions(case)
    }

    pub fn axle_loads(&self, case: &LoadCase) -> Vec<f64> {
        self.train.axle_loads(case)
    }

    /// Distance the first axle travels while the whole train stays on the span
    pub fn travel(&self) -> f64 {
        self.span - self.train.length()
    }

    /// First-axle positions of a traversal: `i·dx` for
    /// `i = 0..=floor(travel / dx)`.
    pub fn train_positions(&self, dx: f64) -> DeckResult<Vec<f64>> {
        if dx <= 0.0 {
            return Err(DeckError::invalid_input(
                "dx",
                dx.to_string(),
                "sweep step must be positive",
            ));
        }
        let count = (self.travel() / dx + 1e-9).floor() as usize + 1;
        Ok((0..count).map(|i| i as f64 * dx).collect())
    }

    // -------------------------------------------------------------------------
    // Internal forces
    // -------------------------------------------------------------------------

    pub fn reactions(&self, case: &LoadCase) -> Reactions {
        let far = far_reaction(
            &self.axle_loads(case),
            &self.axle_positions(case),
            self.span,
        );
        Reactions {
            near: case.magnitude - far,
            far,
        }
    }

    /// Shear just right of the near support and after each axle, followed by
    /// the closing value once the far reaction is added (zero).
    pub fn shear_forces(&self, case: &LoadCase) -> DeckResult<Vec<f64>> {
        let reactions = self.reactions(case);
        let mut shear = Vec::with_capacity(self.train.offsets.len() + 2);
        shear.push(reactions.near);
        for p in self.axle_loads(case) {
            let last = shear[shear.len() - 1];
            shear.push(last - p);
        }
        let closure = shear[shear.len() - 1] + reactions.far;
        if closure.abs() > CLOSURE_TOLERANCE * case.magnitude.abs().max(1.0) {
            return Err(DeckError::internal(format!(
                "shear does not close at the far support (residual {})",
                closure
            )));
        }
        shear.push(0.0);
        Ok(shear)
    }

    /// Moments at the near support, under each axle and at the far support.
    /// Both support values are exactly zero.
    pub fn bending_moments(&self, case: &LoadCase) -> DeckResult<Vec<f64>> {
        let shear = self.shear_forces(case)?;
        let mut stops = Vec::with_capacity(shear.len());
        stops.push(0.0);
        stops.extend(self.axle_positions(case));
        stops.push(self.span);

        let mut moments = vec![0.0];
        for i in 1..stops.len() {
            moments.push(moments[i - 1] + shear[i - 1] * (stops[i] - stops[i - 1]));
        }
        let last = moments.len() - 1;
        let scale = case.magnitude.abs().max(1.0) * self.span;
        if moments[last].abs() > CLOSURE_TOLERANCE * scale {
            return Err(DeckError::internal(format!(
                "moment does not vanish at the far support (residual {})",
                moments[last]
            )));
        }
        moments[last] = 0.0;
        Ok(moments)
    }

    /// Shear force at `x`, taking axles at exactly `x` as not yet passed
    pub fn shear_at(&self, case: &LoadCase, x: f64) -> f64 {
        self.shear_limits(case, x).0
    }

    /// Shear force just left and just right of `x`
    pub fn shear_limits(&self, case: &LoadCase, x: f64) -> (f64, f64) {
        let near = self.reactions(case).near;
        let (mut left, mut right) = (near, near);
        for (p, a) in self
            .axle_loads(case)
            .into_iter()
            .zip(self.axle_positions(case))
        {
            if a < x {
                left -= p;
            }
            if a <= x {
                right -= p;
            }
        }
        (left, right)
    }

    /// Bending moment at `x`
    pub fn moment_at(&self, case: &LoadCase, x: f64) -> f64 {
        let near = self.reactions(case).near;
        let passed: f64 = self
            .axle_loads(case)
            .into_iter()
            .zip(self.axle_positions(case))
            .filter(|(_, a)| *a < x)
            .map(|(p, a)| p * (x - a))
            .sum();
        near * x - passed
    }

    /// Stations whose stresses bound the girder for this load case.
    ///
    /// A uniform girder has one station carrying the peak moment and the
    /// peak shear. A sampled girder has one per grid station with the forces
    /// found there.
    pub fn worst_stations(&self, case: &LoadCase) -> DeckResult<Vec<Station<'_>>> {
        match &self.section {
            GirderSection::Uniform(_) => {
                let moments = self.bending_moments(case)?;
                let shears = self.shear_forces(case)?;
                let (mut x, mut moment) = (0.0, 0.0);
                let stops = self.axle_positions(case);
                for (i, m) in moments.iter().enumerate() {
                    if m.abs() > moment {
                        moment = m.abs();
                        x = if i == 0 {
                            0.0
                        } else {
                            stops.get(i - 1).copied().unwrap_or(self.span)
                        };
                    }
                }
                let shear = shears.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()));
                Ok(vec![Station {
                    index: 0,
                    x,
                    moment,
                    shear,
                    properties: &self.properties[0],
                }])
            }
            GirderSection::Sampled { step, .. } => {
                self.shear_forces(case)?;
                Ok(position_grid(self.span, *step)?
                    .into_iter()
                    .enumerate()
                    .map(|(index, x)| {
                        let (left, right) = self.shear_limits(case, x);
                        Station {
                            index,
                            x,
                            moment: self.moment_at(case, x).abs(),
                            shear: left.abs().max(right.abs()),
                            properties: &self.properties[index],
                        }
                    })
                    .collect())
            }
        }
    }

    /// Peak (compressive, tensile) bending stress over the girder
    pub fn ultimate_stress(&self, case: &LoadCase) -> DeckResult<(f64, f64)> {
        Ok(self
            .worst_stations(case)?
            .iter()
            .map(Station::stresses)
            .fold((0.0, 0.0), |(c, t), s| {
                (f64::max(c, s.compression), f64::max(t, s.tension))
            }))
    }

    /// Peak shear stress at the neutral axis over the girder
    pub fn ultimate_shear_stress(&self, case: &LoadCase) -> DeckResult<f64> {
        Ok(self
            .worst_stations(case)?
            .iter()
            .map(|s| s.stresses().shear)
            .fold(0.0, f64::max))
    }

    /// Peak shear stress along the glued plane, `None` if nothing is glued
    pub fn glue_shear_stress(&self, case: &LoadCase) -> DeckResult<Option<f64>> {
        Ok(self
            .worst_stations(case)?
            .iter()
            .filter_map(|s| s.stresses().glue)
            .reduce(f64::max))
    }

    // -------------------------------------------------------------------------
    // Diagrams
    // -------------------------------------------------------------------------

    /// (x, V) on an even grid
    pub fn shear_force_diagram(&self, case: &LoadCase, step: f64) -> DeckResult<Vec<(f64, f64)>> {
        Ok(position_grid(self.span, step)?
            .into_iter()
            .map(|x| (x, self.shear_at(case, x)))
            .collect())
    }

    /// (x, M) on an even grid
    pub fn bending_moment_diagram(
        &self,
        case: &LoadCase,
        step: f64,
    ) -> DeckResult<Vec<(f64, f64)>> {
        Ok(position_grid(self.span, step)?
            .into_iter()
            .map(|x| (x, self.moment_at(case, x)))
            .collect())
    }

    /// (x, φ) with curvature φ = M / (E·I(x))
    pub fn curvature_diagram(
        &self,
        case: &LoadCase,
        step: f64,
        elastic_modulus: f64,
    ) -> DeckResult<Vec<(f64, f64)>> {
        Ok(self
            .bending_moment_diagram(case, step)?
            .into_iter()
            .map(|(x, m)| {
                let i = self.section.section_at(x).moment_of_inertia();
                (x, m / (elastic_modulus * i))
            })
            .collect())
    }

    /// Largest |V| and M seen at each grid station while a train of weight
    /// `magnitude` crosses in steps of `dx`.
    pub fn force_envelope(&self, magnitude: f64, dx: f64, step: f64) -> DeckResult<ForceEnvelope> {
        let grid = position_grid(self.span, step)?;
        let mut shear = vec![0.0_f64; grid.len()];
        let mut moment = vec![0.0_f64; grid.len()];
        for position in self.train_positions(dx)? {
            let case = LoadCase::new(position, magnitude);
            for (i, &x) in grid.iter().enumerate() {
                let (left, right) = self.shear_limits(&case, x);
                shear[i] = shear[i].max(left.abs()).max(right.abs());
                moment[i] = moment[i].max(self.moment_at(&case, x));
            }
        }
        Ok(ForceEnvelope {
            shear: grid.iter().copied().zip(shear).collect(),
            moment: grid.into_iter().zip(moment).collect(),
        })
    }
}
