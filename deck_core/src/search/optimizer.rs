//! # Girder Section Optimizer
//!
//! Connects the search to the safety evaluator: a [`SectionDesign`] turns a
//! candidate's parameters into a girder, the evaluator scores it by the
//! heaviest train it carries, and the winning girder is installed in the
//! optimizer's model.
//!
//! ## Zoned Designs
//!
//! A zoned design varies the section along the span. Each [`Zone`] maps base
//! parameter names to search parameters that replace them inside the zone:
//!
//! ```text
//! zone 400 < x < 800: { "height": "height2" }
//!
//!   x:      0 ──────── 400 ════════ 800 ──────── 1200
//!   height: height      height2      height
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{run, ParameterRange, ParameterSpace, SearchOutcome, Strategy};
use crate::calculations::beam_analysis::{BeamModel, GirderSection};
use crate::calculations::evaluation::SafetyEvaluator;
use crate::errors::{DeckError, DeckResult};
use crate::materials::Material;
use crate::section::{CrossSection, Params, Section, SectionKind};

/// Part of the span where some parameters take zone-specific values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone applies for `start < x < end`
    pub start: f64,
    pub end: f64,
    /// Base parameter name -> parameter that replaces it in this zone
    pub overrides: BTreeMap<String, String>,
}

impl Zone {
    pub fn contains(&self, x: f64) -> bool {
        self.start < x && x < self.end
    }
}

/// A section family whose cross-section changes along the span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonedDesign {
    pub kind: SectionKind,
    /// Spacing of the stations the girder is sampled at
    pub station_step: f64,
    pub zones: Vec<Zone>,
}

impl ZonedDesign {
    /// Parameters of the section at `x`, with zone parameters applied and
    /// removed.
    pub fn params_at(&self, params: &Params, x: f64) -> DeckResult<Params> {
        let mut local = params.clone();
        for zone in &self.zones {
            for replacement in zone.overrides.values() {
                local.remove(replacement);
            }
        }
        for zone in self.zones.iter().filter(|z| z.contains(x)) {
            for (base, replacement) in &zone.overrides {
                let value = params.get(replacement).copied().ok_or_else(|| {
                    DeckError::structural(
                        "zoned design",
                        format!("missing zone parameter '{}'", replacement),
                    )
                })?;
                local.insert(base.clone(), value);
            }
        }
        Ok(local)
    }

    /// Sample the zoned girder, building each distinct section once.
    pub fn girder_section(&self, params: &Params, span: f64) -> DeckResult<GirderSection> {
        let mut built: Vec<(Vec<bool>, CrossSection)> = Vec::new();
        GirderSection::sampled(span, self.station_step, |x| {
            let signature: Vec<bool> = self.zones.iter().map(|z| z.contains(x)).collect();
            if let Some((_, section)) = built.iter().find(|(s, _)| *s == signature) {
                return Ok(section.clone());
            }
            let section = self.kind.build(&self.params_at(params, x)?)?;
            built.push((signature, section.clone()));
            Ok(section)
        })
    }
}

/// How candidate parameters become a girder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "design", rename_all = "snake_case")]
pub enum SectionDesign {
    /// One section of this kind over the whole span
    Uniform { kind: SectionKind },
    Zoned(ZonedDesign),
}

impl SectionDesign {
    pub fn girder_section(&self, params: &Params, span: f64) -> DeckResult<GirderSection> {
        match self {
            SectionDesign::Uniform { kind } => Ok(GirderSection::uniform(kind.build(params)?)),
            SectionDesign::Zoned(zoned) => zoned.girder_section(params, span),
        }
    }
}

/// Searches for the girder section carrying the heaviest train
#[derive(Debug, Clone)]
pub struct BeamOptimizer {
    model: BeamModel,
    material: Material,
    design: SectionDesign,
    dx: f64,
}

impl BeamOptimizer {
    pub fn new(model: BeamModel, material: Material, design: SectionDesign) -> Self {
        BeamOptimizer {
            model,
            material,
            design,
            dx: 1.0,
        }
    }

    /// Train step of every evaluation (default 1 mm)
    pub fn with_dx(mut self, dx: f64) -> Self {
        self.dx = dx;
        self
    }

    pub fn model(&self) -> &BeamModel {
        &self.model
    }

    pub fn into_model(self) -> BeamModel {
        self.model
    }

    /// Maximum train weight of the girder built from `params`.
    pub fn load_criterion(&self, params: &Params) -> DeckResult<f64> {
        let section = self.design.girder_section(params, self.model.span())?;
        let candidate = BeamModel::new(
            self.model.span(),
            self.model.train().clone(),
            section,
            self.model.load_case().magnitude,
        )?;
        let evaluator = SafetyEvaluator::new(&candidate, &self.material);
        Ok(evaluator.maximum_load(self.dx)?.load)
    }

    /// Ranges of half to one and a half times each parameter of the current
    /// section, skipping derived and switch parameters.
    ///
    /// A zone parameter gets the range of the base parameter it replaces.
    pub fn default_space(&self) -> ParameterSpace {
        let current = &self.model.section().sections()[0];
        let mut space: ParameterSpace = current
            .params()
            .into_iter()
            .filter(|(name, value)| !name.starts_with("glue") && *value > 0.0)
            .map(|(name, value)| (name, ParameterRange::around(value)))
            .collect();
        if let SectionDesign::Zoned(zoned) = &self.design {
            for (base, replacement) in zoned.zones.iter().flat_map(|z| &z.overrides) {
                if let Some(range) = space.get(base).copied() {
                    space.insert(replacement.clone(), range);
                }
            }
        }
        space
    }

    /// Search `space` and install the best girder into the model.
    pub fn optimize<C>(
        &mut self,
        space: &ParameterSpace,
        strategy: &Strategy,
        constraint: C,
    ) -> DeckResult<SearchOutcome>
    where
        C: Fn(Params) -> Option<Params>,
    {
        let outcome = run(strategy, space, |p| self.load_criterion(p), constraint)?;
        let best = self.design.girder_section(&outcome.params, self.model.span())?;
        self.model.set_section(best)?;
        info!(
            load = outcome.score,
            evaluated = outcome.evaluated,
            "installed optimized section"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::beam_analysis::Train;
    use crate::section::GirderParams;
    use crate::search::EvolutionSettings;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * b.abs().max(1.0)
    }

    fn girder_model() -> BeamModel {
        let section = CrossSection::girder(GirderParams::default()).unwrap();
        BeamModel::new(1200.0, Train::default(), GirderSection::uniform(section), 400.0).unwrap()
    }

    fn with_fixed_sheet(mut p: Params) -> Option<Params> {
        p.insert("thickness".to_string(), 1.27);
        p.insert("outreach".to_string(), 5.0);
        (p["top"] >= p["bottom"]).then_some(p)
    }

    #[test]
    fn test_zone_parameters() {
        let design = ZonedDesign {
            kind: SectionKind::Girder,
            station_step: 100.0,
            zones: vec![Zone {
                start: 400.0,
                end: 800.0,
                overrides: BTreeMap::from([("height".to_string(), "height2".to_string())]),
            }],
        };
        let params = Params::from([
            ("height".to_string(), 75.0),
            ("height2".to_string(), 120.0),
        ]);
        assert_eq!(design.params_at(&params, 100.0).unwrap()["height"], 75.0);
        let inside = design.params_at(&params, 600.0).unwrap();
        assert_eq!(inside["height"], 120.0);
        assert!(!inside.contains_key("height2"));
        // Zone bounds are open
        assert_eq!(design.params_at(&params, 400.0).unwrap()["height"], 75.0);

        let girder = design.girder_section(&params, 1200.0).unwrap();
        assert!(approx_eq(girder.section_at(600.0).height(), 121.27, 1e-12));
        assert!(approx_eq(girder.section_at(0.0).height(), 76.27, 1e-12));
    }

    #[test]
    fn test_optimizer_installs_best_section() {
        let mut optimizer = BeamOptimizer::new(
            girder_model(),
            Material::matboard(),
            SectionDesign::Uniform {
                kind: SectionKind::Girder,
            },
        )
        .with_dx(50.0);
        let space = ParameterSpace::from([
            ("bottom".to_string(), ParameterRange::new(80.0, 80.0, 1.0)),
            ("height".to_string(), ParameterRange::new(75.0, 125.0, 25.0)),
            ("top".to_string(), ParameterRange::new(100.0, 100.0, 1.0)),
        ]);
        let outcome = optimizer
            .optimize(&space, &Strategy::Grid, with_fixed_sheet)
            .unwrap();
        assert_eq!(outcome.evaluated, 3);

        // The installed girder is the winner, not the last candidate tried
        let installed = optimizer.model().section().sections()[0].params();
        assert_eq!(installed["height"], outcome.params["height"]);
        let rescored = optimizer.load_criterion(&outcome.params).unwrap();
        assert_eq!(rescored, outcome.score);
    }

    #[test]
    fn test_evolution_installs_best_section() {
        let mut optimizer = BeamOptimizer::new(
            girder_model(),
            Material::matboard(),
            SectionDesign::Uniform {
                kind: SectionKind::Girder,
            },
        )
        .with_dx(50.0);
        let space = ParameterSpace::from([
            ("bottom".to_string(), ParameterRange::new(80.0, 80.0, 1.0)),
            ("height".to_string(), ParameterRange::new(75.0, 125.0, 25.0)),
            ("top".to_string(), ParameterRange::new(100.0, 100.0, 1.0)),
        ]);
        let strategy = Strategy::Evolution(EvolutionSettings {
            population: 4,
            generations: 3,
            ..EvolutionSettings::default()
        });
        let outcome = optimizer
            .optimize(&space, &strategy, with_fixed_sheet)
            .unwrap();
        assert!(outcome.evaluated <= 3);

        let installed = optimizer.model().section().sections()[0].params();
        assert_eq!(installed["height"], outcome.params["height"]);
        let rescored = optimizer.load_criterion(&outcome.params).unwrap();
        assert_eq!(rescored, outcome.score);
    }

    #[test]
    fn test_zoned_default_space_covers_zone_parameters() {
        let design = SectionDesign::Zoned(ZonedDesign {
            kind: SectionKind::Girder,
            station_step: 100.0,
            zones: vec![Zone {
                start: 400.0,
                end: 800.0,
                overrides: BTreeMap::from([("height".to_string(), "height2".to_string())]),
            }],
        });
        let optimizer =
            BeamOptimizer::new(girder_model(), Material::matboard(), design).with_dx(50.0);
        let space = optimizer.default_space();
        assert_eq!(space["height2"], space["height"]);

        // The nominal point of the default space builds and scores
        let nominal: Params = space
            .iter()
            .map(|(name, range)| (name.clone(), range.value(5)))
            .collect();
        let load = optimizer.load_criterion(&nominal).unwrap();
        assert!(load > 0.0);
    }

    #[test]
    fn test_infeasible_search_keeps_model() {
        let mut optimizer = BeamOptimizer::new(
            girder_model(),
            Material::matboard(),
            SectionDesign::Uniform {
                kind: SectionKind::Girder,
            },
        );
        let before = optimizer.model().section().clone();
        let space = ParameterSpace::from([(
            "height".to_string(),
            ParameterRange::new(50.0, 60.0, 10.0),
        )]);
        let result = optimizer.optimize(&space, &Strategy::Grid, |_| None);
        assert!(matches!(result, Err(DeckError::Infeasible { .. })));
        assert_eq!(optimizer.model().section(), &before);
    }

    #[test]
    fn test_default_space_skips_derived_params() {
        let optimizer = BeamOptimizer::new(
            girder_model(),
            Material::matboard(),
            SectionDesign::Uniform {
                kind: SectionKind::Girder,
            },
        );
        let space = optimizer.default_space();
        assert!(space.contains_key("height"));
        assert!(!space.contains_key("glue_y"));
        assert!(!space.contains_key("glue"));
        assert_eq!(space["height"], ParameterRange::around(75.0));
    }
}
