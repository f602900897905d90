//! # Study Document
//!
//! A [`Study`] is everything needed to reproduce an analysis: the bridge,
//! its girder, the material, the sweep settings and, optionally, a section
//! search. It is the configuration format read by the CLI and written by
//! [`crate::file_io`].
//!
//! ## JSON Shape
//!
//! ```json
//! {
//!   "meta": { "version": "0.1.0", "name": "Deck A", "engineer": "...", ... },
//!   "settings": { "dx": 1.0, "threshold": 1.0, "diagram_step": 1.0 },
//!   "bridge": {
//!     "span": 1200.0,
//!     "axle_offsets": [172.0, 348.0, 512.0, 688.0, 852.0, 1028.0],
//!     "load_distribution": [1.35, 1.35, 1.0, 1.0, 1.0, 1.0],
//!     "total_load": 400.0,
//!     "girder": { "layout": "uniform", "section": { "kind": "girder", "params": { ... } } }
//!   },
//!   "material": { ... },
//!   "search": null
//! }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use deck_core::study::Study;
//!
//! let study = Study::new("Deck A", "J. Engineer");
//! let model = study.build_model().unwrap();
//! assert_eq!(model.span(), 1200.0);
//!
//! let json = serde_json::to_string_pretty(&study).unwrap();
//! let roundtrip: Study = serde_json::from_str(&json).unwrap();
//! assert_eq!(roundtrip.bridge, study.bridge);
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::beam_analysis::{
    BeamModel, GirderSection, Train, DEFAULT_AXLE_OFFSETS, DEFAULT_LOAD_DISTRIBUTION,
    DEFAULT_SPAN,
};
use crate::errors::{DeckError, DeckResult};
use crate::materials::Material;
use crate::search::{
    BeamOptimizer, ParameterSpace, SearchOutcome, SectionDesign, Strategy, ZonedDesign,
};
use crate::section::{GirderParams, Params, Section, SectionDescriptor, SectionKind};

/// Current schema version for study files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Total train weight of a new study (N)
pub const DEFAULT_TOTAL_LOAD: f64 = 400.0;

/// Root container for a girder study.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Study {
    pub meta: StudyMetadata,

    #[serde(default)]
    pub settings: StudySettings,

    pub bridge: BridgeSpec,

    #[serde(default)]
    pub material: Material,

    /// Section search to run on this bridge, if any
    #[serde(default)]
    pub search: Option<SearchSpec>,
}

impl Study {
    /// Create a study of the default bridge with the default girder.
    pub fn new(name: impl Into<String>, engineer: impl Into<String>) -> Self {
        let now = Utc::now();
        Study {
            meta: StudyMetadata {
                version: SCHEMA_VERSION.to_string(),
                name: name.into(),
                engineer: engineer.into(),
                created: now,
                modified: now,
            },
            settings: StudySettings::default(),
            bridge: BridgeSpec::default(),
            material: Material::matboard(),
            search: None,
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    /// Build the beam model described by the bridge block.
    pub fn build_model(&self) -> DeckResult<BeamModel> {
        self.bridge.build_model()
    }

    fn search_block(&self) -> DeckResult<&SearchSpec> {
        self.search.as_ref().ok_or_else(|| {
            DeckError::invalid_input("search", "null", "study has no search block")
        })
    }

    /// Build the optimizer for the search block.
    ///
    /// Returns the optimizer together with the parameter space to search;
    /// an empty space in the file means "around the current girder".
    pub fn optimizer(&self) -> DeckResult<(BeamOptimizer, ParameterSpace)> {
        let search = self.search_block()?;
        let optimizer = BeamOptimizer::new(self.build_model()?, self.material, search.design.clone())
            .with_dx(self.settings.dx);
        let space = if search.space.is_empty() {
            optimizer.default_space()
        } else {
            search.space.clone()
        };
        Ok((optimizer, space))
    }

    /// Run the search block and adopt the winning girder into the bridge.
    pub fn optimize(&mut self) -> DeckResult<SearchOutcome> {
        let search = self.search_block()?.clone();
        let (mut optimizer, space) = self.optimizer()?;
        let outcome = optimizer.optimize(&space, &search.strategy, |p| search.constraint.apply(p))?;
        self.adopt(&search.design, &outcome.params)?;
        Ok(outcome)
    }

    /// Replace the bridge's girder with the one `design` builds from `params`.
    pub fn adopt(&mut self, design: &SectionDesign, params: &Params) -> DeckResult<()> {
        self.bridge.girder = match design {
            SectionDesign::Uniform { kind } => GirderSpec::Uniform {
                section: SectionDescriptor {
                    kind: *kind,
                    params: kind.build(params)?.params(),
                },
            },
            SectionDesign::Zoned(zoned) => GirderSpec::Zoned {
                design: zoned.clone(),
                params: params.clone(),
            },
        };
        self.touch();
        Ok(())
    }
}

impl Default for Study {
    fn default() -> Self {
        Study::new("", "")
    }
}

/// Study metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Name of the study
    pub name: String,

    /// Name of the responsible engineer
    pub engineer: String,

    /// When the study was created
    pub created: DateTime<Utc>,

    /// When the study was last modified
    pub modified: DateTime<Utc>,
}

/// Discretization and acceptance settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudySettings {
    /// Step of the train sweep (mm)
    pub dx: f64,

    /// Safety factors below this value mark a dead zone
    pub threshold: f64,

    /// Station spacing of the exported diagrams (mm); must divide the span
    pub diagram_step: f64,
}

impl Default for StudySettings {
    fn default() -> Self {
        StudySettings {
            dx: 1.0,
            threshold: 1.0,
            diagram_step: 1.0,
        }
    }
}

/// The bridge: span, train and girder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeSpec {
    pub span: f64,
    pub axle_offsets: Vec<f64>,
    /// Relative axle weights; normalized when the train is built
    pub load_distribution: Vec<f64>,
    /// Total train weight (N)
    pub total_load: f64,
    pub girder: GirderSpec,
}

impl BridgeSpec {
    pub fn train(&self) -> DeckResult<Train> {
        Train::new(self.axle_offsets.clone(), self.load_distribution.clone())
    }

    pub fn build_model(&self) -> DeckResult<BeamModel> {
        let girder = self.girder.build(self.span)?;
        let model = BeamModel::new(self.span, self.train()?, girder, self.total_load)?;
        debug!(
            span = self.span,
            axles = self.axle_offsets.len(),
            total_load = self.total_load,
            "built beam model"
        );
        Ok(model)
    }
}

impl Default for BridgeSpec {
    fn default() -> Self {
        BridgeSpec {
            span: DEFAULT_SPAN,
            axle_offsets: DEFAULT_AXLE_OFFSETS.to_vec(),
            load_distribution: DEFAULT_LOAD_DISTRIBUTION.to_vec(),
            total_load: DEFAULT_TOTAL_LOAD,
            girder: GirderSpec::default(),
        }
    }
}

/// The girder's cross-section along the span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum GirderSpec {
    /// One section over the whole span, built when the model is
    Uniform { section: SectionDescriptor },
    /// A zoned design with the parameters it is built from
    Zoned { design: ZonedDesign, params: Params },
}

impl GirderSpec {
    pub fn build(&self, span: f64) -> DeckResult<GirderSection> {
        match self {
            GirderSpec::Uniform { section } => Ok(GirderSection::uniform(
                section.kind.build(&section.params)?,
            )),
            GirderSpec::Zoned { design, params } => design.girder_section(params, span),
        }
    }
}

impl Default for GirderSpec {
    fn default() -> Self {
        GirderSpec::Uniform {
            section: SectionDescriptor {
                kind: SectionKind::Girder,
                params: GirderParams::default().params(),
            },
        }
    }
}

/// A section search over this study's bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpec {
    pub design: SectionDesign,

    /// Parameter ranges; empty means half to one and a half times the
    /// current girder's parameters
    #[serde(default)]
    pub space: ParameterSpace,

    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default)]
    pub constraint: ConstraintSpec,
}

// =============================================================================
// DECLARATIVE CONSTRAINT
// =============================================================================

/// Completes and filters search candidates without writing code.
///
/// Applied in order: fixed values are inserted, budgets are checked (and
/// their remainder parameters derived), then ordering rules are checked.
/// A rule naming a parameter the candidate does not have rejects it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSpec {
    /// Parameters held at a fixed value
    pub fixed: Params,
    pub budgets: Vec<Budget>,
    pub ordering: Vec<OrderingRule>,
}

impl ConstraintSpec {
    pub fn apply(&self, mut params: Params) -> Option<Params> {
        for (name, value) in &self.fixed {
            params.insert(name.clone(), *value);
        }
        for budget in &self.budgets {
            let used = budget.used(&params)?;
            if used > budget.limit {
                return None;
            }
            if let Some(rest) = &budget.remainder {
                params.insert(rest.param.clone(), rest.share * (budget.limit - used));
            }
        }
        self.ordering
            .iter()
            .try_for_each(|rule| rule.holds(&params).then_some(()))?;
        Some(params)
    }
}

/// `offset + Σ coefficient·param <= limit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub terms: BTreeMap<String, f64>,
    #[serde(default)]
    pub offset: f64,
    pub limit: f64,
    /// Parameter that receives a share of whatever the budget leaves over
    #[serde(default)]
    pub remainder: Option<Remainder>,
}

impl Budget {
    fn used(&self, params: &Params) -> Option<f64> {
        self.terms.iter().try_fold(self.offset, |sum, (name, coef)| {
            params.get(name).map(|v| sum + coef * v)
        })
    }
}

/// `param = share · (limit - used)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remainder {
    pub param: String,
    pub share: f64,
}

/// `larger >= factor · smaller`, or `>` when strict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingRule {
    pub larger: String,
    pub smaller: String,
    #[serde(default = "unit_factor")]
    pub factor: f64,
    #[serde(default)]
    pub strict: bool,
}

fn unit_factor() -> f64 {
    1.0
}

impl OrderingRule {
    pub fn new(larger: impl Into<String>, smaller: impl Into<String>) -> Self {
        OrderingRule {
            larger: larger.into(),
            smaller: smaller.into(),
            factor: 1.0,
            strict: false,
        }
    }

    fn holds(&self, params: &Params) -> bool {
        match (params.get(&self.larger), params.get(&self.smaller)) {
            (Some(a), Some(b)) if self.strict => *a > self.factor * b,
            (Some(a), Some(b)) => *a >= self.factor * b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{ParameterRange, Zone};

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * b.abs().max(1.0)
    }

    /// One matboard sheet: flanges and webs share 406.5 mm of width, the
    /// glue tabs get what is left
    fn sheet_constraint() -> ConstraintSpec {
        ConstraintSpec {
            fixed: Params::from([("thickness".to_string(), 1.27)]),
            budgets: vec![Budget {
                terms: BTreeMap::from([
                    ("top".to_string(), 1.0),
                    ("bottom".to_string(), 1.0),
                    ("height".to_string(), 2.0),
                ]),
                offset: -5.08,
                limit: 406.5,
                remainder: Some(Remainder {
                    param: "outreach".to_string(),
                    share: 0.5,
                }),
            }],
            ordering: vec![
                OrderingRule::new("top", "bottom"),
                OrderingRule {
                    factor: 2.0,
                    strict: true,
                    ..OrderingRule::new("bottom", "outreach")
                },
            ],
        }
    }

    fn candidate(top: f64, bottom: f64, height: f64) -> Params {
        Params::from([
            ("top".to_string(), top),
            ("bottom".to_string(), bottom),
            ("height".to_string(), height),
        ])
    }

    #[test]
    fn test_study_creation() {
        let study = Study::new("Deck A", "Jane Engineer");
        assert_eq!(study.meta.name, "Deck A");
        assert_eq!(study.meta.engineer, "Jane Engineer");
        assert_eq!(study.meta.version, SCHEMA_VERSION);
        assert_eq!(study.bridge.span, DEFAULT_SPAN);
        assert!(study.search.is_none());
    }

    #[test]
    fn test_study_serialization() {
        let study = Study::new("Deck B", "Test Engineer");
        let json = serde_json::to_string_pretty(&study).unwrap();
        assert!(json.contains("Test Engineer"));
        assert!(json.contains("\"layout\": \"uniform\""));
        assert!(json.contains("\"kind\": \"girder\""));

        let roundtrip: Study = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.meta.engineer, "Test Engineer");
        assert_eq!(roundtrip.bridge, study.bridge);
        assert_eq!(roundtrip.material, study.material);
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let json = r#"{
            "meta": {
                "version": "0.1.0",
                "name": "min",
                "engineer": "",
                "created": "2025-01-01T00:00:00Z",
                "modified": "2025-01-01T00:00:00Z"
            },
            "bridge": {
                "span": 1000.0,
                "axle_offsets": [0.0, 100.0],
                "load_distribution": [1.0, 1.0],
                "total_load": 200.0,
                "girder": {
                    "layout": "uniform",
                    "section": { "kind": "rectangle", "params": { "b": 100.0, "h": 50.0 } }
                }
            }
        }"#;
        let study: Study = serde_json::from_str(json).unwrap();
        assert_eq!(study.settings, StudySettings::default());
        assert_eq!(study.material, Material::matboard());
        let model = study.build_model().unwrap();
        assert_eq!(model.span(), 1000.0);
        assert_eq!(model.train().fractions(), &[0.5, 0.5]);
    }

    #[test]
    fn test_bad_train_is_structural() {
        let mut study = Study::default();
        study.bridge.load_distribution.pop();
        assert!(matches!(
            study.build_model(),
            Err(DeckError::StructuralValidity { .. })
        ));
    }

    #[test]
    fn test_zoned_girder() {
        let mut study = Study::default();
        study.bridge.girder = GirderSpec::Zoned {
            design: ZonedDesign {
                kind: SectionKind::Girder,
                station_step: 10.0,
                zones: vec![Zone {
                    start: 400.0,
                    end: 800.0,
                    overrides: BTreeMap::from([("height".to_string(), "height2".to_string())]),
                }],
            },
            params: Params::from([
                ("height".to_string(), 160.0),
                ("height2".to_string(), 180.0),
            ]),
        };
        let model = study.build_model().unwrap();
        assert!(!model.section().is_uniform());
        assert!(approx_eq(model.section().section_at(600.0).height(), 181.27, 1e-12));
        assert!(approx_eq(model.section().section_at(100.0).height(), 161.27, 1e-12));
    }

    #[test]
    fn test_budget_derives_remainder() {
        let params = sheet_constraint().apply(candidate(100.0, 80.0, 100.0)).unwrap();
        assert_eq!(params["thickness"], 1.27);
        // used = 100 + 80 + 200 - 5.08
        assert!(approx_eq(params["outreach"], 0.5 * (406.5 - 374.92), 1e-12));
    }

    #[test]
    fn test_constraint_rejections() {
        let constraint = sheet_constraint();
        // Over budget
        assert!(constraint.apply(candidate(100.0, 80.0, 150.0)).is_none());
        // Bottom wider than top
        assert!(constraint.apply(candidate(80.0, 100.0, 100.0)).is_none());
        // Glue tabs wider than the bottom flange
        assert!(constraint.apply(candidate(60.0, 20.0, 50.0)).is_none());
        // Missing parameter
        let mut partial = candidate(100.0, 80.0, 100.0);
        partial.remove("height");
        assert!(constraint.apply(partial).is_none());
    }

    #[test]
    fn test_empty_constraint_accepts() {
        let params = candidate(1.0, 2.0, 3.0);
        assert_eq!(ConstraintSpec::default().apply(params.clone()), Some(params));
    }

    #[test]
    fn test_search_block_parses() {
        let json = r#"{
            "design": { "design": "uniform", "kind": "girder" },
            "space": { "height": { "start": 50.0, "end": 150.0, "step": 50.0 } },
            "constraint": { "ordering": [ { "larger": "top", "smaller": "bottom" } ] }
        }"#;
        let search: SearchSpec = serde_json::from_str(json).unwrap();
        assert_eq!(search.strategy, Strategy::Grid);
        assert_eq!(search.space["height"], ParameterRange::new(50.0, 150.0, 50.0));
        assert_eq!(search.constraint.ordering[0].factor, 1.0);
    }

    #[test]
    fn test_optimize_adopts_best_girder() {
        let mut study = Study::default();
        study.settings.dx = 50.0;
        study.search = Some(SearchSpec {
            design: SectionDesign::Uniform {
                kind: SectionKind::Girder,
            },
            space: ParameterSpace::from([(
                "height".to_string(),
                ParameterRange::new(50.0, 100.0, 25.0),
            )]),
            strategy: Strategy::Grid,
            constraint: ConstraintSpec::default(),
        });
        let outcome = study.optimize().unwrap();
        match &study.bridge.girder {
            GirderSpec::Uniform { section } => {
                assert_eq!(section.kind, SectionKind::Girder);
                assert_eq!(section.params["height"], outcome.params["height"]);
            }
            other => panic!("unexpected girder {:?}", other),
        }
    }

    #[test]
    fn test_optimizer_requires_search_block() {
        assert!(matches!(
            Study::default().optimizer(),
            Err(DeckError::InvalidInput { .. })
        ));
    }
}
