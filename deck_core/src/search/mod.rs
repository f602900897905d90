//! # Design-Space Search
//!
//! Maximizes a scalar objective over a discrete grid of named parameters.
//!
//! Both strategies share one contract:
//!
//! - `objective(&params) -> DeckResult<f64>`, higher is better
//! - `constraint(params) -> Option<params>`: complete and accept a candidate,
//!   or reject it with `None`
//!
//! A candidate whose objective fails is counted as rejected, the same as a
//! constraint rejection. When no candidate survives, the search returns
//! [`DeckError::Infeasible`] rather than a zero score.
//!
//! ## Strategies
//!
//! - [`grid`] - Exhaustive Cartesian product; deterministic
//! - [`evolution`] - Differential evolution over the continuous hull of the
//!   grid, snapping every trial back onto it
//!
//! ## Example
//!
//! ```rust
//! use deck_core::search::{grid::grid_search, ParameterRange, ParameterSpace};
//!
//! let space = ParameterSpace::from([
//!     ("a".to_string(), ParameterRange::new(0.0, 4.0, 1.0)),
//!     ("b".to_string(), ParameterRange::new(0.0, 4.0, 1.0)),
//! ]);
//! // Peak at a = 3, b = 1
//! let outcome = grid_search(
//!     &space,
//!     |p| Ok(-(p["a"] - 3.0).powi(2) - (p["b"] - 1.0).powi(2)),
//!     Some,
//! )
//! .unwrap();
//! assert_eq!(outcome.params["a"], 3.0);
//! assert_eq!(outcome.params["b"], 1.0);
//! ```

pub mod evolution;
pub mod grid;
pub mod optimizer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{DeckError, DeckResult};
use crate::section::Params;

pub use evolution::{differential_evolution, EvolutionSettings};
pub use grid::grid_search;
pub use optimizer::{BeamOptimizer, SectionDesign, Zone, ZonedDesign};

/// Values `start, start + step, ...` up to and including `end`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl ParameterRange {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        ParameterRange { start, end, step }
    }

    /// Range around a nominal value: half to one and a half times it, in
    /// tenths.
    pub fn around(value: f64) -> Self {
        ParameterRange::new(0.5 * value, 1.5 * value, 0.1 * value)
    }

    pub fn validate(&self, name: &str) -> DeckResult<()> {
        if !(self.step > 0.0) {
            return Err(DeckError::invalid_input(
                name,
                self.step.to_string(),
                "step must be positive",
            ));
        }
        if self.end < self.start {
            return Err(DeckError::invalid_input(
                name,
                format!("{}..{}", self.start, self.end),
                "end is below start",
            ));
        }
        Ok(())
    }

    /// Index of the last grid value
    pub fn last_index(&self) -> usize {
        ((self.end - self.start) / self.step + 1e-9).floor() as usize
    }

    pub fn value(&self, index: usize) -> f64 {
        self.start + index as f64 * self.step
    }

    pub fn values(&self) -> Vec<f64> {
        (0..=self.last_index()).map(|i| self.value(i)).collect()
    }

    /// Nearest grid index to a continuous value
    pub fn snap(&self, x: f64) -> usize {
        let i = ((x - self.start) / self.step).round();
        (i.max(0.0) as usize).min(self.last_index())
    }
}

/// Named parameter ranges, iterated in name order
pub type ParameterSpace = BTreeMap<String, ParameterRange>;

pub(crate) fn validate_space(space: &ParameterSpace) -> DeckResult<()> {
    space.iter().try_for_each(|(name, range)| range.validate(name))
}

/// Parameters at one grid point, one index per range in name order
pub(crate) fn params_at(space: &ParameterSpace, indices: &[usize]) -> Params {
    space
        .iter()
        .zip(indices)
        .map(|((name, range), &i)| (name.clone(), range.value(i)))
        .collect()
}

/// Which search to run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Grid,
    Evolution(EvolutionSettings),
}

/// Best candidate of a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Completed parameters as returned by the constraint
    pub params: Params,
    pub score: f64,
    /// Distinct candidates tried
    pub evaluated: usize,
    /// Candidates rejected by the constraint or failing to evaluate
    pub rejected: usize,
}

/// Run the chosen strategy.
pub fn run<O, C>(
    strategy: &Strategy,
    space: &ParameterSpace,
    objective: O,
    constraint: C,
) -> DeckResult<SearchOutcome>
where
    O: FnMut(&Params) -> DeckResult<f64>,
    C: Fn(Params) -> Option<Params>,
{
    match strategy {
        Strategy::Grid => grid_search(space, objective, constraint),
        Strategy::Evolution(settings) => {
            differential_evolution(space, settings, objective, constraint)
        }
    }
}

/// Running counts and best point shared by both strategies
#[derive(Debug, Default)]
pub(crate) struct Tally {
    evaluated: usize,
    rejected: usize,
    best: Option<(Params, f64)>,
}

impl Tally {
    /// Constrain and score one raw candidate. Returns its score, or `None`
    /// when it was rejected.
    pub(crate) fn try_candidate<O, C>(
        &mut self,
        raw: Params,
        objective: &mut O,
        constraint: &C,
    ) -> Option<f64>
    where
        O: FnMut(&Params) -> DeckResult<f64>,
        C: Fn(Params) -> Option<Params>,
    {
        self.evaluated += 1;
        let Some(params) = constraint(raw) else {
            self.rejected += 1;
            return None;
        };
        match objective(&params) {
            Ok(score) if !score.is_nan() => {
                if self.best.as_ref().map_or(true, |(_, best)| score > *best) {
                    info!(score, ?params, "new best candidate");
                    self.best = Some((params, score));
                }
                Some(score)
            }
            Ok(_) => {
                debug!(?params, "objective returned NaN; rejecting candidate");
                self.rejected += 1;
                None
            }
            Err(err) => {
                if err.is_candidate_local() {
                    debug!(?params, error = %err, "candidate failed to evaluate");
                } else {
                    warn!(?params, error = %err, "candidate failed to evaluate");
                }
                self.rejected += 1;
                None
            }
        }
    }

    pub(crate) fn finish(self) -> DeckResult<SearchOutcome> {
        match self.best {
            Some((params, score)) => Ok(SearchOutcome {
                params,
                score,
                evaluated: self.evaluated,
                rejected: self.rejected,
            }),
            None => Err(DeckError::Infeasible {
                evaluated: self.evaluated,
                rejected: self.rejected,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_values_include_end() {
        let r = ParameterRange::new(10.0, 20.0, 5.0);
        assert_eq!(r.values(), vec![10.0, 15.0, 20.0]);
        let r = ParameterRange::new(0.0, 1.0, 0.1);
        assert_eq!(r.values().len(), 11);
    }

    #[test]
    fn test_snap_clamps_to_grid() {
        let r = ParameterRange::new(10.0, 20.0, 5.0);
        assert_eq!(r.snap(-100.0), 0);
        assert_eq!(r.snap(13.0), 1);
        assert_eq!(r.snap(100.0), 2);
    }

    #[test]
    fn test_invalid_range() {
        assert!(ParameterRange::new(0.0, 1.0, 0.0).validate("a").is_err());
        assert!(ParameterRange::new(2.0, 1.0, 0.5).validate("a").is_err());
        assert!(ParameterRange::new(1.0, 1.0, 0.5).validate("a").is_ok());
    }

    #[test]
    fn test_objective_failure_counts_as_rejection() {
        let mut tally = Tally::default();
        let mut objective = |_: &Params| -> DeckResult<f64> {
            Err(DeckError::out_of_range("y", 5.0, 0.0, 1.0))
        };
        assert_eq!(tally.try_candidate(Params::new(), &mut objective, &Some), None);
        assert!(matches!(
            tally.finish(),
            Err(DeckError::Infeasible {
                evaluated: 1,
                rejected: 1
            })
        ));
    }

    #[test]
    fn test_strategy_serialization() {
        let json = serde_json::to_string(&Strategy::Grid).unwrap();
        assert_eq!(json, r#"{"strategy":"grid"}"#);
        let evo: Strategy =
            serde_json::from_str(r#"{"strategy":"evolution","population":8}"#).unwrap();
        match evo {
            Strategy::Evolution(s) => assert_eq!(s.population, 8),
            other => panic!("unexpected strategy {:?}", other),
        }
    }
}
