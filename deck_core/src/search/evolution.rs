//! # Differential Evolution
//!
//! DE/rand/1/bin over the continuous hull of a parameter grid. Each trial
//! vector is snapped to the nearest grid point before it is constrained and
//! scored, so the reachable set is exactly the grid search's. Rejected points
//! score negative infinity but stay in the population.
//!
//! Scores are cached by grid point; a population that has converged costs
//! nothing to keep iterating.
//!
//! ## References
//!
//! - Storn & Price (1997), "Differential Evolution: A Simple and Efficient
//!   Heuristic for Global Optimization over Continuous Spaces"

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::grid::grid_search;
use super::{params_at, validate_space, ParameterSpace, SearchOutcome, Tally};
use crate::errors::DeckResult;
use crate::section::Params;

/// Tuning of the evolutionary search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionSettings {
    /// Number of vectors in the population (at least 4)
    pub population: usize,
    pub generations: usize,
    /// Differential weight F
    pub mutation: f64,
    /// Crossover probability CR
    pub crossover: f64,
    /// Seed of the random generator; equal seeds give equal runs
    pub seed: u64,
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        EvolutionSettings {
            population: 20,
            generations: 60,
            mutation: 0.7,
            crossover: 0.9,
            seed: 2024,
        }
    }
}

/// Maximize `objective` with differential evolution.
pub fn differential_evolution<O, C>(
    space: &ParameterSpace,
    settings: &EvolutionSettings,
    mut objective: O,
    constraint: C,
) -> DeckResult<SearchOutcome>
where
    O: FnMut(&Params) -> DeckResult<f64>,
    C: Fn(Params) -> Option<Params>,
{
    validate_space(space)?;
    if space.is_empty() {
        return grid_search(space, objective, constraint);
    }

    let ranges: Vec<_> = space.values().copied().collect();
    let bounds: Vec<(f64, f64)> = ranges
        .iter()
        .map(|r| (r.start, r.value(r.last_index())))
        .collect();
    let dims = ranges.len();
    let size = settings.population.max(4);
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut tally = Tally::default();
    let mut cache: HashMap<Vec<usize>, f64> = HashMap::new();

    let mut score = |x: &[f64], tally: &mut Tally| -> f64 {
        let indices: Vec<usize> = ranges.iter().zip(x).map(|(r, &v)| r.snap(v)).collect();
        if let Some(&s) = cache.get(&indices) {
            return s;
        }
        let s = tally
            .try_candidate(params_at(space, &indices), &mut objective, &constraint)
            .unwrap_or(f64::NEG_INFINITY);
        cache.insert(indices, s);
        s
    };

    info!(
        population = size,
        generations = settings.generations,
        dimensions = dims,
        "starting differential evolution"
    );

    let mut population: Vec<Vec<f64>> = (0..size)
        .map(|_| {
            bounds
                .iter()
                .map(|&(lo, hi)| rng.gen_range(lo..=hi))
                .collect()
        })
        .collect();
    let mut fitness: Vec<f64> = population.iter().map(|x| score(x, &mut tally)).collect();

    for _ in 0..settings.generations {
        for i in 0..size {
            let [a, b, c] = distinct_others(&mut rng, size, i);
            let forced = rng.gen_range(0..dims);
            let trial: Vec<f64> = (0..dims)
                .map(|d| {
                    if d == forced || rng.gen::<f64>() < settings.crossover {
                        let v = population[a][d]
                            + settings.mutation * (population[b][d] - population[c][d]);
                        v.clamp(bounds[d].0, bounds[d].1)
                    } else {
                        population[i][d]
                    }
                })
                .collect();
            let s = score(&trial, &mut tally);
            if s >= fitness[i] {
                population[i] = trial;
                fitness[i] = s;
            }
        }
    }

    let outcome = tally.finish()?;
    info!(
        score = outcome.score,
        evaluated = outcome.evaluated,
        rejected = outcome.rejected,
        "differential evolution finished"
    );
    Ok(outcome)
}

/// Three distinct population indices, none equal to `skip`
fn distinct_others(rng: &mut StdRng, size: usize, skip: usize) -> [usize; 3] {
    let mut picked = [skip; 3];
    for k in 0..3 {
        loop {
            let candidate = rng.gen_range(0..size);
            if candidate != skip && !picked[..k].contains(&candidate) {
                picked[k] = candidate;
                break;
            }
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DeckError;
    use crate::search::ParameterRange;

    fn space() -> ParameterSpace {
        ParameterSpace::from([
            ("bottom".to_string(), ParameterRange::new(10.0, 200.0, 1.0)),
            ("height".to_string(), ParameterRange::new(20.0, 200.0, 2.0)),
            ("top".to_string(), ParameterRange::new(50.0, 150.0, 5.0)),
        ])
    }

    fn bowl(p: &Params) -> DeckResult<f64> {
        Ok(-(p["bottom"] - 61.0).powi(2) - (p["height"] - 160.0).powi(2) - (p["top"] - 100.0).powi(2))
    }

    #[test]
    fn test_converges_on_smooth_objective() {
        let settings = EvolutionSettings {
            population: 30,
            generations: 150,
            ..EvolutionSettings::default()
        };
        let outcome = differential_evolution(&space(), &settings, bowl, Some).unwrap();
        assert_eq!(outcome.params["bottom"], 61.0);
        assert_eq!(outcome.params["height"], 160.0);
        assert_eq!(outcome.params["top"], 100.0);
    }

    #[test]
    fn test_results_lie_on_the_grid() {
        let settings = EvolutionSettings {
            generations: 5,
            ..EvolutionSettings::default()
        };
        let outcome = differential_evolution(&space(), &settings, bowl, Some).unwrap();
        let h = outcome.params["height"];
        assert_eq!((h - 20.0) % 2.0, 0.0);
        let t = outcome.params["top"];
        assert_eq!((t - 50.0) % 5.0, 0.0);
    }

    #[test]
    fn test_same_seed_same_result() {
        let settings = EvolutionSettings {
            generations: 10,
            ..EvolutionSettings::default()
        };
        let a = differential_evolution(&space(), &settings, bowl, Some).unwrap();
        let b = differential_evolution(&space(), &settings, bowl, Some).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejections_stay_infeasible() {
        let settings = EvolutionSettings {
            population: 6,
            generations: 3,
            ..EvolutionSettings::default()
        };
        let result = differential_evolution(&space(), &settings, bowl, |_| None);
        assert!(matches!(result, Err(DeckError::Infeasible { rejected, evaluated }) if rejected == evaluated));
    }

    #[test]
    fn test_penalized_region_is_avoided() {
        // Only short sections are allowed; the unconstrained optimum is out
        let settings = EvolutionSettings {
            population: 25,
            generations: 80,
            ..EvolutionSettings::default()
        };
        let outcome = differential_evolution(&space(), &settings, bowl, |p: Params| {
            (p["height"] <= 100.0).then_some(p)
        })
        .unwrap();
        assert_eq!(outcome.params["height"], 100.0);
        assert!(outcome.rejected > 0);
    }

    #[test]
    fn test_distinct_indices() {
        let mut rng = StdRng::seed_from_u64(1);
        for skip in 0..4 {
            let picked = distinct_others(&mut rng, 4, skip);
            assert!(!picked.contains(&skip));
            assert_ne!(picked[0], picked[1]);
            assert_ne!(picked[1], picked[2]);
            assert_ne!(picked[0], picked[2]);
        }
    }
}
