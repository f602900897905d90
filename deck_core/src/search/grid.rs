//! Exhaustive grid search.

use tracing::info;

use super::{params_at, validate_space, ParameterSpace, SearchOutcome, Tally};
use crate::errors::DeckResult;
use crate::section::Params;

/// Try every point of the Cartesian product of `space`.
///
/// Points are visited in odometer order with the last parameter (by name)
/// changing fastest. Ties keep the first point found, so two runs over the
/// same inputs always agree.
pub fn grid_search<O, C>(
    space: &ParameterSpace,
    mut objective: O,
    constraint: C,
) -> DeckResult<SearchOutcome>
where
    O: FnMut(&Params) -> DeckResult<f64>,
    C: Fn(Params) -> Option<Params>,
{
    validate_space(space)?;
    let limits: Vec<usize> = space.values().map(|r| r.last_index()).collect();
    info!(points = point_count(&limits), dimensions = limits.len(), "starting grid search");

    let mut tally = Tally::default();
    let mut indices = vec![0usize; limits.len()];
    loop {
        tally.try_candidate(params_at(space, &indices), &mut objective, &constraint);

        // Advance the odometer; done once every digit has rolled over
        let mut digit = indices.len();
        loop {
            if digit == 0 {
                let outcome = tally.finish()?;
                info!(
                    score = outcome.score,
                    evaluated = outcome.evaluated,
                    rejected = outcome.rejected,
                    "grid search finished"
                );
                return Ok(outcome);
            }
            digit -= 1;
            if indices[digit] < limits[digit] {
                indices[digit] += 1;
                break;
            }
            indices[digit] = 0;
        }
    }
}

/// Number of grid points for the given last indices, saturating at `usize::MAX`
fn point_count(limits: &[usize]) -> usize {
    limits
        .iter()
        .fold(1, |acc, l| acc.saturating_mul(l.saturating_add(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DeckError;
    use crate::search::ParameterRange;

    fn space() -> ParameterSpace {
        ParameterSpace::from([
            ("height".to_string(), ParameterRange::new(50.0, 150.0, 25.0)),
            ("top".to_string(), ParameterRange::new(80.0, 120.0, 10.0)),
        ])
    }

    fn bowl(p: &Params) -> DeckResult<f64> {
        Ok(1000.0 - (p["height"] - 100.0).powi(2) - (p["top"] - 90.0).powi(2))
    }

    #[test]
    fn test_finds_grid_optimum() {
        let outcome = grid_search(&space(), bowl, Some).unwrap();
        assert_eq!(outcome.params["height"], 100.0);
        assert_eq!(outcome.params["top"], 90.0);
        assert_eq!(outcome.score, 1000.0);
        assert_eq!(outcome.evaluated, 25);
        assert_eq!(outcome.rejected, 0);
    }

    #[test]
    fn test_deterministic() {
        let a = grid_search(&space(), bowl, Some).unwrap();
        let b = grid_search(&space(), bowl, Some).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_ties_keep_first() {
        let outcome = grid_search(&space(), |_| Ok(0.0), Some).unwrap();
        assert_eq!(outcome.params["height"], 50.0);
        assert_eq!(outcome.params["top"], 80.0);
        // A genuine zero best score is still a result
        assert_eq!(outcome.score, 0.0);
    }

    #[test]
    fn test_always_rejecting_constraint_is_infeasible() {
        let result = grid_search(&space(), bowl, |_| None);
        assert_eq!(
            result,
            Err(DeckError::Infeasible {
                evaluated: 25,
                rejected: 25
            })
        );
    }

    #[test]
    fn test_constraint_completes_candidates() {
        let outcome = grid_search(
            &space(),
            |p| Ok(p["height"] + p["thickness"]),
            |mut p: Params| {
                if p["top"] < 100.0 {
                    return None;
                }
                p.insert("thickness".to_string(), 1.27);
                Some(p)
            },
        )
        .unwrap();
        assert_eq!(outcome.params["height"], 150.0);
        assert_eq!(outcome.params["thickness"], 1.27);
        assert_eq!(outcome.rejected, 10);
    }

    #[test]
    fn test_failing_objective_is_skipped() {
        let outcome = grid_search(
            &space(),
            |p| {
                if p["height"] > 100.0 {
                    Err(DeckError::out_of_range("y", p["height"], 0.0, 100.0))
                } else {
                    Ok(p["height"])
                }
            },
            Some,
        )
        .unwrap();
        assert_eq!(outcome.params["height"], 100.0);
        assert_eq!(outcome.rejected, 10);
    }

    #[test]
    fn test_empty_space_evaluates_once() {
        let outcome = grid_search(&ParameterSpace::new(), |_| Ok(7.0), Some).unwrap();
        assert_eq!(outcome.evaluated, 1);
        assert!(outcome.params.is_empty());
    }

    #[test]
    fn test_point_count_saturates() {
        assert_eq!(point_count(&[]), 1);
        assert_eq!(point_count(&[4, 4]), 25);
        assert_eq!(point_count(&[usize::MAX, 1]), usize::MAX);
        assert_eq!(point_count(&[usize::MAX / 2, 2]), usize::MAX);
    }
}
