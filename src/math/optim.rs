//! Unconstrained Nelder–Mead minimization.
//!
//! The combined error models have no closed-form estimates, so their two
//! parameters are refined with a derivative-free simplex search:
//!
//! ```text
//! minimize J(a, b) = Σ e_i² / σ²(p_i) + Σ ln σ²(p_i)
//! ```
//!
//! We use `argmin`'s Nelder–Mead solver. The initial simplex is built around
//! the caller's start point, so a good warm start matters.

use argmin::core::{CostFunction, Error, Executor, State, TerminationReason};
use argmin::solver::neldermead::NelderMead;

use crate::domain::FitOptions;

/// Relative perturbation used to build the initial simplex.
const SIMPLEX_STEP: f64 = 0.1;

/// Result of a minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub params: Vec<f64>,
    pub cost: f64,
    pub iterations: u64,
    /// `true` when the simplex collapsed below the tolerance before `max_iters`.
    pub converged: bool,
}

struct Objective<F> {
    f: F,
}

impl<F> CostFunction for Objective<F>
where
    F: Fn(&[f64]) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        let value = (self.f)(param.as_slice());
        // Keep the simplex ordering well-defined when σ² hits 0 or overflows.
        Ok(if value.is_finite() { value } else { f64::INFINITY })
    }
}

/// Minimize `f` starting at `start`.
///
/// Returns an error only if the solver itself fails (e.g. an invalid
/// simplex); non-convergence is reported through [`Minimum::converged`].
pub fn minimize<F>(f: F, start: &[f64], opts: &FitOptions) -> Result<Minimum, Error>
where
    F: Fn(&[f64]) -> f64,
{
    let simplex = initial_simplex(start);
    let solver: NelderMead<Vec<f64>, f64> =
        NelderMead::new(simplex).with_sd_tolerance(opts.sd_tolerance)?;

    let max_iters = opts.max_iters;
    let res = Executor::new(Objective { f }, solver)
        .configure(|state| state.max_iters(max_iters))
        .run()?;

    let state = res.state();
    let params = state
        .get_best_param()
        .cloned()
        .unwrap_or_else(|| start.to_vec());
    let converged = matches!(
        state.get_termination_reason(),
        Some(TerminationReason::SolverConverged)
    );

    Ok(Minimum {
        params,
        cost: state.get_best_cost(),
        iterations: state.get_iter(),
        converged,
    })
}

/// Build `n + 1` vertices: the start point plus one perturbed copy per coordinate.
fn initial_simplex(start: &[f64]) -> Vec<Vec<f64>> {
    let scale = start.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    let step = if scale > 0.0 { SIMPLEX_STEP * scale } else { SIMPLEX_STEP };

    let mut vertices = Vec::with_capacity(start.len() + 1);
    vertices.push(start.to_vec());
    for i in 0..start.len() {
        let mut vertex = start.to_vec();
        vertex[i] += step;
        vertices.push(vertex);
    }
    vertices
}
