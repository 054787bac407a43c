//! Two-stage driver over projected weights.
//!
//! Stage one runs Nelder-Mead on an unconstrained parameter `x`. Every
//! evaluated portfolio is `P(x)`, the projection onto the constraint set, and
//! the cost adds `|x - P(x)|^2` so the minimiser is unique in `x`.
//!
//! Stage two refines `P(x)` with projected gradient steps and only accepts the
//! result once the projected-gradient step length falls below
//! [`STATIONARITY_TOLERANCE`]. Nelder-Mead alone can stall on a flat simplex
//! far from the optimum once the asset count grows.

use argmin::core::{
    CostFunction, Executor, Gradient, IterState, KV, Problem, Solver, State, TerminationReason,
    TerminationStatus,
};
use argmin::solver::neldermead::NelderMead;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::constraints::ConstraintSet;
use super::objective::Objective;
use crate::domain::error::PortfolioError;

const SIMPLEX_STEP: f64 = 0.1;
const FEASIBILITY_TOLERANCE: f64 = 1e-9;
/// Largest `|P(w - t g) - w| / t` accepted as a stationary point.
pub const STATIONARITY_TOLERANCE: f64 = 1e-6;
const MIN_STEP: f64 = 1e-20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Iteration budget of each stage.
    pub max_iters: u64,
    /// Standard deviation of simplex costs at which the search stops.
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iters: 20_000,
            tolerance: 1e-10,
        }
    }
}

/// Objective divided by its magnitude at the starting point.
#[derive(Clone)]
struct ScaledObjective {
    objective: Objective,
    expected_returns: DVector<f64>,
    covariance: DMatrix<f64>,
    scale: f64,
}

impl CostFunction for ScaledObjective {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, w: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let value = self.objective.evaluate(
            &DVector::from_column_slice(w),
            &self.expected_returns,
            &self.covariance,
        )?;
        Ok(value / self.scale)
    }
}

impl Gradient for ScaledObjective {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, w: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let grad = self.objective.gradient(
            &DVector::from_column_slice(w),
            &self.expected_returns,
            &self.covariance,
        )?;
        Ok(grad.iter().map(|g| g / self.scale).collect())
    }
}

struct ProjectedCost {
    inner: ScaledObjective,
    constraints: ConstraintSet,
}

impl CostFunction for ProjectedCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let w = self.constraints.project(x);
        let penalty: f64 = x.iter().zip(&w).map(|(xi, wi)| (xi - wi).powi(2)).sum();
        Ok(self.inner.cost(&w)? + penalty)
    }
}

type RefineState = IterState<Vec<f64>, Vec<f64>, (), (), (), f64>;

/// Projected gradient descent with a backtracking step on the quadratic
/// upper bound `f(w) + g.d + |d|^2 / 2t`.
struct ProjectedGradient {
    constraints: ConstraintSet,
    step: f64,
    stationarity: f64,
}

impl ProjectedGradient {
    fn new(constraints: ConstraintSet) -> Self {
        Self {
            constraints,
            step: 1.0,
            stationarity: f64::INFINITY,
        }
    }
}

impl Solver<ScaledObjective, RefineState> for ProjectedGradient {
    const NAME: &'static str = "Projected gradient";

    fn init(
        &mut self,
        problem: &mut Problem<ScaledObjective>,
        mut state: RefineState,
    ) -> Result<(RefineState, Option<KV>), argmin::core::Error> {
        let start = state
            .take_param()
            .ok_or_else(|| PortfolioError::OptimizationNonConvergence {
                reason: "refinement started without parameters".into(),
            })?;
        let w = self.constraints.project(&start);
        let cost = problem.cost(&w)?;
        Ok((state.param(w).cost(cost), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<ScaledObjective>,
        mut state: RefineState,
    ) -> Result<(RefineState, Option<KV>), argmin::core::Error> {
        let w = state
            .take_param()
            .ok_or_else(|| PortfolioError::OptimizationNonConvergence {
                reason: "refinement lost its parameters".into(),
            })?;
        let cost = state.get_cost();
        let grad = problem.gradient(&w)?;
        let slack = 1e-15 * cost.abs().max(1.0);

        loop {
            if self.step < MIN_STEP {
                return Ok((state.param(w).cost(cost), None));
            }
            let trial: Vec<f64> = w
                .iter()
                .zip(&grad)
                .map(|(wi, gi)| wi - self.step * gi)
                .collect();
            let candidate = self.constraints.project(&trial);
            let delta: Vec<f64> = candidate.iter().zip(&w).map(|(c, wi)| c - wi).collect();
            let decrease: f64 = grad.iter().zip(&delta).map(|(g, d)| g * d).sum();
            let length_sq: f64 = delta.iter().map(|d| d * d).sum();
            let candidate_cost = problem.cost(&candidate)?;

            if candidate_cost <= cost + decrease + length_sq / (2.0 * self.step) + slack {
                self.stationarity = length_sq.sqrt() / self.step;
                self.step *= 2.0;
                return Ok((state.param(candidate).cost(candidate_cost), None));
            }
            self.step *= 0.5;
        }
    }

    fn terminate(&mut self, _state: &RefineState) -> TerminationStatus {
        if self.stationarity <= STATIONARITY_TOLERANCE {
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        } else if self.step < MIN_STEP {
            TerminationStatus::Terminated(TerminationReason::SolverExit(
                "step length underflow".into(),
            ))
        } else {
            TerminationStatus::NotTerminated
        }
    }
}

/// Minimise `objective` over the constraint set.
///
/// Returns the weights in asset order. The result is only returned once the
/// refinement stage certifies a stationary point; anything else is reported
/// as non-convergence.
pub fn minimize(
    objective: Objective,
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
    constraints: ConstraintSet,
    config: &SolverConfig,
) -> Result<DVector<f64>, PortfolioError> {
    let x0 = constraints.starting_point();
    let f0 = objective.evaluate(&DVector::from_column_slice(&x0), expected_returns, covariance)?;
    let scale = if f0.abs() > 1e-12 { f0.abs() } else { 1.0 };

    let scaled = ScaledObjective {
        objective,
        expected_returns: expected_returns.clone(),
        covariance: covariance.clone(),
        scale,
    };

    let simplex = initial_simplex(&x0);
    let solver = NelderMead::new(simplex)
        .with_sd_tolerance(config.tolerance)
        .map_err(|e| PortfolioError::OptimizationNonConvergence {
            reason: e.to_string(),
        })?;
    let cost = ProjectedCost {
        inner: scaled.clone(),
        constraints: constraints.clone(),
    };

    debug!(
        objective = objective.name(),
        assets = x0.len(),
        max_iters = config.max_iters,
        "starting optimizer"
    );

    let search = Executor::new(cost, solver)
        .configure(|state| state.max_iters(config.max_iters))
        .run()
        .map_err(from_solver_error)?;

    let search_iters = search.state.get_iter();
    // The simplex only supplies a starting point, so any stopping reason is fine here.
    let start = search
        .state
        .best_param
        .ok_or_else(|| PortfolioError::OptimizationNonConvergence {
            reason: "solver returned no parameters".into(),
        })?;
    debug!(
        iterations = search_iters,
        reason = ?search.state.termination_status,
        "simplex search finished"
    );

    let refine = Executor::new(scaled, ProjectedGradient::new(constraints.clone()))
        .configure(|state| state.param(start).max_iters(config.max_iters))
        .run()
        .map_err(from_solver_error)?;

    let iterations = refine.state.get_iter();
    let best_cost = refine.state.get_cost() * scale;
    match refine.state.get_termination_reason() {
        Some(TerminationReason::SolverConverged) => {}
        other => {
            return Err(PortfolioError::OptimizationNonConvergence {
                reason: format!("refinement stopped after {iterations} iterations: {other:?}"),
            });
        }
    }

    let refined = refine
        .state
        .param
        .ok_or_else(|| PortfolioError::OptimizationNonConvergence {
            reason: "refinement returned no parameters".into(),
        })?;
    let weights = constraints.project(&refined);
    if !constraints.is_satisfied(&weights, FEASIBILITY_TOLERANCE) {
        return Err(PortfolioError::OptimizationNonConvergence {
            reason: "solution violates constraints".into(),
        });
    }

    debug!(
        objective = objective.name(),
        search_iters,
        refine_iters = iterations,
        cost = best_cost,
        "optimizer converged"
    );

    Ok(DVector::from_vec(weights))
}

fn initial_simplex(x0: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(x0.len() + 1);
    simplex.push(x0.to_vec());
    for i in 0..x0.len() {
        let mut vertex = x0.to_vec();
        vertex[i] += SIMPLEX_STEP;
        simplex.push(vertex);
    }
    simplex
}

/// Recover a domain error raised inside the cost function.
fn from_solver_error(err: argmin::core::Error) -> PortfolioError {
    match err.downcast::<PortfolioError>() {
        Ok(domain) => domain,
        Err(other) => PortfolioError::OptimizationNonConvergence {
            reason: other.to_string(),
        },
    }
}
