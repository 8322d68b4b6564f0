//! Levenberg–Marquardt core.
//!
//! Model-agnostic damped least squares over a residual closure:
//!
//! - forward-difference Jacobian with caller-supplied parameter scales
//!   (the vector mixes Hz-sized frequencies with dimensionless gains, so a
//!   single relative step would starve some columns)
//! - Marquardt column scaling: the damping term is `sqrt(λ)·diag(‖J_j‖)`,
//!   which makes the trust region invariant to parameter units
//! - each trial step is clamped into `[lower, upper]` before evaluation
//! - non-finite trial SSEs are rejected like any uphill step
//!
//! Deterministic throughout: identical inputs produce identical iterates.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::math::solve_least_squares;

/// Knobs for a single optimization.
#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iters: usize,
    /// Relative SSE-change threshold for convergence.
    pub tol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            tol: 1e-10,
        }
    }
}

/// Result of a single optimization.
#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: Vec<f64>,
    pub sse: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Bounds and finite-difference scales for each parameter.
#[derive(Debug, Clone)]
pub struct ParamSpace {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// Typical magnitude per parameter; sets the finite-difference step
    /// `h_j = 1e-7 · max(|x_j|, scale_j)`.
    pub scales: Vec<f64>,
}

impl ParamSpace {
    fn clamp(&self, x: &mut [f64]) {
        for (j, v) in x.iter_mut().enumerate() {
            *v = v.clamp(self.lower[j], self.upper[j]);
        }
    }
}

const REL_STEP: f64 = 1e-7;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e12;
const MAX_DAMPING_TRIALS: usize = 20;

/// Minimize `‖r(x)‖²` where `residual_fn(x, out)` fills `out` with residuals.
pub fn minimize<F>(
    residual_fn: F,
    x0: &[f64],
    space: &ParamSpace,
    m: usize,
    opts: &LmOptions,
) -> Result<LmOutcome, AppError>
where
    F: Fn(&[f64], &mut [f64]),
{
    let p = x0.len();
    if p == 0 || m < p {
        return Err(AppError::fit(format!(
            "Underdetermined system: {m} residuals for {p} parameters."
        )));
    }
    if space.lower.len() != p || space.upper.len() != p || space.scales.len() != p {
        return Err(AppError::fit("Parameter space dimensions do not match x0."));
    }

    let mut x = x0.to_vec();
    space.clamp(&mut x);

    let mut r = vec![0.0; m];
    residual_fn(&x, &mut r);
    let mut sse = dot(&r, &r);
    if !sse.is_finite() {
        return Err(AppError::fit("Initial residuals are not finite."));
    }

    let mut lambda = LAMBDA_INIT;
    let mut converged = false;
    let mut iterations = 0;

    let mut r_trial = vec![0.0; m];

    for iter in 0..opts.max_iters {
        iterations = iter + 1;

        let jac = jacobian(&residual_fn, &x, &r, space, m);

        // Column norms for Marquardt scaling (floored so dead columns do not
        // produce a singular damping block).
        let mut col_norms = vec![0.0; p];
        for j in 0..p {
            col_norms[j] = jac.column(j).norm().max(1e-12);
        }

        let mut accepted = false;
        for _ in 0..MAX_DAMPING_TRIALS {
            let Some(delta) = damped_step(&jac, &r, &col_norms, lambda) else {
                lambda = (lambda * 10.0).min(LAMBDA_MAX);
                continue;
            };

            let mut x_trial = x.clone();
            for j in 0..p {
                x_trial[j] += delta[j];
            }
            space.clamp(&mut x_trial);

            residual_fn(&x_trial, &mut r_trial);
            let sse_trial = dot(&r_trial, &r_trial);

            if sse_trial.is_finite() && sse_trial < sse {
                let rel_drop = (sse - sse_trial) / sse.max(1e-300);
                x = x_trial;
                std::mem::swap(&mut r, &mut r_trial);
                sse = sse_trial;
                lambda = (lambda / 10.0).max(1e-12);
                accepted = true;

                if rel_drop < opts.tol {
                    converged = true;
                }
                break;
            }

            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                break;
            }
        }

        if !accepted {
            // No downhill step at any damping level: we are at a (local)
            // minimum to within finite-difference noise.
            converged = true;
        }
        if converged {
            break;
        }
    }

    Ok(LmOutcome {
        params: x,
        sse,
        iterations,
        converged,
    })
}

/// Forward-difference Jacobian of the residual vector.
fn jacobian<F>(residual_fn: &F, x: &[f64], r0: &[f64], space: &ParamSpace, m: usize) -> DMatrix<f64>
where
    F: Fn(&[f64], &mut [f64]),
{
    let p = x.len();
    let mut jac = DMatrix::<f64>::zeros(m, p);
    let mut r_step = vec![0.0; m];

    for j in 0..p {
        let h = REL_STEP * x[j].abs().max(space.scales[j].abs().max(1e-12));

        let mut x_step = x.to_vec();
        // Step away from an active upper bound, not through it.
        if x_step[j] + h > space.upper[j] {
            x_step[j] -= h;
        } else {
            x_step[j] += h;
        }
        let signed_h = x_step[j] - x[j];
        if signed_h == 0.0 {
            continue;
        }

        residual_fn(&x_step, &mut r_step);
        for i in 0..m {
            jac[(i, j)] = (r_step[i] - r0[i]) / signed_h;
        }
    }

    jac
}

/// Solve the damped least-squares subproblem for the step `δ`:
/// stack `J` on top of `sqrt(λ)·diag(col_norms)` and solve against `[-r; 0]`.
fn damped_step(jac: &DMatrix<f64>, r: &[f64], col_norms: &[f64], lambda: f64) -> Option<Vec<f64>> {
    let (m, p) = jac.shape();
    let mut a = DMatrix::<f64>::zeros(m + p, p);
    let mut b = DVector::<f64>::zeros(m + p);

    a.view_mut((0, 0), (m, p)).copy_from(jac);
    for i in 0..m {
        b[i] = -r[i];
    }
    let sqrt_lambda = lambda.sqrt();
    for j in 0..p {
        a[(m + j, j)] = sqrt_lambda * col_norms[j];
    }

    let delta = solve_least_squares(&a, &b)?;
    Some(delta.iter().copied().collect())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unbounded(p: usize, scale: f64) -> ParamSpace {
        ParamSpace {
            lower: vec![f64::NEG_INFINITY; p],
            upper: vec![f64::INFINITY; p],
            scales: vec![scale; p],
        }
    }

    #[test]
    fn minimizes_linear_least_squares_in_one_step_family() {
        // r_i = y_i - (a + b t_i), exact solution a=2, b=3.
        let t: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = t.iter().map(|&ti| 2.0 + 3.0 * ti).collect();

        let residual = |x: &[f64], out: &mut [f64]| {
            for (i, (&ti, &yi)) in t.iter().zip(y.iter()).enumerate() {
                out[i] = yi - (x[0] + x[1] * ti);
            }
        };

        let out = minimize(
            residual,
            &[0.0, 0.0],
            &unbounded(2, 1.0),
            t.len(),
            &LmOptions::default(),
        )
        .unwrap();

        assert!(out.converged);
        assert!((out.params[0] - 2.0).abs() < 1e-6);
        assert!((out.params[1] - 3.0).abs() < 1e-6);
        assert!(out.sse < 1e-10);
    }

    #[test]
    fn fits_rosenbrock_style_nonlinear_residuals() {
        // Classic Rosenbrock in residual form: r = [1 - x, 10(y - x²)].
        let residual = |x: &[f64], out: &mut [f64]| {
            out[0] = 1.0 - x[0];
            out[1] = 10.0 * (x[1] - x[0] * x[0]);
        };

        let opts = LmOptions {
            max_iters: 200,
            tol: 1e-14,
        };
        let out = minimize(residual, &[-1.2, 1.0], &unbounded(2, 1.0), 2, &opts).unwrap();

        assert!((out.params[0] - 1.0).abs() < 1e-4, "x = {:?}", out.params);
        assert!((out.params[1] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn respects_bounds() {
        // Unconstrained minimum at x = 5, but the box stops at 2.
        let residual = |x: &[f64], out: &mut [f64]| {
            out[0] = x[0] - 5.0;
            out[1] = 0.0;
        };
        let space = ParamSpace {
            lower: vec![0.0],
            upper: vec![2.0],
            scales: vec![1.0],
        };
        let out = minimize(residual, &[1.0], &space, 2, &LmOptions::default()).unwrap();
        assert!((out.params[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_underdetermined_problems() {
        let residual = |_x: &[f64], out: &mut [f64]| out[0] = 0.0;
        let err = minimize(residual, &[0.0, 0.0], &unbounded(2, 1.0), 1, &LmOptions::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
