//! Finite-difference Hessians and standard errors from observed information.
//!
//! For the combined error models the objective is `J = -2·R·ll + const`, so the
//! covariance of the fitted `(a, b)` is approximately `2R · H⁻¹` where `H` is
//! the Hessian of `J` at the optimum. The inverse is formed through a symmetric
//! eigendecomposition; a Hessian that is not positive definite yields `None`.

use nalgebra::DMatrix;

/// Eigenvalues at or below this are treated as non-positive.
const EIGEN_EPS: f64 = 1e-12;

/// Relative step for central differences (≈ ε^(1/4)).
const REL_STEP: f64 = 1e-4;

/// Central finite-difference Hessian of `f` at `x`.
pub fn hessian<F>(f: F, x: &[f64]) -> DMatrix<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let n = x.len();
    let steps: Vec<f64> = x.iter().map(|v| REL_STEP * v.abs().max(1e-2)).collect();
    let f0 = f(x);
    let mut h = DMatrix::<f64>::zeros(n, n);
    let mut work = x.to_vec();

    for i in 0..n {
        let hi = steps[i];
        work[i] = x[i] + hi;
        let fp = f(&work);
        work[i] = x[i] - hi;
        let fm = f(&work);
        work[i] = x[i];
        h[(i, i)] = (fp - 2.0 * f0 + fm) / (hi * hi);

        for j in (i + 1)..n {
            let hj = steps[j];
            let mut eval = |di: f64, dj: f64| {
                work[i] = x[i] + di;
                work[j] = x[j] + dj;
                let v = f(&work);
                work[i] = x[i];
                work[j] = x[j];
                v
            };
            let fpp = eval(hi, hj);
            let fpm = eval(hi, -hj);
            let fmp = eval(-hi, hj);
            let fmm = eval(-hi, -hj);
            let v = (fpp - fpm - fmp + fmm) / (4.0 * hi * hj);
            h[(i, j)] = v;
            h[(j, i)] = v;
        }
    }
    h
}

/// Standard errors `sqrt(diag(scale · H⁻¹))`.
///
/// Returns `None` when `H` has non-finite entries or is not positive definite.
pub fn standard_errors(h: &DMatrix<f64>, scale: f64) -> Option<Vec<f64>> {
    if !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    let eig = h.clone().symmetric_eigen();
    if eig.eigenvalues.iter().any(|&l| l <= EIGEN_EPS) {
        return None;
    }

    let n = h.nrows();
    let mut se = Vec::with_capacity(n);
    for i in 0..n {
        let mut var = 0.0;
        for (k, &lambda) in eig.eigenvalues.iter().enumerate() {
            let v = eig.eigenvectors[(i, k)];
            var += v * v / lambda;
        }
        let var = scale * var;
        if !(var.is_finite() && var >= 0.0) {
            return None;
        }
        se.push(var.sqrt());
    }
    Some(se)
}
