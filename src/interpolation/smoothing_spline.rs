use nalgebra::{DMatrix, DVector};

use super::cubic::PiecewiseCubic;
use super::Interpolant;
use crate::error::{PipelineError, Result};

const MAX_BRACKET_STEPS: usize = 80;
const BISECTION_STEPS: usize = 200;

/// Natural cubic smoothing spline (Reinsch).
///
/// Minimises the integrated squared second derivative among all curves whose
/// residual sum of squares at the knots does not exceed `smoothing`. A budget
/// of zero interpolates; a budget at least as large as the residual of the
/// least-squares cubic polynomial yields that polynomial (a parabola for three
/// knots).
#[derive(Debug, Clone)]
pub struct SmoothingSpline {
    curve: PiecewiseCubic,
    lambda: f64,
    residual: f64,
}

impl SmoothingSpline {
    /// `x` must be strictly increasing with at least two knots.
    pub fn fit(x: &[f64], y: &[f64], smoothing: f64) -> Result<Self> {
        let n = x.len();
        if n < 2 {
            return Err(PipelineError::InvalidArgument(
                "smoothing spline needs at least two knots".to_string(),
            ));
        }
        if n == 2 {
            return Ok(Self::from_values(x, y.to_vec(), vec![0.0; 2], 0.0, 0.0));
        }

        let system = ReinschSystem::new(x, y);

        if smoothing <= 0.0 {
            let fit = system.solve(0.0)?;
            return Ok(Self::from_fit(x, fit, 0.0));
        }

        let poly = LeastSquaresPolynomial::fit(x, y, 3)?;
        if smoothing >= poly.residual {
            return Ok(Self::from_values(
                x,
                poly.values,
                poly.second_derivatives,
                f64::INFINITY,
                poly.residual,
            ));
        }

        // Residual grows monotonically with lambda; bracket then bisect.
        let mut lo = 0.0_f64;
        let mut hi = 1e-6_f64;
        let mut steps = 0;
        while system.solve(hi)?.residual < smoothing && steps < MAX_BRACKET_STEPS {
            lo = hi;
            hi *= 10.0;
            steps += 1;
        }

        for _ in 0..BISECTION_STEPS {
            let mid = if lo > 0.0 { (lo * hi).sqrt() } else { hi / 2.0 };
            if system.solve(mid)?.residual < smoothing {
                lo = mid;
            } else {
                hi = mid;
            }
            if (hi - lo) <= hi * 1e-12 {
                break;
            }
        }

        let fit = system.solve(lo)?;
        tracing::debug!(
            "Smoothing spline: lambda={:.3e}, residual={:.3e} (budget {:.3e})",
            lo,
            fit.residual,
            smoothing
        );
        Ok(Self::from_fit(x, fit, lo))
    }

    /// Penalty weight selected to meet the residual budget.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Residual sum of squares at the knots.
    pub fn residual(&self) -> f64 {
        self.residual
    }

    fn from_fit(x: &[f64], fit: ReinschFit, lambda: f64) -> Self {
        Self::from_values(x, fit.values, fit.second_derivatives, lambda, fit.residual)
    }

    fn from_values(x: &[f64], y: Vec<f64>, m: Vec<f64>, lambda: f64, residual: f64) -> Self {
        Self {
            curve: PiecewiseCubic { x: x.to_vec(), y, m },
            lambda,
            residual,
        }
    }
}

impl Interpolant for SmoothingSpline {
    fn evaluate(&self, t: f64) -> f64 {
        self.curve.evaluate(t)
    }
}

struct ReinschFit {
    values: Vec<f64>,
    second_derivatives: Vec<f64>,
    residual: f64,
}

/// Banded matrices of the natural-spline penalty, held dense.
struct ReinschSystem {
    q: DMatrix<f64>,
    r: DMatrix<f64>,
    qtq: DMatrix<f64>,
    qty: DVector<f64>,
    y: DVector<f64>,
}

impl ReinschSystem {
    fn new(x: &[f64], y: &[f64]) -> Self {
        let n = x.len();
        let k = n - 2;
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        let mut q = DMatrix::<f64>::zeros(n, k);
        let mut r = DMatrix::<f64>::zeros(k, k);
        for j in 0..k {
            // Column j belongs to interior knot j + 1
            q[(j, j)] = 1.0 / h[j];
            q[(j + 1, j)] = -1.0 / h[j] - 1.0 / h[j + 1];
            q[(j + 2, j)] = 1.0 / h[j + 1];

            r[(j, j)] = (h[j] + h[j + 1]) / 3.0;
            if j + 1 < k {
                r[(j, j + 1)] = h[j + 1] / 6.0;
                r[(j + 1, j)] = h[j + 1] / 6.0;
            }
        }

        let y = DVector::from_column_slice(y);
        let qtq = q.transpose() * &q;
        let qty = q.transpose() * &y;
        Self { q, r, qtq, qty, y }
    }

    fn solve(&self, lambda: f64) -> Result<ReinschFit> {
        let a = &self.r + &self.qtq * lambda;
        let gamma = a.lu().solve(&self.qty).ok_or_else(|| {
            PipelineError::InvalidArgument("smoothing spline system is singular".to_string())
        })?;

        let correction = &self.q * &gamma * lambda;
        let values = &self.y - &correction;
        let residual = correction.norm_squared();

        let mut second_derivatives = Vec::with_capacity(gamma.len() + 2);
        second_derivatives.push(0.0);
        second_derivatives.extend(gamma.iter().copied());
        second_derivatives.push(0.0);

        Ok(ReinschFit {
            values: values.iter().copied().collect(),
            second_derivatives,
            residual,
        })
    }
}

/// Least-squares polynomial of degree `min(degree, n - 1)` evaluated at the
/// knots, fitted on a centred and scaled axis.
struct LeastSquaresPolynomial {
    values: Vec<f64>,
    second_derivatives: Vec<f64>,
    residual: f64,
}

impl LeastSquaresPolynomial {
    fn fit(x: &[f64], y: &[f64], degree: usize) -> Result<Self> {
        let n = x.len();
        let degree = degree.min(n - 1);
        let centre = x.iter().sum::<f64>() / n as f64;
        let scale = x
            .iter()
            .map(|xi| (xi - centre).abs())
            .fold(0.0_f64, f64::max)
            .max(f64::MIN_POSITIVE);
        let u: Vec<f64> = x.iter().map(|xi| (xi - centre) / scale).collect();

        let design = DMatrix::from_fn(n, degree + 1, |i, j| u[i].powi(j as i32));
        let coeffs = design
            .clone()
            .svd(true, true)
            .solve(&DVector::from_column_slice(y), 1e-12)
            .map_err(|e| PipelineError::InvalidArgument(format!("polynomial fit failed: {}", e)))?;

        let fitted = &design * &coeffs;
        let residual = fitted
            .iter()
            .zip(y)
            .map(|(fit, yi)| (yi - fit).powi(2))
            .sum();
        let second_derivatives = u
            .iter()
            .map(|&ui| {
                (2..=degree)
                    .map(|j| (j * (j - 1)) as f64 * coeffs[j] * ui.powi(j as i32 - 2))
                    .sum::<f64>()
                    / (scale * scale)
            })
            .collect();

        Ok(Self {
            values: fitted.iter().copied().collect(),
            second_derivatives,
            residual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_series() -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..12).map(|i| i as f64 * 5.0).collect();
        let noise = [0.02, -0.015, 0.01, -0.02, 0.018, -0.01, 0.012, -0.017, 0.009, -0.011, 0.015, -0.008];
        let y = x
            .iter()
            .zip(noise)
            .map(|(t, e)| 0.3 + 0.4 * (t / 20.0).sin() + e)
            .collect();
        (x, y)
    }

    #[test]
    fn test_zero_budget_interpolates() {
        let (x, y) = noisy_series();
        let spline = SmoothingSpline::fit(&x, &y, 0.0).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!((spline.evaluate(*xi) - yi).abs() < 1e-10);
        }
    }

    #[test]
    fn test_residual_meets_budget() {
        let (x, y) = noisy_series();
        let budget = LeastSquaresPolynomial::fit(&x, &y, 3).unwrap().residual * 0.6;
        let spline = SmoothingSpline::fit(&x, &y, budget).unwrap();
        assert!(spline.lambda() > 0.0 && spline.lambda().is_finite());
        assert!(spline.residual() <= budget * (1.0 + 1e-6));
        assert!(spline.residual() > budget * 0.9, "residual {}", spline.residual());

        let rss: f64 = x
            .iter()
            .zip(&y)
            .map(|(xi, yi)| (spline.evaluate(*xi) - yi).powi(2))
            .sum();
        assert!((rss - spline.residual()).abs() < 1e-9);
    }

    #[test]
    fn test_large_budget_gives_least_squares_cubic() {
        // Symmetric data: the cubic fit is the parabola 0.4 + 2/7 - (x - 2)^2 / 7
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 1.0, 0.0, 1.0, 0.0];
        let spline = SmoothingSpline::fit(&x, &y, 100.0).unwrap();
        for t in [0.0, 0.5, 1.0, 2.0, 2.7, 4.0] {
            let expected = 0.4 + 2.0 / 7.0 - (t - 2.0_f64).powi(2) / 7.0;
            assert!((spline.evaluate(t) - expected).abs() < 1e-9, "at {}", t);
        }
        assert!((spline.residual() - 0.32 / 0.35).abs() < 1e-9);
        assert!(spline.lambda().is_infinite());
    }

    #[test]
    fn test_cubic_data_is_reproduced_under_any_positive_budget() {
        let x = [0.0, 2.0, 3.0, 7.0, 8.0, 12.0];
        let cubic = |t: f64| 0.2 + 0.05 * t - 0.01 * t * t + 0.0007 * t * t * t;
        let y: Vec<f64> = x.iter().map(|&t| cubic(t)).collect();
        for budget in [1e-6, 1e-3, 1.0] {
            let spline = SmoothingSpline::fit(&x, &y, budget).unwrap();
            for t in [1.0, 5.5, 10.0] {
                assert!((spline.evaluate(t) - cubic(t)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_budget_below_cubic_residual_uses_spline() {
        let (x, y) = noisy_series();
        let poly = LeastSquaresPolynomial::fit(&x, &y, 3).unwrap();
        let budget = poly.residual * 0.5;
        let spline = SmoothingSpline::fit(&x, &y, budget).unwrap();
        assert!(spline.lambda().is_finite());
        assert!(spline.residual() <= budget * (1.0 + 1e-6));
    }

    #[test]
    fn test_linear_data_is_exact_for_any_budget() {
        let x = [0.0, 3.0, 4.0, 10.0];
        let y: Vec<f64> = x.iter().map(|t| 0.1 + 0.05 * t).collect();
        for budget in [0.0, 1e-4, 1.0] {
            let spline = SmoothingSpline::fit(&x, &y, budget).unwrap();
            assert!((spline.evaluate(7.0) - 0.45).abs() < 1e-9);
        }
    }
}
