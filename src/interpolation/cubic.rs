use nalgebra::{DMatrix, DVector};

use super::{interval_index, Interpolant};
use crate::error::{PipelineError, Result};

/// Cubic spline stored as knot values plus second derivatives at the knots.
/// Outside the knot range the end pieces are extended.
#[derive(Debug, Clone)]
pub(crate) struct PiecewiseCubic {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub m: Vec<f64>,
}

impl PiecewiseCubic {
    pub fn evaluate(&self, t: f64) -> f64 {
        let i = interval_index(&self.x, t);
        let h = self.x[i + 1] - self.x[i];
        let a = self.x[i + 1] - t;
        let b = t - self.x[i];

        self.m[i] * a.powi(3) / (6.0 * h)
            + self.m[i + 1] * b.powi(3) / (6.0 * h)
            + (self.y[i] / h - self.m[i] * h / 6.0) * a
            + (self.y[i + 1] / h - self.m[i + 1] * h / 6.0) * b
    }
}

/// Interpolating cubic spline with not-a-knot end conditions: the third
/// derivative is continuous across the second and the second-to-last knots.
///
/// Two knots give the straight line and three knots the parabola through
/// them. Evaluation extrapolates with the end pieces.
#[derive(Debug, Clone)]
pub struct NotAKnotSpline {
    curve: PiecewiseCubic,
}

impl NotAKnotSpline {
    /// `x` must be strictly increasing with at least two knots.
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self> {
        let n = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let slopes: Vec<f64> = y
            .windows(2)
            .zip(&h)
            .map(|(w, hk)| (w[1] - w[0]) / hk)
            .collect();

        let m = match n {
            0 | 1 => {
                return Err(PipelineError::InvalidArgument(
                    "cubic spline needs at least two knots".to_string(),
                ))
            }
            2 => vec![0.0; 2],
            3 => {
                let curvature = 2.0 * (slopes[1] - slopes[0]) / (x[2] - x[0]);
                vec![curvature; 3]
            }
            _ => solve_not_a_knot(&h, &slopes)?,
        };

        Ok(Self {
            curve: PiecewiseCubic {
                x: x.to_vec(),
                y: y.to_vec(),
                m,
            },
        })
    }
}

impl Interpolant for NotAKnotSpline {
    fn evaluate(&self, t: f64) -> f64 {
        self.curve.evaluate(t)
    }
}

fn solve_not_a_knot(h: &[f64], slopes: &[f64]) -> Result<Vec<f64>> {
    let n = h.len() + 1;
    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);

    a[(0, 0)] = -h[1];
    a[(0, 1)] = h[0] + h[1];
    a[(0, 2)] = -h[0];

    for i in 1..n - 1 {
        a[(i, i - 1)] = h[i - 1];
        a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
        a[(i, i + 1)] = h[i];
        rhs[i] = 6.0 * (slopes[i] - slopes[i - 1]);
    }

    a[(n - 1, n - 3)] = -h[n - 2];
    a[(n - 1, n - 2)] = h[n - 3] + h[n - 2];
    a[(n - 1, n - 1)] = -h[n - 3];

    let solution = a.lu().solve(&rhs).ok_or_else(|| {
        PipelineError::InvalidArgument("cubic spline system is singular".to_string())
    })?;
    Ok(solution.iter().copied().collect())
}
