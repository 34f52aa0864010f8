use super::{interval_index, Interpolant};

/// Monotone piecewise cubic Hermite interpolant (Fritsch–Carlson).
///
/// Interior derivatives are the weighted harmonic mean of the neighbouring
/// secants, or zero at local extrema. End derivatives use the one-sided
/// three-point formula, limited so the end pieces stay monotone. Evaluation
/// outside the knot range is NaN.
#[derive(Debug, Clone)]
pub struct Pchip {
    x: Vec<f64>,
    y: Vec<f64>,
    d: Vec<f64>,
}

impl Pchip {
    /// `x` must be strictly increasing with at least two knots.
    pub fn fit(x: &[f64], y: &[f64]) -> Self {
        let n = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let m: Vec<f64> = y
            .windows(2)
            .zip(&h)
            .map(|(w, hk)| (w[1] - w[0]) / hk)
            .collect();

        let d = if n == 2 {
            vec![m[0], m[0]]
        } else {
            let mut d = vec![0.0; n];
            for k in 1..n - 1 {
                let (m0, m1) = (m[k - 1], m[k]);
                if m0 == 0.0 || m1 == 0.0 || m0.signum() != m1.signum() {
                    continue;
                }
                let w1 = 2.0 * h[k] + h[k - 1];
                let w2 = h[k] + 2.0 * h[k - 1];
                d[k] = (w1 + w2) / (w1 / m0 + w2 / m1);
            }
            d[0] = end_derivative(h[0], h[1], m[0], m[1]);
            d[n - 1] = end_derivative(h[n - 2], h[n - 3], m[n - 2], m[n - 3]);
            d
        };

        Self {
            x: x.to_vec(),
            y: y.to_vec(),
            d,
        }
    }

    pub fn derivatives(&self) -> &[f64] {
        &self.d
    }
}

impl Interpolant for Pchip {
    fn evaluate(&self, t: f64) -> f64 {
        let (Some(&lo), Some(&hi)) = (self.x.first(), self.x.last()) else {
            return f64::NAN;
        };
        if !(lo..=hi).contains(&t) {
            return f64::NAN;
        }

        let i = interval_index(&self.x, t);
        let h = self.x[i + 1] - self.x[i];
        let s = (t - self.x[i]) / h;
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        h00 * self.y[i] + h10 * h * self.d[i] + h01 * self.y[i + 1] + h11 * h * self.d[i + 1]
    }
}

fn sign(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v.signum()
    }
}

/// One-sided derivative at an end knot from the two nearest secants.
fn end_derivative(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}
