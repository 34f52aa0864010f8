//! Gap filling over a real, non-uniform day axis.
//!
//! Dates are converted to whole days elapsed since the first date, the finite
//! values become knots, and the selected fit is evaluated at every position.
//! Positions outside the observed span are always returned as NaN, whatever
//! the fit would extrapolate to.

mod cubic;
mod pchip;
mod smoothing_spline;

pub use cubic::NotAKnotSpline;
pub use pchip::Pchip;
pub use smoothing_spline::SmoothingSpline;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dates::{elapsed_days, resolve_dates, CalendarDate};
use crate::error::{ensure_same_len, PipelineError, Result};

/// Smoothing factor per known point used when none is supplied.
pub const DEFAULT_SMOOTHING_PER_POINT: f64 = 1e-3;

/// A fitted curve that can be evaluated anywhere on the day axis.
pub trait Interpolant {
    fn evaluate(&self, t: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Monotone piecewise cubic Hermite; never overshoots its neighbours
    #[default]
    Pchip,
    /// Not-a-knot cubic spline through every known point
    Cubic,
    /// Cubic smoothing spline bounded by a residual budget
    Univariate,
}

impl InterpolationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pchip => "pchip",
            Self::Cubic => "cubic",
            Self::Univariate => "univariate",
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterpolationMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pchip" => Ok(Self::Pchip),
            "cubic" => Ok(Self::Cubic),
            "univariate" => Ok(Self::Univariate),
            other => Err(PipelineError::InvalidArgument(format!(
                "method must be 'pchip', 'cubic', or 'univariate' (got '{}')",
                other
            ))),
        }
    }
}

/// Known points sorted by day, with same-day points averaged.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Knots {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Knots {
    pub fn from_known(axis: &[f64], values: &[f64]) -> Self {
        let mut pairs: Vec<(f64, f64)> = axis
            .iter()
            .zip(values)
            .filter(|(_, v)| v.is_finite())
            .map(|(&t, &v)| (t, v))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut x: Vec<f64> = Vec::with_capacity(pairs.len());
        let mut y: Vec<f64> = Vec::with_capacity(pairs.len());
        let mut run = 0usize;
        for (t, v) in pairs {
            if x.last() == Some(&t) {
                // Running mean of a same-day group
                run += 1;
                if let Some(last) = y.last_mut() {
                    *last += (v - *last) / run as f64;
                }
            } else {
                x.push(t);
                y.push(v);
                run = 1;
            }
        }
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn span(&self) -> Option<(f64, f64)> {
        Some((*self.x.first()?, *self.x.last()?))
    }
}

/// Index of the interval `[x[i], x[i + 1]]` holding `t`, clamped to the end
/// intervals for points outside the knot range. Needs at least two knots.
pub(crate) fn interval_index(x: &[f64], t: f64) -> usize {
    let upper = x.partition_point(|&xi| xi <= t);
    upper.saturating_sub(1).min(x.len() - 2)
}

/// Fill the gaps of `values` along the time axis given by `dates`.
///
/// Series with fewer than two known values come back unchanged. Known values
/// are returned as given except by the univariate method, which re-evaluates
/// every position. `smooth` is only read by the univariate method and defaults
/// to `0.001 × known points`.
pub fn spline_interpolate<D: CalendarDate>(
    dates: &[D],
    values: &[f64],
    method: InterpolationMethod,
    smooth: Option<f64>,
) -> Result<Vec<f64>> {
    ensure_same_len(dates.len(), values.len())?;
    if let Some(s) = smooth {
        if !s.is_finite() || s < 0.0 {
            return Err(PipelineError::InvalidArgument(format!(
                "smoothing factor must be a non-negative number (got {})",
                s
            )));
        }
    }

    let axis = elapsed_days(&resolve_dates(dates)?);
    let known_count = values.iter().filter(|v| v.is_finite()).count();
    if known_count < 2 {
        tracing::debug!(
            "Only {} known values, skipping {} interpolation",
            known_count,
            method
        );
        return Ok(values.to_vec());
    }

    let knots = Knots::from_known(&axis, values);
    let Some((first_day, last_day)) = knots.span().filter(|_| knots.len() >= 2) else {
        return Ok(values.to_vec());
    };

    let fit: Box<dyn Interpolant> = match method {
        InterpolationMethod::Pchip => Box::new(Pchip::fit(&knots.x, &knots.y)),
        InterpolationMethod::Cubic => Box::new(NotAKnotSpline::fit(&knots.x, &knots.y)?),
        InterpolationMethod::Univariate => {
            let s = smooth.unwrap_or(DEFAULT_SMOOTHING_PER_POINT * known_count as f64);
            Box::new(SmoothingSpline::fit(&knots.x, &knots.y, s)?)
        }
    };

    // Only the smoothing spline may move a known value.
    let keep_known = method != InterpolationMethod::Univariate;
    let filled = axis
        .iter()
        .zip(values)
        .map(|(&t, &v)| {
            if keep_known && v.is_finite() {
                v
            } else if t < first_day || t > last_day {
                f64::NAN
            } else {
                fit.evaluate(t)
            }
        })
        .collect();

    Ok(filled)
}
