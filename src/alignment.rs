use crate::dates::ObservationDate;
use crate::models::{AlignedSeries, RawObservation};

/// Drop incomplete observations and split the rest into parallel arrays.
///
/// The filter is stable: surviving observations keep their input order and
/// are never re-sorted or de-duplicated. The timestamp is not a required
/// field, so an observation without one survives with an `Unknown` date.
/// When `track_total_pixels` is set the total pixel count becomes required
/// and `total_pixels` is populated (possibly empty).
pub fn align_records(observations: &[RawObservation], track_total_pixels: bool) -> AlignedSeries {
    let mut series = AlignedSeries {
        total_pixels: track_total_pixels.then(Vec::new),
        ..Default::default()
    };

    for obs in observations {
        let Some(complete) = CompleteObservation::from_raw(obs, track_total_pixels) else {
            continue;
        };
        series.dates.push(ObservationDate::from_timestamp_ms(obs.timestamp_ms));
        series.mean.push(complete.mean);
        series.median.push(complete.median);
        series.stddev.push(complete.stddev);
        series.p10.push(complete.p10);
        series.p90.push(complete.p90);
        series.valid_pixels.push(complete.valid_pixels);
        if let (Some(totals), Some(total)) = (series.total_pixels.as_mut(), complete.total_pixels) {
            totals.push(total);
        }
    }

    let discarded = observations.len() - series.len();
    if discarded > 0 {
        tracing::debug!(
            "Discarded {} of {} observations with missing statistics",
            discarded,
            observations.len()
        );
    }

    series
}

struct CompleteObservation {
    mean: f64,
    median: f64,
    stddev: f64,
    p10: f64,
    p90: f64,
    valid_pixels: u64,
    total_pixels: Option<u64>,
}

impl CompleteObservation {
    fn from_raw(obs: &RawObservation, track_total_pixels: bool) -> Option<Self> {
        let total_pixels = if track_total_pixels {
            Some(obs.total_pixel_count?)
        } else {
            None
        };
        Some(Self {
            mean: obs.mean?,
            median: obs.median?,
            stddev: obs.stddev?,
            p10: obs.p10?,
            p90: obs.p90?,
            valid_pixels: obs.valid_pixel_count?,
            total_pixels,
        })
    }
}
