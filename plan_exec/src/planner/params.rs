//! Planner parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the planner.
///
/// Any value missing from the parameter file takes its default.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Params {

    /// Minimum longitudinal gap to another vehicle in the same or a neighbouring lane for that
    /// lane to be considered safe.
    pub safe_gap_m: f64,

    /// Target cruise speed.
    pub max_speed_mph: f64,

    /// Change in target speed per tick.
    pub max_acc_mph: f64,

    /// Width of a single lane.
    pub lane_width_m: f64,

    /// Spacing of the far anchor points along the track, also the horizon over which the
    /// trajectory spline is resampled.
    pub prediction_base_step_m: f64,

    /// Number of points in every emitted trajectory.
    pub n_prediction_points: usize,

    /// Time between two consecutive trajectory points, also the nominal tick period.
    pub update_period_s: f64,

    /// Conversion factor from metres per second to miles per hour.
    pub speed_conversion: f64,

    /// Length of the track, after which `s` wraps back to zero.
    pub max_s_m: f64,

    /// Lane the vehicle starts in.
    pub start_lane: u8,

    /// Fixed point off the track used to decide which side of the centreline a position is on.
    pub track_centre_m: [f64; 2],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            safe_gap_m: 30.0,
            max_speed_mph: 49.5,
            max_acc_mph: 0.224,
            lane_width_m: 4.0,
            prediction_base_step_m: 30.0,
            n_prediction_points: 50,
            update_period_s: 0.02,
            speed_conversion: 2.24,
            max_s_m: 6945.554,
            start_lane: 1,
            track_centre_m: [1000.0, 2000.0],
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_params() {
        let params: Params = util::params::from_toml_str(
            "safe_gap_m = 25.0\nstart_lane = 2\n"
        ).unwrap();

        assert_eq!(params.safe_gap_m, 25.0);
        assert_eq!(params.start_lane, 2);
        assert_eq!(params.n_prediction_points, 50);
        assert_eq!(params.track_centre_m, [1000.0, 2000.0]);
    }
}
