//! # Traffic analysis
//!
//! Classifies the lanes around the ego vehicle as safe or unsafe from the other vehicles reported
//! by sensor fusion. Each vehicle is propagated forward at constant speed to the time at which
//! the ego vehicle will reach the end of its queued trajectory, and then compared against the ego
//! position at that same time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use comms_if::sim::SensorFusionRecord;
use util::maths::wrap_signed;

use crate::planner::Params;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of lanes on one side of the highway.
pub const NUM_LANES: u8 = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Another vehicle on the road as seen by sensor fusion.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerceivedVehicle {
    /// Identifier assigned by the simulator
    pub id: f64,

    /// Velocity in the map frame
    pub vx_ms: f64,
    pub vy_ms: f64,

    /// Frenet position
    pub s_m: f64,
    pub d_m: f64,
}

/// Safety of the lanes around the ego vehicle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSafetyFlags {
    /// A vehicle is ahead of us in our lane, closer than the safe gap.
    pub blocked_ahead: bool,

    /// A vehicle in the lane to the left is within the safe gap, ahead or behind.
    pub unsafe_left: bool,

    /// A vehicle in the lane to the right is within the safe gap, ahead or behind.
    pub unsafe_right: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PerceivedVehicle {
    /// Speed of the vehicle, assumed to be along the track.
    pub fn speed_ms(&self) -> f64 {
        self.vx_ms.hypot(self.vy_ms)
    }
}

impl From<&SensorFusionRecord> for PerceivedVehicle {
    fn from(rec: &SensorFusionRecord) -> Self {
        Self {
            id: rec.id,
            vx_ms: rec.vx,
            vy_ms: rec.vy,
            s_m: rec.s,
            d_m: rec.d,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the lane a lateral offset lies in, or `None` if it's outside of the road.
///
/// Lanes are `lane_width_m` wide starting at the centreline, with the outer edge of the last lane
/// counted as part of it.
pub fn lane_of(d_m: f64, lane_width_m: f64) -> Option<u8> {
    let road_width_m = NUM_LANES as f64 * lane_width_m;

    if !(0.0..=road_width_m).contains(&d_m) {
        return None;
    }

    Some(((d_m / lane_width_m).floor() as u8).min(NUM_LANES - 1))
}

/// Classify the lanes around the ego vehicle.
///
/// # Inputs
/// - `params`: planner parameters, for the safe gap, lane width, tick period and track length
/// - `ego_lane`: the lane the ego vehicle is targeting
/// - `ego_s_m`: the ego position along the track at the end of the queued trajectory
/// - `horizon`: the number of queued trajectory points, used to propagate the other vehicles
/// - `vehicles`: the other vehicles reported this tick
pub fn check_lanes(
    params: &Params,
    ego_lane: u8,
    ego_s_m: f64,
    horizon: usize,
    vehicles: &[PerceivedVehicle],
) -> LaneSafetyFlags {
    let mut flags = LaneSafetyFlags::default();

    let horizon_s = horizon as f64 * params.update_period_s;

    for vehicle in vehicles {
        let lane = match lane_of(vehicle.d_m, params.lane_width_m) {
            Some(l) => l,
            None => continue,
        };

        let predicted_s_m = vehicle.s_m + horizon_s * vehicle.speed_ms();

        // Signed gap from us to them, taking the shorter way round the track
        let gap_m = wrap_signed(predicted_s_m - ego_s_m, params.max_s_m);

        if lane == ego_lane {
            if gap_m > 0.0 && gap_m < params.safe_gap_m {
                debug!("Vehicle {} is {:.2} m ahead in our lane", vehicle.id, gap_m);
                flags.blocked_ahead = true;
            }
        } else if gap_m.abs() < params.safe_gap_m {
            if lane + 1 == ego_lane {
                debug!("Vehicle {} is {:.2} m from us in the left lane", vehicle.id, gap_m);
                flags.unsafe_left = true;
            } else if lane == ego_lane + 1 {
                debug!("Vehicle {} is {:.2} m from us in the right lane", vehicle.id, gap_m);
                flags.unsafe_right = true;
            }
        }
    }

    trace!("Lane safety: {:?}", flags);

    flags
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
