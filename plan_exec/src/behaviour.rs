//! # Behaviour decision
//!
//! A fixed rule set choosing the target lane and speed of the ego vehicle from the lane safety
//! flags of the current tick:
//!
//! - When blocked ahead, move to the left lane if it's safe, else to the right lane if it's safe,
//!   else slow down.
//! - When not blocked, return to the centre lane from an outer lane if the lane towards the centre
//!   is safe, and accelerate towards the maximum speed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    planner::Params,
    traffic::{LaneSafetyFlags, NUM_LANES},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The lane the vehicle returns to when the road ahead is clear.
pub const CENTRE_LANE: u8 = NUM_LANES / 2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Persistent target state of one ego vehicle, carried between ticks.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Target lane, from 0 (next to the centreline) to `NUM_LANES - 1`.
    pub lane: u8,

    /// Target speed, never negative.
    pub speed_mph: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The decision taken on a tick.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Stay in the current lane
    KeepLane,

    /// Move one lane towards the centreline to pass a blocking vehicle
    ShiftLeft,

    /// Move one lane away from the centreline to pass a blocking vehicle
    ShiftRight,

    /// Return to the centre lane
    Recentre,

    /// Blocked with no safe lane to move to
    SlowDown,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    /// Create a stationary vehicle state in the given lane, clamped onto the road.
    pub fn new(lane: u8) -> Self {
        Self {
            lane: lane.min(NUM_LANES - 1),
            speed_mph: 0.0,
        }
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::new(CENTRE_LANE)
    }
}

impl Default for Decision {
    fn default() -> Self {
        Decision::KeepLane
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Update the vehicle state from this tick's lane safety flags.
///
/// Returns the decision that was taken.
pub fn choose_behaviour(
    params: &Params,
    state: &mut VehicleState,
    flags: LaneSafetyFlags,
) -> Decision {
    let decision = if flags.blocked_ahead {
        if !flags.unsafe_left && state.lane > 0 {
            state.lane -= 1;
            Decision::ShiftLeft
        } else if !flags.unsafe_right && state.lane < NUM_LANES - 1 {
            state.lane += 1;
            Decision::ShiftRight
        } else {
            state.speed_mph = (state.speed_mph - params.max_acc_mph).max(0.0);
            Decision::SlowDown
        }
    } else {
        let can_recentre = (state.lane > CENTRE_LANE && !flags.unsafe_left)
            || (state.lane < CENTRE_LANE && !flags.unsafe_right);

        if state.speed_mph < params.max_speed_mph {
            state.speed_mph += params.max_acc_mph;
        }

        if can_recentre {
            state.lane = CENTRE_LANE;
            Decision::Recentre
        } else {
            Decision::KeepLane
        }
    };

    debug!(
        "{:?}: lane {}, speed {:.3} mph",
        decision, state.lane, state.speed_mph
    );

    decision
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
