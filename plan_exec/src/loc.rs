//! # Localisation
//!
//! The planner does no localisation of its own, the ego pose is reported by the simulator every
//! tick. This module holds that pose in the form the planning modules consume.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use comms_if::sim::Telemetry;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose of the ego vehicle in the map frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {

    /// Position in the map frame
    pub position_m: Vector2<f64>,

    /// Frenet coordinates as reported by the simulator
    pub s_m: f64,
    pub d_m: f64,

    /// Heading in degrees, anticlockwise from the map X axis
    pub yaw_deg: f64,

    /// Speed along the heading
    pub speed_mph: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Return the heading of the vehicle in radians.
    pub fn get_heading(&self) -> f64 {
        self.yaw_deg.to_radians()
    }
}

impl From<&Telemetry> for Pose {
    fn from(tm: &Telemetry) -> Self {
        Self {
            position_m: Vector2::new(tm.x, tm.y),
            s_m: tm.s,
            d_m: tm.d,
            yaw_deg: tm.yaw,
            speed_mph: tm.speed,
        }
    }
}
