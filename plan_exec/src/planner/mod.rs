//! # Planner module
//!
//! Runs the planning pipeline once per telemetry tick: the ego pose is converted into frenet
//! coordinates, the traffic around it is classified, the behaviour decision updates the target
//! lane and speed, and a new trajectory is synthesised towards them.
//!
//! One `Planner` holds the persistent state of one vehicle. The track map is read only and shared
//! behind an `Arc`, so several planners can drive on the same map.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

use crate::map::MapError;
use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during planner operation.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("Could not load the planner parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Could not load the track map: {0}")]
    MapLoadError(MapError),

    #[error("Could not create the planner archives: {0}")]
    ArchiveInitError(ArchiveError),

    #[error("The planner has not been initialised with a map")]
    NotInitialised,
}
