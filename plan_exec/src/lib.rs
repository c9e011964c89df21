//! # Planner library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access the planning
//! modules defined inside the planner crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Behaviour decision - chooses the target lane and speed from the traffic around the vehicle
pub mod behaviour;

/// Frenet conversions - moves positions between the map frame and the track frame
pub mod frenet;

/// Localisation - the ego pose as reported by the simulator
pub mod loc;

/// Track map - the waypoints along the centreline of the highway
pub mod map;

/// Planner module - runs the full planning pipeline once per tick
pub mod planner;

/// Traffic analysis - classifies which lanes around the vehicle are safe
pub mod traffic;

/// Trajectory synthesis - fits and samples the trajectory sent to the vehicle
pub mod traj_synth;
