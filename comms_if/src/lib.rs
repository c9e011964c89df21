//! # Communications interface crate.
//!
//! Provides the interface between the planner and the driving simulator: the message
//! definitions, the event framing used on the wire, and the network sockets.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Simulator messages and event framing
pub mod sim;

/// Network module
pub mod net;
