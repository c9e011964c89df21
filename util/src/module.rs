//! Cyclic module interface
//!
//! A cyclic module is initialised once at startup, then processed once per tick with that tick's
//! inputs. The planner is the only such module in `plan_exec`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The persistent state of a cyclic module.
pub trait State {
    type InitData;
    type InitError;

    /// Inputs for one tick.
    type InputData;
    /// The tick's product, handed on to the next stage.
    type OutputData;
    /// Diagnostics for one tick, usually archived.
    type StatusReport;
    type ProcError;

    /// Load parameters and set up archives in `session`.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one tick.
    ///
    /// Calling this before a successful [`State::init`] must return an error rather than panic.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
