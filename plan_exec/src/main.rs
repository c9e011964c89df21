//! # Planner Executable
//!
//! This executable drives the ego vehicle of the highway simulator. The simulator bridge sends a
//! telemetry frame every tick, and the planner answers each one with the trajectory the vehicle
//! should follow next, or hands the vehicle back to manual control when there is nothing to plan
//! from.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Parameters for the planner executable.
mod params;

/// Simulator server abstraction.
mod sim_server;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use comms_if::sim::{self, Inbound, MANUAL_FRAME};
use log::{error, info, trace, warn};
use std::time::{Duration, Instant};

// Internal
use params::PlanExecParams;
use plan_lib::planner::{InitData, InputData, Planner};
use sim_server::SimServer;
use util::{
    archive::Archived,
    host,
    logger::{logger_init, parse_level},
    module::State,
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "plan_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Load parameters, which hold the log level
    let params: PlanExecParams = util::params::load("plan_exec.toml")
        .wrap_err("Failed to load the executable parameters")?;

    // Initialise logger
    let log_level = parse_level(&params.log_level)
        .wrap_err("Invalid log level in the executable parameters")?;
    logger_init(log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Highway Planner Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- MODULE INITIALISATION ----

    let map_path = host::get_sw_root()
        .wrap_err("Failed to get the software root")?
        .join(&params.map_file);

    let mut planner = Planner::default();
    planner.init(
        InitData {
            params_path: "planner.toml",
            map_path,
        },
        &session
    ).wrap_err("Failed to initialise the planner")?;

    info!("Planner initialised");

    let tick_period = Duration::from_secs_f64(planner.params().update_period_s);

    // ---- SERVER INITIALISATION ----

    let mut server = SimServer::new(&params)
        .wrap_err("Failed to initialise the simulator server")?;

    info!("Server listening on {}", params.sim_endpoint);

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering main loop in manual mode");

    let mut manual_mode = true;

    loop {
        let frame = match server.get_frame() {
            Some(f) => f,
            None => {
                if !manual_mode && !server.connected() {
                    warn!("Lost the simulator, entering manual mode");
                    manual_mode = true;
                }
                continue
            }
        };

        let tick_start = Instant::now();

        // Plan if there is telemetry to plan from, otherwise leave the vehicle in manual
        let reply = match sim::decode_frame(&frame) {
            Ok(Inbound::Telemetry(tm)) => plan(&mut planner, &InputData::from(tm.as_ref())),
            Ok(Inbound::NoData) => None,
            Err(e) => {
                warn!("Recieved an invalid frame: {}", e);
                None
            }
        };

        match (&reply, manual_mode) {
            (Some(_), true) => {
                info!("Recieved telemetry, exiting manual mode");
                manual_mode = false;
            },
            (None, false) => {
                warn!("Nothing to plan from, entering manual mode");
                manual_mode = true;
            },
            _ => ()
        }

        // Every frame must be answered before the next can be recieved
        let reply = reply.unwrap_or_else(|| MANUAL_FRAME.to_string());
        if let Err(e) = server.send_frame(&reply) {
            warn!("Couldn't send the reply to the simulator: {}", e);
        }

        let tick_duration = tick_start.elapsed();
        if tick_duration > tick_period {
            warn!(
                "Tick overran the {:.1} ms period by {:.3} ms",
                tick_period.as_secs_f64() * 1000.0,
                (tick_duration - tick_period).as_secs_f64() * 1000.0
            );
        }
        else {
            trace!("Tick took {:.3} ms", tick_duration.as_secs_f64() * 1000.0);
        }
    }
}

/// Run the planner on one tick of telemetry and encode the trajectory into a control frame.
///
/// `None` is returned if no trajectory could be produced.
fn plan(planner: &mut Planner, input: &InputData) -> Option<String> {
    let traj = match planner.proc(input) {
        Ok((t, _)) => t,
        Err(e) => {
            error!("Planner error: {}", e);
            return None
        }
    };

    if let Err(e) = planner.write() {
        warn!("Could not archive the planner status: {}", e);
    }

    match sim::encode_control(&traj.to_control()) {
        Ok(f) => Some(f),
        Err(e) => {
            error!("Could not encode the trajectory: {}", e);
            None
        }
    }
}
