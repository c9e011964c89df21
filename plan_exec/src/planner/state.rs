//! Implementations for the Planner state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use nalgebra::Vector2;
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};

// Internal
use super::{Params, PlannerError};
use crate::{
    behaviour::{self, Decision, VehicleState},
    frenet::FrenetPoint,
    loc::Pose,
    map::TrackMap,
    traffic::{self, PerceivedVehicle},
    traj_synth::{self, SynthInput, Trajectory},
};
use comms_if::sim::Telemetry;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Planner module state
#[derive(Default)]
pub struct Planner {
    pub(crate) params: Params,

    map: Option<Arc<TrackMap>>,

    pub(crate) vehicle: VehicleState,

    /// Heading of the reference frame used on the last tick
    last_heading_rad: Option<f64>,

    num_ticks: u64,

    pub(crate) report: StatusReport,
    arch_report: Archiver,
}

/// Data needed to initialise the planner.
pub struct InitData {
    /// Path to the parameter file, relative to the parameters directory
    pub params_path: &'static str,

    /// Path to the map file
    pub map_path: PathBuf,
}

/// Input data to the planner, one per telemetry tick.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    pub pose: Pose,

    /// Points of the last trajectory the vehicle has not driven yet
    pub prev_path_m: Vec<Vector2<f64>>,

    /// Frenet coordinates of the end of `prev_path_m`
    pub end_path_s_m: f64,
    pub end_path_d_m: f64,

    /// Other vehicles on the road
    pub vehicles: Vec<PerceivedVehicle>,
}

/// Status report for planner processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    pub tick: u64,
    pub elapsed_s: f64,

    /// Number of points kept from the last trajectory
    pub horizon: usize,

    /// Ego frenet position used for this tick
    pub ego_s_m: f64,
    pub ego_d_m: f64,

    pub blocked_ahead: bool,
    pub unsafe_left: bool,
    pub unsafe_right: bool,

    pub decision: Decision,
    pub lane: u8,
    pub speed_mph: f64,

    pub frame_x_m: f64,
    pub frame_y_m: f64,
    pub frame_heading_rad: f64,

    /// The trajectory tail was degenerate and the frame heading was taken from elsewhere
    pub heading_fallback: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for Planner {
    type InitData = InitData;
    type InitError = PlannerError;

    type InputData = InputData;
    type OutputData = Trajectory;
    type StatusReport = StatusReport;
    type ProcError = PlannerError;

    /// Initialise the Planner module.
    ///
    /// Loads the parameters and the map, and opens the status report archive.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = params::load(init_data.params_path)
            .map_err(PlannerError::ParamLoadError)?;

        let map = TrackMap::load(
            &init_data.map_path,
            self.params.max_s_m,
            Vector2::new(self.params.track_centre_m[0], self.params.track_centre_m[1]),
        )
        .map_err(PlannerError::MapLoadError)?;

        info!(
            "Loaded a track of {} waypoints from {:?}",
            map.len(),
            init_data.map_path
        );

        self.params.max_s_m = map.max_s_m();
        self.map = Some(Arc::new(map));
        self.vehicle = VehicleState::new(self.params.start_lane);
        self.last_heading_rad = None;
        self.num_ticks = 0;

        self.arch_report = Archiver::from_path(session, "planner/status_report.csv")
            .map_err(PlannerError::ArchiveInitError)?;

        Ok(())
    }

    /// Plan one tick.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let map = self.map.clone().ok_or(PlannerError::NotInitialised)?;

        let pose = &input_data.pose;
        let horizon = input_data.prev_path_m.len();

        // Plan from the end of the queued trajectory if there is one, otherwise from the reported
        // position
        let ego = match horizon {
            0 => FrenetPoint {
                s_m: pose.s_m,
                d_m: pose.d_m,
            },
            _ => FrenetPoint {
                s_m: input_data.end_path_s_m,
                d_m: input_data.end_path_d_m,
            },
        };
        let ego_s_m = ego.s_m;

        let flags = traffic::check_lanes(
            &self.params,
            self.vehicle.lane,
            ego_s_m,
            horizon,
            &input_data.vehicles,
        );

        let decision = behaviour::choose_behaviour(&self.params, &mut self.vehicle, flags);

        let (traj, anchors) = traj_synth::synthesise(
            &self.params,
            &map,
            &SynthInput {
                pose,
                prev_path_m: &input_data.prev_path_m,
                ego_s_m,
                lane: self.vehicle.lane,
                speed_mph: self.vehicle.speed_mph,
                fallback_heading_rad: self.last_heading_rad,
            },
        );

        self.last_heading_rad = Some(anchors.frame.heading_rad);

        self.report = StatusReport {
            tick: self.num_ticks,
            elapsed_s: util::session::get_elapsed_seconds(),
            horizon,
            ego_s_m,
            ego_d_m: ego.d_m,
            blocked_ahead: flags.blocked_ahead,
            unsafe_left: flags.unsafe_left,
            unsafe_right: flags.unsafe_right,
            decision,
            lane: self.vehicle.lane,
            speed_mph: self.vehicle.speed_mph,
            frame_x_m: anchors.frame.origin_m.x,
            frame_y_m: anchors.frame.origin_m.y,
            frame_heading_rad: anchors.frame.heading_rad,
            heading_fallback: anchors.heading_fallback,
        };
        self.num_ticks += 1;

        trace!("Planner report: {:?}", self.report);

        Ok((traj, self.report))
    }
}

impl Archived for Planner {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)
    }
}

impl Planner {
    /// Create a planner driving on the given map, without archiving.
    ///
    /// The track length is always taken from the map.
    pub fn new(mut params: Params, map: Arc<TrackMap>) -> Self {
        debug!("New planner starting in lane {}", params.start_lane);

        if params.max_s_m != map.max_s_m() {
            warn!(
                "Track length parameter of {} m doesn't match the map's {} m, using the map's",
                params.max_s_m,
                map.max_s_m()
            );
            params.max_s_m = map.max_s_m();
        }

        Self {
            vehicle: VehicleState::new(params.start_lane),
            params,
            map: Some(map),
            ..Default::default()
        }
    }

    /// The current target lane and speed.
    pub fn vehicle_state(&self) -> VehicleState {
        self.vehicle
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl From<&Telemetry> for InputData {
    fn from(tm: &Telemetry) -> Self {
        if tm.previous_path_x.len() != tm.previous_path_y.len() {
            warn!(
                "Previous path has {} x and {} y values, using the first {} points",
                tm.previous_path_x.len(),
                tm.previous_path_y.len(),
                tm.prev_path_len()
            );
        }

        Self {
            pose: Pose::from(tm),
            prev_path_m: tm
                .previous_path_x
                .iter()
                .zip(tm.previous_path_y.iter())
                .map(|(&x, &y)| Vector2::new(x, y))
                .collect(),
            end_path_s_m: tm.end_path_s,
            end_path_d_m: tm.end_path_d,
            vehicles: tm.sensor_fusion.iter().map(PerceivedVehicle::from).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
