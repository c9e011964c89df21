//! # Simulator interface
//!
//! Messages exchanged with the highway simulator. Every message on the wire is a socket.io style
//! event frame: the two character prefix `42` followed by a JSON array of the event name and its
//! payload, for example `42["telemetry",{...}]`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Prefix of a socket.io event message.
pub const EVENT_PREFIX: &str = "42";

/// Name of the inbound telemetry event.
pub const TELEMETRY_EVENT: &str = "telemetry";

/// Name of the outbound control event.
pub const CONTROL_EVENT: &str = "control";

/// Reply sent when the planner has nothing to say, handing the vehicle back to manual control.
pub const MANUAL_FRAME: &str = "42[\"manual\",{}]";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry sent by the simulator every tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Telemetry {
    /// Ego position, map frame
    pub x: f64,
    pub y: f64,

    /// Ego frenet position as reported by the simulator
    pub s: f64,
    pub d: f64,

    /// Ego heading in degrees
    pub yaw: f64,

    /// Ego speed in mph
    pub speed: f64,

    /// The part of the last trajectory the vehicle has not driven yet
    pub previous_path_x: Vec<f64>,
    pub previous_path_y: Vec<f64>,

    /// Frenet coordinates of the end of the previous path
    pub end_path_s: f64,
    pub end_path_d: f64,

    /// Other vehicles on the same side of the road
    pub sensor_fusion: Vec<SensorFusionRecord>,
}

/// One observed vehicle.
///
/// On the wire this is the array `[id, x, y, vx, vy, s, d]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "[f64; 7]", into = "[f64; 7]")]
pub struct SensorFusionRecord {
    pub id: f64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub s: f64,
    pub d: f64,
}

/// The trajectory sent back to the simulator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Control {
    pub next_x: Vec<f64>,
    pub next_y: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A telemetry tick which the planner must answer with a trajectory
    Telemetry(Box<Telemetry>),

    /// The frame carried no data (or an event the planner does not handle), the vehicle should be
    /// left in manual mode.
    NoData,
}

/// Errors which can occur while decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Frame does not start with the event prefix \"42\"")]
    MissingPrefix,

    #[error("Frame is not a JSON event array: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Frame event array is malformed")]
    MalformedEvent,

    #[error("Telemetry payload is invalid: {0}")]
    InvalidTelemetry(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl From<[f64; 7]> for SensorFusionRecord {
    fn from(a: [f64; 7]) -> Self {
        Self {
            id: a[0],
            x: a[1],
            y: a[2],
            vx: a[3],
            vy: a[4],
            s: a[5],
            d: a[6],
        }
    }
}

impl From<SensorFusionRecord> for [f64; 7] {
    fn from(r: SensorFusionRecord) -> Self {
        [r.id, r.x, r.y, r.vx, r.vy, r.s, r.d]
    }
}

impl Telemetry {
    /// Number of points left over from the previous trajectory.
    pub fn prev_path_len(&self) -> usize {
        self.previous_path_x.len().min(self.previous_path_y.len())
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decode an inbound frame.
///
/// Frames containing `null` anywhere are treated as carrying no data, as the simulator sends
/// `42["telemetry",null]` style frames when it has nothing to report.
pub fn decode_frame(frame: &str) -> Result<Inbound, FrameError> {
    let body = frame
        .strip_prefix(EVENT_PREFIX)
        .ok_or(FrameError::MissingPrefix)?;

    if body.contains("null") {
        return Ok(Inbound::NoData);
    }

    let value: Value = serde_json::from_str(body).map_err(FrameError::InvalidJson)?;

    let (event, payload) = match value {
        Value::Array(mut items) if !items.is_empty() => {
            let payload = if items.len() > 1 { items.swap_remove(1) } else { Value::Null };
            match items.swap_remove(0) {
                Value::String(event) => (event, payload),
                _ => return Err(FrameError::MalformedEvent),
            }
        }
        _ => return Err(FrameError::MalformedEvent),
    };

    if event != TELEMETRY_EVENT || payload.is_null() {
        return Ok(Inbound::NoData);
    }

    serde_json::from_value(payload)
        .map(|t| Inbound::Telemetry(Box::new(t)))
        .map_err(FrameError::InvalidTelemetry)
}

/// Encode a control message into a frame.
pub fn encode_control(control: &Control) -> Result<String, serde_json::Error> {
    Ok(format!(
        "{}[\"{}\",{}]",
        EVENT_PREFIX,
        CONTROL_EVENT,
        serde_json::to_string(control)?
    ))
}

/// Encode a telemetry message into a frame, as the simulator would send it.
pub fn encode_telemetry(telemetry: &Telemetry) -> Result<String, serde_json::Error> {
    Ok(format!(
        "{}[\"{}\",{}]",
        EVENT_PREFIX,
        TELEMETRY_EVENT,
        serde_json::to_string(telemetry)?
    ))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
