//! # Simulator Server Module
//!
//! This module abstracts over the networking side of the planner executable. The simulator bridge
//! connects to the server and sends one frame per tick, and the server must answer every frame with
//! exactly one reply frame before it can receive the next.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions};
use log::warn;

use crate::params::PlanExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An abstraction over the networking part of the planner executable.
pub struct SimServer {

    /// REP socket which accepts frames from the simulator
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`SimServer`]
#[derive(thiserror::Error, Debug)]
pub enum SimServerError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error("Could not send data to the simulator: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimServer {

    /// Create a new instance of the simulator server.
    ///
    /// This function will not wait for the simulator to connect before returning.
    pub fn new(params: &PlanExecParams) -> Result<Self, SimServerError> {

        let ctx = zmq::Context::new();

        let socket_options = SocketOptions {
            bind: true,
            recv_timeout: params.sim_recv_timeout_ms,
            send_timeout: params.sim_send_timeout_ms,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            &ctx,
            zmq::REP,
            socket_options,
            &params.sim_endpoint
        )?;

        Ok(Self { socket })
    }

    /// Return if the simulator is connected.
    pub fn connected(&self) -> bool {
        self.socket.connected()
    }

    /// Receive a frame from the simulator.
    ///
    /// `None` is returned if no frame arrived before the receive timeout. When a frame is returned
    /// the user MUST call [`SimServer::send_frame`] before receiving again.
    pub fn get_frame(&mut self) -> Option<String> {
        match self.socket.recv_msg(0) {
            Ok(m) => match m.as_str() {
                Some(s) => Some(s.to_string()),
                None => {
                    warn!("Recieved a frame which is not valid UTF-8");
                    Some(String::from_utf8_lossy(&m).into_owned())
                }
            },
            Err(zmq::Error::EAGAIN) => None,
            Err(e) => {
                warn!("Could not read from the simulator socket: {}", e);
                None
            }
        }
    }

    /// Send a reply frame to the simulator.
    pub fn send_frame(&mut self, frame: &str) -> Result<(), SimServerError> {
        self.socket.send(frame, 0).map_err(SimServerError::SendError)
    }
}
