//! # Network Module
//!
//! ZMQ sockets with a background monitor which keeps count of the peers connected to the socket.
//! The planner's simulator server and the test clients are both built on [`MonitoredSocket`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};
use zmq::{Context, Socket, SocketEvent, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout on the monitor socket, which bounds how long the monitor thread takes to notice
/// that the socket has been dropped.
const MONITOR_POLL_MS: i32 = 100;

/// Poll period while waiting for a peer.
const PEER_POLL_MS: u64 = 10;

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Used to give every monitor its own inproc endpoint.
static NUM_MONITORS: AtomicUsize = AtomicUsize::new(0);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A zmq socket with a monitor thread tracking its peers.
pub struct MonitoredSocket {
    socket: Socket,

    monitor: Arc<MonitorState>,

    join_handle: Option<thread::JoinHandle<()>>,
}

/// State shared between a socket and its monitor thread.
#[derive(Default)]
struct MonitorState {
    shutdown: AtomicBool,

    num_peers: AtomicUsize,
}

/// Options for a monitored socket.
///
/// Timeouts are in milliseconds, with `-1` meaning wait forever, as for
/// [`zmq_setsockopt`](http://api.zeromq.org/4-2:zmq-setsockopt).
#[derive(Debug, Clone)]
pub struct SocketOptions {

    /// Bind to the endpoint (servers) rather than connecting to it (clients).
    pub bind: bool,

    /// `ZMQ_LINGER`: how long unsent messages are kept after the socket is closed
    pub linger: i32,

    /// `ZMQ_RCVTIMEO`: maximum time before a recv operation returns with `EAGAIN`
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`: maximum time before a send operation returns with `EAGAIN`
    pub send_timeout: i32,

    /// `ZMQ_REQ_RELAXED`: allow a REQ socket to send again after a request went unanswered. Only
    /// applied to REQ sockets.
    pub req_relaxed: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MonitoredSocketError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Error enabling monitoring for the socket: {0}")]
    MonitoringEnableError(zmq::Error),

    #[error("Could not bind or connect to {0}: {1}")]
    EndpointError(String, zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(&'static str, zmq::Error),

    #[error("No peer connected within {0} ms")]
    NoPeer(u64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MonitoredSocket {
    /// Create a new monitored socket.
    ///
    /// ## Arguments
    /// - `ctx`: the zmq context which will be used to create the socket
    /// - `socket_type`: the type of zmq socket to create
    /// - `socket_options`: how to configure the socket
    /// - `endpoint`: a zmq endpoint string, such as `"tcp://*:4567"`
    pub fn new(
        ctx: &Context,
        socket_type: SocketType,
        socket_options: SocketOptions,
        endpoint: &str
    ) -> Result<Self, MonitoredSocketError> {
        let socket = ctx.socket(socket_type)
            .map_err(MonitoredSocketError::CreateSocketError)?;

        // The monitor must be connected before the socket is, or early events are lost
        let monitor_endpoint = format!(
            "inproc://monitor_{}",
            NUM_MONITORS.fetch_add(1, Ordering::Relaxed)
        );
        socket.monitor(&monitor_endpoint, SocketEvent::ALL as i32)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;

        let monitor_socket = ctx.socket(zmq::PAIR)
            .map_err(MonitoredSocketError::CreateSocketError)?;
        monitor_socket.connect(&monitor_endpoint)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;
        monitor_socket.set_rcvtimeo(MONITOR_POLL_MS)
            .map_err(|e| MonitoredSocketError::SocketOptionError("rcvtimeo", e))?;

        socket_options.apply(&socket, socket_type)?;

        if socket_options.bind {
            socket.bind(endpoint)
        }
        else {
            socket.connect(endpoint)
        }.map_err(|e| MonitoredSocketError::EndpointError(endpoint.to_string(), e))?;

        let monitor = Arc::new(MonitorState::default());
        let monitor_clone = monitor.clone();

        let join_handle = thread::spawn(move || run_monitor(
            monitor_socket,
            monitor_endpoint,
            monitor_clone
        ));

        Ok(Self {
            socket,
            monitor,
            join_handle: Some(join_handle),
        })
    }

    /// Return if at least one peer is connected.
    pub fn connected(&self) -> bool {
        self.num_peers() > 0
    }

    /// Number of peers currently connected to the socket.
    pub fn num_peers(&self) -> usize {
        self.monitor.num_peers.load(Ordering::Relaxed)
    }

    /// Block until a peer connects or the timeout elapses.
    pub fn wait_for_peer(&self, timeout_ms: u64) -> Result<(), MonitoredSocketError> {
        let start = Instant::now();

        while !self.connected() {
            if start.elapsed() > Duration::from_millis(timeout_ms) {
                return Err(MonitoredSocketError::NoPeer(timeout_ms));
            }
            thread::sleep(Duration::from_millis(PEER_POLL_MS));
        }

        Ok(())
    }
}

impl Drop for MonitoredSocket {
    fn drop(&mut self) {
        self.monitor.shutdown.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            if jh.join().is_err() {
                warn!("Socket monitor thread panicked");
            }
        }
    }
}

impl std::ops::Deref for MonitoredSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl std::ops::DerefMut for MonitoredSocket {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.socket
    }
}

impl SocketOptions {
    /// Apply these options to a socket of the given type.
    fn apply(&self, socket: &Socket, socket_type: SocketType) -> Result<(), MonitoredSocketError> {
        socket.set_linger(self.linger)
            .map_err(|e| MonitoredSocketError::SocketOptionError("linger", e))?;
        socket.set_rcvtimeo(self.recv_timeout)
            .map_err(|e| MonitoredSocketError::SocketOptionError("rcvtimeo", e))?;
        socket.set_sndtimeo(self.send_timeout)
            .map_err(|e| MonitoredSocketError::SocketOptionError("sndtimeo", e))?;

        if socket_type == zmq::REQ {
            socket.set_req_relaxed(self.req_relaxed)
                .map_err(|e| MonitoredSocketError::SocketOptionError("req_relaxed", e))?;
            socket.set_req_correlate(self.req_relaxed)
                .map_err(|e| MonitoredSocketError::SocketOptionError("req_correlate", e))?;
        }

        Ok(())
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            bind: false,
            linger: 0,
            recv_timeout: -1,
            send_timeout: -1,
            req_relaxed: false,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read an event from a monitor socket.
///
/// Each event is two frames, the event id and value followed by the peer address.
fn read_event(socket: &Socket) -> Result<SocketEvent, zmq::Error> {
    let msg = socket.recv_msg(0)?;

    if msg.len() < 2 {
        return Err(zmq::Error::EINVAL);
    }
    let event = u16::from_ne_bytes([msg[0], msg[1]]);

    if socket.get_rcvmore()? {
        socket.recv_msg(0)?;
    }

    Ok(SocketEvent::from_raw(event))
}

/// Monitor thread body, runs until the socket is dropped.
fn run_monitor(monitor_socket: Socket, endpoint: String, state: Arc<MonitorState>) {
    while !state.shutdown.load(Ordering::Relaxed) {
        let event = match read_event(&monitor_socket) {
            Ok(e) => e,
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                warn!("Error reading event from monitor {}: {}", endpoint, e);
                break;
            }
        };

        match event {
            SocketEvent::ACCEPTED | SocketEvent::CONNECTED => {
                let n = state.num_peers.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Peer connected on {} ({} connected)", endpoint, n);
            },
            SocketEvent::DISCONNECTED => {
                // Saturate at zero, disconnects can be reported for peers which never completed
                // the handshake
                let prev = state.num_peers.load(Ordering::Relaxed);
                state.num_peers.store(prev.saturating_sub(1), Ordering::Relaxed);
                debug!("Peer disconnected on {}", endpoint);
            },
            _ => ()
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_req_rep_over_inproc() {
        let ctx = zmq::Context::new();

        let server = MonitoredSocket::new(
            &ctx,
            zmq::REP,
            SocketOptions {
                bind: true,
                recv_timeout: 1000,
                ..Default::default()
            },
            "inproc://test_req_rep"
        ).unwrap();

        let client = MonitoredSocket::new(
            &ctx,
            zmq::REQ,
            SocketOptions {
                recv_timeout: 1000,
                ..Default::default()
            },
            "inproc://test_req_rep"
        ).unwrap();

        client.send("ping", 0).unwrap();
        assert_eq!(server.recv_msg(0).unwrap().as_str(), Some("ping"));

        server.send("pong", 0).unwrap();
        assert_eq!(client.recv_msg(0).unwrap().as_str(), Some("pong"));
    }
}
