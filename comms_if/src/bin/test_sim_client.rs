//! Simple simulator stand-in which sends telemetry to the planner and prints the response

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    sim::{self, SensorFusionRecord, Telemetry},
};

/// How long to wait for the planner to accept the connection.
const PEER_TIMEOUT_MS: u64 = 5000;

fn main() -> Result<(), Box<dyn std::error::Error>> {

    // Endpoint can be overridden from the command line
    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("tcp://localhost:4567"));

    let ctx = zmq::Context::new();

    let socket_options = SocketOptions {
        linger: 1,
        recv_timeout: 1000,
        send_timeout: 10,
        req_relaxed: true,
        ..Default::default()
    };

    let socket = match MonitoredSocket::new(&ctx, zmq::REQ, socket_options, &endpoint) {
        Ok(s) => s,
        Err(e) => {
            println!("Could not connect to the planner at {}", endpoint);
            return Err(e.into())
        }
    };

    // A stationary vehicle at the start of the highway track with one car ahead in its lane
    let telemetry = Telemetry {
        x: 909.48,
        y: 1128.67,
        s: 124.8336,
        d: 6.164833,
        yaw: 0.0,
        speed: 0.0,
        previous_path_x: vec![],
        previous_path_y: vec![],
        end_path_s: 0.0,
        end_path_d: 0.0,
        sensor_fusion: vec![SensorFusionRecord {
            id: 0.0,
            x: 929.0,
            y: 1128.7,
            vx: 10.0,
            vy: 0.0,
            s: 144.8,
            d: 6.0,
        }],
    };

    let frames = vec![
        sim::encode_telemetry(&telemetry)?,
        String::from("42[\"telemetry\",null]"),
    ];

    println!("Waiting for the planner at {}", endpoint);
    socket.wait_for_peer(PEER_TIMEOUT_MS)?;

    for frame in frames {

        print!("Sending {} bytes... ", frame.len());
        socket.send(frame.as_str(), 0)?;

        let msg = socket.recv_msg(0)?;

        match msg.as_str() {
            Some(r) => println!("response: {}", r),
            None => println!("no response")
        }
    }

    Ok(())
}
