//! # Planner Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
pub struct PlanExecParams {

    /// Endpoint the simulator connects to
    pub sim_endpoint: String,

    /// Time to wait for a frame from the simulator before checking again
    pub sim_recv_timeout_ms: i32,

    /// Time to wait for a reply to be accepted by the simulator
    pub sim_send_timeout_ms: i32,

    /// Path to the track map, relative to the software root
    pub map_file: String,

    /// Minimum level of the messages to log, for example `"info"` or `"trace"`
    pub log_level: String,
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_exec_params() {
        let params: PlanExecParams = util::params::from_toml_str(
            "sim_endpoint = \"tcp://*:4567\"\n\
             sim_recv_timeout_ms = 200\n\
             sim_send_timeout_ms = 10\n\
             map_file = \"data/highway_map.csv\"\n\
             log_level = \"debug\"\n"
        ).unwrap();

        assert_eq!(params.sim_endpoint, "tcp://*:4567");
        assert_eq!(params.sim_recv_timeout_ms, 200);
        assert_eq!(params.map_file, "data/highway_map.csv");
    }
}
