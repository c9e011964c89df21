//! # Frenet frame conversions
//!
//! Converts positions between the cartesian map frame and the track relative frenet frame, where
//! `s` is the distance along the track and `d` the signed lateral offset from the centreline
//! (positive to the right of the direction of travel).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::map::TrackMap;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Segments shorter than this are treated as having zero length.
const MIN_SEGMENT_LEN_SQ_M2: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position in the frenet frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrenetPoint {
    pub s_m: f64,
    pub d_m: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a map frame position and heading into frenet coordinates.
///
/// The position is projected onto the segment ending at the next waypoint ahead. `s` is the
/// length of the track up to the start of that segment plus the length of the projection, `d`
/// the distance from the segment. The sign of `d` is negative when the position is at least as
/// close to the map's side reference point as its projection.
pub fn to_frenet(map: &TrackMap, x_m: f64, y_m: f64, heading_rad: f64) -> FrenetPoint {
    let next = map.next_waypoint(x_m, y_m, heading_rad);
    let prev = map.prev_index(next);

    let prev_m = map.position_m(prev);

    let seg = map.position_m(next) - prev_m;
    let rel = Vector2::new(x_m, y_m) - prev_m;

    let seg_len_sq = seg.norm_squared();
    let proj = if seg_len_sq > MIN_SEGMENT_LEN_SQ_M2 {
        seg * (rel.dot(&seg) / seg_len_sq)
    } else {
        Vector2::zeros()
    };

    let mut d_m = (rel - proj).norm();

    let side_ref = map.side_ref_m() - prev_m;
    if (side_ref - rel).norm() <= (side_ref - proj).norm() {
        d_m = -d_m;
    }

    FrenetPoint {
        s_m: map.cumulative_length_m(prev) + proj.norm(),
        d_m,
    }
}

/// Convert frenet coordinates into a map frame position.
///
/// `s_m` is wrapped onto the track, so any finite value is accepted.
pub fn to_cartesian(map: &TrackMap, s_m: f64, d_m: f64) -> Vector2<f64> {
    map.interpolate(s_m, d_m)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
