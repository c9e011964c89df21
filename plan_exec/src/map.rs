//! # Track map
//!
//! The map is the centreline of the highway as an ordered list of waypoints. The list is a closed
//! loop: the segment after the last waypoint joins it back to the first, and the longitudinal
//! coordinate `s` wraps at the track length `max_s`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Internal
use util::maths::{get_abs_ang_dist, rem_euclid};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of numeric fields on each line of a map file: `x y s dx dy`.
const FIELDS_PER_LINE: usize = 5;

/// Angle between the heading and the bearing to the closest waypoint above which that waypoint
/// is considered to be behind the vehicle.
const BEHIND_ANGLE_RAD: f64 = std::f64::consts::FRAC_PI_4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A reference point on the centreline of the track.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Distance along the track
    pub s_m: f64,

    /// Position in the map frame
    pub x_m: f64,
    pub y_m: f64,

    /// Lateral unit normal, pointing away from the centreline towards the outer lanes
    pub normal_x: f64,
    pub normal_y: f64,
}

/// The track map.
///
/// Read only once built, so it can be shared between planners behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TrackMap {
    waypoints: Vec<Waypoint>,

    /// Cumulative euclidian length of the segments from the first waypoint up to each waypoint.
    cum_len_m: Vec<f64>,

    /// Length of the track, the `s` value at which the track wraps back to 0.
    max_s_m: f64,

    /// A fixed point off the track used to decide which side of the centreline a position is on.
    side_ref_m: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Could not read the map file: {0}")]
    FileReadError(std::io::Error),

    #[error("A track needs at least 2 waypoints, found {0}")]
    TooFewWaypoints(usize),

    #[error("Waypoint {0} has a smaller s value than the waypoint before it")]
    UnorderedWaypoints(usize),

    #[error("The track length ({max_s_m}) must be greater than the last waypoint's s ({last_s_m})")]
    InvalidTrackLength { max_s_m: f64, last_s_m: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    /// Position of the waypoint in the map frame.
    pub fn position_m(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }
}

impl TrackMap {
    /// Build a new map from a list of waypoints.
    pub fn new(
        waypoints: Vec<Waypoint>,
        max_s_m: f64,
        side_ref_m: Vector2<f64>,
    ) -> Result<Self, MapError> {
        if waypoints.len() < 2 {
            return Err(MapError::TooFewWaypoints(waypoints.len()));
        }

        if let Some(i) = (1..waypoints.len()).find(|&i| waypoints[i].s_m < waypoints[i - 1].s_m) {
            return Err(MapError::UnorderedWaypoints(i));
        }

        let last_s_m = waypoints[waypoints.len() - 1].s_m;
        if !(max_s_m > last_s_m) {
            return Err(MapError::InvalidTrackLength { max_s_m, last_s_m });
        }

        // Cumulative segment lengths, used as the s of each waypoint by the frenet transform
        let mut cum_len_m = Vec::with_capacity(waypoints.len());
        cum_len_m.push(0.0);
        for pair in waypoints.windows(2) {
            let seg_len = (pair[1].position_m() - pair[0].position_m()).norm();
            let prev = cum_len_m[cum_len_m.len() - 1];
            cum_len_m.push(prev + seg_len);
        }

        Ok(Self {
            waypoints,
            cum_len_m,
            max_s_m,
            side_ref_m,
        })
    }

    /// Load a map from a file.
    ///
    /// The file has one waypoint per line as whitespace separated `x y s dx dy`. Lines that don't
    /// hold five numbers are skipped.
    pub fn load<P: AsRef<Path>>(
        path: P,
        max_s_m: f64,
        side_ref_m: Vector2<f64>,
    ) -> Result<Self, MapError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(MapError::FileReadError)?;

        let (waypoints, num_skipped) = parse_waypoints(&text);

        if num_skipped > 0 {
            warn!(
                "Skipped {} malformed line(s) in map file {:?}",
                num_skipped,
                path.as_ref()
            );
        }
        debug!("Loaded {} waypoints from {:?}", waypoints.len(), path.as_ref());

        Self::new(waypoints, max_s_m, side_ref_m)
    }

    /// Number of waypoints in the map.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false, as a map can't be built with fewer than two waypoints.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn max_s_m(&self) -> f64 {
        self.max_s_m
    }

    pub fn side_ref_m(&self) -> Vector2<f64> {
        self.side_ref_m
    }

    /// Position of the waypoint at the given index.
    pub fn position_m(&self, index: usize) -> Vector2<f64> {
        self.waypoints[index].position_m()
    }

    /// Sum of the segment lengths from the first waypoint up to the waypoint at `index`.
    pub fn cumulative_length_m(&self, index: usize) -> f64 {
        self.cum_len_m[index]
    }

    /// Index of the waypoint after `index`, wrapping at the end of the track.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.waypoints.len()
    }

    /// Index of the waypoint before `index`, wrapping at the start of the track.
    pub fn prev_index(&self, index: usize) -> usize {
        match index {
            0 => self.waypoints.len() - 1,
            i => i - 1,
        }
    }

    /// Heading of the segment starting at the waypoint at `index`.
    pub fn segment_heading_rad(&self, index: usize) -> f64 {
        let delta = self.position_m(self.next_index(index)) - self.position_m(index);
        delta.y.atan2(delta.x)
    }

    /// Heading of the centreline at the given distance along the track.
    pub fn heading_at_rad(&self, s_m: f64) -> f64 {
        self.segment_heading_rad(self.segment_index(rem_euclid(s_m, self.max_s_m)))
    }

    /// Index of the waypoint closest to the given position.
    ///
    /// Ties go to the lowest index.
    pub fn closest_waypoint(&self, x_m: f64, y_m: f64) -> usize {
        let pos = Vector2::new(x_m, y_m);

        let mut closest_len = std::f64::INFINITY;
        let mut closest = 0;

        for (i, wp) in self.waypoints.iter().enumerate() {
            let dist = (wp.position_m() - pos).norm();
            if dist < closest_len {
                closest_len = dist;
                closest = i;
            }
        }

        closest
    }

    /// Index of the next waypoint ahead of a vehicle at the given position and heading.
    ///
    /// This is the closest waypoint, unless that waypoint lies more than 45 degrees off the
    /// heading, in which case it is taken to be behind and the one after it is returned.
    pub fn next_waypoint(&self, x_m: f64, y_m: f64, heading_rad: f64) -> usize {
        let closest = self.closest_waypoint(x_m, y_m);
        let wp = &self.waypoints[closest];

        let bearing_rad = (wp.y_m - y_m).atan2(wp.x_m - x_m);

        if get_abs_ang_dist(heading_rad, bearing_rad) > BEHIND_ANGLE_RAD {
            self.next_index(closest)
        } else {
            closest
        }
    }

    /// Get the map position of the point at distance `s_m` along the track and lateral offset
    /// `d_m` from the centreline.
    ///
    /// `s_m` may lie outside `[0, max_s)`, it is wrapped onto the track first. Positive `d_m` is
    /// to the right of the direction of travel.
    pub fn interpolate(&self, s_m: f64, d_m: f64) -> Vector2<f64> {
        let s_m = rem_euclid(s_m, self.max_s_m);

        let prev = self.segment_index(s_m);
        let heading_rad = self.segment_heading_rad(prev);

        // Distance along the segment, which wraps through max_s for the closing segment
        let seg_s_m = rem_euclid(s_m - self.waypoints[prev].s_m, self.max_s_m);

        let seg_m =
            self.position_m(prev) + seg_s_m * Vector2::new(heading_rad.cos(), heading_rad.sin());

        let perp_heading_rad = heading_rad - std::f64::consts::FRAC_PI_2;

        seg_m + d_m * Vector2::new(perp_heading_rad.cos(), perp_heading_rad.sin())
    }

    /// Index of the waypoint starting the segment which contains `s_m`, with `s_m` already in
    /// `[0, max_s)`.
    ///
    /// Positions before the first waypoint belong to the closing segment from the last waypoint.
    fn segment_index(&self, s_m: f64) -> usize {
        match self.waypoints.partition_point(|wp| wp.s_m < s_m) {
            0 if s_m < self.waypoints[0].s_m => self.waypoints.len() - 1,
            0 => 0,
            n => n - 1,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse the waypoints out of the text of a map file.
///
/// Returns the waypoints and the number of non-empty lines which could not be parsed.
pub fn parse_waypoints(text: &str) -> (Vec<Waypoint>, usize) {
    let mut waypoints = Vec::new();
    let mut num_skipped = 0;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Result<Vec<f64>, _> = line
            .split_whitespace()
            .take(FIELDS_PER_LINE)
            .map(str::parse::<f64>)
            .collect();

        match fields {
            Ok(f) if f.len() == FIELDS_PER_LINE => waypoints.push(Waypoint {
                x_m: f[0],
                y_m: f[1],
                s_m: f[2],
                normal_x: f[3],
                normal_y: f[4],
            }),
            _ => num_skipped += 1,
        }
    }

    (waypoints, num_skipped)
}

// ---------------------------------------------------------------------------
// TEST TRACKS
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::test_tracks::*;
    use super::*;

    fn straight_waypoints() -> Vec<Waypoint> {
        (0..4)
            .map(|i| Waypoint {
                s_m: i as f64 * 10.0,
                x_m: i as f64 * 10.0,
                y_m: 0.0,
                normal_x: 0.0,
                normal_y: -1.0,
            })
            .collect()
    }

    #[test]
    fn test_new_validation() {
        let wps = straight_waypoints();

        assert!(matches!(
            TrackMap::new(wps[..1].to_vec(), 100.0, Vector2::zeros()),
            Err(MapError::TooFewWaypoints(1))
        ));

        let mut unordered = wps.clone();
        unordered.swap(1, 2);
        assert!(matches!(
            TrackMap::new(unordered, 100.0, Vector2::zeros()),
            Err(MapError::UnorderedWaypoints(2))
        ));

        assert!(matches!(
            TrackMap::new(wps.clone(), 30.0, Vector2::zeros()),
            Err(MapError::InvalidTrackLength { .. })
        ));

        let map = TrackMap::new(wps, 40.0, Vector2::zeros()).unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map.cumulative_length_m(3), 30.0);
    }

    #[test]
    fn test_parse_waypoints() {
        let text = "784.6001 1135.571 0 -0.02359831 -0.9997216\n\
                    \n\
                    815.2679 1134.93 30.6744 -0.01099479 -0.9999396\n\
                    not a waypoint\n\
                    844.6398 1134.911 60.0463\n\
                    875.0436  1134.808 \t 90.4504 -0.001045 -0.9999995\n";

        let (wps, skipped) = parse_waypoints(text);

        assert_eq!(skipped, 2);
        assert_eq!(wps.len(), 3);
        assert_eq!(wps[0].x_m, 784.6001);
        assert_eq!(wps[1].s_m, 30.6744);
        assert_eq!(wps[2].y_m, 1134.808);
        assert_eq!(wps[2].normal_y, -0.9999995);
    }

    #[test]
    fn test_closest_waypoint() {
        let map = TrackMap::new(straight_waypoints(), 40.0, Vector2::zeros()).unwrap();

        assert_eq!(map.closest_waypoint(1.0, 3.0), 0);
        assert_eq!(map.closest_waypoint(19.0, -2.0), 2);

        // Equidistant from waypoints 1 and 2, the first one wins
        assert_eq!(map.closest_waypoint(15.0, 0.0), 1);
    }

    #[test]
    fn test_next_waypoint() {
        let map = TrackMap::new(straight_waypoints(), 40.0, Vector2::zeros()).unwrap();

        // Closest waypoint ahead
        assert_eq!(map.next_waypoint(9.0, 0.5, 0.0), 1);

        // Closest waypoint behind, so take the one after it
        assert_eq!(map.next_waypoint(11.0, 0.5, 0.0), 2);

        // Heading given outside [-pi, pi] still counts as forwards
        assert_eq!(map.next_waypoint(9.0, 0.5, std::f64::consts::TAU), 1);

        // Past the last waypoint the next one wraps to the start
        assert_eq!(map.next_waypoint(31.0, 0.0, 0.0), 0);
    }

    #[test]
    fn test_interpolate_straight() {
        let map = TrackMap::new(straight_waypoints(), 40.0, Vector2::zeros()).unwrap();

        // Positive d is to the right of the direction of travel, i.e. -y here
        let p = map.interpolate(15.0, 2.0);
        assert!((p - Vector2::new(15.0, -2.0)).norm() < 1e-9);

        // s exactly on the first waypoint must not index before the start
        let p = map.interpolate(0.0, 0.0);
        assert!((p - Vector2::new(0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_interpolate_wraps() {
        let map = circle();

        let a = map.interpolate(25.0, 6.0);
        let b = map.interpolate(25.0 + map.max_s_m(), 6.0);
        let c = map.interpolate(25.0 - map.max_s_m(), 6.0);

        assert!((a - b).norm() < 1e-6);
        assert!((a - c).norm() < 1e-6);

        // The closing segment runs from the last waypoint back to the first
        let end = map.interpolate(map.max_s_m() - 1e-9, 0.0);
        assert!((end - map.position_m(0)).norm() < 1e-6);
    }

    #[test]
    fn test_positive_d_is_outside_circle() {
        let map = circle();
        let centre = Vector2::new(CENTRE[0], CENTRE[1]);

        let inner = map.interpolate(100.0, -2.0);
        let outer = map.interpolate(100.0, 6.0);

        assert!((outer - centre).norm() > (inner - centre).norm());
        assert!((outer - centre).norm() > RADIUS_M);
    }
}
