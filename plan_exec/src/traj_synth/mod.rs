//! # Trajectory synthesis
//!
//! Builds the trajectory sent to the vehicle each tick. The points the vehicle has not yet driven
//! from the last trajectory are kept as they are, and new points are appended after them along a
//! spline.
//!
//! The spline is fitted in a vehicle relative frame placed at the end of the kept points and
//! aligned with their final heading, so that the new points continue smoothly from the old ones.
//! Five anchors define it: the last two kept points (or the current pose and a point synthesised
//! one metre behind it when fewer than two are left), and three far anchors spaced along the track
//! on the centreline of the target lane. The spline is then sampled so that consecutive points are
//! one tick apart at the target speed.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod frame;
mod spline;

pub use frame::ReferenceFrame;
pub use spline::{CubicSpline, SplineError};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{trace, warn};
use nalgebra::Vector2;
use serde::Serialize;

use comms_if::sim::Control;

use crate::{frenet, loc::Pose, map::TrackMap, planner::Params};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of anchors placed along the track ahead of the vehicle.
pub const NUM_FAR_ANCHORS: usize = 3;

/// Two tail points closer together than this don't define a heading.
const MIN_TAIL_SEPARATION_M: f64 = 1e-6;

/// Minimum increase in local X between two anchors for both to be kept in the fit.
const MIN_ANCHOR_SPACING_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything the synthesiser needs for one tick.
#[derive(Debug, Clone, Copy)]
pub struct SynthInput<'a> {
    /// Current ego pose
    pub pose: &'a Pose,

    /// The points of the last trajectory not yet driven, oldest first
    pub prev_path_m: &'a [Vector2<f64>],

    /// Ego position along the track that the far anchors are spaced from
    pub ego_s_m: f64,

    /// Target lane
    pub lane: u8,

    /// Target speed
    pub speed_mph: f64,

    /// Heading of the last reference frame, used when the tail doesn't define one
    pub fallback_heading_rad: Option<f64>,
}

/// The anchors a trajectory was fitted through.
#[derive(Debug, Clone, Serialize)]
pub struct Anchors {
    /// Frame the spline was fitted in
    pub frame: ReferenceFrame,

    /// Anchor positions in the map frame, near anchors first
    pub global_m: Vec<Vector2<f64>>,

    /// True if the tail was degenerate and the frame heading had to be taken from elsewhere
    pub heading_fallback: bool,
}

/// A trajectory of map frame points one tick apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub points_m: Vec<Vector2<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    pub fn len(&self) -> usize {
        self.points_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_m.is_empty()
    }

    /// Split the trajectory into the parallel coordinate lists sent to the simulator.
    pub fn to_control(&self) -> Control {
        Control {
            next_x: self.points_m.iter().map(|p| p.x).collect(),
            next_y: self.points_m.iter().map(|p| p.y).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the anchors for this tick's spline.
pub fn build_anchors(params: &Params, map: &TrackMap, input: &SynthInput) -> Anchors {
    let h = input.prev_path_m.len();
    let mut heading_fallback = false;

    let (frame, behind_m) = if h < 2 {
        // Not enough of a tail, so start from the pose
        let heading_rad = input.pose.get_heading();
        let origin_m = input.pose.position_m;

        (
            ReferenceFrame::new(origin_m, heading_rad),
            origin_m - unit(heading_rad),
        )
    } else {
        let last_m = input.prev_path_m[h - 1];
        let before_m = input.prev_path_m[h - 2];
        let delta_m = last_m - before_m;

        if delta_m.norm() > MIN_TAIL_SEPARATION_M {
            (
                ReferenceFrame::new(last_m, delta_m.y.atan2(delta_m.x)),
                before_m,
            )
        } else {
            heading_fallback = true;

            let heading_rad = input
                .fallback_heading_rad
                .filter(|h| h.is_finite())
                .unwrap_or_else(|| input.pose.get_heading());

            warn!(
                "Last two trajectory points are coincident, using a heading of {:.4} rad",
                heading_rad
            );

            (
                ReferenceFrame::new(last_m, heading_rad),
                last_m - unit(heading_rad),
            )
        }
    };

    let target_d_m = (input.lane as f64 + 0.5) * params.lane_width_m;

    let mut global_m = Vec::with_capacity(2 + NUM_FAR_ANCHORS);
    global_m.push(behind_m);
    global_m.push(frame.origin_m);

    for k in 1..=NUM_FAR_ANCHORS {
        global_m.push(frenet::to_cartesian(
            map,
            input.ego_s_m + k as f64 * params.prediction_base_step_m,
            target_d_m,
        ));
    }

    Anchors {
        frame,
        global_m,
        heading_fallback,
    }
}

/// Build this tick's trajectory.
///
/// The result always holds `params.n_prediction_points` points. The kept tail comes first,
/// unchanged, and every new point is finite.
pub fn synthesise(params: &Params, map: &TrackMap, input: &SynthInput) -> (Trajectory, Anchors) {
    let anchors = build_anchors(params, map, input);
    let frame = anchors.frame;

    let spline = fit_spline(&anchors);

    let n = params.n_prediction_points;
    let h = input.prev_path_m.len();

    if h > n {
        warn!(
            "Previous path has {} points, more than the {} in a trajectory, truncating",
            h, n
        );
    }

    let mut points_m = Vec::with_capacity(n);
    points_m.extend_from_slice(&input.prev_path_m[..h.min(n)]);

    // Spacing along local X which gives one tick of travel at the target speed
    let target_x_m = params.prediction_base_step_m;
    let target_dist_m = target_x_m.hypot(spline.eval(target_x_m));
    let tick_dist_m = params.update_period_s * input.speed_mph / params.speed_conversion;
    let x_step_m = target_x_m * tick_dist_m / target_dist_m;

    let mut num_invalid = 0;
    for i in 1..=n.saturating_sub(h) {
        let x_m = i as f64 * x_step_m;
        let local_m = Vector2::new(x_m, spline.eval(x_m));
        let global_m = frame.to_global(&local_m);

        if is_finite(&global_m) {
            points_m.push(global_m);
        } else {
            num_invalid += 1;
            let hold_m = hold_point(map, input, &frame, &points_m);
            points_m.push(hold_m);
        }
    }

    if num_invalid > 0 {
        warn!(
            "{} trajectory point(s) were not finite and were replaced by a hold point",
            num_invalid
        );
    }

    trace!(
        "Synthesised {} points ({} kept) with an x step of {:.4} m",
        points_m.len(),
        h.min(n),
        x_step_m
    );

    (Trajectory { points_m }, anchors)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Unit vector along a heading.
fn unit(heading_rad: f64) -> Vector2<f64> {
    Vector2::new(heading_rad.cos(), heading_rad.sin())
}

fn is_finite(p: &Vector2<f64>) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Point to hold at in place of a sample which isn't finite.
///
/// In order of preference: the last finite point already in the trajectory, the frame origin, the
/// target lane at the ego position, and finally the first waypoint of the map.
fn hold_point(
    map: &TrackMap,
    input: &SynthInput,
    frame: &ReferenceFrame,
    points_m: &[Vector2<f64>],
) -> Vector2<f64> {
    if let Some(p) = points_m.iter().rev().find(|p| is_finite(p)) {
        return *p;
    }

    if is_finite(&frame.origin_m) {
        return frame.origin_m;
    }

    let on_lane_m = frenet::to_cartesian(map, input.ego_s_m, input.pose.d_m);
    if is_finite(&on_lane_m) {
        return on_lane_m;
    }

    map.position_m(0)
}

/// Fit the spline through the anchors in their frame.
///
/// Anchors which don't move forwards along the frame's X axis are left out. If fewer than two
/// remain the path is taken to be straight ahead.
fn fit_spline(anchors: &Anchors) -> CubicSpline {
    let mut xs: Vec<f64> = Vec::with_capacity(anchors.global_m.len());
    let mut ys: Vec<f64> = Vec::with_capacity(anchors.global_m.len());

    for p in anchors.global_m.iter().map(|p| anchors.frame.to_local(p)) {
        let increasing = match xs.last() {
            Some(&last) => p.x > last + MIN_ANCHOR_SPACING_M,
            None => true,
        };

        if increasing && p.x.is_finite() && p.y.is_finite() {
            xs.push(p.x);
            ys.push(p.y);
        }
    }

    if xs.len() < anchors.global_m.len() {
        warn!(
            "Dropped {} anchor(s) which were not ahead of the previous one",
            anchors.global_m.len() - xs.len()
        );
    }

    match CubicSpline::new(&xs, &ys) {
        Ok(s) => s,
        Err(e) => {
            warn!("Could not fit the trajectory spline ({}), driving straight ahead", e);
            CubicSpline::flat()
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::map::test_tracks::circle;

    /// A pose on the centreline of `lane` at `s_m`, heading along the track.
    fn pose_at(map: &TrackMap, s_m: f64, lane: u8, speed_mph: f64) -> Pose {
        let d_m = (lane as f64 + 0.5) * 4.0;

        Pose {
            position_m: frenet::to_cartesian(map, s_m, d_m),
            s_m,
            d_m,
            yaw_deg: map.heading_at_rad(s_m).to_degrees(),
            speed_mph,
        }
    }

    fn input<'a>(pose: &'a Pose, prev_path_m: &'a [Vector2<f64>], ego_s_m: f64) -> SynthInput<'a> {
        SynthInput {
            pose,
            prev_path_m,
            ego_s_m,
            lane: 1,
            speed_mph: 40.0,
            fallback_heading_rad: None,
        }
    }

    #[test]
    fn test_cardinality() {
        let params = Params::default();
        let map = circle();
        let pose = pose_at(&map, 100.0, 1, 40.0);

        let (full, _) = synthesise(&params, &map, &input(&pose, &[], 100.0));
        assert_eq!(full.len(), params.n_prediction_points);

        for h in 0..=params.n_prediction_points {
            let tail = &full.points_m[params.n_prediction_points - h..];
            let (traj, _) = synthesise(&params, &map, &input(&pose, tail, 100.0));

            assert_eq!(traj.len(), params.n_prediction_points, "h = {}", h);
            assert!(traj
                .points_m
                .iter()
                .all(|p| p.x.is_finite() && p.y.is_finite()));
        }

        // Too long a tail is truncated
        let mut long_tail = full.points_m.clone();
        long_tail.extend_from_slice(&full.points_m[..10]);
        let (traj, _) = synthesise(&params, &map, &input(&pose, &long_tail, 100.0));
        assert_eq!(traj.points_m[..], long_tail[..params.n_prediction_points]);
    }

    #[test]
    fn test_continuity() {
        let params = Params::default();
        let map = circle();
        let pose = pose_at(&map, 100.0, 1, 40.0);

        let (first, _) = synthesise(&params, &map, &input(&pose, &[], 100.0));

        // The vehicle has driven 12 points since the last tick
        let tail = first.points_m[12..].to_vec();
        let end_s = frenet::to_frenet(
            &map,
            tail[tail.len() - 1].x,
            tail[tail.len() - 1].y,
            pose.get_heading(),
        )
        .s_m;

        let (second, anchors) = synthesise(&params, &map, &input(&pose, &tail, end_s));

        for (a, b) in tail.iter().zip(second.points_m.iter()) {
            assert_eq!(a.x.to_bits(), b.x.to_bits());
            assert_eq!(a.y.to_bits(), b.y.to_bits());
        }

        // The frame sits on the last tail point, aligned with the tail
        assert_eq!(anchors.frame.origin_m, tail[tail.len() - 1]);
        assert!(!anchors.heading_fallback);

        // New points carry on at roughly the same spacing
        let step_m = 0.02 * 40.0 / 2.24;
        for pair in second.points_m[tail.len() - 1..].windows(2) {
            let dist = (pair[1] - pair[0]).norm();
            assert!((dist - step_m).abs() < 0.05 * step_m, "step of {} m", dist);
        }
    }

    #[test]
    fn test_far_anchors_on_target_lane() {
        let params = Params::default();
        let map = circle();
        let pose = pose_at(&map, 100.0, 1, 0.0);

        let mut inp = input(&pose, &[], 100.0);
        inp.lane = 0;

        let anchors = build_anchors(&params, &map, &inp);
        assert_eq!(anchors.global_m.len(), 2 + NUM_FAR_ANCHORS);

        for k in 1..=NUM_FAR_ANCHORS {
            let expected = frenet::to_cartesian(&map, 100.0 + 30.0 * k as f64, 2.0);
            assert!((anchors.global_m[1 + k] - expected).norm() < 1e-9);
        }

        // With no tail the frame is the pose, with a point a metre behind it
        assert_eq!(anchors.frame.origin_m, pose.position_m);
        assert!(((anchors.global_m[0] - pose.position_m).norm() - 1.0).abs() < 1e-9);
        assert!((anchors.frame.heading_rad - pose.get_heading()).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_tail() {
        let params = Params::default();
        let map = circle();
        let pose = pose_at(&map, 100.0, 1, 40.0);

        let (first, _) = synthesise(&params, &map, &input(&pose, &[], 100.0));

        // The last point repeated, as if the vehicle had stopped
        let mut tail = first.points_m[40..].to_vec();
        tail.push(tail[tail.len() - 1]);

        let mut inp = input(&pose, &tail, 100.0);
        inp.fallback_heading_rad = Some(1.25);

        let (traj, anchors) = synthesise(&params, &map, &inp);

        assert!(anchors.heading_fallback);
        assert_eq!(anchors.frame.heading_rad, 1.25);
        assert_eq!(traj.len(), params.n_prediction_points);
        assert!(traj
            .points_m
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite()));

        // Without a previous frame heading the pose heading is used
        inp.fallback_heading_rad = None;
        let (_, anchors) = synthesise(&params, &map, &inp);
        assert!((anchors.frame.heading_rad - pose.get_heading()).abs() < 1e-12);
    }

    #[test]
    fn test_stationary() {
        let params = Params::default();
        let map = circle();
        let pose = pose_at(&map, 100.0, 1, 0.0);

        let mut inp = input(&pose, &[], 100.0);
        inp.speed_mph = 0.0;

        let (traj, _) = synthesise(&params, &map, &inp);

        // No speed means no progress, but still a full trajectory
        assert_eq!(traj.len(), params.n_prediction_points);
        assert!(traj
            .points_m
            .iter()
            .all(|p| (p - pose.position_m).norm() < 1e-9));
    }

    #[test]
    fn test_reversed_tail_drops_anchors() {
        let params = Params::default();
        let map = circle();
        let pose = pose_at(&map, 100.0, 1, 40.0);

        let (first, _) = synthesise(&params, &map, &input(&pose, &[], 100.0));

        // A tail driven backwards along the track puts the far anchors behind the frame
        let tail: Vec<_> = first.points_m[..20].iter().rev().cloned().collect();

        let inp = input(&pose, &tail, 100.0);
        let anchors = build_anchors(&params, &map, &inp);
        for far_m in &anchors.global_m[2..] {
            assert!(anchors.frame.to_local(far_m).x < 0.0);
        }

        let (traj, _) = synthesise(&params, &map, &inp);

        assert_eq!(traj.len(), params.n_prediction_points);
        assert_eq!(traj.points_m[..tail.len()], tail[..]);
        assert!(traj.points_m.iter().all(is_finite));
    }

    #[test]
    fn test_coincident_anchors_fit_flat() {
        let origin_m = Vector2::new(10.0, -4.0);

        let anchors = Anchors {
            frame: ReferenceFrame::new(origin_m, 0.3),
            global_m: vec![origin_m; 2 + NUM_FAR_ANCHORS],
            heading_fallback: false,
        };

        let spline = fit_spline(&anchors);
        for x in [-5.0, 0.0, 0.5, 40.0].iter() {
            assert_eq!(spline.eval(*x), 0.0);
        }
    }

    #[test]
    fn test_non_finite_samples_held() {
        let mut params = Params::default();
        let map = circle();
        let pose = pose_at(&map, 100.0, 1, 40.0);

        // No speed conversion gives an infinite step length
        params.speed_conversion = 0.0;

        let (traj, anchors) = synthesise(&params, &map, &input(&pose, &[], 100.0));

        assert_eq!(traj.len(), params.n_prediction_points);
        assert!(traj.points_m.iter().all(|p| *p == anchors.frame.origin_m));

        // With a tail the last tail point is held instead
        let tail = vec![pose.position_m, pose.position_m + Vector2::new(0.3, 0.1)];
        let (traj, _) = synthesise(&params, &map, &input(&pose, &tail, 100.0));

        assert_eq!(traj.len(), params.n_prediction_points);
        assert!(traj.points_m[2..].iter().all(|p| *p == tail[1]));
    }

    #[test]
    fn test_non_finite_pose() {
        let params = Params::default();
        let map = circle();
        let mut pose = pose_at(&map, 100.0, 1, 40.0);
        pose.position_m.x = std::f64::NAN;

        let (traj, _) = synthesise(&params, &map, &input(&pose, &[], 100.0));

        assert_eq!(traj.len(), params.n_prediction_points);
        assert!(traj.points_m.iter().all(is_finite));

        // Held on the target lane at the ego position
        let expected_m = frenet::to_cartesian(&map, 100.0, pose.d_m);
        assert!((traj.points_m[0] - expected_m).norm() < 1e-9);
    }

    #[test]
    fn test_to_control() {
        let traj = Trajectory {
            points_m: vec![Vector2::new(1.0, 2.0), Vector2::new(3.0, 4.0)],
        };

        let control = traj.to_control();
        assert_eq!(control.next_x, vec![1.0, 3.0]);
        assert_eq!(control.next_y, vec![2.0, 4.0]);
    }
}
