//! # Planner Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Vector2;
use std::sync::Arc;

use plan_lib::{
    frenet,
    loc::Pose,
    map::{TrackMap, Waypoint},
    planner::{InputData, Params, Planner},
    traffic::PerceivedVehicle,
};
use util::module::State;

/// Build a circular track about the same size as the simulator's highway.
fn build_track(params: &Params) -> TrackMap {
    let num_waypoints = 181;
    let centre = Vector2::new(params.track_centre_m[0], params.track_centre_m[1]);

    let step_rad = std::f64::consts::TAU / num_waypoints as f64;
    let chord_m = params.max_s_m / num_waypoints as f64;
    let radius_m = chord_m / (2.0 * (step_rad / 2.0).sin());

    let waypoints = (0..num_waypoints)
        .map(|i| {
            let theta = i as f64 * step_rad;
            Waypoint {
                s_m: i as f64 * chord_m,
                x_m: centre.x + radius_m * theta.cos(),
                y_m: centre.y + radius_m * theta.sin(),
                normal_x: theta.cos(),
                normal_y: theta.sin(),
            }
        })
        .collect();

    TrackMap::new(waypoints, params.max_s_m, centre).unwrap()
}

fn planner_benchmark(c: &mut Criterion) {
    // ---- Build the track and a busy tick ----

    let params = Params::default();
    let map = Arc::new(build_track(&params));

    let pose = Pose {
        position_m: frenet::to_cartesian(&map, 1000.0, 6.0),
        s_m: 1000.0,
        d_m: 6.0,
        yaw_deg: map.heading_at_rad(1000.0).to_degrees(),
        speed_mph: 45.0,
    };

    // Twelve vehicles spread over the three lanes around us
    let vehicles: Vec<PerceivedVehicle> = (0..12)
        .map(|i| PerceivedVehicle {
            id: i as f64,
            vx_ms: 18.0,
            vy_ms: 1.0,
            s_m: 900.0 + 20.0 * i as f64,
            d_m: 2.0 + 4.0 * (i % 3) as f64,
        })
        .collect();

    // Run one tick to get a realistic tail
    let mut planner = Planner::new(params.clone(), map.clone());
    let first_input = InputData {
        pose,
        vehicles: vehicles.clone(),
        ..Default::default()
    };
    let (traj, _) = planner.proc(&first_input).unwrap();
    let tail = traj.points_m[3..].to_vec();
    let end = tail[tail.len() - 1];

    let input = InputData {
        pose,
        end_path_s_m: frenet::to_frenet(&map, end.x, end.y, pose.get_heading()).s_m,
        end_path_d_m: 6.0,
        prev_path_m: tail,
        vehicles,
    };

    // ---- Benchmarks ----

    c.bench_function("frenet::to_frenet", |b| {
        b.iter(|| {
            frenet::to_frenet(
                &map,
                black_box(pose.position_m.x),
                black_box(pose.position_m.y),
                pose.get_heading(),
            )
        })
    });

    c.bench_function("Planner::proc", |b| {
        b.iter(|| {
            let mut planner = Planner::new(params.clone(), map.clone());
            planner.proc(black_box(&input)).unwrap()
        })
    });
}

criterion_group!(benches, planner_benchmark);
criterion_main!(benches);
