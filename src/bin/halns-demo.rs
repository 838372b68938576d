//! Builds a small synthetic instance and runs the solver against it, so the
//! crate has something runnable beyond its test suite.

use halns::domain::instance::{RawInstance, RawTimeWindow};
use halns::{Instance, Solver, SolverConfig};

fn synthetic_instance() -> Instance {
    // 10 nodes: 2 couriers starting/ending at depots 0/1 and 8/9, 3 requests
    // each with a distinct pickup/drop node pair across 2..=7.
    let n = 10;
    let distance_f: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 0.0 } else { ((i as i64 - j as i64).abs() * 10 + 1) as f64 }).collect())
        .collect();

    Instance::build(RawInstance {
        car_distance_matrix: distance_f.clone(),
        car_duration_matrix: distance_f,
        num_plans_to_create: 2,
        starts: vec![0, 1],
        ends: vec![8, 9],
        pickup_nodes: vec![2, 4, 6],
        drop_nodes: vec![3, 5, 7],
        deliveries_not_started: vec![(2, 3), (4, 5), (6, 7)],
        deliveries_in_progress: vec![],
        time_windows: vec![
            RawTimeWindow { node: 3, is_hard: false, from_time: 0, to_time: 200, weight: 3 },
            RawTimeWindow { node: 5, is_hard: false, from_time: 0, to_time: 200, weight: 3 },
            RawTimeWindow { node: 7, is_hard: false, from_time: 0, to_time: 200, weight: 3 },
        ],
        pickup_service_time: 2,
        drop_service_time: 2,
        courier_capacities: vec![],
        start_utilizations: vec![],
        node_demands: vec![],
        time_limit: 5,
    })
    .expect("synthetic instance is well-formed")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let instance = synthetic_instance();
    let config = SolverConfig {
        max_iterations: 2_000,
        ..SolverConfig::default()
    };

    let mut solver = Solver::new(&instance, config, Some(42));
    let best = solver.solve();

    println!("{best}");
    for (courier, route) in best.to_view(&instance).plans.iter().enumerate() {
        println!("courier {courier}: {route:?}");
    }
}
