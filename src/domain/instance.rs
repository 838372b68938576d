//! Build-once, read-only problem instance.
//!
//! `Instance` owns the distance/duration matrices, the `Action`/`Request`
//! arena, and the per-courier depot layout. Every downstream component
//! borrows it rather than reaching for a process-wide global.

use crate::domain::types::{Action, ActionId, ActionType, Request, RequestId, TimeWindow};
use crate::error::SolverError;

/// `{node, is_hard, from_time, to_time, weight}`, one per host-supplied
/// time-window constraint. `to_time == i32::MAX` means "unbounded".
#[derive(Debug, Clone, Copy)]
pub struct RawTimeWindow {
    pub node: usize,
    pub is_hard: bool,
    pub from_time: i64,
    pub to_time: i64,
    pub weight: i64,
}

/// Host-shaped input, decoded elsewhere (JSON, RPC, whatever the caller
/// uses) into this plain struct before being handed to [`Instance::build`].
#[derive(Debug, Clone)]
pub struct RawInstance {
    pub car_distance_matrix: Vec<Vec<f64>>,
    pub car_duration_matrix: Vec<Vec<f64>>,
    pub num_plans_to_create: usize,
    pub starts: Vec<usize>,
    pub ends: Vec<usize>,
    pub pickup_nodes: Vec<usize>,
    pub drop_nodes: Vec<usize>,
    pub deliveries_not_started: Vec<(usize, usize)>,
    pub deliveries_in_progress: Vec<(usize, usize)>,
    pub time_windows: Vec<RawTimeWindow>,
    pub pickup_service_time: i64,
    pub drop_service_time: i64,
    pub courier_capacities: Vec<i64>,
    pub start_utilizations: Vec<i64>,
    pub node_demands: Vec<i64>,
    pub time_limit: i64,
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub actions: Vec<Action>,
    pub requests: Vec<Request>,
    pub distance_matrix: Vec<Vec<i64>>,
    pub duration_matrix: Vec<Vec<i64>>,
    pub num_plans_to_create: usize,
    pub starts: Vec<usize>,
    pub ends: Vec<usize>,
    pub courier_capacities: Vec<i64>,
    pub start_utilizations: Vec<i64>,
    pub capacity_enabled: bool,
    pub time_limit: i64,
}

impl Instance {
    pub fn build(raw: RawInstance) -> Result<Instance, SolverError> {
        let n = raw.car_duration_matrix.len();
        if raw.car_distance_matrix.len() != n {
            return Err(SolverError::MatrixSizeMismatch {
                distance: raw.car_distance_matrix.len(),
                duration: n,
            });
        }
        for row in raw.car_distance_matrix.iter().chain(raw.car_duration_matrix.iter()) {
            if row.len() != n {
                return Err(SolverError::MatrixSizeMismatch {
                    distance: raw.car_distance_matrix.len(),
                    duration: n,
                });
            }
        }

        let check_node = |node: usize| -> Result<(), SolverError> {
            if node >= n {
                Err(SolverError::NodeOutOfRange(node, n))
            } else {
                Ok(())
            }
        };
        for &node in raw
            .starts
            .iter()
            .chain(raw.ends.iter())
            .chain(raw.pickup_nodes.iter())
            .chain(raw.drop_nodes.iter())
        {
            check_node(node)?;
        }
        for &(p, d) in &raw.deliveries_not_started {
            check_node(p)?;
            check_node(d)?;
        }
        for &(_, d) in &raw.deliveries_in_progress {
            check_node(d)?;
        }
        for tw in &raw.time_windows {
            check_node(tw.node)?;
        }

        let num_couriers = raw.starts.len();
        for &(courier, _) in &raw.deliveries_in_progress {
            if courier >= num_couriers {
                return Err(SolverError::CourierOutOfRange(courier, num_couriers));
            }
        }

        let capacity_enabled = !raw.courier_capacities.is_empty();
        if capacity_enabled {
            if raw.courier_capacities.len() != num_couriers {
                return Err(SolverError::CapacityArityMismatch {
                    field: "courier_capacities",
                    expected: num_couriers,
                    actual: raw.courier_capacities.len(),
                });
            }
            if raw.start_utilizations.len() != num_couriers {
                return Err(SolverError::CapacityArityMismatch {
                    field: "start_utilizations",
                    expected: num_couriers,
                    actual: raw.start_utilizations.len(),
                });
            }
            if raw.node_demands.len() != n {
                return Err(SolverError::CapacityArityMismatch {
                    field: "node_demands",
                    expected: n,
                    actual: raw.node_demands.len(),
                });
            }
        }

        let mut actions: Vec<Option<Action>> = (0..n).map(|_| None).collect();

        for &node in &raw.pickup_nodes {
            let demand = if capacity_enabled { raw.node_demands[node] } else { 0 };
            actions[node] = Some(Action {
                node,
                kind: ActionType::Pickup,
                service_time: raw.pickup_service_time,
                demand,
                time_windows: Default::default(),
                request: None,
            });
        }
        for &node in &raw.drop_nodes {
            let demand = if capacity_enabled { raw.node_demands[node] } else { 0 };
            actions[node] = Some(Action {
                node,
                kind: ActionType::Drop,
                service_time: raw.drop_service_time,
                demand,
                time_windows: Default::default(),
                request: None,
            });
        }
        for (i, &node) in raw.starts.iter().enumerate() {
            let demand = if capacity_enabled { -raw.start_utilizations[i] } else { 0 };
            actions[node] = Some(Action {
                node,
                kind: ActionType::Start,
                service_time: 0,
                demand,
                time_windows: Default::default(),
                request: None,
            });
        }
        for &node in &raw.ends {
            actions[node] = Some(Action {
                node,
                kind: ActionType::End,
                service_time: 0,
                demand: 0,
                time_windows: Default::default(),
                request: None,
            });
        }

        for tw in &raw.time_windows {
            if let Some(action) = actions[tw.node].as_mut() {
                action.time_windows.add(TimeWindow {
                    from_time: tw.from_time,
                    to_time: tw.to_time,
                    is_hard: tw.is_hard,
                    weight: tw.weight,
                });
            }
        }

        let mut requests = Vec::with_capacity(
            raw.deliveries_in_progress.len() + raw.deliveries_not_started.len(),
        );
        for &(courier, drop_node) in &raw.deliveries_in_progress {
            let request_id = RequestId(requests.len());
            requests.push(Request {
                is_partial: true,
                pickup: None,
                drop: ActionId(drop_node),
                courier,
            });
            actions[drop_node].as_mut().unwrap().request = Some(request_id);
        }
        for &(pickup_node, drop_node) in &raw.deliveries_not_started {
            let request_id = RequestId(requests.len());
            requests.push(Request {
                is_partial: false,
                pickup: Some(ActionId(pickup_node)),
                drop: ActionId(drop_node),
                courier: 0,
            });
            actions[pickup_node].as_mut().unwrap().request = Some(request_id);
            actions[drop_node].as_mut().unwrap().request = Some(request_id);
        }

        let distance_matrix = truncate_matrix(&raw.car_distance_matrix);
        let mut duration_matrix = truncate_matrix(&raw.car_duration_matrix);

        for &node in &raw.starts {
            fold_service_time(&mut duration_matrix, &raw, node, false, false);
        }
        for &node in &raw.pickup_nodes {
            fold_service_time(&mut duration_matrix, &raw, node, true, false);
        }
        for &node in &raw.drop_nodes {
            fold_service_time(&mut duration_matrix, &raw, node, false, true);
        }

        // Every node was assigned an Action: starts/ends/pickups/drops partition [0, n).
        let actions: Vec<Action> = actions.into_iter().map(|a| a.expect("unassigned node")).collect();

        Ok(Instance {
            actions,
            requests,
            distance_matrix,
            duration_matrix,
            num_plans_to_create: raw.num_plans_to_create,
            starts: raw.starts,
            ends: raw.ends,
            courier_capacities: raw.courier_capacities,
            start_utilizations: raw.start_utilizations,
            capacity_enabled,
            time_limit: raw.time_limit,
        })
    }

    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id.0]
    }

    pub fn request(&self, id: RequestId) -> &Request {
        &self.requests[id.0]
    }
}

fn truncate_matrix(matrix: &[Vec<f64>]) -> Vec<Vec<i64>> {
    matrix
        .iter()
        .map(|row| row.iter().map(|&v| v as i64).collect())
        .collect()
}

/// Mirrors the original's `addServiceTimeToDurationMatrix`: the "≠ 0" guard
/// only applies to the pickup-source-to-pickup-column and
/// drop-source-to-drop-column cases, never to the cross terms.
fn fold_service_time(
    duration_matrix: &mut [Vec<i64>],
    raw: &RawInstance,
    node: usize,
    is_pickup: bool,
    is_drop: bool,
) {
    for &pickup_node in &raw.pickup_nodes {
        if !is_pickup || duration_matrix[node][pickup_node] != 0 {
            duration_matrix[node][pickup_node] += raw.pickup_service_time;
        }
    }
    for &drop_node in &raw.drop_nodes {
        if !is_drop || duration_matrix[node][drop_node] != 0 {
            duration_matrix[node][drop_node] += raw.drop_service_time;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_raw() -> RawInstance {
        // 4 nodes: 0 = start, 1 = pickup, 2 = drop, 3 = end.
        let n = 4;
        RawInstance {
            car_distance_matrix: vec![vec![0.0; n]; n],
            car_duration_matrix: vec![vec![0.0; n]; n],
            num_plans_to_create: 1,
            starts: vec![0],
            ends: vec![3],
            pickup_nodes: vec![1],
            drop_nodes: vec![2],
            deliveries_not_started: vec![(1, 2)],
            deliveries_in_progress: vec![],
            time_windows: vec![],
            pickup_service_time: 5,
            drop_service_time: 7,
            courier_capacities: vec![],
            start_utilizations: vec![],
            node_demands: vec![],
            time_limit: 0,
        }
    }

    #[test]
    fn builds_one_request_per_delivery_pair() {
        let instance = Instance::build(toy_raw()).unwrap();
        assert_eq!(instance.requests.len(), 1);
        assert!(!instance.requests[0].is_partial);
        assert_eq!(instance.requests[0].pickup, Some(ActionId(1)));
        assert_eq!(instance.requests[0].drop, ActionId(2));
    }

    #[test]
    fn rejects_mismatched_matrix_sizes() {
        let mut raw = toy_raw();
        raw.car_distance_matrix.pop();
        let err = Instance::build(raw).unwrap_err();
        assert!(matches!(err, SolverError::MatrixSizeMismatch { .. }));
    }

    #[test]
    fn rejects_out_of_range_node() {
        let mut raw = toy_raw();
        raw.pickup_nodes.push(99);
        let err = Instance::build(raw).unwrap_err();
        assert!(matches!(err, SolverError::NodeOutOfRange(99, 4)));
    }
}
