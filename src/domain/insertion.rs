//! Best-insertion search: where does a request cost the least to place?
//!
//! This is the hot path of every insertion operator and of local search, so
//! results are cached per-request on the `Plan` they were computed against
//! (see `Plan::cached_best_position`).

use crate::domain::instance::Instance;
use crate::domain::plan::{Plan, PlanInsertion};
use crate::domain::solution::Solution;
use crate::domain::types::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanPosition {
    pub pick: usize,
    pub drop: usize,
    pub is_feasible: bool,
    pub cost: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct SolutionPosition {
    pub position: PlanPosition,
    pub plan_index: usize,
}

/// Finds the cheapest place to insert `request` into `plan`, using the
/// plan's capacity-aware evaluator when the instance tracks capacity.
/// Ties favor feasibility first, then lower cost (see module docs).
pub fn find_best_insert_in_plan(instance: &Instance, plan: &mut Plan, request_id: RequestId) -> PlanPosition {
    if let Some((pick, drop)) = plan.cached_best_position(request_id) {
        let insertion = PlanInsertion {
            request: request_id,
            pick_idx: pick,
            drop_idx: drop,
        };
        let (cost, is_feasible) = plan
            .insertion_cost(instance, insertion, 0, instance.capacity_enabled)
            .expect("cached position must be evaluable without a cost bound");
        return PlanPosition { pick, drop, is_feasible, cost };
    }

    let request = instance.request(request_id);
    let mut best_cost = i64::MAX;
    let mut best: Option<PlanPosition> = None;

    if request.is_partial {
        assert_eq!(
            plan.courier, request.courier,
            "courier id from partial request does not match plan"
        );
        for drop in 0..=plan.length() {
            let insertion = PlanInsertion {
                request: request_id,
                pick_idx: 0,
                drop_idx: drop,
            };
            consider(instance, plan, insertion, &mut best_cost, &mut best, 0, drop);
        }
    } else {
        for pick in 0..=plan.length() {
            for drop in (pick + 1)..=(plan.length() + 1) {
                let insertion = PlanInsertion {
                    request: request_id,
                    pick_idx: pick,
                    drop_idx: drop,
                };
                consider(instance, plan, insertion, &mut best_cost, &mut best, pick, drop);
            }
        }
    }

    best.expect("an empty plan always admits at least one insertion position")
}

fn consider(
    instance: &Instance,
    plan: &mut Plan,
    insertion: PlanInsertion,
    best_cost: &mut i64,
    best: &mut Option<PlanPosition>,
    pick: usize,
    drop: usize,
) {
    let Some((cost, feasible)) = plan.insertion_cost(instance, insertion, *best_cost, instance.capacity_enabled) else {
        return;
    };
    if cost >= *best_cost {
        return;
    }
    let currently_feasible = best.map(|b| b.is_feasible).unwrap_or(false);
    if feasible {
        *best_cost = cost;
        *best = Some(PlanPosition { pick, drop, is_feasible: true, cost });
    } else if !currently_feasible {
        *best_cost = cost;
        *best = Some(PlanPosition { pick, drop, is_feasible: false, cost });
    }
}

/// For partial requests, restricted to the bound courier's plan; otherwise
/// the best position across every plan in the solution.
pub fn find_best_insert_in_solution(instance: &Instance, solution: &mut Solution, request_id: RequestId) -> SolutionPosition {
    let request = instance.request(request_id);

    if request.is_partial {
        let plan_index = request.courier;
        let position = find_best_insert_in_plan(instance, &mut solution.plans[plan_index], request_id);
        return SolutionPosition { position, plan_index };
    }

    let mut best_position: Option<PlanPosition> = None;
    let mut best_plan_index = 0;
    let mut best_cost = i64::MAX;

    for (i, plan) in solution.plans.iter_mut().enumerate() {
        let position = find_best_insert_in_plan(instance, plan, request_id);
        let currently_feasible = best_position.map(|b| b.is_feasible).unwrap_or(false);
        if position.cost < best_cost && (position.is_feasible || !currently_feasible) {
            best_position = Some(position);
            best_plan_index = i;
            best_cost = position.cost;
        }
    }

    SolutionPosition {
        position: best_position.expect("solution must have at least one plan"),
        plan_index: best_plan_index,
    }
}

/// Inserting the pickup first, then the drop: the drop index refers to the
/// sequence *before* the pickup insertion, so the insert order is
/// load-bearing (see module docs of `Plan::insert`).
pub fn insert_into_plan(instance: &Instance, plan: &mut Plan, request_id: RequestId, position: PlanPosition) {
    let request = instance.request(request_id);
    if !request.is_partial {
        plan.insert(request.pickup.expect("non-partial request has a pickup"), position.pick);
    }
    plan.insert(request.drop, position.drop);
    plan.compute_metrics(instance);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instance::RawInstance;
    use crate::domain::solution::Solution;

    fn line_instance() -> Instance {
        let dist = vec![
            vec![0.0, 1.0, 2.0, 3.0],
            vec![1.0, 0.0, 1.0, 2.0],
            vec![2.0, 1.0, 0.0, 1.0],
            vec![3.0, 2.0, 1.0, 0.0],
        ];
        Instance::build(RawInstance {
            car_distance_matrix: dist.clone(),
            car_duration_matrix: dist,
            num_plans_to_create: 1,
            starts: vec![0],
            ends: vec![3],
            pickup_nodes: vec![1],
            drop_nodes: vec![2],
            deliveries_not_started: vec![(1, 2)],
            deliveries_in_progress: vec![],
            time_windows: vec![],
            pickup_service_time: 0,
            drop_service_time: 0,
            courier_capacities: vec![],
            start_utilizations: vec![],
            node_demands: vec![],
            time_limit: 0,
        })
        .unwrap()
    }

    #[test]
    fn best_position_for_empty_plan_is_pick_0_drop_1() {
        let instance = line_instance();
        let mut solution = Solution::empty(1);
        let position = find_best_insert_in_plan(&instance, &mut solution.plans[0], RequestId(0));
        assert_eq!((position.pick, position.drop), (0, 1));
        assert!(position.is_feasible);
    }

    #[test]
    fn insert_then_query_uses_cache() {
        let instance = line_instance();
        let mut solution = Solution::empty(1);
        let position = find_best_insert_in_plan(&instance, &mut solution.plans[0], RequestId(0));
        insert_into_plan(&instance, &mut solution.plans[0], RequestId(0), position);
        assert_eq!(solution.plans[0].length(), 2);
    }
}
