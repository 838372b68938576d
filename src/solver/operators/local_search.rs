//! Local-search operators: applied to a single solution near-best candidate,
//! they either improve it or leave it unchanged.

use std::collections::HashMap;

use rand::Rng;

use crate::domain::insertion::{find_best_insert_in_plan, find_best_insert_in_solution, insert_into_plan};
use crate::domain::instance::Instance;
use crate::domain::plan::Plan;
use crate::domain::solution::Solution;
use crate::domain::types::{ActionId, ActionType, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSearchOperator {
    IntraExchange,
    InterExchange,
    TwoOpt,
}

impl LocalSearchOperator {
    pub const ALL: [LocalSearchOperator; 3] = [
        LocalSearchOperator::IntraExchange,
        LocalSearchOperator::InterExchange,
        LocalSearchOperator::TwoOpt,
    ];

    pub fn apply(self, instance: &Instance, solution: &Solution, rng: &mut impl Rng) -> Solution {
        match self {
            LocalSearchOperator::IntraExchange => intra_exchange(instance, solution, rng),
            LocalSearchOperator::InterExchange => inter_exchange(instance, solution, rng),
            LocalSearchOperator::TwoOpt => two_opt(instance, solution, rng),
        }
    }
}

fn requests_in_plan(instance: &Instance, plan: &Plan) -> Vec<RequestId> {
    let mut seen = std::collections::HashSet::new();
    for &action_id in &plan.actions {
        seen.insert(instance.action(action_id).request.unwrap());
    }
    let mut requests: Vec<_> = seen.into_iter().collect();
    requests.sort();
    requests
}

fn intra_exchange(instance: &Instance, solution: &Solution, rng: &mut impl Rng) -> Solution {
    let mut new_solution = solution.clone();
    let plan_index = match new_solution.random_non_empty_plan(rng) {
        Some(i) => i,
        None => return new_solution,
    };

    let requests = requests_in_plan(instance, &new_solution.plans[plan_index]);
    for request_id in requests {
        let request = instance.request(request_id);
        new_solution.plans[plan_index].remove(instance, request_id, request.is_partial);
        let position = find_best_insert_in_plan(instance, &mut new_solution.plans[plan_index], request_id);
        insert_into_plan(instance, &mut new_solution.plans[plan_index], request_id, position);
    }
    new_solution.compute_cost(instance);
    new_solution
}

fn inter_exchange(instance: &Instance, solution: &Solution, rng: &mut impl Rng) -> Solution {
    let mut new_solution = solution.clone();
    let plan_index = match new_solution.random_non_empty_plan(rng) {
        Some(i) => i,
        None => return new_solution,
    };

    let requests = requests_in_plan(instance, &new_solution.plans[plan_index]);
    for request_id in requests {
        let request = instance.request(request_id);
        let is_partial = request.is_partial;
        let home_plan = if is_partial { request.courier } else { plan_index };
        new_solution.plans[home_plan].remove(instance, request_id, is_partial);
        let position = find_best_insert_in_solution(instance, &mut new_solution, request_id);
        insert_into_plan(instance, &mut new_solution.plans[position.plan_index], request_id, position.position);
    }
    new_solution.compute_cost(instance);
    new_solution
}

fn two_opt(instance: &Instance, solution: &Solution, rng: &mut impl Rng) -> Solution {
    let mut new_solution = solution.clone();
    let plan_index = match new_solution.random_non_empty_plan(rng) {
        Some(i) => i,
        None => return new_solution,
    };

    let mut current = new_solution.plans[plan_index].clone();
    current.compute_metrics(instance);
    let mut current_cost = current.metrics().cost();
    let mut current_feasible = current.metrics().feasible;

    for i in 0..current.length().saturating_sub(1) {
        for j in (i + 1)..current.length() {
            let mut candidate = reverse_segment_fixing_pairs(instance, &current, i, j);
            candidate.compute_metrics(instance);
            let candidate_cost = candidate.metrics().cost();
            if candidate_cost < current_cost && (candidate.metrics().feasible || !current_feasible) {
                current_feasible = candidate.metrics().feasible;
                current_cost = candidate_cost;
                current = candidate;
            }
        }
    }

    new_solution.plans[plan_index] = current;
    new_solution.compute_cost(instance);
    new_solution
}

/// Reverses `plan.actions[from..=to]`, then swaps each `Drop` back in front
/// of its matching `Pickup` within that reversed window so precedence
/// survives a naive reversal.
fn reverse_segment_fixing_pairs(instance: &Instance, plan: &Plan, from: usize, to: usize) -> Plan {
    let mut middle: Vec<ActionId> = plan.actions[from..=to].iter().rev().copied().collect();

    let mut drop_positions: HashMap<RequestId, usize> = HashMap::new();
    for i in 0..middle.len() {
        let action = instance.action(middle[i]);
        if action.kind == ActionType::Drop {
            drop_positions.insert(action.request.unwrap(), i);
        } else if let Some(&drop_idx) = drop_positions.get(&action.request.unwrap()) {
            middle.swap(i, drop_idx);
        }
    }

    let mut new_plan = Plan::empty(plan.courier);
    for (i, &action_id) in plan.actions.iter().enumerate() {
        if i >= from && i <= to {
            new_plan.append(middle[i - from]);
        } else {
            new_plan.append(action_id);
        }
    }
    new_plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::insertion::{find_best_insert_in_solution, insert_into_plan as insert_req};
    use crate::domain::instance::RawInstance;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn two_request_instance() -> Instance {
        let n = 6;
        let mut dist = vec![vec![1.0; n]; n];
        for (i, row) in dist.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        Instance::build(RawInstance {
            car_distance_matrix: dist.clone(),
            car_duration_matrix: dist,
            num_plans_to_create: 1,
            starts: vec![0],
            ends: vec![5],
            pickup_nodes: vec![1, 3],
            drop_nodes: vec![2, 4],
            deliveries_not_started: vec![(1, 2), (3, 4)],
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

    fn full_solution(instance: &Instance) -> Solution {
        let mut solution = Solution::empty(instance.num_plans_to_create);
        solution.unplanned_requests = (0..instance.requests.len()).map(RequestId).collect();
        let mut pending: Vec<_> = solution.unplanned_requests.iter().copied().collect();
        pending.sort();
        for request_id in pending {
            let position = find_best_insert_in_solution(instance, &mut solution, request_id);
            insert_req(instance, &mut solution.plans[position.plan_index], request_id, position.position);
            solution.unplanned_requests.remove(&request_id);
        }
        solution.compute_cost(instance);
        solution
    }

    #[test]
    fn two_opt_never_increases_cost() {
        let instance = two_request_instance();
        let solution = full_solution(&instance);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let result = LocalSearchOperator::TwoOpt.apply(&instance, &solution, &mut rng);
        assert!(result.cost <= solution.cost);
        result.sanity_check(&instance);
    }

    #[test]
    fn intra_exchange_preserves_partition_invariant() {
        let instance = two_request_instance();
        let solution = full_solution(&instance);
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let result = LocalSearchOperator::IntraExchange.apply(&instance, &solution, &mut rng);
        result.sanity_check(&instance);
    }
}
