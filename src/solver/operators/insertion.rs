//! Repair operators: each takes a solution with a non-empty
//! `unplanned_requests` pool and re-inserts every request somewhere.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::insertion::{find_best_insert_in_plan, find_best_insert_in_solution, insert_into_plan};
use crate::domain::instance::Instance;
use crate::domain::solution::Solution;
use crate::domain::types::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionOperator {
    IntraRoute,
    InterRoute,
    SortingTime,
    Greedy,
}

impl InsertionOperator {
    pub const ALL: [InsertionOperator; 4] = [
        InsertionOperator::IntraRoute,
        InsertionOperator::InterRoute,
        InsertionOperator::SortingTime,
        InsertionOperator::Greedy,
    ];

    pub fn apply(self, instance: &Instance, solution: &Solution, rng: &mut impl Rng) -> Solution {
        match self {
            InsertionOperator::IntraRoute => intra_route(instance, solution, rng),
            InsertionOperator::InterRoute => inter_route(instance, solution, rng),
            InsertionOperator::SortingTime => sorting_time(instance, solution, rng),
            InsertionOperator::Greedy => greedy(instance, solution),
        }
    }
}

fn inter_route(instance: &Instance, solution: &Solution, rng: &mut impl Rng) -> Solution {
    let mut new_solution = Solution::with_plans(solution.copy_plans());

    let mut requests: Vec<_> = solution.unplanned_requests.iter().copied().collect();
    requests.sort();
    requests.shuffle(rng);

    for request_id in requests {
        let position = find_best_insert_in_solution(instance, &mut new_solution, request_id);
        insert_into_plan(instance, &mut new_solution.plans[position.plan_index], request_id, position.position);
    }

    new_solution.compute_cost(instance);
    new_solution
}

fn intra_route_like(instance: &Instance, solution: &Solution, requests: Vec<RequestId>, rng: &mut impl Rng) -> Solution {
    let mut new_solution = Solution::with_plans(solution.copy_plans());

    let mut plan_indexes: Vec<usize> = (0..new_solution.plans.len()).collect();

    for request_id in requests {
        let request = instance.request(request_id);
        if request.is_partial {
            let position = find_best_insert_in_plan(instance, &mut new_solution.plans[request.courier], request_id);
            insert_into_plan(instance, &mut new_solution.plans[request.courier], request_id, position);
        } else {
            plan_indexes.shuffle(rng);
            let last = plan_indexes.len() - 1;
            for (i, &plan_index) in plan_indexes.iter().enumerate() {
                let position = find_best_insert_in_plan(instance, &mut new_solution.plans[plan_index], request_id);
                if position.is_feasible || i == last {
                    insert_into_plan(instance, &mut new_solution.plans[plan_index], request_id, position);
                    break;
                }
            }
        }
    }

    new_solution.compute_cost(instance);
    new_solution
}

fn intra_route(instance: &Instance, solution: &Solution, rng: &mut impl Rng) -> Solution {
    let mut requests: Vec<_> = solution.unplanned_requests.iter().copied().collect();
    requests.sort();
    requests.shuffle(rng);
    intra_route_like(instance, solution, requests, rng)
}

fn sorting_time(instance: &Instance, solution: &Solution, rng: &mut impl Rng) -> Solution {
    let mut requests: Vec<_> = solution.unplanned_requests.iter().copied().collect();
    requests.sort();
    requests.sort_by_key(|&r| instance.action(instance.request(r).drop).time_windows.max_from_time());
    intra_route_like(instance, solution, requests, rng)
}

fn greedy(instance: &Instance, solution: &Solution) -> Solution {
    let mut new_solution = Solution::with_plans(solution.copy_plans());

    let mut pending = solution.unplanned_requests.clone();

    while !pending.is_empty() {
        let mut best_cost = i64::MAX;
        let mut best_feasible = false;
        let mut best_request = None;
        let mut best_plan_index = 0;
        let mut best_position = None;

        let mut ordered_pending: Vec<_> = pending.iter().copied().collect();
        ordered_pending.sort();
        for request_id in ordered_pending {
            let position = find_best_insert_in_solution(instance, &mut new_solution, request_id);
            if position.position.cost < best_cost && (position.position.is_feasible || !best_feasible) {
                best_cost = position.position.cost;
                best_feasible = position.position.is_feasible;
                best_request = Some(request_id);
                best_plan_index = position.plan_index;
                best_position = Some(position.position);
            }
        }

        let request_id = best_request.expect("pending is non-empty");
        insert_into_plan(instance, &mut new_solution.plans[best_plan_index], request_id, best_position.unwrap());
        pending.remove(&request_id);
    }

    new_solution.compute_cost(instance);
    new_solution
}
