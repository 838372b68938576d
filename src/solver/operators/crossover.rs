//! Crossover operators: combine the incumbent best solution with a fresh
//! random one to escape a local optimum.

use rand::Rng;

use crate::domain::instance::Instance;
use crate::domain::solution::{RequestSet, Solution};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverOperator {
    OnePoint,
    TwoPoint,
    Linear,
}

impl CrossoverOperator {
    pub const ALL: [CrossoverOperator; 3] = [
        CrossoverOperator::OnePoint,
        CrossoverOperator::TwoPoint,
        CrossoverOperator::Linear,
    ];

    pub fn apply(self, instance: &Instance, best: &Solution, random: &Solution, rng: &mut impl Rng) -> Solution {
        match self {
            CrossoverOperator::OnePoint => one_point(instance, best, random, rng),
            CrossoverOperator::TwoPoint => two_point(instance, best, random, rng),
            CrossoverOperator::Linear => linear(instance, best, random, rng),
        }
    }
}

fn one_point(instance: &Instance, best: &Solution, random: &Solution, rng: &mut impl Rng) -> Solution {
    let mut new_solution = Solution::empty(instance.num_plans_to_create);

    let max_crossover = best.max_plan_length() as isize - 1;
    let crossover_point = rng.gen_range(0..=max_crossover.max(0) as usize);

    let mut emplaced = RequestSet::new();

    for (pi, bp) in best.plans.iter().enumerate() {
        for (ai, &ba) in bp.actions.iter().enumerate() {
            let request_id = instance.action(ba).request.unwrap();
            if ai <= crossover_point {
                new_solution.plans[pi].append(ba);
                emplaced.insert(request_id);
            } else if emplaced.contains(&request_id) {
                new_solution.plans[pi].append(ba);
            }
        }
    }

    for (pi, rp) in random.plans.iter().enumerate() {
        for &ra in &rp.actions {
            let request_id = instance.action(ra).request.unwrap();
            if !emplaced.contains(&request_id) {
                new_solution.plans[pi].append(ra);
            }
        }
    }

    for plan in &mut new_solution.plans {
        plan.compute_metrics(instance);
    }
    new_solution.compute_cost(instance);
    new_solution.unplanned_requests = best.unplanned_requests.intersection(&random.unplanned_requests).copied().collect();
    new_solution
}

fn crossover_points(best: &Solution, rng: &mut impl Rng) -> (usize, usize) {
    let max_crossover = (best.max_plan_length() as isize - 1).max(1) as usize;
    let first = rng.gen_range(0..max_crossover.saturating_sub(1).max(1));
    let second = rng.gen_range(first..max_crossover);
    (first, second)
}

fn two_point(instance: &Instance, best: &Solution, random: &Solution, rng: &mut impl Rng) -> Solution {
    let (first, second) = crossover_points(best, rng);
    let mut emplaced = RequestSet::new();

    let mut center_parts: Vec<Vec<_>> = vec![Vec::new(); best.plans.len()];
    for (pi, p) in best.plans.iter().enumerate() {
        for (ai, &a) in p.actions.iter().enumerate() {
            if ai >= first && ai < second {
                emplaced.insert(instance.action(a).request.unwrap());
            }
        }
        for &a in &p.actions {
            if emplaced.contains(&instance.action(a).request.unwrap()) {
                center_parts[pi].push(a);
            }
        }
    }

    let mut left_requests = RequestSet::new();
    let mut left_parts: Vec<Vec<_>> = vec![Vec::new(); best.plans.len()];
    for (pi, p) in random.plans.iter().enumerate() {
        for (ai, &a) in p.actions.iter().enumerate() {
            let request_id = instance.action(a).request.unwrap();
            if ai >= second && !emplaced.contains(&request_id) {
                left_requests.insert(request_id);
                emplaced.insert(request_id);
            }
        }
        for &a in &p.actions {
            if left_requests.contains(&instance.action(a).request.unwrap()) {
                left_parts[pi].push(a);
            }
        }
    }

    let mut right_parts: Vec<Vec<_>> = vec![Vec::new(); best.plans.len()];
    for (pi, p) in random.plans.iter().enumerate() {
        for &a in &p.actions {
            if !emplaced.contains(&instance.action(a).request.unwrap()) {
                right_parts[pi].push(a);
            }
        }
    }

    let mut new_solution = Solution::empty(instance.num_plans_to_create);
    for (pi, plan) in new_solution.plans.iter_mut().enumerate() {
        for &a in &left_parts[pi] {
            plan.append(a);
        }
        for &a in &center_parts[pi] {
            plan.append(a);
        }
        for &a in &right_parts[pi] {
            plan.append(a);
        }
        plan.compute_metrics(instance);
    }

    new_solution.compute_cost(instance);
    new_solution.unplanned_requests = best.unplanned_requests.intersection(&random.unplanned_requests).copied().collect();
    new_solution
}

fn linear(instance: &Instance, best: &Solution, random: &Solution, rng: &mut impl Rng) -> Solution {
    let (first, second) = crossover_points(best, rng);
    let mut emplaced = RequestSet::new();

    for p in &best.plans {
        for (ai, &a) in p.actions.iter().enumerate() {
            if ai >= first && ai < second {
                emplaced.insert(instance.action(a).request.unwrap());
            }
        }
    }

    let mut center_parts: Vec<Vec<_>> = vec![Vec::new(); best.plans.len()];
    for (pi, p) in best.plans.iter().enumerate() {
        for &a in &p.actions {
            if emplaced.contains(&instance.action(a).request.unwrap()) {
                center_parts[pi].push(a);
            }
        }
    }

    let mut random_parts: Vec<Vec<_>> = vec![Vec::new(); best.plans.len()];
    for (pi, p) in random.plans.iter().enumerate() {
        for &a in &p.actions {
            if !emplaced.contains(&instance.action(a).request.unwrap()) {
                random_parts[pi].push(a);
            }
        }
    }

    let mut new_solution = Solution::empty(instance.num_plans_to_create);
    for (pi, plan) in new_solution.plans.iter_mut().enumerate() {
        for (ai, &rnd_action) in random_parts[pi].iter().enumerate() {
            let request_id = instance.action(rnd_action).request.unwrap();
            if ai < first {
                plan.append(rnd_action);
                emplaced.insert(request_id);
            } else if emplaced.contains(&request_id) {
                plan.append(rnd_action);
            }
        }
        for &a in &center_parts[pi] {
            plan.append(a);
        }
        for &rnd_action in &random_parts[pi] {
            if !emplaced.contains(&instance.action(rnd_action).request.unwrap()) {
                plan.append(rnd_action);
            }
        }
        plan.compute_metrics(instance);
    }

    new_solution.compute_cost(instance);
    new_solution.unplanned_requests = best.unplanned_requests.intersection(&random.unplanned_requests).copied().collect();
    new_solution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::insertion::{find_best_insert_in_solution, insert_into_plan};
    use crate::domain::instance::RawInstance;
    use crate::domain::types::RequestId;
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

    fn full_solution(instance: &Instance, seed: u64) -> Solution {
        let mut solution = Solution::empty(instance.num_plans_to_create);
        solution.unplanned_requests = (0..instance.requests.len()).map(RequestId).collect();
        let mut pending: Vec<_> = solution.unplanned_requests.iter().copied().collect();
        pending.sort();
        let _ = seed;
        for request_id in pending {
            let position = find_best_insert_in_solution(instance, &mut solution, request_id);
            insert_into_plan(instance, &mut solution.plans[position.plan_index], request_id, position.position);
            solution.unplanned_requests.remove(&request_id);
        }
        solution.compute_cost(instance);
        solution
    }

    #[test]
    fn one_point_child_has_no_extra_requests() {
        let instance = two_request_instance();
        let best = full_solution(&instance, 1);
        let random = full_solution(&instance, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let child = CrossoverOperator::OnePoint.apply(&instance, &best, &random, &mut rng);
        child.sanity_check(&instance);
    }

    #[test]
    fn two_point_child_satisfies_partition_invariant() {
        let instance = two_request_instance();
        let best = full_solution(&instance, 1);
        let random = full_solution(&instance, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let child = CrossoverOperator::TwoPoint.apply(&instance, &best, &random, &mut rng);
        child.sanity_check(&instance);
    }
}
