//! A full solution: one `Plan` per courier plus the pool of requests that
//! haven't been placed anywhere.

use std::collections::HashSet;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::instance::Instance;
use crate::domain::plan::Plan;
use crate::domain::types::{ActionType, RequestId};

pub type RequestSet = HashSet<RequestId>;

#[derive(Debug, Clone)]
pub struct Solution {
    pub plans: Vec<Plan>,
    pub unplanned_requests: RequestSet,
    pub cost: i64,
    feasible: bool,
}

impl Solution {
    pub fn empty(num_plans: usize) -> Solution {
        let plans = (0..num_plans).map(Plan::empty).collect();
        Solution {
            plans,
            unplanned_requests: RequestSet::new(),
            cost: 0,
            feasible: true,
        }
    }

    /// An empty solution with `plans` substituted in, the idiom every
    /// insertion operator uses to start from a copy of its input's routes.
    pub fn with_plans(plans: Vec<Plan>) -> Solution {
        Solution {
            plans,
            unplanned_requests: RequestSet::new(),
            cost: 0,
            feasible: true,
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.feasible
    }

    /// Picks a random non-empty plan, or `None` if every plan is empty.
    pub fn random_non_empty_plan(&self, rng: &mut impl Rng) -> Option<usize> {
        let mut indexes: Vec<usize> = (0..self.plans.len()).collect();
        indexes.shuffle(rng);
        indexes.into_iter().find(|&i| self.plans[i].length() > 0)
    }

    pub fn random_plan(&self, rng: &mut impl Rng) -> usize {
        assert!(!self.plans.is_empty(), "no plans to choose from");
        rng.gen_range(0..self.plans.len())
    }

    pub fn copy_plans(&self) -> Vec<Plan> {
        self.plans.clone()
    }

    pub fn compute_cost(&mut self, instance: &Instance) {
        let mut cost = 0;
        let mut feasible = true;
        for plan in &mut self.plans {
            plan.compute_metrics(instance);
            if !plan.metrics().feasible {
                feasible = false;
            }
            cost += plan.metrics().cost();
        }
        self.cost = cost;
        self.feasible = feasible;
    }

    pub fn max_plan_length(&self) -> usize {
        self.plans.iter().map(Plan::length).max().unwrap_or(0)
    }

    /// `∪plans.requests ∪ unplanned == all_requests`, pairwise disjoint;
    /// every non-partial request's pickup precedes its drop; every partial
    /// request's drop sits in its bound courier's plan.
    pub fn sanity_check(&self, instance: &Instance) {
        let mut all_requests: RequestSet = (0..instance.requests.len()).map(RequestId).collect();

        for plan in &self.plans {
            let mut pickups = RequestSet::new();
            let mut dropoffs = RequestSet::new();
            for &action_id in &plan.actions {
                let action = instance.action(action_id);
                let request_id = action.request.expect("plan action without a request");
                let request = instance.request(request_id);
                match action.kind {
                    ActionType::Pickup => {
                        assert!(!pickups.contains(&request_id), "pickup is twice in plan");
                        assert!(!dropoffs.contains(&request_id), "drop is before pickup");
                        pickups.insert(request_id);
                    }
                    ActionType::Drop => {
                        assert!(!dropoffs.contains(&request_id), "drop is twice in plan");
                        if request.is_partial {
                            assert!(!pickups.contains(&request_id), "partial request has a pickup");
                        } else {
                            assert!(pickups.contains(&request_id), "drop is missing a pickup");
                        }
                        dropoffs.insert(request_id);
                        all_requests.remove(&request_id);
                    }
                    ActionType::Start | ActionType::End => {
                        unreachable!("start/end actions are virtual and never stored in a plan")
                    }
                }
            }
        }

        let union: RequestSet = self.unplanned_requests.union(&all_requests).copied().collect();
        assert_eq!(union.len(), all_requests.len(), "not all requests planned?");
        assert_eq!(union.len(), self.unplanned_requests.len(), "not all requests planned?");
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Solution:")?;
        for plan in &self.plans {
            writeln!(f, "  Courier {}: {} actions", plan.courier, plan.length())?;
        }
        writeln!(f, "Unplanned requests: {}", self.unplanned_requests.len())?;
        writeln!(f, "Cost: {}", self.cost)
    }
}

/// The node sequence `[start, ...actions, end]` per courier, handed back to
/// the host. `etas`/`etds` are reserved for future use and always empty.
#[derive(Debug, Clone)]
pub struct SolutionView {
    pub plans: Vec<Vec<usize>>,
    pub etas: Vec<Vec<f64>>,
    pub etds: Vec<Vec<f64>>,
}

impl Solution {
    pub fn to_view(&self, instance: &Instance) -> SolutionView {
        let plans = self
            .plans
            .iter()
            .enumerate()
            .map(|(i, plan)| {
                let mut nodes = Vec::with_capacity(plan.length() + 2);
                nodes.push(instance.starts[i]);
                nodes.extend(plan.actions.iter().map(|a| instance.action(*a).node));
                nodes.push(instance.ends[i]);
                nodes
            })
            .collect();
        SolutionView {
            plans,
            etas: Vec::new(),
            etds: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instance::RawInstance;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn toy_instance() -> Instance {
        let dist = vec![vec![0.0; 4]; 4];
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
    fn empty_solution_is_feasible_with_no_cost() {
        let solution = Solution::empty(2);
        assert_eq!(solution.plans.len(), 2);
        assert!(solution.is_feasible());
        assert_eq!(solution.cost, 0);
    }

    #[test]
    fn sanity_check_passes_for_fully_unplanned_solution() {
        let instance = toy_instance();
        let mut solution = Solution::empty(1);
        solution.unplanned_requests.insert(RequestId(0));
        solution.sanity_check(&instance);
    }

    #[test]
    fn sanity_check_passes_once_request_is_planned() {
        use crate::domain::types::ActionId;
        let instance = toy_instance();
        let mut solution = Solution::empty(1);
        solution.plans[0].append(ActionId(1));
        solution.plans[0].append(ActionId(2));
        solution.sanity_check(&instance);
    }

    #[test]
    fn random_plan_uses_supplied_rng() {
        let solution = Solution::empty(3);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let idx = solution.random_plan(&mut rng);
        assert!(idx < 3);
    }
}
