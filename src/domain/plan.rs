//! One courier's route: an ordered sequence of pickup/drop actions plus the
//! cached metrics and best-insertion-position map that make repeated
//! insertion probing cheap.

use std::collections::HashMap;

use crate::domain::instance::Instance;
use crate::domain::types::{ActionId, ActionType, RequestId};

/// A tentative, not-yet-materialized insertion: a request inserted at
/// `pick_idx`/`drop_idx` into the plan's *output* sequence (0 = before the
/// first stop). Fed to [`PlanIterator`] so metrics can be evaluated without
/// allocating a new plan.
#[derive(Debug, Clone, Copy)]
pub struct PlanInsertion {
    pub request: RequestId,
    pub pick_idx: usize,
    pub drop_idx: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PlanMetrics {
    pub etas: Vec<i64>,
    pub duration: i64,
    pub distance: i64,
    pub feasible: bool,
    pub penalty: i64,
}

impl PlanMetrics {
    pub fn cost(&self) -> i64 {
        self.penalty + self.distance / 2
    }
}

/// Returned by the early-terminating metrics evaluators: `finished` mirrors
/// the metrics contract of the underlying algorithm — a caller that ignores
/// this and reads `metrics` regardless would silently use a half-evaluated
/// route.
pub struct Evaluation {
    pub metrics: PlanMetrics,
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub actions: Vec<ActionId>,
    pub courier: usize,
    needs_recompute: bool,
    metrics: PlanMetrics,
    best_position: HashMap<RequestId, (usize, usize)>,
}

impl Plan {
    pub fn empty(courier: usize) -> Plan {
        Plan {
            actions: Vec::new(),
            courier,
            needs_recompute: false,
            metrics: PlanMetrics {
                feasible: true,
                ..Default::default()
            },
            best_position: HashMap::new(),
        }
    }

    pub fn length(&self) -> usize {
        self.actions.len()
    }

    pub fn last_eta(&self) -> i64 {
        self.metrics.etas.last().copied().unwrap_or(0)
    }

    pub fn cached_best_position(&self, request: RequestId) -> Option<(usize, usize)> {
        if self.needs_recompute {
            return None;
        }
        self.best_position.get(&request).copied()
    }

    pub fn cache_best_position(&mut self, request: RequestId, pick_idx: usize, drop_idx: usize) {
        self.best_position.insert(request, (pick_idx, drop_idx));
    }

    pub fn find_pickup(&self, instance: &Instance, request: RequestId) -> usize {
        self.actions
            .iter()
            .position(|&a| instance.action(a).request == Some(request) && instance.action(a).kind == ActionType::Pickup)
            .expect("pickup not found in plan")
    }

    pub fn find_drop(&self, instance: &Instance, request: RequestId) -> usize {
        self.actions
            .iter()
            .position(|&a| instance.action(a).request == Some(request) && instance.action(a).kind == ActionType::Drop)
            .expect("drop not found in plan")
    }

    pub fn append(&mut self, action: ActionId) {
        self.actions.push(action);
        self.needs_recompute = true;
    }

    /// Removes the request's actions. Invalidates metrics and the
    /// best-position cache; a caller must recompute before reading cost.
    pub fn remove(&mut self, instance: &Instance, request_id: RequestId, is_partial: bool) {
        if !is_partial {
            let index = self.find_pickup(instance, request_id);
            self.actions.remove(index);
        }
        let index = self.find_drop(instance, request_id);
        self.actions.remove(index);
        self.needs_recompute = true;
    }

    pub fn insert(&mut self, action: ActionId, position: usize) {
        if position >= self.actions.len() {
            self.actions.push(action);
        } else {
            self.actions.insert(position, action);
        }
        self.needs_recompute = true;
    }

    pub fn copy_without_requests(&self, instance: &Instance, requests: &std::collections::HashSet<RequestId>) -> Plan {
        let actions = self
            .actions
            .iter()
            .copied()
            .filter(|&a| {
                instance
                    .action(a)
                    .request
                    .map(|r| !requests.contains(&r))
                    .unwrap_or(true)
            })
            .collect();
        Plan {
            actions,
            courier: self.courier,
            needs_recompute: true,
            metrics: PlanMetrics::default(),
            best_position: HashMap::new(),
        }
    }

    pub fn cost(&mut self, instance: &Instance) -> i64 {
        self.compute_metrics(instance);
        self.metrics.cost()
    }

    pub fn metrics(&self) -> &PlanMetrics {
        &self.metrics
    }

    pub fn needs_recompute(&self) -> bool {
        self.needs_recompute
    }

    pub fn compute_metrics(&mut self, instance: &Instance) {
        if !self.needs_recompute {
            return;
        }
        let evaluation = self.evaluate(instance, None, 0, true, true);
        self.metrics = evaluation.metrics;
        self.needs_recompute = false;
        self.best_position.clear();
    }

    /// `insertion_cost` = cost delta of tentatively inserting `insertion`,
    /// bounded by `max_cost` (0 disables the bound). Returns `None` when the
    /// search was abandoned early because the delta already exceeds
    /// `max_cost` — the core performance primitive of best-insertion search.
    ///
    /// Recomputes the baseline first if it's stale, mirroring the original's
    /// lazy `GetCost` (`if needsRecompute { ComputeMetrics() }`); without
    /// this, a plan mutated by `remove`/`insert` and then queried here would
    /// have its delta computed against a stale baseline cost.
    pub fn insertion_cost(
        &mut self,
        instance: &Instance,
        insertion: PlanInsertion,
        max_cost: i64,
        with_capacity: bool,
    ) -> Option<(i64, bool)> {
        self.compute_metrics(instance);
        let evaluation = self.evaluate(instance, Some(insertion), max_cost, with_capacity, false);
        if !evaluation.finished {
            return None;
        }
        Some((evaluation.metrics.cost() - self.metrics.cost(), evaluation.metrics.feasible))
    }

    /// The three Go-original `getMetrics*` variants collapse into one
    /// function parameterized on whether capacity is tracked and whether
    /// etas are recorded (etas are only meaningful with no tentative
    /// insertion in play).
    fn evaluate(
        &self,
        instance: &Instance,
        insertion: Option<PlanInsertion>,
        max_cost: i64,
        with_capacity: bool,
        with_etas: bool,
    ) -> Evaluation {
        if self.actions.is_empty() && insertion.is_none() {
            return Evaluation {
                metrics: PlanMetrics {
                    feasible: true,
                    ..Default::default()
                },
                finished: true,
            };
        }

        let mut capacity = if with_capacity && instance.capacity_enabled {
            instance.courier_capacities[self.courier] - instance.start_utilizations[self.courier]
        } else {
            0
        };

        let mut iter = PlanIterator::new(self, instance, insertion);
        let mut metrics = PlanMetrics {
            feasible: true,
            ..Default::default()
        };

        let mut current = iter.next().expect("plan iterator yields at least Start/End");
        let start_eta = instance.action(current).time_windows.max_from_time();
        let mut eta = start_eta;

        loop {
            eta = eta.max(instance.action(current).time_windows.max_from_time());

            if with_etas
                && insertion.is_none()
                && !matches!(instance.action(current).kind, ActionType::Start | ActionType::End)
            {
                metrics.etas.push(eta);
            }

            let tw = &instance.action(current).time_windows;
            if eta > tw.min_to_time() {
                metrics.feasible = metrics.feasible && tw.is_arrival_feasible(eta);
                metrics.penalty += tw.penalty_for_arrival_at(eta);
            }

            if with_capacity && instance.capacity_enabled {
                capacity -= instance.action(current).demand;
                if capacity < 0 {
                    metrics.feasible = false;
                }
            }

            let next = match iter.next() {
                Some(next) => next,
                None => break,
            };
            metrics.distance += instance.distance_matrix[instance.action(current).node][instance.action(next).node];
            eta += instance.duration_matrix[instance.action(current).node][instance.action(next).node];
            current = next;

            if max_cost > 0 && (metrics.cost() - self.metrics.cost()) > max_cost {
                return Evaluation {
                    metrics: PlanMetrics::default(),
                    finished: false,
                };
            }
        }
        metrics.duration = eta - start_eta;

        Evaluation { metrics, finished: true }
    }
}

/// Virtualized traversal over a courier's start depot, its plan actions with
/// an optional tentative insertion spliced in, and the courier's end depot.
/// Never materializes a new action list.
pub struct PlanIterator<'a> {
    plan: &'a Plan,
    instance: &'a Instance,
    insertion: Option<PlanInsertion>,
    index: usize,
    plan_index: usize,
    length: usize,
}

impl<'a> PlanIterator<'a> {
    pub fn new(plan: &'a Plan, instance: &'a Instance, insertion: Option<PlanInsertion>) -> Self {
        let mut length = plan.length() + 2;
        if let Some(insertion) = insertion {
            length += if instance.request(insertion.request).is_partial { 1 } else { 2 };
        }
        PlanIterator {
            plan,
            instance,
            insertion,
            index: 0,
            plan_index: 0,
            length,
        }
    }
}

impl<'a> Iterator for PlanIterator<'a> {
    type Item = ActionId;

    fn next(&mut self) -> Option<ActionId> {
        if self.index >= self.length {
            return None;
        }
        let ret = if self.index == 0 {
            ActionId(self.instance.starts[self.plan.courier])
        } else if self.index == self.length - 1 {
            ActionId(self.instance.ends[self.plan.courier])
        } else if let Some(insertion) = self.insertion {
            let request = self.instance.request(insertion.request);
            if !request.is_partial && insertion.pick_idx == self.index - 1 {
                request.pickup.expect("non-partial request has a pickup")
            } else if insertion.drop_idx == self.index - 1 {
                request.drop
            } else {
                let action = self.plan.actions[self.plan_index];
                self.plan_index += 1;
                action
            }
        } else {
            let action = self.plan.actions[self.plan_index];
            self.plan_index += 1;
            action
        };
        self.index += 1;
        Some(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instance::RawInstance;

    fn toy_instance() -> Instance {
        // 0 = start, 1 = pickup, 2 = drop, 3 = end, straight line distances.
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
    fn empty_plan_has_zero_cost() {
        let instance = toy_instance();
        let mut plan = Plan::empty(0);
        assert_eq!(plan.cost(&instance), 0);
    }

    #[test]
    fn append_invalidates_cache() {
        let _instance = toy_instance();
        let mut plan = Plan::empty(0);
        plan.cache_best_position(RequestId(0), 0, 1);
        assert_eq!(plan.cached_best_position(RequestId(0)), Some((0, 1)));
        plan.append(ActionId(1));
        assert_eq!(plan.cached_best_position(RequestId(0)), None);
    }

    #[test]
    fn iterator_traverses_start_actions_end() {
        let instance = toy_instance();
        let mut plan = Plan::empty(0);
        plan.append(ActionId(1));
        plan.append(ActionId(2));
        let nodes: Vec<usize> = PlanIterator::new(&plan, &instance, None)
            .map(|a| instance.action(a).node)
            .collect();
        assert_eq!(nodes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn full_plan_cost_matches_round_trip_distance_over_two() {
        let instance = toy_instance();
        let mut plan = Plan::empty(0);
        plan.append(ActionId(1));
        plan.append(ActionId(2));
        // 0->1->2->3 = 1+1+1 = 3, cost = penalty(0) + distance/2 = 1 (int div).
        assert_eq!(plan.cost(&instance), 1);
    }
}
