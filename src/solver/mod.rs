//! The HALNS main loop: adaptive destroy/repair with simulated-annealing
//! acceptance, local search near the best, and crossover to escape.

pub mod operators;
pub mod roulette;

use rand::Rng;
use tracing::{debug, info, instrument};

use crate::config::SolverConfig;
use crate::domain::instance::Instance;
use crate::domain::solution::Solution;
use crate::domain::types::RequestId;
use operators::insertion::InsertionOperator;
use roulette::{CrossoverRoulette, InsertionRoulette, LocalSearchRoulette, RemovalRoulette};

/// Builds the starting solution by inserting every request with the
/// inter-route insertion heuristic. Grounded on the original's
/// `InsertionHeuristicsSolution`, which is also the initializer of every
/// main-loop iteration's fresh "random" parent for crossover.
pub fn insertion_heuristics_solution(instance: &Instance, rng: &mut impl Rng) -> Solution {
    let mut init = Solution::empty(instance.num_plans_to_create);
    init.unplanned_requests = (0..instance.requests.len()).map(RequestId).collect();
    InsertionOperator::InterRoute.apply(instance, &init, rng)
}

pub struct Solver<'a> {
    instance: &'a Instance,
    config: SolverConfig,
    rng: rand_chacha::ChaCha8Rng,
}

impl<'a> Solver<'a> {
    pub fn new(instance: &'a Instance, config: SolverConfig, seed: Option<u64>) -> Self {
        use rand::SeedableRng;
        let rng = match seed {
            Some(seed) => rand_chacha::ChaCha8Rng::seed_from_u64(seed),
            None => rand_chacha::ChaCha8Rng::from_entropy(),
        };
        Solver { instance, config, rng }
    }

    #[instrument(skip(self))]
    pub fn solve(&mut self) -> Solution {
        let mut removal_roulette = RemovalRoulette::new(&self.config);
        let mut insertion_roulette = InsertionRoulette::new(&self.config);
        let local_search_roulette = LocalSearchRoulette::new();
        let crossover_roulette = CrossoverRoulette::new();

        let mut current = insertion_heuristics_solution(self.instance, &mut self.rng);
        let mut best = current.clone();
        info!(cost = current.cost, "insertion heuristics solution built");

        let mut found_best = false;
        let mut temperature = self.config.max_temperature;
        let mut temperature_best = 0.0;
        let start = std::time::Instant::now();

        for i in 0..self.config.max_iterations {
            let remove_count = if found_best { 1 } else { 2 };

            let removed = removal_roulette.perform_removal(self.instance, &self.config, &current, remove_count, &mut self.rng);
            let inserted = insertion_roulette.perform_insertion(self.instance, &removed, &mut self.rng);

            let (found_feasible, found_current);
            found_best = false;

            if inserted.cost < current.cost || self.is_accepted(&inserted, &current, temperature) {
                current = inserted.clone();
                // Preserves the original's always-false comparison: the
                // check runs after `current` has already been overwritten.
                found_current = inserted.cost < current.cost;
                found_feasible = !found_current;
            } else {
                found_current = false;
                found_feasible = false;
                if inserted.cost > current.cost {
                    let random_parent = insertion_heuristics_solution(self.instance, &mut self.rng);
                    current = crossover_roulette.perform_crossover(self.instance, &best, &random_parent, &mut self.rng);
                }
            }

            if inserted.cost < best.cost {
                best = inserted.clone();
                found_best = true;
                temperature_best = temperature;
            } else if (inserted.cost as f64) < (best.cost as f64) * 1.02 {
                let ls_solution = local_search_roulette.perform_local_search(self.instance, &inserted, &mut self.rng);
                if ls_solution.cost < best.cost {
                    best = ls_solution;
                    found_best = true;
                    temperature_best = temperature;
                }
            }

            if self.instance.time_limit > 0 && start.elapsed().as_secs() as i64 > self.instance.time_limit {
                break;
            }

            temperature *= self.config.cooling_rate;
            if temperature < 0.01 {
                temperature_best *= 2.0;
                temperature = self.config.max_temperature.min(temperature_best);
            }

            removal_roulette.update_scores(&self.config, found_current, found_best, found_feasible);
            insertion_roulette.update_scores(&self.config, found_current, found_best, found_feasible);

            if i % self.config.n_seq == 0 && i != 0 {
                debug!(iteration = i, best_cost = best.cost, "rescoring operator wheels");
                removal_roulette.update_probabilities(&self.config);
                insertion_roulette.update_probabilities(&self.config);
            }
        }

        info!(cost = best.cost, "search finished");
        best
    }

    /// `new ≠ current` in the original guards against self-acceptance; there
    /// is no pointer-identity analogue worth chasing here because `current`
    /// is reassigned to `inserted` in the same branch that would otherwise
    /// trigger this check, so the guard never actually fires in practice and
    /// is omitted.
    fn is_accepted(&mut self, new: &Solution, current: &Solution, temperature: f64) -> bool {
        let roll: f64 = self.rng.gen_range(0.0..1.0);
        roll < (-((new.cost - current.cost) as f64) / temperature).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instance::RawInstance;

    fn toy_instance() -> Instance {
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

    fn tiny_config() -> SolverConfig {
        SolverConfig {
            max_iterations: 50,
            ..SolverConfig::default()
        }
    }

    #[test]
    fn solve_returns_a_feasible_fully_planned_solution() {
        let instance = toy_instance();
        let mut solver = Solver::new(&instance, tiny_config(), Some(1));
        let best = solver.solve();
        assert!(best.unplanned_requests.is_empty());
        best.sanity_check(&instance);
    }

    #[test]
    fn deterministic_reseed_reproduces_the_same_solution() {
        let instance = toy_instance();
        let mut solver_a = Solver::new(&instance, tiny_config(), Some(99));
        let mut solver_b = Solver::new(&instance, tiny_config(), Some(99));
        let best_a = solver_a.solve();
        let best_b = solver_b.solve();
        assert_eq!(best_a.cost, best_b.cost);
        assert_eq!(best_a.to_view(&instance).plans, best_b.to_view(&instance).plans);
    }
}
