//! Adaptive roulette wheels for removal/insertion, plus the uniform wheels
//! used by local search and crossover.

use rand::Rng;

use crate::config::SolverConfig;
use crate::domain::instance::Instance;
use crate::domain::solution::Solution;
use crate::solver::operators::crossover::CrossoverOperator;
use crate::solver::operators::insertion::InsertionOperator;
use crate::solver::operators::local_search::LocalSearchOperator;
use crate::solver::operators::removal::RemovalOperator;

/// Shared score/probability bookkeeping for the removal and insertion
/// wheels. Selection uses cumulative, NOT normalized, probabilities — the
/// operator constants don't sum to 1.
pub struct AdaptiveRoulette<Op> {
    operators: Vec<Op>,
    probabilities: Vec<f64>,
    scores: Vec<f64>,
    used_counts: Vec<usize>,
    used: Vec<usize>,
}

impl<Op: Copy> AdaptiveRoulette<Op> {
    fn new(operators: Vec<Op>, initial_probability: f64) -> Self {
        let n = operators.len();
        AdaptiveRoulette {
            operators,
            probabilities: vec![initial_probability; n],
            scores: vec![0.0; n],
            used_counts: vec![0; n],
            used: Vec::new(),
        }
    }

    fn select(&self, rng: &mut impl Rng) -> (usize, Op) {
        let max_prob: f64 = self.probabilities.iter().sum();
        let outcome = rng.gen_range(0.0..max_prob);
        let mut cumulative = 0.0;
        for (i, &p) in self.probabilities.iter().enumerate() {
            cumulative += p;
            if outcome <= cumulative {
                return (i, self.operators[i]);
            }
        }
        let last = self.operators.len() - 1;
        (last, self.operators[last])
    }

    fn mark_used(&mut self, index: usize) {
        self.used_counts[index] += 1;
        self.used.push(index);
    }

    pub fn update_scores(&mut self, config: &SolverConfig, found_current: bool, found_best: bool, found_feasible: bool) {
        let mut score_increase = 0.0;
        if found_current {
            score_increase += config.pi3_accepted_current;
        }
        if found_best {
            score_increase += config.pi1_new_best;
        }
        if found_feasible {
            score_increase += config.pi2_feasible;
        }
        for &index in &self.used {
            self.scores[index] += score_increase;
        }
        self.used.clear();
    }

    pub fn update_probabilities(&mut self, config: &SolverConfig) {
        for i in 0..self.operators.len() {
            if self.used_counts[i] > 0 {
                let rho = config.roulette_wheel_parameter;
                self.probabilities[i] =
                    self.probabilities[i] * (1.0 - rho) + rho * self.scores[i] / self.used_counts[i] as f64;
                self.used_counts[i] = 0;
                self.scores[i] = 0.0;
            }
        }
    }
}

pub struct RemovalRoulette(AdaptiveRoulette<RemovalOperator>);

impl RemovalRoulette {
    pub fn new(config: &SolverConfig) -> Self {
        RemovalRoulette(AdaptiveRoulette::new(
            RemovalOperator::ALL.to_vec(),
            config.removal_operator_initial_probability,
        ))
    }

    /// Applies `apply_count` (1 or 2) removal operators in sequence to the
    /// same solution, each drawing its own `remove_count` independently.
    pub fn perform_removal(&mut self, instance: &Instance, config: &SolverConfig, solution: &Solution, apply_count: usize, rng: &mut impl Rng) -> Solution {
        let mut current = solution.clone();
        for _ in 0..apply_count {
            let (index, op) = self.0.select(rng);
            let min = instance.requests.len() as f64 * config.remove_min;
            let max = instance.requests.len() as f64 * config.remove_max;
            let remove_count = rng.gen_range(min..=max).round() as usize;
            current = op.apply(instance, &current, remove_count, rng);
            self.0.mark_used(index);
        }
        current
    }

    pub fn update_scores(&mut self, config: &SolverConfig, found_current: bool, found_best: bool, found_feasible: bool) {
        self.0.update_scores(config, found_current, found_best, found_feasible);
    }

    pub fn update_probabilities(&mut self, config: &SolverConfig) {
        self.0.update_probabilities(config);
    }
}

pub struct InsertionRoulette(AdaptiveRoulette<InsertionOperator>);

impl InsertionRoulette {
    pub fn new(config: &SolverConfig) -> Self {
        InsertionRoulette(AdaptiveRoulette::new(
            InsertionOperator::ALL.to_vec(),
            config.insertion_operator_initial_probability,
        ))
    }

    pub fn perform_insertion(&mut self, instance: &Instance, solution: &Solution, rng: &mut impl Rng) -> Solution {
        let (index, op) = self.0.select(rng);
        let result = op.apply(instance, solution, rng);
        self.0.mark_used(index);
        result
    }

    pub fn update_scores(&mut self, config: &SolverConfig, found_current: bool, found_best: bool, found_feasible: bool) {
        self.0.update_scores(config, found_current, found_best, found_feasible);
    }

    pub fn update_probabilities(&mut self, config: &SolverConfig) {
        self.0.update_probabilities(config);
    }
}

/// Local search and crossover wheels use uniform selection and don't track
/// scores at all.
pub struct LocalSearchRoulette {
    operators: Vec<LocalSearchOperator>,
}

impl LocalSearchRoulette {
    pub fn new() -> Self {
        LocalSearchRoulette {
            operators: LocalSearchOperator::ALL.to_vec(),
        }
    }

    /// Applies operators in random order, stopping at the first one that
    /// improves on `solution`'s cost.
    pub fn perform_local_search(&self, instance: &Instance, solution: &Solution, rng: &mut impl Rng) -> Solution {
        use rand::seq::SliceRandom;
        let mut order: Vec<usize> = (0..self.operators.len()).collect();
        order.shuffle(rng);

        let mut current = solution.clone();
        for index in order {
            current = self.operators[index].apply(instance, &current, rng);
            if current.cost < solution.cost {
                break;
            }
        }
        current
    }
}

impl Default for LocalSearchRoulette {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CrossoverRoulette {
    operators: Vec<CrossoverOperator>,
}

impl CrossoverRoulette {
    pub fn new() -> Self {
        CrossoverRoulette {
            operators: CrossoverOperator::ALL.to_vec(),
        }
    }

    pub fn perform_crossover(&self, instance: &Instance, best: &Solution, random: &Solution, rng: &mut impl Rng) -> Solution {
        let index = rng.gen_range(0..self.operators.len());
        self.operators[index].apply(instance, best, random, rng)
    }
}

impl Default for CrossoverRoulette {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn update_probabilities_moves_toward_mean_score() {
        let config = SolverConfig::default();
        let mut roulette: AdaptiveRoulette<RemovalOperator> =
            AdaptiveRoulette::new(RemovalOperator::ALL.to_vec(), config.removal_operator_initial_probability);
        roulette.used_counts[0] = 4;
        roulette.scores[0] = 40.0;
        let before = roulette.probabilities[0];
        roulette.update_probabilities(&config);
        let expected = before * (1.0 - config.roulette_wheel_parameter) + config.roulette_wheel_parameter * (40.0 / 4.0);
        assert!((roulette.probabilities[0] - expected).abs() < 1e-9);
        assert_eq!(roulette.used_counts[0], 0);
    }

    #[test]
    fn select_is_deterministic_given_a_seed() {
        let config = SolverConfig::default();
        let roulette: AdaptiveRoulette<RemovalOperator> =
            AdaptiveRoulette::new(RemovalOperator::ALL.to_vec(), config.removal_operator_initial_probability);
        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(roulette.select(&mut rng_a).0, roulette.select(&mut rng_b).0);
    }
}
