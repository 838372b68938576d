//! Tunable constants of the HALNS metaheuristic, grouped into a struct
//! instead of free constants so tests can shrink the iteration cap.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub max_iterations: usize,
    pub removal_operator_initial_probability: f64,
    pub insertion_operator_initial_probability: f64,
    pub roulette_wheel_parameter: f64,
    pub pi1_new_best: f64,
    pub pi2_feasible: f64,
    pub pi3_accepted_current: f64,
    pub max_temperature: f64,
    pub cooling_rate: f64,
    pub n_seq: usize,
    pub remove_min: f64,
    pub remove_max: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            removal_operator_initial_probability: 0.1,
            insertion_operator_initial_probability: 0.125,
            roulette_wheel_parameter: 0.7,
            pi1_new_best: 15.0,
            pi2_feasible: 5.0,
            pi3_accepted_current: 10.0,
            max_temperature: 25.0,
            cooling_rate: 0.99975,
            n_seq: 100,
            remove_min: 0.175,
            remove_max: 0.35,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_original_literals() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.max_iterations, 100_000);
        assert_eq!(cfg.n_seq, 100);
        assert!((cfg.cooling_rate - 0.99975).abs() < 1e-12);
    }
}
