pub mod crossover;
pub mod insertion;
pub mod local_search;
pub mod removal;
