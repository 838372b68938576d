//! Atomic stops (`Action`), delivery requests, and the per-node time-window
//! penalty model (`TimeWindowList`).

/// Sentinel standing in for "unbounded" in a time window's `to_time`, and
/// for "no hard deadline" in `TimeWindowList::has_to_arrive_by`.
pub const MAX_TIMESTAMP: i64 = i32::MAX as i64;

/// Stable handle into `Instance::actions`. Actions never move once the
/// instance is built, so this doubles as a node index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub usize);

/// Stable handle into `Instance::requests`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Pickup,
    Drop,
    Start,
    End,
}

/// One courier's depot-departure or a node visited to pick up or drop off
/// a request. `request` is `None` for `Start`/`End` actions.
#[derive(Debug, Clone)]
pub struct Action {
    pub node: usize,
    pub kind: ActionType,
    pub service_time: i64,
    /// Demand delta applied when this action is visited: +d for a pickup,
    /// -d for a drop, -start_utilization for a start, 0 for an end.
    pub demand: i64,
    pub time_windows: TimeWindowList,
    pub request: Option<RequestId>,
}

/// A delivery: either a full `(pickup, drop)` pair assignable to any
/// courier, or a partial `(drop only, courier)` whose pickup already
/// happened before planning began.
#[derive(Debug, Clone)]
pub struct Request {
    pub is_partial: bool,
    pub pickup: Option<ActionId>,
    pub drop: ActionId,
    pub courier: usize,
}

/// One `(from, to, is_hard, weight)` window. Windows are kept sorted by
/// `to` inside `TimeWindowList`.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    pub from_time: i64,
    pub to_time: i64,
    pub is_hard: bool,
    pub weight: i64,
}

/// Derived penalty model for a single node: a piecewise-linear soft cost
/// plus an optional hard deadline.
#[derive(Debug, Clone)]
pub struct TimeWindowList {
    windows: Vec<TimeWindow>,
    max_from_time: i64,
    min_to_time: i64,
    has_to_arrive_by: i64,
    /// Step function `(breakpoint, cumulative_weight)`, ascending by
    /// breakpoint, always starting at `(0, 0)` and ending at
    /// `(MAX_TIMESTAMP, total_weight)`.
    weights: Vec<(i64, i64)>,
}

impl Default for TimeWindowList {
    fn default() -> Self {
        Self {
            windows: Vec::new(),
            max_from_time: 0,
            min_to_time: MAX_TIMESTAMP,
            has_to_arrive_by: MAX_TIMESTAMP,
            weights: Vec::new(),
        }
    }
}

impl TimeWindowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tw: TimeWindow) {
        self.windows.push(tw);
        self.windows.sort_by_key(|w| w.to_time);

        if tw.from_time > self.max_from_time {
            self.max_from_time = tw.from_time;
        }
        if tw.to_time < self.min_to_time {
            self.min_to_time = tw.to_time;
        }
        if tw.is_hard && self.has_to_arrive_by > tw.to_time {
            self.has_to_arrive_by = tw.to_time;
        }

        self.weights.clear();
        let mut weight = 0i64;
        self.weights.push((0, weight));
        for w in &self.windows {
            if w.to_time < MAX_TIMESTAMP {
                weight += w.weight;
                self.weights.push((w.to_time, weight));
            }
        }
        self.weights.push((MAX_TIMESTAMP, weight));
    }

    pub fn max_from_time(&self) -> i64 {
        self.max_from_time
    }

    pub fn min_to_time(&self) -> i64 {
        self.min_to_time
    }

    pub fn has_to_arrive_by(&self) -> i64 {
        self.has_to_arrive_by
    }

    pub fn is_arrival_feasible(&self, eta: i64) -> bool {
        eta <= self.has_to_arrive_by
    }

    /// Penalty for arriving at `eta`, extrapolated linearly from the last
    /// crossed breakpoint using the slope accumulated so far (not an
    /// integral over every prior step).
    pub fn penalty_for_arrival_at(&self, eta: i64) -> i64 {
        for idx in 0..self.weights.len() {
            let (breakpoint, _) = self.weights[idx];
            if eta < breakpoint {
                let (prev_breakpoint, prev_weight) = self.weights[idx - 1];
                return (eta - prev_breakpoint) * prev_weight;
            }
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_penalty() {
        let mut twl = TimeWindowList::new();
        twl.add(TimeWindow {
            from_time: 0,
            to_time: 100,
            is_hard: false,
            weight: 2,
        });
        assert_eq!(twl.penalty_for_arrival_at(150), 100);
        assert_eq!(twl.penalty_for_arrival_at(80), 0);
        assert!(twl.is_arrival_feasible(1_000_000));
    }

    #[test]
    fn hard_window_feasibility() {
        let mut twl = TimeWindowList::new();
        twl.add(TimeWindow {
            from_time: 0,
            to_time: 100,
            is_hard: true,
            weight: 5,
        });
        assert!(twl.is_arrival_feasible(100));
        assert!(!twl.is_arrival_feasible(101));
    }

    #[test]
    fn multiple_windows_accumulate_slope() {
        let mut twl = TimeWindowList::new();
        twl.add(TimeWindow {
            from_time: 0,
            to_time: 50,
            is_hard: false,
            weight: 1,
        });
        twl.add(TimeWindow {
            from_time: 0,
            to_time: 100,
            is_hard: false,
            weight: 2,
        });
        // Crossing the first breakpoint at 50 accrues weight 1; past it the
        // slope from [50,100) is 1 (cumulative), then 3 beyond 100.
        assert_eq!(twl.penalty_for_arrival_at(50), 0);
        assert_eq!(twl.penalty_for_arrival_at(75), 25);
        assert_eq!(twl.penalty_for_arrival_at(150), 150);
    }
}
