//! Search configuration parameters.

use std::time::Duration;

/// Search configuration parameters.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Number of plies below the root that the tree may grow.
    pub depth_limit: usize,

    /// Use alpha-beta pruning instead of the full minimax tree.
    pub use_pruning: bool,

    /// Search the subtrees below the root on the rayon thread pool.
    pub parallel: bool,

    /// Deepest depth at which a decided board ends a branch before the depth
    /// limit. `None` uses the board dimension.
    pub outcome_check_limit: Option<usize>,

    /// Once this much time has passed, unexpanded nodes are scored with the
    /// heuristic and the best move found so far is returned.
    pub time_limit: Option<Duration>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth_limit: 3,
            use_pruning: true,
            parallel: false,
            outcome_check_limit: None,
            time_limit: None,
        }
    }
}

impl SearchConfig {
    pub fn with_depth(mut self, depth_limit: usize) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    pub fn with_pruning(mut self, use_pruning: bool) -> Self {
        self.use_pruning = use_pruning;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_outcome_check_limit(mut self, limit: Option<usize>) -> Self {
        self.outcome_check_limit = limit;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}
