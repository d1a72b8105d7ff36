use serde::Serialize;
use std::fmt;

/// Why a search ended without a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchFailure {
    /// Every reachable configuration was explored.
    Exhausted,
    /// The expansion budget ran out first.
    BudgetExhausted,
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchFailure::Exhausted => write!(f, "search space exhausted"),
            SearchFailure::BudgetExhausted => write!(f, "expansion budget exhausted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("route not found in library '{library}': {reason} after {explored} configurations")]
    RouteNotFound {
        library: String,
        reason: SearchFailure,
        explored: usize,
    },

    #[error("state {state} is not part of library '{library}'")]
    UnknownState { library: String, state: String },
}
