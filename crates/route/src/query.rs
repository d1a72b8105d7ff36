//! What to search for, and how hard.

use libswap_core::{Properties, RoleId, StateId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound on the work one search may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// Configurations popped from the open set before giving up.
    pub max_expansions: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_expansions: 100_000,
        }
    }
}

/// A route request against one library.
#[derive(Debug, Clone, Default)]
pub struct RouteQuery {
    /// Live role instances at the start. Also the initial search frontier.
    pub start: Vec<StateId>,
    /// Properties already accumulated per role.
    pub props: BTreeMap<RoleId, Properties>,
    /// Actions the route must perform, by name; repeated names count.
    pub required: Vec<String>,
    pub goal: Option<StateId>,
}

impl RouteQuery {
    pub fn new(start: Vec<StateId>) -> Self {
        RouteQuery {
            start,
            ..Default::default()
        }
    }

    pub fn goal(mut self, goal: StateId) -> Self {
        self.goal = Some(goal);
        self
    }

    pub fn require(mut self, action: &str) -> Self {
        self.required.push(action.to_string());
        self
    }

    pub fn with_props(mut self, role: RoleId, props: Properties) -> Self {
        self.props.insert(role, props);
        self
    }
}
