use libswap_core::{Library, TransitionId};
use serde::Serialize;

/// An ordered transition sequence realizing a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub steps: Vec<TransitionId>,
    /// Configurations popped before the route was found.
    pub explored: usize,
}

impl Route {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Step labels, for logs and the `route` command.
    pub fn describe(&self, library: &Library) -> Vec<String> {
        self.steps.iter().map(|t| library.label(*t)).collect()
    }

    /// Method names of Call steps (through Linked wrappers), in order.
    pub fn methods<'l>(&self, library: &'l Library) -> Vec<&'l str> {
        self.steps
            .iter()
            .filter_map(|id| {
                let t = library.transition(*id);
                match &t.kind {
                    libswap_core::TransitionKind::Linked { wrapped } => {
                        library.transition(*wrapped).method()
                    }
                    _ => t.method(),
                }
            })
            .collect()
    }
}
