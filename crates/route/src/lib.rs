//! libswap-route: find action-preserving transition sequences in a
//! library model.
//!
//! Given a [`Library`](libswap_core::Library), the live role instances, a
//! multiset of required actions and an optional goal state, [`RouteFinder`]
//! returns the shortest [`Route`] that performs exactly those actions,
//! splicing in whatever same-library prerequisites its transitions need.

pub mod error;
pub mod finder;
pub mod query;
pub mod route;

pub use error::{RouteError, SearchFailure};
pub use finder::RouteFinder;
pub use query::{RouteQuery, SearchLimits};
pub use route::Route;

/// Run one query with default limits.
pub fn find_route(
    library: &libswap_core::Library,
    query: &RouteQuery,
) -> Result<Route, RouteError> {
    RouteFinder::new(library).find(query)
}
