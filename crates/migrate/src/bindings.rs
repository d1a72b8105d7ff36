//! From a matched call site to a route query in the destination library.

use crate::ast::Expr;
use crate::error::MigrateError;
use libswap_core::{Library, Param, Properties, RoleId, StateId, TransitionId, TransitionKind};
use libswap_route::RouteQuery;
use std::collections::BTreeMap;

/// Values a call site provides, keyed by what they mean rather than
/// by argument position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteBindings {
    /// Expression bound to each role path, with the source state it is in.
    pub roles: BTreeMap<String, (Expr, StateId)>,
    /// Action arguments by property name.
    pub values: BTreeMap<String, Expr>,
}

/// The transition whose parameters a site supplies: the wrapped one for
/// a Linked transition.
pub(crate) fn base_transition(library: &Library, id: TransitionId) -> TransitionId {
    match library.transition(id).kind {
        TransitionKind::Linked { wrapped } => wrapped,
        _ => id,
    }
}

/// Bind the receiver and arguments of `expr` to the roles and properties
/// of `transition` in `from`.
pub fn extract(from: &Library, transition: TransitionId, expr: &Expr) -> SiteBindings {
    let base = from.transition(base_transition(from, transition));
    let mut out = SiteBindings::default();

    if let (
        TransitionKind::Call {
            is_static: false, ..
        },
        Expr::Call {
            receiver: Some(receiver),
            ..
        },
    ) = (&base.kind, expr)
    {
        let role = from.role_path(from.state(base.src).role);
        out.roles.insert(role, ((**receiver).clone(), base.src));
    }

    for (param, arg) in base.params().iter().zip(expr.args()) {
        match param {
            Param::Entity { state, .. } => {
                let role = from.role_path(from.state(*state).role);
                out.roles.insert(role, (arg.clone(), *state));
            }
            Param::Action { property, .. } => {
                out.values.insert(property.clone(), arg.clone());
            }
            Param::Property { .. } | Param::Const { .. } => {}
        }
    }
    out
}

/// What to search for in the destination library.
#[derive(Debug, Clone)]
pub struct Plan {
    pub query: RouteQuery,
    /// Destination role the usage's value belongs to.
    pub goal_role: RoleId,
}

/// Build the destination query for `transition` of `from`.
///
/// Bound roles start at the counterpart of their source state (or
/// `Constructed` when the destination has no such state); every other
/// destination role starts at `Init`. `source_props` holds properties
/// recorded per role path by earlier usages in the same scope.
pub fn plan(
    from: &Library,
    to: &Library,
    transition: TransitionId,
    bindings: &SiteBindings,
    source_props: &BTreeMap<String, Properties>,
) -> Result<Plan, MigrateError> {
    let t = from.transition(transition);
    let goal = to
        .counterpart(from, t.dst)
        .ok_or_else(|| MigrateError::NoCounterpart {
            library: to.name().to_string(),
            state: from.state_label(t.dst),
        })?;

    let mut start = Vec::new();
    for role in to.roles() {
        let path = to.role_path(role.id);
        let state = match bindings.roles.get(&path) {
            Some((_, source_state)) => to
                .counterpart(from, *source_state)
                .unwrap_or(role.constructed),
            None => role.init,
        };
        start.push(state);
    }

    let mut query = RouteQuery::new(start).goal(goal);
    for action in &t.actions {
        query = query.require(&from.action(*action).name);
    }
    for (path, props) in source_props {
        if let Some(role) = to.role_by_path(path) {
            query = query.with_props(role, props.clone());
        }
    }
    Ok(Plan {
        query,
        goal_role: to.state(goal).role,
    })
}
