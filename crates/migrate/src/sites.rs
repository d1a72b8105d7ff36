//! Locate usages of a library's modeled operations in a statement.
//!
//! A call `recv.m(a, b)` matches a Call transition named `m` with two
//! parameters; `new T(a)` matches a Construct of the role typed `T`.
//! Among several candidates, the receiver's declared type decides; a
//! receiver that names a type instead of a variable selects static calls.

use crate::ast::{simple_name, Expr, Slot};
use libswap_core::{Library, RoleId, TransitionId, TransitionKind};
use std::collections::BTreeMap;

/// Variables visible at a statement, with their declared types.
pub type Scope = BTreeMap<String, String>;

/// A matched usage inside one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    /// Path from the statement's root expression.
    pub path: Vec<Slot>,
    /// The source transition the usage performs.
    pub transition: TransitionId,
    /// Whether the value of the expression is used.
    pub consumed: bool,
}

/// Simple names of every type `role` can take.
fn role_types(library: &Library, role: RoleId) -> Vec<String> {
    let mut out = Vec::new();
    if let Ok(t) = library.resolve_type(role, None) {
        out.push(simple_name(&t).to_string());
    }
    for rule in library.type_rules().iter().filter(|r| r.role == role) {
        out.push(simple_name(&rule.type_name).to_string());
    }
    out
}

fn has_type(library: &Library, role: RoleId, type_name: &str) -> bool {
    let wanted = simple_name(type_name);
    role_types(library, role).iter().any(|t| t == wanted)
}

/// The transition of `library` that `expr` performs, if any.
pub fn match_expr(library: &Library, expr: &Expr, consumed: bool, scope: &Scope) -> Option<TransitionId> {
    let base = match expr {
        Expr::Call {
            receiver,
            method,
            args,
        } => match_call(library, receiver.as_deref(), method, args.len(), scope)?,
        Expr::New { type_name, args } => match_construct(library, type_name, args.len())?,
        Expr::Name { .. } | Expr::Literal { .. } => return None,
    };

    let chosen = match library.linked_wrapper(base) {
        Some(link) if consumed => link,
        _ => base,
    };
    let t = library.transition(chosen);
    if t.is_auto() || t.is_usage() || (t.is_self_loop() && t.actions.is_empty()) {
        return None;
    }
    Some(chosen)
}

fn match_call(
    library: &Library,
    receiver: Option<&Expr>,
    method: &str,
    arity: usize,
    scope: &Scope,
) -> Option<TransitionId> {
    let static_type = receiver
        .and_then(Expr::as_name)
        .filter(|n| !scope.contains_key(*n) && n.starts_with(|c: char| c.is_ascii_uppercase()));
    let declared = receiver
        .and_then(Expr::as_name)
        .and_then(|n| scope.get(n));

    let mut candidates = library.transitions().iter().filter(|t| match &t.kind {
        TransitionKind::Call {
            method: m, params, ..
        } => m == method && params.len() == arity,
        _ => false,
    });
    candidates
        .find(|t| {
            let role = library.state(t.src).role;
            let is_static = matches!(t.kind, TransitionKind::Call { is_static: true, .. });
            match (static_type, declared) {
                (Some(type_name), _) => is_static && has_type(library, role, type_name),
                (None, Some(type_name)) => !is_static && has_type(library, role, type_name),
                (None, None) => !is_static,
            }
        })
        .map(|t| t.id)
}

fn match_construct(library: &Library, type_name: &str, arity: usize) -> Option<TransitionId> {
    library
        .transitions()
        .iter()
        .find(|t| match &t.kind {
            TransitionKind::Construct { params, role } => {
                params.len() == arity && has_type(library, *role, type_name)
            }
            _ => false,
        })
        .map(|t| t.id)
}

/// Every usage in an expression tree rooted at a statement, innermost
/// first. `root_consumed` tells whether the statement uses the root value.
pub fn usages_in(library: &Library, root: &Expr, root_consumed: bool, scope: &Scope) -> Vec<Usage> {
    root.call_paths()
        .into_iter()
        .filter_map(|path| {
            let expr = root.at(&path)?;
            let consumed = !path.is_empty() || root_consumed;
            let transition = match_expr(library, expr, consumed, scope)?;
            Some(Usage {
                path,
                transition,
                consumed,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use libswap_core::catalog;

    fn scope(vars: &[(&str, &str)]) -> Scope {
        vars.iter()
            .map(|(n, t)| (n.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn static_factory_matches_type_name_receiver() {
        let lib = catalog::by_name("log4j").unwrap();
        let expr = Expr::Call {
            receiver: Some(Box::new(Expr::name("Logger"))),
            method: "getLogger".into(),
            args: vec![Expr::lit("\"svc\"")],
        };
        let t = match_expr(&lib, &expr, true, &Scope::new()).unwrap();
        assert_eq!(lib.transition(t).method(), Some("getLogger"));
    }

    #[test]
    fn consumed_value_selects_linked_wrapper() {
        let lib = catalog::by_name("apache").unwrap();
        let vars = scope(&[("client", "CloseableHttpClient"), ("request", "HttpGet")]);
        let expr = Expr::call(Expr::name("client"), "execute", vec![Expr::name("request")]);

        let consumed = match_expr(&lib, &expr, true, &vars).unwrap();
        assert!(matches!(
            lib.transition(consumed).kind,
            TransitionKind::Linked { .. }
        ));
        // a discarded execute() is an action-free self-loop: not a usage
        assert_eq!(match_expr(&lib, &expr, false, &vars), None);
    }

    #[test]
    fn declared_type_filters_candidates() {
        let lib = catalog::by_name("apache").unwrap();
        let vars = scope(&[("list", "java.util.List")]);
        let expr = Expr::call(Expr::name("list"), "setHeader", vec![Expr::lit("1"), Expr::lit("2")]);
        assert_eq!(match_expr(&lib, &expr, false, &vars), None);

        let vars = scope(&[("get", "HttpGet")]);
        let expr = Expr::call(Expr::name("get"), "setHeader", vec![Expr::lit("1"), Expr::lit("2")]);
        assert!(match_expr(&lib, &expr, false, &vars).is_some());
    }

    #[test]
    fn constructor_matches_by_type_and_arity() {
        let lib = catalog::by_name("apache").unwrap();
        let with_url = match_expr(
            &lib,
            &Expr::new_object("HttpGet", vec![Expr::name("url")]),
            true,
            &Scope::new(),
        )
        .unwrap();
        assert_eq!(lib.state(lib.transition(with_url).dst).name, "hasURL");
        assert_eq!(
            match_expr(&lib, &Expr::new_object("HttpPost", vec![]), true, &Scope::new()),
            None
        );
    }

    #[test]
    fn usages_are_listed_innermost_first() {
        let lib = catalog::by_name("apache").unwrap();
        let vars = scope(&[("url", "String")]);
        // HttpClients.createDefault().execute(new HttpGet(url))
        let root = Expr::call(
            Expr::Call {
                receiver: Some(Box::new(Expr::name("HttpClients"))),
                method: "createDefault".into(),
                args: vec![],
            },
            "execute",
            vec![Expr::new_object("HttpGet", vec![Expr::name("url")])],
        );
        let found = usages_in(&lib, &root, true, &vars);
        let paths: Vec<_> = found.iter().map(|u| u.path.clone()).collect();
        assert_eq!(
            paths,
            vec![vec![Slot::Receiver], vec![Slot::Arg(0)], vec![]]
        );
        assert!(found.iter().all(|u| u.consumed));
    }
}
