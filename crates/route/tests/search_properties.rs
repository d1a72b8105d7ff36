//! Behavioural tests for the route search over small hand-built models
//! and the built-in HTTP catalog.

use libswap_core::catalog;
use libswap_core::{Guard, Library, LibraryBuilder, Properties, StateId, TransitionDraft};
use libswap_route::{RouteError, RouteFinder, RouteQuery, SearchFailure, SearchLimits};

fn state(lib: &Library, label: &str) -> StateId {
    let (role, name) = label.rsplit_once('.').unwrap();
    let role = lib
        .role_by_path(role)
        .unwrap_or_else(|| panic!("no role {}", role));
    lib.state_by_name(role, name)
        .unwrap_or_else(|| panic!("no state {}", label))
}

/// Bound states as given, every other role at Init.
fn seeds(lib: &Library, bound: &[&str]) -> Vec<StateId> {
    let bound: Vec<StateId> = bound.iter().map(|l| state(lib, l)).collect();
    let mut out = bound.clone();
    for role in lib.roles() {
        if !bound.iter().any(|s| lib.state(*s).role == role.id) {
            out.push(role.init);
        }
    }
    out
}

// ── Small models ────────────────────────────────────────────────────

#[test]
fn minimal_automaton() {
    let mut b = LibraryBuilder::new("mini");
    let r = b.role("R").unwrap();
    b.add(TransitionDraft::call(b.init(r), b.constructed(r), "foo"))
        .unwrap();
    let lib = b.build().unwrap();

    let query = RouteQuery::new(vec![lib.role(r).init]).goal(lib.role(r).constructed);
    let route = RouteFinder::new(&lib).find(&query).unwrap();
    assert_eq!(route.methods(&lib), vec!["foo"]);
}

#[test]
fn required_action_selects_the_tagged_alternative() {
    let mut b = LibraryBuilder::new("choice");
    let r = b.role("R").unwrap();
    let s1 = b.state(r, "S1");
    let t1 = b.action("T1", None, true);
    b.add(TransitionDraft::call(b.init(r), s1, "a").with_action(t1))
        .unwrap();
    b.add(TransitionDraft::call(b.init(r), s1, "b")).unwrap();
    let lib = b.build().unwrap();

    let query = RouteQuery::new(vec![lib.role(r).init]).goal(s1).require("T1");
    let route = RouteFinder::new(&lib).find(&query).unwrap();
    assert_eq!(route.methods(&lib), vec!["a"]);

    let untagged = RouteQuery::new(vec![lib.role(r).init]).goal(s1);
    let route = RouteFinder::new(&lib).find(&untagged).unwrap();
    assert_eq!(route.methods(&lib), vec!["b"]);
}

#[test]
fn missing_dependency_is_spliced_before_its_consumer() {
    let mut b = LibraryBuilder::new("payload");
    let message = b.role("Message").unwrap();
    let payload = b.role("Payload").unwrap();
    let set_payload = b.action("SetPayload", None, true);
    b.add(TransitionDraft::construct(
        b.init(message),
        b.constructed(message),
        message,
    ))
    .unwrap();
    b.add(
        TransitionDraft::call(b.constructed(message), b.constructed(message), "setPayload")
            .entity("payload", b.constructed(payload))
            .with_action(set_payload),
    )
    .unwrap();
    b.add(
        TransitionDraft::call(b.init(payload), b.constructed(payload), "create").static_call(),
    )
    .unwrap();
    let lib = b.build().unwrap();

    let query = RouteQuery::new(vec![lib.role(message).init, lib.role(payload).init])
        .goal(lib.role(message).constructed)
        .require("SetPayload");
    let route = RouteFinder::new(&lib).find(&query).unwrap();
    assert_eq!(route.methods(&lib), vec!["create", "setPayload"]);
    assert_eq!(route.len(), 3);
}

#[test]
fn unreachable_action_terminates_with_route_not_found() {
    let mut b = LibraryBuilder::new("island");
    let r = b.role("R").unwrap();
    let q = b.role("Q").unwrap();
    let island = b.state(q, "Island");
    let teleport = b.action("Teleport", None, true);
    b.add(TransitionDraft::call(b.init(r), b.constructed(r), "foo"))
        .unwrap();
    b.add(TransitionDraft::call(island, island, "teleport").with_action(teleport))
        .unwrap();
    let lib = b.build().unwrap();

    let query = RouteQuery::new(vec![lib.role(r).init]).require("Teleport");
    match RouteFinder::new(&lib).find(&query) {
        Err(RouteError::RouteNotFound {
            reason, explored, ..
        }) => {
            assert_eq!(reason, SearchFailure::Exhausted);
            assert!(explored <= 10, "explored {}", explored);
        }
        other => panic!("expected RouteNotFound, got {:?}", other),
    }
}

#[test]
fn unknown_required_action_is_unsatisfiable() {
    let mut b = LibraryBuilder::new("mini");
    let r = b.role("R").unwrap();
    b.add(TransitionDraft::call(b.init(r), b.constructed(r), "foo"))
        .unwrap();
    let lib = b.build().unwrap();

    let query = RouteQuery::new(vec![lib.role(r).init]).require("Nope");
    assert_eq!(
        RouteFinder::new(&lib).find(&query),
        Err(RouteError::RouteNotFound {
            library: "mini".to_string(),
            reason: SearchFailure::Exhausted,
            explored: 0,
        })
    );
}

/// The dependency is reached through a step the consumer already took;
/// that step's action must count once.
#[test]
fn spliced_dependency_sharing_a_prefix_counts_its_actions_once() {
    let mut b = LibraryBuilder::new("shared");
    let a = b.role("A").unwrap();
    let p = b.role("P").unwrap();
    let done = b.state(a, "Done");
    let open = b.action("Open", None, false);
    let use_it = b.action("Use", None, true);
    b.add(TransitionDraft::call(b.init(a), b.constructed(a), "newA").with_action(open))
        .unwrap();
    b.add(
        TransitionDraft::call(b.init(p), b.constructed(p), "fromA")
            .static_call()
            .entity("a", b.constructed(a)),
    )
    .unwrap();
    b.add(
        TransitionDraft::call(b.constructed(a), done, "use")
            .entity("p", b.constructed(p))
            .with_action(use_it),
    )
    .unwrap();
    let lib = b.build().unwrap();

    let query = RouteQuery::new(vec![lib.role(a).init, lib.role(p).init])
        .goal(done)
        .require("Open")
        .require("Use");
    let route = RouteFinder::new(&lib).find(&query).unwrap();
    assert_eq!(route.methods(&lib), vec!["newA", "fromA", "use"]);
}

#[test]
fn budget_bounds_the_search() {
    let mut b = LibraryBuilder::new("mini");
    let r = b.role("R").unwrap();
    b.add(TransitionDraft::call(b.init(r), b.constructed(r), "foo"))
        .unwrap();
    let lib = b.build().unwrap();

    let query = RouteQuery::new(vec![lib.role(r).init]).goal(lib.role(r).constructed);
    let err = RouteFinder::new(&lib)
        .with_limits(SearchLimits { max_expansions: 1 })
        .find(&query)
        .unwrap_err();
    assert_eq!(
        err,
        RouteError::RouteNotFound {
            library: "mini".to_string(),
            reason: SearchFailure::BudgetExhausted,
            explored: 1,
        }
    );
}

#[test]
fn guards_force_the_only_valid_order() {
    let mut b = LibraryBuilder::new("chain");
    let r = b.role("R").unwrap();
    let ready = b.constructed(r);
    let (x, y, z) = (
        b.action("X", None, true),
        b.action("Y", None, true),
        b.action("Z", None, true),
    );
    b.add(TransitionDraft::call(b.init(r), ready, "open")).unwrap();
    // registered in reverse so that registration order cannot explain the result
    b.add(
        TransitionDraft::call(ready, ready, "third")
            .with_action(z)
            .guard(Guard::equals("second", true))
            .set("third", true),
    )
    .unwrap();
    b.add(
        TransitionDraft::call(ready, ready, "second")
            .with_action(y)
            .guard(Guard::equals("first", true))
            .set("second", true),
    )
    .unwrap();
    b.add(
        TransitionDraft::call(ready, ready, "first")
            .with_action(x)
            .set("first", true),
    )
    .unwrap();
    let lib = b.build().unwrap();

    let query = RouteQuery::new(vec![lib.role(r).init])
        .goal(ready)
        .require("Z")
        .require("X")
        .require("Y");
    let route = RouteFinder::new(&lib).find(&query).unwrap();
    assert_eq!(route.methods(&lib), vec!["open", "first", "second", "third"]);
}

#[test]
fn repeated_action_needs_repeated_steps() {
    let mut b = LibraryBuilder::new("repeat");
    let r = b.role("R").unwrap();
    let ready = b.constructed(r);
    let log = b.action("Log", None, true);
    b.add(TransitionDraft::call(b.init(r), ready, "open")).unwrap();
    b.add(
        TransitionDraft::call(ready, ready, "log")
            .with_action(log)
            .guard(Guard::not(Guard::Has("n".into())))
            .set("n", 1i64),
    )
    .unwrap();
    b.add(
        TransitionDraft::call(ready, ready, "logAgain")
            .with_action(log)
            .guard(Guard::equals("n", 1i64))
            .set("n", 2i64),
    )
    .unwrap();
    let lib = b.build().unwrap();

    let query = RouteQuery::new(vec![lib.role(r).init])
        .goal(ready)
        .require("Log")
        .require("Log");
    let route = RouteFinder::new(&lib).find(&query).unwrap();
    assert_eq!(route.methods(&lib), vec!["open", "log", "logAgain"]);
}

// ── Context handling ────────────────────────────────────────────────

/// A role moving to a new state leaves no stale instance behind: the
/// closed handle cannot be pivoted back to and closed a second time.
#[test]
fn context_eviction_drops_prior_instance_of_the_same_role() {
    let mut b = LibraryBuilder::new("handles");
    let handle = b.role("Handle").unwrap();
    let open = b.state(handle, "Open");
    let closed = b.state(handle, "Closed");
    let close = b.action("Close", None, true);
    b.add(TransitionDraft::call(open, closed, "close").with_action(close))
        .unwrap();
    let lib = b.build().unwrap();

    let twice = RouteQuery::new(vec![open]).require("Close").require("Close");
    assert!(matches!(
        RouteFinder::new(&lib).find(&twice),
        Err(RouteError::RouteNotFound { .. })
    ));
}

/// Splicing a dependency must not bring back an instance the consumer's
/// role already left.
#[test]
fn context_eviction_holds_across_spliced_dependencies() {
    let mut b = LibraryBuilder::new("sender");
    let req = b.role("Req").unwrap();
    let payload = b.role("Payload").unwrap();
    let sent = b.state(req, "Sent");
    let send = b.action("Send", None, true);
    b.add(TransitionDraft::construct(b.init(req), b.constructed(req), req))
        .unwrap();
    b.add(
        TransitionDraft::call(b.constructed(req), sent, "send")
            .entity("payload", b.constructed(payload))
            .with_action(send),
    )
    .unwrap();
    b.add(
        TransitionDraft::call(b.init(payload), b.constructed(payload), "create").static_call(),
    )
    .unwrap();
    let lib = b.build().unwrap();
    let start = vec![lib.role(req).init, lib.role(payload).init];

    let once = RouteQuery::new(start.clone()).require("Send");
    let route = RouteFinder::new(&lib).find(&once).unwrap();
    assert_eq!(route.methods(&lib), vec!["create", "send"]);
    assert_eq!(route.len(), 3);

    let twice = RouteQuery::new(start).require("Send").require("Send");
    assert!(matches!(
        RouteFinder::new(&lib).find(&twice),
        Err(RouteError::RouteNotFound { .. })
    ));
}

#[test]
fn dead_end_pivots_to_another_live_instance() {
    let mut b = LibraryBuilder::new("handles");
    let handle = b.role("Handle").unwrap();
    let open = b.state(handle, "Open");
    let closed = b.state(handle, "Closed");
    let close = b.action("Close", None, true);
    b.add(TransitionDraft::call(open, closed, "close").with_action(close))
        .unwrap();
    let other = b.variant(handle, "other").unwrap();
    let other_open = b.state(other, "Open");
    let lib = b.build().unwrap();

    let query = RouteQuery::new(vec![open, other_open])
        .require("Close")
        .require("Close");
    let route = RouteFinder::new(&lib).find(&query).unwrap();
    assert_eq!(route.len(), 2);
    let roles: Vec<_> = route
        .steps
        .iter()
        .map(|t| lib.role_path(lib.state(lib.transition(*t).src).role))
        .collect();
    assert!(roles.contains(&"Handle".to_string()));
    assert!(roles.contains(&"Handle/other".to_string()));
}

#[test]
fn cast_carries_only_declared_properties() {
    let build = |carry: bool| {
        let mut b = LibraryBuilder::new("cast");
        let raw = b.role("Raw").unwrap();
        let typed = b.role("Typed").unwrap();
        if carry {
            b.carry(typed, &["len"]);
        }
        let done = b.state(typed, "Done");
        b.add(TransitionDraft::cast(b.constructed(raw), b.constructed(typed)))
            .unwrap();
        b.add(
            TransitionDraft::call(b.constructed(typed), done, "finish").guard(Guard::All(vec![
                Guard::equals("len", 3i64),
                Guard::not(Guard::Has("tmp".into())),
            ])),
        )
        .unwrap();
        (b.build().unwrap(), raw, done)
    };

    let mut props = Properties::new();
    props.insert("len", 3i64);
    props.insert("tmp", true);

    let (lib, raw, done) = build(true);
    let query = RouteQuery::new(vec![lib.role(raw).constructed])
        .goal(done)
        .with_props(raw, props.clone());
    let route = RouteFinder::new(&lib).find(&query).unwrap();
    assert_eq!(route.len(), 2);

    let (lib, raw, done) = build(false);
    let query = RouteQuery::new(vec![lib.role(raw).constructed])
        .goal(done)
        .with_props(raw, props);
    assert!(RouteFinder::new(&lib).find(&query).is_err());
}

// ── Catalog ─────────────────────────────────────────────────────────

#[test]
fn okhttp_header_route_is_a_single_add_header() {
    let lib = catalog::by_name("okhttp").unwrap();
    let query = RouteQuery::new(seeds(&lib, &["Request.hasURL", "URL.Constructed"]))
        .goal(state(&lib, "Request.hasURL"))
        .require("SetHeader");
    let route = RouteFinder::new(&lib).find(&query).unwrap();
    assert_eq!(route.methods(&lib), vec!["addHeader"]);
}

#[test]
fn okhttp_execute_splices_request_build() {
    let lib = catalog::by_name("okhttp").unwrap();
    let query = RouteQuery::new(seeds(
        &lib,
        &["Client.Constructed", "Request.hasURL", "URL.Constructed"],
    ))
    .goal(state(&lib, "Connection.Constructed"));
    let route = RouteFinder::new(&lib).find(&query).unwrap();
    assert_eq!(route.methods(&lib), vec!["build", "newCall", "execute"]);
    assert!(route.explored > 0);
}

#[test]
fn route_serializes_with_explored_count() {
    let lib = catalog::by_name("log4j").unwrap();
    let query = RouteQuery::new(seeds(&lib, &[]))
        .goal(state(&lib, "Logger.Constructed"))
        .require("LoggerName");
    let route = RouteFinder::new(&lib).find(&query).unwrap();
    let json = serde_json::to_value(&route).unwrap();
    assert_eq!(json["steps"].as_array().unwrap().len(), 1);
    assert!(json["explored"].as_u64().unwrap() >= 1);
}
