//! Uniform-cost search over library configurations.
//!
//! A configuration is `(state, properties of its role, sorted actions)`;
//! equal configurations are expanded once, shortest path first. Each
//! configuration also carries its context: the live role instances, the
//! path that led there and a property snapshot per role.
//!
//! Transitions whose entity parameters are not live are parked. A parked
//! candidate is admitted once every missing state has been visited by a
//! configuration whose actions have no side effect; that configuration's
//! path is spliced in before the candidate's final step.

use crate::error::{RouteError, SearchFailure};
use crate::query::{RouteQuery, SearchLimits};
use crate::route::Route;
use libswap_core::{
    apply_edits, ActionId, AutoKind, Library, Properties, RoleId, StateId, Transition,
    TransitionId, TransitionKind,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet};

pub struct RouteFinder<'l> {
    library: &'l Library,
    limits: SearchLimits,
}

impl<'l> RouteFinder<'l> {
    pub fn new(library: &'l Library) -> Self {
        RouteFinder {
            library,
            limits: SearchLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Find the shortest route realizing `query`.
    pub fn find(&self, query: &RouteQuery) -> Result<Route, RouteError> {
        let known = self.library.states().len();
        for state in query.start.iter().chain(query.goal.iter()) {
            if state.index() >= known {
                return Err(RouteError::UnknownState {
                    library: self.library.name().to_string(),
                    state: state.to_string(),
                });
            }
        }
        Search::new(self.library, self.limits, query).run()
    }
}

// ── Search state ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Config {
    state: StateId,
    props: Properties,
    actions: Vec<ActionId>,
    path: Vec<TransitionId>,
    context: BTreeSet<StateId>,
    role_props: BTreeMap<RoleId, Properties>,
}

type Key = (StateId, Properties, Vec<ActionId>);

impl Config {
    fn key(&self) -> Key {
        (self.state, self.props.clone(), self.actions.clone())
    }
}

/// Open-set entry; the heap pops the shortest path, oldest first.
struct Queued {
    cost: usize,
    seq: u64,
    config: Config,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Parked {
    config: Config,
    transition: TransitionId,
    missing: Vec<StateId>,
    /// Properties the transition's guard is evaluated on.
    guard_props: Properties,
    /// Properties of the source instance, for a wrapped guard.
    src_props: Properties,
}

struct Search<'l, 'q> {
    library: &'l Library,
    limits: SearchLimits,
    query: &'q RouteQuery,
    required: Vec<ActionId>,
    required_counts: BTreeMap<ActionId, usize>,
    /// False when a required action does not exist in the library.
    satisfiable: bool,
    open: BinaryHeap<Queued>,
    seq: u64,
    visited: HashSet<Key>,
    first_pure: HashMap<StateId, Config>,
    parked: Vec<Parked>,
    explored: usize,
}

impl<'l, 'q> Search<'l, 'q> {
    fn new(library: &'l Library, limits: SearchLimits, query: &'q RouteQuery) -> Self {
        let mut required = Vec::new();
        let mut satisfiable = true;
        for name in &query.required {
            match library.action_by_name(name) {
                Some(id) => required.push(id),
                None => {
                    tracing::debug!(action = %name, library = library.name(), "required action unknown");
                    satisfiable = false;
                }
            }
        }
        required.sort();
        let mut required_counts = BTreeMap::new();
        for a in &required {
            *required_counts.entry(*a).or_insert(0) += 1;
        }
        Search {
            library,
            limits,
            query,
            required,
            required_counts,
            satisfiable,
            open: BinaryHeap::new(),
            seq: 0,
            visited: HashSet::new(),
            first_pure: HashMap::new(),
            parked: Vec::new(),
            explored: 0,
        }
    }

    fn run(mut self) -> Result<Route, RouteError> {
        let query = self.query;
        let context: BTreeSet<StateId> = query.start.iter().copied().collect();
        for state in &query.start {
            let role = self.library.state(*state).role;
            let config = Config {
                state: *state,
                props: query.props.get(&role).cloned().unwrap_or_default(),
                actions: Vec::new(),
                path: Vec::new(),
                context: context.clone(),
                role_props: query.props.clone(),
            };
            self.push(config);
        }
        if !self.satisfiable {
            return Err(self.failure(SearchFailure::Exhausted));
        }

        loop {
            self.resolve_parked();
            let Some(Queued { config, .. }) = self.open.pop() else {
                return Err(self.failure(SearchFailure::Exhausted));
            };
            if self.explored >= self.limits.max_expansions {
                return Err(self.failure(SearchFailure::BudgetExhausted));
            }
            self.explored += 1;

            if self.is_success(&config) {
                tracing::debug!(
                    library = self.library.name(),
                    explored = self.explored,
                    steps = config.path.len(),
                    "route found"
                );
                for (i, step) in config.path.iter().enumerate() {
                    tracing::debug!("{}. {}", i, self.library.label(*step));
                }
                return Ok(Route {
                    steps: config.path,
                    explored: self.explored,
                });
            }
            if !self.visited.insert(config.key()) {
                continue;
            }
            if self.is_pure(&config) {
                self.first_pure
                    .entry(config.state)
                    .or_insert_with(|| config.clone());
            }
            self.expand(&config);
        }
    }

    fn failure(&self, reason: SearchFailure) -> RouteError {
        tracing::debug!(
            library = self.library.name(),
            explored = self.explored,
            parked = self.parked.len(),
            %reason,
            "route not found"
        );
        RouteError::RouteNotFound {
            library: self.library.name().to_string(),
            reason,
            explored: self.explored,
        }
    }

    fn push(&mut self, config: Config) {
        self.seq += 1;
        self.open.push(Queued {
            cost: config.path.len(),
            seq: self.seq,
            config,
        });
    }

    fn is_success(&self, config: &Config) -> bool {
        self.satisfiable
            && self.query.goal.map_or(true, |g| g == config.state)
            && config.actions == self.required
    }

    fn is_pure(&self, config: &Config) -> bool {
        config
            .actions
            .iter()
            .all(|a| !self.library.action(*a).side_effect)
    }

    /// Every accumulated action is required, at most as often as required.
    fn within_bounds(&self, actions: &[ActionId]) -> bool {
        let mut counts: BTreeMap<ActionId, usize> = BTreeMap::new();
        for a in actions {
            *counts.entry(*a).or_insert(0) += 1;
        }
        counts
            .iter()
            .all(|(a, n)| self.required_counts.get(a).map_or(false, |max| n <= max))
    }

    fn admissible(
        &self,
        t: &Transition,
        guard_props: &Properties,
        src_props: &Properties,
        actions: &[ActionId],
    ) -> bool {
        let wrapped_ok = match t.kind {
            TransitionKind::Linked { wrapped } => {
                self.library.transition(wrapped).guard.eval(src_props)
            }
            _ => true,
        };
        t.guard.eval(guard_props) && wrapped_ok && self.within_bounds(actions)
    }

    /// Properties of `t`'s destination instance before its modifier runs.
    fn incoming_props(&self, config: &Config, t: &Transition, dst_role: RoleId) -> Properties {
        let src_role = self.library.state(t.src).role;
        if dst_role == src_role {
            return config.props.clone();
        }
        if matches!(
            t.kind,
            TransitionKind::Auto {
                kind: AutoKind::Cast
            }
        ) {
            let mut carried = config.props.clone();
            if let Some(keys) = &self.library.role(dst_role).carry {
                carried.retain_keys(keys);
            }
            return carried;
        }
        config.role_props.get(&dst_role).cloned().unwrap_or_default()
    }

    fn expand(&mut self, config: &Config) {
        let library = self.library;
        let mut admitted = 0;
        for t in library.outgoing(config.state) {
            if t.is_usage() {
                continue;
            }
            let dst_role = library.state(t.dst).role;
            let is_cast = matches!(
                t.kind,
                TransitionKind::Auto {
                    kind: AutoKind::Cast
                }
            );
            let guard_props = self.incoming_props(config, t, dst_role);
            let props = apply_edits(&t.modifier, &guard_props);
            let mut actions = config.actions.clone();
            actions.extend(t.actions.iter().copied());
            actions.sort();

            if self
                .visited
                .contains(&(t.dst, props.clone(), actions.clone()))
            {
                continue;
            }

            let mut path = config.path.clone();
            path.push(t.id);
            let mut context: BTreeSet<StateId> = config
                .context
                .iter()
                .copied()
                .filter(|s| library.state(*s).role != dst_role && !(is_cast && *s == t.src))
                .collect();
            context.insert(t.dst);
            let mut role_props = config.role_props.clone();
            role_props.insert(dst_role, props.clone());
            let next = Config {
                state: t.dst,
                props,
                actions,
                path,
                context,
                role_props,
            };

            let mut missing: Vec<StateId> = library
                .dependencies(t.id)
                .into_iter()
                .filter(|s| !config.context.contains(s))
                .collect();
            missing.sort();
            missing.dedup();
            if !missing.is_empty() {
                tracing::debug!(
                    transition = %library.label(t.id),
                    missing = ?missing.iter().map(|s| library.state_label(*s)).collect::<Vec<_>>(),
                    "parked on missing dependencies"
                );
                self.parked.push(Parked {
                    config: next,
                    transition: t.id,
                    missing,
                    guard_props,
                    src_props: config.props.clone(),
                });
                continue;
            }

            if self.admissible(t, &guard_props, &config.props, &next.actions) {
                self.push(next);
                admitted += 1;
            }
        }
        tracing::trace!(
            state = %library.state_label(config.state),
            admitted,
            open = self.open.len(),
            "expanded"
        );

        if admitted == 0 {
            self.pivot(config);
        }
    }

    /// Continue from every other live instance at the same accumulated
    /// configuration.
    fn pivot(&mut self, config: &Config) {
        for state in &config.context {
            if *state == config.state {
                continue;
            }
            let role = self.library.state(*state).role;
            let next = Config {
                state: *state,
                props: config.role_props.get(&role).cloned().unwrap_or_default(),
                actions: config.actions.clone(),
                path: config.path.clone(),
                context: config.context.clone(),
                role_props: config.role_props.clone(),
            };
            if self.visited.contains(&next.key()) {
                continue;
            }
            self.push(next);
        }
    }

    fn resolve_parked(&mut self) {
        if self.parked.is_empty() {
            return;
        }
        let parked = std::mem::take(&mut self.parked);
        for p in parked {
            if !p.missing.iter().all(|s| self.first_pure.contains_key(s)) {
                self.parked.push(p);
                continue;
            }
            let mut config = p.config;
            let last = config.path.pop();
            for state in &p.missing {
                let Some(dep) = self.first_pure.get(state) else {
                    continue;
                };
                let shared = config
                    .path
                    .iter()
                    .zip(&dep.path)
                    .take_while(|(a, b)| a == b)
                    .count();
                let suffix = &dep.path[shared..];
                // Roles whose live instance the appended steps change.
                let mut touched = BTreeSet::new();
                for id in suffix {
                    let step = self.library.transition(*id);
                    config.actions.extend(step.actions.iter().copied());
                    touched.insert(self.library.state(step.dst).role);
                    if matches!(
                        step.kind,
                        TransitionKind::Auto {
                            kind: AutoKind::Cast
                        }
                    ) {
                        touched.insert(self.library.state(step.src).role);
                    }
                }
                config.path.extend(suffix.iter().copied());
                config
                    .context
                    .retain(|s| !touched.contains(&self.library.state(*s).role));
                config.context.extend(
                    dep.context
                        .iter()
                        .copied()
                        .filter(|s| touched.contains(&self.library.state(*s).role)),
                );
                for (role, props) in &dep.role_props {
                    config.role_props.insert(*role, props.clone());
                }
            }
            config.path.extend(last);
            config.actions.sort();
            let role = self.library.state(config.state).role;
            config.role_props.insert(role, config.props.clone());
            config.context.insert(config.state);

            let t = self.library.transition(p.transition);
            if self.admissible(t, &p.guard_props, &p.src_props, &config.actions) {
                tracing::debug!(
                    transition = %self.library.label(p.transition),
                    steps = config.path.len(),
                    "dependencies spliced"
                );
                self.push(config);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libswap_core::{LibraryBuilder, TransitionDraft};

    #[test]
    fn queued_pops_shortest_then_oldest() {
        let mut b = LibraryBuilder::new("t");
        let r = b.role("R").unwrap();
        let state = b.init(r);
        let config = || Config {
            state,
            props: Properties::new(),
            actions: Vec::new(),
            path: Vec::new(),
            context: BTreeSet::new(),
            role_props: BTreeMap::new(),
        };
        let mut heap = BinaryHeap::new();
        heap.push(Queued { cost: 2, seq: 1, config: config() });
        heap.push(Queued { cost: 1, seq: 3, config: config() });
        heap.push(Queued { cost: 1, seq: 2, config: config() });
        let order: Vec<(usize, u64)> =
            std::iter::from_fn(|| heap.pop().map(|q| (q.cost, q.seq))).collect();
        assert_eq!(order, vec![(1, 2), (1, 3), (2, 1)]);
    }

    #[test]
    fn empty_query_succeeds_at_once() {
        let mut b = LibraryBuilder::new("t");
        let r = b.role("R").unwrap();
        b.add(TransitionDraft::call(b.init(r), b.constructed(r), "make"))
            .unwrap();
        let lib = b.build().unwrap();
        let route = RouteFinder::new(&lib)
            .find(&RouteQuery::new(vec![lib.role(r).init]))
            .unwrap();
        assert!(route.is_empty());
        assert_eq!(route.explored, 1);
    }
}
