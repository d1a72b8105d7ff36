//! Turn a destination route into code.
//!
//! Steps are emitted in order. A step producing a value that a later
//! step reads stays inline so calls chain (`new Builder().url(u)`); a value
//! read again after being consumed, or never read at all, becomes a local.
//! Non-significant calls before the last step become statements. The last
//! step's expression replaces the usage.
//!
//! Roles a step needs but nothing binds are created from their
//! `Init -> Constructed` transition into fresh locals, resolving their own
//! prerequisites through an explicit worklist.

use crate::ast::{simple_name, Expr, Stmt};
use crate::bindings::{Plan, SiteBindings};
use crate::error::MigrateError;
use libswap_core::{
    apply_edits, AutoKind, Library, Param, Properties, RoleId, Transition, TransitionId,
    TransitionKind,
};
use libswap_route::Route;
use std::collections::{BTreeMap, BTreeSet};

/// Code that takes the place of one usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacement {
    /// Statements to insert before the enclosing statement.
    pub preamble: Vec<Stmt>,
    /// Expression replacing the usage; `None` when nothing is left.
    pub result: Option<Expr>,
    /// Source-level type of the usage's value in the destination library.
    pub result_type: Option<String>,
}

#[derive(Debug, Clone)]
struct Bound {
    expr: Expr,
    /// Synthesized value not stored anywhere yet.
    inline: bool,
}

struct Replayer<'a> {
    to: &'a Library,
    values: &'a BTreeMap<String, Expr>,
    /// Source method being migrated, for error messages.
    method: &'a str,
    bound: BTreeMap<RoleId, Bound>,
    props: BTreeMap<RoleId, Properties>,
    preamble: Vec<Stmt>,
    taken: &'a mut BTreeSet<String>,
}

/// Replay `route` for one usage. `taken` holds every name already used in
/// the enclosing scope; generated locals are added to it.
pub fn replay(
    to: &Library,
    route: &Route,
    plan: &Plan,
    bindings: &SiteBindings,
    method: &str,
    taken: &mut BTreeSet<String>,
) -> Result<Replacement, MigrateError> {
    let mut bound = BTreeMap::new();
    for (path, (expr, _)) in &bindings.roles {
        if let Some(role) = to.role_by_path(path) {
            bound.insert(
                role,
                Bound {
                    expr: expr.clone(),
                    inline: false,
                },
            );
        }
    }
    let mut replayer = Replayer {
        to,
        values: &bindings.values,
        method,
        bound,
        props: plan.query.props.clone(),
        preamble: Vec::new(),
        taken,
    };
    replayer.run(&route.steps, plan.goal_role)
}

impl<'a> Replayer<'a> {
    fn run(
        mut self,
        steps: &[TransitionId],
        goal_role: RoleId,
    ) -> Result<Replacement, MigrateError> {
        let mut last_expr = None;
        for (i, step) in steps.iter().enumerate() {
            let rest = &steps[i + 1..];
            let t = self.to.transition(*step);
            let dst_role = self.to.state(t.dst).role;
            match &t.kind {
                TransitionKind::Auto { kind } => {
                    self.track_props(t);
                    if *kind == AutoKind::Cast {
                        let src_role = self.to.state(t.src).role;
                        if let Some(b) = self.bound.remove(&src_role) {
                            self.bound.insert(dst_role, b);
                        }
                    }
                    last_expr = None;
                }
                TransitionKind::Call { .. }
                | TransitionKind::Construct { .. }
                | TransitionKind::Linked { .. } => {
                    let expr = self.expression(*step, rest)?;
                    self.track_props(t);
                    if rest.is_empty() {
                        last_expr = Some(expr);
                    } else if self.rebinds(t).is_some() {
                        let read_later = rest.iter().any(|s| self.reads(*s).contains(&dst_role));
                        if read_later {
                            self.bound.insert(dst_role, Bound { expr, inline: true });
                        } else {
                            self.declare(dst_role, expr);
                        }
                    } else {
                        self.preamble.push(Stmt::Expr { expr });
                    }
                }
                TransitionKind::Template { .. }
                | TransitionKind::Usage { .. }
                | TransitionKind::MakeArray { .. } => return Err(self.unsupported(*step)),
            }
        }

        let result = match last_expr {
            Some(expr) => Some(expr),
            None => self.bound.remove(&goal_role).map(|b| b.expr),
        };
        let result_type = self
            .to
            .resolve_type(goal_role, self.props.get(&goal_role))
            .ok()
            .map(|t| simple_name(&t).to_string());
        Ok(Replacement {
            preamble: self.preamble,
            result,
            result_type,
        })
    }

    fn unsupported(&self, id: TransitionId) -> MigrateError {
        MigrateError::UnsupportedTransitionKind {
            kind: self.to.transition(id).kind.name().to_string(),
            transition: self.to.label(id),
        }
    }

    /// Role whose value a transition's result becomes.
    fn rebinds(&self, t: &Transition) -> Option<RoleId> {
        let dst = self.to.state(t.dst).role;
        match &t.kind {
            TransitionKind::Construct { .. } | TransitionKind::Linked { .. } => Some(dst),
            TransitionKind::Call {
                significant_result: true,
                ..
            } => Some(dst),
            _ => None,
        }
    }

    /// Roles whose values a transition reads.
    fn reads(&self, id: TransitionId) -> Vec<RoleId> {
        let t = self.to.transition(id);
        let mut out = Vec::new();
        match &t.kind {
            TransitionKind::Call {
                is_static: false, ..
            } => out.push(self.to.state(t.src).role),
            TransitionKind::Auto {
                kind: AutoKind::Cast,
            } => out.push(self.to.state(t.src).role),
            TransitionKind::Linked { wrapped } => return self.reads(*wrapped),
            _ => {}
        }
        out.extend(
            self.to
                .dependencies(id)
                .into_iter()
                .map(|s| self.to.state(s).role),
        );
        out
    }

    fn track_props(&mut self, t: &Transition) {
        let src_role = self.to.state(t.src).role;
        let dst_role = self.to.state(t.dst).role;
        let incoming = match &t.kind {
            TransitionKind::Auto {
                kind: AutoKind::Cast,
            } if src_role != dst_role => {
                let mut carried = self.props.get(&src_role).cloned().unwrap_or_default();
                if let Some(keys) = &self.to.role(dst_role).carry {
                    carried.retain_keys(keys);
                }
                carried
            }
            _ => self.props.get(&dst_role).cloned().unwrap_or_default(),
        };
        self.props
            .insert(dst_role, apply_edits(&t.modifier, &incoming));
    }

    fn type_of(&self, role: RoleId) -> Result<String, MigrateError> {
        let full = self.to.resolve_type(role, self.props.get(&role))?;
        Ok(simple_name(&full).to_string())
    }

    fn fresh_name(&mut self, role: RoleId) -> String {
        let name = &self.to.role(role).name;
        let base = if name.chars().all(|c| !c.is_ascii_lowercase()) {
            name.to_ascii_lowercase()
        } else {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                None => "value".to_string(),
            }
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while self.taken.contains(&candidate) {
            candidate = format!("{}{}", base, n);
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }

    /// Store `expr` in a new local and bind `role` to it.
    fn declare(&mut self, role: RoleId, expr: Expr) {
        let type_name = self
            .type_of(role)
            .unwrap_or_else(|_| self.to.role(role).name.clone());
        let name = self.fresh_name(role);
        self.preamble.push(Stmt::local(&type_name, &name, expr));
        self.bound.insert(
            role,
            Bound {
                expr: Expr::name(&name),
                inline: false,
            },
        );
    }

    /// The expression for `role`'s value, as read by a step that
    /// rebinds `rebinds`. An inline value is moved into the reader unless
    /// a later step needs it again.
    fn use_role(
        &mut self,
        role: RoleId,
        rebinds: Option<RoleId>,
        rest: &[TransitionId],
    ) -> Result<Expr, MigrateError> {
        if !self.bound.contains_key(&role) {
            self.materialize(role, rest)?;
        }
        let Some(b) = self.bound.get(&role).cloned() else {
            return Err(self.unresolvable(role));
        };
        if !b.inline {
            return Ok(b.expr);
        }
        let read_later = rest.iter().any(|s| self.reads(*s).contains(&role));
        if read_later && rebinds != Some(role) {
            self.declare(role, b.expr);
            return self
                .bound
                .get(&role)
                .map(|b| b.expr.clone())
                .ok_or_else(|| self.unresolvable(role));
        }
        self.bound.remove(&role);
        Ok(b.expr)
    }

    fn unresolvable(&self, role: RoleId) -> MigrateError {
        MigrateError::UnresolvableDependency {
            library: self.to.name().to_string(),
            role: self.to.role_path(role),
        }
    }

    /// Code for one Call, Construct or Linked step.
    fn expression(&mut self, id: TransitionId, rest: &[TransitionId]) -> Result<Expr, MigrateError> {
        let t = self.to.transition(id);
        let rebinds = self.rebinds(t);
        let base = match t.kind {
            TransitionKind::Linked { wrapped } => wrapped,
            _ => id,
        };
        let inner = self.to.transition(base);
        let src_role = self.to.state(inner.src).role;
        match &inner.kind {
            TransitionKind::Call {
                method,
                params,
                is_static,
                ..
            } => {
                let receiver = if *is_static {
                    Expr::name(&self.type_of(src_role)?)
                } else {
                    self.use_role(src_role, rebinds, rest)?
                };
                let args = self.arguments(params, src_role, rebinds, rest, method)?;
                Ok(Expr::call(receiver, method, args))
            }
            TransitionKind::Construct { params, role } => {
                let type_name = self.type_of(*role)?;
                let args = self.arguments(params, *role, rebinds, rest, "new")?;
                Ok(Expr::new_object(&type_name, args))
            }
            _ => Err(self.unsupported(base)),
        }
    }

    fn arguments(
        &mut self,
        params: &[Param],
        owner: RoleId,
        rebinds: Option<RoleId>,
        rest: &[TransitionId],
        method: &str,
    ) -> Result<Vec<Expr>, MigrateError> {
        let mut args = Vec::with_capacity(params.len());
        for param in params {
            let arg = match param {
                Param::Entity { state, .. } => {
                    let role = self.to.state(*state).role;
                    self.use_role(role, rebinds, rest)?
                }
                Param::Action { property, .. } => self
                    .values
                    .get(property)
                    .cloned()
                    .ok_or_else(|| self.missing(method, property))?,
                Param::Property { key } => self
                    .props
                    .get(&owner)
                    .and_then(|p| p.get(key))
                    .map(|v| Expr::lit(&v.to_string()))
                    .ok_or_else(|| self.missing(method, key))?,
                Param::Const { value } => Expr::lit(value),
            };
            args.push(arg);
        }
        Ok(args)
    }

    fn missing(&self, method: &str, property: &str) -> MigrateError {
        let method = if method == "new" { self.method } else { method };
        MigrateError::MissingArgument {
            method: method.to_string(),
            property: property.to_string(),
        }
    }

    // ── Prerequisites ───────────────────────────────────────────────

    /// How to create a `role` from nothing: a Construct, a static call, or
    /// a link out of some role's `Init`, none of which read `role` itself.
    /// The role's own transitions are preferred.
    fn creator(&self, role: RoleId) -> Option<TransitionId> {
        let target = self.to.role(role).constructed;
        let mut candidates: Vec<&Transition> = self
            .to
            .transitions()
            .iter()
            .filter(|t| t.dst == target)
            .filter(|t| {
                matches!(
                    t.kind,
                    TransitionKind::Construct { .. }
                        | TransitionKind::Call { .. }
                        | TransitionKind::Linked { .. }
                )
            })
            .filter(|t| self.to.role_of(t.src).init == t.src)
            .filter(|t| !self.reads(t.id).contains(&role))
            .collect();
        candidates.sort_by_key(|t| (self.to.state(t.src).role != role, t.id));
        candidates.first().map(|t| t.id)
    }

    /// Bind `role` to a fresh local, creating unbound prerequisites first.
    fn materialize(&mut self, role: RoleId, rest: &[TransitionId]) -> Result<(), MigrateError> {
        let limit = self.to.roles().len();
        let mut stack = vec![role];
        let mut in_progress = BTreeSet::new();
        while let Some(&current) = stack.last() {
            if self.bound.contains_key(&current) {
                stack.pop();
                continue;
            }
            let creator = self
                .creator(current)
                .ok_or_else(|| self.unresolvable(current))?;
            let missing: Vec<RoleId> = self
                .reads(creator)
                .into_iter()
                .filter(|r| !self.bound.contains_key(r))
                .collect();
            if missing.is_empty() {
                let expr = self.expression(creator, rest)?;
                self.track_props(self.to.transition(creator));
                tracing::debug!(
                    role = %self.to.role_path(current),
                    via = %self.to.label(creator),
                    "created missing prerequisite"
                );
                self.declare(current, expr);
                stack.pop();
                continue;
            }
            if missing.iter().any(|r| in_progress.contains(r)) || !in_progress.insert(current) {
                return Err(self.unresolvable(current));
            }
            stack.extend(missing);
            if stack.len() > limit {
                return Err(self.unresolvable(role));
            }
        }
        Ok(())
    }
}
