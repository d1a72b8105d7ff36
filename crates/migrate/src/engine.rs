//! Migrate every usage in a unit from one library to another.
//!
//! Each function body (and each field initializer, as a one-statement
//! body) is handled in two passes. The first walks statements in program
//! order, matching usages and recording the properties source transitions
//! have accumulated per role so far. The second rewrites bottom-up, last
//! statement first and innermost expression first, so positions found in
//! the first pass stay valid while code is spliced in.

use crate::ast::{import_of, Expr, SourceUnit, Stmt};
use crate::bindings::{extract, plan};
use crate::error::MigrateError;
use crate::replay::{replay, Replacement};
use crate::sites::{usages_in, Scope, Usage};
use libswap_core::{apply_edits, Library, Properties};
use libswap_route::{RouteFinder, SearchLimits};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What a failed usage does to the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failed usage.
    #[default]
    AllOrNothing,
    /// Leave failed usages untouched and carry on.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageFailure {
    pub location: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitOutcome {
    pub migrated: usize,
    pub failures: Vec<UsageFailure>,
}

impl UnitOutcome {
    pub fn touched(&self) -> bool {
        self.migrated > 0
    }
}

type SourceProps = BTreeMap<String, Properties>;

/// A usage found by the first pass.
struct Pending {
    usage: Usage,
    props: SourceProps,
    location: String,
}

pub struct MigrationEngine<'l> {
    from: &'l Library,
    to: &'l Library,
    limits: SearchLimits,
    policy: FailurePolicy,
}

impl<'l> MigrationEngine<'l> {
    pub fn new(from: &'l Library, to: &'l Library) -> Self {
        MigrationEngine {
            from,
            to,
            limits: SearchLimits::default(),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Migrate a whole unit in place.
    pub fn migrate_unit(&self, unit: &mut SourceUnit) -> Result<UnitOutcome, MigrateError> {
        let fields: Scope = unit
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.type_name.clone()))
            .collect();
        let mut outcome = UnitOutcome::default();

        for field in unit.fields.iter_mut() {
            let Some(init) = field.init.clone() else {
                continue;
            };
            let span = tracing::info_span!("field", name = %field.name);
            let _guard = span.enter();

            let label = format!("{}.{}", unit.class, field.name);
            let mut taken: BTreeSet<String> = fields.keys().cloned().collect();
            let mut body = vec![Stmt::Local {
                type_name: field.type_name.clone(),
                name: field.name.clone(),
                init: Some(init),
            }];
            let before = outcome.migrated;
            self.migrate_body(&fields, &mut taken, &mut body, &label, &mut outcome)?;
            match body.as_slice() {
                [Stmt::Local {
                    type_name, init, ..
                }] => {
                    field.type_name = type_name.clone();
                    field.init = init.clone();
                }
                _ => {
                    let err = MigrateError::FieldPreamble {
                        field: field.name.clone(),
                    };
                    self.fail(&label, err, &mut outcome)?;
                    outcome.migrated = before;
                }
            }
        }

        for function in unit.functions.iter_mut() {
            let span = tracing::info_span!("function", name = %function.name);
            let _guard = span.enter();

            let mut scope = fields.clone();
            for p in &function.params {
                scope.insert(p.name.clone(), p.type_name.clone());
            }
            let mut taken: BTreeSet<String> = scope.keys().cloned().collect();
            for stmt in &function.body {
                if let Stmt::Local { name, .. } = stmt {
                    taken.insert(name.clone());
                }
            }
            let label = format!("{}.{}", unit.class, function.name);
            self.migrate_body(&scope, &mut taken, &mut function.body, &label, &mut outcome)?;
        }

        if outcome.touched() {
            self.rewrite_imports(unit);
        }
        Ok(outcome)
    }

    /// Apply the failure policy to a failed usage.
    fn fail(
        &self,
        location: &str,
        error: MigrateError,
        outcome: &mut UnitOutcome,
    ) -> Result<(), MigrateError> {
        match self.policy {
            FailurePolicy::AllOrNothing => Err(MigrateError::Usage {
                location: location.to_string(),
                source: Box::new(error),
            }),
            FailurePolicy::BestEffort => {
                tracing::warn!(%location, %error, "usage left unchanged");
                outcome.failures.push(UsageFailure {
                    location: location.to_string(),
                    error: error.to_string(),
                });
                Ok(())
            }
        }
    }

    /// First pass: usages per statement, with the source properties in
    /// effect just before each.
    fn find_usages(&self, scope: &Scope, body: &[Stmt], label: &str) -> Vec<Vec<Pending>> {
        let mut scope = scope.clone();
        let mut props = SourceProps::new();
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            let mut pending = Vec::new();
            if let Some(root) = stmt.root() {
                for usage in usages_in(self.from, root, stmt.uses_value(), &scope) {
                    let t = self.from.transition(usage.transition);
                    let location = match root.at(&usage.path) {
                        Some(expr) => format!("{} in {}", expr, label),
                        None => label.to_string(),
                    };
                    pending.push(Pending {
                        usage: usage.clone(),
                        props: props.clone(),
                        location,
                    });
                    if !t.modifier.is_empty() {
                        let role = self.from.role_path(self.from.state(t.dst).role);
                        let current = props.remove(&role).unwrap_or_default();
                        props.insert(role, apply_edits(&t.modifier, &current));
                    }
                }
            }
            if let Stmt::Local {
                type_name, name, ..
            } = stmt
            {
                scope.insert(name.clone(), type_name.clone());
            }
            out.push(pending);
        }
        out
    }

    /// Migrate one statement list in place.
    pub fn migrate_body(
        &self,
        scope: &Scope,
        taken: &mut BTreeSet<String>,
        body: &mut Vec<Stmt>,
        label: &str,
        outcome: &mut UnitOutcome,
    ) -> Result<(), MigrateError> {
        let found = self.find_usages(scope, body, label);
        for (i, pending) in found.into_iter().enumerate().rev() {
            let mut preamble = Vec::new();
            let mut remove = false;
            for p in pending {
                let Some(expr) = body[i].root().and_then(|r| r.at(&p.usage.path)).cloned() else {
                    continue;
                };
                let applied = self
                    .migrate_usage(&expr, &p.usage, &p.props, taken)
                    .and_then(|rep| self.splice(&mut body[i], &p.usage, rep));
                match applied {
                    Ok((extra, removed)) => {
                        tracing::info!(usage = %p.location, "migrated");
                        preamble.extend(extra);
                        remove |= removed;
                        outcome.migrated += 1;
                    }
                    Err(e) => self.fail(&p.location, e, outcome)?,
                }
            }
            if remove {
                body.remove(i);
            }
            body.splice(i..i, preamble);
        }
        Ok(())
    }

    fn migrate_usage(
        &self,
        expr: &Expr,
        usage: &Usage,
        props: &SourceProps,
        taken: &mut BTreeSet<String>,
    ) -> Result<Replacement, MigrateError> {
        let bindings = extract(self.from, usage.transition, expr);
        let plan = plan(self.from, self.to, usage.transition, &bindings, props)?;
        let route = RouteFinder::new(self.to)
            .with_limits(self.limits)
            .find(&plan.query)?;
        tracing::debug!(
            steps = ?route.describe(self.to),
            explored = route.explored,
            "destination route"
        );
        let method = match expr {
            Expr::Call { method, .. } => method.as_str(),
            _ => "new",
        };
        replay(self.to, &route, &plan, &bindings, method, taken)
    }

    /// Put a replacement in place. Returns the statements to insert
    /// before `stmt` and whether `stmt` itself should go.
    fn splice(
        &self,
        stmt: &mut Stmt,
        usage: &Usage,
        rep: Replacement,
    ) -> Result<(Vec<Stmt>, bool), MigrateError> {
        if !usage.path.is_empty() {
            let result = rep.result.ok_or_else(|| self.missing_value(usage))?;
            let slot = stmt
                .root_mut()
                .and_then(|r| r.at_mut(&usage.path))
                .ok_or_else(|| self.missing_value(usage))?;
            *slot = result;
            return Ok((rep.preamble, false));
        }
        match stmt {
            Stmt::Local {
                type_name, init, ..
            } => {
                let result = rep.result.ok_or_else(|| self.missing_value(usage))?;
                if let Some(t) = rep.result_type {
                    *type_name = t;
                }
                *init = Some(result);
                Ok((rep.preamble, false))
            }
            Stmt::Return { value } => {
                *value = Some(rep.result.ok_or_else(|| self.missing_value(usage))?);
                Ok((rep.preamble, false))
            }
            Stmt::Expr { expr } => match rep.result {
                Some(result) => {
                    *expr = result;
                    Ok((rep.preamble, false))
                }
                None => Ok((rep.preamble, true)),
            },
        }
    }

    fn missing_value(&self, usage: &Usage) -> MigrateError {
        let t = self.from.transition(usage.transition);
        MigrateError::NoCounterpart {
            library: self.to.name().to_string(),
            state: format!("the value of {}", self.from.label(t.id)),
        }
    }

    /// Drop imports of source-only types and add the destination's.
    pub fn rewrite_imports(&self, unit: &mut SourceUnit) {
        let added: BTreeSet<String> = self
            .to
            .all_types()
            .iter()
            .filter_map(|t| import_of(t))
            .collect();
        let removed: BTreeSet<String> = self
            .from
            .type_diff(self.to)
            .iter()
            .filter_map(|t| import_of(t))
            .filter(|i| !added.contains(i))
            .collect();
        unit.imports.retain(|i| !removed.contains(i));
        for import in added {
            if !unit.imports.contains(&import) {
                unit.imports.push(import);
            }
        }
    }
}
