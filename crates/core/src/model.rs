//! The immutable role/transition model of one library.
//!
//! Roles, states, transitions and actions live in arenas owned by
//! [`Library`] and are referenced by copyable ids. A `Library` is only
//! obtained from [`crate::LibraryBuilder::build`] and never changes
//! afterwards.

use crate::error::ModelError;
use crate::props::{Guard, Properties, PropertyEdit};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const INIT: &str = "Init";
pub const CONSTRUCTED: &str = "Constructed";
pub const FINAL: &str = "Final";

// ── Ids ─────────────────────────────────────────────────────────────

macro_rules! arena_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(RoleId, "r");
arena_id!(StateId, "s");
arena_id!(TransitionId, "t");
arena_id!(ActionId, "a");

// ── Arena entries ───────────────────────────────────────────────────

/// One kind of value the library manipulates.
#[derive(Debug, Clone, Serialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub base: Option<RoleId>,
    pub states: Vec<StateId>,
    pub init: StateId,
    pub constructed: StateId,
    pub final_state: StateId,
    /// Property keys kept when an instance is cast into this role.
    /// `None` keeps everything.
    pub carry: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct State {
    pub id: StateId,
    pub name: String,
    pub role: RoleId,
}

/// A semantic side-effect tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub id: ActionId,
    pub name: String,
    pub feature: Option<String>,
    pub side_effect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AutoKind {
    /// The same value seen as another state; no code.
    View,
    /// The value changes role; properties pass through the carry rule.
    Cast,
}

/// Where an argument of a Call/Construct comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Param {
    /// The value of another role instance in `state`.
    Entity { name: String, state: StateId },
    /// The literal at the real call site, recorded under `property`.
    Action { action: ActionId, property: String },
    /// A value taken from accumulated properties.
    Property { key: String },
    /// A fixed literal.
    Const { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TransitionKind {
    Call {
        method: String,
        params: Vec<Param>,
        is_static: bool,
        significant_result: bool,
    },
    Construct {
        params: Vec<Param>,
        role: RoleId,
    },
    Auto {
        kind: AutoKind,
    },
    Linked {
        wrapped: TransitionId,
    },
    Template {
        template: String,
        slots: BTreeMap<String, StateId>,
        is_static: bool,
    },
    Usage {
        used_by: TransitionId,
    },
    MakeArray {
        size: TransitionId,
        item: TransitionId,
    },
}

impl TransitionKind {
    pub fn name(&self) -> &'static str {
        match self {
            TransitionKind::Call { .. } => "Call",
            TransitionKind::Construct { .. } => "Construct",
            TransitionKind::Auto { .. } => "Auto",
            TransitionKind::Linked { .. } => "Linked",
            TransitionKind::Template { .. } => "Template",
            TransitionKind::Usage { .. } => "Usage",
            TransitionKind::MakeArray { .. } => "MakeArray",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Transition {
    pub id: TransitionId,
    pub src: StateId,
    pub dst: StateId,
    pub actions: Vec<ActionId>,
    pub guard: Guard,
    pub modifier: Vec<PropertyEdit>,
    pub kind: TransitionKind,
}

impl Transition {
    /// Parameters of a Call or Construct; empty for every other kind.
    pub fn params(&self) -> &[Param] {
        match &self.kind {
            TransitionKind::Call { params, .. } | TransitionKind::Construct { params, .. } => {
                params
            }
            _ => &[],
        }
    }

    /// Call, Construct and Template transitions produce an expression.
    pub fn is_expression(&self) -> bool {
        matches!(
            self.kind,
            TransitionKind::Call { .. }
                | TransitionKind::Construct { .. }
                | TransitionKind::Template { .. }
        )
    }

    pub fn is_usage(&self) -> bool {
        matches!(self.kind, TransitionKind::Usage { .. })
    }

    pub fn is_auto(&self) -> bool {
        matches!(self.kind, TransitionKind::Auto { .. })
    }

    pub fn is_self_loop(&self) -> bool {
        self.src == self.dst
    }

    pub fn method(&self) -> Option<&str> {
        match &self.kind {
            TransitionKind::Call { method, .. } => Some(method),
            _ => None,
        }
    }
}

/// `role` materializes as `type_name` when `when` holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRule {
    pub role: RoleId,
    pub when: Guard,
    pub type_name: String,
}

// ── Library ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Library {
    pub(crate) name: String,
    pub(crate) roles: Vec<Role>,
    pub(crate) states: Vec<State>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) actions: Vec<Action>,
    pub(crate) types: BTreeMap<RoleId, String>,
    pub(crate) type_rules: Vec<TypeRule>,
    #[serde(skip)]
    pub(crate) outgoing: Vec<Vec<TransitionId>>,
    #[serde(skip)]
    pub(crate) linked_by: BTreeMap<TransitionId, TransitionId>,
    #[serde(skip)]
    pub(crate) role_paths: BTreeMap<String, RoleId>,
}

impl Library {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn type_rules(&self) -> &[TypeRule] {
        &self.type_rules
    }

    pub fn role(&self, id: RoleId) -> &Role {
        &self.roles[id.index()]
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    pub fn transition(&self, id: TransitionId) -> &Transition {
        &self.transitions[id.index()]
    }

    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id.index()]
    }

    /// Role owning a state.
    pub fn role_of(&self, state: StateId) -> &Role {
        self.role(self.state(state).role)
    }

    /// Transitions leaving `state`, in registration order.
    pub fn outgoing(&self, state: StateId) -> impl Iterator<Item = &Transition> + '_ {
        self.outgoing[state.index()]
            .iter()
            .map(move |id| self.transition(*id))
    }

    /// The Linked transition wrapping `id`, if any.
    pub fn linked_wrapper(&self, id: TransitionId) -> Option<TransitionId> {
        self.linked_by.get(&id).copied()
    }

    pub fn action_by_name(&self, name: &str) -> Option<ActionId> {
        self.actions.iter().find(|a| a.name == name).map(|a| a.id)
    }

    /// Identity of a role across libraries: base chain names joined by `/`.
    pub fn role_path(&self, id: RoleId) -> String {
        let role = self.role(id);
        match role.base {
            Some(base) => format!("{}/{}", self.role_path(base), role.name),
            None => role.name.clone(),
        }
    }

    pub fn role_by_path(&self, path: &str) -> Option<RoleId> {
        self.role_paths.get(path).copied()
    }

    pub fn state_by_name(&self, role: RoleId, name: &str) -> Option<StateId> {
        self.role(role)
            .states
            .iter()
            .copied()
            .find(|s| self.state(*s).name == name)
    }

    /// `role_path.state_name`, the cross-library name of a state.
    pub fn state_label(&self, state: StateId) -> String {
        let s = self.state(state);
        format!("{}.{}", self.role_path(s.role), s.name)
    }

    /// The state of this library with the same role path and state name
    /// as `state` of `other`.
    pub fn counterpart(&self, other: &Library, state: StateId) -> Option<StateId> {
        let s = other.state(state);
        let role = self.role_by_path(&other.role_path(s.role))?;
        self.state_by_name(role, &s.name)
    }

    /// Init states of every role.
    pub fn init_states(&self) -> Vec<StateId> {
        self.roles.iter().map(|r| r.init).collect()
    }

    /// States whose values a transition reads: entity params, template
    /// slots, and for a Linked transition those of the wrapped one.
    pub fn dependencies(&self, id: TransitionId) -> Vec<StateId> {
        let t = self.transition(id);
        match &t.kind {
            TransitionKind::Call { params, .. } | TransitionKind::Construct { params, .. } => {
                params
                    .iter()
                    .filter_map(|p| match p {
                        Param::Entity { state, .. } => Some(*state),
                        _ => None,
                    })
                    .collect()
            }
            TransitionKind::Template { slots, .. } => slots.values().copied().collect(),
            TransitionKind::Linked { wrapped } => self.dependencies(*wrapped),
            _ => Vec::new(),
        }
    }

    /// Transitions that read `state` as an argument.
    pub fn consumers_of(&self, state: StateId) -> Vec<TransitionId> {
        self.outgoing(state)
            .filter_map(|t| match t.kind {
                TransitionKind::Usage { used_by } => Some(used_by),
                _ => None,
            })
            .collect()
    }

    // ── Types ───────────────────────────────────────────────────────

    /// Concrete type of `role`. With properties, the first matching type
    /// rule wins; otherwise the static type of the role or of its nearest
    /// base.
    pub fn resolve_type(
        &self,
        role: RoleId,
        props: Option<&Properties>,
    ) -> Result<String, ModelError> {
        if let Some(props) = props {
            if let Some(rule) = self
                .type_rules
                .iter()
                .find(|r| r.role == role && r.when.eval(props))
            {
                return Ok(rule.type_name.clone());
            }
        }
        let mut current = Some(role);
        while let Some(id) = current {
            if let Some(t) = self.types.get(&id) {
                return Ok(t.clone());
            }
            current = self.role(id).base;
        }
        Err(ModelError::MissingType {
            library: self.name.clone(),
            role: self.role_path(role),
        })
    }

    /// Every concrete type the library can materialize.
    pub fn all_types(&self) -> BTreeSet<String> {
        self.types
            .values()
            .cloned()
            .chain(self.type_rules.iter().map(|r| r.type_name.clone()))
            .collect()
    }

    /// Types used by this library that `to` does not use.
    pub fn type_diff(&self, to: &Library) -> BTreeSet<String> {
        let theirs = to.all_types();
        self.all_types()
            .into_iter()
            .filter(|t| !theirs.contains(t))
            .collect()
    }

    // ── Display ─────────────────────────────────────────────────────

    /// Short human-readable label of a transition.
    pub fn label(&self, id: TransitionId) -> String {
        let t = self.transition(id);
        let src = self.state_label(t.src);
        let dst = self.state_label(t.dst);
        match &t.kind {
            TransitionKind::Call { method, .. } => format!("{} --{}()--> {}", src, method, dst),
            TransitionKind::Construct { .. } => format!("{} --new--> {}", src, dst),
            TransitionKind::Auto { kind } => {
                let word = match kind {
                    AutoKind::View => "auto",
                    AutoKind::Cast => "cast",
                };
                format!("{} --{}--> {}", src, word, dst)
            }
            TransitionKind::Linked { wrapped } => {
                let inner = self.transition(*wrapped);
                let what = inner.method().unwrap_or(inner.kind.name());
                format!("{} --link({})--> {}", src, what, dst)
            }
            TransitionKind::Template { template, .. } => {
                format!("{} --`{}`--> {}", src, template, dst)
            }
            TransitionKind::Usage { used_by } => format!("{} used by {}", src, used_by),
            TransitionKind::MakeArray { .. } => format!("{} --array--> {}", src, dst),
        }
    }
}
