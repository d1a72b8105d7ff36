//! Explicit construction of a [`Library`].
//!
//! Everything is registered on a [`LibraryBuilder`]; [`LibraryBuilder::build`]
//! validates the result and hands out the immutable library.

use crate::error::ModelError;
use crate::model::*;
use crate::props::{Guard, PropValue, PropertyEdit};
use std::collections::{BTreeMap, BTreeSet};

/// A transition waiting to be registered.
#[derive(Debug, Clone)]
pub struct TransitionDraft {
    /// `None` only for Linked drafts, whose source is the wrapped source.
    src: Option<StateId>,
    dst: StateId,
    kind: TransitionKind,
    actions: Vec<ActionId>,
    guard: Guard,
    modifier: Vec<PropertyEdit>,
}

impl TransitionDraft {
    fn new(src: Option<StateId>, dst: StateId, kind: TransitionKind) -> Self {
        TransitionDraft {
            src,
            dst,
            kind,
            actions: Vec::new(),
            guard: Guard::Always,
            modifier: Vec::new(),
        }
    }

    pub fn call(src: StateId, dst: StateId, method: &str) -> Self {
        Self::new(
            Some(src),
            dst,
            TransitionKind::Call {
                method: method.to_string(),
                params: Vec::new(),
                is_static: false,
                significant_result: false,
            },
        )
    }

    pub fn construct(src: StateId, dst: StateId, role: RoleId) -> Self {
        Self::new(
            Some(src),
            dst,
            TransitionKind::Construct {
                params: Vec::new(),
                role,
            },
        )
    }

    pub fn auto(src: StateId, dst: StateId) -> Self {
        Self::new(
            Some(src),
            dst,
            TransitionKind::Auto {
                kind: AutoKind::View,
            },
        )
    }

    pub fn cast(src: StateId, dst: StateId) -> Self {
        Self::new(
            Some(src),
            dst,
            TransitionKind::Auto {
                kind: AutoKind::Cast,
            },
        )
    }

    /// Bind the result of `wrapped` and continue from `dst`.
    pub fn linked(wrapped: TransitionId, dst: StateId) -> Self {
        Self::new(None, dst, TransitionKind::Linked { wrapped })
    }

    pub fn template(
        src: StateId,
        dst: StateId,
        template: &str,
        slots: BTreeMap<String, StateId>,
    ) -> Self {
        Self::new(
            Some(src),
            dst,
            TransitionKind::Template {
                template: template.to_string(),
                slots,
                is_static: true,
            },
        )
    }

    pub fn make_array(src: StateId, dst: StateId, size: TransitionId, item: TransitionId) -> Self {
        Self::new(Some(src), dst, TransitionKind::MakeArray { size, item })
    }

    /// Append a parameter. Only Call and Construct drafts take parameters.
    pub fn param(mut self, param: Param) -> Self {
        if let TransitionKind::Call { params, .. } | TransitionKind::Construct { params, .. } =
            &mut self.kind
        {
            params.push(param);
        }
        self
    }

    pub fn entity(self, name: &str, state: StateId) -> Self {
        self.param(Param::Entity {
            name: name.to_string(),
            state,
        })
    }

    pub fn action_arg(self, action: ActionId, property: &str) -> Self {
        self.param(Param::Action {
            action,
            property: property.to_string(),
        })
    }

    pub fn static_call(mut self) -> Self {
        if let TransitionKind::Call { is_static, .. } = &mut self.kind {
            *is_static = true;
        }
        self
    }

    pub fn significant(mut self) -> Self {
        if let TransitionKind::Call {
            significant_result, ..
        } = &mut self.kind
        {
            *significant_result = true;
        }
        self
    }

    pub fn with_action(mut self, action: ActionId) -> Self {
        self.actions.push(action);
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = guard;
        self
    }

    pub fn set(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.modifier
            .push(PropertyEdit::Set(key.to_string(), value.into()));
        self
    }

    pub fn edit(mut self, edit: PropertyEdit) -> Self {
        self.modifier.push(edit);
        self
    }
}

// ── Builder ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct LibraryBuilder {
    name: String,
    roles: Vec<Role>,
    states: Vec<State>,
    transitions: Vec<Transition>,
    actions: Vec<Action>,
    types: BTreeMap<RoleId, String>,
    type_rules: Vec<TypeRule>,
    linked_by: BTreeMap<TransitionId, TransitionId>,
}

impl LibraryBuilder {
    pub fn new(name: &str) -> Self {
        LibraryBuilder {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Register a root role with its canonical Init/Constructed/Final states.
    pub fn role(&mut self, name: &str) -> Result<RoleId, ModelError> {
        self.new_role(name, None)
    }

    /// Register a role with a static concrete type.
    pub fn typed_role(&mut self, name: &str, type_name: &str) -> Result<RoleId, ModelError> {
        let id = self.role(name)?;
        self.set_type(id, type_name);
        Ok(id)
    }

    fn new_role(&mut self, name: &str, base: Option<RoleId>) -> Result<RoleId, ModelError> {
        let duplicate = self
            .roles
            .iter()
            .any(|r| r.name == name && r.base == base);
        if duplicate {
            return Err(ModelError::DuplicateRole {
                role: name.to_string(),
            });
        }
        let id = RoleId(self.roles.len() as u32);
        let mut states = Vec::new();
        for state_name in [INIT, CONSTRUCTED, FINAL] {
            let sid = StateId(self.states.len() as u32);
            self.states.push(State {
                id: sid,
                name: state_name.to_string(),
                role: id,
            });
            states.push(sid);
        }
        self.roles.push(Role {
            id,
            name: name.to_string(),
            base,
            init: states[0],
            constructed: states[1],
            final_state: states[2],
            states,
            carry: None,
        });
        Ok(id)
    }

    /// Register `name` as a variant of `base`: the base's states and
    /// outgoing transitions are copied onto the new role.
    pub fn variant(&mut self, base: RoleId, name: &str) -> Result<RoleId, ModelError> {
        let id = self.new_role(name, Some(base))?;
        self.roles[id.index()].carry = self.roles[base.index()].carry.clone();

        let mut state_map: BTreeMap<StateId, StateId> = BTreeMap::new();
        let base_states = self.roles[base.index()].states.clone();
        for sid in base_states {
            let state_name = self.states[sid.index()].name.clone();
            let copied = self.state(id, &state_name);
            state_map.insert(sid, copied);
        }
        let remap = |s: StateId| state_map.get(&s).copied().unwrap_or(s);

        let mut transition_map: BTreeMap<TransitionId, TransitionId> = BTreeMap::new();
        let originals: Vec<Transition> = self
            .transitions
            .iter()
            .filter(|t| !t.is_usage() && self.states[t.src.index()].role == base)
            .cloned()
            .collect();
        for t in originals {
            let kind = match t.kind {
                TransitionKind::Linked { wrapped } => match transition_map.get(&wrapped) {
                    Some(copied) => TransitionKind::Linked { wrapped: *copied },
                    None => continue,
                },
                TransitionKind::MakeArray { size, item } => TransitionKind::MakeArray {
                    size: transition_map.get(&size).copied().unwrap_or(size),
                    item: transition_map.get(&item).copied().unwrap_or(item),
                },
                TransitionKind::Construct { params, role } if role == base => {
                    TransitionKind::Construct { params, role: id }
                }
                other => other,
            };
            let draft = TransitionDraft {
                src: Some(remap(t.src)),
                dst: remap(t.dst),
                kind,
                actions: t.actions,
                guard: t.guard,
                modifier: t.modifier,
            };
            let copied = self.add(draft)?;
            transition_map.insert(t.id, copied);
        }
        Ok(id)
    }

    /// The state `name` of `role`, created on first use.
    pub fn state(&mut self, role: RoleId, name: &str) -> StateId {
        if let Some(existing) = self.roles[role.index()]
            .states
            .iter()
            .copied()
            .find(|s| self.states[s.index()].name == name)
        {
            return existing;
        }
        let sid = StateId(self.states.len() as u32);
        self.states.push(State {
            id: sid,
            name: name.to_string(),
            role,
        });
        self.roles[role.index()].states.push(sid);
        sid
    }

    pub fn init(&self, role: RoleId) -> StateId {
        self.roles[role.index()].init
    }

    pub fn constructed(&self, role: RoleId) -> StateId {
        self.roles[role.index()].constructed
    }

    pub fn final_state(&self, role: RoleId) -> StateId {
        self.roles[role.index()].final_state
    }

    pub fn role_by_name(&self, name: &str) -> Option<RoleId> {
        self.roles.iter().find(|r| r.name == name).map(|r| r.id)
    }

    /// Register an action; actions are deduplicated by name.
    pub fn action(&mut self, name: &str, feature: Option<&str>, side_effect: bool) -> ActionId {
        if let Some(existing) = self.actions.iter().find(|a| a.name == name) {
            return existing.id;
        }
        let id = ActionId(self.actions.len() as u32);
        self.actions.push(Action {
            id,
            name: name.to_string(),
            feature: feature.map(str::to_owned),
            side_effect,
        });
        id
    }

    /// Call transitions of `role` named `method`, optionally only those
    /// leaving `from`.
    pub fn calls_named(
        &self,
        role: RoleId,
        method: &str,
        from: Option<StateId>,
    ) -> Vec<TransitionId> {
        self.transitions
            .iter()
            .filter(|t| t.method() == Some(method))
            .filter(|t| self.states[t.src.index()].role == role)
            .filter(|t| from.map_or(true, |f| f == t.src))
            .map(|t| t.id)
            .collect()
    }

    pub fn action_by_name(&self, name: &str) -> Option<ActionId> {
        self.actions.iter().find(|a| a.name == name).map(|a| a.id)
    }

    pub fn set_type(&mut self, role: RoleId, type_name: &str) {
        self.types.insert(role, type_name.to_string());
    }

    pub fn type_rule(&mut self, role: RoleId, when: Guard, type_name: &str) {
        self.type_rules.push(TypeRule {
            role,
            when,
            type_name: type_name.to_string(),
        });
    }

    pub fn carry(&mut self, role: RoleId, keys: &[&str]) {
        self.roles[role.index()].carry = Some(keys.iter().map(|k| k.to_string()).collect());
    }

    /// Register a transition. Entity parameters and template slots also
    /// register a Usage transition on the state they read.
    pub fn add(&mut self, draft: TransitionDraft) -> Result<TransitionId, ModelError> {
        let id = TransitionId(self.transitions.len() as u32);
        self.check_state(draft.dst)?;

        let (src, actions) = match &draft.kind {
            TransitionKind::Linked { wrapped } => {
                let inner = self.transitions.get(wrapped.index()).ok_or_else(|| {
                    ModelError::Invalid {
                        library: self.name.clone(),
                        message: format!("linked transition wraps unknown {}", wrapped),
                    }
                })?;
                if !inner.is_expression() {
                    return Err(ModelError::NotExpressionTransition {
                        transition: self.describe(*wrapped),
                    });
                }
                if self.linked_by.contains_key(wrapped) {
                    return Err(ModelError::AlreadyLinked {
                        transition: self.describe(*wrapped),
                    });
                }
                let actions = if draft.actions.is_empty() {
                    inner.actions.clone()
                } else {
                    draft.actions.clone()
                };
                (inner.src, actions)
            }
            _ => {
                let src = draft.src.ok_or_else(|| ModelError::Invalid {
                    library: self.name.clone(),
                    message: "transition without a source state".to_string(),
                })?;
                (src, draft.actions.clone())
            }
        };
        self.check_state(src)?;
        for action in &actions {
            if action.index() >= self.actions.len() {
                return Err(ModelError::UnknownAction {
                    action: action.to_string(),
                });
            }
        }

        let consumed: Vec<StateId> = match &draft.kind {
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
            _ => Vec::new(),
        };
        for state in &consumed {
            self.check_state(*state)?;
        }

        if let TransitionKind::Linked { wrapped } = &draft.kind {
            self.linked_by.insert(*wrapped, id);
        }
        self.transitions.push(Transition {
            id,
            src,
            dst: draft.dst,
            actions,
            guard: draft.guard,
            modifier: draft.modifier,
            kind: draft.kind,
        });

        for state in consumed {
            let usage_id = TransitionId(self.transitions.len() as u32);
            self.transitions.push(Transition {
                id: usage_id,
                src: state,
                dst: state,
                actions: Vec::new(),
                guard: Guard::Always,
                modifier: Vec::new(),
                kind: TransitionKind::Usage { used_by: id },
            });
        }
        Ok(id)
    }

    /// Shorthand for `add(TransitionDraft::linked(wrapped, dst))`.
    pub fn link(&mut self, wrapped: TransitionId, dst: StateId) -> Result<TransitionId, ModelError> {
        self.add(TransitionDraft::linked(wrapped, dst))
    }

    fn check_state(&self, state: StateId) -> Result<(), ModelError> {
        if state.index() < self.states.len() {
            Ok(())
        } else {
            Err(ModelError::Invalid {
                library: self.name.clone(),
                message: format!("unknown state {}", state),
            })
        }
    }

    fn describe(&self, id: TransitionId) -> String {
        let t = &self.transitions[id.index()];
        let role = &self.roles[self.states[t.src.index()].role.index()].name;
        match t.method() {
            Some(method) => format!("{}.{}", role, method),
            None => format!("{} {}", role, t.kind.name()),
        }
    }

    /// Validate and freeze the library.
    pub fn build(self) -> Result<Library, ModelError> {
        let invalid = |message: String| ModelError::Invalid {
            library: self.name.clone(),
            message,
        };

        for role in &self.roles {
            for sid in &role.states {
                if self.states[sid.index()].role != role.id {
                    return Err(invalid(format!(
                        "state {} is listed by role '{}' but owned by another role",
                        sid, role.name
                    )));
                }
            }
        }
        for state in &self.states {
            let owners = self
                .roles
                .iter()
                .filter(|r| r.states.contains(&state.id))
                .count();
            if owners != 1 {
                return Err(invalid(format!(
                    "state '{}' belongs to {} roles",
                    state.name, owners
                )));
            }
        }
        for t in &self.transitions {
            match &t.kind {
                TransitionKind::Construct { role, .. } => {
                    if self.states[t.dst.index()].role != *role {
                        return Err(invalid(format!(
                            "construct transition {} does not end in its role",
                            t.id
                        )));
                    }
                }
                TransitionKind::MakeArray { size, item } => {
                    for part in [size, item] {
                        if part.index() >= self.transitions.len() {
                            return Err(invalid(format!(
                                "array transition {} references unknown {}",
                                t.id, part
                            )));
                        }
                    }
                }
                _ => {}
            }
        }

        let mut role_paths = BTreeMap::new();
        let mut outgoing = vec![Vec::new(); self.states.len()];
        for t in &self.transitions {
            outgoing[t.src.index()].push(t.id);
        }

        let mut library = Library {
            name: self.name,
            roles: self.roles,
            states: self.states,
            transitions: self.transitions,
            actions: self.actions,
            types: self.types,
            type_rules: self.type_rules,
            outgoing,
            linked_by: self.linked_by,
            role_paths: BTreeMap::new(),
        };
        let mut seen = BTreeSet::new();
        for role in library.roles() {
            let path = library.role_path(role.id);
            if !seen.insert(path.clone()) {
                return Err(ModelError::DuplicateRole { role: path });
            }
            role_paths.insert(path, role.id);
        }
        library.role_paths = role_paths;
        tracing::debug!(
            library = %library.name,
            roles = library.roles.len(),
            transitions = library.transitions.len(),
            "library built"
        );
        Ok(library)
    }
}
