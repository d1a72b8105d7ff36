//! Turn a declaration tree into a [`Library`].
//!
//! Order of elaboration:
//!
//! 1. root roles from the type table, then every declared action;
//! 2. members of root roles: extra states, shifts, functions, constructors;
//! 3. variant roles (copying their base), then their own members;
//! 4. links, converters and type rules.
//!
//! A function named by a shift becomes one Call per shift. A function no
//! shift names becomes a Call from the state its link declares (`from`),
//! or a `Constructed` self-loop.

use crate::builder::{LibraryBuilder, TransitionDraft};
use crate::error::ModelError;
use crate::model::*;
use crate::props::{Guard, PropValue, PropertyEdit};
use libswap_interchange::{
    ActionUseDecl, ArgDecl, FunctionDecl, LibraryDecl, LinkDecl, TypeRuleDecl,
};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Build a library from a JSON declaration document.
pub fn library_from_json(doc: &serde_json::Value) -> Result<Library, ModelError> {
    let decl = libswap_interchange::from_json(doc)?;
    library_from_decl(&decl)
}

pub fn library_from_decl(decl: &LibraryDecl) -> Result<Library, ModelError> {
    Elaborator::new(decl).run()
}

struct Elaborator<'a> {
    decl: &'a LibraryDecl,
    builder: LibraryBuilder,
    /// Role names and role paths to ids.
    roles: BTreeMap<String, RoleId>,
    /// Functions some shift names, keyed by (role, function).
    shifted: BTreeSet<(String, String)>,
}

impl<'a> Elaborator<'a> {
    fn new(decl: &'a LibraryDecl) -> Self {
        let shifted = decl
            .automata
            .iter()
            .flat_map(|a| {
                a.shifts
                    .iter()
                    .flat_map(move |s| s.functions.iter().map(move |f| (a.role.clone(), f.clone())))
            })
            .collect();
        Elaborator {
            decl,
            builder: LibraryBuilder::new(&decl.name),
            roles: BTreeMap::new(),
            shifted,
        }
    }

    fn run(mut self) -> Result<Library, ModelError> {
        let decl = self.decl;
        for t in decl.types.iter().filter(|t| t.base.is_none()) {
            let id = self.builder.typed_role(&t.role, &t.code_type)?;
            self.roles.insert(t.role.clone(), id);
        }
        for a in &decl.actions {
            self.builder
                .action(&a.name, a.feature.as_deref(), a.side_effect);
        }

        let roots: Vec<String> = decl
            .types
            .iter()
            .filter(|t| t.base.is_none())
            .map(|t| t.role.clone())
            .collect();
        for role in &roots {
            self.members(role)?;
        }

        let mut pending: Vec<_> = decl.types.iter().filter(|t| t.base.is_some()).collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for t in pending {
                let base_name = t.base.as_deref().unwrap_or_default();
                let Some(base) = self.roles.get(base_name).copied() else {
                    deferred.push(t);
                    continue;
                };
                let id = self.builder.variant(base, &t.role)?;
                self.builder.set_type(id, &t.code_type);
                let path = format!("{}/{}", self.path_of(base_name), t.role);
                self.roles.insert(t.role.clone(), id);
                self.roles.insert(path, id);
                self.members(&t.role)?;
            }
            if deferred.len() == before {
                let t = deferred[0];
                return Err(ModelError::UnknownRole {
                    library: decl.name.clone(),
                    role: t.base.clone().unwrap_or_default(),
                });
            }
            pending = deferred;
        }

        for link in &decl.links {
            self.link(link)?;
        }
        self.converters()?;
        for rule in &decl.type_rules {
            self.type_rule(rule)?;
        }
        self.builder.build()
    }

    fn path_of(&self, role: &str) -> String {
        let mut parts = vec![role.to_string()];
        let mut current = role;
        while let Some(base) = self
            .decl
            .types
            .iter()
            .find(|t| t.role == current)
            .and_then(|t| t.base.as_deref())
        {
            parts.push(base.to_string());
            current = base;
        }
        parts.reverse();
        parts.join("/")
    }

    fn role(&self, name: &str) -> Result<RoleId, ModelError> {
        self.roles
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownRole {
                library: self.decl.name.clone(),
                role: name.to_string(),
            })
    }

    fn state(&mut self, role: &str, name: &str) -> Result<StateId, ModelError> {
        let id = self.role(role)?;
        Ok(self.builder.state(id, name))
    }

    /// States, shifts, unshifted functions and constructors of one role.
    fn members(&mut self, role: &str) -> Result<(), ModelError> {
        let decl = self.decl;
        let id = self.role(role)?;
        for automaton in decl.automata.iter().filter(|a| a.role == role) {
            for state in &automaton.states {
                self.builder.state(id, state);
            }
            for shift in &automaton.shifts {
                let src = self.state(role, &shift.from)?;
                let dst = self.state(role, shift.target())?;
                for name in &shift.functions {
                    let function = decl.function(role, name).ok_or_else(|| {
                        ModelError::Invalid {
                            library: decl.name.clone(),
                            message: format!("shift names undeclared function {}.{}", role, name),
                        }
                    })?;
                    self.function(function, src, dst)?;
                }
            }
        }

        for function in decl.functions.iter().filter(|f| f.role == role) {
            if self.shifted.contains(&(role.to_string(), function.name.clone())) {
                continue;
            }
            let from = decl
                .links
                .iter()
                .find(|l| l.role == role && l.function == function.name)
                .and_then(|l| l.from.as_deref());
            let src = match from {
                Some(state) => self.state(role, state)?,
                None => self.builder.constructed(id),
            };
            let dst = self.builder.constructed(id);
            self.function(function, src, dst)?;
        }

        for ctor in decl.constructors.iter().filter(|c| c.role == role) {
            let dst = match &ctor.to_state {
                Some(state) => self.state(role, state)?,
                None => self.builder.constructed(id),
            };
            let mut draft = TransitionDraft::construct(self.builder.init(id), dst, id);
            draft = self.entity_args(draft, &ctor.args)?;
            draft = self.action_args(draft, &ctor.actions);
            self.builder.add(draft)?;
        }
        Ok(())
    }

    fn function(
        &mut self,
        function: &FunctionDecl,
        src: StateId,
        dst: StateId,
    ) -> Result<TransitionId, ModelError> {
        let mut draft = TransitionDraft::call(src, dst, &function.name);
        if function.is_static {
            draft = draft.static_call();
        }
        if function.returns_value {
            draft = draft.significant();
        }
        draft = self.entity_args(draft, &function.args)?;
        draft = self.action_args(draft, &function.actions);
        draft = draft.guard(guard_from(&function.requires, &self.decl.name)?);
        for (key, value) in &function.sets {
            let value = scalar(value, key, &self.decl.name)?;
            draft = draft.edit(PropertyEdit::Set(key.clone(), value));
        }
        self.builder.add(draft)
    }

    fn entity_args(
        &mut self,
        mut draft: TransitionDraft,
        args: &[ArgDecl],
    ) -> Result<TransitionDraft, ModelError> {
        for arg in args {
            let state = self.state(&arg.role, arg.state.as_deref().unwrap_or(CONSTRUCTED))?;
            draft = draft.entity(&arg.name, state);
        }
        Ok(draft)
    }

    /// Actions become tags; their arguments become action parameters
    /// following the entity parameters.
    fn action_args(&mut self, mut draft: TransitionDraft, uses: &[ActionUseDecl]) -> TransitionDraft {
        for used in uses {
            let action = match self.builder.action_by_name(&used.name) {
                Some(id) => id,
                None => self.builder.action(&used.name, None, true),
            };
            draft = draft.with_action(action);
            for property in &used.args {
                draft = draft.action_arg(action, property);
            }
        }
        draft
    }

    fn link(&mut self, link: &LinkDecl) -> Result<(), ModelError> {
        let role = self.role(&link.role)?;
        let dst = self.state(&link.to_role, link.to_state.as_deref().unwrap_or(CONSTRUCTED))?;
        let from = match &link.from {
            Some(state) => Some(self.state(&link.role, state)?),
            None => None,
        };
        let targets = self.builder.calls_named(role, &link.function, from);
        if targets.is_empty() {
            return Err(ModelError::Invalid {
                library: self.decl.name.clone(),
                message: format!("link names unknown function {}.{}", link.role, link.function),
            });
        }
        for wrapped in targets {
            self.builder.link(wrapped, dst)?;
        }
        Ok(())
    }

    /// `<Role>` placeholders in a converter expression become template slots.
    fn converters(&mut self) -> Result<(), ModelError> {
        let decl = self.decl;
        let slot = Regex::new(r"<(\w+)>").map_err(|e| ModelError::Invalid {
            library: self.decl.name.clone(),
            message: e.to_string(),
        })?;
        for conv in &decl.converters {
            let role = self.role(&conv.role)?;
            let mut slots = BTreeMap::new();
            for cap in slot.captures_iter(&conv.expression) {
                let name = cap[1].to_string();
                let target = self.role(&name)?;
                slots.insert(name, self.builder.constructed(target));
            }
            let draft = TransitionDraft::template(
                self.builder.init(role),
                self.builder.constructed(role),
                &conv.expression,
                slots,
            );
            self.builder.add(draft)?;
        }
        Ok(())
    }

    fn type_rule(&mut self, rule: &TypeRuleDecl) -> Result<(), ModelError> {
        let role = self.role(&rule.role)?;
        let when = guard_from(&rule.when, &self.decl.name)?;
        self.builder.type_rule(role, when, &rule.code_type);
        Ok(())
    }
}

fn scalar(value: &serde_json::Value, key: &str, library: &str) -> Result<PropValue, ModelError> {
    PropValue::from_json(value).ok_or_else(|| ModelError::Invalid {
        library: library.to_string(),
        message: format!("property '{}' has a non-scalar value", key),
    })
}

/// `{k: v, ...}` means every key equals its value.
fn guard_from(
    map: &BTreeMap<String, serde_json::Value>,
    library: &str,
) -> Result<Guard, ModelError> {
    let mut parts = Vec::new();
    for (key, value) in map {
        parts.push(Guard::Equals(key.clone(), scalar(value, key, library)?));
    }
    Ok(match parts.len() {
        0 => Guard::Always,
        1 => parts.remove(0),
        _ => Guard::All(parts),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::Properties;
    use serde_json::json;

    fn make_doc() -> serde_json::Value {
        json!({
            "library": "mini",
            "constructs": [
                {"kind": "Type", "role": "Client", "type": "mini.Client"},
                {"kind": "Type", "role": "Request", "type": "mini.Request"},
                {"kind": "Type", "role": "Response", "type": "mini.Response"},
                {"kind": "Type", "role": "Node", "type": "mini.Node"},
                {"kind": "Type", "role": "child", "type": "mini.Node", "base": "Node"},
                {"kind": "Action", "name": "SetHeader"},
                {"kind": "Automaton", "role": "Request",
                 "states": ["Ready"],
                 "shifts": [
                    {"from": "Constructed", "to": "Ready", "functions": ["prepare"]},
                    {"from": "Ready", "to": "self", "functions": ["header"]}
                 ]},
                {"kind": "Function", "role": "Request", "name": "prepare", "sets": {"prepared": true}},
                {"kind": "Function", "role": "Request", "name": "header",
                 "actions": [{"name": "SetHeader", "args": ["headerName", "headerValue"]}],
                 "requires": {"prepared": true}},
                {"kind": "Function", "role": "Client", "name": "send",
                 "args": [{"name": "request", "role": "Request", "state": "Ready"}],
                 "returns_value": true},
                {"kind": "Function", "role": "Node", "name": "firstChild"},
                {"kind": "Link", "role": "Client", "function": "send", "to_role": "Response"},
                {"kind": "Link", "role": "Node", "function": "firstChild", "to_role": "child"},
                {"kind": "Constructor", "role": "Client"},
                {"kind": "Converter", "role": "Request", "expression": "wrap(<Client>)"},
                {"kind": "TypeRule", "role": "Request", "when": {"prepared": true}, "type": "mini.PreparedRequest"}
            ]
        })
    }

    fn find_call<'l>(lib: &'l Library, role: &str, method: &str) -> &'l Transition {
        let role = lib.role_by_path(role).unwrap();
        lib.transitions()
            .iter()
            .find(|t| t.method() == Some(method) && lib.role_of(t.src).id == role)
            .unwrap()
    }

    #[test]
    fn shifts_become_calls() {
        let lib = library_from_json(&make_doc()).unwrap();
        let header = find_call(&lib, "Request", "header");
        assert_eq!(lib.state(header.src).name, "Ready");
        assert!(header.is_self_loop());
        assert_eq!(header.guard, Guard::equals("prepared", true));
        assert_eq!(
            header.params(),
            &[
                Param::Action {
                    action: lib.action_by_name("SetHeader").unwrap(),
                    property: "headerName".to_string()
                },
                Param::Action {
                    action: lib.action_by_name("SetHeader").unwrap(),
                    property: "headerValue".to_string()
                },
            ]
        );
        let prepare = find_call(&lib, "Request", "prepare");
        assert_eq!(
            prepare.modifier,
            vec![PropertyEdit::Set("prepared".into(), true.into())]
        );
    }

    #[test]
    fn unshifted_function_is_constructed_self_loop_with_entity_args() {
        let lib = library_from_json(&make_doc()).unwrap();
        let send = find_call(&lib, "Client", "send");
        assert!(send.is_self_loop());
        assert_eq!(lib.state(send.src).name, CONSTRUCTED);
        let ready = lib
            .state_by_name(lib.role_by_path("Request").unwrap(), "Ready")
            .unwrap();
        assert_eq!(lib.dependencies(send.id), vec![ready]);
        assert!(lib.linked_wrapper(send.id).is_some());
    }

    #[test]
    fn variant_gets_its_own_path_and_links_resolve() {
        let lib = library_from_json(&make_doc()).unwrap();
        let child = lib.role_by_path("Node/child").unwrap();
        let first = find_call(&lib, "Node", "firstChild");
        let link = lib.linked_wrapper(first.id).unwrap();
        assert_eq!(lib.transition(link).dst, lib.role(child).constructed);
    }

    #[test]
    fn converter_becomes_template_with_slots() {
        let lib = library_from_json(&make_doc()).unwrap();
        let request = lib.role_by_path("Request").unwrap();
        let client = lib.role_by_path("Client").unwrap();
        let template = lib
            .outgoing(lib.role(request).init)
            .find(|t| matches!(t.kind, TransitionKind::Template { .. }))
            .unwrap();
        match &template.kind {
            TransitionKind::Template { slots, .. } => {
                assert_eq!(slots.get("Client"), Some(&lib.role(client).constructed));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn type_rules_are_elaborated() {
        let lib = library_from_json(&make_doc()).unwrap();
        let request = lib.role_by_path("Request").unwrap();
        let prepared: Properties = [("prepared", true)].into_iter().collect();
        assert_eq!(
            lib.resolve_type(request, Some(&prepared)).unwrap(),
            "mini.PreparedRequest"
        );
    }

    #[test]
    fn unknown_argument_role_is_an_error() {
        let doc = json!({
            "library": "bad",
            "constructs": [
                {"kind": "Type", "role": "A", "type": "x.A"},
                {"kind": "Function", "role": "A", "name": "f", "args": [{"role": "Missing"}]}
            ]
        });
        assert!(matches!(
            library_from_json(&doc),
            Err(ModelError::UnknownRole { .. })
        ));
    }
}
