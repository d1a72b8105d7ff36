//! Deserialization from JSON declaration documents into typed structs.
//!
//! The main entry point is [`from_json`], which takes a
//! `&serde_json::Value` and produces a [`LibraryDecl`].

use crate::types::*;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Errors during declaration deserialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterchangeError {
    /// The document is missing a required top-level field.
    #[error("declaration missing required field: '{field}'")]
    MissingField { field: String },
    /// A construct is malformed.
    #[error("{kind} '{id}': {message}")]
    ConstructError {
        kind: String,
        id: String,
        message: String,
    },
    /// The document is not valid JSON or has the wrong shape.
    #[error("invalid declaration: {0}")]
    InvalidDocument(String),
}

/// Parse a declaration document from text.
pub fn from_str(text: &str) -> Result<LibraryDecl, InterchangeError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| InterchangeError::InvalidDocument(e.to_string()))?;
    from_json(&value)
}

/// Deserialize a declaration document into typed structs.
///
/// Walks the `constructs` array and dispatches on the `kind` field.
/// Unknown construct kinds are skipped for forward compatibility.
pub fn from_json(doc: &Value) -> Result<LibraryDecl, InterchangeError> {
    let name = doc
        .get("library")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "library".to_string(),
        })?
        .to_string();

    let constructs = doc
        .get("constructs")
        .and_then(|c| c.as_array())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "constructs".to_string(),
        })?;

    let mut decl = LibraryDecl {
        name,
        ..LibraryDecl::default()
    };

    for obj in constructs {
        let kind = obj.get("kind").and_then(|k| k.as_str()).unwrap_or("");
        match kind {
            "Type" => decl.types.push(parse_type(obj)?),
            "Action" => decl.actions.push(parse_action(obj)?),
            "Automaton" => decl.automata.push(parse_automaton(obj)?),
            "Function" => decl.functions.push(parse_function(obj)?),
            "Link" => decl.links.push(parse_link(obj)?),
            "Constructor" => decl.constructors.push(parse_constructor(obj)?),
            "Converter" => decl.converters.push(parse_converter(obj)?),
            "TypeRule" => decl.type_rules.push(parse_type_rule(obj)?),
            _ => {}
        }
    }

    check_unique(&decl)?;
    Ok(decl)
}

/// Rejects duplicate role types and duplicate (role, function) pairs.
fn check_unique(decl: &LibraryDecl) -> Result<(), InterchangeError> {
    let mut roles = BTreeSet::new();
    for t in &decl.types {
        if !roles.insert(t.role.as_str()) {
            return Err(construct_error("Type", &t.role, "declared more than once"));
        }
    }
    let mut functions = BTreeSet::new();
    for f in &decl.functions {
        if !functions.insert((f.role.as_str(), f.name.as_str())) {
            return Err(construct_error(
                "Function",
                &format!("{}.{}", f.role, f.name),
                "declared more than once",
            ));
        }
    }
    Ok(())
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn construct_error(kind: &str, id: &str, message: &str) -> InterchangeError {
    InterchangeError::ConstructError {
        kind: kind.to_string(),
        id: id.to_string(),
        message: message.to_string(),
    }
}

fn required_str(obj: &Value, kind: &str, field: &str) -> Result<String, InterchangeError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            let id = obj
                .get("role")
                .or_else(|| obj.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or("?");
            construct_error(kind, id, &format!("missing '{}' field", field))
        })
}

fn optional_str(obj: &Value, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn flag(obj: &Value, field: &str, default: bool) -> bool {
    obj.get(field).and_then(|v| v.as_bool()).unwrap_or(default)
}

fn str_list(obj: &Value, field: &str) -> Vec<String> {
    obj.get(field)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// A map of property name to scalar value. Non-scalar values are rejected.
fn scalar_map(
    obj: &Value,
    field: &str,
    kind: &str,
    id: &str,
) -> Result<BTreeMap<String, Value>, InterchangeError> {
    let Some(map) = obj.get(field).and_then(|v| v.as_object()) else {
        return Ok(BTreeMap::new());
    };
    let mut out = BTreeMap::new();
    for (key, value) in map {
        if value.is_object() || value.is_array() {
            return Err(construct_error(
                kind,
                id,
                &format!("property '{}' must be a scalar", key),
            ));
        }
        out.insert(key.clone(), value.clone());
    }
    Ok(out)
}

fn parse_args(obj: &Value, kind: &str, id: &str) -> Result<Vec<ArgDecl>, InterchangeError> {
    let Some(arr) = obj.get("args").and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };
    arr.iter()
        .map(|arg| {
            let role = arg
                .get("role")
                .and_then(|v| v.as_str())
                .ok_or_else(|| construct_error(kind, id, "argument missing 'role'"))?;
            Ok(ArgDecl {
                name: optional_str(arg, "name").unwrap_or_else(|| role.to_lowercase()),
                role: role.to_string(),
                state: optional_str(arg, "state"),
            })
        })
        .collect()
}

fn parse_action_uses(obj: &Value) -> Vec<ActionUseDecl> {
    obj.get("actions")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|a| {
                    let name = a.get("name")?.as_str()?.to_string();
                    Some(ActionUseDecl {
                        name,
                        args: str_list(a, "args"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

// ── Construct parsers ───────────────────────────────────────────────

fn parse_type(obj: &Value) -> Result<TypeDecl, InterchangeError> {
    Ok(TypeDecl {
        role: required_str(obj, "Type", "role")?,
        code_type: required_str(obj, "Type", "type")?,
        base: optional_str(obj, "base"),
    })
}

fn parse_action(obj: &Value) -> Result<ActionDecl, InterchangeError> {
    Ok(ActionDecl {
        name: required_str(obj, "Action", "name")?,
        feature: optional_str(obj, "feature"),
        side_effect: flag(obj, "side_effect", true),
    })
}

fn parse_automaton(obj: &Value) -> Result<AutomatonDecl, InterchangeError> {
    let role = required_str(obj, "Automaton", "role")?;
    let shifts = obj
        .get("shifts")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|s| {
                    let from = s
                        .get("from")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| construct_error("Automaton", &role, "shift missing 'from'"))?;
                    let to = s
                        .get("to")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| construct_error("Automaton", &role, "shift missing 'to'"))?;
                    Ok(ShiftDecl {
                        from: from.to_string(),
                        to: to.to_string(),
                        functions: str_list(s, "functions"),
                    })
                })
                .collect::<Result<Vec<_>, InterchangeError>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(AutomatonDecl {
        states: str_list(obj, "states"),
        shifts,
        role,
    })
}

fn parse_function(obj: &Value) -> Result<FunctionDecl, InterchangeError> {
    let role = required_str(obj, "Function", "role")?;
    let name = required_str(obj, "Function", "name")?;
    let id = format!("{}.{}", role, name);
    Ok(FunctionDecl {
        args: parse_args(obj, "Function", &id)?,
        actions: parse_action_uses(obj),
        is_static: flag(obj, "static", false),
        returns_value: flag(obj, "returns_value", false),
        requires: scalar_map(obj, "requires", "Function", &id)?,
        sets: scalar_map(obj, "sets", "Function", &id)?,
        role,
        name,
    })
}

fn parse_link(obj: &Value) -> Result<LinkDecl, InterchangeError> {
    Ok(LinkDecl {
        role: required_str(obj, "Link", "role")?,
        function: required_str(obj, "Link", "function")?,
        from: optional_str(obj, "from"),
        to_role: required_str(obj, "Link", "to_role")?,
        to_state: optional_str(obj, "to_state"),
    })
}

fn parse_constructor(obj: &Value) -> Result<ConstructorDecl, InterchangeError> {
    let role = required_str(obj, "Constructor", "role")?;
    Ok(ConstructorDecl {
        args: parse_args(obj, "Constructor", &role)?,
        to_state: optional_str(obj, "to_state"),
        actions: parse_action_uses(obj),
        role,
    })
}

fn parse_converter(obj: &Value) -> Result<ConverterDecl, InterchangeError> {
    Ok(ConverterDecl {
        role: required_str(obj, "Converter", "role")?,
        expression: required_str(obj, "Converter", "expression")?,
    })
}

fn parse_type_rule(obj: &Value) -> Result<TypeRuleDecl, InterchangeError> {
    let role = required_str(obj, "TypeRule", "role")?;
    Ok(TypeRuleDecl {
        when: scalar_map(obj, "when", "TypeRule", &role)?,
        code_type: required_str(obj, "TypeRule", "type")?,
        role,
    })
}
