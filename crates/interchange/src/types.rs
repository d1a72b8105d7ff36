//! Typed structs for a library declaration tree.
//!
//! Property values (guards, property edits, type-rule conditions) are kept
//! as `serde_json::Value` scalars; the elaborator converts them into the
//! model's own value type and rejects anything that is not a scalar.

use serde::Serialize;
use std::collections::BTreeMap;

/// A whole library declaration.
#[derive(Debug, Clone, Serialize, Default)]
pub struct LibraryDecl {
    /// Library name (e.g. "okhttp").
    pub name: String,
    pub types: Vec<TypeDecl>,
    pub actions: Vec<ActionDecl>,
    pub automata: Vec<AutomatonDecl>,
    pub functions: Vec<FunctionDecl>,
    pub links: Vec<LinkDecl>,
    pub constructors: Vec<ConstructorDecl>,
    pub converters: Vec<ConverterDecl>,
    pub type_rules: Vec<TypeRuleDecl>,
}

impl LibraryDecl {
    /// Look up a function declaration by owning role and name.
    pub fn function(&self, role: &str, name: &str) -> Option<&FunctionDecl> {
        self.functions
            .iter()
            .find(|f| f.role == role && f.name == name)
    }
}

// ── Type ────────────────────────────────────────────────────────────

/// Declares a role and the concrete type it materializes as.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TypeDecl {
    pub role: String,
    pub code_type: String,
    /// Base role when this role is a variant of another one.
    pub base: Option<String>,
}

// ── Action ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActionDecl {
    pub name: String,
    pub feature: Option<String>,
    pub side_effect: bool,
}

// ── Automaton ───────────────────────────────────────────────────────

/// States and shifts of one role.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AutomatonDecl {
    pub role: String,
    /// Extra named states beyond the canonical Init/Constructed/Final.
    pub states: Vec<String>,
    pub shifts: Vec<ShiftDecl>,
}

/// A shift realised by one or more functions. `to == "self"` loops back
/// to `from`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShiftDecl {
    pub from: String,
    pub to: String,
    pub functions: Vec<String>,
}

impl ShiftDecl {
    /// Destination state name with the `self` shorthand resolved.
    pub fn target(&self) -> &str {
        if self.to == "self" {
            &self.from
        } else {
            &self.to
        }
    }
}

// ── Function ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionDecl {
    pub role: String,
    pub name: String,
    pub args: Vec<ArgDecl>,
    pub actions: Vec<ActionUseDecl>,
    pub is_static: bool,
    /// Whether callers consume the returned value.
    pub returns_value: bool,
    /// Guard: every listed property must equal the given value.
    pub requires: BTreeMap<String, serde_json::Value>,
    /// Property edits applied when the function is called.
    pub sets: BTreeMap<String, serde_json::Value>,
}

/// An entity argument: the value of `role` in `state` (default Constructed).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArgDecl {
    pub name: String,
    pub role: String,
    pub state: Option<String>,
}

/// An action performed by a function; `args` are the property names the
/// call-site literals are recorded under.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActionUseDecl {
    pub name: String,
    pub args: Vec<String>,
}

// ── Link / Constructor / Converter ──────────────────────────────────

/// Binds the result of `role.function` as `to_role` in `to_state`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LinkDecl {
    pub role: String,
    pub function: String,
    /// Source state of the wrapped call when no shift declares it.
    pub from: Option<String>,
    pub to_role: String,
    pub to_state: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConstructorDecl {
    pub role: String,
    pub args: Vec<ArgDecl>,
    pub to_state: Option<String>,
    pub actions: Vec<ActionUseDecl>,
}

/// A code template producing `role`; `<Role>` placeholders name slots.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConverterDecl {
    pub role: String,
    pub expression: String,
}

// ── Type rule ───────────────────────────────────────────────────────

/// `role` materializes as `code_type` when all `when` properties match.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TypeRuleDecl {
    pub role: String,
    pub when: BTreeMap<String, serde_json::Value>,
    pub code_type: String,
}
