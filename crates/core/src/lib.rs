//! libswap-core: the role/transition model of a library API.
//!
//! A [`Library`] describes one library as a set of roles (kinds of values
//! such as a URL, a request or a logger), each with a small automaton of
//! states connected by transitions that realize concrete operations.
//!
//! # Public API
//!
//! - [`LibraryBuilder`] -- explicit, validated construction
//! - [`Library`] -- the immutable model and its lookups
//! - [`library_from_decl()`] -- build from a declaration tree
//! - [`catalog`] -- the built-in HTTP, logging and graph models
//! - [`Properties`], [`Guard`], [`PropertyEdit`] -- accumulated properties
//! - [`ModelError`] -- assembly and lookup errors

pub mod builder;
pub mod catalog;
pub mod elaborate;
pub mod error;
pub mod model;
pub mod props;

// ── Convenience re-exports ───────────────────────────────────────────

pub use builder::{LibraryBuilder, TransitionDraft};
pub use elaborate::{library_from_decl, library_from_json};
pub use error::ModelError;
pub use model::{
    Action, ActionId, AutoKind, Library, Param, Role, RoleId, State, StateId, Transition,
    TransitionId, TransitionKind, TypeRule, CONSTRUCTED, FINAL, INIT,
};
pub use props::{apply_edits, Guard, PropValue, Properties, PropertyEdit};
