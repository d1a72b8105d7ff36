//! libswap-interchange: library declaration trees and their JSON form.
//!
//! A declaration tree describes one library as a flat list of constructs
//! (role types, actions, automata, functions, links, constructors,
//! converters and type rules). The core crate elaborates a tree into an
//! immutable `Library`; this crate only deals with the document shape.
//!
//! The single entry point is [`from_json`], which takes a
//! `serde_json::Value` and produces a [`LibraryDecl`].

pub mod deserialize;
pub mod types;

pub use deserialize::{from_json, from_str, InterchangeError};
pub use types::*;
