//! libswap-migrate: rewrite a program from one library model to another.
//!
//! For every usage of a modeled operation, the call site's receiver and
//! arguments are bound to source roles, an equivalent route is searched
//! in the destination library, and the route is replayed into code that
//! takes the usage's place.
//!
//! # Public API
//!
//! - [`migrate()`] -- copy a project, migrate every unit, verify the copy
//! - [`MigrationEngine`] -- migrate one in-memory [`SourceUnit`]
//! - [`MigrateConfig`] -- settings from `libswap.toml`
//! - [`Frontend`], [`Verifier`] -- the program-format and build/test seams

pub mod ast;
pub mod bindings;
pub mod config;
pub mod engine;
pub mod error;
pub mod frontend;
pub mod pipeline;
pub mod project;
pub mod replay;
pub mod sites;
pub mod verify;

pub use ast::{render_java, Expr, SourceUnit, Stmt};
pub use config::{MigrateConfig, CONFIG_FILE};
pub use engine::{FailurePolicy, MigrationEngine, UnitOutcome, UsageFailure};
pub use error::MigrateError;
pub use frontend::{Frontend, JsonFrontend};
pub use pipeline::{load_library, migrate, FileReport, MigrationReport};
pub use project::output_dir;
pub use verify::{CommandVerifier, SkipVerifier, Verification, Verifier};
