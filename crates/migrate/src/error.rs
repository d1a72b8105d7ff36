use libswap_core::ModelError;
use libswap_route::RouteError;
use std::path::PathBuf;

/// Errors raised while migrating a project.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("no usages of library '{library}' found in '{}'", .project.display())]
    NoUsages { project: PathBuf, library: String },

    #[error("library '{library}' has no state corresponding to {state}")]
    NoCounterpart { library: String, state: String },

    #[error("cannot replay {kind} transition {transition}")]
    UnsupportedTransitionKind { kind: String, transition: String },

    #[error("no way to create a {role} in library '{library}'")]
    UnresolvableDependency { library: String, role: String },

    #[error("call site of {method} provides no value for '{property}'")]
    MissingArgument { method: String, property: String },

    #[error("initializer of field '{field}' would need statements before it")]
    FieldPreamble { field: String },

    #[error("libraries '{from}' and '{to}' model different APIs")]
    IncompatibleLibraries { from: String, to: String },

    #[error("{location}: {source}")]
    Usage {
        location: String,
        #[source]
        source: Box<MigrateError>,
    },

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("verification failed:\n{diagnostics}")]
    BuildOrTestFailure { diagnostics: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration '{}': {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl MigrateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrateError::Io {
            path: path.into(),
            source,
        }
    }

    /// The innermost error, looking through usage locations.
    pub fn root(&self) -> &MigrateError {
        match self {
            MigrateError::Usage { source, .. } => source.root(),
            other => other,
        }
    }
}
