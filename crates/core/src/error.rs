use libswap_interchange::InterchangeError;

/// Errors raised while assembling or querying a library model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A second Linked wrapper was attached to the same expression transition.
    #[error("transition {transition} is already wrapped by a linked transition")]
    AlreadyLinked { transition: String },

    /// Linked transitions may only wrap Call, Construct or Template transitions.
    #[error("transition {transition} does not produce an expression and cannot be linked")]
    NotExpressionTransition { transition: String },

    /// No concrete type could be resolved for a role.
    #[error("no concrete type for role '{role}' in library '{library}'")]
    MissingType { library: String, role: String },

    #[error("unknown library '{name}'")]
    UnknownLibrary { name: String },

    #[error("unknown role '{role}' in library '{library}'")]
    UnknownRole { library: String, role: String },

    #[error("unknown state '{state}' of role '{role}'")]
    UnknownState { role: String, state: String },

    #[error("unknown action '{action}'")]
    UnknownAction { action: String },

    #[error("role '{role}' declared more than once")]
    DuplicateRole { role: String },

    /// A structural check failed in `LibraryBuilder::build`.
    #[error("invalid library '{library}': {message}")]
    Invalid { library: String, message: String },

    #[error(transparent)]
    Declaration(#[from] InterchangeError),
}
