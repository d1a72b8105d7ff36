//! Built-in library models.
//!
//! Libraries are grouped by family; migrating only makes sense between two
//! members of the same family because they share role paths.

pub mod graph;
pub mod http;
pub mod logging;

use crate::error::ModelError;
use crate::model::Library;

/// (family, library name) for every built-in model.
pub const LIBRARIES: &[(&str, &str)] = &[
    ("http", "java"),
    ("http", "apache"),
    ("http", "okhttp"),
    ("logging", "log4j"),
    ("logging", "slf4j"),
    ("graph", "graph1"),
    ("graph", "graph2"),
];

/// Build the built-in model called `name`.
pub fn by_name(name: &str) -> Result<Library, ModelError> {
    match name {
        "java" => http::java(),
        "apache" => http::apache(),
        "okhttp" => http::okhttp(),
        "log4j" => logging::log4j(),
        "slf4j" => logging::slf4j(),
        "graph1" => graph::graph1(),
        "graph2" => graph::graph2(),
        _ => Err(ModelError::UnknownLibrary {
            name: name.to_string(),
        }),
    }
}

/// Family of a built-in library, if it is one.
pub fn family_of(name: &str) -> Option<&'static str> {
    LIBRARIES
        .iter()
        .find(|(_, lib)| *lib == name)
        .map(|(family, _)| *family)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_builds() {
        for (_, name) in LIBRARIES {
            let lib = by_name(name).unwrap_or_else(|e| panic!("{}: {}", name, e));
            assert_eq!(lib.name(), *name);
            for role in lib.roles() {
                assert!(
                    lib.resolve_type(role.id, None).is_ok(),
                    "{} role {} has no type",
                    name,
                    lib.role_path(role.id)
                );
            }
        }
    }

    #[test]
    fn unknown_library() {
        assert!(matches!(
            by_name("curl"),
            Err(ModelError::UnknownLibrary { .. })
        ));
        assert_eq!(family_of("slf4j"), Some("logging"));
        assert_eq!(family_of("curl"), None);
    }
}
