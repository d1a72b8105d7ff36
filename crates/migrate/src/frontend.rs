//! Reading and writing source units on disk.

use crate::ast::{render_java, SourceUnit};
use crate::error::MigrateError;
use std::path::{Path, PathBuf};

/// Converts between stored program text and [`SourceUnit`]s.
pub trait Frontend {
    fn parse(&self, path: &Path, text: &str) -> Result<SourceUnit, MigrateError>;

    /// Stored form of a unit, written back to the file it came from.
    fn print(&self, unit: &SourceUnit) -> Result<String, MigrateError>;

    /// A human-readable rendering written next to the unit, if any.
    fn render(&self, _unit: &SourceUnit) -> Option<String> {
        None
    }
}

/// Units stored as JSON, rendered as Java-like text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFrontend;

impl Frontend for JsonFrontend {
    fn parse(&self, path: &Path, text: &str) -> Result<SourceUnit, MigrateError> {
        serde_json::from_str(text).map_err(|e| MigrateError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn print(&self, unit: &SourceUnit) -> Result<String, MigrateError> {
        serde_json::to_string_pretty(unit).map_err(|e| MigrateError::Parse {
            path: PathBuf::from(format!("{}.unit.json", unit.class)),
            message: e.to_string(),
        })
    }

    fn render(&self, unit: &SourceUnit) -> Option<String> {
        Some(render_java(unit))
    }
}

/// `Foo.unit.json` -> `Foo.java`.
pub fn rendered_path(unit_path: &Path) -> PathBuf {
    let name = unit_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(crate::project::UNIT_SUFFIX).unwrap_or(&name);
    unit_path.with_file_name(format!("{}.java", stem))
}
