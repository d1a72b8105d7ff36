//! Whole-project migration: copy, rewrite every unit, verify.

use crate::config::MigrateConfig;
use crate::engine::{MigrationEngine, UsageFailure};
use crate::error::MigrateError;
use crate::frontend::{rendered_path, Frontend};
use crate::project::{copy_project, discover_units, output_dir};
use crate::verify::{Verification, Verifier};
use libswap_core::{catalog, library_from_json, Library};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-file summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// Path relative to the output directory.
    pub path: PathBuf,
    pub usages: usize,
}

/// Result of a whole-project migration.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub from: String,
    pub to: String,
    pub output: PathBuf,
    pub files: Vec<FileReport>,
    pub usages_migrated: usize,
    pub failures: Vec<UsageFailure>,
    pub verification: Verification,
}

impl MigrationReport {
    /// Every usage migrated and the copy verified.
    pub fn success(&self) -> bool {
        self.failures.is_empty() && self.verification.success
    }
}

/// A built-in library by name, or a JSON declaration document by path.
pub fn load_library(name_or_path: &str) -> Result<Library, MigrateError> {
    let path = Path::new(name_or_path);
    if path.extension().is_some_and(|e| e == "json") {
        let content = fs::read_to_string(path).map_err(|e| MigrateError::io(path, e))?;
        let doc: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| MigrateError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        return Ok(library_from_json(&doc)?);
    }
    Ok(catalog::by_name(name_or_path)?)
}

/// Migrate the project at `project` from `from` to `to`.
///
/// The project is copied first (to `config.output` or the default
/// location) and only the copy is rewritten. Fails when nothing in the
/// project uses `from`, when a usage fails under the all-or-nothing
/// policy, or when verification fails.
pub fn migrate(
    project: &Path,
    from: &Library,
    to: &Library,
    config: &MigrateConfig,
    frontend: &dyn Frontend,
    verifier: &dyn Verifier,
) -> Result<MigrationReport, MigrateError> {
    if let (Some(a), Some(b)) = (catalog::family_of(from.name()), catalog::family_of(to.name())) {
        if a != b {
            return Err(MigrateError::IncompatibleLibraries {
                from: from.name().to_string(),
                to: to.name().to_string(),
            });
        }
    }

    let output = config
        .output
        .clone()
        .unwrap_or_else(|| output_dir(project, from.name(), to.name()));
    copy_project(project, &output)?;
    tracing::info!(output = %output.display(), "copied project");

    let engine = MigrationEngine::new(from, to)
        .with_limits(config.limits)
        .with_policy(config.policy);

    let mut files = Vec::new();
    let mut usages_migrated = 0;
    let mut failures = Vec::new();
    for path in discover_units(&output) {
        let rel = path.strip_prefix(&output).unwrap_or(&path).to_path_buf();
        let span = tracing::info_span!("file", path = %rel.display());
        let _guard = span.enter();

        let text = fs::read_to_string(&path).map_err(|e| MigrateError::io(&path, e))?;
        let mut unit = frontend.parse(&path, &text)?;
        let outcome = engine.migrate_unit(&mut unit)?;
        failures.extend(outcome.failures.iter().cloned());
        if !outcome.touched() {
            continue;
        }

        fs::write(&path, frontend.print(&unit)?).map_err(|e| MigrateError::io(&path, e))?;
        if let Some(rendered) = frontend.render(&unit) {
            let target = rendered_path(&path);
            fs::write(&target, rendered).map_err(|e| MigrateError::io(&target, e))?;
        }
        tracing::info!(usages = outcome.migrated, "migrated file");
        usages_migrated += outcome.migrated;
        files.push(FileReport {
            path: rel,
            usages: outcome.migrated,
        });
    }

    if usages_migrated == 0 && failures.is_empty() {
        return Err(MigrateError::NoUsages {
            project: project.to_path_buf(),
            library: from.name().to_string(),
        });
    }

    let verification = verifier.verify(&output);
    if !verification.success {
        return Err(MigrateError::BuildOrTestFailure {
            diagnostics: verification.diagnostics,
        });
    }

    Ok(MigrationReport {
        from: from.name().to_string(),
        to: to.name().to_string(),
        output,
        files,
        usages_migrated,
        failures,
        verification,
    })
}
