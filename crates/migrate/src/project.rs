//! The on-disk project: where the migrated copy goes, copying, and
//! finding source units.

use crate::error::MigrateError;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Source units are stored as `<Name>.unit.json`.
pub const UNIT_SUFFIX: &str = ".unit.json";

/// Default location of the migrated copy:
/// `<parent>/migrated/<name>_migrated_<from>_<to>`, reusing `<parent>` when
/// the project already sits in a `migrated` directory.
pub fn output_dir(project: &Path, from: &str, to: &str) -> PathBuf {
    let name = project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    let parent = project.parent().unwrap_or_else(|| Path::new("."));
    let leaf = format!("{}_migrated_{}_{}", name, from, to);
    if parent.file_name().is_some_and(|n| n == "migrated") {
        parent.join(leaf)
    } else {
        parent.join("migrated").join(leaf)
    }
}

/// Copy `src` to `dst`, replacing whatever was at `dst`.
pub fn copy_project(src: &Path, dst: &Path) -> Result<(), MigrateError> {
    let src_abs = fs::canonicalize(src).map_err(|e| MigrateError::io(src, e))?;
    if dst.exists() {
        let dst_abs = fs::canonicalize(dst).map_err(|e| MigrateError::io(dst, e))?;
        if src_abs.starts_with(&dst_abs) {
            return Err(MigrateError::io(
                dst,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "output directory contains the project",
                ),
            ));
        }
        fs::remove_dir_all(dst).map_err(|e| MigrateError::io(dst, e))?;
    }
    fs::create_dir_all(dst).map_err(|e| MigrateError::io(dst, e))?;
    let dst_abs = fs::canonicalize(dst).map_err(|e| MigrateError::io(dst, e))?;
    if dst_abs.starts_with(&src_abs) {
        tracing::debug!(output = %dst_abs.display(), "output directory inside project; skipping it");
    }

    for entry in WalkDir::new(&src_abs)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(&dst_abs))
        .filter_map(|e| e.ok())
    {
        let rel = entry
            .path()
            .strip_prefix(&src_abs)
            .map_err(|_| MigrateError::io(entry.path(), std::io::ErrorKind::InvalidInput.into()))?;
        let target = dst_abs.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| MigrateError::io(&target, e))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(|e| MigrateError::io(&target, e))?;
        }
    }
    Ok(())
}

/// Every source unit under `root`, sorted by path.
pub fn discover_units(root: &Path) -> Vec<PathBuf> {
    let mut units: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().ends_with(UNIT_SUFFIX))
        .map(|e| e.into_path())
        .collect();
    units.sort();
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dir_naming() {
        assert_eq!(
            output_dir(Path::new("/w/app"), "apache", "okhttp"),
            PathBuf::from("/w/migrated/app_migrated_apache_okhttp")
        );
        assert_eq!(
            output_dir(Path::new("/w/migrated/app_migrated_a_b"), "b", "c"),
            PathBuf::from("/w/migrated/app_migrated_a_b_migrated_b_c")
        );
    }

    #[test]
    fn copy_replaces_previous_output() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("app");
        fs::create_dir_all(src.join("pkg")).unwrap();
        fs::write(src.join("pkg/A.unit.json"), "{}").unwrap();
        let dst = tmp.path().join("out");
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("stale.txt"), "old").unwrap();

        copy_project(&src, &dst).unwrap();
        assert!(dst.join("pkg/A.unit.json").is_file());
        assert!(!dst.join("stale.txt").exists());
        assert_eq!(discover_units(&dst), vec![dst.join("pkg/A.unit.json")]);
    }

    #[test]
    fn output_containing_project_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("app");
        fs::create_dir_all(&src).unwrap();
        assert!(copy_project(&src, tmp.path()).is_err());
        assert!(src.exists());
    }

    #[test]
    fn output_inside_project_is_not_copied_into_itself() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("app");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("A.unit.json"), "{}").unwrap();
        let dst = src.join("out");
        copy_project(&src, &dst).unwrap();
        assert!(dst.join("A.unit.json").is_file());
        assert!(!dst.join("out").exists());
    }
}
