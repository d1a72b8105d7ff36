//! Per-project settings read from `libswap.toml`.
//!
//! ```toml
//! policy = "best-effort"
//! output = "../out"
//! verify = "make test"
//!
//! [limits]
//! max_expansions = 5000
//! ```
//!
//! Every key is optional. Command-line flags override the file.

use crate::engine::FailurePolicy;
use crate::error::MigrateError;
use libswap_route::SearchLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "libswap.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrateConfig {
    pub policy: FailurePolicy,
    pub limits: SearchLimits,
    /// Where to write the migrated copy, relative to the project.
    pub output: Option<PathBuf>,
    /// Shell command that builds and tests the migrated copy.
    pub verify: Option<String>,
}

impl MigrateConfig {
    /// Read `libswap.toml` from the project root, or the defaults when
    /// there is none.
    pub fn load(project: &Path) -> Result<Self, MigrateError> {
        let path = project.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(MigrateConfig::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| MigrateError::io(&path, e))?;
        let mut config: MigrateConfig =
            toml::from_str(&content).map_err(|e| MigrateError::Config {
                path: path.clone(),
                message: e.to_string(),
            })?;
        if let Some(output) = config.output.take() {
            config.output = Some(project.join(output));
        }
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}
