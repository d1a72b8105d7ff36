//! Build-and-test check run on a migrated copy.

use serde::Serialize;
use std::path::Path;
use std::process::Command;

/// Outcome of one verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub success: bool,
    /// Captured output; empty on success.
    pub diagnostics: String,
}

impl Verification {
    pub fn passed() -> Self {
        Verification {
            success: true,
            diagnostics: String::new(),
        }
    }

    pub fn failed(diagnostics: impl Into<String>) -> Self {
        Verification {
            success: false,
            diagnostics: diagnostics.into(),
        }
    }
}

/// Checks that a migrated project still builds and passes its tests.
pub trait Verifier {
    fn verify(&self, project: &Path) -> Verification;
}

/// Accepts every project.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipVerifier;

impl Verifier for SkipVerifier {
    fn verify(&self, _project: &Path) -> Verification {
        Verification::passed()
    }
}

/// Runs a shell command in the project directory; a zero exit status
/// means success.
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    command: String,
}

impl CommandVerifier {
    pub fn new(command: impl Into<String>) -> Self {
        CommandVerifier {
            command: command.into(),
        }
    }
}

impl Verifier for CommandVerifier {
    fn verify(&self, project: &Path) -> Verification {
        tracing::info!(command = %self.command, project = %project.display(), "verifying");
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(project)
            .output();

        match output {
            Ok(out) if out.status.success() => Verification::passed(),
            Ok(out) => {
                let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&out.stderr));
                if text.trim().is_empty() {
                    text = format!(
                        "'{}' exited with code {}",
                        self.command,
                        out.status.code().unwrap_or(-1)
                    );
                }
                Verification::failed(text)
            }
            Err(e) => Verification::failed(format!("failed to run '{}': {}", self.command, e)),
        }
    }
}
