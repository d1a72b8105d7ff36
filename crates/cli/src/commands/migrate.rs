//! `libswap migrate`: copy a project and migrate it to another library.

use std::path::Path;
use std::process;

use libswap_migrate::{
    migrate, CommandVerifier, FailurePolicy, JsonFrontend, MigrateConfig, MigrationReport,
    SkipVerifier, Verifier,
};

use super::load_or_exit;
use crate::{report_error, OutputFormat};

pub(crate) struct MigrateOptions<'a> {
    pub project: &'a Path,
    pub from: &'a str,
    pub to: &'a str,
    pub policy: Option<FailurePolicy>,
    pub out: Option<&'a Path>,
    pub verify: Option<&'a str>,
    pub max_expansions: Option<usize>,
    pub output: OutputFormat,
    pub quiet: bool,
}

pub(crate) fn cmd_migrate(opts: MigrateOptions<'_>) {
    let output = opts.output;
    let quiet = opts.quiet;

    if !opts.project.is_dir() {
        let msg = format!("project directory not found: {}", opts.project.display());
        report_error(&msg, output, quiet);
        process::exit(1);
    }

    // Flags win over libswap.toml.
    let mut config = match MigrateConfig::load(opts.project) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    if let Some(policy) = opts.policy {
        config.policy = policy;
    }
    if let Some(out) = opts.out {
        config.output = Some(out.to_path_buf());
    }
    if let Some(cmd) = opts.verify {
        config.verify = Some(cmd.to_string());
    }
    if let Some(n) = opts.max_expansions {
        config.limits.max_expansions = n;
    }

    tracing::debug!(?config, "effective configuration");

    let from = load_or_exit(opts.from, output, quiet);
    let to = load_or_exit(opts.to, output, quiet);

    let verifier: Box<dyn Verifier> = match &config.verify {
        Some(cmd) => Box::new(CommandVerifier::new(cmd.clone())),
        None => Box::new(SkipVerifier),
    };

    let report = match migrate(
        opts.project,
        &from,
        &to,
        &config,
        &JsonFrontend,
        verifier.as_ref(),
    ) {
        Ok(r) => r,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "success": report.success(),
                "report": report,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            if !quiet {
                print_report(&report);
            }
        }
    }

    if !report.success() {
        process::exit(1);
    }
}

fn print_report(report: &MigrationReport) {
    println!(
        "Migrated {} usage(s) from {} to {} in {} file(s)",
        report.usages_migrated,
        report.from,
        report.to,
        report.files.len()
    );
    for file in &report.files {
        println!("  {} ({})", file.path.display(), file.usages);
    }
    if !report.failures.is_empty() {
        println!("{} usage(s) left unchanged:", report.failures.len());
        for failure in &report.failures {
            println!("  {}: {}", failure.location, failure.error);
        }
    }
    println!("Output: {}", report.output.display());
}
