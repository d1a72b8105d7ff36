//! `libswap route`: run one route search and print the result.

use std::process;

use libswap_core::{Library, StateId};
use libswap_route::{RouteFinder, RouteQuery, SearchLimits};

use super::load_or_exit;
use crate::{report_error, OutputFormat};

/// Resolve `Role.State` (role paths may contain `/`).
fn parse_state(lib: &Library, text: &str) -> Result<StateId, String> {
    let (role, state) = text
        .rsplit_once('.')
        .ok_or_else(|| format!("expected Role.State, got '{}'", text))?;
    let role_id = lib
        .role_by_path(role)
        .ok_or_else(|| format!("library '{}' has no role '{}'", lib.name(), role))?;
    lib.state_by_name(role_id, state)
        .ok_or_else(|| format!("role '{}' has no state '{}'", role, state))
}

pub(crate) fn cmd_route(
    library: &str,
    required: &[String],
    goal: Option<&str>,
    starts: &[String],
    max_expansions: Option<usize>,
    output: OutputFormat,
    quiet: bool,
) {
    let lib = load_or_exit(library, output, quiet);

    let mut start = lib.init_states();
    for text in starts {
        match parse_state(&lib, text) {
            Ok(state) => {
                let role = lib.state(state).role;
                start.retain(|s| lib.state(*s).role != role);
                start.push(state);
            }
            Err(msg) => {
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        }
    }

    let mut query = RouteQuery::new(start);
    for action in required {
        query = query.require(action);
    }
    if let Some(goal) = goal {
        match parse_state(&lib, goal) {
            Ok(state) => query = query.goal(state),
            Err(msg) => {
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        }
    }

    let mut limits = SearchLimits::default();
    if let Some(n) = max_expansions {
        limits.max_expansions = n;
    }

    let route = match RouteFinder::new(&lib).with_limits(limits).find(&query) {
        Ok(r) => r,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "library": lib.name(),
                "steps": route.describe(&lib),
                "methods": route.methods(&lib),
                "explored": route.explored,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            if route.is_empty() {
                println!("(empty route)");
            }
            for (i, step) in route.describe(&lib).iter().enumerate() {
                println!("{:>3}. {}", i + 1, step);
            }
            if !quiet {
                println!("explored {} configuration(s)", route.explored);
            }
        }
    }
}
