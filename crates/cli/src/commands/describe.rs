//! `libswap describe` and `libswap libraries`.

use libswap_core::catalog;
use libswap_core::Library;

use super::load_or_exit;
use crate::OutputFormat;

pub(crate) fn cmd_describe(library: &str, output: OutputFormat, quiet: bool) {
    let lib = load_or_exit(library, output, quiet);
    match output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&lib).unwrap_or_default()
            );
        }
        OutputFormat::Text => print_library(&lib),
    }
}

fn print_library(lib: &Library) {
    println!("library {}", lib.name());
    for role in lib.roles() {
        let path = lib.role_path(role.id);
        match lib.resolve_type(role.id, None) {
            Ok(t) => println!("\nrole {} : {}", path, t),
            Err(_) => println!("\nrole {}", path),
        }
        let states: Vec<&str> = role
            .states
            .iter()
            .map(|s| lib.state(*s).name.as_str())
            .collect();
        println!("  states: {}", states.join(", "));
        for t in lib
            .transitions()
            .iter()
            .filter(|t| lib.state(t.src).role == role.id)
        {
            let actions: Vec<&str> = t
                .actions
                .iter()
                .map(|a| lib.action(*a).name.as_str())
                .collect();
            if actions.is_empty() {
                println!("  {}", lib.label(t.id));
            } else {
                println!("  {} [{}]", lib.label(t.id), actions.join(", "));
            }
        }
    }
}

pub(crate) fn cmd_libraries(output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let list: Vec<serde_json::Value> = catalog::LIBRARIES
                .iter()
                .map(|(family, name)| serde_json::json!({ "family": family, "name": name }))
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&list).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            for (family, name) in catalog::LIBRARIES {
                println!("{:<8} {}", family, name);
            }
        }
    }
}
