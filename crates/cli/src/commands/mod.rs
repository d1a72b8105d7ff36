pub(crate) mod describe;
pub(crate) mod migrate;
pub(crate) mod route;

use std::process;

use libswap_core::Library;

use crate::{report_error, OutputFormat};

/// Load a library by built-in name or declaration path, or exit.
pub(crate) fn load_or_exit(name_or_path: &str, output: OutputFormat, quiet: bool) -> Library {
    match libswap_migrate::load_library(name_or_path) {
        Ok(lib) => lib,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}
