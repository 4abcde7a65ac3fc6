//! Stillroom CLI - Local-first production tracking for craft distilleries

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = stillroom_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
