//! stow binary entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    match stowage::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            stowage::ui::output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
