//! lanegraph binary entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    match lanegraph::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            lanegraph::ui::output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
