mod app;

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::error;

fn main() -> ExitCode {
    let cli_config = std::env::args_os().nth(1).map(PathBuf::from);
    match app::build_app(cli_config) {
        Ok(wiring) => app::run(wiring),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
