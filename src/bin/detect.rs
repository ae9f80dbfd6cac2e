//! `bin/detect`: passes when the application root contains `watchdog.toml`.
//!
//! ```sh
//! detect <platform> <plan>
//! ```

use std::process::ExitCode;
use watchdog_cnb::UNEXPECTED_ERROR;
use watchdog_cnb::cli;

fn main() -> ExitCode {
    cli::init_logging();

    let app_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::error!(error = %e, "reading working directory");
            return ExitCode::from(UNEXPECTED_ERROR);
        }
    };

    ExitCode::from(cli::detect(&app_dir))
}
