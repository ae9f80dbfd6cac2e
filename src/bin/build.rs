//! `bin/build`: contributes the watchdog layer and declares the `faas`
//! process.
//!
//! ```sh
//! build <layers> <platform> <plan>
//! ```

use std::process::ExitCode;
use watchdog_cnb::cli::{self, BuildArgs};
use watchdog_cnb::{ReqwestClient, UNEXPECTED_ERROR};

fn main() -> ExitCode {
    cli::init_logging();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match BuildArgs::parse(&argv) {
        Ok(args) => args,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::from(UNEXPECTED_ERROR);
        }
    };

    let app_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::error!(error = %e, "reading working directory");
            return ExitCode::from(UNEXPECTED_ERROR);
        }
    };

    let client = match ReqwestClient::new() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "creating HTTP client");
            return ExitCode::from(UNEXPECTED_ERROR);
        }
    };

    ExitCode::from(cli::build(&app_dir, &args, client))
}
