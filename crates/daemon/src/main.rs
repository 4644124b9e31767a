// SPDX-License-Identifier: MIT

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match scriptmesh_daemon::Config::load(std::env::args()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("smd: {e}");
            return ExitCode::FAILURE;
        }
    };

    scriptmesh_daemon::init_logging(&config.log_level);

    match scriptmesh_daemon::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}
