//! TrafficCTRL - rate-limiting reverse proxy

use std::process::ExitCode;
use tracing::{error, info};
use trafficctrl::utils::logging;
use trafficctrl::{config, server};

const BANNER: &str = r#"
 _____           __  __ _       ____ _____ ____  _
|_   _| __ __ _ / _|/ _(_) ___ / ___|_   _|  _ \| |
  | || '__/ _` | |_| |_| |/ __| |     | | | |_) | |
  | || | | (_| |  _|  _| | (__| |___  | | |  _ <| |___
  |_||_|  \__,_|_| |_| |_|\___|\____| |_| |_| \_\_____|
"#;

#[tokio::main]
async fn main() -> ExitCode {
    println!("{BANNER}");
    println!(
        "{} v{} starting...\n",
        trafficctrl::NAME,
        trafficctrl::VERSION
    );

    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration, terminating process: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init(&config.logger) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to init logger, terminating process: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server::run(config).await {
        error!(error = %e, "fatal server error, terminating process");
        return ExitCode::FAILURE;
    }

    info!("traffic control stopped");
    ExitCode::SUCCESS
}
