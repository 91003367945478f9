use std::process::ExitCode;

use clap::{Arg, Command};
use rplidar_view::config::LoggingConfig;
use rplidar_view::shutdown::{self, TeardownReport};
use rplidar_view::{Config, LoopSettings, PlotWindow, RplidarSession, SessionSettings};
use rplidar_view::{Result, ShutdownContext, ShutdownSignal};

fn get_config_path() -> Option<String> {
    let matches = Command::new("LiDAR point cloud viewer.")
        .about("Reads scans from an RPLIDAR and plots them in cartesian coordinates.")
        .disable_version_flag(true)
        .arg(
            Arg::new("config")
                .help("Path to a TOML configuration file")
                .use_value_delimiter(false)
                .required(false),
        )
        .get_matches();

    matches.value_of("config").map(|path| path.to_string())
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

fn main() -> ExitCode {
    let config_path = get_config_path();
    let config = load_config(config_path.as_deref());

    let level = match &config {
        Ok(config) => config.logging.level.clone(),
        Err(_) => LoggingConfig::default().level,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let signal = ShutdownSignal::new();
    if let Err(e) = shutdown::install_interrupt_handler(&signal) {
        log::error!("{}", e);
        return ExitCode::FAILURE;
    }

    let settings = SessionSettings::from(&config.device);
    let mut session = match RplidarSession::connect_with(&config.device.port, settings) {
        Ok(session) => session,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let window = match PlotWindow::open(&config.view) {
        Ok(window) => window,
        Err(e) => {
            log::error!("{}", e);
            shutdown::release_session(&mut session, &mut TeardownReport::default());
            return ExitCode::FAILURE;
        }
    };

    log::info!("Plotting scans in cartesian coordinates. Press Ctrl-C to stop.");
    let outcome = ShutdownContext::new(session, window).run(&signal, &LoopSettings::from(&config));
    match &outcome.result {
        Ok(exit) => log::info!("Finished ({:?}).", exit),
        Err(_) => log::error!("Finished after an error."),
    }
    ExitCode::from(outcome.exit_code())
}
