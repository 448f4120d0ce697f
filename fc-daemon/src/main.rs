//! fanctrl Daemon (fanctrld)
//!
//! Switches a fan on a GPIO line by temperature, with a hysteresis band and
//! a minimum dwell time between transitions, and publishes its state on a
//! read-only HTTP endpoint.
//!
//! # Lifecycle
//! - **Startup**: config is loaded (failsafe defaults on any problem), the GPIO
//!   line is claimed and driven OFF, the status port is bound
//! - **Run**: the control loop and the status server share one snapshot cell
//! - **Shutdown**: SIGINT/SIGTERM stop both tasks and the fan is driven OFF
//!
//! Only an unusable GPIO line or status port stops the daemon at startup.
//! Sensor and actuation failures at runtime are logged and retried.

mod control_loop;
mod server;
mod shutdown;

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::builder::FalseyValueParser;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use fc_core::constants::{defaults, env, paths};
use fc_core::{
    CdevLine, FanConfig, FanLine, FanState, FanctrlError, GpioActuator, MockLine, Snapshot,
    SnapshotCell, ThermalZoneSensor,
};

use control_loop::{format_context, ControlLoop};

/// Daemon version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "fanctrld", version, about = "Hysteresis fan control daemon")]
struct Cli {
    /// TOML configuration file
    #[arg(env = env::CONFIG, default_value = paths::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Port of the HTTP status endpoint
    #[arg(long, env = env::STATUS_PORT, default_value_t = defaults::STATUS_PORT)]
    status_port: u16,

    /// Address the status endpoint binds to
    #[arg(long, env = env::BIND, default_value = defaults::BIND_ADDR)]
    bind: IpAddr,

    /// Drive an in-memory line instead of /dev/gpiochipN
    #[arg(long, env = env::MOCK_GPIO, value_parser = FalseyValueParser::new())]
    mock_gpio: bool,

    /// tracing filter directive, e.g. "info" or "fanctrl::reading=warn,info"
    #[arg(long, env = env::LOG, default_value = defaults::LOG_LEVEL)]
    log_level: String,
}

// ============================================================================
// Startup Helpers
// ============================================================================

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC at {}: {}", location, message);
    }));
}

/// Log to the systemd journal when available, stdout otherwise
fn init_logging(filter: &str) -> &'static str {
    if Path::new(paths::JOURNALD_SOCKET).exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                use tracing_subscriber::prelude::*;
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(tracing_subscriber::EnvFilter::new(filter))
                    .init();
                return "systemd journal";
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .init();
    "stdout"
}

/// Load and sanitize the config; never fails
fn load_configuration(path: &Path) -> FanConfig {
    let config = fc_core::load_config(path).unwrap_or_else(|e| {
        match e {
            FanctrlError::FileNotFound(_) => {
                warn!("STARTUP: Config {} not found, using failsafe defaults", path.display())
            }
            e => warn!(
                "STARTUP: Failed to load config {}: {} - using failsafe defaults",
                path.display(),
                e
            ),
        }
        FanConfig::default()
    });

    let (config, issues) = config.sanitized();
    for issue in &issues {
        warn!("STARTUP: {} - default applied", issue);
    }
    config
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    // PHASE 0: Panic hook
    install_panic_hook();

    // PHASE 1: Arguments (clap exits on its own for --help, --version and bad input)
    let cli = Cli::parse();

    // PHASE 2: Logging
    let sink = init_logging(&cli.log_level);
    info!("STARTUP: fanctrld {} starting", VERSION);
    info!("STARTUP: Logging to {}", sink);

    match run(cli).await {
        Ok(()) => {
            info!("SHUTDOWN: Daemon terminated gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("FATAL: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // PHASE 3: Configuration
    let config = load_configuration(&cli.config);
    info!(
        "STARTUP: chip={} pin={} active_high={} poll={}s min_switch={}s {}",
        config.gpio_chip,
        config.gpio_pin,
        config.active_high,
        config.poll_interval_s,
        config.min_switch_s,
        format_context(&config.controller(), None)
    );

    // PHASE 4: Claim the GPIO line, already at the OFF level
    let initial_high = FanState::Off.line_level(config.active_high);
    let addr = SocketAddr::new(cli.bind, cli.status_port);

    if cli.mock_gpio {
        warn!("STARTUP: Mock GPIO enabled - the fan line is not driven");
        let line = MockLine::new(config.gpio_pin, initial_high);
        operate(config, line, addr).await
    } else {
        let chip = config.gpio_chip_path();
        let line = CdevLine::open(&chip, config.gpio_pin, initial_high).with_context(|| {
            format!("GPIO setup failed (chip={} pin={})", chip.display(), config.gpio_pin)
        })?;
        operate(config, line, addr).await
    }
}

async fn operate<L>(config: FanConfig, line: L, addr: SocketAddr) -> anyhow::Result<()>
where
    L: FanLine + Send + 'static,
{
    let mut actuator = GpioActuator::new(line, config.active_high);
    match actuator.set(FanState::Off).and_then(|_| actuator.state()) {
        Ok(state) => info!("STARTUP: Fan line reads back {}", state),
        Err(e) => warn!("STARTUP: Could not drive fan OFF: {}", e),
    }

    // PHASE 5: Failsafe snapshot, visible before the first tick
    let snapshots = Arc::new(SnapshotCell::new(Snapshot::failsafe(
        config.temp_on_c,
        config.temp_off_c,
        VERSION,
    )));

    // PHASE 6: Status listener
    let listener = server::bind(addr)
        .await
        .context("Status server setup failed")?;

    // PHASE 7: Signal handlers
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let signal_tx = Arc::clone(&shutdown_tx);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("SIGNAL: Received SIGINT/SIGTERM - initiating shutdown");
        signal_tx.send_replace(true);
    }) {
        warn!("Failed to set signal handler: {}. Shutdown via signals may not work cleanly.", e);
    }

    // PHASE 8: Control loop
    let sensor = ThermalZoneSensor::new(&config.temp_path);
    info!("STARTUP: Reading temperature from {}", sensor.path().display());
    let control = ControlLoop::new(&config, sensor, actuator, Arc::clone(&snapshots), VERSION);
    let control_handle = tokio::spawn(control.run(shutdown_rx.clone()));

    // PHASE 9: Status server, runs until shutdown
    let served = server::serve(listener, snapshots, shutdown_rx).await;

    // PHASE 10: Stop the control loop (drives the fan OFF)
    shutdown_tx.send_replace(true);
    if let Err(e) = control_handle.await {
        error!("SHUTDOWN: Control loop task failed: {}", e);
    }

    served.context("Status server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_malformed_config_yields_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[fan\ntemp_on_c = 70.0").unwrap();

        let config = load_configuration(file.path());
        assert_eq!(config, FanConfig::default());
    }

    #[test]
    fn test_missing_config_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_configuration(&dir.path().join("config.toml"));
        assert_eq!(config, FanConfig::default());
    }

    #[test]
    fn test_loaded_config_is_sanitized() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[fan]\ngpio_pin = 12\ntemp_on_c = 40.0\ntemp_off_c = 50.0\npoll_interval_s = -1.0"
        )
        .unwrap();

        let config = load_configuration(file.path());
        assert_eq!(config.gpio_pin, 12);
        assert_eq!(config.temp_on_c, defaults::TEMP_ON_C);
        assert_eq!(config.temp_off_c, defaults::TEMP_OFF_C);
        assert_eq!(config.poll_interval_s, defaults::POLL_INTERVAL_S);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["fanctrld"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(paths::DEFAULT_CONFIG_PATH));
        assert_eq!(cli.status_port, defaults::STATUS_PORT);
        assert!(!cli.mock_gpio);
    }
}
