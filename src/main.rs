//! Temperature display daemon.
//!
//! Takes no arguments. Configure through `PI_TEMP_*` environment variables
//! and `RUST_LOG`. Stops on Ctrl+C or SIGTERM.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use pi_temp_display::hw::ButtonMonitor;
use pi_temp_display::{
    Config, Controller, GpioLines, ModeSelector, PirateWeatherClient, Result, TemperatureSource,
    W1Probe,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => {
            println!("Shutting down, LEDs released");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // Claim the signals before anything slow, so an early Ctrl+C still
    // reaches the cleanup path
    let shutdown = shutdown_signal()?;

    let config = Config::from_env()?;

    // Hardware and probe problems are fatal before the loop starts
    let lines = GpioLines::open(&config.pins)?;
    let probe = W1Probe::discover(&config.probe_base)?;
    info!("Probe at {}", probe.device_file().display());

    let client = PirateWeatherClient::new(
        config.api_key.clone(),
        config.latitude,
        config.longitude,
        config.daily_api_budget,
    )?;

    let selector = Arc::new(ModeSelector::new(config.default_mode, config.debounce));
    let mut button = ButtonMonitor::new(lines.button, config.button_strategy, selector.clone());
    let source = TemperatureSource::new(probe, Box::new(client), &config);

    let mut controller = Controller::new(lines.leds, selector, source, &config);
    controller.run(&mut button, shutdown).await
}

/// Listen for SIGINT and SIGTERM. The handlers are installed immediately;
/// the returned future completes on the first signal.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Interrupted"),
            _ = terminate.recv() => info!("Terminated"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Interrupted");
    })
}
