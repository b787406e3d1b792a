pub mod config;
pub mod controller;
pub mod dashboard;
pub mod driver;

use crate::config::{Cli, DashboardConfig};
use crate::controller::event_source::GilrsEventSource;
use crate::controller::semantic::SemanticView;
use crate::dashboard::TextRenderer;
use crate::driver::{Dashboard, DriverSettings, ShutdownReason};
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup()?;
    let cli = Cli::parse();

    let config =
        DashboardConfig::load(&cli).map_err(|e| eyre!("Failed to load configuration: {}", e))?;

    // Device failures end the process before any state is built
    let source = GilrsEventSource::open(&config.source_settings())
        .map_err(|e| eyre!("Failed to open gamepad: {}", e))?;

    let renderer = TextRenderer::new(std::io::stdout(), config.layout, config.color);
    let settings = DriverSettings {
        frame_period: config.frame_period(),
        num_axes: config.num_axes,
        num_buttons: config.num_buttons,
    };

    let reason = Dashboard::create(
        Box::new(source),
        Box::new(renderer),
        SemanticView::new(config.profile),
        settings,
    )
    .start()
    .run_until_shutdown()
    .await
    .finish();

    match reason {
        ShutdownReason::QuitEvent | ShutdownReason::Interrupted => {
            info!("Exiting dashboard ({:?})", reason);
            Ok(())
        }
        ShutdownReason::RenderFailed(message) => {
            Err(eyre!("Dashboard output failed: {}", message))
        }
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    // stderr keeps log lines out of the redrawn dashboard on stdout
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}
