mod app;
mod cli;
mod config;
mod console;
mod effects;
mod view;

use anyhow::Context;
use clap::Parser;
use fuzzwatch_engine::ConnectionHandle;
use log::LevelFilter;
use watch_logging::watch_info;

use crate::app::App;
use crate::cli::Cli;
use crate::config::AppConfig;
use crate::effects::EffectRunner;
use crate::view::TerminalView;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let loaded = config::load(&cli.config)?;
    let from_file = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    config.apply_cli(&cli);

    watch_logging::initialize(config.log, LevelFilter::Info, &config.log_file);
    if !from_file {
        watch_info!("No config at {}; using defaults", cli.config.display());
    }

    let settings = config
        .connection_settings()
        .with_context(|| format!("invalid server url {}", config.url))?;
    watch_info!("Watching {}", settings.url);

    let runner = EffectRunner::new(ConnectionHandle::new(settings));
    let view = TerminalView::new(std::io::stdout());
    App::new(
        runner,
        view,
        console::spawn_stdin_reader(),
        config.poll_interval(),
    )
    .run();
    Ok(())
}
