//! hotreload - live-reload development server.

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::Cli;
use hotreload::config::ConfigFile;
use hotreload::logger::{Logger, TerminalLogger};
use hotreload::serve::{DevServer, install_shutdown_handler};
use hotreload::{ReloadEngine, debug, log};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let logger: Arc<dyn Logger> = Arc::new(TerminalLogger::new(cli.verbose));

    let mut config = ConfigFile::load_or_default(&cli.config, &*logger)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    cli.apply(&mut config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let engine = runtime
        .block_on(ReloadEngine::start_with_logger(
            &config.reload,
            Arc::clone(&logger),
        ))
        .map_err(|e| anyhow::anyhow!(hotreload::logger::error_chain(&e)))?;
    let engine = Arc::new(engine);
    debug!(logger; "serve"; "templates: {}", engine.template_names().join(", "));

    let server = DevServer::bind(
        config.serve.interface,
        config.serve.port,
        Arc::clone(&engine),
        Arc::clone(&logger),
    )?;
    let shutdown = install_shutdown_handler(server.server(), Arc::clone(&logger))?;

    let result = server.run(Some(shutdown));

    runtime.block_on(engine.stop());
    log!(logger; "serve"; "bye");
    result
}
