//! hostdeck entry point.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use hostdeck::cli::{Cli, Commands};
use hostdeck::{commands, tui, Context};

fn main() {
    let cli = Cli::parse();

    let result = Context::from_cli(&cli).and_then(|ctx| {
        init_logging(&cli, &ctx)?;

        match cli.command.clone() {
            None | Some(Commands::Tui) => tui::run(&ctx),
            Some(cmd) => commands::execute(cmd, &ctx),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Send tracing output to the log file; the terminal belongs to the UI.
fn init_logging(cli: &Cli, ctx: &Context) -> hostdeck::Result<()> {
    let path = match &cli.log_file {
        Some(path) => path.clone(),
        None => {
            ctx.paths.ensure_all_dirs()?;
            ctx.paths.log_file()
        }
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    log_banner(&path);
    Ok(())
}

fn log_banner(log_file: &Path) {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        log = %log_file.display(),
        "### hostdeck starting ###"
    );
}
