//! Command handlers for the headless subcommands.

use std::io::{self, Write};

use tracing::info;

use hostdeck_core::Settings;
use hostdeck_runner::{script, CommandRunner};

use crate::actions;
use crate::cli::Commands;
use crate::context::{Context, Result};

/// Execute a headless CLI command.
pub fn execute(command: Commands, ctx: &Context) -> Result<()> {
    match command {
        Commands::Defaults => cmd_defaults(),
        Commands::Hosts => block_on(cmd_hosts(ctx)),
        Commands::Status { host } => block_on(cmd_status(ctx, &host)),
        Commands::Run { host, command } => block_on(cmd_run(ctx, &host, &command)),
        Commands::Deploy { host } => block_on(cmd_deploy(ctx, &host)),
        // The TUI is started by main.
        Commands::Tui => Ok(()),
    }
}

fn block_on<F: std::future::Future<Output = Result<()>>>(fut: F) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(fut)
}

fn cmd_defaults() -> Result<()> {
    print!("{}", Settings::default().to_toml_with_header()?);
    Ok(())
}

async fn cmd_hosts(ctx: &Context) -> Result<()> {
    let eval = ctx.evaluator()?;
    for name in ctx.host_names(&eval).await? {
        println!("{}", name);
    }
    Ok(())
}

async fn cmd_status(ctx: &Context, host: &str) -> Result<()> {
    let eval = ctx.evaluator()?;
    let target = ctx.target(&eval, host).await?;

    let runner = actions::status_runner(&ctx.settings, &target);
    println!("{}", actions::intro_line(&runner));

    let finished = runner.start();
    while runner.next_update().await.is_some() {}
    finished.await?;

    let text = script::decode(&runner.render(), |label| format!("\n==> {}", label));
    println!("{}", text.replace('\r', ""));

    finish(&runner)
}

async fn cmd_run(ctx: &Context, host: &str, command: &[String]) -> Result<()> {
    let eval = ctx.evaluator()?;
    let target = ctx.target(&eval, host).await?;

    let runner = actions::command_runner(&target, &command.join(" "));
    println!("{}", actions::intro_line(&runner));
    stream(&runner).await?;

    finish(&runner)
}

async fn cmd_deploy(ctx: &Context, host: &str) -> Result<()> {
    let eval = ctx.evaluator()?;
    let target = ctx.target(&eval, host).await?;

    let runner = actions::deploy_runner(&ctx.settings, &ctx.flake, host, &target);
    info!(host, cmd = %runner, "deploying");
    println!("{}", actions::intro_line(&runner));
    stream(&runner).await?;

    finish(&runner)
}

/// Run `runner`, copying its output to stdout as it arrives.
async fn stream(runner: &CommandRunner) -> Result<()> {
    let finished = runner.start();
    let mut stdout = io::stdout();
    let mut printed = 0;

    while runner.next_update().await.is_some() {
        let mut output = Vec::new();
        runner.copy_output_to(&mut output)?;
        if output.len() > printed {
            stdout.write_all(&output[printed..])?;
            stdout.flush()?;
            printed = output.len();
        }
    }
    println!();

    finished.await?;
    Ok(())
}

fn finish(runner: &CommandRunner) -> Result<()> {
    if runner.is_successful() {
        return Ok(());
    }

    match runner.last_error() {
        Some(err) => Err(format!("'{}' failed: {}", runner, err).into()),
        None => Err(format!("'{}' failed", runner).into()),
    }
}
