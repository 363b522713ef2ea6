//! Event handling for the TUI.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use super::app::App;
use super::ui;
use crate::context::{Context, Result};

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode.
fn setup_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode.
fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the dashboard until the user quits.
///
/// Host names are fetched before the terminal is taken over, so a broken
/// flake is reported as a plain error.
pub fn run(ctx: &Context) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let evaluator = ctx.evaluator()?;
    let names = runtime.block_on(ctx.host_names(&evaluator))?;
    info!(hosts = names.len(), flake = %ctx.flake.display(), "starting dashboard");

    let mut app = App::new(ctx.clone(), runtime.handle().clone(), evaluator, names);

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;

    // Kills any ssh or nix children still attached to runners.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

/// Main event loop.
fn run_loop(terminal: &mut Term, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        app.tick();

        if let Some(external) = app.take_external() {
            restore_terminal(terminal)?;
            let failure = external.run_reporting();
            *terminal = setup_terminal()?;
            terminal.clear()?;
            if let Some(message) = failure {
                app.set_flash(message);
            }
        }

        if app.should_quit {
            info!("dashboard exiting");
            return Ok(());
        }
    }
}
