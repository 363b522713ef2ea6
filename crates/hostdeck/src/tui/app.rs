//! TUI application state and logic.

use std::collections::HashMap;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use hostdeck_nix::{NixEvaluator, TargetInfo};
use hostdeck_pool::WorkerPool;
use hostdeck_runner::{CommandRunner, RunnerUpdate};

use super::external::External;
use super::host::{HostState, HostTab};
use super::keys::{Action, KeyMap};
use crate::actions;
use crate::context::Context;

/// How long a host must stay selected before its status is fetched.
const HOVER_DELAY: Duration = Duration::from_secs(1);

/// How long flash messages stay in the hint bar.
const FLASH_DURATION: Duration = Duration::from_secs(5);

/// Results delivered from background tasks to the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    TargetInfo { host: String, target: TargetInfo },
    /// Target lookup failed; carries the full nix error detail.
    TargetError { host: String, detail: String },
    /// No nix worker became free in time.
    PoolTimeout { host: String, detail: String },
    Runner {
        host: String,
        tab: HostTab,
        generation: u64,
        update: RunnerUpdate,
    },
}

/// Which screen is showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Hosts,
    /// Full-screen key help; any key returns.
    Help,
    /// Modal error detail; esc returns.
    Error(String),
}

/// Modal input capturing keys in the hint bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Waiting for the letter to jump to.
    JumpLetter,
    /// y/n question guarding a reboot.
    ConfirmReboot { host: String, text: String },
    /// Command line to run on a host.
    RunCommand {
        host: String,
        prompt: String,
        input: String,
    },
}

#[derive(Debug)]
struct Hover {
    host: String,
    since: Instant,
    fired: bool,
}

/// TUI application state.
pub struct App {
    ctx: Context,
    pub keys: KeyMap,
    runtime: Handle,
    evaluator: NixEvaluator,
    nix_pool: WorkerPool,
    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,

    /// Host names in flake order.
    names: Vec<String>,
    hosts: HashMap<String, HostState>,
    /// Indices into `names` currently listed.
    pub visible: Vec<usize>,
    /// Index into `visible`.
    pub selected: usize,
    pub filter: String,
    pub filtering: bool,
    matcher: SkimMatcherV2,
    hover: Option<Hover>,

    pub view_mode: ViewMode,
    pub prompt: Option<Prompt>,
    flash: Option<(String, Instant)>,
    external: Option<External>,

    /// Lines visible in the content panel, set while drawing.
    pub content_height: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(ctx: Context, runtime: Handle, evaluator: NixEvaluator, names: Vec<String>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let hosts = names
            .iter()
            .map(|n| (n.clone(), HostState::new(n.clone())))
            .collect();
        let nix_pool = ctx.nix_pool();

        let mut app = Self {
            ctx,
            keys: KeyMap::default(),
            runtime,
            evaluator,
            nix_pool,
            events_tx,
            events_rx,
            visible: (0..names.len()).collect(),
            names,
            hosts,
            selected: 0,
            filter: String::new(),
            filtering: false,
            matcher: SkimMatcherV2::default(),
            hover: None,
            view_mode: ViewMode::Hosts,
            prompt: None,
            flash: None,
            external: None,
            content_height: 0,
            should_quit: false,
        };
        app.selection_changed();
        app
    }

    // ==================== Host list ====================

    /// Name of the highlighted host.
    pub fn selected_name(&self) -> Option<&str> {
        self.visible
            .get(self.selected)
            .map(|&i| self.names[i].as_str())
    }

    pub fn selected_host(&self) -> Option<&HostState> {
        self.selected_name().and_then(|n| self.hosts.get(n))
    }

    fn selected_host_mut(&mut self) -> Option<&mut HostState> {
        let name = self.selected_name()?.to_string();
        self.hosts.get_mut(&name)
    }

    /// Names of the listed hosts, in display order.
    pub fn visible_names(&self) -> impl Iterator<Item = &str> {
        self.visible.iter().map(|&i| self.names[i].as_str())
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() - 1;
        let next = self.selected.saturating_add_signed(delta).min(last);
        if next != self.selected {
            self.selected = next;
            self.selection_changed();
        }
    }

    fn page_size(&self) -> isize {
        self.content_height.max(1) as isize
    }

    /// Restart the hover timer for the newly selected host.
    fn selection_changed(&mut self) {
        self.hover = self.selected_name().map(|host| Hover {
            host: host.to_string(),
            since: Instant::now(),
            fired: false,
        });
    }

    /// Re-rank the list against the filter text, keeping the selection if listed.
    pub fn apply_filter(&mut self) {
        let current = self.visible.get(self.selected).copied();

        if self.filter.is_empty() {
            self.visible = (0..self.names.len()).collect();
        } else {
            let mut scored: Vec<(i64, usize)> = self
                .names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    self.matcher
                        .fuzzy_match(name, &self.filter)
                        .map(|score| (score, i))
                })
                .collect();
            scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
            self.visible = scored.into_iter().map(|(_, i)| i).collect();
        }

        self.selected = current
            .and_then(|c| self.visible.iter().position(|&i| i == c))
            .unwrap_or(0);
        if self.visible.get(self.selected).copied() != current {
            self.selection_changed();
        }
    }

    /// Select the next listed host whose name starts with `letter`.
    pub fn jump_to_letter(&mut self, letter: char) {
        let letter = letter.to_ascii_lowercase();
        let count = self.visible.len();

        let found = (1..=count)
            .map(|step| (self.selected + step) % count)
            .find(|&pos| {
                self.names[self.visible[pos]]
                    .chars()
                    .next()
                    .is_some_and(|c| c.to_ascii_lowercase() == letter)
            });

        match found {
            Some(pos) if pos != self.selected => {
                self.selected = pos;
                self.selection_changed();
            }
            Some(_) => {}
            None => self.set_flash(format!("No host starting with '{}'", letter)),
        }
    }

    // ==================== Messages ====================

    pub fn set_flash(&mut self, text: impl Into<String>) {
        self.flash = Some((text.into(), Instant::now()));
    }

    pub fn clear_flash(&mut self) {
        self.flash = None;
    }

    pub fn flash(&self) -> Option<&str> {
        self.flash.as_ref().map(|(text, _)| text.as_str())
    }

    // ==================== Keys ====================

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('\\') {
            self.should_quit = true;
            return;
        }

        match &self.view_mode {
            ViewMode::Help => {
                self.view_mode = ViewMode::Hosts;
                return;
            }
            ViewMode::Error(_) => {
                if key.code == KeyCode::Esc {
                    self.view_mode = ViewMode::Hosts;
                }
                return;
            }
            ViewMode::Hosts => {}
        }

        if self.filtering {
            self.handle_filter_key(key);
            return;
        }

        if let Some(prompt) = self.prompt.take() {
            self.handle_prompt_key(prompt, key);
            return;
        }

        if ctrl && key.code == KeyCode::Char('c') {
            self.cancel_visible_runner();
            return;
        }

        if key.code == KeyCode::Esc && !self.filter.is_empty() {
            self.filter.clear();
            self.apply_filter();
            return;
        }

        let Some(action) = self.keys.action(&key) else {
            return;
        };

        match action {
            Action::Up => self.move_selection(-1),
            Action::Down => self.move_selection(1),
            Action::Left => self.move_selection(-self.page_size()),
            Action::Right => self.move_selection(self.page_size()),
            Action::ScrollUp => {
                let height = self.content_height;
                if let Some(host) = self.selected_host_mut() {
                    host.visible_panel_mut().page_up(height);
                }
            }
            Action::ScrollDown => {
                let height = self.content_height;
                if let Some(host) = self.selected_host_mut() {
                    host.visible_panel_mut().page_down(height);
                }
            }
            Action::NextTab => {
                if let Some(host) = self.selected_host_mut() {
                    host.tab = host.tab.next();
                }
            }
            Action::Filter => {
                self.filtering = true;
                self.clear_flash();
            }
            Action::Jump => {
                self.prompt = Some(Prompt::JumpLetter);
                self.clear_flash();
            }
            Action::Pager => self.open_pager(),
            Action::Deploy => self.with_selected(Self::start_deploy),
            Action::Help => self.view_mode = ViewMode::Help,
            Action::Reboot => self.with_selected(Self::confirm_reboot),
            Action::RunCommand => self.with_selected(Self::prompt_command),
            Action::SshInto => self.with_selected(Self::ssh_into),
            Action::Status => self.with_selected(Self::start_status),
            Action::Quit => self.should_quit = true,
        }
    }

    fn with_selected(&mut self, f: fn(&mut Self, &str)) {
        if let Some(name) = self.selected_name().map(str::to_string) {
            f(self, &name);
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.filtering = false;
                self.filter.clear();
                self.apply_filter();
            }
            KeyCode::Enter => self.filtering = false,
            KeyCode::Backspace => {
                self.filter.pop();
                self.apply_filter();
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Char(c) => {
                self.filter.push(c);
                self.apply_filter();
            }
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, prompt: Prompt, key: KeyEvent) {
        match prompt {
            Prompt::JumpLetter => match key.code {
                KeyCode::Char(c) if c.is_ascii_alphanumeric() => self.jump_to_letter(c),
                _ => {
                    debug!(key = ?key.code, "invalid jump letter keypress");
                    self.set_flash("Invalid jump letter key pressed");
                }
            },
            Prompt::ConfirmReboot { host, text } => match key.code {
                KeyCode::Char('y') => self.start_reboot(&host),
                KeyCode::Char('n') | KeyCode::Esc => {}
                _ => {
                    debug!(key = ?key.code, "invalid confirmation keypress");
                    self.prompt = Some(Prompt::ConfirmReboot { host, text });
                }
            },
            Prompt::RunCommand {
                host,
                prompt,
                mut input,
            } => match key.code {
                KeyCode::Esc => {}
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {}
                KeyCode::Enter => {
                    let command = input.trim();
                    if !command.is_empty() {
                        self.start_command(&host, command);
                    }
                }
                KeyCode::Backspace => {
                    input.pop();
                    self.prompt = Some(Prompt::RunCommand { host, prompt, input });
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    self.prompt = Some(Prompt::RunCommand { host, prompt, input });
                }
                _ => self.prompt = Some(Prompt::RunCommand { host, prompt, input }),
            },
        }
    }

    // ==================== Background events ====================

    /// Periodic work: drain background events, fire hover, expire flash.
    pub fn tick(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }

        if let Some(hover) = self.hover.as_mut() {
            if !hover.fired && hover.since.elapsed() >= HOVER_DELAY {
                hover.fired = true;
                let host = hover.host.clone();
                self.on_hover(&host);
            }
        }

        if self
            .flash
            .as_ref()
            .is_some_and(|(_, since)| since.elapsed() >= FLASH_DURATION)
        {
            self.flash = None;
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::TargetInfo { host, target } => self.on_target_info(&host, target),
            AppEvent::TargetError { host, detail } => {
                if let Some(state) = self.hosts.get_mut(&host) {
                    state.target_pending = false;
                }
                self.view_mode = ViewMode::Error(detail);
            }
            AppEvent::PoolTimeout { host, detail } => {
                if let Some(state) = self.hosts.get_mut(&host) {
                    state.target_pending = false;
                }
                self.set_flash(detail);
            }
            AppEvent::Runner {
                host,
                tab,
                generation,
                update,
            } => self.on_runner_update(&host, tab, generation, update),
        }
    }

    fn on_hover(&mut self, host: &str) {
        let Some(state) = self.hosts.get(host) else {
            return;
        };

        if state.target.is_none() {
            if !state.target_pending {
                self.request_target(host);
            }
            return;
        }

        if !state.status_collected {
            self.start_status(host);
        }
    }

    /// Look up a host's target info on a nix worker.
    fn request_target(&mut self, host: &str) {
        let Some(state) = self.hosts.get_mut(host) else {
            return;
        };
        state.target_pending = true;
        state.tab = HostTab::Status;
        state
            .panel_mut(HostTab::Status)
            .show_message(format!("Querying nix for information on {}", host));

        let pool = self.nix_pool.clone();
        let eval = self.evaluator.clone();
        let flake = self.ctx.flake.clone();
        let hosts = self.ctx.settings.hosts.clone();
        let timeout = self.ctx.settings.nix.worker_timeout();
        let tx = self.events_tx.clone();
        let host = host.to_string();

        self.runtime.spawn(async move {
            let worker = match pool.acquire_timeout(timeout).await {
                Ok(worker) => worker,
                Err(e) => {
                    error!(host = %host, error = %e, "failed to get nix worker");
                    let _ = tx.send(AppEvent::PoolTimeout {
                        host,
                        detail: format!("Nix busy: {}", e),
                    });
                    return;
                }
            };

            info!(host = %host, worker = %worker, "fetching target info from nix");
            let event = match eval.target_info(&flake, &host, &hosts).await {
                Ok(target) => AppEvent::TargetInfo { host, target },
                Err(e) => {
                    error!(host = %host, worker = %worker, error = %e, "failed to fetch target info");
                    AppEvent::TargetError {
                        host,
                        detail: e.to_string(),
                    }
                }
            };
            drop(worker);
            let _ = tx.send(event);
        });
    }

    fn on_target_info(&mut self, host: &str, mut target: TargetInfo) {
        target.apply_defaults(&self.ctx.settings.hosts);
        debug!(host, dest = %target.destination(), "got target info");

        let Some(state) = self.hosts.get_mut(host) else {
            return;
        };
        state.target = Some(target);
        state.target_pending = false;

        self.start_status(host);
    }

    fn on_runner_update(&mut self, host: &str, tab: HostTab, generation: u64, update: RunnerUpdate) {
        let Some(state) = self.hosts.get_mut(host) else {
            return;
        };

        let panel = state.panel_mut(tab);
        if panel.generation() != generation {
            debug!(host, ?tab, "update from replaced runner ignored");
            return;
        }
        panel.refresh();

        if tab == HostTab::Status && update.complete {
            state.status_collected = update.state.is_successful();
        }
    }

    // ==================== Actions ====================

    /// Target info for `host`, or a flash explaining it is not known yet.
    fn require_target(&mut self, host: &str) -> Option<TargetInfo> {
        let target = self.hosts.get(host).and_then(|s| s.target.clone());
        if target.is_none() {
            self.set_flash(format!("Target info for host {:?} not yet available", host));
        }
        target
    }

    /// Show `tab` and report whether a new runner may be attached to it.
    fn prepare_tab(&mut self, host: &str, tab: HostTab) -> bool {
        let Some(state) = self.hosts.get_mut(host) else {
            return false;
        };
        state.tab = tab;

        if state.panel(tab).is_busy() {
            info!(host, ?tab, "already running, ignored");
            return false;
        }
        true
    }

    pub fn start_status(&mut self, host: &str) {
        let Some(target) = self.require_target(host) else {
            return;
        };
        if !self.prepare_tab(host, HostTab::Status) {
            return;
        }

        let runner = actions::status_runner(&self.ctx.settings, &target);
        self.launch(host, HostTab::Status, runner);
    }

    pub fn start_deploy(&mut self, host: &str) {
        let Some(target) = self.require_target(host) else {
            return;
        };
        if !self.prepare_tab(host, HostTab::Deploy) {
            return;
        }

        let runner = actions::deploy_runner(&self.ctx.settings, &self.ctx.flake, host, &target);
        self.launch(host, HostTab::Deploy, runner);
    }

    pub fn start_command(&mut self, host: &str, command: &str) {
        let Some(target) = self.require_target(host) else {
            return;
        };
        if !self.prepare_tab(host, HostTab::RunCommand) {
            return;
        }

        let runner = actions::command_runner(&target, command);
        self.launch(host, HostTab::RunCommand, runner);
    }

    fn start_reboot(&mut self, host: &str) {
        let Some(target) = self.require_target(host) else {
            return;
        };
        if !self.prepare_tab(host, HostTab::RunCommand) {
            return;
        }

        let runner = actions::reboot_runner(&target);
        self.launch(host, HostTab::RunCommand, runner);
    }

    fn confirm_reboot(&mut self, host: &str) {
        if let Some(target) = self.require_target(host) {
            self.prompt = Some(Prompt::ConfirmReboot {
                host: host.to_string(),
                text: format!("Confirm reboot of {:?}? y/n:", target.deploy_host),
            });
        }
    }

    fn prompt_command(&mut self, host: &str) {
        if let Some(target) = self.require_target(host) {
            self.prompt = Some(Prompt::RunCommand {
                host: host.to_string(),
                prompt: format!("Run on {:?}: ", target.deploy_host),
                input: String::new(),
            });
        }
    }

    fn ssh_into(&mut self, host: &str) {
        if let Some(target) = self.require_target(host) {
            info!(host, "starting interactive ssh");
            self.external = Some(External::ssh(&target));
        }
    }

    /// Attach `runner` to a panel and drive it on the runtime.
    fn launch(&mut self, host: &str, tab: HostTab, runner: CommandRunner) {
        let Some(state) = self.hosts.get_mut(host) else {
            return;
        };
        let intro = actions::intro_line(&runner);
        let generation = state.panel_mut(tab).attach(runner.clone(), intro);

        let tx = self.events_tx.clone();
        let host = host.to_string();
        self.runtime.spawn(async move {
            let finished = runner.start();
            while let Some(update) = runner.next_update().await {
                let event = AppEvent::Runner {
                    host: host.clone(),
                    tab,
                    generation,
                    update,
                };
                if tx.send(event).is_err() {
                    warn!(host = %host, "dashboard gone, runner update dropped");
                    break;
                }
            }
            let _ = finished.await;
        });
    }

    fn visible_runner(&self) -> Option<&CommandRunner> {
        self.selected_host()
            .and_then(|h| h.visible_panel().runner())
    }

    pub fn cancel_visible_runner(&mut self) {
        if let Some(runner) = self.visible_runner() {
            runner.cancel();
        }
    }

    fn open_pager(&mut self) {
        let Some(runner) = self.visible_runner() else {
            self.set_flash("Pager: nothing to show");
            return;
        };

        match External::pager(&self.ctx.settings.general.pager, runner) {
            Ok(external) => self.external = Some(external),
            Err(e) => {
                error!(error = %e, "failed to prepare pager");
                self.set_flash(format!("Pager: {}", e));
            }
        }
    }

    /// Program waiting to take over the terminal, if any.
    pub fn take_external(&mut self) -> Option<External> {
        self.external.take()
    }

    #[cfg(test)]
    fn host(&self, name: &str) -> &HostState {
        &self.hosts[name]
    }
}
