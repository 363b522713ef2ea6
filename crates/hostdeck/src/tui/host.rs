//! Per-host state: target info, tabs and their output panels.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

use hostdeck_nix::TargetInfo;
use hostdeck_runner::{script, CommandRunner, Segment};

pub(super) const SUBTLE: Color = Color::Indexed(241);
const LABEL_FG: Color = Color::Indexed(230);
const LABEL_BG: Color = Color::Indexed(62);

/// Tabs shown for every host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HostTab {
    #[default]
    Status,
    Deploy,
    RunCommand,
}

impl HostTab {
    pub const ALL: [HostTab; 3] = [HostTab::Status, HostTab::Deploy, HostTab::RunCommand];

    pub fn title(&self) -> &'static str {
        match self {
            HostTab::Status => "Status",
            HostTab::Deploy => "Deploy",
            HostTab::RunCommand => "Run Command",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            HostTab::Status => 0,
            HostTab::Deploy => 1,
            HostTab::RunCommand => 2,
        }
    }

    pub fn next(&self) -> HostTab {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

/// Scrollable output of one runner, plus the line introducing it.
#[derive(Debug, Default)]
pub struct Panel {
    runner: Option<CommandRunner>,
    generation: u64,
    text: Text<'static>,
    intro: String,
    offset: usize,
    /// Keep the bottom line visible as output grows.
    follow: bool,
}

impl Panel {
    pub fn runner(&self) -> Option<&CommandRunner> {
        self.runner.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn text(&self) -> &Text<'static> {
        &self.text
    }

    /// True while the panel's runner has not finished.
    pub fn is_busy(&self) -> bool {
        self.runner.as_ref().is_some_and(CommandRunner::is_running)
    }

    /// Show only `message`, detached from any runner output.
    pub fn show_message(&mut self, message: impl Into<String>) {
        self.intro = message.into();
        self.text = Text::from(Line::styled(self.intro.clone(), Style::default().fg(SUBTLE)));
        self.offset = 0;
        self.follow = true;
    }

    /// Make `runner` the panel's source, returning its generation.
    pub fn attach(&mut self, runner: CommandRunner, intro: String) -> u64 {
        self.generation += 1;
        self.runner = Some(runner);
        self.show_message(intro);
        self.generation
    }

    /// Re-render from the runner's current output.
    pub fn refresh(&mut self) {
        let Some(runner) = &self.runner else {
            return;
        };

        let mut text = render_output(&self.intro, &runner.render());
        if runner.is_complete() {
            style_status_line(&mut text, &runner.state().to_string());
        }
        self.text = text;
    }

    pub fn line_count(&self) -> usize {
        self.text.lines.len()
    }

    fn max_offset(&self, height: usize) -> usize {
        self.line_count().saturating_sub(height)
    }

    /// First visible line for a viewport of `height` lines.
    pub fn view_offset(&self, height: usize) -> usize {
        if self.follow {
            self.max_offset(height)
        } else {
            self.offset.min(self.max_offset(height))
        }
    }

    pub fn at_bottom(&self, height: usize) -> bool {
        self.view_offset(height) >= self.max_offset(height)
    }

    /// `(END)` at the bottom, otherwise the scroll position as a percentage.
    pub fn scroll_label(&self, height: usize) -> String {
        if self.at_bottom(height) {
            return "(END)".to_string();
        }
        let max = self.max_offset(height).max(1);
        format!("{}%", self.view_offset(height) * 100 / max)
    }

    pub fn page_up(&mut self, height: usize) {
        self.offset = self.view_offset(height).saturating_sub(height.max(1));
        self.follow = false;
    }

    pub fn page_down(&mut self, height: usize) {
        self.offset = self.view_offset(height) + height.max(1);
        self.follow = self.offset >= self.max_offset(height);
    }
}

/// Everything the dashboard knows about one host.
#[derive(Debug)]
pub struct HostState {
    pub name: String,
    pub target: Option<TargetInfo>,
    /// A target info lookup is in flight.
    pub target_pending: bool,
    /// Status ran successfully at least once; hovering no longer triggers it.
    pub status_collected: bool,
    pub tab: HostTab,
    status: Panel,
    deploy: Panel,
    run_command: Panel,
}

impl HostState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            target_pending: false,
            status_collected: false,
            tab: HostTab::Status,
            status: Panel::default(),
            deploy: Panel::default(),
            run_command: Panel::default(),
        }
    }

    pub fn panel(&self, tab: HostTab) -> &Panel {
        match tab {
            HostTab::Status => &self.status,
            HostTab::Deploy => &self.deploy,
            HostTab::RunCommand => &self.run_command,
        }
    }

    pub fn panel_mut(&mut self, tab: HostTab) -> &mut Panel {
        match tab {
            HostTab::Status => &mut self.status,
            HostTab::Deploy => &mut self.deploy,
            HostTab::RunCommand => &mut self.run_command,
        }
    }

    pub fn visible_panel(&self) -> &Panel {
        self.panel(self.tab)
    }

    pub fn visible_panel_mut(&mut self) -> &mut Panel {
        self.panel_mut(self.tab)
    }
}

fn label_style() -> Style {
    Style::default()
        .fg(LABEL_FG)
        .bg(LABEL_BG)
        .add_modifier(Modifier::BOLD)
}

/// Intro line followed by the decoded output, with labels styled.
pub fn render_output(intro: &str, raw: &str) -> Text<'static> {
    let cleaned = raw.replace('\r', "");
    let mut lines = vec![Line::styled(intro.to_string(), Style::default().fg(SUBTLE))];
    let mut current: Vec<Span<'static>> = Vec::new();

    for segment in script::segments(&cleaned) {
        match segment {
            Segment::Text(text) => {
                let mut parts = text.split('\n');
                if let Some(first) = parts.next().filter(|p| !p.is_empty()) {
                    current.push(Span::raw(first.to_string()));
                }
                for part in parts {
                    lines.push(Line::from(std::mem::take(&mut current)));
                    if !part.is_empty() {
                        current.push(Span::raw(part.to_string()));
                    }
                }
            }
            Segment::Label(label) => {
                if !current.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current)));
                }
                // Blank line above each label.
                lines.push(Line::default());
                current.push(Span::styled(
                    format!(" {} ", label.replace('\n', " ")),
                    label_style(),
                ));
            }
        }
    }

    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    Text::from(lines)
}

/// Dim the trailing `[Done]`/`[Failed]` line.
fn style_status_line(text: &mut Text<'static>, status: &str) {
    if let Some(last) = text.lines.last_mut() {
        let content: String = last.spans.iter().map(|s| s.content.as_ref()).collect();
        if content == status {
            *last = Line::styled(content, Style::default().fg(SUBTLE));
        }
    }
}
