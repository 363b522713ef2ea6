//! Key bindings for the dashboard.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Something the user can ask for with a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    ScrollUp,
    ScrollDown,
    NextTab,
    Filter,
    Jump,
    Pager,
    Deploy,
    Help,
    Reboot,
    RunCommand,
    SshInto,
    Status,
    Quit,
}

/// Keys for one action plus their help text.
#[derive(Debug, Clone)]
pub struct Binding {
    pub action: Action,
    pub keys: &'static [KeyCode],
    pub key_help: &'static str,
    pub help: &'static str,
}

impl Binding {
    const fn new(
        action: Action,
        keys: &'static [KeyCode],
        key_help: &'static str,
        help: &'static str,
    ) -> Self {
        Self {
            action,
            keys,
            key_help,
            help,
        }
    }

    fn matches(&self, code: KeyCode) -> bool {
        self.keys.contains(&code)
    }
}

/// The full set of bindings.
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: Vec<Binding>,
}

impl Default for KeyMap {
    fn default() -> Self {
        use Action::*;

        Self {
            bindings: vec![
                Binding::new(Up, &[KeyCode::Char('k'), KeyCode::Up], "↑/k", "up"),
                Binding::new(Down, &[KeyCode::Char('j'), KeyCode::Down], "↓/j", "down"),
                Binding::new(Left, &[KeyCode::Char('h'), KeyCode::Left], "←/h", "prev page"),
                Binding::new(Right, &[KeyCode::Char('l'), KeyCode::Right], "→/l", "next page"),
                Binding::new(ScrollUp, &[KeyCode::PageUp], "PgUp", "scroll up"),
                Binding::new(ScrollDown, &[KeyCode::PageDown], "PgDn", "scroll down"),
                Binding::new(NextTab, &[KeyCode::Tab], "Tab", "next tab"),
                Binding::new(Filter, &[KeyCode::Char('/')], "/", "filter hosts"),
                Binding::new(Jump, &[KeyCode::Char('f')], "f", "jump to letter"),
                Binding::new(Pager, &[KeyCode::Char('p')], "p", "open pager"),
                Binding::new(Deploy, &[KeyCode::Char('d')], "d", "deploy"),
                Binding::new(Help, &[KeyCode::Char('?')], "?", "help"),
                Binding::new(Reboot, &[KeyCode::Char('r')], "r", "reboot"),
                Binding::new(RunCommand, &[KeyCode::Char('!')], "!", "run cmd"),
                Binding::new(SshInto, &[KeyCode::Char('i')], "i", "ssh into"),
                Binding::new(Status, &[KeyCode::Char('s')], "s", "get status"),
                Binding::new(Quit, &[KeyCode::Char('q')], "q", "quit"),
            ],
        }
    }
}

impl KeyMap {
    /// Action bound to `key`, ignoring control and alt chords.
    pub fn action(&self, key: &KeyEvent) -> Option<Action> {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return None;
        }

        self.bindings
            .iter()
            .find(|b| b.matches(key.code))
            .map(|b| b.action)
    }

    fn binding(&self, action: Action) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.action == action)
    }

    fn group(&self, actions: &[Action]) -> Vec<&Binding> {
        actions.iter().filter_map(|a| self.binding(*a)).collect()
    }

    /// One-line summary for the hint bar.
    pub fn short_help(&self) -> String {
        use Action::*;

        self.group(&[Up, Down, NextTab, Status, Deploy, SshInto, RunCommand, Reboot, Help])
            .iter()
            .map(|b| format!("{} {}", b.key_help, b.help))
            .collect::<Vec<_>>()
            .join(" • ")
    }

    /// Every binding, in columns of related actions.
    pub fn full_help(&self) -> Vec<Vec<&Binding>> {
        use Action::*;

        vec![
            self.group(&[Up, Down, Left, Right, ScrollUp, ScrollDown, NextTab, Jump, Filter]),
            self.group(&[Status, Deploy, SshInto, RunCommand, Reboot]),
            self.group(&[Pager, Quit, Help]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_actions() {
        let keys = KeyMap::default();
        assert_eq!(keys.action(&key(KeyCode::Char('j'))), Some(Action::Down));
        assert_eq!(keys.action(&key(KeyCode::Down)), Some(Action::Down));
        assert_eq!(keys.action(&key(KeyCode::Char('d'))), Some(Action::Deploy));
        assert_eq!(keys.action(&key(KeyCode::Tab)), Some(Action::NextTab));
        assert_eq!(keys.action(&key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn test_shifted_symbols_match() {
        let keys = KeyMap::default();
        let bang = KeyEvent::new(KeyCode::Char('!'), KeyModifiers::SHIFT);
        assert_eq!(keys.action(&bang), Some(Action::RunCommand));
    }

    #[test]
    fn test_control_chords_ignored() {
        let keys = KeyMap::default();
        let ctrl_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(keys.action(&ctrl_d), None);
    }

    #[test]
    fn test_help_covers_commands() {
        let keys = KeyMap::default();
        let short = keys.short_help();
        assert!(short.contains("d deploy"));
        assert!(short.contains("? help"));

        let full = keys.full_help();
        assert_eq!(full.len(), 3);
        assert!(full[2].iter().any(|b| b.action == Action::Quit));
    }
}
