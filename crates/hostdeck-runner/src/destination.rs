//! Where a runner executes.

use std::fmt;

/// Execution target of a runner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// The local machine.
    Local,
    /// A remote host reached over ssh.
    Ssh {
        /// Login user, if any.
        user: Option<String>,
        /// Host name or address.
        host: String,
    },
}

impl Destination {
    /// Remote destination. An empty `user` means "no explicit user".
    pub fn ssh(host: impl Into<String>, user: Option<&str>) -> Self {
        Destination::Ssh {
            user: user.filter(|u| !u.is_empty()).map(str::to_string),
            host: host.into(),
        }
    }

    /// True for [`Destination::Local`].
    pub fn is_local(&self) -> bool {
        matches!(self, Destination::Local)
    }

    /// Argument passed to ssh: `[user@]host`. `None` for local.
    pub fn ssh_target(&self) -> Option<String> {
        match self {
            Destination::Local => None,
            Destination::Ssh { user: Some(user), host } => Some(format!("{}@{}", user, host)),
            Destination::Ssh { user: None, host } => Some(host.clone()),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ssh_target() {
            None => f.write_str("local"),
            Some(target) => write!(f, "ssh://{}", target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_display() {
        assert_eq!(Destination::Local.to_string(), "local");
        assert!(Destination::Local.ssh_target().is_none());
    }

    #[test]
    fn test_ssh_with_user() {
        let dest = Destination::ssh("web1.lab", Some("root"));
        assert_eq!(dest.to_string(), "ssh://root@web1.lab");
        assert_eq!(dest.ssh_target().as_deref(), Some("root@web1.lab"));
    }

    #[test]
    fn test_ssh_empty_user_is_absent() {
        let dest = Destination::ssh("web1", Some(""));
        assert_eq!(dest.to_string(), "ssh://web1");
        assert_eq!(dest.ssh_target().as_deref(), Some("web1"));
    }
}
