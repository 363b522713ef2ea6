//! Per-host deploy target information.

use serde::{Deserialize, Serialize};

use hostdeck_core::HostSettings;
use hostdeck_runner::Destination;

/// Where and as whom a host is deployed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    /// Address ssh connects to.
    pub deploy_host: String,
    /// Login user; empty when the flake does not say.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub deploy_user: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl TargetInfo {
    /// Fill gaps from the user's host settings.
    ///
    /// A host name without a dot gets `.<default-ssh-domain>` appended when
    /// a domain is configured. An empty user becomes `default-ssh-user`.
    pub fn apply_defaults(&mut self, hosts: &HostSettings) {
        if let Some(domain) = hosts.default_ssh_domain.as_deref().filter(|d| !d.is_empty()) {
            if !self.deploy_host.contains('.') {
                self.deploy_host.push('.');
                self.deploy_host.push_str(domain);
            }
        }

        if self.deploy_user.is_empty() {
            self.deploy_user = hosts.default_ssh_user.clone();
        }
    }

    /// `[user@]host` for ssh and `--target-host`.
    pub fn ssh_target(&self) -> String {
        if self.deploy_user.is_empty() {
            self.deploy_host.clone()
        } else {
            format!("{}@{}", self.deploy_user, self.deploy_host)
        }
    }

    /// Runner destination for this host.
    pub fn destination(&self) -> Destination {
        Destination::ssh(&self.deploy_host, Some(self.deploy_user.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(domain: Option<&str>) -> HostSettings {
        HostSettings {
            default_ssh_domain: domain.map(String::from),
            ..HostSettings::default()
        }
    }

    #[test]
    fn test_decode_with_null_user() {
        let info: TargetInfo =
            serde_json::from_str(r#"{"deployHost":"web1","deployUser":null}"#).unwrap();
        assert_eq!(info.deploy_host, "web1");
        assert_eq!(info.deploy_user, "");
    }

    #[test]
    fn test_decode_with_user() {
        let info: TargetInfo =
            serde_json::from_str(r#"{"deployHost":"web1.lab","deployUser":"ops"}"#).unwrap();
        assert_eq!(info.ssh_target(), "ops@web1.lab");
    }

    #[test]
    fn test_apply_defaults_appends_domain() {
        let mut info = TargetInfo {
            deploy_host: "web1".to_string(),
            deploy_user: String::new(),
        };
        info.apply_defaults(&hosts(Some("lab.example.org")));

        assert_eq!(info.deploy_host, "web1.lab.example.org");
        assert_eq!(info.deploy_user, "root");
        assert_eq!(info.destination().to_string(), "ssh://root@web1.lab.example.org");
    }

    #[test]
    fn test_apply_defaults_keeps_qualified_host() {
        let mut info = TargetInfo {
            deploy_host: "web1.other.net".to_string(),
            deploy_user: "ops".to_string(),
        };
        info.apply_defaults(&hosts(Some("lab.example.org")));

        assert_eq!(info.deploy_host, "web1.other.net");
        assert_eq!(info.deploy_user, "ops");
    }

    #[test]
    fn test_apply_defaults_without_domain() {
        let mut info = TargetInfo {
            deploy_host: "web1".to_string(),
            deploy_user: String::new(),
        };
        info.apply_defaults(&hosts(None));
        assert_eq!(info.deploy_host, "web1");
    }
}
