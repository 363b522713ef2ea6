//! Runners for the actions hostdeck performs on a host.

use std::path::Path;

use hostdeck_core::Settings;
use hostdeck_nix::TargetInfo;
use hostdeck_runner::{script, CommandRunner};

/// Label shown for the status batch.
pub const STATUS_NAME: &str = "host status (script)";

/// Command run on the host by the reboot action.
pub const REBOOT_COMMAND: &str = "/run/current-system/sw/bin/reboot";

/// ssh options handed to nixos-rebuild.
const NIX_SSHOPTS: &str = "-T -oBatchMode=yes";

/// Remote script runner executing every configured status command.
pub fn status_runner(settings: &Settings, target: &TargetInfo) -> CommandRunner {
    let batch = script::compile(settings.commands.status_cmds.as_slice());
    CommandRunner::remote_script(
        &target.deploy_host,
        Some(target.deploy_user.as_str()),
        STATUS_NAME,
        batch,
    )
}

/// Local `nixos-rebuild switch` targeting `host`, run in the flake directory.
pub fn deploy_runner(
    settings: &Settings,
    flake: &Path,
    host: &str,
    target: &TargetInfo,
) -> CommandRunner {
    let runner = CommandRunner::local(flake, "nixos-rebuild", deploy_args(settings, host, target));
    runner.inherit_env("PATH");
    runner.set_env("NIX_SSHOPTS", NIX_SSHOPTS);
    runner
}

fn deploy_args(settings: &Settings, host: &str, target: &TargetInfo) -> Vec<String> {
    let mut args = vec![
        "--flake".to_string(),
        format!(".#{}", host),
        "--target-host".to_string(),
        target.ssh_target(),
    ];

    let build_host = &settings.nix.default_build_host;
    if !build_host.is_empty() {
        args.push("--build-host".to_string());
        args.push(build_host.clone());
    }

    args.push("switch".to_string());
    args
}

/// Remote runner for one command line, as typed by the user.
pub fn command_runner(target: &TargetInfo, command: &str) -> CommandRunner {
    CommandRunner::remote(
        &target.deploy_host,
        Some(target.deploy_user.as_str()),
        command,
        Vec::<String>::new(),
    )
}

/// Remote runner rebooting the host.
pub fn reboot_runner(target: &TargetInfo) -> CommandRunner {
    command_runner(target, REBOOT_COMMAND)
}

/// First line of a panel: what runs and where.
pub fn intro_line(runner: &CommandRunner) -> String {
    if runner.destination().is_local() {
        runner.to_string()
    } else {
        format!("{} @ {}", runner, runner.destination())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetInfo {
        TargetInfo {
            deploy_host: "web1.lab".to_string(),
            deploy_user: "root".to_string(),
        }
    }

    #[test]
    fn test_deploy_args() {
        let args = deploy_args(&Settings::default(), "web1", &target());
        assert_eq!(
            args,
            vec![
                "--flake",
                ".#web1",
                "--target-host",
                "root@web1.lab",
                "--build-host",
                "localhost",
                "switch"
            ]
        );
    }

    #[test]
    fn test_deploy_args_without_build_host() {
        let mut settings = Settings::default();
        settings.nix.default_build_host.clear();

        let args = deploy_args(&settings, "web1", &target());
        assert!(!args.iter().any(|a| a == "--build-host"));
        assert_eq!(args.last().map(String::as_str), Some("switch"));
    }

    #[test]
    fn test_deploy_runner_is_local() {
        let runner = deploy_runner(&Settings::default(), Path::new("/lab"), "web1", &target());
        assert!(runner.destination().is_local());
        assert!(runner.command_line().starts_with("nixos-rebuild --flake .#web1"));
        assert_eq!(intro_line(&runner), runner.command_line());
    }

    #[test]
    fn test_status_runner_intro() {
        let runner = status_runner(&Settings::default(), &target());
        assert_eq!(intro_line(&runner), "host status (script) @ ssh://root@web1.lab");
    }

    #[test]
    fn test_reboot_runner() {
        let runner = reboot_runner(&target());
        assert_eq!(runner.command_line(), REBOOT_COMMAND);
        assert_eq!(runner.destination().to_string(), "ssh://root@web1.lab");
    }
}
