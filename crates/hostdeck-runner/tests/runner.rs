//! Integration tests for running real local processes.

use std::time::Duration;

use hostdeck_runner::{script, CommandRunner, RunState, RunnerUpdate, INTERRUPT_MARKER};

fn have(program: &str) -> bool {
    which::which(program).is_ok()
}

/// Collect every update until the runner closes.
async fn drain(runner: &CommandRunner) -> Vec<RunnerUpdate> {
    let mut updates = Vec::new();
    while let Some(update) = runner.next_update().await {
        updates.push(update);
    }
    updates
}

#[tokio::test]
async fn test_output_arrives_incrementally() {
    if !have("sh") || !have("sleep") {
        return;
    }

    let runner = CommandRunner::local(
        ".",
        "sh",
        ["-c", "printf A; sleep 0.3; printf B; sleep 0.3"],
    );
    let finished = runner.start();
    assert!(runner.is_running());

    let updates = drain(&runner).await;
    assert!(updates.len() >= 2, "expected several updates, got {:?}", updates);
    assert!(!updates[0].complete);
    assert!(!updates[1].complete);

    let last = updates.last().unwrap();
    assert!(last.complete);
    assert_eq!(last.state, RunState::Done);
    assert_eq!(updates.iter().filter(|u| u.complete).count(), 1);

    assert_eq!(runner.render(), "AB\n[Done]");
    assert_eq!(finished.await.unwrap().state, RunState::Done);
    assert!(runner.is_successful());
    assert!(runner.last_error().is_none());
}

#[tokio::test]
async fn test_nonzero_exit_fails() {
    if !have("sh") {
        return;
    }

    let runner = CommandRunner::local(".", "sh", ["-c", "echo oops >&2; exit 3"]);
    let update = runner.start().await.unwrap();
    assert_eq!(update.state, RunState::Failed);

    let err = runner.last_error().expect("failed runner has an error");
    assert_eq!(err.exit_code(), Some(3));
    assert!(!err.is_canceled());

    drain(&runner).await;
    assert_eq!(runner.render(), "oops\n\n[Failed]");
    assert!(!runner.is_successful());
    assert!(runner.is_complete());
}

#[tokio::test]
async fn test_cancel_running_process() {
    if !have("sleep") {
        return;
    }

    let runner = CommandRunner::local(".", "sleep", ["30"]);
    let finished = runner.start();

    tokio::time::sleep(Duration::from_millis(100)).await;
    runner.cancel();

    let update = tokio::time::timeout(Duration::from_secs(5), finished)
        .await
        .expect("canceled runner should finish promptly")
        .unwrap();
    assert_eq!(update.state, RunState::Failed);
    assert!(runner.last_error().unwrap().is_canceled());

    drain(&runner).await;
    assert_eq!(runner.render(), format!("{}\n[Failed]", INTERRUPT_MARKER));
}

#[tokio::test]
async fn test_explicit_env_replaces_inherited() {
    if !have("sh") {
        return;
    }

    std::env::set_var("HOSTDECK_TEST_PARENT_VAR", "from-parent");

    let runner = CommandRunner::local(
        ".",
        "/bin/sh",
        ["-c", "printf '%s:%s' \"$FOO\" \"${HOSTDECK_TEST_PARENT_VAR:-unset}\""],
    );
    runner.set_env("FOO", "bar");
    runner.start().await.unwrap();

    assert_eq!(runner.render(), "bar:unset");
}

#[tokio::test]
async fn test_inherit_env_copies_parent_value() {
    if !have("sh") {
        return;
    }

    std::env::set_var("HOSTDECK_TEST_INHERITED", "kept");

    let runner = CommandRunner::local(
        ".",
        "/bin/sh",
        ["-c", "printf '%s' \"$HOSTDECK_TEST_INHERITED\""],
    );
    runner.inherit_env("HOSTDECK_TEST_INHERITED");
    runner.start().await.unwrap();

    assert_eq!(runner.render(), "kept");
}

#[tokio::test]
async fn test_local_script_labels_round_trip() {
    if !have("bash") {
        return;
    }

    let batch = script::compile(&["echo one", "echo two"]);
    let runner = CommandRunner::local_script(".", "two echoes", batch);
    assert_eq!(runner.command_line(), "two echoes");

    let update = runner.start().await.unwrap();
    assert_eq!(update.state, RunState::Done);

    let text = script::decode(&runner.render(), |label| format!("<{}>", label));
    assert_eq!(text, "<echo one>\none\n<echo two>\ntwo\n");
}

#[tokio::test]
async fn test_start_twice_is_harmless() {
    if !have("true") {
        return;
    }

    let runner = CommandRunner::local(".", "true", Vec::<String>::new());
    runner.start().await.unwrap();

    let again = runner.start().await.unwrap();
    assert_eq!(again.state, RunState::Done);
    assert_eq!(runner.render(), "");
}

#[tokio::test]
async fn test_working_directory() {
    if !have("pwd") {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let expected = dir.path().canonicalize().unwrap();

    let runner = CommandRunner::local(dir.path(), "pwd", ["-P"]);
    runner.start().await.unwrap();

    assert_eq!(runner.render().trim_end(), expected.to_string_lossy());
}

#[tokio::test]
async fn test_single_final_update_carries_status_line() {
    if !have("sh") || !have("sleep") {
        return;
    }

    // The exit arrives while the caller is parked, with no output after it.
    let runner = CommandRunner::local(".", "sh", ["-c", "printf A; sleep 0.2"]);
    let finished = runner.start();

    let mut complete = 0;
    while let Some(update) = runner.next_update().await {
        if update.complete {
            complete += 1;
            assert_eq!(runner.render(), "A\n[Done]");
        }
    }

    assert_eq!(complete, 1);
    assert_eq!(runner.render(), "A\n[Done]");
    finished.await.unwrap();
}

#[tokio::test]
async fn test_cancel_after_completion_is_ignored() {
    if !have("true") {
        return;
    }

    let runner = CommandRunner::local(".", "true", Vec::<String>::new());
    runner.start().await.unwrap();
    drain(&runner).await;
    assert_eq!(runner.render(), "\n[Done]");

    runner.cancel();
    assert_eq!(runner.render(), "\n[Done]");
    assert!(runner.is_successful());
}
