//! Launching real subprocesses through the Git command builder.
#![cfg(unix)]

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use workhorse::git::{git_command, CommandFactory, GitInvocation, KillSignal, SystemCommandFactory};

/// Ignores the requested program and runs `sh -c <script>` instead.
struct Shell(String);

impl CommandFactory for Shell {
    fn command(&self, _program: &str, _args: &[String]) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.0);
        cmd
    }
}

#[tokio::test]
async fn test_child_sees_only_whitelisted_environment() {
    std::env::set_var("WORKHORSE_TEST_SECRET", "do-not-leak");

    let inv = GitInvocation::new("env", Vec::<String>::new())
        .gl_id("user-77")
        .gl_repository("project-3");
    let mut cmd = git_command(&SystemCommandFactory, &inv);
    cmd.as_command_mut().stdout(Stdio::piped());

    let output = cmd
        .spawn()
        .unwrap()
        .output_with_timeout(Duration::from_secs(10))
        .await
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut keys: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_once('=').map(|(k, _)| k))
        .collect();
    keys.sort_unstable();

    assert_eq!(
        keys,
        vec!["GL_ID", "GL_PROTOCOL", "GL_REPOSITORY", "HOME", "LD_LIBRARY_PATH", "PATH"]
    );
    assert!(stdout.contains("GL_ID=user-77\n"));
    assert!(stdout.contains("GL_PROTOCOL=http\n"));
    assert!(!stdout.contains("do-not-leak"));
}

#[tokio::test]
async fn test_child_leads_its_own_process_group() {
    let inv = GitInvocation::new("git", ["upload-pack"]);
    let mut process = git_command(&Shell("sleep 30".to_string()), &inv).spawn().unwrap();

    let pgid = process.pgid().unwrap();
    let child_group = unsafe { libc::getpgid(pgid as libc::pid_t) };
    let own_group = unsafe { libc::getpgid(0) };
    assert_eq!(child_group, pgid as libc::pid_t);
    assert_ne!(child_group, own_group);

    process.kill_group(KillSignal::Kill).unwrap();
    let status = tokio::time::timeout(Duration::from_secs(5), process.wait())
        .await
        .expect("child survived group kill")
        .unwrap();
    assert!(!status.success());
}

#[tokio::test]
async fn test_group_kill_reaches_grandchildren() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("grandchild.pid");
    let script = format!("sleep 30 & echo $! > {}; wait", marker.display());

    let inv = GitInvocation::new("git", ["gc"]);
    let mut process = git_command(&Shell(script), &inv).spawn().unwrap();

    let grandchild: libc::pid_t = loop {
        if let Ok(pid) = std::fs::read_to_string(&marker) {
            if let Ok(pid) = pid.trim().parse() {
                break pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    process.kill_group(KillSignal::Kill).unwrap();
    let _ = tokio::time::timeout(Duration::from_secs(5), process.wait()).await;

    // Reparented to init; a zombie awaiting reaping counts as gone.
    let mut gone = false;
    for _ in 0..100 {
        if !is_running(grandchild) {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(gone, "grandchild {grandchild} survived process group kill");
}

#[tokio::test]
async fn test_group_kill_after_leader_exit_reaches_background_child() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("background.pid");
    let script = format!("sleep 30 & echo $! > {}", marker.display());

    let inv = GitInvocation::new("git", ["daemon"]);
    let mut process = git_command(&Shell(script), &inv).spawn().unwrap();
    let pgid = process.pgid().unwrap();

    let status = tokio::time::timeout(Duration::from_secs(5), process.wait())
        .await
        .expect("leader did not exit")
        .unwrap();
    assert!(status.success());
    assert_eq!(process.pgid(), Some(pgid));

    let background: libc::pid_t = std::fs::read_to_string(&marker)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(is_running(background));

    process.kill_group(KillSignal::Kill).unwrap();

    let mut gone = false;
    for _ in 0..100 {
        if !is_running(background) {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(gone, "background child {background} survived process group kill");

    // Nothing left in the group; signalling it again is not an error.
    process.kill_group(KillSignal::Term).unwrap();
}

#[cfg(target_os = "linux")]
fn is_running(pid: libc::pid_t) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(") ")
            .and_then(|(_, rest)| rest.chars().next())
            .map(|state| state != 'Z' && state != 'X')
            .unwrap_or(false),
        Err(_) => false,
    }
}

#[cfg(not(target_os = "linux"))]
fn is_running(pid: libc::pid_t) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

#[tokio::test]
async fn test_missing_executable_is_a_spawn_error() {
    let inv = GitInvocation::new("git-definitely-not-installed-here", ["--version"]);
    let err = git_command(&SystemCommandFactory, &inv).spawn().unwrap_err();
    assert!(err.to_string().starts_with("failed to start git-definitely-not-installed-here"));
}
