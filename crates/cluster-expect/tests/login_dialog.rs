//! End-to-end login dialogs against a scripted remote.

mod common;

use std::time::Duration;

use cluster_expect::{DuoLogin, SecondFactor, ShellSession};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const BANNER: &[u8] = b"Duo two-factor login for alice\n\n\
Enter a passcode or select one of the following options:\n\n\
 1. Duo Push to XXX-XXX-1234\n\
 2. Phone call to XXX-XXX-1234\n\
 3. SMS passcodes to XXX-XXX-1234\n\n\
Passcode or option (1-3): ";

fn flow() -> DuoLogin {
    DuoLogin::new("Passcode or option (1-3)", "[{user}@")
        .factor(SecondFactor::Push)
        .step_timeout(Duration::from_secs(5))
}

#[tokio::test(start_paused = true)]
async fn two_factor_flow_succeeds() {
    let (client, mut server) = tokio::io::duplex(2048);
    let mut session = ShellSession::new(client, common::shell_config());
    let dialog = flow().dialog("alice").unwrap();

    let peer = tokio::spawn(async move {
        server.write_all(BANNER).await.unwrap();

        let mut buf = [0u8; 8];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"1\n");

        server
            .write_all(b"Success. Logging you in...\n[alice@login01 ~]$ ")
            .await
            .unwrap();
        server
    });

    let report = session.run_login(&dialog).await.unwrap();

    assert!(report.success);
    assert_eq!(report.steps.len(), 2);

    let factor = report.step("second-factor").unwrap();
    assert!(factor.matched);
    assert_eq!(factor.sent.as_deref(), Some("1"));
    assert!(factor.last_chunk.contains("Passcode or option"));

    let prompt = report.step("shell-prompt").unwrap();
    assert!(prompt.matched);
    assert!(prompt.last_chunk.contains("[alice@login01"));

    peer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn missing_shell_prompt_fails_the_dialog() {
    let (client, mut server) = tokio::io::duplex(2048);
    let mut session = ShellSession::new(client, common::shell_config());
    let dialog = flow()
        .step_timeout(Duration::from_millis(500))
        .dialog("alice")
        .unwrap();

    let peer = tokio::spawn(async move {
        server.write_all(BANNER).await.unwrap();
        let mut buf = [0u8; 8];
        let _ = server.read(&mut buf).await.unwrap();
        // Never answer with a shell prompt; keep the stream open past
        // the dialog's budget.
        tokio::time::sleep(Duration::from_secs(30)).await;
        server
    });

    let report = session.run_login(&dialog).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.steps.len(), 2);
    assert!(report.step("second-factor").unwrap().matched);
    assert!(!report.step("shell-prompt").unwrap().matched);

    peer.abort();
}

#[tokio::test(start_paused = true)]
async fn skipping_the_second_factor_waits_for_the_prompt_only() {
    let (client, mut server) = tokio::io::duplex(2048);
    let mut session = ShellSession::new(client, common::shell_config());
    let dialog = flow()
        .skip_second_factor(true)
        .dialog("alice")
        .unwrap();
    assert_eq!(dialog.len(), 1);

    let peer = tokio::spawn(async move {
        server.write_all(b"[alice@login01 ~]$ ").await.unwrap();
        server
    });

    let report = session.run_login(&dialog).await.unwrap();
    assert!(report.success);
    assert_eq!(report.steps.len(), 1);

    peer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn wrong_user_prompt_does_not_match() {
    let (client, mut server) = tokio::io::duplex(2048);
    let mut session = ShellSession::new(client, common::shell_config());
    let dialog = flow()
        .skip_second_factor(true)
        .step_timeout(Duration::from_millis(300))
        .dialog("alice")
        .unwrap();

    let peer = tokio::spawn(async move {
        server.write_all(b"[bob@login01 ~]$ ").await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        server
    });

    let report = session.run_login(&dialog).await.unwrap();
    assert!(!report.success);

    peer.abort();
}
