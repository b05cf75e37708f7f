// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn spawns_and_echoes_output() {
    let session = PtySession::spawn(&["echo".to_owned(), "hello-pty".to_owned()], 80, 24).unwrap();

    let mut collected = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match session.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => collected.extend_from_slice(&buf[..n]),
            Err(_) => break,
        }
    }

    let text = String::from_utf8_lossy(&collected);
    assert!(text.contains("hello-pty"), "expected echoed output, got: {text:?}");
}

#[tokio::test]
async fn wait_reports_clean_exit_status() {
    let session = PtySession::spawn(&["true".to_owned()], 80, 24).unwrap();
    let status = session.wait().await.unwrap();
    assert_eq!(status.code, Some(0));
}

#[tokio::test]
async fn wait_reports_nonzero_exit_status() {
    let session = PtySession::spawn(&["sh".to_owned(), "-c".to_owned(), "exit 7".to_owned()], 80, 24).unwrap();
    let status = session.wait().await.unwrap();
    assert_eq!(status.code, Some(7));
}

#[tokio::test]
async fn resize_succeeds_on_a_live_session() {
    let session = PtySession::spawn(&["sleep".to_owned(), "1".to_owned()], 80, 24).unwrap();
    session.resize(100, 40).unwrap();
}

#[tokio::test]
async fn write_reaches_the_child() {
    let session = PtySession::spawn(&["cat".to_owned()], 80, 24).unwrap();
    session.write(b"echo-me\n").await.unwrap();

    let mut collected = Vec::new();
    let mut buf = [0u8; 1024];
    // cat echoes stdin back to stdout; give it a couple of reads to show up.
    for _ in 0..10 {
        if collected.windows(b"echo-me".len()).any(|w| w == b"echo-me") {
            break;
        }
        match tokio::time::timeout(std::time::Duration::from_millis(500), session.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => collected.extend_from_slice(&buf[..n]),
            _ => break,
        }
    }

    let text = String::from_utf8_lossy(&collected);
    assert!(text.contains("echo-me"), "expected cat to echo input, got: {text:?}");
}
