//! Disconnect and resume inside the grace window.

use crate::prelude::*;

#[tokio::test]
async fn resume_inside_grace_window_restores_the_session() {
    let mud = boot_mud().await;

    // A witness to observe the fade broadcast
    let mut witness = Client::connect(mud.addr).await;
    witness.register("watcher", "secret1").await;

    let mut player = Client::connect(mud.addr).await;
    player.register("bob", "secret1").await;
    let token = player.expect_oob("session_token").await;
    let t1 = token["token"].as_str().unwrap().to_string();

    // Socket drops without a quit
    drop(player);

    let fade = witness.expect("fades from view").await;
    assert!(fade.contains("Bob"), "broadcast names the player: {fade}");

    // A new socket resumes with the token
    let mut resumed = Client::connect(mud.addr).await;
    resumed
        .send_frame(&format!(
            "\u{0}[SESSION]{{\"type\":\"session_resume\",\"token\":\"{t1}\"}}"
        ))
        .await;

    let outcome = resumed.expect_oob("session_resume").await;
    assert_eq!(outcome["success"], true);
    let fresh = resumed.expect_oob("session_token").await;
    let t2 = fresh["token"].as_str().unwrap().to_string();
    assert_ne!(t2, t1, "resume rotates the token");

    // Back in the room, not the void
    resumed.expect("Town Square").await;

    // The used token is dead: a second resume falls through to login
    let mut late = Client::connect(mud.addr).await;
    late.send_frame(&format!(
        "\u{0}[SESSION]{{\"type\":\"session_resume\",\"token\":\"{t1}\"}}"
    ))
    .await;
    let invalid = late.expect_oob("session_invalid").await;
    assert!(invalid["reason"].is_string());

    mud.shutdown().await;
}

#[tokio::test]
async fn resume_replays_trailing_output_with_markers() {
    let mud = boot_mud().await;

    let mut player = Client::connect(mud.addr).await;
    player.register("bob", "secret1").await;
    let t1 = player.expect_oob("session_token").await["token"]
        .as_str()
        .unwrap()
        .to_string();

    // Generate some trailing output, then drop
    player.send("smile").await;
    player.expect("You smile.").await;
    drop(player);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let mut resumed = Client::connect(mud.addr).await;
    resumed
        .send_frame(&format!(
            "\u{0}[SESSION]{{\"type\":\"session_resume\",\"token\":\"{t1}\"}}"
        ))
        .await;
    resumed.expect("Replaying missed messages").await;
    resumed.expect("You smile.").await;
    resumed.expect("End of replay").await;

    mud.shutdown().await;
}

#[tokio::test]
async fn expired_tokens_get_session_invalid() {
    let mud = boot_mud().await;

    let mut player = Client::connect(mud.addr).await;
    player.register("bob", "secret1").await;
    let t1 = player.expect_oob("session_token").await["token"]
        .as_str()
        .unwrap()
        .to_string();
    drop(player);

    // Wait out the grace window (token TTL is clamped to it, and the
    // player is retired, so the resume must fail either way)
    tokio::time::sleep(std::time::Duration::from_millis(GRACE_MS + 500)).await;

    let mut late = Client::connect(mud.addr).await;
    late.send_frame(&format!(
        "\u{0}[SESSION]{{\"type\":\"session_resume\",\"token\":\"{t1}\"}}"
    ))
    .await;
    late.expect_oob("session_invalid").await;
    // and the connection proceeds to a normal login
    late.send("bob").await;
    late.expect("Password:").await;

    mud.shutdown().await;
}
