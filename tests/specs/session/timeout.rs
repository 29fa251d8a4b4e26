//! Disconnect followed by grace-window expiry.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test]
async fn limbo_timeout_saves_and_retires_the_player() {
    let mud = boot_mud().await;

    let mut admin = Client::connect(mud.addr).await;
    admin.register("keeper", "secret1").await; // first account runs the world

    let mut player = Client::connect(mud.addr).await;
    player.register("bob", "secret1").await;
    drop(player);

    // Wait past the grace window plus tick slack
    tokio::time::sleep(Duration::from_millis(GRACE_MS + 500)).await;

    // The active table no longer carries bob
    admin.send("who").await;
    admin.expect("1 adventurer(s)").await;

    // But the save blob survived: a fresh login is a welcome-back
    let mut back = Client::connect(mud.addr).await;
    back.login("bob", "secret1").await;
    back.expect("Town Square").await;

    mud.shutdown().await;
}

#[tokio::test]
async fn reconnect_before_expiry_via_plain_login_reclaims_the_session() {
    let mud = boot_mud().await;

    let mut player = Client::connect(mud.addr).await;
    player.register("bob", "secret1").await;
    drop(player);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Logging in again inside the window reclaims the limbo player
    let mut back = Client::connect(mud.addr).await;
    back.login("bob", "secret1").await;
    back.expect("Town Square").await;

    // and the stale grace timer no longer fires anyone out
    tokio::time::sleep(Duration::from_millis(GRACE_MS + 300)).await;
    back.send("who").await;
    back.expect("1 adventurer(s)").await;

    mud.shutdown().await;
}
