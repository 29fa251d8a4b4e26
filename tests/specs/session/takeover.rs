//! Duplicate-login takeover over real sockets.

use crate::prelude::*;

#[tokio::test]
async fn duplicate_login_takes_over_the_old_connection() {
    let mud = boot_mud().await;

    let mut first = Client::connect(mud.addr).await;
    first.register("alice", "secret1").await;

    // Same credentials under different case from a second client
    let mut second = Client::connect(mud.addr).await;
    second.expect("By what name are you known?").await;
    second.send("Alice").await;
    second.expect("Password:").await;
    second.send("secret1").await;
    second.expect("Welcome back, Alice.").await;

    // The old connection gets exactly the notice, then closes
    let notice = first
        .expect("Another connection has taken over this session.")
        .await;
    assert_eq!(notice, "Another connection has taken over this session.");
    first.expect_eof().await;

    // One active entry under the folded name: who shows one adventurer
    second.send("who").await;
    second.expect("1 adventurer(s)").await;
    second.expect("Alice").await;

    mud.shutdown().await;
}

#[tokio::test]
async fn takeover_keeps_the_player_in_place() {
    let mud = boot_mud().await;

    let mut first = Client::connect(mud.addr).await;
    first.register("bob", "secret1").await;
    first.expect("Town Square").await;

    let mut second = Client::connect(mud.addr).await;
    second.expect("By what name").await;
    second.send("bob").await;
    second.expect("Password:").await;
    second.send("secret1").await;
    second.expect("Welcome back, Bob.").await;
    // The takeover re-binds the existing player where it stood
    second.expect("Town Square").await;

    mud.shutdown().await;
}
