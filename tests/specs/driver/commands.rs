//! Command dispatch: aliases, level gates, the social fallback.

use crate::prelude::*;

#[tokio::test]
async fn alias_expansion_feeds_the_dispatcher() {
    let mud = boot_mud().await;

    let mut admin = Client::connect(mud.addr).await;
    admin.register("keeper", "secret1").await;

    let mut player = Client::connect(mud.addr).await;
    player.register("bob", "secret1").await;

    player.send("alias lk look").await;
    player.expect("Alias lk => look.").await;
    player.send("lk").await;
    player.expect("Town Square").await;

    mud.shutdown().await;
}

#[tokio::test]
async fn admin_commands_never_run_for_players_even_aliased() {
    let mud = boot_mud().await;

    let mut admin = Client::connect(mud.addr).await;
    admin.register("keeper", "secret1").await;

    let mut player = Client::connect(mud.addr).await;
    player.register("bob", "secret1").await;

    player.send("grant bob administrator").await;
    player.expect("You can't do that.").await;

    player.send("alias g grant").await;
    player.expect("Alias g => grant.").await;
    player.send("g bob administrator").await;
    player.expect("You can't do that.").await;

    // bob is still a plain player: the builder surface stays shut
    player.send("update here").await;
    player.expect("You can't do that.").await;

    mud.shutdown().await;
}

#[tokio::test]
async fn emote_fallback_and_unknown_verbs() {
    let mud = boot_mud().await;

    let mut player = Client::connect(mud.addr).await;
    player.register("bob", "secret1").await;

    player.send("smile").await;
    player.expect("You smile.").await;

    player.send("frobnicate wildly").await;
    player.expect("What?").await;

    mud.shutdown().await;
}

#[tokio::test]
async fn say_reaches_the_room_not_the_speaker_twice() {
    let mud = boot_mud().await;

    let mut alice = Client::connect(mud.addr).await;
    alice.register("alice", "secret1").await;
    let mut bob = Client::connect(mud.addr).await;
    bob.register("bob", "secret1").await;

    bob.send("say well met").await;
    bob.expect("You say: well met").await;
    alice.expect("Bob says: well met").await;

    mud.shutdown().await;
}
