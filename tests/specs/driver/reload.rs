//! Hot reload: generations advance, live clones keep the old code.

use crate::prelude::*;

#[tokio::test]
async fn reload_preserves_live_clones_and_bumps_generation() {
    let mud = boot_mud().await;

    let mut admin = Client::connect(mud.addr).await;
    admin.register("keeper", "secret1").await; // first account: administrator

    // Two clones of the stock room
    admin.send("clone /std/room").await;
    admin.expect("You conjure").await;
    admin.send("clone /std/room").await;
    admin.expect("You conjure").await;

    // Reload: generation 2, both clones still alive on generation 1
    admin.send("update /std/room").await;
    admin
        .expect("Reloaded /std/room: generation 2, 2 existing clone(s)")
        .await;

    // A third clone picks up the new generation; the old two persist
    admin.send("clone /std/room").await;
    admin.expect("You conjure").await;
    admin.send("update /std/room").await;
    admin
        .expect("Reloaded /std/room: generation 3, 3 existing clone(s)")
        .await;

    mud.shutdown().await;
}

#[tokio::test]
async fn reload_of_missing_source_reports_a_structured_error() {
    let mud = boot_mud().await;

    let mut admin = Client::connect(mud.addr).await;
    admin.register("keeper", "secret1").await;

    admin.send("update /std/absent").await;
    admin.expect("Reload failed").await;

    mud.shutdown().await;
}

#[tokio::test]
async fn update_here_reloads_the_current_room() {
    let mud = boot_mud().await;

    let mut admin = Client::connect(mud.addr).await;
    admin.register("keeper", "secret1").await;

    admin.send("update here").await;
    admin
        .expect("Reloaded /areas/town/square: generation 2")
        .await;

    mud.shutdown().await;
}
