// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{
    connect, drain_lines, line, register_player, started_driver, started_driver_with, test_config,
    vp, TEST_MUDLIB,
};

#[tokio::test]
async fn start_transitions_to_running_and_binds() {
    let mut fixture = started_driver().await;
    assert_eq!(fixture.driver.state(), DriverState::Running);
    assert!(fixture.driver.local_addr().is_some());
    assert!(fixture.driver.preload_failures.is_empty());

    fixture.driver.stop();
    assert_eq!(fixture.driver.state(), DriverState::Stopped);
}

#[tokio::test]
async fn start_twice_is_an_error() {
    let mut fixture = started_driver().await;
    assert!(matches!(
        fixture.driver.start().await,
        Err(LifecycleError::NotStopped(DriverState::Running))
    ));
    fixture.driver.stop();
}

#[tokio::test]
async fn startup_preloads_master_list() {
    let fixture = started_driver().await;
    // master itself plus the preloaded square are canonical
    assert!(fixture
        .driver
        .world
        .registry
        .canonical(&vp("/secure/master"))
        .is_some());
    assert!(fixture
        .driver
        .world
        .registry
        .canonical(&vp("/areas/square"))
        .is_some());
}

#[tokio::test]
async fn preload_failures_are_recorded_not_fatal() {
    let mut files = TEST_MUDLIB.to_vec();
    files[0] = (
        "secure/master.hcl",
        r#"
object "master" {
  kind    = "daemon"
  preload = ["/areas/square", "/areas/missing"]
}
"#,
    );
    let fixture = started_driver_with(&files).await;
    assert_eq!(fixture.driver.state(), DriverState::Running);
    assert_eq!(fixture.driver.preload_failures.len(), 1);
    assert_eq!(fixture.driver.preload_failures[0].0, vp("/areas/missing"));
}

#[tokio::test]
async fn missing_master_fails_startup() {
    let (_dir, config) = test_config(&[(
        "std/void.hcl",
        "object \"void\" { kind = \"room\" }\n",
    )]);
    let mut driver = Driver::new(config);
    assert!(matches!(
        driver.start().await,
        Err(LifecycleError::Master(_))
    ));
    assert_eq!(driver.state(), DriverState::Stopped);
}

#[tokio::test]
async fn startup_scans_mudlib_commands_and_emotes() {
    let fixture = started_driver().await;
    assert!(fixture.driver.world.commands.lookup("ponder").is_some());
    assert!(fixture.driver.world.commands.lookup("think").is_some());
    assert!(fixture.driver.world.commands.emote("smile").is_some());
}

#[tokio::test]
async fn player_commands_flow_through_dispatch() {
    let mut fixture = started_driver().await;
    let driver = &mut fixture.driver;
    let (conn, mut rx) = connect(driver, 5001);
    register_player(driver, conn, &mut rx, "bob", "secret1");

    line(driver, conn, "ponder");
    assert_eq!(drain_lines(&mut rx), vec!["You ponder.".to_string()]);

    line(driver, conn, "frobnicate");
    assert_eq!(drain_lines(&mut rx), vec!["What?".to_string()]);

    // denied admin command is a single line, not an emote fallback
    line(driver, conn, "grant bob administrator");
    assert_eq!(drain_lines(&mut rx), vec!["You can't do that.".to_string()]);
}

#[tokio::test]
async fn emote_fallback_after_command_miss() {
    let mut fixture = started_driver().await;
    let driver = &mut fixture.driver;
    let (conn, mut rx) = connect(driver, 5002);
    register_player(driver, conn, &mut rx, "bob", "secret1");

    line(driver, conn, "smile");
    assert_eq!(drain_lines(&mut rx), vec!["You smile.".to_string()]);
}

#[tokio::test]
async fn source_modified_marks_stale_only() {
    let mut fixture = started_driver().await;
    let driver = &mut fixture.driver;

    let before = driver
        .world
        .registry
        .lookup_blueprint(&vp("/areas/square"))
        .map(|b| b.generation);
    driver.handle_event(loam_core::Event::SourceModified {
        path: vp("/areas/square"),
    });

    assert!(driver.world.stale_sources.contains(&vp("/areas/square")));
    let after = driver
        .world
        .registry
        .lookup_blueprint(&vp("/areas/square"))
        .map(|b| b.generation);
    assert_eq!(before, after, "no automatic recompile");
}

#[tokio::test]
async fn source_removed_destroys_clones_unless_safelisted() {
    let mut fixture = started_driver().await;
    let driver = &mut fixture.driver;

    // /areas/inn is not safelisted
    let inn = driver.world.load_object(&vp("/areas/inn")).unwrap();
    driver.handle_event(loam_core::Event::SourceRemoved {
        path: vp("/areas/inn"),
    });
    assert!(driver.world.registry.get(inn).is_none());
    assert!(driver
        .world
        .registry
        .lookup_blueprint(&vp("/areas/inn"))
        .is_none());

    // /areas/square is on the master's safelist
    let square = driver.world.registry.canonical(&vp("/areas/square")).unwrap();
    driver.handle_event(loam_core::Event::SourceRemoved {
        path: vp("/areas/square"),
    });
    assert!(driver.world.registry.get(square).is_some());
}

#[tokio::test]
async fn fire_timers_runs_script_callouts_in_object_context() {
    let mut fixture = started_driver().await;
    let driver = &mut fixture.driver;
    let (conn, mut rx) = connect(driver, 5003);
    register_player(driver, conn, &mut rx, "bob", "secret1");

    let player = driver.world.find_active_player("bob").unwrap();
    driver
        .world
        .call_out(
            player,
            vec![loam_mudlib::Action::Tell {
                target: loam_mudlib::Target::This,
                message: "The kettle whistles.".to_string(),
            }],
            0,
        )
        .unwrap();

    // due on the next tick, not immediately
    assert!(drain_lines(&mut rx).is_empty());
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    driver.fire_timers();
    assert_eq!(
        drain_lines(&mut rx),
        vec!["The kettle whistles.".to_string()]
    );
}

#[tokio::test]
async fn stop_saves_and_retires_active_players() {
    let mut fixture = started_driver().await;
    let driver = &mut fixture.driver;
    let (conn, mut rx) = connect(driver, 5004);
    register_player(driver, conn, &mut rx, "bob", "secret1");
    let player = driver.world.find_active_player("bob").unwrap();

    driver.stop();
    assert_eq!(driver.state(), DriverState::Stopped);
    assert!(driver.world.players.is_empty());
    assert!(driver.world.registry.get(player).is_none());
    assert_eq!(driver.world.scheduler.pending_callouts(), 0);

    let saved = loam_storage::load_player(&driver.world.store, "bob")
        .unwrap()
        .unwrap();
    assert_eq!(saved.location.as_deref(), Some("/areas/square"));
}
