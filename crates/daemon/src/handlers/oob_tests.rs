// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_support::{connect, drain, drain_oob, register_player, started_driver};
use loam_core::{ClientEnvelope, Event, Level};

#[tokio::test]
async fn completion_answers_builders_only() {
    let mut fixture = started_driver().await;
    let driver = &mut fixture.driver;
    let (conn, mut rx) = connect(driver, 5300);
    register_player(driver, conn, &mut rx, "bob", "secret1");

    // Plain players get silence
    driver.handle_event(Event::Oob {
        conn,
        envelope: ClientEnvelope::Complete {
            prefix: "lo".to_string(),
        },
    });
    assert!(drain_oob(&mut rx).is_empty());

    // Builders get candidates
    driver.world.permissions.grant("bob", Level::Builder);
    driver.world.players.get_mut("bob").unwrap().level = Level::Builder;
    driver.handle_event(Event::Oob {
        conn,
        envelope: ClientEnvelope::Complete {
            prefix: "lo".to_string(),
        },
    });
    let frames = drain_oob(&mut rx);
    let completion = frames
        .iter()
        .find(|v| v["type"] == "completion")
        .expect("completion envelope");
    let candidates: Vec<&str> = completion["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(candidates.contains(&"look"));
}

#[tokio::test]
async fn completion_includes_loaded_blueprints() {
    let mut fixture = started_driver().await;
    let driver = &mut fixture.driver;
    let (conn, mut rx) = connect(driver, 5301);
    register_player(driver, conn, &mut rx, "bob", "secret1");
    driver.world.permissions.grant("bob", Level::Builder);
    driver.world.players.get_mut("bob").unwrap().level = Level::Builder;

    driver.handle_event(Event::Oob {
        conn,
        envelope: ClientEnvelope::Complete {
            prefix: "/areas/".to_string(),
        },
    });
    let frames = drain_oob(&mut rx);
    let completion = frames.iter().find(|v| v["type"] == "completion").unwrap();
    assert!(completion["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v == "/areas/square"));
}

#[tokio::test]
async fn bug_reports_land_in_the_sink() {
    let mut fixture = started_driver().await;
    let driver = &mut fixture.driver;
    let (conn, mut rx) = connect(driver, 5302);
    register_player(driver, conn, &mut rx, "bob", "secret1");

    driver.handle_event(Event::Oob {
        conn,
        envelope: ClientEnvelope::BugReport(serde_json::json!({
            "text": "the inn door eats keys"
        })),
    });

    let sink = driver.world.store.resolve("/data/bug-reports.jsonl").unwrap();
    let content = std::fs::read_to_string(sink).unwrap();
    let entry: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(entry["reporter"], "Bob");
    assert_eq!(entry["report"]["text"], "the inn door eats keys");
}

#[tokio::test]
async fn bug_reports_from_login_connections_are_anonymous() {
    let mut fixture = started_driver().await;
    let driver = &mut fixture.driver;
    let (conn, mut rx) = connect(driver, 5303);
    drain(&mut rx);

    driver.handle_event(Event::Oob {
        conn,
        envelope: ClientEnvelope::BugReport(serde_json::json!({"text": "login screen typo"})),
    });

    let sink = driver.world.store.resolve("/data/bug-reports.jsonl").unwrap();
    let content = std::fs::read_to_string(sink).unwrap();
    assert!(content.contains("anonymous"));
}

#[tokio::test]
async fn gui_envelopes_reach_the_players_hook() {
    const GUI_MUDLIB: &[(&str, &str)] = &[
        (
            "secure/master.hcl",
            "object \"master\" { kind = \"daemon\" }\n",
        ),
        ("std/void.hcl", "object \"void\" { kind = \"room\" }\n"),
        (
            "std/player.hcl",
            concat!(
                "object \"player\" {\n",
                "  short = \"an adventurer\"\n",
                "  hooks {\n",
                "    on_gui = [{ set = { key = \"last_gui\", value = \"seen\" } }]\n",
                "  }\n",
                "}\n",
            ),
        ),
    ];
    let mut fixture = crate::test_support::started_driver_with(GUI_MUDLIB).await;
    let driver = &mut fixture.driver;
    let (conn, mut rx) = connect(driver, 5304);
    register_player(driver, conn, &mut rx, "bob", "secret1");
    let player = driver.world.find_active_player("bob").unwrap();

    driver.handle_event(Event::Oob {
        conn,
        envelope: ClientEnvelope::Gui(serde_json::json!({"panel": "inventory"})),
    });
    assert_eq!(
        driver.world.registry.get(player).unwrap().prop("last_gui"),
        Some(&serde_json::json!("seen"))
    );
}

#[tokio::test]
async fn gui_envelopes_before_binding_are_dropped() {
    let mut fixture = started_driver().await;
    let driver = &mut fixture.driver;
    let (conn, mut rx) = connect(driver, 5305);
    drain(&mut rx);

    driver.handle_event(Event::Oob {
        conn,
        envelope: ClientEnvelope::Gui(serde_json::json!({"panel": "inventory"})),
    });
    assert!(drain(&mut rx).is_empty());
}
