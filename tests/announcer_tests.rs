//! End-to-end behaviour of the announcer against the in-memory bus.

use std::collections::HashSet;
use std::sync::Arc;

use command_announcer::prelude::*;
use serde_json::{json, Value};

const STARTUP_GROUP: &str = "serviceStartupGroup";
const ADMIN_CHANNEL: &str = "socketIOGroup";

async fn announcer() -> (Arc<InMemoryBus>, Announcer) {
    let bus = Arc::new(InMemoryBus::new());
    let announcer = Announcer::new(bus.clone(), AnnouncerConfig::default())
        .await
        .expect("announcer should subscribe");
    (bus, announcer)
}

fn router_startup(name: &str) -> Value {
    json!({ "body": { "microServiceName": name } })
}

fn payload(event: &str, role: &str, command: &str) -> Value {
    json!({ "uri": "addValidCommand", "event": event, "command": command, "role": role })
}

#[tokio::test]
async fn test_idempotent_declaration() {
    let (bus, announcer) = announcer().await;

    for _ in 0..5 {
        announcer.declare("chat", "customer", "start").await;
    }

    assert_eq!(bus.sent_to(ADMIN_CHANNEL).await, vec![payload("chat", "customer", "start")]);
    assert_eq!(
        announcer.registered().await,
        vec![Triple::with_role("chat", "customer", "start")]
    );
}

#[tokio::test]
async fn test_cartesian_expansion() {
    let (bus, announcer) = announcer().await;

    let added = announcer.declare(["e1", "e2"], ["r1"], ["c1", "c2"]).await;
    assert_eq!(added, 4);

    assert_eq!(
        bus.sent_to(ADMIN_CHANNEL).await,
        vec![
            payload("e1", "r1", "c1"),
            payload("e1", "r1", "c2"),
            payload("e2", "r1", "c1"),
            payload("e2", "r1", "c2"),
        ]
    );
    assert_eq!(announcer.registered().await.len(), 4);
}

#[tokio::test]
async fn test_empty_dimension_declares_nothing() {
    let (bus, announcer) = announcer().await;
    let none: Vec<&str> = Vec::new();

    assert_eq!(announcer.declare(none.clone(), "r", "c").await, 0);
    assert_eq!(announcer.declare("e", none.clone(), "c").await, 0);
    assert_eq!(announcer.declare("e", "r", none).await, 0);

    assert!(bus.sent().await.is_empty());
    assert!(announcer.registered().await.is_empty());
}

#[tokio::test]
async fn test_scalar_and_list_are_equivalent() {
    let (scalar_bus, scalar) = announcer().await;
    let (list_bus, list) = announcer().await;

    scalar.declare("e", "r", "c").await;
    list.declare(vec!["e"], vec!["r"], vec!["c"]).await;

    assert_eq!(scalar.registered().await, list.registered().await);
    assert_eq!(scalar_bus.sent().await, list_bus.sent().await);
}

#[tokio::test]
async fn test_resync_replays_every_triple() {
    let (bus, announcer) = announcer().await;

    announcer.declare(["chat", "video"], ["customer", "agent"], ["start", "end"]).await;
    announcer.declare("chat", "customer", "start").await;
    announcer.declare_command("presence", "ping").await;
    let declared: HashSet<Triple> = announcer.registered().await.into_iter().collect();
    assert_eq!(declared.len(), 9);

    for name in ["router", "Router", "ROUTER"] {
        bus.clear_sent().await;
        assert_eq!(bus.deliver(STARTUP_GROUP, router_startup(name)).await, 1);

        let replayed = bus.sent_to(ADMIN_CHANNEL).await;
        assert_eq!(replayed.len(), 9);

        let replayed: HashSet<String> = replayed.iter().map(Value::to_string).collect();
        let expected: HashSet<String> = declared
            .iter()
            .map(|t| match &t.role {
                Some(role) => payload(&t.event, role, &t.command),
                None => json!({
                    "uri": "addValidCommand",
                    "event": &t.event,
                    "command": &t.command
                }),
            })
            .map(|v| v.to_string())
            .collect();
        assert_eq!(replayed, expected);
    }

    assert_eq!(announcer.stats().resyncs, 3);
}

#[tokio::test]
async fn test_other_services_do_not_trigger_resync() {
    let (bus, announcer) = announcer().await;
    announcer.declare("chat", "customer", "start").await;
    bus.clear_sent().await;

    bus.deliver(STARTUP_GROUP, router_startup("auth")).await;
    bus.deliver(STARTUP_GROUP, router_startup("router-proxy")).await;
    bus.deliver(STARTUP_GROUP, json!({ "body": {} })).await;
    bus.deliver(STARTUP_GROUP, json!(null)).await;

    assert!(bus.sent().await.is_empty());
    assert_eq!(announcer.registered().await.len(), 1);
    assert_eq!(announcer.stats().resyncs, 0);
}

#[tokio::test]
async fn test_chat_scenario() {
    let (bus, announcer) = announcer().await;

    announcer.declare("chat", "customer", "start").await;
    assert_eq!(bus.sent_to(ADMIN_CHANNEL).await, vec![payload("chat", "customer", "start")]);

    announcer.declare("chat", "customer", "end").await;
    bus.clear_sent().await;

    bus.deliver(STARTUP_GROUP, json!({ "body": { "microServiceName": "Router" } })).await;

    let replayed = bus.sent_to(ADMIN_CHANNEL).await;
    assert_eq!(
        replayed,
        vec![payload("chat", "customer", "start"), payload("chat", "customer", "end")]
    );
    assert_eq!(announcer.registered().await.len(), 2);
}

#[tokio::test]
async fn test_independent_announcers_do_not_share_state() {
    let bus = Arc::new(InMemoryBus::new());
    let first = Announcer::new(bus.clone(), AnnouncerConfig::default()).await.unwrap();
    let second = Announcer::new(bus.clone(), AnnouncerConfig::default()).await.unwrap();

    first.declare("chat", "customer", "start").await;
    assert!(second.registered().await.is_empty());

    // Each announcer replays its own registry.
    bus.clear_sent().await;
    bus.deliver(STARTUP_GROUP, router_startup("router")).await;
    assert_eq!(bus.sent().await.len(), 1);
    assert_ne!(first.subscription_id(), second.subscription_id());
}

#[tokio::test]
async fn test_custom_channels() {
    let bus = Arc::new(InMemoryBus::new());
    let config = AnnouncerConfig::default()
        .with_router_service("edge")
        .with_lifecycle_group("startups")
        .with_admin_channel("admin");
    let announcer = Announcer::new(bus.clone(), config).await.unwrap();

    announcer.declare("chat", "customer", "start").await;
    assert_eq!(bus.sent_to("admin").await.len(), 1);

    bus.deliver(STARTUP_GROUP, router_startup("edge")).await;
    bus.deliver("startups", router_startup("router")).await;
    assert_eq!(bus.sent_to("admin").await.len(), 1);

    bus.deliver("startups", router_startup("Edge")).await;
    assert_eq!(bus.sent_to("admin").await.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_declarations_and_resync_lose_nothing() {
    let (bus, announcer) = announcer().await;
    let announcer = Arc::new(announcer);

    announcer.declare("seed", "r", ["a", "b", "c"]).await;

    let mut tasks = Vec::new();
    for i in 0..8 {
        let announcer = announcer.clone();
        tasks.push(tokio::spawn(async move {
            let command = format!("cmd-{}", i % 4);
            announcer.declare("chat", "customer", command).await
        }));
    }
    let resync = {
        let bus = bus.clone();
        tokio::spawn(async move { bus.deliver(STARTUP_GROUP, router_startup("router")).await })
    };

    let mut added = 0;
    for task in tasks {
        added += task.await.unwrap();
    }
    resync.await.unwrap();

    // Duplicate concurrent declarations are recorded once.
    assert_eq!(added, 4);
    let registered = announcer.registered().await;
    assert_eq!(registered.len(), 7);

    // Every registered triple reached the router through one path or the other.
    let sent: HashSet<String> = bus
        .sent_to(ADMIN_CHANNEL)
        .await
        .iter()
        .map(Value::to_string)
        .collect();
    for triple in &registered {
        let role = triple.role.as_deref().unwrap_or_default();
        assert!(sent.contains(&payload(&triple.event, role, &triple.command).to_string()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resync_is_not_interleaved_with_declarations() {
    let seeds = ["a", "b", "c", "d", "e"];
    let seed_payloads: Vec<String> = seeds
        .iter()
        .map(|command| payload("seed", "r", command).to_string())
        .collect();

    for round in 0..10 {
        let (bus, announcer) = announcer().await;
        let announcer = Arc::new(announcer);
        announcer.declare("seed", "r", seeds).await;
        bus.clear_sent().await;

        let resync = {
            let bus = bus.clone();
            tokio::spawn(async move { bus.deliver(STARTUP_GROUP, router_startup("router")).await })
        };
        let mut tasks = Vec::new();
        for i in 0..20 {
            let announcer = announcer.clone();
            tasks.push(tokio::spawn(async move {
                announcer.declare("chat", "customer", format!("cmd-{round}-{i}")).await
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), 1);
        }
        resync.await.unwrap();

        let sent: Vec<String> = bus
            .sent_to(ADMIN_CHANNEL)
            .await
            .iter()
            .map(Value::to_string)
            .collect();
        let positions: Vec<usize> = sent
            .iter()
            .enumerate()
            .filter(|(_, p)| seed_payloads.contains(p))
            .map(|(i, _)| i)
            .collect();

        assert_eq!(positions.len(), seeds.len(), "round {round}: {sent:?}");
        assert_eq!(
            positions[seeds.len() - 1] - positions[0],
            seeds.len() - 1,
            "round {round}: resync interleaved with declarations: {sent:?}"
        );
        assert_eq!(sent[positions[0]..=positions[seeds.len() - 1]], seed_payloads[..]);
    }
}

#[tokio::test]
async fn test_dropped_announcer_stops_resyncing() {
    let (bus, announcer) = announcer().await;
    announcer.declare("chat", "customer", ["start", "end"]).await;
    drop(announcer);
    bus.clear_sent().await;

    // The handler stays registered but no longer reaches any state.
    assert_eq!(bus.deliver(STARTUP_GROUP, router_startup("router")).await, 1);
    assert!(bus.sent().await.is_empty());
}

#[tokio::test]
async fn test_shutdown_removes_the_lifecycle_handler() {
    let (bus, announcer) = announcer().await;
    announcer.declare("chat", "customer", "start").await;
    let id = announcer.subscription_id();

    announcer.shutdown().await.unwrap();
    assert_eq!(bus.subscriber_count(STARTUP_GROUP), 0);
    assert_eq!(bus.deliver(STARTUP_GROUP, router_startup("router")).await, 0);

    assert!(matches!(
        bus.unsubscribe(id).await,
        Err(BusError::NotSubscribed(missing)) if missing == id
    ));
}
