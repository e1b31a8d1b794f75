// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end client behavior over the in-memory transport.

use originstory_agent::prelude::*;
use originstory_agent::StepOutcome;
use originstory_transports::common::Packet;
use originstory_transports::memory::MemoryTransport;
use originstory_transports::traits::Transport;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Harness {
    transport: MemoryTransport,
    client: LocalClient,
    events: mpsc::UnboundedReceiver<StatusEvent>,
}

fn harness() -> Harness {
    harness_with_source(FixedSource(0.723, 0.316))
}

fn harness_with_source<S: ProbabilitySource + 'static>(source: S) -> Harness {
    let transport = MemoryTransport::new();
    let (dispatcher, events) = EventDispatcher::channel();
    let client = LocalClient::spawn(transport.clone(), AgentConfig::default(), source, dispatcher)
        .expect("client spawns");
    Harness {
        transport,
        client,
        events,
    }
}

async fn wait_for(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached: {}", what);
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<StatusEvent>) -> StatusEvent {
    tokio::time::timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("timed out waiting for status event")
        .expect("dispatcher closed")
}

fn data_packets(transport: &MemoryTransport) -> Vec<Packet> {
    transport
        .emitted()
        .into_iter()
        .filter(|p| p.cmd == 0x08)
        .collect()
}

/// Drive the harness to Bound (logged in as u1, meeting m1)
async fn bind(h: &mut Harness) {
    h.client.login("alice", "secret").unwrap();
    wait_for("connect requested", || !h.transport.connect_requests().is_empty()).await;
    h.transport.complete_connect();
    assert_eq!(next_event(&mut h.events).await, StatusEvent::ServerConnected);

    h.transport.inject(Packet::new(0x03, json!({"userId": "u1"})));
    assert_eq!(
        next_event(&mut h.events).await,
        StatusEvent::LoginOk {
            user_id: "u1".into()
        }
    );

    h.transport.inject(Packet::new(0x0D, json!({"meetingId": "m1"})));
    assert_eq!(
        next_event(&mut h.events).await,
        StatusEvent::MeetingInfo {
            meeting_id: "m1".into()
        }
    );
    wait_for("ready to send", || h.client.is_ready_to_send()).await;
}

async fn begin_streaming(h: &mut Harness) {
    h.transport.inject(Packet::new(0x07, json!({})));
    assert_eq!(next_event(&mut h.events).await, StatusEvent::BeginData);
    wait_for("first telemetry packet", || !data_packets(&h.transport).is_empty()).await;
}

#[tokio::test(start_paused = true)]
async fn login_while_disconnected_connects_then_validates_once() {
    let mut h = harness();
    h.client.login("  alice ", "secret").unwrap();

    wait_for("connect requested", || h.transport.connect_requests().len() == 1).await;
    assert_eq!(h.transport.connect_requests(), vec!["http://localhost:3000"]);
    assert!(h.transport.emitted().is_empty());

    h.transport.complete_connect();
    assert_eq!(next_event(&mut h.events).await, StatusEvent::ServerConnected);
    wait_for("validation sent", || !h.transport.emitted().is_empty()).await;

    assert_eq!(
        h.transport.emitted(),
        vec![Packet::new(
            0x02,
            json!({"username": "alice", "password": "secret"})
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn user_valid_registers_local_socket() {
    let mut h = harness();
    bind(&mut h).await;

    let emitted = h.transport.emitted();
    assert_eq!(
        emitted[1],
        Packet::new(0x0E, json!({"originStoryUserId": "u1"}))
    );
    assert_eq!(
        h.client.get_status(),
        SessionStatus {
            connected: true,
            user_id: Some("u1".into()),
            meeting_id: Some("m1".into()),
            ready_to_send: true,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn begin_data_streams_at_configured_cadence() {
    let mut h = harness();
    bind(&mut h).await;
    begin_streaming(&mut h).await;

    let first = &data_packets(&h.transport)[0];
    assert_eq!(first.data["meetingId"], "m1");
    assert_eq!(first.data["originStoryUserId"], "u1");
    assert_eq!(first.data["prob_1"], json!(0.72));
    assert_eq!(first.data["prob_2"], json!(0.32));
    let timestamp = first.data["timestamp"].as_str().unwrap();
    assert_eq!(timestamp.len(), "2024-01-01T00:00:00.000Z".len());
    assert!(timestamp.ends_with('Z'));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(data_packets(&h.transport).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn send_probabilities_once_validates_input() {
    let mut h = harness();

    // not ready yet
    assert!(!h.client.send_probabilities_once(0.5, 0.5).await);

    bind(&mut h).await;
    let before = h.transport.emitted().len();

    assert!(!h.client.send_probabilities_once(0.723, 1.4).await);
    assert!(!h.client.send_probabilities_once(f64::NAN, 0.2).await);
    assert!(!h.client.send_probabilities_once(-0.5, 0.2).await);
    assert_eq!(h.transport.emitted().len(), before);

    assert!(h.client.send_probabilities_once(0.456, 1.0).await);
    let sent = data_packets(&h.transport);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].data["prob_1"], json!(0.46));
    assert_eq!(sent[0].data["prob_2"], json!(1.0));
}

#[tokio::test(start_paused = true)]
async fn emit_failure_reports_false() {
    let mut h = harness();
    bind(&mut h).await;

    h.transport.set_fail_emits(true);
    assert!(!h.client.send_probabilities_once(0.1, 0.2).await);
    h.transport.set_fail_emits(false);
    assert!(h.client.send_probabilities_once(0.1, 0.2).await);
}

#[tokio::test(start_paused = true)]
async fn sign_out_while_streaming_tears_down_in_order() {
    let mut h = harness();
    bind(&mut h).await;
    begin_streaming(&mut h).await;

    let report = h.client.sign_out().await.unwrap();
    assert_eq!(report.end_data, StepOutcome::Done);
    assert_eq!(report.unregister, StepOutcome::Done);
    assert_eq!(report.stop_streaming, StepOutcome::Done);
    assert_eq!(report.disconnect, StepOutcome::Done);
    assert!(report.is_clean());

    let emitted = h.transport.emitted();
    let tail = &emitted[emitted.len() - 2..];
    assert_eq!(
        tail,
        &[
            Packet::new(0x09, json!({"meetingId": "m1", "originStoryUserId": "u1"})),
            Packet::new(0x0F, json!({"originStoryUserId": "u1"})),
        ]
    );
    assert_eq!(h.client.get_status(), SessionStatus::signed_out());
    assert!(!h.transport.is_connected());
    assert_eq!(
        next_event(&mut h.events).await,
        StatusEvent::ServerDisconnected
    );

    let sent = data_packets(&h.transport).len();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(data_packets(&h.transport).len(), sent);
}

#[tokio::test(start_paused = true)]
async fn sign_out_when_never_connected_is_clean() {
    let h = harness();
    let report = h.client.sign_out().await.unwrap();

    assert_eq!(report.end_data, StepOutcome::Skipped);
    assert_eq!(report.unregister, StepOutcome::Skipped);
    assert_eq!(report.stop_streaming, StepOutcome::Skipped);
    assert_eq!(report.disconnect, StepOutcome::Done);
    assert_eq!(h.client.get_status(), SessionStatus::signed_out());
    assert!(h.transport.emitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unexpected_disconnect_stops_stream_until_relogin() {
    let mut h = harness();
    bind(&mut h).await;
    begin_streaming(&mut h).await;

    h.transport.drop_connection("transport error");
    assert_eq!(
        next_event(&mut h.events).await,
        StatusEvent::ServerDisconnected
    );
    wait_for("not ready", || !h.client.is_ready_to_send()).await;

    let status = h.client.get_status();
    assert!(!status.connected);
    assert_eq!(status.user_id.as_deref(), Some("u1"));

    let sent = data_packets(&h.transport).len();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(data_packets(&h.transport).len(), sent);

    // a new connection does not resume the old session
    h.client.login("alice", "secret").unwrap();
    wait_for("reconnect requested", || h.transport.connect_requests().len() == 2).await;
    h.transport.complete_connect();
    assert_eq!(next_event(&mut h.events).await, StatusEvent::ServerConnected);
    wait_for("stale ids cleared", || h.client.get_status().user_id.is_none()).await;
    assert!(!h.client.is_ready_to_send());
    wait_for("second validation sent", || {
        h.transport.emitted().iter().filter(|p| p.cmd == 0x02).count() == 2
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn server_end_data_stops_stream_but_keeps_binding() {
    let mut h = harness();
    bind(&mut h).await;
    begin_streaming(&mut h).await;

    h.transport.inject(Packet::new(0x09, json!({"meetingId": "m1"})));
    assert_eq!(next_event(&mut h.events).await, StatusEvent::EndData);

    let sent = data_packets(&h.transport).len();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(data_packets(&h.transport).len(), sent);
    assert!(h.client.is_ready_to_send());
}

#[tokio::test(start_paused = true)]
async fn connection_error_reports_login_error() {
    let mut h = harness();
    h.client.login("alice", "secret").unwrap();
    wait_for("connect requested", || !h.transport.connect_requests().is_empty()).await;

    h.transport.fail_connect("connection refused");
    match next_event(&mut h.events).await {
        StatusEvent::LoginError { msg } => {
            assert!(msg.starts_with("Could not connect to server."));
            assert!(msg.contains("connection refused"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn invalid_credentials_report_login_fail() {
    let mut h = harness();
    h.client.login("alice", "wrong").unwrap();
    wait_for("connect requested", || !h.transport.connect_requests().is_empty()).await;
    h.transport.complete_connect();
    assert_eq!(next_event(&mut h.events).await, StatusEvent::ServerConnected);

    h.transport.inject(Packet::new(0x04, json!({})));
    assert_eq!(
        next_event(&mut h.events).await,
        StatusEvent::LoginFail {
            msg: "Invalid credentials.".into()
        }
    );
    assert_eq!(h.client.get_status().user_id, None);
}

#[tokio::test(start_paused = true)]
async fn malformed_packets_are_dropped_silently() {
    let mut h = harness();
    h.client.login("alice", "secret").unwrap();
    wait_for("connect requested", || !h.transport.connect_requests().is_empty()).await;
    h.transport.complete_connect();
    assert_eq!(next_event(&mut h.events).await, StatusEvent::ServerConnected);

    h.transport.inject(Packet::new(0x03, json!({})));
    h.transport.inject(Packet::new(0x0D, json!({"meeting": "m1"})));
    h.transport.inject(Packet::new(0x7F, json!({})));
    h.transport.inject(Packet::new(0x03, json!({"userId": "u1"})));

    // nothing was dispatched for the malformed ones
    assert_eq!(
        next_event(&mut h.events).await,
        StatusEvent::LoginOk {
            user_id: "u1".into()
        }
    );
    assert_eq!(h.client.get_status().meeting_id, None);
}

#[tokio::test(start_paused = true)]
async fn shutdown_discards_pending_login() {
    let h = harness();
    let other = h.client.clone();
    h.client.login("alice", "secret").unwrap();
    wait_for("connect requested", || !h.transport.connect_requests().is_empty()).await;

    let report = h.client.shutdown().await.unwrap();
    assert_eq!(report.disconnect, StepOutcome::Done);
    assert!(!h.transport.is_connecting());

    // a late connect completion reaches nobody
    h.transport.complete_connect();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.transport.emitted().is_empty());

    assert!(other.login("alice", "secret").is_err());
    assert!(!other.send_probabilities_once(0.1, 0.1).await);
}

#[tokio::test(start_paused = true)]
async fn callback_dispatcher_sees_ordered_events() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let dispatcher = EventDispatcher::with_callback(move |event| {
        sink.lock().push(event.action().to_string());
    });

    let transport = MemoryTransport::auto_connecting();
    let client = LocalClient::spawn(
        transport.clone(),
        AgentConfig::default(),
        FixedSource(0.5, 0.5),
        dispatcher,
    )
    .unwrap();

    client.login("alice", "secret").unwrap();
    wait_for("validation sent", || !transport.emitted().is_empty()).await;
    transport.inject(Packet::new(0x03, json!({"userId": "u1"})));
    transport.inject(Packet::new(0x0D, json!({"meetingid": "m1"})));
    transport.inject(Packet::new(0x07, json!({})));
    wait_for("streaming", || {
        transport.emitted().iter().any(|p| p.cmd == 0x08)
    })
    .await;

    client.shutdown().await.unwrap();

    assert_eq!(
        seen.lock().as_slice(),
        &[
            "server_connected",
            "login_ok",
            "meeting_info",
            "begin_data",
        ]
    );
}
