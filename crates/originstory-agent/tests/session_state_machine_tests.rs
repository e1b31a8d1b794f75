// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use originstory_agent::dispatcher::StatusEvent;
use originstory_agent::protocol::{Credentials, InboundMessage, Opcode, OutboundMessage, ProbabilitySample};
use originstory_agent::session::{
    SessionAction, SessionEvent, SessionPhase, SessionStateMachine, SessionStatus,
};

fn alice() -> Credentials {
    Credentials::new("alice", "secret")
}

fn user_valid(user_id: &str) -> SessionEvent {
    SessionEvent::Inbound(InboundMessage::UserValid {
        user_id: user_id.to_string(),
    })
}

fn meeting_info(meeting_id: &str) -> SessionEvent {
    SessionEvent::Inbound(InboundMessage::MeetingInfo {
        meeting_id: meeting_id.to_string(),
    })
}

fn bound() -> SessionStateMachine {
    let mut sm = SessionStateMachine::new();
    let _ = sm.login(alice());
    let _ = sm.on_event(SessionEvent::Connected);
    let _ = sm.on_event(user_valid("u1"));
    let _ = sm.on_event(meeting_info("m1"));
    sm
}

fn streaming() -> SessionStateMachine {
    let mut sm = bound();
    let _ = sm.on_event(SessionEvent::Inbound(InboundMessage::BeginData));
    sm
}

fn assert_ready_invariant(sm: &SessionStateMachine) {
    assert_eq!(
        sm.is_ready_to_send(),
        sm.is_connected() && sm.user_id().is_some() && sm.meeting_id().is_some()
    );
    assert_eq!(sm.status().ready_to_send, sm.is_ready_to_send());
}

#[test]
fn login_while_disconnected_defers_and_requests_connect() {
    let mut sm = SessionStateMachine::new();
    let actions = sm.login(alice());

    assert_eq!(actions, vec![SessionAction::Connect]);
    assert_eq!(sm.phase(), SessionPhase::Connecting);
    assert!(sm.has_pending_login());
}

#[test]
fn connected_sends_pending_login_exactly_once() {
    let mut sm = SessionStateMachine::new();
    let _ = sm.login(alice());

    let actions = sm.on_event(SessionEvent::Connected);
    assert_eq!(
        actions,
        vec![
            SessionAction::Notify(StatusEvent::ServerConnected),
            SessionAction::Emit(OutboundMessage::ValidateUser(alice())),
        ]
    );
    assert_eq!(sm.phase(), SessionPhase::Authenticating);
    assert!(!sm.has_pending_login());

    // a later reconnect has nothing left to send
    let _ = sm.on_event(SessionEvent::Disconnected("transport close".into()));
    let actions = sm.on_event(SessionEvent::Connected);
    assert_eq!(
        actions,
        vec![SessionAction::Notify(StatusEvent::ServerConnected)]
    );
}

#[test]
fn second_login_before_connect_overwrites_pending() {
    let mut sm = SessionStateMachine::new();
    let _ = sm.login(alice());
    let _ = sm.login(Credentials::new(" bob ", "hunter2"));

    let actions = sm.on_event(SessionEvent::Connected);
    let validations: Vec<_> = actions
        .iter()
        .filter_map(|a| match a {
            SessionAction::Emit(OutboundMessage::ValidateUser(c)) => Some(c.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(validations, vec![Credentials::new("bob", "hunter2")]);
}

#[test]
fn login_while_connected_emits_immediately() {
    let mut sm = SessionStateMachine::new();
    let _ = sm.on_event(SessionEvent::Connected);

    let actions = sm.login(alice());
    assert_eq!(
        actions,
        vec![SessionAction::Emit(OutboundMessage::ValidateUser(alice()))]
    );
    assert!(!sm.has_pending_login());
}

#[test]
fn user_valid_registers_and_notifies() {
    let mut sm = SessionStateMachine::new();
    let _ = sm.login(alice());
    let _ = sm.on_event(SessionEvent::Connected);

    let actions = sm.on_event(user_valid("u1"));
    assert_eq!(
        actions,
        vec![
            SessionAction::Emit(OutboundMessage::RegisterLocal {
                user_id: "u1".into()
            }),
            SessionAction::Notify(StatusEvent::LoginOk {
                user_id: "u1".into()
            }),
        ]
    );
    assert_eq!(sm.phase(), SessionPhase::Authenticated);
    assert_eq!(sm.user_id(), Some("u1"));
    assert!(!sm.is_ready_to_send());
}

#[test]
fn user_invalid_notifies_login_fail() {
    let mut sm = SessionStateMachine::new();
    let _ = sm.login(alice());
    let _ = sm.on_event(SessionEvent::Connected);

    let actions = sm.on_event(SessionEvent::Inbound(InboundMessage::UserInvalid {
        error: "Invalid credentials.".into(),
    }));
    assert_eq!(
        actions,
        vec![SessionAction::Notify(StatusEvent::LoginFail {
            msg: "Invalid credentials.".into()
        })]
    );
    assert_eq!(sm.phase(), SessionPhase::SignedOut);
    assert_eq!(sm.user_id(), None);
}

#[test]
fn meeting_info_then_begin_data_starts_streaming() {
    let mut sm = SessionStateMachine::new();
    let _ = sm.login(alice());
    let _ = sm.on_event(SessionEvent::Connected);
    let _ = sm.on_event(user_valid("u1"));

    let actions = sm.on_event(meeting_info("m1"));
    assert_eq!(
        actions,
        vec![SessionAction::Notify(StatusEvent::MeetingInfo {
            meeting_id: "m1".into()
        })]
    );
    assert_eq!(sm.phase(), SessionPhase::Bound);
    assert!(sm.is_ready_to_send());

    let actions = sm.on_event(SessionEvent::Inbound(InboundMessage::BeginData));
    assert_eq!(
        actions,
        vec![
            SessionAction::StartStreaming,
            SessionAction::Notify(StatusEvent::BeginData),
        ]
    );
    assert_eq!(sm.phase(), SessionPhase::Streaming);

    // repeated BEGIN_DATA does not start a second loop
    let actions = sm.on_event(SessionEvent::Inbound(InboundMessage::BeginData));
    assert_eq!(actions, vec![SessionAction::Notify(StatusEvent::BeginData)]);
}

#[test]
fn server_end_data_stops_streaming_and_returns_to_bound() {
    let mut sm = streaming();
    let actions = sm.on_event(SessionEvent::Inbound(InboundMessage::EndData));
    assert_eq!(
        actions,
        vec![
            SessionAction::StopStreaming,
            SessionAction::Notify(StatusEvent::EndData),
        ]
    );
    assert_eq!(sm.phase(), SessionPhase::Bound);
    assert!(!sm.is_streaming());
    assert!(sm.is_ready_to_send());
}

#[test]
fn sign_out_while_streaming_sends_courtesy_packets_then_disconnects() {
    let mut sm = streaming();
    let actions = sm.sign_out();

    assert_eq!(
        actions,
        vec![
            SessionAction::Emit(OutboundMessage::EndData {
                meeting_id: "m1".into(),
                user_id: "u1".into()
            }),
            SessionAction::Emit(OutboundMessage::UnregisterLocal {
                user_id: "u1".into()
            }),
            SessionAction::StopStreaming,
            SessionAction::Disconnect,
        ]
    );
    assert_eq!(sm.status(), SessionStatus::signed_out());
    assert_eq!(sm.phase(), SessionPhase::SignedOut);
}

#[test]
fn sign_out_without_meeting_only_unregisters() {
    let mut sm = SessionStateMachine::new();
    let _ = sm.login(alice());
    let _ = sm.on_event(SessionEvent::Connected);
    let _ = sm.on_event(user_valid("u1"));

    let emitted: Vec<Opcode> = sm
        .sign_out()
        .iter()
        .filter_map(|a| match a {
            SessionAction::Emit(message) => Some(message.opcode()),
            _ => None,
        })
        .collect();
    assert_eq!(emitted, vec![Opcode::UnregisterLocal]);
}

#[test]
fn sign_out_is_deterministic_from_any_state() {
    let mut machines = vec![SessionStateMachine::new(), bound(), streaming()];

    let mut connecting = SessionStateMachine::new();
    let _ = connecting.login(alice());
    machines.push(connecting);

    let mut dropped = streaming();
    let _ = dropped.on_event(SessionEvent::Disconnected("ping timeout".into()));
    machines.push(dropped);

    for mut sm in machines {
        let actions = sm.sign_out();
        assert_eq!(actions.last(), Some(&SessionAction::Disconnect));
        assert_eq!(sm.status(), SessionStatus::signed_out());
        assert!(!sm.has_pending_login());
        assert!(!sm.is_streaming());
    }
}

#[test]
fn sign_out_when_disconnected_sends_nothing() {
    let mut sm = bound();
    let _ = sm.on_event(SessionEvent::Disconnected("transport close".into()));
    let actions = sm.sign_out();
    assert!(actions
        .iter()
        .all(|a| !matches!(a, SessionAction::Emit(_))));
}

#[test]
fn unexpected_disconnect_mid_stream_stops_loop() {
    let mut sm = streaming();
    let actions = sm.on_event(SessionEvent::Disconnected("transport error".into()));

    assert_eq!(
        actions,
        vec![
            SessionAction::StopStreaming,
            SessionAction::Notify(StatusEvent::ServerDisconnected),
        ]
    );
    assert!(!sm.is_ready_to_send());
    // ids are kept until the next connection
    assert_eq!(sm.user_id(), Some("u1"));
    assert_eq!(sm.meeting_id(), Some("m1"));
}

#[test]
fn reconnect_requires_fresh_login() {
    let mut sm = streaming();
    let _ = sm.on_event(SessionEvent::Disconnected("transport error".into()));
    let actions = sm.on_event(SessionEvent::Connected);

    assert_eq!(
        actions,
        vec![SessionAction::Notify(StatusEvent::ServerConnected)]
    );
    assert_eq!(sm.user_id(), None);
    assert_eq!(sm.meeting_id(), None);
    assert!(!sm.is_ready_to_send());
    assert_eq!(sm.phase(), SessionPhase::SignedOut);
}

#[test]
fn connection_error_notifies_and_keeps_pending_login() {
    let mut sm = SessionStateMachine::new();
    let _ = sm.login(alice());

    let actions = sm.on_event(SessionEvent::ConnectionError("refused".into()));
    assert_eq!(
        actions,
        vec![SessionAction::Notify(StatusEvent::LoginError {
            msg: "Could not connect to server.\nrefused".into()
        })]
    );
    assert!(sm.has_pending_login());

    // a successful retry still delivers it
    let actions = sm.on_event(SessionEvent::Connected);
    assert!(actions.contains(&SessionAction::Emit(OutboundMessage::ValidateUser(alice()))));
}

#[test]
fn ignored_commands_produce_no_actions() {
    let mut sm = bound();
    for opcode in [
        Opcode::TestConnection,
        Opcode::ConnectionEstablished,
        Opcode::UpdateUser,
        Opcode::UserUpdated,
        Opcode::EndConnection,
        Opcode::BadCommand,
        Opcode::BadData,
        Opcode::RegisterLocal,
        Opcode::UnregisterLocal,
    ] {
        let actions = sm.on_event(SessionEvent::Inbound(InboundMessage::Ignored(opcode)));
        assert!(actions.is_empty(), "{} produced actions", opcode);
    }
    assert_eq!(sm.phase(), SessionPhase::Bound);
}

#[test]
fn data_transmission_only_when_ready() {
    let sample = ProbabilitySample::new(0.25, 0.75).unwrap();

    let sm = SessionStateMachine::new();
    assert!(sm
        .data_transmission(sample, "2024-01-01T00:00:00.000Z".into())
        .is_none());

    let sm = bound();
    let message = sm
        .data_transmission(sample, "2024-01-01T00:00:00.000Z".into())
        .unwrap();
    assert_eq!(
        message,
        OutboundMessage::DataTransmission {
            meeting_id: "m1".into(),
            user_id: "u1".into(),
            sample,
            timestamp: "2024-01-01T00:00:00.000Z".into(),
        }
    );
}

#[test]
fn readiness_invariant_holds_across_a_session() {
    let mut sm = SessionStateMachine::new();
    assert_ready_invariant(&sm);

    let _ = sm.login(alice());
    assert_ready_invariant(&sm);

    let events = vec![
        SessionEvent::ConnectionError("refused".into()),
        SessionEvent::Connected,
        user_valid("u1"),
        meeting_info("m1"),
        SessionEvent::Inbound(InboundMessage::BeginData),
        SessionEvent::Inbound(InboundMessage::EndData),
        SessionEvent::Inbound(InboundMessage::BeginData),
        SessionEvent::Disconnected("transport error".into()),
        SessionEvent::Connected,
        user_valid("u2"),
        meeting_info("m2"),
    ];
    for event in events {
        let _ = sm.on_event(event);
        assert_ready_invariant(&sm);
    }
    assert_eq!(sm.user_id(), Some("u2"));
    assert!(sm.is_ready_to_send());

    let _ = sm.sign_out();
    assert_ready_invariant(&sm);
}
