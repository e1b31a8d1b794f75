// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Single-writer task owning the session.
//!
//! Every session mutation happens here. Consumer calls arrive as
//! [`Command`]s, transport notifications and loop samples on their own
//! channels; after each step the new [`SessionStatus`] is published on a
//! `watch` channel for lock-free reads.

use super::teardown::{StepOutcome, TeardownReport};
use crate::dispatcher::EventDispatcher;
use crate::protocol::{
    command_name, timestamp_now, Credentials, InboundMessage, Opcode, OutboundMessage,
    ProbabilitySample,
};
use crate::session::{SessionAction, SessionEvent, SessionStateMachine, SessionStatus};
use crate::streaming::{SampleSink, StopOutcome, StreamingLoop};
use originstory_transports::common::{TransportError, TransportEvent};
use originstory_transports::traits::Transport;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

pub(crate) enum Command {
    Login {
        credentials: Credentials,
    },
    SignOut {
        reply: oneshot::Sender<TeardownReport>,
    },
    SendProbabilities {
        p1: f64,
        p2: f64,
        reply: oneshot::Sender<bool>,
    },
    Shutdown {
        reply: oneshot::Sender<TeardownReport>,
    },
}

/// Sample produced by a streaming loop generation
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopSample {
    generation: u64,
    p1: f64,
    p2: f64,
}

/// Loop-facing sink: readiness from the status snapshot, samples into the actor
pub(crate) struct ActorSink {
    status: watch::Receiver<SessionStatus>,
    samples: mpsc::UnboundedSender<LoopSample>,
}

impl ActorSink {
    pub(crate) fn new(
        status: watch::Receiver<SessionStatus>,
        samples: mpsc::UnboundedSender<LoopSample>,
    ) -> Self {
        Self { status, samples }
    }
}

impl SampleSink for ActorSink {
    fn ready(&self) -> bool {
        self.status.borrow().ready_to_send
    }

    fn submit(&self, generation: u64, p1: f64, p2: f64) {
        if self
            .samples
            .send(LoopSample { generation, p1, p2 })
            .is_err()
        {
            debug!("[STREAM] Client actor gone, sample dropped");
        }
    }
}

pub(crate) struct ClientActor {
    server_url: String,
    machine: SessionStateMachine,
    transport: Arc<dyn Transport>,
    streaming: StreamingLoop,
    dispatcher: EventDispatcher,
    status_tx: watch::Sender<SessionStatus>,
}

impl ClientActor {
    pub(crate) fn new(
        server_url: String,
        transport: Arc<dyn Transport>,
        streaming: StreamingLoop,
        dispatcher: EventDispatcher,
        status_tx: watch::Sender<SessionStatus>,
    ) -> Self {
        Self {
            server_url,
            machine: SessionStateMachine::new(),
            transport,
            streaming,
            dispatcher,
            status_tx,
        }
    }

    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        mut samples: mpsc::UnboundedReceiver<LoopSample>,
    ) {
        info!("[CLIENT] Session actor started (server {})", self.server_url);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        let report = self.teardown().await;
                        let _ = reply.send(report);
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        info!("[CLIENT] All client handles dropped; shutting down");
                        self.teardown().await;
                        break;
                    }
                },
                Some(event) = events.recv() => self.handle_transport_event(event).await,
                Some(sample) = samples.recv() => self.handle_sample(sample),
            }
        }

        let ClientActor { dispatcher, .. } = self;
        dispatcher.close().await;
        info!("[CLIENT] Session actor stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Login { credentials } => {
                info!("[CLIENT] Login requested for '{}'", credentials.username());
                let actions = self.machine.login(credentials);
                self.execute(actions).await;
            }
            Command::SignOut { reply } => {
                info!("[CLIENT] Sign-out requested");
                let actions = self.machine.sign_out();
                let report = self.execute_teardown(actions).await;
                report.log("Sign-out");
                let _ = reply.send(report);
            }
            Command::SendProbabilities { p1, p2, reply } => {
                let sent = self.send_probabilities(p1, p2);
                let _ = reply.send(sent);
            }
            // handled in run()
            Command::Shutdown { .. } => {}
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let session_event = match event {
            TransportEvent::Connected => {
                info!("[CLIENT] Connected to server");
                SessionEvent::Connected
            }
            TransportEvent::ConnectionError(msg) => {
                warn!("[CLIENT] Could not connect to server: {}", msg);
                SessionEvent::ConnectionError(msg)
            }
            TransportEvent::Disconnected(reason) => {
                info!("[CLIENT] Disconnected from server ({})", reason);
                SessionEvent::Disconnected(reason)
            }
            TransportEvent::Packet(packet) => {
                info!(
                    "[SESSION] RECV [{}] {}",
                    command_name(packet.cmd),
                    packet.data
                );
                match InboundMessage::parse(&packet) {
                    Ok(message) => SessionEvent::Inbound(message),
                    Err(e) => {
                        debug!("[SESSION] Dropping malformed packet: {}", e);
                        return;
                    }
                }
            }
        };

        let actions = self.machine.on_event(session_event);
        self.execute(actions).await;
    }

    fn handle_sample(&mut self, sample: LoopSample) {
        if !self.streaming.is_current(sample.generation) {
            debug!(
                "[STREAM] Dropping sample from stopped loop generation {}",
                sample.generation
            );
            return;
        }
        self.send_probabilities(sample.p1, sample.p2);
    }

    fn send_probabilities(&mut self, p1: f64, p2: f64) -> bool {
        if !self.machine.is_ready_to_send() {
            debug!("[CLIENT] Not ready to send; sample skipped");
            return false;
        }
        let sample = match ProbabilitySample::new(p1, p2) {
            Ok(sample) => sample,
            Err(e) => {
                debug!("[CLIENT] Rejected sample: {}", e);
                return false;
            }
        };
        match self.machine.data_transmission(sample, timestamp_now()) {
            Some(message) => self.emit(&message).is_ok(),
            None => false,
        }
    }

    fn emit(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let opcode = message.opcode();
        if opcode == Opcode::DataTransmission {
            debug!(
                "[SESSION] SEND → {} [{}] {}",
                message.destination(),
                opcode,
                message.log_payload()
            );
        } else {
            info!(
                "[SESSION] SEND → {} [{}] {}",
                message.destination(),
                opcode,
                message.log_payload()
            );
        }

        self.transport.emit(&message.to_packet()).map_err(|e| {
            warn!("[CLIENT] Emit of {} failed: {}", opcode, e);
            e
        })
    }

    async fn perform(&mut self, action: SessionAction) -> StepOutcome {
        match action {
            SessionAction::Connect => {
                info!("[CLIENT] Connecting to {}", self.server_url);
                self.transport.connect(&self.server_url);
                StepOutcome::Done
            }
            SessionAction::Emit(message) => match self.emit(&message) {
                Ok(()) => StepOutcome::Done,
                Err(e) => StepOutcome::Failed(e.to_string()),
            },
            SessionAction::StartStreaming => {
                if self.streaming.start() {
                    StepOutcome::Done
                } else {
                    StepOutcome::Skipped
                }
            }
            SessionAction::StopStreaming => match self.streaming.stop().await {
                StopOutcome::NotRunning => StepOutcome::Skipped,
                StopOutcome::Stopped => StepOutcome::Done,
                StopOutcome::Aborted => {
                    StepOutcome::Failed("streaming loop missed stop timeout; aborted".into())
                }
            },
            SessionAction::Disconnect => {
                self.transport.disconnect();
                StepOutcome::Done
            }
            SessionAction::Notify(event) => {
                self.dispatcher.dispatch(event);
                StepOutcome::Done
            }
        }
    }

    async fn execute(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            self.perform(action).await;
        }
        self.publish();
    }

    async fn execute_teardown(&mut self, actions: Vec<SessionAction>) -> TeardownReport {
        let mut report = TeardownReport::default();
        for action in actions {
            let step = action.clone();
            let outcome = self.perform(action).await;
            report.record(&step, outcome);
        }
        self.publish();
        report
    }

    async fn teardown(&mut self) -> TeardownReport {
        let actions = self.machine.shutdown();
        let report = self.execute_teardown(actions).await;
        report.log("Shutdown");
        report
    }

    fn publish(&self) {
        let status = self.machine.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
