// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Periodic probability streaming loop.
//!
//! One background task per start. Each tick it checks readiness through the
//! [`SampleSink`]; when not ready it waits the short backoff and rechecks,
//! otherwise it samples the source, submits the pair and waits the full
//! interval. Every started loop gets a fresh generation number that tags its
//! submissions; the sink owner rejects samples whose generation is no longer
//! current, so nothing submitted by a stopped loop is ever sent.

use crate::source::ProbabilitySource;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Cadence settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Time between submissions
    pub interval: Duration,
    /// Recheck delay while not ready
    pub not_ready_backoff: Duration,
    /// How long `stop` waits for the task before aborting it
    pub stop_timeout: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            not_ready_backoff: Duration::from_millis(250),
            stop_timeout: Duration::from_secs(2),
        }
    }
}

/// Where the loop checks readiness and delivers samples
pub trait SampleSink: Send + Sync + 'static {
    fn ready(&self) -> bool;

    /// Hand over one raw sample; must not block
    fn submit(&self, generation: u64, p1: f64, p2: f64);
}

/// Result of [`StreamingLoop::stop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    Stopped,
    /// Task missed the stop timeout and was aborted
    Aborted,
}

struct RunningLoop {
    generation: u64,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct StreamingLoop {
    config: StreamingConfig,
    source: Arc<Mutex<Box<dyn ProbabilitySource>>>,
    sink: Arc<dyn SampleSink>,
    /// Generation of the running loop, 0 when stopped
    active_generation: Arc<AtomicU64>,
    next_generation: u64,
    running: Option<RunningLoop>,
}

impl StreamingLoop {
    pub fn new(
        config: StreamingConfig,
        source: Box<dyn ProbabilitySource>,
        sink: Arc<dyn SampleSink>,
    ) -> Self {
        Self {
            config,
            source: Arc::new(Mutex::new(source)),
            sink,
            active_generation: Arc::new(AtomicU64::new(0)),
            next_generation: 1,
            running: None,
        }
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map(|r| !r.handle.is_finished())
            .unwrap_or(false)
    }

    /// Whether samples tagged with `generation` may still be sent
    pub fn is_current(&self, generation: u64) -> bool {
        generation != 0 && self.active_generation.load(Ordering::SeqCst) == generation
    }

    /// Start the loop. Returns false if it was already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("[STREAM] Start ignored, loop already running");
            return false;
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.active_generation.store(generation, Ordering::SeqCst);

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            generation,
            self.config,
            self.source.clone(),
            self.sink.clone(),
            stop_rx,
        ));

        info!(
            "[STREAM] Started loop generation {} (interval {:?})",
            generation, self.config.interval
        );
        self.running = Some(RunningLoop {
            generation,
            stop_tx,
            handle,
        });
        true
    }

    /// Signal the loop to stop and wait up to the stop timeout for it to exit
    pub async fn stop(&mut self) -> StopOutcome {
        let Some(running) = self.running.take() else {
            return StopOutcome::NotRunning;
        };

        self.active_generation.store(0, Ordering::SeqCst);
        let _ = running.stop_tx.send(true);

        let mut handle = running.handle;
        match tokio::time::timeout(self.config.stop_timeout, &mut handle).await {
            Ok(_) => {
                info!("[STREAM] Stopped loop generation {}", running.generation);
                StopOutcome::Stopped
            }
            Err(_) => {
                warn!(
                    "[STREAM] Loop generation {} did not exit within {:?}; aborting",
                    running.generation, self.config.stop_timeout
                );
                handle.abort();
                StopOutcome::Aborted
            }
        }
    }
}

impl Drop for StreamingLoop {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.handle.abort();
        }
    }
}

async fn run(
    generation: u64,
    config: StreamingConfig,
    source: Arc<Mutex<Box<dyn ProbabilitySource>>>,
    sink: Arc<dyn SampleSink>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        if *stop_rx.borrow() {
            break;
        }

        let delay = if sink.ready() {
            let (p1, p2) = source.lock().sample();
            sink.submit(generation, p1, p2);
            config.interval
        } else {
            config.not_ready_backoff
        };

        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
    debug!("[STREAM] Loop generation {} exited", generation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FixedSource;
    use std::sync::atomic::AtomicBool;

    #[derive(Default)]
    struct RecordingSink {
        ready: AtomicBool,
        samples: Mutex<Vec<(u64, f64, f64)>>,
    }

    impl SampleSink for RecordingSink {
        fn ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn submit(&self, generation: u64, p1: f64, p2: f64) {
            self.samples.lock().push((generation, p1, p2));
        }
    }

    fn streaming(sink: Arc<RecordingSink>) -> StreamingLoop {
        StreamingLoop::new(
            StreamingConfig::default(),
            Box::new(FixedSource(0.4, 0.6)),
            sink,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn emits_once_per_interval_when_ready() {
        let sink = Arc::new(RecordingSink::default());
        sink.ready.store(true, Ordering::SeqCst);
        let mut stream = streaming(sink.clone());

        assert!(stream.start());
        tokio::time::sleep(Duration::from_millis(3500)).await;
        // ticks at 0, 1000, 2000, 3000
        assert_eq!(sink.samples.lock().len(), 4);
        assert!(sink.samples.lock().iter().all(|s| *s == (1, 0.4, 0.6)));

        assert_eq!(stream.stop().await, StopOutcome::Stopped);
        let count = sink.samples.lock().len();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.samples.lock().len(), count);
    }

    #[tokio::test(start_paused = true)]
    async fn backs_off_while_not_ready() {
        let sink = Arc::new(RecordingSink::default());
        let mut stream = streaming(sink.clone());
        stream.start();

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(sink.samples.lock().is_empty());

        sink.ready.store(true, Ordering::SeqCst);
        // next recheck at 1000ms
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(sink.samples.lock().len(), 1);
        stream.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_and_generations_advance() {
        let sink = Arc::new(RecordingSink::default());
        let mut stream = streaming(sink.clone());

        assert!(stream.start());
        assert!(!stream.start());
        assert!(stream.is_current(1));

        assert_eq!(stream.stop().await, StopOutcome::Stopped);
        assert!(!stream.is_current(1));
        assert_eq!(stream.stop().await, StopOutcome::NotRunning);

        assert!(stream.start());
        assert!(stream.is_current(2));
        assert!(!stream.is_current(1));
        stream.stop().await;
    }
}
