// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-process supervisor that ties PTY backends, rings, screens and
//! the session state machine together and answers [`Request`]s with
//! [`Event`]s, mirroring the select-loop multiplexer the teacher runs per
//! session but fanned out over every supervised session at once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::HostConfig;
use crate::error::{ErrorCode, HostCrashKind, HostError, SpawnErrorCode};
use crate::protocol::{Event, FlowStatus, Request};
use crate::pty::{Backend, ExitStatus, NativePty};
use crate::screen::Screen;
use crate::scrollback::Scrollback;
use crate::session::{ActivityTier, Session, SpawnParams};
use crate::state_machine::{Candidate, CompositeDetector, SessionState, Trigger};
use crate::streaming::{FlowState, Streaming};
use crate::suspend::SuspendController;

/// Mutable state shared between the request handler and a session's
/// output-pump task.
struct SessionInner {
    session: Session,
    streaming: Streaming,
    scrollback: Scrollback,
    screen: Screen,
    detector: CompositeDetector,
}

struct SessionHandle {
    inner: Arc<Mutex<SessionInner>>,
    input_tx: mpsc::Sender<Bytes>,
    backend: Arc<dyn Backend>,
    pump: JoinHandle<()>,
}

/// Owns every supervised session and answers the PTY Host wire protocol.
pub struct Host {
    config: HostConfig,
    sessions: HashMap<String, SessionHandle>,
    suspend: SuspendController,
    events_tx: mpsc::Sender<Event>,
}

impl Host {
    pub fn new(config: HostConfig, events_tx: mpsc::Sender<Event>) -> Self {
        let handshake_timeout = Duration::from_secs(config.handshake_timeout_secs);
        Self {
            config,
            sessions: HashMap::new(),
            suspend: SuspendController::new(handshake_timeout),
            events_tx,
        }
    }

    /// Emit the startup `ready` event. Call once before serving requests.
    pub async fn announce_ready(&self) {
        let _ = self.events_tx.send(Event::Ready).await;
    }

    /// Dispatch one request, returning the events it directly produces.
    /// Asynchronous effects (streamed `data`, eventual `exit`) arrive later
    /// on the shared event channel via each session's pump task.
    pub async fn handle(&mut self, req: Request) -> Vec<Event> {
        match req {
            Request::Spawn { session_id, params } => vec![self.spawn(session_id, params).await],
            Request::Write { session_id, bytes } => self.write(&session_id, Bytes::from(bytes)).await,
            Request::Submit { session_id, line } => {
                let mut bytes = line.into_bytes();
                bytes.push(b'\n');
                self.write(&session_id, Bytes::from(bytes)).await
            }
            Request::Resize { session_id, cols, rows } => self.resize(&session_id, cols, rows),
            Request::Kill { session_id } => self.kill(&session_id).await,
            Request::Trash { session_id, expiry_ms } => self.trash(&session_id, expiry_ms).await,
            Request::Restore { session_id } => self.restore(&session_id).await,
            Request::SetActivityTier { session_id, tier } => self.set_tier(&session_id, tier).await,
            Request::WakeTerminal { session_id } => vec![self.wake_terminal(&session_id).await],
            Request::GetSnapshot { session_id } => vec![self.wake_result_snapshot(&session_id).await],
            Request::GetAllSnapshots => self.all_snapshots().await,
            Request::ReplayHistory { session_id, lines } => self.replay_history(&session_id, lines).await,
            Request::TransitionState { session_id, state, trigger, confidence, cause } => {
                self.transition_state(&session_id, state, trigger, confidence, cause).await
            }
            Request::HealthCheck => vec![Event::Pong],
            Request::PauseAll => {
                self.suspend.pause_all();
                vec![]
            }
            Request::ResumeAll => {
                self.suspend.resume_all(Instant::now());
                vec![]
            }
            Request::Dispose => self.dispose().await,
        }
    }

    async fn spawn(&mut self, session_id: String, params: SpawnParams) -> Event {
        if self.sessions.contains_key(&session_id) {
            return Event::SpawnResult {
                session_id,
                result: Err(HostError::new(ErrorCode::InvalidState, "session already exists")),
            };
        }

        let term = self.config.term.clone();
        let backend = match NativePty::spawn(
            &params.command,
            &params.args,
            &params.env,
            &term,
            params.cols,
            params.rows,
        ) {
            Ok(b) => Arc::new(b) as Arc<dyn Backend>,
            Err(e) => {
                let code = classify_spawn_error(&e);
                return Event::SpawnResult {
                    session_id,
                    result: Err(HostError::new(
                        ErrorCode::SpawnFailed,
                        format!("{code:?}: {e}"),
                    )),
                };
            }
        };

        let session = Session::new(session_id.clone(), params.clone());
        let inner = Arc::new(Mutex::new(SessionInner {
            session,
            streaming: Streaming::new(
                ActivityTier::Active,
                self.config.ring_size,
                self.config.watermark_high,
                self.config.watermark_low,
            ),
            scrollback: Scrollback::new(self.config.scrollback_size),
            screen: Screen::new(params.cols, params.rows),
            detector: CompositeDetector::new(SessionState::Idle),
        }));

        let (output_tx, output_rx) = mpsc::channel::<Bytes>(256);
        let (input_tx, input_rx) = mpsc::channel::<Bytes>(256);

        let backend_for_run = Arc::clone(&backend);
        let run_handle: JoinHandle<anyhow::Result<ExitStatus>> =
            tokio::spawn(async move { backend_for_run.run(output_tx, input_rx).await });

        let pump = tokio::spawn(pump_output(
            session_id.clone(),
            Arc::clone(&inner),
            output_rx,
            run_handle,
            self.events_tx.clone(),
        ));

        self.sessions.insert(session_id.clone(), SessionHandle { inner, input_tx, backend, pump });
        Event::SpawnResult { session_id, result: Ok(()) }
    }

    async fn write(&mut self, session_id: &str, bytes: Bytes) -> Vec<Event> {
        let Some(handle) = self.sessions.get(session_id) else {
            return vec![disconnected(session_id)];
        };
        {
            let mut inner = handle.inner.lock().await;
            inner.session.record_input();
        }
        if handle.input_tx.send(bytes).await.is_err() {
            return vec![disconnected(session_id)];
        }
        vec![]
    }

    fn resize(&mut self, session_id: &str, cols: u16, rows: u16) -> Vec<Event> {
        let Some(handle) = self.sessions.get(session_id) else {
            return vec![disconnected(session_id)];
        };
        if let Err(e) = handle.backend.resize(cols, rows) {
            return vec![Event::Error {
                session_id: Some(session_id.to_owned()),
                error: HostError::new(ErrorCode::IoError, e.to_string()),
            }];
        }
        vec![]
    }

    async fn kill(&mut self, session_id: &str) -> Vec<Event> {
        if let Some(handle) = self.sessions.remove(session_id) {
            drop(handle.input_tx);
            handle.pump.abort();
        }
        vec![]
    }

    async fn trash(&mut self, session_id: &str, expiry_ms: u64) -> Vec<Event> {
        let Some(handle) = self.sessions.get(session_id) else {
            return vec![disconnected(session_id)];
        };
        handle.inner.lock().await.session.mark_trashed(expiry_ms);
        vec![Event::TerminalTrashed { session_id: session_id.to_owned() }]
    }

    async fn restore(&mut self, session_id: &str) -> Vec<Event> {
        let Some(handle) = self.sessions.get(session_id) else {
            return vec![disconnected(session_id)];
        };
        handle.inner.lock().await.session.restore();
        vec![Event::TerminalRestored { session_id: session_id.to_owned() }]
    }

    async fn set_tier(&mut self, session_id: &str, tier: ActivityTier) -> Vec<Event> {
        let Some(handle) = self.sessions.get(session_id) else {
            return vec![disconnected(session_id)];
        };
        let mut inner = handle.inner.lock().await;
        match tier {
            ActivityTier::Active => inner.streaming.set_active(),
            ActivityTier::Background => inner.streaming.set_background(),
        }
        inner.session.activity_tier = tier;
        vec![]
    }

    async fn wake_terminal(&mut self, session_id: &str) -> Event {
        self.wake_result_snapshot(session_id).await
    }

    async fn wake_result_snapshot(&mut self, session_id: &str) -> Event {
        let Some(handle) = self.sessions.get(session_id) else {
            return Event::WakeResult {
                session_id: session_id.to_owned(),
                result: Err(HostError::new(ErrorCode::NotFound, "no such session")),
            };
        };
        let mut inner = handle.inner.lock().await;
        if inner.streaming.tier() == ActivityTier::Background {
            inner.streaming.set_active();
            inner.session.activity_tier = ActivityTier::Active;
        }
        Event::WakeResult { session_id: session_id.to_owned(), result: Ok(inner.screen.snapshot()) }
    }

    async fn all_snapshots(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.sessions.len());
        for (id, handle) in &self.sessions {
            let inner = handle.inner.lock().await;
            events.push(Event::WakeResult { session_id: id.clone(), result: Ok(inner.screen.snapshot()) });
        }
        events
    }

    async fn replay_history(&mut self, session_id: &str, lines: usize) -> Vec<Event> {
        let Some(handle) = self.sessions.get(session_id) else {
            return vec![disconnected(session_id)];
        };
        let inner = handle.inner.lock().await;
        let text = inner.scrollback.last_lines(lines).join("\n");
        vec![Event::Data { session_id: session_id.to_owned(), bytes: text.into_bytes() }]
    }

    /// Feed an out-of-band state candidate through the session's detector,
    /// applying the transition if it clears threshold and replying with the
    /// outcome either way.
    async fn transition_state(
        &mut self,
        session_id: &str,
        state: SessionState,
        trigger: Trigger,
        confidence: f64,
        cause: String,
    ) -> Vec<Event> {
        let Some(handle) = self.sessions.get(session_id) else {
            return vec![disconnected(session_id)];
        };
        let mut inner = handle.inner.lock().await;
        let candidate = Candidate { state, trigger, confidence, cause };

        let prev = inner.session.state;
        let Some(next) = inner.detector.feed(&candidate) else {
            return vec![Event::TransitionResult { session_id: session_id.to_owned(), accepted: false, state: prev }];
        };
        if inner.session.apply_transition(next).is_err() {
            return vec![Event::TransitionResult { session_id: session_id.to_owned(), accepted: false, state: prev }];
        }

        vec![
            Event::AgentState {
                session_id: session_id.to_owned(),
                prev,
                next,
                timestamp_epoch_ms: crate::session::now_epoch_ms(),
                trigger: candidate.trigger,
                confidence,
                worktree_id: inner.session.worktree_id.clone(),
            },
            Event::TransitionResult { session_id: session_id.to_owned(), accepted: true, state: next },
        ]
    }

    async fn dispose(&mut self) -> Vec<Event> {
        for (_, handle) in self.sessions.drain() {
            drop(handle.input_tx);
            handle.pump.abort();
        }
        vec![]
    }

    /// Periodic housekeeping: idle-quiescence detection, handshake
    /// fallback expiry, and background-tier snapshot refresh. The caller
    /// drives this on a `tokio::time::interval` tick.
    pub async fn housekeeping_tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let now = Instant::now();

        if self.suspend.check_fallback_expired(now) {
            events.push(Event::HostThrottled { reason: "resume handshake fallback expired".into() });
        }

        let idle_timeout = Duration::from_millis(self.config.idle_timeout_ms);
        for (id, handle) in &self.sessions {
            let mut inner = handle.inner.lock().await;
            let last_output = inner.session.last_output_time_epoch_ms;
            let elapsed_ms = crate::session::now_epoch_ms().saturating_sub(last_output);
            if inner.session.state == SessionState::Working
                && elapsed_ms >= idle_timeout.as_millis() as u64
            {
                let candidate =
                    Candidate { state: SessionState::Idle, trigger: Trigger::OutputQuiescence, confidence: 0.9, cause: "output quiescence".into() };
                if let Some(next) = inner.detector.feed(&candidate) {
                    let prev = inner.session.state;
                    if inner.session.apply_transition(next).is_ok() {
                        events.push(Event::AgentState {
                            session_id: id.clone(),
                            prev,
                            next,
                            timestamp_epoch_ms: crate::session::now_epoch_ms(),
                            trigger: Trigger::OutputQuiescence,
                            confidence: candidate.confidence,
                            worktree_id: inner.session.worktree_id.clone(),
                        });
                    }
                }
            }
        }
        events
    }
}

/// Background task: drains a session's backend output into its screen,
/// scrollback, and (when `active`) ring, emitting `data`/`terminal-status`
/// events, then emits `exit` once the backend task completes.
async fn pump_output(
    session_id: String,
    inner: Arc<Mutex<SessionInner>>,
    mut output_rx: mpsc::Receiver<Bytes>,
    run_handle: JoinHandle<anyhow::Result<ExitStatus>>,
    events_tx: mpsc::Sender<Event>,
) {
    while let Some(chunk) = output_rx.recv().await {
        let mut guard = inner.lock().await;
        guard.screen.feed(&chunk);
        guard.session.record_output();
        guard.scrollback.write(&chunk);

        let tier = guard.streaming.tier();
        if tier == ActivityTier::Active {
            if let Some(ring) = guard.streaming.ring_mut() {
                if let Ok(framed) = basecamp_ring::encode(&session_id, &chunk) {
                    let _ = ring.write(&framed);
                }
            }
            if let Some(flow) = guard.streaming.observe_utilization() {
                let status = match flow {
                    FlowState::Paused => FlowStatus::Paused,
                    FlowState::Flowing => FlowStatus::Resumed,
                };
                let _ =
                    events_tx.send(Event::TerminalStatus { session_id: session_id.clone(), status }).await;
            }
            drop(guard);
            let _ = events_tx.send(Event::Data { session_id: session_id.clone(), bytes: chunk.to_vec() }).await;
        }
    }

    let status = match run_handle.await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            warn!(session_id, error = %e, "backend task returned error");
            ExitStatus { code: None, signal: None }
        }
        Err(e) => {
            warn!(session_id, error = %e, "backend task panicked or was cancelled");
            ExitStatus { code: None, signal: None }
        }
    };

    {
        let mut guard = inner.lock().await;
        let candidate = Candidate {
            state: SessionState::Completed,
            trigger: Trigger::Completion,
            confidence: 1.0,
            cause: "backend exited".into(),
        };
        let prev = guard.session.state;
        if let Some(next) = guard.detector.feed(&candidate) {
            let _ = guard.session.apply_transition(next);
        }
        info!(session_id, prev = ?prev, code = ?status.code, signal = ?status.signal, "session backend exited");
    }

    let _ = events_tx.send(Event::Exit { session_id, code: status.code, signal: status.signal }).await;
}

fn disconnected(session_id: &str) -> Event {
    Event::Error {
        session_id: Some(session_id.to_owned()),
        error: HostError::new(ErrorCode::Disconnected, "no such session"),
    }
}

fn classify_spawn_error(e: &anyhow::Error) -> SpawnErrorCode {
    for cause in e.chain() {
        if let Some(errno) = cause.downcast_ref::<nix::errno::Errno>() {
            return SpawnErrorCode::from_errno(*errno);
        }
    }
    SpawnErrorCode::Unknown
}

/// Classify the PTY Host process's own exit status for the controller to
/// decide whether to respawn.
pub fn classify_host_crash(code: Option<i32>, signal: Option<i32>) -> HostCrashKind {
    HostCrashKind::classify(code, signal)
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
