//! Per-session message dispatcher: decode player messages and route them.
//!
//! One task per session consumes a single input queue carrying both wire
//! messages and lifecycle signals, so everything is handled in delivery order
//! and the session state needs no locks. Bad input is logged and dropped; the
//! session runs until the host asserts permanent termination, which flushes
//! the pending progress report at most once.

use crate::analytics::AnalyticsReporter;
use crate::bridge::protocol::{self, OutboundCommand, PlayerMessage};
use crate::lifecycle::{HostEvent, LifecycleSignal};
use crate::session::ReaderSession;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const INPUT_QUEUE: usize = 32;

/// Input to a session's dispatcher task.
#[derive(Debug)]
pub enum SessionInput {
    /// Raw wire string from the content surface.
    Wire(String),
    /// Lifecycle signal asserted by the host shell.
    Lifecycle(LifecycleSignal),
}

/// Handle to a running session bridge: feed inputs, await completion.
pub struct BridgeHandle {
    input_tx: mpsc::Sender<SessionInput>,
    task: JoinHandle<()>,
}

impl BridgeHandle {
    /// Deliver a raw player message. Callable from any execution context;
    /// processing order is the delivery order.
    pub async fn deliver_wire(&self, raw: impl Into<String>) -> Result<(), String> {
        self.input_tx
            .send(SessionInput::Wire(raw.into()))
            .await
            .map_err(|_| "session input queue closed".to_string())
    }

    /// Assert a lifecycle signal for this session.
    pub async fn signal(&self, signal: LifecycleSignal) -> Result<(), String> {
        self.input_tx
            .send(SessionInput::Lifecycle(signal))
            .await
            .map_err(|_| "session input queue closed".to_string())
    }

    /// Sender for transports that enqueue inputs directly.
    pub fn sender(&self) -> mpsc::Sender<SessionInput> {
        self.input_tx.clone()
    }

    /// Wait for the dispatcher task to end. Signal `Terminated` first; joining
    /// alone closes the queue without a flush.
    pub async fn join(self) {
        let BridgeHandle { input_tx, task } = self;
        drop(input_tx);
        let _ = task.await;
    }
}

/// Start a session bridge: spawns the dispatcher task that owns the session
/// state and returns the handle for feeding it.
pub fn start_session(
    session: ReaderSession,
    reporter: AnalyticsReporter,
    outbound_tx: mpsc::Sender<OutboundCommand>,
    host_tx: mpsc::Sender<HostEvent>,
) -> BridgeHandle {
    let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE);
    let task = tokio::spawn(run_dispatcher(
        session,
        reporter,
        outbound_tx,
        host_tx,
        input_rx,
    ));
    BridgeHandle { input_tx, task }
}

async fn run_dispatcher(
    mut session: ReaderSession,
    reporter: AnalyticsReporter,
    outbound_tx: mpsc::Sender<OutboundCommand>,
    host_tx: mpsc::Sender<HostEvent>,
    mut input_rx: mpsc::Receiver<SessionInput>,
) {
    log::info!("session {} started for {}", session.id, session.book);
    let mut terminated = false;
    while let Some(input) = input_rx.recv().await {
        match input {
            SessionInput::Wire(raw) => {
                handle_wire(&mut session, &reporter, &outbound_tx, &host_tx, &raw).await;
            }
            SessionInput::Lifecycle(signal) => match signal {
                LifecycleSignal::Suspended => {
                    log::debug!("session {} suspended; progress retained", session.id);
                }
                LifecycleSignal::Resumed => {
                    log::debug!("session {} resumed", session.id);
                }
                LifecycleSignal::BookReplaced(path) => {
                    if host_tx.send(HostEvent::ReplaceBook(path)).await.is_err() {
                        log::warn!("session {}: host event channel closed", session.id);
                    }
                }
                LifecycleSignal::Terminated => {
                    flush_progress(&mut session, &reporter).await;
                    terminated = true;
                    break;
                }
            },
        }
    }
    if !terminated {
        // Queue closed without an explicit termination signal. Suspension vs
        // termination must be asserted, never inferred, so nothing is flushed.
        log::warn!(
            "session {}: input queue closed without termination; progress report dropped",
            session.id
        );
    }
    log::info!("session {} ended", session.id);
}

/// Send the pending progress report, if any, as the session's final analytics
/// event. At most one submission per session.
async fn flush_progress(session: &mut ReaderSession, reporter: &AnalyticsReporter) {
    if let Some(report) = session.progress.take_and_clear() {
        reporter.report(&report).await;
    }
}

async fn handle_wire(
    session: &mut ReaderSession,
    reporter: &AnalyticsReporter,
    outbound_tx: &mpsc::Sender<OutboundCommand>,
    host_tx: &mpsc::Sender<HostEvent>,
    raw: &str,
) {
    let msg = match protocol::decode(raw) {
        Ok(msg) => msg,
        Err(e) => {
            log::error!("session {}: {}", session.id, e);
            return;
        }
    };
    match msg {
        PlayerMessage::RequestCapabilities => {
            if outbound_tx
                .send(OutboundCommand::capabilities())
                .await
                .is_err()
            {
                log::warn!("session {}: outbound channel closed", session.id);
            }
        }
        PlayerMessage::BackButtonClicked => {
            if host_tx.send(HostEvent::CloseRequested).await.is_err() {
                log::warn!("session {}: host event channel closed", session.id);
            }
        }
        PlayerMessage::SendAnalytics(payload) => {
            reporter.report(&payload).await;
        }
        PlayerMessage::UpdateBookProgressReport(report) => {
            session.progress.update(report);
        }
        PlayerMessage::Unknown(tag) => {
            log::error!("session {}: unexpected message: {}", session.id, tag);
        }
    }
}
