//! Outbound content channel: delivery of host→player commands.
//!
//! Commands may be produced from any task; delivery happens on a single pump
//! task that owns the content surface. That task stands in for the UI-owning
//! execution context of the embedding shell, so the surface is only ever
//! invoked from one place and in enqueue order.

use crate::bridge::{delivery_script, OutboundCommand};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The player's receiving side: evaluates a delivery script in the content
/// surface (a webview evaluate call, a test recorder, stdout). Implementations
/// must not block; they are invoked only from the pump task.
pub trait ContentSurface: Send + Sync {
    fn deliver(&self, script: &str);
}

const OUTBOUND_QUEUE: usize = 16;

/// Create the outbound channel and start its pump: the single consumer that
/// encodes commands, escapes them for the receiver literal, and hands them to
/// the surface. The pump ends when every sender is dropped.
pub fn spawn_outbound_pump(
    surface: Arc<dyn ContentSurface>,
) -> (mpsc::Sender<OutboundCommand>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<OutboundCommand>(OUTBOUND_QUEUE);
    let handle = tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            let script = delivery_script(&cmd.to_wire());
            surface.deliver(&script);
        }
        log::debug!("outbound pump stopped");
    });
    (tx, handle)
}
