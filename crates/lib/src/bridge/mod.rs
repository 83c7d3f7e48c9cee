//! Host↔player bridge: wire protocol plus the per-session dispatcher.
//!
//! Inbound player messages are decoded and routed to host capabilities;
//! outbound commands are queued for delivery on the UI-owning pump.

mod dispatcher;
mod protocol;

pub use dispatcher::{start_session, BridgeHandle, SessionInput};
pub use protocol::{decode, delivery_script, OutboundCommand, PlayerMessage, ProtocolError};
