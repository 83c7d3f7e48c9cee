//! Player wire protocol: decode player→host messages, encode host→player commands.
//!
//! Both directions are JSON objects with a `messageType` discriminator. Outbound
//! commands are delivered by invoking the player's `receiveMessage` entry point
//! with the encoded JSON as its sole (double-quoted) string argument, so the
//! encoded text is escaped before it is embedded in that literal.

use serde::Serialize;
use serde_json::Value;

/// JS entry point on the player page that receives host→player commands.
const PLAYER_RECEIVE_FN: &str = "window.FolioPlayer.receiveMessage";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed player message: {0}")]
    Malformed(String),
}

/// Decoded player→host message. Recognized discriminators map to variants;
/// anything else is preserved as `Unknown` so the dispatcher can log and drop
/// it without failing the session.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerMessage {
    /// Player asks what the host can do; answered with a capabilities command.
    RequestCapabilities,
    /// Player's back control was activated.
    BackButtonClicked,
    /// Analytics payload to submit immediately (carries `event` and `params`).
    SendAnalytics(Value),
    /// Progress report to hold until session end; overwrites any previous one.
    UpdateBookProgressReport(Value),
    Unknown(String),
}

/// Parse a raw wire string into a typed message. Fails when the top level is
/// not a JSON object or `messageType` is missing, non-string, or empty.
pub fn decode(raw: &str) -> Result<PlayerMessage, ProtocolError> {
    let data: Value =
        serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let tag = data
        .get("messageType")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProtocolError::Malformed("missing messageType".to_string()))?
        .to_string();
    let msg = match tag.as_str() {
        "requestCapabilities" => PlayerMessage::RequestCapabilities,
        "backButtonClicked" => PlayerMessage::BackButtonClicked,
        "sendAnalytics" => PlayerMessage::SendAnalytics(data),
        "updateBookProgressReport" => PlayerMessage::UpdateBookProgressReport(data),
        _ => PlayerMessage::Unknown(tag),
    };
    Ok(msg)
}

/// Host→player command, tagged with `messageType` on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "messageType")]
pub enum OutboundCommand {
    #[serde(rename = "capabilities", rename_all = "camelCase")]
    Capabilities { can_go_back: bool },
}

impl OutboundCommand {
    /// The capabilities this host announces to the player.
    pub fn capabilities() -> Self {
        Self::Capabilities { can_go_back: true }
    }

    /// Serialize to the wire JSON string.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Escape a wire string for embedding in a double-quoted JS string literal.
/// Backslashes first, then quotes, so the literal stays well-formed and the
/// receiver sees exactly the original text.
fn escape_for_literal(wire: &str) -> String {
    wire.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Build the JS call that delivers a wire string to the player.
pub fn delivery_script(wire: &str) -> String {
    format!("{}(\"{}\")", PLAYER_RECEIVE_FN, escape_for_literal(wire))
}
