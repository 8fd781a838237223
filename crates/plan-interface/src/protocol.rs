//! The length-prefixed remote command/observe protocol (spec §6,
//! "Interface (command / observe)").
//!
//! Packets are tagged tuples serialized as length-prefixed JSON
//! frames, mirroring the envelope-per-frame shape of a WebSocket
//! message protocol but over a plain stream channel (socket or pipe)
//! instead of a WebSocket upgrade.

use crate::error::{InterfaceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use uuid::Uuid;

/// One frame of the wire protocol (spec §6's packet list).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Packet {
    Call { path: String, method: String, args: serde_json::Value },
    Reply { value: serde_json::Value },
    BadCall { error: String },
    ProcessBatch { calls: Vec<Packet> },
    Notification { source: String, level: String, message: String },
    CycleEnd { stats: serde_json::Value },
    UiEvent { name: String, args: serde_json::Value },
    ProtocolError { error: String },
    Handshake { version: String, requested_commands: Vec<String> },
    HandshakeAck { handles: HashMap<String, String> },
}

/// Write a length-prefixed frame: a 4-byte big-endian length followed
/// by the JSON-encoded packet.
pub fn write_frame<W: Write>(w: &mut W, packet: &Packet) -> Result<()> {
    let body = serde_json::to_vec(packet).map_err(|e| InterfaceError::Protocol(e.to_string()))?;
    let len = u32::try_from(body.len()).map_err(|_| InterfaceError::Protocol("frame too large".into()))?;
    w.write_all(&len.to_be_bytes())?;
    w.write_all(&body)?;
    Ok(())
}

/// Read one length-prefixed frame, blocking until it is fully
/// available. Returns `Ok(None)` on clean EOF before any bytes of the
/// next frame arrive.
pub fn read_frame<R: Read>(r: &mut R) -> Result<Option<Packet>> {
    let mut len_buf = [0u8; 4];
    match r.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    r.read_exact(&mut body)?;
    let packet = serde_json::from_slice(&body).map_err(|e| InterfaceError::Protocol(e.to_string()))?;
    Ok(Some(packet))
}

/// One connection's handshake state (spec §6: "A connection begins
/// with a handshake `(version, requested_commands) → map(command →
/// handle)`. Before handshake, no notifications flow.").
pub struct Session {
    id: Uuid,
    handshaken: bool,
    handles: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Session { id: Uuid::new_v4(), handshaken: false, handles: HashMap::new() }
    }

    /// The connection id this session was assigned, used as the key
    /// under which a [`crate::ListenerRegistry`] tracks its notification
    /// callback.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Complete the handshake, granting a handle for every
    /// `requested_commands` entry this server recognizes.
    pub fn handshake(&mut self, requested_commands: &[String], known_commands: &[&str]) -> Packet {
        let mut handles = HashMap::new();
        for command in requested_commands {
            if known_commands.contains(&command.as_str()) {
                handles.insert(command.clone(), format!("handle-{command}"));
            }
        }
        self.handshaken = true;
        self.handles = handles.clone();
        tracing::debug!(granted = self.handles.len(), requested = requested_commands.len(), "handshake complete");
        Packet::HandshakeAck { handles }
    }

    pub fn is_handshaken(&self) -> bool {
        self.handshaken
    }

    /// Gate a packet: anything other than `Handshake` requires a
    /// completed handshake first.
    pub fn gate(&self, packet: &Packet) -> Result<()> {
        if self.handshaken || matches!(packet, Packet::Handshake { .. }) {
            Ok(())
        } else {
            tracing::warn!("packet rejected before handshake completed");
            Err(InterfaceError::HandshakeRequired)
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frame_round_trips() {
        let packet = Packet::Notification {
            source: "engine".into(),
            level: "info".into(),
            message: "cycle 3 complete".into(),
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &packet).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded = read_frame(&mut cursor).unwrap().unwrap();
        assert!(matches!(decoded, Packet::Notification { source, .. } if source == "engine"));
        assert!(read_frame(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn unhandshaken_session_rejects_calls() {
        let session = Session::new();
        let call = Packet::Call { path: "/".into(), method: "start_job".into(), args: serde_json::Value::Null };
        assert!(matches!(session.gate(&call), Err(InterfaceError::HandshakeRequired)));
    }

    #[test]
    fn handshake_grants_only_known_handles() {
        let mut session = Session::new();
        let ack = session.handshake(
            &["start_job".to_string(), "nonexistent".to_string()],
            &["start_job", "drop_job", "kill_job"],
        );
        match ack {
            Packet::HandshakeAck { handles } => {
                assert!(handles.contains_key("start_job"));
                assert!(!handles.contains_key("nonexistent"));
            }
            _ => panic!("expected HandshakeAck"),
        }
        assert!(session.is_handshaken());
    }
}
