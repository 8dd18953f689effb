//! Resumable session state and the identify/resume negotiator.

use serde_json::json;

use crate::{
    client::config::ClientConfig,
    protocol::{Frame, opcode},
};

/// The resumable server-side context: a session id and a sequence cursor.
///
/// Both fields are cleared together whenever the transport is torn down for
/// any reason other than a successful resume. The sequence is only ever
/// updated from inbound frames that carry one; it is never guessed or
/// incremented locally.
#[derive(Debug, Default)]
pub(crate) struct Session {
    id: Option<String>,
    sequence: Option<u64>,
}

impl Session {
    /// Start with an optional caller-supplied session id to resume.
    pub(crate) fn new(resume_id: Option<String>) -> Self {
        Self {
            id: resume_id,
            sequence: None,
        }
    }

    pub(crate) fn id(&self) -> Option<&str> { self.id.as_deref() }

    pub(crate) fn sequence(&self) -> Option<u64> { self.sequence }

    /// Record a server-assigned sequence number from an inbound frame.
    pub(crate) fn observe_sequence(&mut self, sequence: u64) { self.sequence = Some(sequence); }

    /// Capture the session id announced by the session-ready dispatch.
    pub(crate) fn establish(&mut self, id: String) { self.id = Some(id); }

    pub(crate) fn clear(&mut self) {
        self.id = None;
        self.sequence = None;
    }

    /// Build the session-establishment frame: resume when a session id is
    /// held, identify otherwise.
    ///
    /// This is a pure decision on current session state; failures surface
    /// through the normal close and dispatch paths, never here.
    pub(crate) fn negotiate(&self, config: &ClientConfig) -> Frame {
        if let Some(id) = self.id() {
            return Frame::new(
                opcode::RESUME,
                json!({
                    "token": config.token,
                    "session_id": id,
                    "seq": self.sequence,
                }),
            );
        }

        let mut d = json!({
            "token": config.token,
            "shard": [config.shard.index(), config.shard.count()],
            "properties": {
                "$os": std::env::consts::OS,
                "$browser": "nebula",
                "$device": "nebula",
            },
        });
        if let Some(intents) = config.intents {
            d["intents"] = intents.bits().into();
        }
        Frame::new(opcode::IDENTIFY, d)
    }
}
