//! Observers for streamed turn fragments

use crate::agents::PersonaId;
use tokio::sync::mpsc;

/// Receives text fragments as they are generated
///
/// Fragments of one turn arrive in generation order and before the turn is
/// recorded. Turns never interleave.
pub trait StreamSink: Send + Sync {
    fn on_fragment(&self, speaker: PersonaId, fragment: &str);

    /// Called once a turn has finished streaming, successfully or not
    fn on_turn_end(&self, _speaker: PersonaId) {}
}

/// A fragment forwarded through a [`ChannelSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment { speaker: PersonaId, text: String },
    TurnEnd { speaker: PersonaId },
}

/// Forwards fragments into an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StreamSink for ChannelSink {
    fn on_fragment(&self, speaker: PersonaId, fragment: &str) {
        // receiver gone means nobody is watching any more
        let _ = self.tx.send(StreamEvent::Fragment {
            speaker,
            text: fragment.to_string(),
        });
    }

    fn on_turn_end(&self, speaker: PersonaId) {
        let _ = self.tx.send(StreamEvent::TurnEnd { speaker });
    }
}
