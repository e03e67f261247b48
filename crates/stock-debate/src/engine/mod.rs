//! Debate engine
//!
//! Turn-taking between the personas, prompt assembly, transcript mirroring
//! and verdict synthesis.

pub mod context;
pub mod orchestrator;
pub mod result;
pub mod session;
pub mod sink;
pub mod verdict;

pub use context::{ContextAssembler, TurnPrompt};
pub use orchestrator::{DebateOrchestrator, DebateState};
pub use result::{ChatMessage, DebateResult, Recommendation, Transcript, Turn, Verdict};
pub use session::{InMemorySessionStore, SessionId, SessionStore};
pub use sink::{ChannelSink, StreamEvent, StreamSink};
pub use verdict::{VerdictSynthesizer, heuristic_verdict};
