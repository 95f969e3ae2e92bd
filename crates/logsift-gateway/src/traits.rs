use anyhow::Result;

/// Immutable handle for an agent exposed by the gateway.
///
/// Handles are values: selecting an agent or opening a session never
/// mutates them in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentHandle {
    pub id: String,
    pub title: String,
}

/// One element of a streamed response.
///
/// `content` is the cumulative text received so far, so the final chunk
/// carries the complete response.
#[derive(Debug, Clone)]
pub struct ResponseChunk {
    pub content: String,
}

/// Streamed response: successive chunks until the gateway closes the
/// stream. A mid-stream failure surfaces as an `Err` element.
pub type ChunkStream = Box<dyn Iterator<Item = Result<ResponseChunk>> + Send>;

/// External text-analysis service, session-scoped.
///
/// Responsibilities:
/// - Enumerate the agents an operator can pick from
/// - Open an authenticated session against one agent
///
/// Authentication and wire protocol are the implementation's concern and
/// are opaque to the pipeline.
pub trait AgentGateway: Send + Sync {
    fn list_agents(&self) -> Result<Vec<AgentHandle>>;

    fn open_session(&self, agent: &AgentHandle) -> Result<Box<dyn AgentSession>>;
}

/// One conversation with one agent.
pub trait AgentSession: Send {
    /// The agent this session was opened against.
    fn agent(&self) -> &AgentHandle;

    /// Gateway-assigned session identifier.
    fn session_id(&self) -> &str;

    /// Send a prompt and stream the response.
    ///
    /// Blocks until the gateway starts answering; the returned stream
    /// blocks per chunk. There is no timeout at this seam.
    fn ask(&mut self, prompt: &str) -> Result<ChunkStream>;
}
