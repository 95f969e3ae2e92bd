mod scripted;
mod traits;

pub use scripted::{ScriptedGateway, ScriptedReply};
pub use traits::{AgentGateway, AgentHandle, AgentSession, ChunkStream, ResponseChunk};
