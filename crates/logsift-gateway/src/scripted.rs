//! Scripted in-memory gateway.
//!
//! Stands in for the real agent gateway in tests and demos: replies are
//! queued up front and consumed one per `ask` call, every prompt is
//! recorded, and an optional permit gate lets a test decide exactly when
//! each call may proceed.

use crate::traits::{AgentGateway, AgentHandle, AgentSession, ChunkStream, ResponseChunk};
use anyhow::{Result, anyhow, bail};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// What one `ask` call should observe.
pub enum ScriptedReply {
    /// Cumulative chunk snapshots, streamed in order.
    Chunks(Vec<String>),
    /// The call itself fails with this description.
    Failure(String),
    /// The stream opens and closes without any content.
    Silence,
}

impl ScriptedReply {
    /// Convenience constructor for a chunked reply.
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedReply::Chunks(chunks.into_iter().map(Into::into).collect())
    }
}

struct ScriptState {
    agents: Vec<AgentHandle>,
    replies: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
    latency: Mutex<Duration>,
    gate: Mutex<Option<Receiver<()>>>,
    sessions_opened: AtomicUsize,
}

/// Deterministic [`AgentGateway`] implementation driven by a reply queue.
pub struct ScriptedGateway {
    state: Arc<ScriptState>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGateway {
    /// Gateway exposing a single agent named "Scripted Analyzer".
    pub fn new() -> Self {
        ScriptedGateway {
            state: Arc::new(ScriptState {
                agents: vec![AgentHandle {
                    id: "scripted-1".to_string(),
                    title: "Scripted Analyzer".to_string(),
                }],
                replies: Mutex::new(VecDeque::new()),
                prompts: Mutex::new(Vec::new()),
                latency: Mutex::new(Duration::ZERO),
                gate: Mutex::new(None),
                sessions_opened: AtomicUsize::new(0),
            }),
        }
    }

    /// Queue one reply; replies are consumed FIFO, one per `ask` call.
    /// Calls past the end of the queue observe silence.
    pub fn with_reply(self, reply: ScriptedReply) -> Self {
        lock(&self.state.replies).push_back(reply);
        self
    }

    pub fn with_replies<I>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = ScriptedReply>,
    {
        lock(&self.state.replies).extend(replies);
        self
    }

    /// Sleep this long inside every `ask` call before answering.
    pub fn with_latency(self, latency: Duration) -> Self {
        *lock(&self.state.latency) = latency;
        self
    }

    /// Gate every `ask` call on a permit. The call blocks until the test
    /// sends `()` on the returned channel; dropping the sender opens the
    /// gate permanently.
    pub fn gated(self) -> (Self, Sender<()>) {
        let (tx, rx) = channel();
        *lock(&self.state.gate) = Some(rx);
        (self, tx)
    }

    /// Every prompt seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.state.prompts).clone()
    }

    /// The gateway's only agent, for convenience in tests.
    pub fn agent(&self) -> AgentHandle {
        self.state.agents[0].clone()
    }
}

impl AgentGateway for ScriptedGateway {
    fn list_agents(&self) -> Result<Vec<AgentHandle>> {
        Ok(self.state.agents.clone())
    }

    fn open_session(&self, agent: &AgentHandle) -> Result<Box<dyn AgentSession>> {
        if !self.state.agents.iter().any(|a| a.id == agent.id) {
            bail!("unknown agent: {}", agent.id);
        }
        let n = self.state.sessions_opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(ScriptedSession {
            state: self.state.clone(),
            agent: agent.clone(),
            session_id: format!("scripted-session-{}", n),
        }))
    }
}

struct ScriptedSession {
    state: Arc<ScriptState>,
    agent: AgentHandle,
    session_id: String,
}

impl AgentSession for ScriptedSession {
    fn agent(&self) -> &AgentHandle {
        &self.agent
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn ask(&mut self, prompt: &str) -> Result<ChunkStream> {
        // A closed gate blocks here, which also models a hung gateway
        // call: the pipeline has no per-call timeout.
        if let Some(gate) = lock(&self.state.gate).as_ref() {
            // RecvError means the sender is gone; treat the gate as open.
            let _ = gate.recv();
        }

        let latency = *lock(&self.state.latency);
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }

        lock(&self.state.prompts).push(prompt.to_string());

        let reply = lock(&self.state.replies)
            .pop_front()
            .unwrap_or(ScriptedReply::Silence);

        match reply {
            ScriptedReply::Chunks(chunks) => Ok(Box::new(
                chunks
                    .into_iter()
                    .map(|content| Ok(ResponseChunk { content })),
            )),
            ScriptedReply::Failure(description) => Err(anyhow!(description)),
            ScriptedReply::Silence => Ok(Box::new(std::iter::empty())),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_are_consumed_in_order() {
        let gateway = ScriptedGateway::new()
            .with_reply(ScriptedReply::chunks(["a", "ab"]))
            .with_reply(ScriptedReply::Failure("boom".to_string()));
        let agent = gateway.agent();
        let mut session = gateway.open_session(&agent).unwrap();

        let chunks: Vec<_> = session
            .ask("first")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(chunks.last().unwrap().content, "ab");

        assert!(session.ask("second").is_err());

        // Past the scripted replies: silence.
        assert_eq!(session.ask("third").unwrap().count(), 0);

        assert_eq!(gateway.prompts(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unknown_agent_is_rejected() {
        let gateway = ScriptedGateway::new();
        let stranger = AgentHandle {
            id: "other".to_string(),
            title: "Other".to_string(),
        };
        assert!(gateway.open_session(&stranger).is_err());
    }

    #[test]
    fn dropped_gate_sender_opens_the_gate() {
        let (gateway, permits) = ScriptedGateway::new().gated();
        let agent = gateway.agent();
        let mut session = gateway.open_session(&agent).unwrap();
        drop(permits);
        assert_eq!(session.ask("hello").unwrap().count(), 0);
    }
}
