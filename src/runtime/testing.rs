//! Mock implementations for testing
//!
//! These mocks drive the runtime without any network I/O.

use crate::llm::{ChatSession, Fragment, FragmentStream, LlmError, SessionConfig, SessionFactory};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

// ============================================================================
// Mock Session
// ============================================================================

/// How the mock answers one `send_streaming` call
pub enum Script {
    /// Stream these fragments, then complete
    Fragments(Vec<String>),
    /// Stream these fragments, then fail with the message
    FailAfter(Vec<String>, String),
    /// Fail before a stream is produced
    SendError(String),
    /// Stream whatever the test pushes; completes when the sender drops
    Manual(mpsc::UnboundedReceiver<Result<Fragment, LlmError>>),
}

impl Script {
    pub fn fragments(texts: &[&str]) -> Self {
        Script::Fragments(texts.iter().map(|t| (*t).to_string()).collect())
    }
}

/// Mock chat session that answers from queued scripts
pub struct MockSession {
    scripts: Mutex<VecDeque<Script>>,
    /// Record of all prompts sent
    sent: Mutex<Vec<String>>,
}

impl MockSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn queue(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Queue a manually fed stream and return its feeding end
    pub fn queue_manual(&self) -> mpsc::UnboundedSender<Result<Fragment, LlmError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queue(Script::Manual(rx));
        tx
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

fn ok_fragments(texts: Vec<String>) -> impl futures::Stream<Item = Result<Fragment, LlmError>> {
    stream::iter(texts.into_iter().map(|text| Ok(Fragment::new(text))))
}

#[async_trait]
impl ChatSession for MockSession {
    async fn send_streaming(&self, text: &str) -> Result<FragmentStream, LlmError> {
        self.sent.lock().unwrap().push(text.to_string());
        let script = self.scripts.lock().unwrap().pop_front();

        match script {
            Some(Script::Fragments(texts)) => Ok(Box::pin(ok_fragments(texts))),
            Some(Script::FailAfter(texts, message)) => {
                let failure = stream::once(async move { Err(LlmError::network(message)) });
                Ok(Box::pin(ok_fragments(texts).chain(failure)))
            }
            Some(Script::SendError(message)) => Err(LlmError::network(message)),
            Some(Script::Manual(rx)) => Ok(Box::pin(UnboundedReceiverStream::new(rx))),
            None => Err(LlmError::network("No mock response queued")),
        }
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock Session Factory
// ============================================================================

/// Hands out the shared mock session, optionally failing first
pub struct MockSessionFactory {
    session: Arc<MockSession>,
    failures: Mutex<VecDeque<LlmError>>,
    created: Arc<AtomicUsize>,
}

impl MockSessionFactory {
    pub fn new(session: Arc<MockSession>) -> Self {
        Self {
            session,
            failures: Mutex::new(VecDeque::new()),
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make the next `create` call fail
    pub fn fail_next(&self, error: LlmError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Counter of successful `create` calls, readable after the factory moves
    pub fn created_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.created)
    }
}

impl SessionFactory for MockSessionFactory {
    fn create(&self, _config: &SessionConfig) -> Result<Arc<dyn ChatSession>, LlmError> {
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let session: Arc<dyn ChatSession> = self.session.clone();
        Ok(session)
    }
}
