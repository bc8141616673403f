//! Chat client: prompt assembly, bounded completion call, reply parsing

mod reply;

pub use reply::parse_reply;

use crate::credentials::Credential;
use crate::llm::{ChatError, CompletionRequest, LlmMessage};
use crate::runtime::CompletionService;
use crate::state_machine::{ChatReply, ChatRequest};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Replies are short; leave headroom for the mood tag
const MAX_COMPLETION_TOKENS: u32 = 200;

/// Asks the completion service one question at a time
pub struct ChatClient<C: CompletionService> {
    service: Arc<C>,
    persona: String,
    word_budget: usize,
    timeout: Duration,
}

impl<C: CompletionService> Clone for ChatClient<C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            persona: self.persona.clone(),
            word_budget: self.word_budget,
            timeout: self.timeout,
        }
    }
}

impl<C: CompletionService> ChatClient<C> {
    pub fn new(service: Arc<C>, persona: String, word_budget: usize, timeout: Duration) -> Self {
        Self {
            service,
            persona,
            word_budget,
            timeout,
        }
    }

    pub fn model_id(&self) -> &str {
        self.service.model_id()
    }

    /// Build the completion request: enrichment context, then prior
    /// turns, then the question itself.
    pub fn build_request(
        &self,
        request: &ChatRequest,
        history: &ConversationHistory,
    ) -> CompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(context) = &request.context {
            messages.push(LlmMessage::user(context.clone()));
        }
        messages.extend(history.iter().cloned());
        messages.push(LlmMessage::user(request.query.clone()));

        CompletionRequest {
            system: self.persona.clone(),
            messages,
            max_tokens: Some(MAX_COMPLETION_TOKENS),
        }
    }

    /// One bounded completion call. Never retries.
    pub async fn ask(
        &self,
        request: &ChatRequest,
        history: &ConversationHistory,
        credential: &Credential,
    ) -> Result<ChatReply, ChatError> {
        let completion = self.build_request(request, history);

        let call = self.service.complete(&completion, credential);
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                ChatError::timeout(format!("No reply within {}s", self.timeout.as_secs()))
            })??;

        parse_reply(&response.text, self.word_budget)
    }
}

/// Recent turns sent along with each question, oldest first
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: VecDeque<LlmMessage>,
    capacity: usize,
}

impl ConversationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a completed exchange, dropping the oldest messages past capacity
    pub fn record(&mut self, query: &str, reply: &str) {
        self.push(LlmMessage::user(query));
        self.push(LlmMessage::assistant(reply));
    }

    fn push(&mut self, message: LlmMessage) {
        if self.capacity == 0 {
            return;
        }
        while self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &LlmMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
