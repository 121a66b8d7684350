//! Chat session: drives exchanges against the conversation.
//!
//! One [`ChatSession`] owns the conversation, the disclosure flags and at
//! most one in-flight exchange. An exchange runs in three steps:
//!
//! 1. [`ChatSession::begin_exchange`] appends the user message and an empty
//!    assistant placeholder.
//! 2. Each decoded event is applied to the placeholder by id.
//! 3. The exchange is finished when the stream ends, or failed on the first
//!    error, in which case the placeholder content becomes [`ERROR_MARKER`].
//!
//! [`ChatSession::submit_question`] performs all three against the
//! answering service.

use std::path::{Path, PathBuf};
use std::pin::pin;
use std::time::Duration;

use chrono::Utc;
use futures::{stream, Stream, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::exchange::{Exchange, ExchangeReport, ExchangeState};
use crate::client::AnswerClient;
use crate::config::Config;
use crate::conversation::{
    render_transcript, transcript_file_name, Conversation, DisclosureMap, PreviewEntry,
    ERROR_MARKER,
};
use crate::error::{ChatError, Result};
use crate::models::{Message, MessageId};
use crate::stream::{decode_stream, StreamEvent};

/// A conversation with the answering service.
#[derive(Debug)]
pub struct ChatSession {
    client: AnswerClient,
    idle_timeout: Option<Duration>,
    conversation: Conversation,
    disclosure: DisclosureMap,
    exchange: Option<Exchange>,
    last_state: ExchangeState,
}

impl ChatSession {
    /// Start a session with a fresh conversation.
    pub fn new(client: AnswerClient) -> Self {
        Self {
            client,
            idle_timeout: None,
            conversation: Conversation::new(),
            disclosure: DisclosureMap::new(),
            exchange: None,
            last_state: ExchangeState::Idle,
        }
    }

    /// Start a session using the endpoint and timeout from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(AnswerClient::new(config.endpoint.clone())).with_idle_timeout(config.idle_timeout)
    }

    /// Fail an exchange when no body chunk arrives for `limit`.
    #[must_use]
    pub const fn with_idle_timeout(mut self, limit: Option<Duration>) -> Self {
        self.idle_timeout = limit;
        self
    }

    pub const fn client(&self) -> &AnswerClient {
        &self.client
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    /// Owned copy of the conversation.
    pub fn snapshot(&self) -> Vec<Message> {
        self.conversation.snapshot()
    }

    pub const fn disclosure(&self) -> &DisclosureMap {
        &self.disclosure
    }

    /// State of the current exchange, or of the last one if none is running.
    pub fn state(&self) -> ExchangeState {
        self.exchange.as_ref().map_or(self.last_state, |e| e.state)
    }

    pub const fn is_in_flight(&self) -> bool {
        self.exchange.is_some()
    }

    /// Start an exchange for `question` and return the placeholder id.
    ///
    /// Rejects blank questions and questions submitted while another
    /// exchange is in flight; the conversation is left untouched then.
    pub fn begin_exchange(&mut self, question: &str) -> Result<MessageId> {
        if question.trim().is_empty() {
            return Err(ChatError::EmptyQuestion);
        }
        if self.exchange.is_some() {
            return Err(ChatError::ExchangeInFlight);
        }

        let placeholder = Message::placeholder();
        let id = placeholder.id;
        self.conversation.append(Message::user(question));
        self.conversation.append(placeholder);
        self.exchange = Some(Exchange::new(id));

        info!(message_id = %id, "exchange started");
        Ok(id)
    }

    /// Apply one decoded event to the placeholder.
    ///
    /// A [`StreamEvent::ServiceError`] is returned as [`ChatError::Service`]
    /// without touching the conversation; the caller fails the exchange.
    pub fn apply_event(&mut self, event: StreamEvent) -> Result<()> {
        let exchange = self.exchange.as_mut().ok_or(ChatError::NoExchange)?;
        let id = exchange.placeholder;
        exchange.state = ExchangeState::Streaming;
        exchange.events += 1;

        match event {
            StreamEvent::Token(fragment) => {
                self.conversation.update(id, |m| m.with_appended(&fragment))?;
            }
            StreamEvent::Sources(sources) => {
                debug!(message_id = %id, count = sources.len(), "sources received");
                self.conversation.update(id, |m| m.with_sources(sources))?;
            }
            StreamEvent::ServiceError(message) => {
                // Beyond token/sources: the service reports pipeline failures
                // in-band and closes the stream.
                warn!(
                    message_id = %id,
                    error = %message,
                    "service error frame (extension to the token/sources protocol)"
                );
                return Err(ChatError::Service(message));
            }
        }
        Ok(())
    }

    /// Mark the in-flight exchange as complete.
    pub fn finish_exchange(&mut self) -> Result<ExchangeReport> {
        let exchange = self.exchange.take().ok_or(ChatError::NoExchange)?;
        self.last_state = ExchangeState::Finished;

        if let Some(message) = self.conversation.get(exchange.placeholder) {
            info!(
                message_id = %exchange.placeholder,
                events = exchange.events,
                chars = message.content.chars().count(),
                sources = message.sources.len(),
                "exchange finished"
            );
        }

        Ok(ExchangeReport {
            message_id: exchange.placeholder,
            state: ExchangeState::Finished,
            events: exchange.events,
            error: None,
        })
    }

    /// Fail the in-flight exchange: the placeholder content, including any
    /// text streamed so far, is replaced by [`ERROR_MARKER`].
    pub fn fail_exchange(&mut self, error: ChatError) -> Result<ExchangeReport> {
        let exchange = self.exchange.take().ok_or(ChatError::NoExchange)?;
        self.last_state = ExchangeState::Failed;

        warn!(
            message_id = %exchange.placeholder,
            events = exchange.events,
            error = %error,
            "exchange failed"
        );
        self.conversation
            .update(exchange.placeholder, |m| m.with_content(ERROR_MARKER))?;

        Ok(ExchangeReport {
            message_id: exchange.placeholder,
            state: ExchangeState::Failed,
            events: exchange.events,
            error: Some(error),
        })
    }

    /// Abandon the in-flight exchange. Same outcome as a stream failure.
    pub fn abort_exchange(&mut self) -> Result<ExchangeReport> {
        self.fail_exchange(ChatError::Aborted)
    }

    /// Drive the in-flight exchange from a stream of body chunks.
    ///
    /// Each event is passed to `on_event` before it is applied. The exchange
    /// ends finished when the stream ends and failed on the first stream
    /// error, service error frame or idle timeout.
    pub async fn consume<S, B, F>(&mut self, bytes: S, mut on_event: F) -> Result<ExchangeReport>
    where
        S: Stream<Item = Result<B>> + Send,
        B: AsRef<[u8]> + Send,
        F: FnMut(&StreamEvent),
    {
        if self.exchange.is_none() {
            return Err(ChatError::NoExchange);
        }

        let mut events = pin!(decode_stream(idle_limited(bytes, self.idle_timeout)));
        loop {
            match events.next().await {
                Some(Ok(event)) => {
                    on_event(&event);
                    if let Err(e) = self.apply_event(event) {
                        return self.fail_exchange(e);
                    }
                }
                Some(Err(e)) => return self.fail_exchange(e),
                None => return self.finish_exchange(),
            }
        }
    }

    /// Ask `question` and stream the answer into the conversation.
    ///
    /// Returns an error only when the question is rejected up front. Network
    /// and stream failures end the exchange as failed and are reported in the
    /// returned [`ExchangeReport`].
    pub async fn submit_question<F>(&mut self, question: &str, on_event: F) -> Result<ExchangeReport>
    where
        F: FnMut(&StreamEvent),
    {
        self.begin_exchange(question)?;

        let client = self.client.clone();
        match client.ask(question).await {
            Ok(bytes) => self.consume(bytes, on_event).await,
            Err(e) => self.fail_exchange(e),
        }
    }

    /// Flip source disclosure for `id`; returns whether it is now expanded.
    pub fn toggle_disclosure(&mut self, id: MessageId) -> bool {
        self.disclosure.toggle(id)
    }

    /// Source preview of message `id` under the current disclosure flags.
    pub fn source_preview(&self, id: MessageId) -> Option<Vec<PreviewEntry<'_>>> {
        self.conversation
            .get(id)
            .map(|message| self.disclosure.preview(message))
    }

    /// The conversation as plain text.
    pub fn export_transcript(&self) -> String {
        render_transcript(self.conversation.messages())
    }

    /// Write the transcript into `dir` under a date-stamped name.
    pub fn write_transcript(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(transcript_file_name(Utc::now().date_naive()));
        std::fs::write(&path, self.export_transcript())?;
        info!(path = %path.display(), messages = self.conversation.len(), "transcript exported");
        Ok(path)
    }

    /// Discard the history and start again from the greeting.
    ///
    /// Refused while an exchange is in flight, since the placeholder it is
    /// filling would disappear.
    pub fn reset_conversation(&mut self) -> Result<()> {
        if self.exchange.is_some() {
            return Err(ChatError::ExchangeInFlight);
        }
        self.conversation.reset();
        self.last_state = ExchangeState::Idle;
        debug!("conversation reset");
        Ok(())
    }
}

/// Fail `bytes` with [`ChatError::IdleTimeout`] when no chunk arrives for
/// `limit`. The clock restarts on every chunk, framed or not.
fn idle_limited<S, B>(bytes: S, limit: Option<Duration>) -> impl Stream<Item = Result<B>> + Send
where
    S: Stream<Item = Result<B>> + Send,
    B: Send,
{
    stream::unfold(Some(Box::pin(bytes)), move |state| async move {
        let mut bytes = state?;
        let Some(limit) = limit else {
            return bytes.next().await.map(|item| (item, Some(bytes)));
        };
        match timeout(limit, bytes.next()).await {
            Ok(item) => item.map(|item| (item, Some(bytes))),
            Err(_) => {
                debug!(?limit, "no body chunk within idle limit");
                Some((Err(ChatError::IdleTimeout(limit)), None))
            }
        }
    })
}
