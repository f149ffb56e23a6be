//! Conversation session.
//!
//! A `Session` owns the transcript, the draft being typed, and the
//! single-flight gate that keeps at most one request to the inference
//! endpoint in flight. Sending is split at its suspension point:
//! [`Session::submit`] records the user entry and hands back the prompt,
//! and [`Session::resolve`] records whatever came back. Front ends that can
//! block on the request use [`Session::exchange`] instead.

use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::message::{Content, Message, Role};
use crate::InferenceEndpoint;

/// Body of the transient record shown while a request is in flight
pub const IN_PROGRESS_TEXT: &str = "Thinking...";

/// Callback invoked after every change to session state
pub type Observer = Box<dyn FnMut(&SessionEvent) + Send>;

/// The single-flight gate: `Idle -> Sending -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendState {
    #[default]
    Idle,
    Sending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    DraftChanged,
    MessageAppended { index: usize, role: Role },
    StateChanged(SendState),
}

/// A request the session has committed to; the caller delivers `prompt` to
/// the endpoint and feeds the outcome back through [`Session::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Message(Role),
    InProgress,
}

/// One visual row of the transcript, ready for a front end to style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: RecordKind,
    pub label: &'static str,
    pub body: String,
    /// Body is a pretty-printed structured value rather than prose
    pub structured: bool,
}

impl Record {
    fn from_message(message: &Message) -> Self {
        Self {
            kind: RecordKind::Message(message.role()),
            label: message.role().as_str(),
            body: message.content().display_text(),
            structured: message.content().is_structured(),
        }
    }

    fn in_progress() -> Self {
        Self {
            kind: RecordKind::InProgress,
            label: Role::Assistant.as_str(),
            body: IN_PROGRESS_TEXT.to_string(),
            structured: false,
        }
    }
}

#[derive(Default)]
pub struct Session {
    transcript: Vec<Message>,
    draft: String,
    state: SendState,
    observers: Vec<Observer>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback that is told about every state change
    pub fn subscribe(&mut self, observer: impl FnMut(&SessionEvent) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn state(&self) -> SendState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == SendState::Sending
    }

    /// Whether the send affordance should be enabled
    pub fn can_send(&self) -> bool {
        !self.is_pending() && !self.draft.trim().is_empty()
    }

    /// Replace the draft verbatim
    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.notify(SessionEvent::DraftChanged);
    }

    /// Commit the current draft as a user entry and enter `Sending`.
    ///
    /// Returns `None` without touching any state when the draft is blank or
    /// a request is already in flight. A dropped submit is not queued.
    pub fn submit(&mut self) -> Option<Outbound> {
        if self.is_pending() {
            warn!("submit ignored: a request is already in flight");
            return None;
        }
        if self.draft.trim().is_empty() {
            debug!("submit ignored: draft is blank");
            return None;
        }

        let prompt = std::mem::take(&mut self.draft);
        self.append(Message::new(Role::User, prompt.clone()));
        self.notify(SessionEvent::DraftChanged);
        self.set_state(SendState::Sending);

        info!(turn = self.transcript.len(), "request started");
        Some(Outbound { prompt })
    }

    /// Record the outcome of the in-flight request and return to `Idle`.
    ///
    /// Failures become an error entry; nothing is propagated. An outcome
    /// arriving while `Idle` has no request to belong to and is dropped.
    pub fn resolve(&mut self, result: Result<Content, ChatError>) {
        if !self.is_pending() {
            warn!("dropping reply: no request in flight");
            return;
        }

        let message = match result {
            Ok(content) => Message::new(Role::Assistant, content),
            Err(err) => {
                warn!(error = %err, "chat request failed");
                Message::new(Role::Error, format!("Error: {}", err))
            }
        };

        self.append(message);
        self.set_state(SendState::Idle);
        info!(turn = self.transcript.len(), "request finished");
    }

    /// Submit the draft, wait for the endpoint, and record the outcome.
    ///
    /// Returns the entry the exchange ended with, or `None` if the submit
    /// was rejected.
    pub async fn exchange<E>(&mut self, endpoint: &E) -> Option<&Message>
    where
        E: InferenceEndpoint + ?Sized,
    {
        let outbound = self.submit()?;
        let result = endpoint.complete(&outbound.prompt).await;
        self.resolve(result);
        self.transcript.last()
    }

    /// One record per transcript entry in order, plus a trailing
    /// in-progress record while a request is in flight.
    pub fn render(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.transcript.iter().map(Record::from_message).collect();
        if self.is_pending() {
            records.push(Record::in_progress());
        }
        records
    }

    fn append(&mut self, message: Message) {
        let role = message.role();
        self.transcript.push(message);
        self.notify(SessionEvent::MessageAppended {
            index: self.transcript.len() - 1,
            role,
        });
    }

    fn set_state(&mut self, state: SendState) {
        self.state = state;
        self.notify(SessionEvent::StateChanged(state));
    }

    fn notify(&mut self, event: SessionEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }
}
