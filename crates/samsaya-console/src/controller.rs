//! Conversation controller: owns the session and runs one turn at a time.
//!
//! A turn appends the user message and an empty streaming model message, then folds the
//! model client's cumulative snapshots into that placeholder until the stream ends. Every
//! mutation is announced as a [`SessionEvent`] so the front-end can re-render.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use samsaya_core::{queries, Attachment, ChatOptions, Message, Session};
use samsaya_llm::{LLMError, ModelClient};
use tokio::sync::mpsc;

use crate::attachments::{self, AttachmentLoadError, AttachmentManager};
use crate::logging::Timer;

/// Text shown in place of a model answer when the turn fails.
pub const SYSTEM_ERROR_TEXT: &str =
    "[System Error: Unable to query the repository. Verify API Key and connection.]";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessageAdded(Message),
    /// Full text of a streaming message after a new snapshot.
    MessageUpdated { id: String, text: String },
    MessageFinished { id: String, failed: bool },
    MessagesRemoved { ids: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No text and no attachments.
    Empty,
    /// Another turn is still streaming.
    InFlight,
    /// Regenerate with no user message in the session.
    NothingToRegenerate,
    /// History index does not name a user query.
    UnknownEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed { message_id: String },
    Failed { message_id: String, error: String },
    Rejected(RejectReason),
}

impl SubmitOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, SubmitOutcome::Rejected(_))
    }
}

#[derive(Default)]
struct ConsoleState {
    session: Session,
    pending: AttachmentManager,
    in_flight: bool,
}

/// Everything a started turn needs once the lock is released.
struct TurnStart {
    history: Vec<Message>,
    text: String,
    attachments: Vec<Attachment>,
    placeholder_id: String,
}

#[derive(Clone)]
pub struct ConversationController {
    client: Arc<dyn ModelClient>,
    state: Arc<Mutex<ConsoleState>>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl ConversationController {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(ConsoleState::default())),
            events: None,
        }
    }

    /// Announce session mutations on `events`.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn client(&self) -> Arc<dyn ModelClient> {
        Arc::clone(&self.client)
    }

    fn lock(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    pub fn session(&self) -> Session {
        self.lock().session.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().session.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().session.is_empty()
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    pub fn message(&self, index: usize) -> Option<Message> {
        self.lock().session.messages.get(index).cloned()
    }

    /// Most recent finished model answer.
    pub fn last_model_message(&self) -> Option<Message> {
        self.lock()
            .session
            .messages
            .iter()
            .rev()
            .find(|m| !m.is_user() && !m.streaming)
            .cloned()
    }

    pub fn user_queries(&self) -> Vec<Message> {
        self.lock().session.user_queries().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Pending attachments
    // ------------------------------------------------------------------

    pub fn attach(&self, attachment: Attachment) {
        self.lock().pending.add(attachment);
    }

    pub async fn attach_file(&self, path: &Path) -> Result<Attachment, AttachmentLoadError> {
        let attachment = attachments::load_file(path).await?;
        self.attach(attachment.clone());
        Ok(attachment)
    }

    pub fn detach(&self, index: usize) -> Option<Attachment> {
        self.lock().pending.remove(index)
    }

    pub fn pending_attachments(&self) -> Vec<Attachment> {
        self.lock().pending.list().to_vec()
    }

    // ------------------------------------------------------------------
    // Turns
    // ------------------------------------------------------------------

    /// Submit `text` with the pending attachments.
    pub async fn submit(&self, text: &str, options: ChatOptions) -> SubmitOutcome {
        let started = {
            let mut state = self.lock();
            self.begin_turn(&mut state, text, None)
        };
        self.finish_start(started, options).await
    }

    /// Submit `text` with explicit attachments. The pending list is still cleared.
    pub async fn submit_with(
        &self,
        text: &str,
        attachments: Vec<Attachment>,
        options: ChatOptions,
    ) -> SubmitOutcome {
        let started = {
            let mut state = self.lock();
            self.begin_turn(&mut state, text, Some(attachments))
        };
        self.finish_start(started, options).await
    }

    /// Submit a synthesized instruction (syllabus pick, history re-run) as a new turn.
    pub async fn submit_query(&self, query: &str, options: ChatOptions) -> SubmitOutcome {
        self.submit_with(query, Vec::new(), options).await
    }

    pub async fn translate(&self, text: &str, options: ChatOptions) -> SubmitOutcome {
        self.submit_query(&queries::translate(text), options).await
    }

    /// Re-run the `index`-th user query of the audit trail.
    pub async fn rerun_history(&self, index: usize, options: ChatOptions) -> SubmitOutcome {
        let query = self
            .lock()
            .session
            .user_queries()
            .nth(index)
            .map(|m| m.text.clone());

        match query {
            Some(text) => self.submit_query(&text, options).await,
            None => SubmitOutcome::Rejected(RejectReason::UnknownEntry),
        }
    }

    /// Replace the trailing turn with a fresh answer to the most recent user message.
    pub async fn regenerate(&self, options: ChatOptions) -> SubmitOutcome {
        let started = {
            let mut state = self.lock();
            if state.in_flight {
                Err(RejectReason::InFlight)
            } else {
                match state.session.last_user_index() {
                    None => Err(RejectReason::NothingToRegenerate),
                    Some(index) => {
                        let source = state.session.messages[index].clone();
                        let removed = state.session.truncate(index);
                        self.emit(SessionEvent::MessagesRemoved {
                            ids: removed.into_iter().map(|m| m.id).collect(),
                        });
                        self.begin_turn(&mut state, &source.text, Some(source.attachments))
                    }
                }
            }
        };
        self.finish_start(started, options).await
    }

    /// `attachments: None` sends the pending list. The pending list is emptied either way.
    fn begin_turn(
        &self,
        state: &mut ConsoleState,
        text: &str,
        attachments: Option<Vec<Attachment>>,
    ) -> Result<TurnStart, RejectReason> {
        if state.in_flight {
            return Err(RejectReason::InFlight);
        }
        let no_attachments = attachments
            .as_ref()
            .map_or(state.pending.is_empty(), Vec::is_empty);
        if text.trim().is_empty() && no_attachments {
            return Err(RejectReason::Empty);
        }

        let history = state.session.messages.clone();
        let pending = state.pending.take();
        let attachments = attachments.unwrap_or(pending);

        let user = Message::user(text, attachments.clone());
        let placeholder = Message::model_placeholder();
        let placeholder_id = placeholder.id.clone();

        state.session.add_message(user.clone());
        state.session.add_message(placeholder.clone());
        state.in_flight = true;
        debug_assert_eq!(state.session.streaming_count(), 1);

        self.emit(SessionEvent::MessageAdded(user));
        self.emit(SessionEvent::MessageAdded(placeholder));

        Ok(TurnStart {
            history,
            text: text.to_string(),
            attachments,
            placeholder_id,
        })
    }

    async fn finish_start(
        &self,
        started: Result<TurnStart, RejectReason>,
        options: ChatOptions,
    ) -> SubmitOutcome {
        match started {
            Ok(turn) => self.run_turn(turn, options).await,
            Err(reason) => {
                log::debug!("Turn rejected: {:?}", reason);
                SubmitOutcome::Rejected(reason)
            }
        }
    }

    async fn run_turn(&self, turn: TurnStart, options: ChatOptions) -> SubmitOutcome {
        let timer = Timer::new("model turn");
        let id = turn.placeholder_id;

        let failure = match self
            .client
            .stream_turn(&turn.history, &turn.text, &turn.attachments, options)
            .await
        {
            Ok(mut stream) => {
                let mut failure: Option<LLMError> = None;
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(snapshot) => self.apply_snapshot(&id, snapshot),
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                }
                failure
            }
            Err(err) => Some(err),
        };

        timer.debug(&id);

        match failure {
            None => {
                self.finalize(&id, None);
                SubmitOutcome::Completed { message_id: id }
            }
            Some(err) => {
                log::error!("Model turn failed: {}", err);
                self.finalize(&id, Some(SYSTEM_ERROR_TEXT));
                SubmitOutcome::Failed {
                    message_id: id,
                    error: err.to_string(),
                }
            }
        }
    }

    fn apply_snapshot(&self, id: &str, snapshot: String) {
        {
            let mut state = self.lock();
            match state.session.get_mut(id) {
                Some(message) => message.text.clone_from(&snapshot),
                None => {
                    log::warn!("Dropping snapshot for unknown message {}", id);
                    return;
                }
            }
        }
        self.emit(SessionEvent::MessageUpdated {
            id: id.to_string(),
            text: snapshot,
        });
    }

    fn finalize(&self, id: &str, error_text: Option<&str>) {
        {
            let mut state = self.lock();
            if let Some(message) = state.session.get_mut(id) {
                if let Some(text) = error_text {
                    message.text = text.to_string();
                } else if message.text.is_empty() {
                    log::warn!("Model turn {} finished without text", id);
                }
                message.streaming = false;
            }
            state.in_flight = false;
        }
        self.emit(SessionEvent::MessageFinished {
            id: id.to_string(),
            failed: error_text.is_some(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use samsaya_core::Role;
    use samsaya_llm::{Result as LLMResult, TextStream};

    /// Answers every turn with `"<n>: <text>"` delivered in two cumulative snapshots.
    struct EchoClient {
        calls: Mutex<Vec<(usize, String, usize)>>,
    }

    impl EchoClient {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for EchoClient {
        async fn stream_turn(
            &self,
            history: &[Message],
            new_text: &str,
            attachments: &[Attachment],
            _options: ChatOptions,
        ) -> LLMResult<TextStream> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((history.len(), new_text.to_string(), attachments.len()));
            let full = format!("{}: {}", calls.len(), new_text);
            let half = full[..full.len() / 2].to_string();
            Ok(Box::pin(stream::iter(vec![Ok(half), Ok(full)])))
        }

        async fn transcribe(&self, _audio: &str, _mime: &str) -> LLMResult<String> {
            Ok(String::new())
        }

        async fn synthesize_speech(&self, _text: &str) -> LLMResult<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn controller() -> (ConversationController, Arc<EchoClient>) {
        let client = Arc::new(EchoClient::new());
        (ConversationController::new(client.clone()), client)
    }

    #[tokio::test]
    async fn submit_appends_user_then_finished_model() {
        let (controller, client) = controller();

        let outcome = controller.submit("Q1", ChatOptions::default()).await;
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));

        let messages = controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].text, "Q1");
        assert_eq!(messages[1].role, Role::Model);
        assert_eq!(messages[1].text, "1: Q1");
        assert!(!messages[1].streaming);
        assert!(!controller.is_in_flight());

        controller.submit("Q2", ChatOptions::default()).await;
        assert_eq!(controller.len(), 4);

        // History excludes the two messages appended for the new turn.
        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0].0, 0);
        assert_eq!(calls[1].0, 2);
    }

    #[tokio::test]
    async fn whitespace_without_attachments_is_noop() {
        let (controller, client) = controller();

        let outcome = controller.submit("   \n", ChatOptions::default()).await;

        assert_eq!(outcome, SubmitOutcome::Rejected(RejectReason::Empty));
        assert!(controller.is_empty());
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn attachments_alone_are_enough_and_are_cleared_on_send() {
        let (controller, client) = controller();
        controller.attach(Attachment::new("image/png", "AAAA"));

        let outcome = controller.submit("", ChatOptions::default()).await;

        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
        assert!(controller.pending_attachments().is_empty());
        assert_eq!(controller.messages()[0].attachments.len(), 1);
        assert_eq!(client.calls.lock().unwrap()[0].2, 1);
    }

    #[tokio::test]
    async fn explicit_attachments_replace_and_clear_pending() {
        let (controller, client) = controller();
        controller.attach(Attachment::new("image/png", "AAAA"));

        let outcome = controller
            .submit_with(
                "compare",
                vec![
                    Attachment::new("text/plain", "BBBB"),
                    Attachment::new("text/plain", "CCCC"),
                ],
                ChatOptions::default(),
            )
            .await;

        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
        assert!(controller.pending_attachments().is_empty());
        assert_eq!(client.calls.lock().unwrap()[0].2, 2);
    }

    #[tokio::test]
    async fn regenerate_replaces_trailing_turn() {
        let (controller, client) = controller();
        controller.attach(Attachment::new("text/plain", "AAAA"));
        controller.submit("Q", ChatOptions::default()).await;
        let first_answer = controller.messages()[1].text.clone();

        let outcome = controller.regenerate(ChatOptions::default()).await;
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));

        let messages = controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "Q");
        assert_eq!(messages[0].attachments.len(), 1);
        assert_eq!(messages[1].text, "2: Q");
        assert_ne!(messages[1].text, first_answer);

        // The regenerated turn is sent without the replaced turn in its history.
        assert_eq!(client.calls.lock().unwrap()[1], (0, "Q".to_string(), 1));
    }

    #[tokio::test]
    async fn regenerate_without_user_message_is_noop() {
        let (controller, _client) = controller();
        let outcome = controller.regenerate(ChatOptions::default()).await;
        assert_eq!(outcome, SubmitOutcome::Rejected(RejectReason::NothingToRegenerate));
        assert!(controller.is_empty());
    }

    #[tokio::test]
    async fn derived_actions_are_new_turns() {
        let (controller, _client) = controller();
        controller.submit("Q", ChatOptions::default()).await;

        controller.translate("doubt", ChatOptions::default()).await;
        controller.rerun_history(0, ChatOptions::default()).await;

        let texts: Vec<String> = controller.user_queries().into_iter().map(|m| m.text).collect();
        assert_eq!(
            texts,
            vec![
                "Q".to_string(),
                queries::translate("doubt"),
                "Q".to_string(),
            ]
        );
        assert_eq!(
            controller.rerun_history(9, ChatOptions::default()).await,
            SubmitOutcome::Rejected(RejectReason::UnknownEntry)
        );
    }

    #[tokio::test]
    async fn events_follow_the_turn_lifecycle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let controller = ConversationController::new(Arc::new(EchoClient::new())).with_events(tx);

        controller.submit("abcd", ChatOptions::default()).await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(events.len(), 5);
        assert!(matches!(&events[0], SessionEvent::MessageAdded(m) if m.role == Role::User));
        assert!(matches!(&events[1], SessionEvent::MessageAdded(m) if m.streaming));
        assert!(matches!(&events[2], SessionEvent::MessageUpdated { text, .. } if text == "1: "));
        assert!(matches!(&events[3], SessionEvent::MessageUpdated { text, .. } if text == "1: abcd"));
        assert!(matches!(&events[4], SessionEvent::MessageFinished { failed: false, .. }));
    }
}
