//! Messaging Client
//!
//! The state machine behind the messaging page. It owns the realtime
//! connection of the open conversation and the [`SessionState`] a front-end
//! renders, and turns user actions, REST completions and pushed events into
//! state changes.
//!
//! # Overview
//!
//! None of the public methods block. Network work runs in spawned tokio tasks
//! that report back over an internal channel; the front-end drives the client
//! by awaiting [`MessagingClient::next_event`] (or polling
//! [`MessagingClient::try_next_event`] once per frame) and re-rendering after
//! each [`SessionUpdate`].
//!
//! Every conversation attempt gets a generation number. Results tagged with
//! an older generation are discarded, and a connection that shows up for an
//! older generation is closed on arrival, so at most one connection is live.
//!
//! The methods that start network work call `tokio::spawn` and must run
//! inside a tokio runtime.

use std::collections::VecDeque;
use std::future::pending;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use super::read_receipts::{apply_read, unread_for};
use super::search::filter_conversations;
use super::state::{SessionPhase, SessionState};
use super::typing::{TypingDebouncer, TypingSignal};
use crate::client::api::ChatApi;
use crate::client::config::{Config, Credentials};
use crate::client::transport::{Connection, Transport};
use crate::shared::error::{ChatError, Result};
use crate::shared::event::{ConnectionEvent, InboundEvent, OutboundEvent};
use crate::shared::messaging::{
    ChatId, ChatMessage, Conversation, MessageId, SendMessageRequest, UserId, UserRef,
};

/// Shown when the conversation list cannot be fetched
pub const CONVERSATIONS_FAILED: &str = "Unable to load conversations.";
/// Shown when the recipient profile or the history cannot be fetched
pub const CONVERSATION_FAILED: &str = "Unable to load recipient or messages.";
/// Shown when posting a message fails for a reason other than the network
pub const SEND_FAILED: &str = "Error sending message";

/// What changed after the client processed something
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// The conversation list was refreshed
    ConversationsLoaded { count: usize },
    /// The recipient profile of the open conversation arrived
    RecipientLoaded(UserRef),
    /// The realtime connection is up and the chat room joined
    Connected,
    /// The history replaced the message list
    HistoryLoaded { count: usize },
    /// A pushed message was appended
    MessageReceived(MessageId),
    /// Messages were confirmed read by the backend
    MessagesRead { count: usize },
    /// The recipient started or stopped typing
    TypingChanged(bool),
    /// The backend accepted a message
    MessageSent(MessageId),
    /// The open conversation was closed
    ConversationClosed,
    /// The transport closed the connection
    Disconnected { reason: Option<String> },
    /// `SessionState::error` was set
    Error(String),
}

/// Result of a spawned task
#[derive(Debug)]
enum Completion {
    Conversations(Result<Vec<Conversation>>),
    Recipient {
        generation: u64,
        user: UserRef,
    },
    Connected {
        generation: u64,
        connection: Connection,
    },
    History {
        generation: u64,
        messages: Vec<ChatMessage>,
    },
    OpenFailed {
        generation: u64,
        error: ChatError,
        message: String,
    },
    MarkedRead {
        generation: u64,
        ids: Vec<MessageId>,
        result: Result<()>,
    },
    Sent {
        generation: u64,
        content: String,
        result: Result<ChatMessage>,
    },
}

/// What woke the event pump
enum Wake {
    Completion(Completion),
    Connection(ConnectionEvent),
    TypingDeadline,
}

/// Realtime messaging client for one logged-in user
pub struct MessagingClient<A: ChatApi + ?Sized, T: Transport + ?Sized> {
    config: Config,
    me: UserId,
    api: Arc<A>,
    transport: Arc<T>,

    state: SessionState,
    updates: VecDeque<SessionUpdate>,

    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,

    /// Current conversation attempt
    generation: u64,
    /// Task opening the current conversation
    opening: Option<JoinHandle<()>>,
    /// Live connection of the current conversation
    connection: Option<Connection>,
    /// Messages pushed before the history was loaded
    early_messages: Vec<ChatMessage>,

    typing: TypingDebouncer,
    mark_in_flight: bool,
    send_in_flight: bool,
}

impl<A: ChatApi + ?Sized, T: Transport + ?Sized> MessagingClient<A, T> {
    /// Create a client for the configured user.
    ///
    /// Fails with [`ChatError::Unauthenticated`] when no user id is configured.
    pub fn new(config: Config, api: Arc<A>, transport: Arc<T>) -> Result<Self> {
        let me = config.user_id().cloned().ok_or(ChatError::Unauthenticated)?;
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let typing = TypingDebouncer::new(config.app().typing_quiescence);

        tracing::info!("[CHAT] Messaging client ready for user {}", me);

        Ok(Self {
            config,
            me,
            api,
            transport,
            state: SessionState::new(),
            updates: VecDeque::new(),
            completions_tx,
            completions_rx,
            generation: 0,
            opening: None,
            connection: None,
            early_messages: Vec::new(),
            typing,
            mark_in_flight: false,
            send_in_flight: false,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_user(&self) -> &UserId {
        &self.me
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a realtime connection is currently held
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().map(|c| !c.is_closed()).unwrap_or(false)
    }

    /// Fetch the conversation list
    pub fn refresh_conversations(&mut self) {
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = api.list_conversations().await;
            let _ = tx.send(Completion::Conversations(result));
        });
    }

    /// Filter the conversation list by the other participant's name
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.state.search_query = query.into();
        self.state.filtered_conversations =
            filter_conversations(&self.state.conversations, &self.me, &self.state.search_query);
    }

    /// Open the conversation with `recipient`, closing the current one first
    pub fn select_recipient(&mut self, recipient: UserId) {
        self.teardown();
        self.generation += 1;

        let chat_id = ChatId::for_pair(&self.me, &recipient);
        tracing::info!(
            "[CHAT] Opening chat {} with {} (generation {})",
            chat_id,
            recipient,
            self.generation
        );

        self.state.clear_conversation();
        self.state.selected_recipient = Some(recipient.clone());
        self.state.chat_id = Some(chat_id.clone());
        self.state.phase = SessionPhase::Idle;
        self.state.error = None;

        let task = open_conversation(
            Arc::clone(&self.api),
            Arc::clone(&self.transport),
            self.config.credentials().clone(),
            recipient,
            chat_id,
            self.generation,
            self.completions_tx.clone(),
        );
        self.opening = Some(tokio::spawn(task));
    }

    /// Close the open conversation and its connection
    pub fn close_conversation(&mut self) {
        if !self.state.has_open_conversation() && self.connection.is_none() {
            return;
        }
        tracing::info!("[CHAT] Closing conversation {:?}", self.state.chat_id);
        self.teardown();
        self.generation += 1;
        self.state.clear_conversation();
        self.state.phase = SessionPhase::Closed;
        self.updates.push_back(SessionUpdate::ConversationClosed);
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.state.is_chat_collapsed = collapsed;
        if !collapsed {
            self.state.has_new_message = false;
            self.reconcile_read_receipts();
        }
    }

    pub fn toggle_collapse(&mut self) {
        self.set_collapsed(!self.state.is_chat_collapsed);
    }

    /// Update the compose field; each call counts as a keystroke
    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.state.draft = text.into();
        // Keystrokes before the room is joined do not start a burst
        if self.connection.is_none() {
            return;
        }
        if let Some(TypingSignal::Start) = self.typing.keystroke(Instant::now()) {
            self.emit_typing(TypingSignal::Start);
        }
    }

    /// Post the draft to the open conversation.
    ///
    /// Returns false when nothing was sent: blank draft, no open
    /// conversation, or a send already in flight.
    pub fn send_draft(&mut self) -> bool {
        let content = self.state.draft.trim().to_string();
        let (Some(chat_id), Some(receiver)) =
            (self.state.chat_id.clone(), self.state.selected_recipient.clone())
        else {
            return false;
        };
        if content.is_empty() || self.send_in_flight {
            return false;
        }

        if let Some(signal) = self.typing.flush() {
            self.emit_typing(signal);
        }

        let request = SendMessageRequest {
            chat_id,
            receiver,
            content: content.clone(),
        };
        self.send_in_flight = true;

        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = api.send_message(&request).await;
            let _ = tx.send(Completion::Sent {
                generation,
                content,
                result,
            });
        });
        true
    }

    pub fn dismiss_error(&mut self) {
        self.state.error = None;
    }

    /// Wait for the next state change
    pub async fn next_event(&mut self) -> SessionUpdate {
        loop {
            if let Some(update) = self.updates.pop_front() {
                return update;
            }

            let deadline = self.typing.deadline();
            let wake = tokio::select! {
                Some(completion) = self.completions_rx.recv() => Wake::Completion(completion),
                event = next_connection_event(self.connection.as_mut()) => Wake::Connection(event),
                _ = wait_until(deadline) => Wake::TypingDeadline,
            };
            self.process(wake);
        }
    }

    /// Next state change if one is ready; never waits
    pub fn try_next_event(&mut self) -> Option<SessionUpdate> {
        loop {
            if let Some(update) = self.updates.pop_front() {
                return Some(update);
            }

            let wake = if let Ok(completion) = self.completions_rx.try_recv() {
                Wake::Completion(completion)
            } else if let Some(event) = self.connection.as_mut().and_then(Connection::try_recv) {
                Wake::Connection(event)
            } else if self.typing.deadline().is_some_and(|d| d <= Instant::now()) {
                Wake::TypingDeadline
            } else {
                return None;
            };
            self.process(wake);
        }
    }

    fn process(&mut self, wake: Wake) {
        match wake {
            Wake::Completion(completion) => self.on_completion(completion),
            Wake::Connection(ConnectionEvent::Inbound(event)) => self.on_inbound(event),
            Wake::Connection(ConnectionEvent::Closed { reason }) => self.on_closed(reason),
            Wake::TypingDeadline => {
                if let Some(signal) = self.typing.expire(Instant::now()) {
                    self.emit_typing(signal);
                }
            }
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Conversations(Ok(conversations)) => {
                tracing::info!("[CHAT] Loaded {} conversations", conversations.len());
                self.state.conversations = conversations;
                self.state.filtered_conversations = filter_conversations(
                    &self.state.conversations,
                    &self.me,
                    &self.state.search_query,
                );
                self.updates.push_back(SessionUpdate::ConversationsLoaded {
                    count: self.state.conversations.len(),
                });
            }
            Completion::Conversations(Err(e)) => {
                tracing::error!("[CHAT] Failed to load conversations: {}", e);
                self.fail(CONVERSATIONS_FAILED);
            }
            Completion::Recipient { generation, user } => {
                if self.is_stale(generation, "recipient") {
                    return;
                }
                self.state.recipient = Some(user.clone());
                self.updates.push_back(SessionUpdate::RecipientLoaded(user));
            }
            Completion::Connected {
                generation,
                connection,
            } => {
                if self.is_stale(generation, "connection") {
                    connection.close();
                    return;
                }
                tracing::info!("[CHAT] Joined chat {:?}", self.state.chat_id);
                self.connection = Some(connection);
                self.updates.push_back(SessionUpdate::Connected);
            }
            Completion::History {
                generation,
                messages,
            } => {
                if self.is_stale(generation, "history") {
                    return;
                }
                self.on_history(messages);
            }
            Completion::OpenFailed {
                generation,
                error,
                message,
            } => {
                if self.is_stale(generation, "open failure") {
                    return;
                }
                tracing::error!("[CHAT] Failed to open chat {:?}: {}", self.state.chat_id, error);
                self.opening = None;
                self.connection = None;
                self.early_messages.clear();
                self.state.phase = SessionPhase::Closed;
                self.fail(message);
            }
            Completion::MarkedRead {
                generation,
                ids,
                result,
            } => {
                if self.is_stale(generation, "mark-as-read") {
                    return;
                }
                self.mark_in_flight = false;
                match result {
                    Ok(()) => {
                        let count = apply_read(&mut self.state.messages, &ids);
                        tracing::debug!("[CHAT] {} messages marked read", count);
                        self.updates.push_back(SessionUpdate::MessagesRead { count });
                        self.reconcile_read_receipts();
                    }
                    Err(e) => {
                        tracing::error!("[CHAT] Mark-as-read failed: {}", e);
                        self.fail(format!("Failed to mark message as read: {}", e));
                    }
                }
            }
            Completion::Sent {
                generation,
                content,
                result,
            } => {
                self.send_in_flight = false;
                match result {
                    Ok(message) => {
                        tracing::info!("[CHAT] Message {} sent", message.id);
                        if self.state.draft.trim() == content {
                            self.state.draft.clear();
                        }
                        self.updates.push_back(SessionUpdate::MessageSent(message.id));
                    }
                    Err(e) => {
                        tracing::error!("[CHAT] Send failed: {}", e);
                        if self.is_stale(generation, "send failure") {
                            return;
                        }
                        match e {
                            ChatError::Network(_) => self.fail(e.to_string()),
                            _ => self.fail(SEND_FAILED),
                        }
                    }
                }
            }
        }
    }

    fn on_history(&mut self, history: Vec<ChatMessage>) {
        tracing::info!(
            "[CHAT] History of {:?}: {} messages",
            self.state.chat_id,
            history.len()
        );
        self.opening = None;
        self.state.messages = history;
        self.state.phase = SessionPhase::Open;
        self.updates.push_back(SessionUpdate::HistoryLoaded {
            count: self.state.messages.len(),
        });

        for message in std::mem::take(&mut self.early_messages) {
            if !self.state.contains_message(&message) {
                self.append(message);
            }
        }
        self.reconcile_read_receipts();
    }

    fn on_inbound(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Message(message) => {
                if self.state.chat_id.as_ref() != Some(&message.chat_id) {
                    tracing::debug!("[CHAT] Ignoring message for chat {}", message.chat_id);
                    return;
                }
                match self.state.phase {
                    SessionPhase::Idle => {
                        tracing::debug!("[CHAT] Holding message {} until history loads", message.id);
                        self.early_messages.push(*message);
                    }
                    SessionPhase::Open => {
                        self.append(*message);
                        self.reconcile_read_receipts();
                    }
                    SessionPhase::Closed => {}
                }
            }
            ref event if event.typing_user() == Some(&self.me) => {
                tracing::trace!("[CHAT] Ignoring own typing echo");
            }
            InboundEvent::Typing { .. } => self.set_remote_typing(true),
            InboundEvent::StopTyping { .. } => self.set_remote_typing(false),
            InboundEvent::Unknown(name) => {
                tracing::debug!("[CHAT] Ignoring event '{}'", name);
            }
        }
    }

    fn on_closed(&mut self, reason: Option<String>) {
        tracing::warn!("[CHAT] Connection closed: {:?}", reason);
        self.connection = None;
        self.typing.cancel();
        // Whatever the opening task still delivers belongs to a dead session
        if let Some(task) = self.opening.take() {
            task.abort();
            self.generation += 1;
        }
        self.early_messages.clear();
        if self.state.phase != SessionPhase::Closed {
            self.state.phase = SessionPhase::Closed;
            self.state.is_typing = false;
            self.updates.push_back(SessionUpdate::Disconnected {
                reason: reason.clone(),
            });
            let detail = reason.unwrap_or_else(|| "connection closed".to_string());
            self.fail(ChatError::connection(detail).to_string());
        }
    }

    fn append(&mut self, message: ChatMessage) {
        if self.state.is_chat_collapsed && !message.is_from(&self.me) {
            self.state.has_new_message = true;
        }
        let id = message.id.clone();
        self.state.messages.push(message);
        self.updates.push_back(SessionUpdate::MessageReceived(id));
    }

    fn set_remote_typing(&mut self, typing: bool) {
        if self.state.is_typing != typing {
            self.state.is_typing = typing;
            self.updates.push_back(SessionUpdate::TypingChanged(typing));
        }
    }

    /// Mark the visible unread messages as read, one request at a time
    fn reconcile_read_receipts(&mut self) {
        if self.state.phase != SessionPhase::Open
            || self.state.is_chat_collapsed
            || self.mark_in_flight
        {
            return;
        }
        let Some(chat_id) = self.state.chat_id.clone() else {
            return;
        };
        let ids = unread_for(&self.state.messages, &self.me);
        if ids.is_empty() {
            return;
        }

        tracing::debug!("[CHAT] Marking {} messages read in {}", ids.len(), chat_id);
        self.mark_in_flight = true;
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = api.mark_as_read(&chat_id).await;
            let _ = tx.send(Completion::MarkedRead {
                generation,
                ids,
                result,
            });
        });
    }

    fn emit_typing(&mut self, signal: TypingSignal) {
        let (Some(chat_id), Some(connection)) = (self.state.chat_id.clone(), self.connection.as_ref())
        else {
            return;
        };
        let user_id = self.me.clone();
        let event = match signal {
            TypingSignal::Start => OutboundEvent::Typing { chat_id, user_id },
            TypingSignal::Stop => OutboundEvent::StopTyping { chat_id, user_id },
        };
        if let Err(e) = connection.emit(event) {
            tracing::warn!("[CHAT] {}", e);
        }
    }

    /// Stop everything tied to the current conversation
    fn teardown(&mut self) {
        if let Some(signal) = self.typing.flush() {
            self.emit_typing(signal);
        }
        if let Some(task) = self.opening.take() {
            task.abort();
        }
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        self.early_messages.clear();
        self.mark_in_flight = false;
    }

    fn is_stale(&self, generation: u64, what: &str) -> bool {
        let stale = generation != self.generation;
        if stale {
            tracing::warn!(
                "[CHAT] Discarding stale {} (generation {}, current {})",
                what,
                generation,
                self.generation
            );
        }
        stale
    }

    fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.state.error = Some(message.clone());
        self.updates.push_back(SessionUpdate::Error(message));
    }
}

impl<A: ChatApi + ?Sized, T: Transport + ?Sized> Drop for MessagingClient<A, T> {
    fn drop(&mut self) {
        if let Some(task) = self.opening.take() {
            task.abort();
        }
        // Connection closes itself when dropped
        self.connection.take();
    }
}

/// Fetch the profile, connect, join the room, fetch the history
async fn open_conversation<A: ChatApi + ?Sized, T: Transport + ?Sized>(
    api: Arc<A>,
    transport: Arc<T>,
    credentials: Credentials,
    recipient: UserId,
    chat_id: ChatId,
    generation: u64,
    tx: mpsc::UnboundedSender<Completion>,
) {
    let failed = |error: ChatError, message: String| Completion::OpenFailed {
        generation,
        error,
        message,
    };

    match api.fetch_user(&recipient).await {
        Ok(user) => {
            let _ = tx.send(Completion::Recipient { generation, user });
        }
        Err(e) => {
            let _ = tx.send(failed(e, CONVERSATION_FAILED.to_string()));
            return;
        }
    }

    let connection = match transport.connect(&credentials).await {
        Ok(connection) => connection,
        Err(e) => {
            let message = e.to_string();
            let _ = tx.send(failed(e, message));
            return;
        }
    };
    if let Err(e) = connection.emit(OutboundEvent::JoinChat {
        chat_id: chat_id.clone(),
    }) {
        let message = e.to_string();
        let _ = tx.send(failed(e, message));
        return;
    }
    if tx
        .send(Completion::Connected {
            generation,
            connection,
        })
        .is_err()
    {
        return;
    }

    match api.fetch_messages(&chat_id).await {
        Ok(messages) => {
            let _ = tx.send(Completion::History {
                generation,
                messages,
            });
        }
        Err(e) => {
            let _ = tx.send(failed(e, CONVERSATION_FAILED.to_string()));
        }
    }
}

async fn next_connection_event(connection: Option<&mut Connection>) -> ConnectionEvent {
    match connection {
        Some(connection) => match connection.recv().await {
            Some(event) => event,
            None => pending().await,
        },
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
