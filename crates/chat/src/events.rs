use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use sheetbot_core::{LookupError, LookupService, Row};
use thiserror::Error;
use tracing::{info, warn};

use crate::card::{error_card, render, CardDocument, USAGE_HINT};

pub const DEFAULT_PROGRESS_NOTICE: &str = "正在搜索，请稍候...";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub envelope_id: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    Message(MessageEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::Message(_) => ChatEventType::Message,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    Message,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub chat_id: String,
    pub message_id: String,
    pub sender_id: String,
    pub text: String,
}

impl MessageEvent {
    /// Message text with mention placeholders (`@_user_1`, `@_all`) removed. Remaining
    /// tokens are rejoined with single spaces.
    pub fn plain_text(&self) -> String {
        self.text
            .split_whitespace()
            .filter(|token| !is_mention_placeholder(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn is_mention_placeholder(token: &str) -> bool {
    if token == "@_all" {
        return true;
    }
    token
        .strip_prefix("@_user_")
        .is_some_and(|suffix| !suffix.is_empty() && suffix.bytes().all(|byte| byte.is_ascii_digit()))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "msg_type", content = "content", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text(String),
    #[serde(rename = "interactive")]
    Card(CardDocument),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(Vec<OutboundMessage>),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("handler for {expected:?} events received a {received:?} event")]
    UnexpectedEvent { expected: ChatEventType, received: ChatEventType },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;

    /// Sent before `handle` runs, so the sender sees something while slow work is in flight.
    fn progress_notice(&self, _envelope: &ChatEnvelope) -> Option<OutboundMessage> {
        None
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub fn progress_notice(&self, envelope: &ChatEnvelope) -> Option<OutboundMessage> {
        self.handlers.get(&envelope.event.event_type())?.progress_notice(envelope)
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Registers a [`SearchMessageHandler`] for message events.
pub fn search_dispatcher<L>(lookup: L, progress_notice: Option<String>) -> EventDispatcher
where
    L: SheetLookup + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SearchMessageHandler::new(lookup).with_progress_notice(progress_notice));
    dispatcher
}

#[async_trait]
pub trait SheetLookup: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Vec<Row>, LookupError>;
}

#[async_trait]
impl SheetLookup for LookupService {
    async fn lookup(&self, query: &str) -> Result<Vec<Row>, LookupError> {
        LookupService::lookup(self, query).await
    }
}

#[async_trait]
impl<L> SheetLookup for Arc<L>
where
    L: SheetLookup + ?Sized,
{
    async fn lookup(&self, query: &str) -> Result<Vec<Row>, LookupError> {
        (**self).lookup(query).await
    }
}

pub struct SearchMessageHandler<L> {
    lookup: L,
    progress_notice: Option<String>,
}

impl<L> SearchMessageHandler<L>
where
    L: SheetLookup,
{
    pub fn new(lookup: L) -> Self {
        Self { lookup, progress_notice: None }
    }

    /// Blank notices are treated as disabled.
    pub fn with_progress_notice(mut self, notice: Option<String>) -> Self {
        self.progress_notice = notice.filter(|notice| !notice.trim().is_empty());
        self
    }

    pub async fn respond(&self, query: &str, ctx: &EventContext) -> OutboundMessage {
        if query.is_empty() {
            return OutboundMessage::Text(USAGE_HINT.to_owned());
        }

        match self.lookup.lookup(query).await {
            Ok(rows) => {
                info!(
                    event_name = "lookup.request.completed",
                    correlation_id = %ctx.correlation_id,
                    query,
                    matched = rows.len(),
                    "sheet lookup completed"
                );
                OutboundMessage::Card(render(query, &rows))
            }
            Err(error) => {
                warn!(
                    event_name = "lookup.request.failed",
                    correlation_id = %ctx.correlation_id,
                    query,
                    error_class = error.class(),
                    error = %error,
                    "sheet lookup failed"
                );
                OutboundMessage::Card(error_card(&error.to_string()))
            }
        }
    }
}

#[async_trait]
impl<L> EventHandler for SearchMessageHandler<L>
where
    L: SheetLookup + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::Message
    }

    fn progress_notice(&self, envelope: &ChatEnvelope) -> Option<OutboundMessage> {
        let ChatEvent::Message(event) = &envelope.event else {
            return None;
        };
        if event.plain_text().is_empty() {
            return None;
        }
        self.progress_notice.clone().map(OutboundMessage::Text)
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::Message(event) = &envelope.event else {
            return Err(EventHandlerError::UnexpectedEvent {
                expected: self.event_type(),
                received: envelope.event.event_type(),
            });
        };

        let query = event.plain_text();
        Ok(HandlerResult::Responded(vec![self.respond(&query, ctx).await]))
    }
}
