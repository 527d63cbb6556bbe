//! Line-oriented transport for local use: every input line is a message, every
//! reply is one JSON document on its own output line.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin,
    Stdout,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::events::{ChatEnvelope, ChatEvent, MessageEvent, OutboundMessage};
use crate::socket::{ChatTransport, TransportError};

pub const STDIO_CHAT_ID: &str = "stdio";

pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

pub struct LineTransport<R, W> {
    lines: Mutex<Lines<R>>,
    writer: Mutex<W>,
    sequence: AtomicU64,
}

#[derive(Serialize)]
struct ReplyLine<'a> {
    chat_id: &'a str,
    reply_to: &'a str,
    #[serde(flatten)]
    message: &'a OutboundMessage,
}

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { lines: Mutex::new(reader.lines()), writer: Mutex::new(writer), sequence: AtomicU64::new(0) }
    }

    pub async fn with_writer<T>(&self, inspect: impl FnOnce(&W) -> T) -> T {
        inspect(&*self.writer.lock().await)
    }
}

#[async_trait]
impl<R, W> ChatTransport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        let line = self
            .lines
            .lock()
            .await
            .next_line()
            .await
            .map_err(|error| TransportError::Receive(error.to_string()))?;

        Ok(line.map(|text| {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
            ChatEnvelope {
                envelope_id: Uuid::new_v4().to_string(),
                event: ChatEvent::Message(MessageEvent {
                    chat_id: STDIO_CHAT_ID.to_owned(),
                    message_id: format!("stdio-{sequence}"),
                    sender_id: "local".to_owned(),
                    text,
                }),
            }
        }))
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn reply(
        &self,
        envelope: &ChatEnvelope,
        message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        let (chat_id, reply_to) = match &envelope.event {
            ChatEvent::Message(event) => (event.chat_id.as_str(), event.message_id.as_str()),
            ChatEvent::Unsupported { .. } => (STDIO_CHAT_ID, envelope.envelope_id.as_str()),
        };
        let mut line = serde_json::to_string(&ReplyLine { chat_id, reply_to, message })
            .map_err(|error| TransportError::Reply(error.to_string()))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await.map_err(|error| TransportError::Reply(error.to_string()))?;
        writer.flush().await.map_err(|error| TransportError::Reply(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .flush()
            .await
            .map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}
