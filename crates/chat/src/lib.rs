//! Chat-facing side of sheetbot.
//!
//! - **Cards** (`card`) - result, empty and error card documents
//! - **Events** (`events`) - envelopes, dispatcher and the search message handler
//! - **Socket** (`socket`) - transport trait and the reconnecting event loop
//! - **Stdio** (`stdio`) - line transport for running the bot from a terminal
//!
//! ```text
//! Transport → SocketRunner → EventDispatcher → SearchMessageHandler → SheetLookup
//!                  ↑                                    ↓
//!                reply  ←───────────  CardDocument / usage hint
//! ```

pub mod card;
pub mod events;
pub mod socket;
pub mod stdio;

pub use card::{error_card, render, CardDocument, CardKind};
pub use events::{
    search_dispatcher, ChatEnvelope, ChatEvent, EventDispatcher, MessageEvent, OutboundMessage,
    SearchMessageHandler, SheetLookup,
};
pub use socket::{ChatTransport, NoopTransport, ReconnectPolicy, SocketRunner};
pub use stdio::StdioTransport;
