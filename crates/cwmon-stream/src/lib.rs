//! # cwmon-stream
//!
//! Keeps the synchronizer's live telemetry flowing: resilient SSE streams,
//! chunk tokenizing, staleness detection, and the coordinator that routes both
//! feeds into one output surface.
//!
//! - [`tokenizer`] - pure chunk-to-line reassembly and the clear sentinel
//! - [`markup`] - HTML-to-text for server-rendered log lines
//! - [`session`] - per-stream connection state and backoff
//! - [`resilient`] - [`ResilientStream`], one self-healing connection task
//! - [`watchdog`] - [`StalenessWatchdog`] for open-but-silent connections
//! - [`coordinator`] - [`DualStreamCoordinator`] over the verbose and summary feeds
//! - [`surface`] - [`OutputSurface`] / [`TokenRenderer`] seams to the display

pub mod coordinator;
pub mod error;
pub mod markup;
pub mod resilient;
pub mod session;
pub mod surface;
pub mod tokenizer;
pub mod watchdog;

pub use coordinator::{DualStreamCoordinator, FeedEndpoints, sync_event_from_line};
pub use error::StreamError;
pub use markup::strip_markup;
pub use resilient::{
    ResilientStream, SseMessage, StreamEvent, StreamEventKind, StreamOptions, build_client,
};
pub use session::{FeedKind, StreamSession, StreamStatus};
pub use surface::{LineStyle, OutputSurface, PlainRenderer, TokenRenderer, VecSurface};
pub use tokenizer::{CLEAR_SENTINEL, LineAssembler, LogToken, TokenKind, Tokenized, flush, tokenize};
pub use watchdog::StalenessWatchdog;
