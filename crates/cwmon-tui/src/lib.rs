//! Terminal UI for CWMON.
//!
//! Watches a CrossWatch server's sync run live: a timeline and progress bar
//! on top, the streamed log or run summary below.
//!
//! ## Hotkeys
//!
//! - `d` - Toggle details (verbose log / compact summary)
//! - `b` - Toggle debug (raw lines)
//! - `↑`/`↓`, `PgUp`/`PgDn`, mouse wheel - Scroll
//! - `Home` / `End` - Oldest line / follow newest
//! - `0`-`9` - Scrub to 0%-90%
//! - `r` - Reconnect now
//! - `c` - Clear the log view
//! - `q` - Quit

pub mod app;
pub mod event;
pub mod render;
pub mod scroll;
pub mod surface;
pub mod theme;
pub mod widget;

pub use app::{App, AppResult, ProgressView};
pub use event::{AppEvent, InputHandler};
pub use render::{StyledRenderer, classify, format_line};
pub use scroll::{DEFAULT_TOLERANCE, SCRUB_PIN_PERCENT, ScrollStickController};
pub use surface::{DEFAULT_CAPACITY, LogSurface, StyledLine};
pub use theme::Palette;
pub use widget::{RunProgressBar, TimelineChips};
