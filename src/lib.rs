//! Affiliate Relay - Telegram bot that rewrites Amazon links with an affiliate tag
//!
//! This library provides the core functionality for the relay:
//! - Amazon link detection, redirect expansion and re-tagging
//! - Replacement message composition
//! - The Telegram channel adapter
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Telegram (getUpdates polling)           │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Relay handler                        │
//! │   Ignore list  │  Delete + re-post  │  Broadcast     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Link rewriter                        │
//! │   Detect  │  Redirects  │  Tag  │  Bitly  │  Compose │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod config;
pub mod daemon;
pub mod error;
pub mod links;
pub mod relay;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use links::LinkRewriter;
pub use relay::{RelayHandler, RelayOutcome};
