//! samsaya-console - Terminal front-end for the Saṃśaya research console
//!
//! - `controller` - Session ownership and turn orchestration
//! - `attachments` - Pending attachments and file loading
//! - `audio` - Speech-to-text capture flow
//! - `actions` - Copy, share and listen on a message
//! - `capabilities` - Platform traits; `platform` holds the terminal implementations
//! - `config` - Configuration loading and client construction
//! - `render` / `repl` - Interactive terminal UI

pub mod actions;
pub mod attachments;
pub mod audio;
pub mod capabilities;
pub mod config;
pub mod controller;
pub mod logging;
pub mod platform;
pub mod render;
pub mod repl;

pub use config::{Config, ConfigError};
pub use controller::{
    ConversationController, RejectReason, SessionEvent, SubmitOutcome, SYSTEM_ERROR_TEXT,
};
