//! Terminal interface for Municode

mod chat;
mod commands;
mod markdown;
mod search;
mod ui;


pub use chat::run_chat;
pub use commands::{ChatCommand, SearchCommand};
pub use markdown::render_terminal;
pub use search::run_search;
pub use ui::{display_banner, handle_input_with_history, print_markdown};

// Re-export core types
pub use municode_core::{Error, Result};
