//! Chat and search pipelines for Municode
//!
//! This crate wires the core capabilities into the two front-end pipelines:
//! retrieval-augmented chat ([`ChatEngine`] over a [`ChatSession`]) and
//! faceted search ([`SearchSession`]), plus the markdown renderer both share.

mod engine;
mod render;
mod search;
mod session;

#[cfg(test)]
mod fakes;

pub use engine::{ChatEngine, ChatTurn};
pub use render::{
    NO_RESULTS, ResultCard, SearchResultsView, chat_response, escape_math, references_table,
    search_results, truncate_at_word,
};
pub use search::{CONTEXT_LENGTH_OPTIONS, DEFAULT_CONTEXT_LENGTH, DEFAULT_LIMIT, SearchForm, SearchSession};
pub use session::{ChatSession, SessionState};

// Re-export core types for convenience
pub use municode_core::{
    AttributeSelection, ChatMessage, Error, GenerationClient, Model, Result, Role, SearchClient,
    SearchRecord, ServiceDescription,
};
