//! Core traits and types for Municode
//!
//! This crate defines the vocabulary shared by the search and chat front-ends:
//! typed result records, chat messages, the Cortex Search filter expression,
//! the prompt builder, and the capability traits for the external search and
//! generation backends. Keeping the backends behind traits lets tests swap in
//! scripted fakes.

pub mod error;
pub mod filter;
pub mod llm;
pub mod prompt;
pub mod search;
pub mod types;


pub use error::{Error, Result};
pub use filter::{AttributeSelection, FilterExpr, build_filter};
pub use llm::GenerationClient;
pub use prompt::build_prompt;
pub use search::{SearchClient, SearchRequest};
pub use types::*;
