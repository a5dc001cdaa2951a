//! Snowflake Cortex integration for Municode
//!
//! This crate provides the REST implementations of the `SearchClient` and
//! `GenerationClient` traits on top of Cortex Search, Cortex Complete and the
//! SQL statements API.

mod client;
mod config;


pub use client::CortexClient;
pub use config::{CortexConfig, TokenType};

// Re-export core types for convenience
pub use municode_core::{Error, GenerationClient, Result, SearchClient};
