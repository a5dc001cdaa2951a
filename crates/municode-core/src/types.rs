//! Common types used across the Municode front-ends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Record field holding the chunk text
pub const CHUNK_COLUMN: &str = "CHUNK";
/// Record field holding the source document path
pub const RELATIVE_PATH_COLUMN: &str = "RELATIVE_PATH";
/// Record field holding the document link
pub const PDF_URL_COLUMN: &str = "PDF_URL";
/// Record field holding the chapter link
pub const CHAPTER_URL_COLUMN: &str = "CHAPTER_URL";

/// Column projection requested from the search service by both front-ends
pub const DEFAULT_COLUMNS: [&str; 4] = [
    CHUNK_COLUMN,
    RELATIVE_PATH_COLUMN,
    PDF_URL_COLUMN,
    CHAPTER_URL_COLUMN,
];

/// Completion models offered by the chat front-end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    #[default]
    #[serde(rename = "mistral-large2")]
    MistralLarge2,
    #[serde(rename = "llama3.1-70b")]
    Llama31_70b,
    #[serde(rename = "llama3.1-8b")]
    Llama31_8b,
}

impl Model {
    pub const ALL: [Model; 3] = [Model::MistralLarge2, Model::Llama31_70b, Model::Llama31_8b];

    /// Model identifier understood by the completion backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::MistralLarge2 => "mistral-large2",
            Model::Llama31_70b => "llama3.1-70b",
            Model::Llama31_8b => "llama3.1-8b",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Model::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = Model::ALL.iter().map(Model::as_str).collect();
                Error::InvalidInput(format!(
                    "unknown model '{}', expected one of: {}",
                    wanted,
                    known.join(", ")
                ))
            })
    }
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry of the chat history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A chunk returned by the search service
///
/// Every field defaults to the empty string when the service omits it or
/// returns `null`, so rendering code never has to deal with missing values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    #[serde(rename = "CHUNK", default, deserialize_with = "null_as_empty")]
    pub chunk: String,
    #[serde(rename = "RELATIVE_PATH", default, deserialize_with = "null_as_empty")]
    pub relative_path: String,
    #[serde(rename = "PDF_URL", default, deserialize_with = "null_as_empty")]
    pub pdf_url: String,
    #[serde(rename = "CHAPTER_URL", default, deserialize_with = "null_as_empty")]
    pub chapter_url: String,
}

impl SearchRecord {
    pub fn pdf_link(&self) -> Option<&str> {
        non_empty(&self.pdf_url)
    }

    pub fn chapter_link(&self) -> Option<&str> {
        non_empty(&self.chapter_url)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Metadata describing a Cortex Search service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub attribute_columns: Vec<String>,
    pub search_column: String,
    pub columns: Vec<String>,
}

impl ServiceDescription {
    /// Build a description from the comma-separated lists the service reports
    pub fn from_metadata(attribute_columns: &str, search_column: &str, columns: &str) -> Self {
        Self {
            attribute_columns: split_columns(attribute_columns),
            search_column: search_column.trim().to_string(),
            columns: split_columns(columns),
        }
    }

    pub fn is_attribute(&self, column: &str) -> bool {
        self.attribute_columns
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column))
    }
}

fn split_columns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
