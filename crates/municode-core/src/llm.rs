//! Generation client trait

use async_trait::async_trait;

use crate::{Model, Result};

/// Trait for hosted completion services (e.g., Cortex Complete)
///
/// Implementations send the prompt as-is and return the raw generated text;
/// display escaping happens in the rendering layer.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a completion for `prompt` with the given model
    async fn complete(&self, model: Model, prompt: &str) -> Result<String>;
}
