//! Model traits — the abstraction over the language model and the
//! Tree-of-Thoughts evaluator.
//!
//! The engine knows nothing about model identity, transport, or token cost.
//! A model is anything that turns a prompt into text. Plain closures
//! implement both traits, which keeps tests and embedding code short:
//!
//! ```
//! use kangae_core::{Evaluator, LanguageModel};
//!
//! # async fn demo() {
//! let model = |prompt: &str| format!("最終的な答え: {}", prompt.len());
//! let evaluate = |history: &str| history.len() as f64;
//!
//! assert!(model.complete("hi").await.unwrap().starts_with("最終的な答え"));
//! assert_eq!(evaluate.score("abc").await, 3.0);
//! # }
//! ```

use async_trait::async_trait;

use crate::error::ModelError;

/// A language model: one prompt in, one completion out.
///
/// Each call is awaited to completion before a loop proceeds; the engine
/// never issues two calls concurrently within one run.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a prompt.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

#[async_trait]
impl<F> LanguageModel for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        Ok(self(prompt))
    }
}

/// Scores a Tree-of-Thoughts history. Higher is better; no range is
/// imposed.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn score(&self, history: &str) -> f64;
}

#[async_trait]
impl<F> Evaluator for F
where
    F: Fn(&str) -> f64 + Send + Sync,
{
    async fn score(&self, history: &str) -> f64 {
        self(history)
    }
}
