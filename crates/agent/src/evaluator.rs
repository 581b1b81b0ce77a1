//! Model-backed evaluator for Tree-of-Thoughts.

use async_trait::async_trait;
use kangae_core::model::{Evaluator, LanguageModel};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::prompt;

/// Asks the language model to rate a history between 0 and 1.
///
/// The reply must be a bare number. Anything else, or a failed call,
/// scores 0.0 so the search can go on.
pub struct ModelEvaluator {
    model: Arc<dyn LanguageModel>,
}

impl ModelEvaluator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Evaluator for ModelEvaluator {
    async fn score(&self, history: &str) -> f64 {
        let reply = match self.model.complete(&prompt::evaluation(history)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Evaluation call failed: {e}");
                return 0.0;
            }
        };

        match reply.trim().parse::<f64>() {
            Ok(score) if score.is_finite() => {
                debug!(score, "Scored history");
                score
            }
            Ok(score) => {
                warn!(score, "Evaluation score is not finite");
                0.0
            }
            Err(_) => {
                warn!(reply = %reply, "Failed to parse evaluation score");
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_helpers::{BrokenModel, ScriptedModel};

    #[tokio::test]
    async fn parses_numeric_reply() {
        let model = ScriptedModel::new(&[" 0.75\n"]);
        let evaluator = ModelEvaluator::new(model.clone());
        assert_eq!(evaluator.score("思考A").await, 0.75);
        assert_eq!(
            model.prompts()[0],
            "以下の思考の有用性を0から1の数値で評価してください。数値のみ回答してください。\n思考A\nスコア:"
        );
    }

    #[tokio::test]
    async fn unparsable_reply_scores_zero() {
        let evaluator = ModelEvaluator::new(ScriptedModel::new(&["とても良い"]));
        assert_eq!(evaluator.score("h").await, 0.0);
    }

    #[tokio::test]
    async fn non_finite_reply_scores_zero() {
        for reply in ["NaN", "inf", "-infinity"] {
            let evaluator = ModelEvaluator::new(ScriptedModel::new(&[reply]));
            assert_eq!(evaluator.score("h").await, 0.0, "{reply}");
        }
    }

    #[tokio::test]
    async fn failed_call_scores_zero() {
        let evaluator = ModelEvaluator::new(Arc::new(BrokenModel));
        assert_eq!(evaluator.score("h").await, 0.0);
    }
}
