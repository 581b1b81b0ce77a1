//! Strategy selection — one entry point over the three loops.

use futures::stream::BoxStream;
use kangae_core::memory::Memory;
use kangae_core::model::LanguageModel;
use kangae_core::tool::ToolRegistry;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::evaluator::ModelEvaluator;
use crate::patterns::{CotAgent, ReactAgent, TotAgent};
use crate::step::{Failure, Step};

/// A reasoning strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    React,
    Cot,
    Tot,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown strategy '{0}' (expected react, cot or tot)")]
pub struct UnknownStrategy(pub String);

impl Strategy {
    pub const ALL: [Strategy; 3] = [Self::React, Self::Cot, Self::Tot];

    pub fn name(self) -> &'static str {
        match self {
            Self::React => "react",
            Self::Cot => "cot",
            Self::Tot => "tot",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::React => "ReAct agent that uses tools",
            Self::Cot => "Chain-of-Thought agent",
            Self::Tot => "Tree-of-Thoughts agent",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Budgets shared by the loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasonerOptions {
    pub max_turns: usize,
    pub recall_limit: usize,
    pub max_depth: usize,
    pub breadth: usize,
}

impl Default for ReasonerOptions {
    fn default() -> Self {
        Self {
            max_turns: 5,
            recall_limit: 3,
            max_depth: 2,
            breadth: 2,
        }
    }
}

/// One of the three loops, configured and ready to run.
pub enum Reasoner {
    Cot(CotAgent),
    React(ReactAgent),
    Tot(TotAgent),
}

impl Reasoner {
    /// Build the loop for `strategy`. ReAct uses `tools`; ToT scores with a
    /// [`ModelEvaluator`] over the same model.
    pub fn build(
        strategy: Strategy,
        model: Arc<dyn LanguageModel>,
        tools: Arc<ToolRegistry>,
        memory: Option<Arc<dyn Memory>>,
        options: ReasonerOptions,
    ) -> Self {
        match strategy {
            Strategy::Cot => {
                let mut agent = CotAgent::new(model)
                    .with_max_turns(options.max_turns)
                    .with_recall_limit(options.recall_limit);
                if let Some(memory) = memory {
                    agent = agent.with_memory(memory);
                }
                Self::Cot(agent)
            }
            Strategy::React => {
                let mut agent = ReactAgent::new(model, tools)
                    .with_max_turns(options.max_turns)
                    .with_recall_limit(options.recall_limit);
                if let Some(memory) = memory {
                    agent = agent.with_memory(memory);
                }
                Self::React(agent)
            }
            Strategy::Tot => {
                let evaluator = Arc::new(ModelEvaluator::new(model.clone()));
                let mut agent = TotAgent::new(model, evaluator)
                    .with_max_depth(options.max_depth)
                    .with_breadth(options.breadth)
                    .with_recall_limit(options.recall_limit);
                if let Some(memory) = memory {
                    agent = agent.with_memory(memory);
                }
                Self::Tot(agent)
            }
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Cot(_) => Strategy::Cot,
            Self::React(_) => Strategy::React,
            Self::Tot(_) => Strategy::Tot,
        }
    }

    pub fn run_iter<'a>(&'a self, question: &'a str) -> BoxStream<'a, Step> {
        match self {
            Self::Cot(agent) => agent.run_iter(question),
            Self::React(agent) => agent.run_iter(question),
            Self::Tot(agent) => agent.run_iter(question),
        }
    }

    pub async fn run(&self, question: &str) -> Result<String, Failure> {
        match self {
            Self::Cot(agent) => agent.run(question).await,
            Self::React(agent) => agent.run(question).await,
            Self::Tot(agent) => agent.run(question).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_helpers::{EchoTool, ScriptedModel};
    use futures::StreamExt;

    fn tools() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        Arc::new(registry)
    }

    #[test]
    fn parse_strategy_names() {
        assert_eq!("react".parse::<Strategy>(), Ok(Strategy::React));
        assert_eq!(" CoT ".parse::<Strategy>(), Ok(Strategy::Cot));
        assert_eq!("tot".parse::<Strategy>(), Ok(Strategy::Tot));
        let err = "presentation".parse::<Strategy>().unwrap_err();
        assert!(err.to_string().contains("presentation"));
    }

    #[test]
    fn names_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>(), Ok(strategy));
            assert!(!strategy.description().is_empty());
        }
    }

    #[tokio::test]
    async fn react_reasoner_uses_tools() {
        let model = ScriptedModel::new(&["行動: echo: hi", "最終的な答え: ok"]);
        let reasoner = Reasoner::build(
            Strategy::React,
            model,
            tools(),
            None,
            ReasonerOptions::default(),
        );
        assert_eq!(reasoner.strategy(), Strategy::React);

        let steps: Vec<Step> = reasoner.run_iter("q").collect().await;
        assert_eq!(steps[1], Step::Observation("{\"text\":\"hi\"}".into()));
    }

    #[tokio::test]
    async fn cot_reasoner_honours_max_turns() {
        let model = ScriptedModel::repeating("思考: …", 2);
        let options = ReasonerOptions {
            max_turns: 2,
            ..ReasonerOptions::default()
        };
        let reasoner = Reasoner::build(Strategy::Cot, model, tools(), None, options);
        assert_eq!(reasoner.run("q").await, Err(Failure::MaxTurnsExceeded));
    }

    #[tokio::test]
    async fn tot_reasoner_scores_with_the_model() {
        // Proposal, two evaluations, final answer.
        let model = ScriptedModel::new(&["- a\n- b", "0.1", "0.9", "最終的な答え: b"]);
        let options = ReasonerOptions {
            max_depth: 1,
            breadth: 2,
            ..ReasonerOptions::default()
        };
        let reasoner = Reasoner::build(Strategy::Tot, model.clone(), tools(), None, options);

        let steps: Vec<Step> = reasoner.run_iter("q").collect().await;
        assert_eq!(steps[1], Step::Selection { history: "b".into(), score: 0.9 });
        assert_eq!(steps.last(), Some(&Step::Answer("b".into())));
        assert!(model.prompts()[3].contains("思考過程:\nb\n"));
    }
}
