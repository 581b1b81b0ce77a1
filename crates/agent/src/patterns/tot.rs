//! Tree-of-Thoughts pattern — greedy beam search over candidate thoughts.
//!
//! Each round, every node of the frontier asks the model for `breadth`
//! bulleted next thoughts. Every candidate extends its parent's history and
//! is scored by the evaluator; the pooled candidates are sorted by score
//! (stable, so ties keep proposal order) and the best `breadth` become the
//! next frontier. After `max_depth` rounds, or a round with no candidates,
//! the best node's history is used to request the final answer.
//!
//! The search is greedy: a node pruned early is never revisited, so the
//! chosen history is the best of its frontier, not of the whole tree.

use async_trait::async_trait;
use futures::stream::BoxStream;
use kangae_core::memory::Memory;
use kangae_core::message::Role;
use kangae_core::model::{Evaluator, LanguageModel};
use kangae_core::protocol::{self, FINAL_ANSWER};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::driver::{Machine, Outbox, conclude, drive, recall, remember};
use crate::prompt;
use crate::step::{Failure, Step};

/// A candidate reasoning path and its evaluator score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchNode {
    pub history: String,
    pub score: f64,
}

impl SearchNode {
    fn root() -> Self {
        Self {
            history: String::new(),
            score: 0.0,
        }
    }

    fn extend(&self, thought: &str) -> String {
        if self.history.is_empty() {
            thought.to_string()
        } else {
            format!("{}\n{thought}", self.history)
        }
    }
}

pub struct TotAgent {
    model: Arc<dyn LanguageModel>,
    evaluator: Arc<dyn Evaluator>,
    memory: Option<Arc<dyn Memory>>,
    max_depth: usize,
    breadth: usize,
    recall_limit: usize,
}

impl TotAgent {
    pub fn new(model: Arc<dyn LanguageModel>, evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            model,
            evaluator,
            memory: None,
            max_depth: 2,
            breadth: 2,
            recall_limit: 3,
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Set the number of search rounds.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the frontier width kept per round. Values below 1 act as 1.
    pub fn with_breadth(mut self, breadth: usize) -> Self {
        self.breadth = breadth.max(1);
        self
    }

    pub fn with_recall_limit(mut self, limit: usize) -> Self {
        self.recall_limit = limit;
        self
    }

    /// Lazily run the search. Each poll makes at most one model call: a
    /// proposal for one frontier node, or the final-answer request.
    pub fn run_iter<'a>(&'a self, question: &'a str) -> BoxStream<'a, Step> {
        info!(
            max_depth = self.max_depth,
            breadth = self.breadth,
            "Starting tree-of-thoughts run"
        );
        drive(TotRun {
            agent: self,
            question,
            outbox: Outbox::default(),
            context: None,
            frontier: vec![SearchNode::root()],
            pool: Vec::new(),
            round: 0,
            next_node: 0,
        })
    }

    /// Run to completion and return the answer.
    pub async fn run(&self, question: &str) -> Result<String, Failure> {
        conclude(self.run_iter(question)).await
    }
}

struct TotRun<'a> {
    agent: &'a TotAgent,
    question: &'a str,
    outbox: Outbox,
    /// Recalled memory; `None` until the run is primed.
    context: Option<String>,
    frontier: Vec<SearchNode>,
    /// Scored candidates of the round in progress, in proposal order.
    pool: Vec<SearchNode>,
    round: usize,
    next_node: usize,
}

impl<'a> TotRun<'a> {
    async fn prime(&self) -> String {
        let Some(memory) = &self.agent.memory else {
            return String::new();
        };
        let context = recall(memory.as_ref(), self.question, self.agent.recall_limit).await;
        remember(Some(memory), Role::User, self.question).await;
        context
    }

    async fn call(&mut self, prompt: &str) -> Option<String> {
        match self.agent.model.complete(prompt).await {
            Ok(output) => Some(output),
            Err(e) => {
                warn!(round = self.round, "Model call failed: {e}");
                self.outbox.finish(Step::Failed(Failure::Model(e.to_string())));
                None
            }
        }
    }

    /// Ask for candidates below one frontier node and score them.
    async fn expand(&mut self, context: &str) {
        let parent = self.frontier[self.next_node].clone();
        self.next_node += 1;

        let memory = (self.round == 0).then_some(context);
        let prompt =
            prompt::tot_proposal(self.question, memory, &parent.history, self.agent.breadth);
        debug!(round = self.round, %prompt, "ToT proposal prompt");
        let Some(output) = self.call(&prompt).await else {
            return;
        };

        let thoughts = protocol::candidates(&output);
        debug!(round = self.round, count = thoughts.len(), "Proposed thoughts");
        if thoughts.is_empty() {
            return;
        }

        for thought in &thoughts {
            let history = parent.extend(thought);
            let score = self.agent.evaluator.score(&history).await;
            self.pool.push(SearchNode { history, score });
        }
        self.outbox.emit(Step::Candidates(thoughts));
    }

    /// Close the round: keep the best `breadth` candidates.
    fn select(&mut self) {
        let mut pool = std::mem::take(&mut self.pool);
        self.next_node = 0;

        if pool.is_empty() {
            debug!(round = self.round, "No candidates proposed, stopping expansion");
            self.round = self.agent.max_depth;
            return;
        }

        pool.sort_by(|a, b| rank(a.score, b.score));
        pool.truncate(self.agent.breadth);
        self.frontier = pool;
        self.round += 1;

        let best = &self.frontier[0];
        info!(round = self.round, score = best.score, "Selected best path");
        self.outbox.emit(Step::Selection {
            history: best.history.clone(),
            score: best.score,
        });
    }

    async fn finalize(&mut self, context: &str) {
        let best = self.frontier[0].history.clone();
        let prompt = prompt::tot_final(self.question, Some(context), &best);
        debug!(%prompt, "ToT final prompt");
        let Some(output) = self.call(&prompt).await else {
            return;
        };

        let answer = protocol::final_answer(&output).unwrap_or_else(|| output.trim().to_string());
        remember(self.agent.memory.as_ref(), Role::Assistant, &answer).await;
        info!(%answer, "Final answer");
        self.outbox.emit(Step::Output(format!("{FINAL_ANSWER} {answer}")));
        self.outbox.finish(Step::Answer(answer));
    }
}

/// Descending by score with NaN last, so a NaN never outranks a real score.
fn rank(a: f64, b: f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.total_cmp(&a),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    }
}

#[async_trait]
impl<'a> Machine for TotRun<'a> {
    fn outbox(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    async fn advance(&mut self) {
        let context = match &self.context {
            Some(context) => context.clone(),
            None => {
                let context = self.prime().await;
                self.context = Some(context.clone());
                context
            }
        };

        if self.round >= self.agent.max_depth {
            self.finalize(&context).await;
        } else if self.next_node < self.frontier.len() {
            self.expand(&context).await;
        } else {
            self.select();
        }
    }
}
