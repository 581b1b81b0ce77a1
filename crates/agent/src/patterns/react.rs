//! ReAct pattern — Thought → Action → Observation loop.
//!
//! The agent reasons step-by-step, choosing tools to gather information,
//! then synthesizes a final answer.
//!
//! # Trace Format
//!
//! Each turn appends to the scratchpad:
//! - the raw model output (**Thought** and **Action** lines)
//! - `観察: <text>`, the **Observation** returned by the dispatcher
//!
//! Tool problems never end the run. An unknown tool, rejected arguments or
//! a failing handler all come back as observation text the model can react
//! to on its next turn. The loop terminates on a final answer, on output
//! with no action, or when max turns is reached.

use async_trait::async_trait;
use futures::stream::BoxStream;
use kangae_core::memory::Memory;
use kangae_core::message::Role;
use kangae_core::model::LanguageModel;
use kangae_core::protocol::{self, Action, Intent, OBSERVATION};
use kangae_core::tool::{ToolRegistry, dispatch, parse_arguments};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::driver::{Machine, Outbox, conclude, drive, recall, remember};
use crate::prompt;
use crate::step::{Expected, Failure, Step};

/// Primary parameter used when the action names an unregistered tool.
const FALLBACK_PARAMETER: &str = "input";

pub struct ReactAgent {
    model: Arc<dyn LanguageModel>,
    tools: Arc<ToolRegistry>,
    memory: Option<Arc<dyn Memory>>,
    max_turns: usize,
    recall_limit: usize,
}

impl ReactAgent {
    pub fn new(model: Arc<dyn LanguageModel>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            tools,
            memory: None,
            max_turns: 5,
            recall_limit: 3,
        }
    }

    /// Attach a memory store for recall and recording.
    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Set max turns.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Set the number of memories recalled before the first turn.
    pub fn with_recall_limit(mut self, limit: usize) -> Self {
        self.recall_limit = limit;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Lazily run the loop. Each polled turn makes one model call and at
    /// most one tool call.
    pub fn run_iter<'a>(&'a self, question: &'a str) -> BoxStream<'a, Step> {
        info!(
            max_turns = self.max_turns,
            tools = self.tools.len(),
            "Starting ReAct run"
        );
        drive(ReactRun {
            agent: self,
            question,
            outbox: Outbox::default(),
            history: None,
            scratchpad: String::new(),
            turn: 0,
        })
    }

    /// Run to completion and return the answer.
    pub async fn run(&self, question: &str) -> Result<String, Failure> {
        conclude(self.run_iter(question)).await
    }

    /// Execute one action and render its observation text.
    async fn observe(&self, action: &Action) -> String {
        let primary = match self.tools.get(&action.tool) {
            Some(tool) => tool.primary_parameter(),
            None => FALLBACK_PARAMETER,
        };
        let arguments = parse_arguments(&action.input, primary);

        info!(tool = %action.tool, input = %action.input, "Executing tool");
        match dispatch(&action.tool, &arguments, &self.tools).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %action.tool, "Tool failed: {e}");
                e.to_string()
            }
        }
    }
}

struct ReactRun<'a> {
    agent: &'a ReactAgent,
    question: &'a str,
    outbox: Outbox,
    history: Option<String>,
    scratchpad: String,
    turn: usize,
}

#[async_trait]
impl<'a> Machine for ReactRun<'a> {
    fn outbox(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    async fn advance(&mut self) {
        let memory = self.agent.memory.as_ref();
        let history = match &self.history {
            Some(history) => history.clone(),
            None => {
                let history = match memory {
                    Some(memory) => {
                        remember(Some(memory), Role::User, self.question).await;
                        recall(memory.as_ref(), self.question, self.agent.recall_limit).await
                    }
                    None => String::new(),
                };
                self.history = Some(history.clone());
                history
            }
        };

        if self.turn >= self.agent.max_turns {
            warn!(turns = self.turn, "Max turns reached with no final answer");
            self.outbox.finish(Step::Failed(Failure::MaxTurnsExceeded));
            return;
        }
        self.turn += 1;

        let prompt = prompt::react(
            &self.agent.tools.describe(),
            self.question,
            &history,
            &self.scratchpad,
        );
        debug!(turn = self.turn, %prompt, "ReAct prompt");
        let output = match self.agent.model.complete(&prompt).await {
            Ok(output) => output,
            Err(e) => {
                warn!(turn = self.turn, "Model call failed: {e}");
                self.outbox.finish(Step::Failed(Failure::Model(e.to_string())));
                return;
            }
        };
        debug!(turn = self.turn, %output, "ReAct output");
        self.outbox.emit(Step::Output(output.clone()));

        match protocol::parse(&output) {
            Intent::FinalAnswer(answer) => {
                remember(memory, Role::Assistant, &answer).await;
                info!(turn = self.turn, %answer, "Final answer");
                self.outbox.finish(Step::Answer(answer));
            }
            Intent::Action { action, .. } => {
                let observation = self.agent.observe(&action).await;
                debug!(turn = self.turn, %observation, "Observation");

                self.scratchpad
                    .push_str(&format!("{output}\n{OBSERVATION} {observation}\n"));
                remember(memory, Role::Assistant, &output).await;
                remember(memory, Role::System, &format!("{OBSERVATION} {observation}")).await;
                self.outbox.emit(Step::Observation(observation));
            }
            _ => {
                warn!(turn = self.turn, "No action in model output");
                self.outbox
                    .finish(Step::Failed(Failure::Unparseable(Expected::Action)));
            }
        }
    }
}
