//! Chain-of-Thought pattern — one linear thought per turn.
//!
//! ```text
//! THINK → THINK → … → FINAL | ERROR
//! ```
//!
//! Each turn the model sees the question, recalled context and every thought
//! accepted so far. A final answer ends the run; a thought is appended to the
//! scratchpad; anything else is terminal.

use async_trait::async_trait;
use futures::stream::BoxStream;
use kangae_core::memory::Memory;
use kangae_core::message::Role;
use kangae_core::model::LanguageModel;
use kangae_core::protocol::{self, Intent};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::driver::{Machine, Outbox, conclude, drive, recall, remember};
use crate::prompt;
use crate::step::{Expected, Failure, Step};

pub struct CotAgent {
    model: Arc<dyn LanguageModel>,
    memory: Option<Arc<dyn Memory>>,
    max_turns: usize,
    recall_limit: usize,
}

impl CotAgent {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
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

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Set the number of memories recalled before the first turn.
    pub fn with_recall_limit(mut self, limit: usize) -> Self {
        self.recall_limit = limit;
        self
    }

    /// Lazily run the loop. Each polled turn makes one model call.
    pub fn run_iter<'a>(&'a self, question: &'a str) -> BoxStream<'a, Step> {
        info!(max_turns = self.max_turns, "Starting chain-of-thought run");
        drive(CotRun {
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
}

struct CotRun<'a> {
    agent: &'a CotAgent,
    question: &'a str,
    outbox: Outbox,
    /// Recalled context; `None` until the run is primed.
    history: Option<String>,
    scratchpad: String,
    turn: usize,
}

impl CotRun<'_> {
    async fn prime(&mut self) -> String {
        let Some(memory) = &self.agent.memory else {
            return String::new();
        };
        remember(Some(memory), Role::User, self.question).await;
        recall(memory.as_ref(), self.question, self.agent.recall_limit).await
    }
}

#[async_trait]
impl<'a> Machine for CotRun<'a> {
    fn outbox(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    async fn advance(&mut self) {
        let history = match &self.history {
            Some(history) => history.clone(),
            None => {
                let history = self.prime().await;
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

        let prompt = prompt::chain_of_thought(self.question, &history, &self.scratchpad);
        debug!(turn = self.turn, %prompt, "CoT prompt");
        let output = match self.agent.model.complete(&prompt).await {
            Ok(output) => output,
            Err(e) => {
                warn!(turn = self.turn, "Model call failed: {e}");
                self.outbox.finish(Step::Failed(Failure::Model(e.to_string())));
                return;
            }
        };
        debug!(turn = self.turn, %output, "CoT output");
        self.outbox.emit(Step::Output(output.clone()));

        let memory = self.agent.memory.as_ref();
        match protocol::parse(&output) {
            Intent::FinalAnswer(answer) => {
                remember(memory, Role::Assistant, &answer).await;
                info!(turn = self.turn, %answer, "Final answer");
                self.outbox.finish(Step::Answer(answer));
            }
            intent if intent.thought().is_some() => {
                self.scratchpad.push_str(&output);
                self.scratchpad.push('\n');
                remember(memory, Role::Assistant, &output).await;
            }
            _ => {
                warn!(turn = self.turn, "No thought in model output");
                self.outbox
                    .finish(Step::Failed(Failure::Unparseable(Expected::Thought)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_helpers::{BrokenMemory, BrokenModel, ScriptedModel};
    use futures::StreamExt;
    use kangae_core::message::Message;
    use kangae_memory::ConversationMemory;

    #[tokio::test]
    async fn thought_then_final_answer() {
        let model = ScriptedModel::new(&["思考: A", "最終的な答え: done"]);
        let agent = CotAgent::new(model.clone());

        let steps: Vec<Step> = agent.run_iter("q").collect().await;
        assert_eq!(
            steps,
            vec![
                Step::Output("思考: A".into()),
                Step::Output("最終的な答え: done".into()),
                Step::Answer("done".into()),
            ]
        );
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn scratchpad_carries_accepted_thoughts() {
        let model = ScriptedModel::new(&["思考: A", "思考: B\n補足", "最終的な答え: C"]);
        let agent = CotAgent::new(model.clone());
        agent.run("q").await.unwrap();

        let prompts = model.prompts();
        assert_eq!(
            prompts[0],
            "質問: q\n次の思考を '思考:'、最終的な答えを '最終的な答え:' として出力してください。"
        );
        assert!(prompts[1].starts_with("質問: q\n思考: A\n次の思考"));
        assert!(prompts[2].starts_with("質問: q\n思考: A\n思考: B\n補足\n次の思考"));
    }

    #[tokio::test]
    async fn answer_is_trimmed() {
        let model = ScriptedModel::new(&["前置き\n最終的な答え:   42  \n"]);
        let agent = CotAgent::new(model);
        assert_eq!(agent.run("q").await, Ok("42".to_string()));
    }

    #[tokio::test]
    async fn max_turns_exceeded_after_exactly_max_turns() {
        for max_turns in 1..=4 {
            let model = ScriptedModel::repeating("思考: まだ", max_turns);
            let agent = CotAgent::new(model.clone()).with_max_turns(max_turns);

            let steps: Vec<Step> = agent.run_iter("q").collect().await;
            assert_eq!(steps.len(), max_turns + 1);
            assert_eq!(steps.last(), Some(&Step::Failed(Failure::MaxTurnsExceeded)));
            assert_eq!(model.call_count(), max_turns);
        }
    }

    #[tokio::test]
    async fn unparseable_output_is_terminal() {
        let model = ScriptedModel::new(&["なんとなく", "思考: unused"]);
        let agent = CotAgent::new(model.clone());

        let steps: Vec<Step> = agent.run_iter("q").collect().await;
        assert_eq!(
            steps,
            vec![
                Step::Output("なんとなく".into()),
                Step::Failed(Failure::Unparseable(Expected::Thought)),
            ]
        );
        assert_eq!(steps[1].to_string(), "エラー: 思考を特定できませんでした");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn failing_memory_does_not_stop_the_run() {
        let model = ScriptedModel::new(&["思考: A", "最終的な答え: done"]);
        let agent = CotAgent::new(model.clone()).with_memory(Arc::new(BrokenMemory));

        assert_eq!(agent.run("q").await, Ok("done".to_string()));
        assert_eq!(model.prompts()[0], prompt::chain_of_thought("q", "", ""));
    }

    #[tokio::test]
    async fn model_failure_is_terminal() {
        let agent = CotAgent::new(Arc::new(BrokenModel));
        let err = agent.run("q").await.unwrap_err();
        assert!(matches!(err, Failure::Model(reason) if reason.contains("connection refused")));
    }

    #[tokio::test]
    async fn stream_is_lazy() {
        let model = ScriptedModel::new(&["思考: A", "思考: B", "最終的な答え: C"]);
        let agent = CotAgent::new(model.clone());

        let mut steps = agent.run_iter("q");
        assert_eq!(steps.next().await, Some(Step::Output("思考: A".into())));
        drop(steps);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn memory_records_question_thoughts_and_answer() {
        let memory = Arc::new(ConversationMemory::new());
        memory.add(Role::User, "以前のq についてのメモ").await.unwrap();

        let model = ScriptedModel::new(&["思考: A", "最終的な答え: done"]);
        let agent = CotAgent::new(model.clone()).with_memory(memory.clone());
        agent.run("q").await.unwrap();

        // Keyword recall finds the earlier note and the question itself.
        assert!(model.prompts()[0].starts_with("質問: q\n以前のq についてのメモ\nq\n次の思考"));
        assert_eq!(
            memory.messages().await,
            vec![
                Message::user("以前のq についてのメモ"),
                Message::user("q"),
                Message::assistant("思考: A"),
                Message::assistant("done"),
            ]
        );
    }

    #[tokio::test]
    async fn failed_run_records_no_final_message() {
        let memory = Arc::new(ConversationMemory::new());
        let model = ScriptedModel::new(&["思考: A", "???"]);
        let agent = CotAgent::new(model).with_memory(memory.clone());

        assert!(agent.run("q").await.is_err());
        assert_eq!(
            memory.messages().await,
            vec![Message::user("q"), Message::assistant("思考: A")]
        );
    }
}
