//! Turns a reasoning state machine into a lazy step stream.
//!
//! A loop implements [`Machine::advance`], which performs at most one model
//! call and queues the steps it produced. [`drive`] only advances when the
//! consumer polls and the queue is empty, so dropping the stream stops the
//! run after the step in hand.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use kangae_core::memory::Memory;
use kangae_core::message::Role;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::step::{Failure, Step};

/// Steps waiting to be yielded, plus whether the run has ended.
#[derive(Default)]
pub(crate) struct Outbox {
    pending: VecDeque<Step>,
    finished: bool,
}

impl Outbox {
    pub(crate) fn emit(&mut self, step: Step) {
        self.pending.push_back(step);
    }

    /// Queue the terminal step. Nothing is advanced afterwards.
    pub(crate) fn finish(&mut self, step: Step) {
        self.pending.push_back(step);
        self.finished = true;
    }

    fn pop(&mut self) -> Option<Step> {
        self.pending.pop_front()
    }
}

#[async_trait]
pub(crate) trait Machine: Send {
    fn outbox(&mut self) -> &mut Outbox;

    /// Move the state machine forward by one unit of work.
    async fn advance(&mut self);
}

pub(crate) fn drive<'a, M: Machine + 'a>(machine: M) -> BoxStream<'a, Step> {
    stream::unfold(machine, |mut machine| async move {
        loop {
            if let Some(step) = machine.outbox().pop() {
                return Some((step, machine));
            }
            if machine.outbox().finished {
                return None;
            }
            machine.advance().await;
        }
    })
    .boxed()
}

/// Drain a step stream into its outcome.
pub async fn conclude(mut steps: BoxStream<'_, Step>) -> Result<String, Failure> {
    while let Some(step) = steps.next().await {
        match step {
            Step::Answer(answer) => return Ok(answer),
            Step::Failed(failure) => return Err(failure),
            _ => {}
        }
    }
    Err(Failure::Incomplete)
}

/// Search memory for context, joined one hit per line. A failing search
/// yields no context.
pub(crate) async fn recall(memory: &dyn Memory, query: &str, limit: usize) -> String {
    match memory.search(query, limit).await {
        Ok(hits) => {
            debug!(count = hits.len(), "Recalled memories");
            hits.join("\n")
        }
        Err(e) => {
            warn!("Memory recall failed, continuing without context: {e}");
            String::new()
        }
    }
}

/// Append to memory if one is attached. Failures are logged, not raised.
pub(crate) async fn remember(memory: Option<&Arc<dyn Memory>>, role: Role, content: &str) {
    if let Some(memory) = memory
        && let Err(e) = memory.add(role, content).await
    {
        warn!(role = %role, "Failed to record message in memory: {e}");
    }
}
