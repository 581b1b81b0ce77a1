//! Agent patterns — structured reasoning strategies.
//!
//! 1. **Chain-of-Thought** — one linear thought per turn until a final answer
//! 2. **ReAct** — Thought → Action → Observation loop with tool dispatch
//! 3. **Tree-of-Thoughts** — breadth-limited beam search with scoring
//!
//! Every pattern exposes `run_iter` (a lazy step stream) and `run` (the
//! answer or the terminal [`Failure`](crate::step::Failure)).

pub mod cot;
pub mod react;
pub mod tot;

pub use cot::CotAgent;
pub use react::ReactAgent;
pub use tot::{SearchNode, TotAgent};

#[cfg(test)]
pub(crate) mod test_helpers;
