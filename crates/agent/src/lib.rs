//! The reasoning loops — the heart of Kangae.
//!
//! Each loop repeatedly builds a prompt, calls the language model, parses
//! the reply with [`kangae_core::protocol`] and branches on the intent:
//!
//! 1. **Final answer** ends the run
//! 2. **Thought** (CoT) or **Action** (ReAct) extends the scratchpad
//! 3. **Candidates** (ToT) are scored and pruned to the frontier
//! 4. Anything else ends the run with an error sentinel
//!
//! Runs are exposed as lazy [`Step`] streams: polling drives the state
//! machine, dropping the stream stops it.

mod driver;
pub mod evaluator;
pub mod patterns;
pub mod prompt;
pub mod step;
pub mod strategy;

pub use driver::conclude;
pub use evaluator::ModelEvaluator;
pub use patterns::{CotAgent, ReactAgent, SearchNode, TotAgent};
pub use step::{Expected, Failure, Step};
pub use strategy::{Reasoner, ReasonerOptions, Strategy, UnknownStrategy};
