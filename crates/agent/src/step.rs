//! Steps yielded by the reasoning loops.
//!
//! Every run produces a finite sequence of [`Step`]s. The last one is always
//! terminal: [`Step::Answer`] on success or [`Step::Failed`] carrying one of
//! the fixed error sentinels.

use std::fmt;
use thiserror::Error;

use kangae_core::protocol::OBSERVATION;

/// Sentinel when CoT output carries neither a thought nor a final answer.
pub const UNPARSEABLE_THOUGHT: &str = "エラー: 思考を特定できませんでした";

/// Sentinel when ReAct output carries neither an action nor a final answer.
pub const UNPARSEABLE_ACTION: &str = "エラー: 行動を特定できませんでした";

/// Sentinel when the turn budget runs out.
pub const MAX_TURNS_EXCEEDED: &str = "エラー: 最大試行回数に達しました";

/// Sentinel prefix when the language model itself fails.
pub const MODEL_FAILURE: &str = "エラー: 言語モデルの呼び出しに失敗しました";

/// Sentinel when a step stream ends without a terminal step.
pub const INCOMPLETE: &str = "エラー: 推論が完了しませんでした";

/// Which intent the loop was waiting for when parsing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Thought,
    Action,
}

impl Expected {
    fn sentinel(self) -> &'static str {
        match self {
            Self::Thought => UNPARSEABLE_THOUGHT,
            Self::Action => UNPARSEABLE_ACTION,
        }
    }
}

/// Why a run ended without an answer. Displays as the sentinel text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("{}", .0.sentinel())]
    Unparseable(Expected),

    #[error("{}", MAX_TURNS_EXCEEDED)]
    MaxTurnsExceeded,

    #[error("{}: {}", MODEL_FAILURE, .0)]
    Model(String),

    #[error("{}", INCOMPLETE)]
    Incomplete,
}

/// One element of a run's step stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Raw model output for a turn.
    Output(String),
    /// Text returned by a dispatched tool.
    Observation(String),
    /// Candidate thoughts proposed for one ToT node.
    Candidates(Vec<String>),
    /// Best node kept after a ToT round.
    Selection { history: String, score: f64 },
    /// The bare final answer. Terminal.
    Answer(String),
    /// Terminal failure.
    Failed(Failure),
}

impl Step {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Answer(_) | Self::Failed(_))
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Answer(answer) => Some(answer),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output(text) | Self::Answer(text) => f.write_str(text),
            Self::Observation(text) => write!(f, "{OBSERVATION} {text}"),
            Self::Candidates(thoughts) => {
                let lines: Vec<String> = thoughts.iter().map(|t| format!("思考候補: {t}")).collect();
                f.write_str(&lines.join("\n"))
            }
            Self::Selection { history, score } => write!(f, "選択: {history} (score={score:.2})"),
            Self::Failed(failure) => write!(f, "{failure}"),
        }
    }
}
