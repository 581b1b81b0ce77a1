//! The textual response protocol spoken between the loops and the model.
//!
//! The model answers in plain text; intents are recognized by fixed,
//! line-anchored markers:
//!
//! ```text
//! 思考: <thought>
//! 行動: <tool_name>: <arguments>
//! 最終的な答え: <answer>
//! - <candidate thought>
//! ```
//!
//! A final answer outranks an action, which outranks a thought. Bulleted
//! candidates are only considered when no other marker is present. The
//! marker literals are constants so a locale change is a one-line edit.

/// Marks a reasoning step.
pub const THOUGHT: &str = "思考:";

/// Marks a tool invocation, `行動: name: arguments`.
pub const ACTION: &str = "行動:";

/// Marks the final answer.
pub const FINAL_ANSWER: &str = "最終的な答え:";

/// Marks one Tree-of-Thoughts candidate.
pub const CANDIDATE: &str = "- ";

/// Prefix of an observation line written back into the scratchpad.
pub const OBSERVATION: &str = "観察:";

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Registry name of the tool.
    pub tool: String,
    /// Raw argument text, trimmed.
    pub input: String,
}

/// What a model response asks the loop to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    FinalAnswer(String),
    /// An action, with the thought line that accompanied it, if any.
    Action {
        action: Action,
        thought: Option<String>,
    },
    Thought(String),
    Candidates(Vec<String>),
    Unparseable,
}

impl Intent {
    /// The thought carried by this intent, if any.
    pub fn thought(&self) -> Option<&str> {
        match self {
            Self::Thought(t) => Some(t),
            Self::Action { thought, .. } => thought.as_deref(),
            _ => None,
        }
    }
}

/// Parse a raw model response into its highest-priority intent.
pub fn parse(output: &str) -> Intent {
    if let Some(answer) = find_marker(output, FINAL_ANSWER) {
        return Intent::FinalAnswer(answer);
    }

    let thought = find_marker(output, THOUGHT);
    if let Some(action) = find_action(output) {
        return Intent::Action { action, thought };
    }
    if let Some(thought) = thought {
        return Intent::Thought(thought);
    }

    let candidates = candidates(output);
    if !candidates.is_empty() {
        return Intent::Candidates(candidates);
    }

    Intent::Unparseable
}

/// The trimmed final answer, if any line carries the final-answer marker.
pub fn final_answer(output: &str) -> Option<String> {
    find_marker(output, FINAL_ANSWER)
}

/// Every bulleted candidate line, in order, trimmed. Empty bullets are skipped.
pub fn candidates(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix(CANDIDATE))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn find_marker(output: &str, marker: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix(marker))
        .map(|rest| rest.trim().to_string())
}

/// First `行動:` line whose remainder is `name: arguments` with a word-only name.
fn find_action(output: &str) -> Option<Action> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix(ACTION))
        .find_map(|rest| {
            let (name, input) = rest.trim_start().split_once(':')?;
            let is_word = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
            is_word.then(|| Action {
                tool: name.to_string(),
                input: input.trim().to_string(),
            })
        })
}
