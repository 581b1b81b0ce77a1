//! Prompt templates for the reasoning loops.
//!
//! Recalled memory is placed ahead of the scratchpad for CoT and ReAct, and
//! under a `関連履歴` heading for Tree-of-Thoughts.

use kangae_core::protocol::{FINAL_ANSWER, THOUGHT};

/// Prefix the scratchpad with recalled history, if any.
fn scratchpad_with_history(history: &str, scratchpad: &str) -> String {
    if history.is_empty() {
        scratchpad.to_string()
    } else {
        format!("{history}\n{scratchpad}")
    }
}

fn memory_section(memory: Option<&str>) -> String {
    match memory {
        Some(m) if !m.is_empty() => format!("関連履歴:\n{m}\n"),
        _ => String::new(),
    }
}

pub fn chain_of_thought(question: &str, history: &str, scratchpad: &str) -> String {
    format!(
        "質問: {question}\n{}次の思考を '{THOUGHT}'、最終的な答えを '{FINAL_ANSWER}' として出力してください。",
        scratchpad_with_history(history, scratchpad)
    )
}

pub fn react(tools: &str, question: &str, history: &str, scratchpad: &str) -> String {
    format!(
        "あなたは質問に答えるアシスタントです。\n利用可能な行動:\n{tools}\n\n質問: {question}\n{}",
        scratchpad_with_history(history, scratchpad)
    )
}

pub fn tot_proposal(question: &str, memory: Option<&str>, history: &str, breadth: usize) -> String {
    format!(
        "質問: {question}\n{}これまでの思考:\n{history}\n{breadth}個の次の思考候補を箇条書きで提案してください。",
        memory_section(memory)
    )
}

pub fn tot_final(question: &str, memory: Option<&str>, history: &str) -> String {
    format!(
        "質問: {question}\n{}思考過程:\n{history}\n{FINAL_ANSWER}",
        memory_section(memory)
    )
}

pub fn evaluation(history: &str) -> String {
    format!(
        "以下の思考の有用性を0から1の数値で評価してください。数値のみ回答してください。\n{history}\nスコア:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cot_without_history() {
        assert_eq!(
            chain_of_thought("1+1は?", "", "思考: 足す\n"),
            "質問: 1+1は?\n思考: 足す\n次の思考を '思考:'、最終的な答えを '最終的な答え:' として出力してください。"
        );
    }

    #[test]
    fn history_precedes_scratchpad() {
        let prompt = react("- calculator: 計算", "q", "過去", "思考: x\n");
        assert!(prompt.ends_with("質問: q\n過去\n思考: x\n"));
        assert!(prompt.contains("利用可能な行動:\n- calculator: 計算\n\n"));
    }

    #[test]
    fn tot_memory_section_is_optional() {
        let with = tot_proposal("q", Some("m"), "h", 3);
        assert_eq!(
            with,
            "質問: q\n関連履歴:\nm\nこれまでの思考:\nh\n3個の次の思考候補を箇条書きで提案してください。"
        );
        assert!(!tot_proposal("q", Some(""), "h", 3).contains("関連履歴"));
        assert!(!tot_final("q", None, "h").contains("関連履歴"));
        assert!(tot_final("q", None, "h").ends_with("思考過程:\nh\n最終的な答え:"));
    }
}
