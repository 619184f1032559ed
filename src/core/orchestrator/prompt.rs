//! Prompt construction and history reconciliation.
//!
//! Merges transcript fragments into one utterance, classifies backchannels
//! ("uh-huh", "okay") so a false alarm can resume playback instead of
//! regenerating, and rewrites the chat history when a real barge-in
//! invalidates the unheard agent response.

use tracing::debug;

use crate::core::llm::{ChatTurn, Role};

/// Stateless helper owning only the configured backchannel phrase set.
pub struct PromptGenerator {
    backchannels: Vec<String>,
}

impl PromptGenerator {
    pub fn new(phrases: &[String]) -> Self {
        Self {
            backchannels: phrases
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Join transcript fragments into a single utterance, collapsing any
    /// run of whitespace to one space.
    pub fn merge(transcripts: &[String]) -> String {
        transcripts
            .iter()
            .flat_map(|t| t.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True if the utterance is a backchannel: an exact member of the
    /// configured set, or at most two tokens containing one as a substring.
    pub fn is_backchannel(&self, utterance: &str) -> bool {
        let text = utterance.trim().to_lowercase();
        if text.is_empty() {
            return false;
        }
        if self.backchannels.iter().any(|p| *p == text) {
            return true;
        }
        if text.split_whitespace().count() <= 2 {
            return self.backchannels.iter().any(|p| text.contains(p.as_str()));
        }
        false
    }

    /// Fold a new utterance into the history.
    ///
    /// Under an interruption the unheard agent tail is dropped and the
    /// utterance is appended to the prior user turn, producing the combined
    /// question the agent should now answer. A trailing user turn is always
    /// merged into rather than duplicated, so adjacent turns never share a
    /// role.
    pub fn reconcile(&self, history: &mut Vec<ChatTurn>, utterance: &str, under_interruption: bool) {
        if utterance.is_empty() {
            return;
        }

        if under_interruption {
            if history.last().map(|t| t.role) == Some(Role::Agent) {
                let dropped = history.pop();
                if let Some(turn) = dropped {
                    debug!(
                        "Dropped unheard agent response from history ({} chars)",
                        turn.content.len()
                    );
                }
            }
        }

        match history.last_mut() {
            Some(turn) if turn.role == Role::User => {
                turn.content.push(' ');
                turn.content.push_str(utterance);
            }
            _ => history.push(ChatTurn::user(utterance)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> PromptGenerator {
        PromptGenerator::new(&[
            "uh-huh".to_string(),
            "uh huh".to_string(),
            "mm-hmm".to_string(),
            "okay".to_string(),
            "ok".to_string(),
            "yeah".to_string(),
            "got it".to_string(),
        ])
    }

    #[test]
    fn test_merge_collapses_whitespace() {
        let fragments = vec![
            "Hello".to_string(),
            "  I want to ".to_string(),
            "book\na flight".to_string(),
        ];
        assert_eq!(
            PromptGenerator::merge(&fragments),
            "Hello I want to book a flight"
        );
    }

    #[test]
    fn test_merge_empty() {
        assert_eq!(PromptGenerator::merge(&[]), "");
        assert_eq!(PromptGenerator::merge(&["   ".to_string()]), "");
    }

    #[test]
    fn test_backchannel_exact_match() {
        let prompt = generator();
        assert!(prompt.is_backchannel("uh-huh"));
        assert!(prompt.is_backchannel("  Okay "));
        assert!(prompt.is_backchannel("GOT IT"));
        assert!(!prompt.is_backchannel("tell me a joke"));
    }

    #[test]
    fn test_backchannel_short_utterance_substring() {
        let prompt = generator();
        // Two tokens containing a known phrase still count.
        assert!(prompt.is_backchannel("okay then"));
        assert!(prompt.is_backchannel("yeah sure"));
        // Longer utterances never match by substring.
        assert!(!prompt.is_backchannel("okay but what about the weather"));
    }

    #[test]
    fn test_backchannel_empty_is_not_a_backchannel() {
        assert!(!generator().is_backchannel("   "));
    }

    #[test]
    fn test_reconcile_new_turn() {
        let prompt = generator();
        let mut history = vec![
            ChatTurn::user("what is the weather"),
            ChatTurn::agent("It is sunny."),
        ];
        prompt.reconcile(&mut history, "tell me a joke", false);
        assert_eq!(history.len(), 3);
        assert_eq!(history[2], ChatTurn::user("tell me a joke"));
    }

    #[test]
    fn test_reconcile_interruption_drops_agent_tail_and_amends_user_turn() {
        let prompt = generator();
        let mut history = vec![
            ChatTurn::user("what is the weather"),
            ChatTurn::agent("It is sunny."),
        ];
        prompt.reconcile(&mut history, "actually tell me a joke", true);
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0],
            ChatTurn::user("what is the weather actually tell me a joke")
        );
    }

    #[test]
    fn test_reconcile_interruption_without_agent_tail() {
        let prompt = generator();
        let mut history = vec![ChatTurn::user("what is the weather")];
        prompt.reconcile(&mut history, "and the forecast", true);
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0],
            ChatTurn::user("what is the weather and the forecast")
        );
    }

    #[test]
    fn test_reconcile_never_leaves_adjacent_user_turns() {
        let prompt = generator();
        let mut history = vec![ChatTurn::user("first question")];
        prompt.reconcile(&mut history, "second question", false);
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0],
            ChatTurn::user("first question second question")
        );
    }

    #[test]
    fn test_reconcile_empty_utterance_is_a_no_op() {
        let prompt = generator();
        let mut history = vec![ChatTurn::user("hi"), ChatTurn::agent("hello")];
        prompt.reconcile(&mut history, "", true);
        assert_eq!(history.len(), 2);
    }
}
