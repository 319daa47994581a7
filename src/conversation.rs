//! Merging caller-supplied conversation history into generation input

use crate::types::conversation::{ChatMessage, ConversationTurn};

/// Build the generation input sequence for one request
///
/// The system prompt comes first, then history in caller-supplied order
/// (oldest first), then the current user message as the final turn.
/// History is passed through untouched: no trimming or summarization
/// happens here, so an oversized history surfaces as a generation-engine
/// error rather than being silently dropped.
pub fn merge_conversation(
    system_prompt: &str,
    history: &[ConversationTurn],
    user_message: String,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(ChatMessage::user(user_message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::conversation::{ChatRole, Role};

    #[test]
    fn system_prompt_comes_first_question_last() {
        let history = vec![
            ConversationTurn {
                role: Role::User,
                content: "first question".to_string(),
            },
            ConversationTurn {
                role: Role::Assistant,
                content: "first answer".to_string(),
            },
        ];

        let messages = merge_conversation("be grounded", &history, "follow-up".to_string());

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[0].content, "be grounded");
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].content, "first question");
        assert_eq!(messages[2].role, ChatRole::Assistant);
        assert_eq!(messages[3].role, ChatRole::User);
        assert_eq!(messages[3].content, "follow-up");
    }

    #[test]
    fn empty_history_gives_system_plus_question() {
        let messages = merge_conversation("prompt", &[], "q".to_string());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].role, ChatRole::User);
    }

    #[test]
    fn history_order_is_preserved() {
        let history: Vec<ConversationTurn> = (0..5)
            .map(|i| ConversationTurn {
                role: if i % 2 == 0 { Role::User } else { Role::Assistant },
                content: format!("turn {}", i),
            })
            .collect();

        let messages = merge_conversation("p", &history, "final".to_string());
        for (i, message) in messages[1..6].iter().enumerate() {
            assert_eq!(message.content, format!("turn {}", i));
        }
    }
}
