use crate::core::config::ChatSettings;
use crate::services::llm::ChatMessage;

/// Bounds on how much prior conversation is replayed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowPolicy {
    pub(crate) max_messages: usize,
    pub(crate) max_chars: usize,
}

impl WindowPolicy {
    pub(crate) fn from_settings(chat: &ChatSettings) -> Self {
        Self { max_messages: chat.max_history_messages, max_chars: chat.max_history_chars }
    }
}

/// In-session chat log: one fixed system instruction followed by user/assistant pairs.
#[derive(Debug, Clone)]
pub(crate) struct Conversation {
    system_prompt: &'static str,
    turns: Vec<ChatMessage>,
}

impl Conversation {
    pub(crate) fn new(system_prompt: &'static str) -> Self {
        Self { system_prompt, turns: Vec::new() }
    }

    pub(crate) fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    /// Messages for the next model call. The pending user turn is always last and never dropped.
    pub(crate) fn request(
        &self,
        policy: WindowPolicy,
        context: Option<&str>,
        user_text: &str,
    ) -> Vec<ChatMessage> {
        let window = self.window(policy);

        let mut messages = Vec::with_capacity(window.len() + 3);
        messages.push(ChatMessage::system(self.system_prompt));
        if let Some(context) = context {
            messages.push(ChatMessage::system(context));
        }
        messages.extend_from_slice(window);
        messages.push(ChatMessage::user(user_text));
        messages
    }

    /// Appends a completed exchange and trims the log to the message budget.
    pub(crate) fn commit(&mut self, policy: WindowPolicy, user_text: &str, reply: &str) {
        self.turns.push(ChatMessage::user(user_text));
        self.turns.push(ChatMessage::assistant(reply));

        while self.turns.len() > policy.max_messages && self.turns.len() >= 2 {
            self.turns.drain(..2);
        }
    }

    fn window(&self, policy: WindowPolicy) -> &[ChatMessage] {
        let mut start = self.turns.len();
        let mut chars = 0;

        // Turns are only committed as pairs, so walking back two at a time keeps them aligned.
        while start >= 2 {
            let pair = &self.turns[start - 2..start];
            let pair_chars: usize = pair.iter().map(|message| message.content.chars().count()).sum();
            let count = self.turns.len() - start + 2;
            if count > policy.max_messages || chars + pair_chars > policy.max_chars {
                break;
            }
            chars += pair_chars;
            start -= 2;
        }

        &self.turns[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::Role;

    const PROMPT: &str = "You are a tutor.";

    fn filled(pairs: usize) -> Conversation {
        let mut conversation = Conversation::new(PROMPT);
        let policy = WindowPolicy { max_messages: 100, max_chars: 100_000 };
        for n in 0..pairs {
            conversation.commit(policy, &format!("question {n}"), &format!("answer {n}"));
        }
        conversation
    }

    #[test]
    fn first_request_is_system_then_user() {
        let conversation = Conversation::new(PROMPT);
        let policy = WindowPolicy { max_messages: 20, max_chars: 12_000 };
        let messages = conversation.request(policy, None, "hello");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system(PROMPT));
        assert_eq!(messages[1], ChatMessage::user("hello"));
    }

    #[test]
    fn context_is_a_second_system_message() {
        let conversation = filled(1);
        let policy = WindowPolicy { max_messages: 20, max_chars: 12_000 };
        let messages = conversation.request(policy, Some("Document summary"), "next");

        assert_eq!(messages[1], ChatMessage::system("Document summary"));
        assert_eq!(messages[2].role, Role::User);
        assert_eq!(messages.last(), Some(&ChatMessage::user("next")));
    }

    #[test]
    fn window_respects_message_budget_and_keeps_newest() {
        let conversation = filled(5);
        let policy = WindowPolicy { max_messages: 4, max_chars: 12_000 };
        let messages = conversation.request(policy, None, "pending");

        // system + 4 prior + pending
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[1], ChatMessage::user("question 3"));
        assert_eq!(messages[4], ChatMessage::assistant("answer 4"));
        assert_eq!(messages[5], ChatMessage::user("pending"));
    }

    #[test]
    fn window_drops_whole_pairs_on_char_budget() {
        let conversation = filled(3);
        // each pair is "question n" + "answer n" = 18 chars
        let policy = WindowPolicy { max_messages: 20, max_chars: 40 };
        let messages = conversation.request(policy, None, "pending");

        let prior: Vec<_> = messages[1..messages.len() - 1].to_vec();
        assert_eq!(prior.len(), 4);
        assert_eq!(prior[0], ChatMessage::user("question 1"));
    }

    #[test]
    fn pending_turn_survives_zero_char_budget() {
        let conversation = filled(2);
        let policy = WindowPolicy { max_messages: 20, max_chars: 0 };
        let messages = conversation.request(policy, None, "a very long pending question");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], ChatMessage::user("a very long pending question"));
    }

    #[test]
    fn commit_trims_log_in_pairs() {
        let mut conversation = Conversation::new(PROMPT);
        let policy = WindowPolicy { max_messages: 4, max_chars: 12_000 };
        for n in 0..4 {
            conversation.commit(policy, &format!("q{n}"), &format!("a{n}"));
        }

        let turns = conversation.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0], ChatMessage::user("q2"));
        assert_eq!(turns[3], ChatMessage::assistant("a3"));
    }
}
