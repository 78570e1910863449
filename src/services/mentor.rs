use crate::services::conversation::{Conversation, WindowPolicy};
use crate::services::llm::{LlmClient, LlmError};

pub(crate) const MENTOR_PROMPT: &str = "Dr. Max, explain [medical concept/case/exam strategy] in a \
way that makes sense, like you're talking to a clueless intern. Include the high-yield points, \
real-world relevance, and any exam tricks that will save me from failing. Also, throw in a \
sarcastic analogy so I actually remember it.";

fn summary_context(summary: &str) -> String {
    format!(
        "Based on the relevant document summary below, provide a clear and concise answer to the \
         given question. Ensure that the response is accurate and aligned with medical concepts, \
         clinical cases, or exam strategies.\nRelevant document summary:\n{summary}"
    )
}

/// Asks the study mentor. The log only changes when the model answers.
pub(crate) async fn ask(
    llm: &LlmClient,
    policy: WindowPolicy,
    conversation: &mut Conversation,
    document_summary: Option<&str>,
    user_text: &str,
) -> Result<String, LlmError> {
    let context = document_summary.map(summary_context);
    let messages = conversation.request(policy, context.as_deref(), user_text);

    let reply = llm.complete(&messages).await?;
    conversation.commit(policy, user_text, &reply);
    Ok(reply)
}
