use shiftdesk_db::models::{Conversation, ConversationMessage, Sender, User};
use tracing::warn;

use crate::assistant::{AssistantDeps, Reply};
use crate::error::ServiceResult;
use crate::providers::{ChatMessage, ChatRequest};

const MAX_HISTORY: usize = 10;
const FALLBACK_REPLY: &str =
    "Sorry, I couldn't answer that right now. Please try again in a moment.";

fn system_prompt(user: &User, instructions: &str) -> String {
    let mut prompt = format!(
        "You are a workplace assistant for {}, who works as {} in the {} department.",
        user.name,
        user.position.as_deref().filter(|p| !p.is_empty()).unwrap_or("an employee"),
        user.department.as_deref().filter(|d| !d.is_empty()).unwrap_or("general"),
    );
    if !instructions.trim().is_empty() {
        prompt.push('\n');
        prompt.push_str(instructions.trim());
    }
    prompt.push_str("\nKeep answers concise and non-technical.");
    prompt
}

/// Prior turns as chat messages, without the utterance being answered.
fn history_messages(mut history: Vec<ConversationMessage>, utterance: &str) -> Vec<ChatMessage> {
    if history
        .last()
        .is_some_and(|m| m.sender == Sender::User && m.text == utterance)
    {
        history.pop();
    }
    history
        .into_iter()
        .map(|m| match m.sender {
            Sender::User => ChatMessage::user(m.text),
            Sender::System => ChatMessage::assistant(m.text),
        })
        .collect()
}

pub async fn handle(
    deps: &AssistantDeps,
    user: &User,
    conversation: &Conversation,
    utterance: &str,
) -> ServiceResult<Reply> {
    let instructions = match deps.registry.settings().await {
        Ok(settings) => settings.system_instructions.clone(),
        Err(e) => {
            warn!(error = %e, "WhatsApp settings unavailable, answering without instructions");
            String::new()
        }
    };
    let turns = deps.settings.history_turns.min(MAX_HISTORY);

    let history = match conversation.id {
        // One extra message so the current utterance can be dropped.
        Some(id) if turns > 0 => deps.stores.conversations.recent_messages(id, turns + 1).await?,
        _ => Vec::new(),
    };
    let mut prior = history_messages(history, utterance);
    if prior.len() > turns {
        prior.drain(..prior.len() - turns);
    }

    let mut messages = vec![ChatMessage::system(system_prompt(user, &instructions))];
    messages.extend(prior);
    messages.push(ChatMessage::user(utterance));

    let request = ChatRequest {
        messages,
        temperature: 0.7,
        max_tokens: 400,
    };
    match deps.llm.complete(request).await {
        Ok(answer) if !answer.trim().is_empty() => Ok(Reply::text(answer.trim())),
        Ok(_) => Ok(Reply::text(FALLBACK_REPLY)),
        Err(e) => {
            warn!(error = %e, "General question could not be answered");
            Ok(Reply::text(FALLBACK_REPLY))
        }
    }
}
