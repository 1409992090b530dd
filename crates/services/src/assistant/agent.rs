use std::sync::Arc;

use serde_json::json;
use shiftdesk_db::models::{
    Conversation, ConversationMessage, Platform, User, WhatsAppSettings,
};
use tracing::{debug, error, info, warn};

use super::handlers;
use super::intent::IntentClassifier;
use super::{AssistantDeps, Reply, truncate_chars};
use crate::media_decoder::{MediaDecoder, MediaError, recognition_locale};
use crate::whatsapp::{InboundKind, InboundMessage, mask_phone};

const UNSUPPORTED_REPLY: &str =
    "Sorry, I can only understand text and voice messages for now.";
const VOICE_APOLOGY: &str =
    "Sorry, I couldn't process your voice message. Please try again or send a text message.";
const SILENT_VOICE_APOLOGY: &str =
    "I couldn't hear anything in your voice message. Could you try again or type your question?";
const HANDLER_APOLOGY: &str =
    "Sorry, something went wrong while handling your message. Please try again shortly.";
const VOICE_PLACEHOLDER: &str = "[voice message]";

/// Inbound WhatsApp pipeline: user lookup, optional transcription,
/// conversation bookkeeping, intent routing and the outbound reply.
pub struct WhatsAppAgent {
    deps: Arc<AssistantDeps>,
    classifier: IntentClassifier,
    media: Arc<MediaDecoder>,
    default_locale: String,
}

impl WhatsAppAgent {
    pub fn new(deps: Arc<AssistantDeps>, media: Arc<MediaDecoder>, default_locale: String) -> Self {
        Self {
            classifier: IntentClassifier::new(deps.llm.clone()),
            deps,
            media,
            default_locale,
        }
    }

    pub fn deps(&self) -> &Arc<AssistantDeps> {
        &self.deps
    }

    /// Handles one inbound message end to end. Errors are logged and never
    /// surfaced, the provider has already been acknowledged.
    pub async fn handle_inbound(&self, message: InboundMessage) {
        let masked = mask_phone(&message.from);
        let settings = match self.deps.registry.settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "WhatsApp settings unavailable, using defaults");
                Arc::new(WhatsAppSettings::default())
            }
        };
        if !settings.enabled {
            debug!(from = %masked, "WhatsApp assistant disabled, ignoring message");
            return;
        }

        let user = match self.deps.stores.users.find_by_phone(&message.from).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                info!(from = %masked, "Message from unregistered number");
                self.send_raw(&message.from, &self.deps.settings.unknown_user_reply)
                    .await;
                return;
            }
            Err(e) => {
                error!(from = %masked, error = %e, "User lookup failed");
                return;
            }
        };

        if let Err(e) = self.process(&user, &settings, message).await {
            error!(user = ?user.id, error = %e, "Inbound message handling failed");
            self.reply(&user, HANDLER_APOLOGY).await;
        }
    }

    async fn process(
        &self,
        user: &User,
        settings: &WhatsAppSettings,
        message: InboundMessage,
    ) -> crate::error::ServiceResult<()> {
        let user_id = handlers::require_id(user)?;

        let (utterance, audio_ref) = match message.kind {
            InboundKind::Text(text) => (text, None),
            InboundKind::Audio { media_id } => {
                let locale =
                    recognition_locale(&user.preferred_language, &self.default_locale);
                match self.media.transcribe(&media_id, &locale).await {
                    Ok(text) => (text, Some(media_id)),
                    Err(e) => {
                        warn!(user = %user_id, media_id = %media_id, error = %e, "Voice note not transcribed");
                        let apology = match e {
                            MediaError::NoSpeech => SILENT_VOICE_APOLOGY,
                            _ => VOICE_APOLOGY,
                        };
                        let conversation = self
                            .deps
                            .stores
                            .conversations
                            .fetch_active(user_id, Platform::Whatsapp)
                            .await?;
                        let id = conversation_id(&conversation)?;
                        self.deps
                            .stores
                            .conversations
                            .append(id, &ConversationMessage::user(VOICE_PLACEHOLDER, Some(media_id)))
                            .await?;
                        self.deps
                            .stores
                            .conversations
                            .append(id, &ConversationMessage::system(apology))
                            .await?;
                        self.reply(user, apology).await;
                        return Ok(());
                    }
                }
            }
            InboundKind::Other(kind) => {
                debug!(user = %user_id, kind = %kind, "Unsupported message type");
                self.reply(user, UNSUPPORTED_REPLY).await;
                return Ok(());
            }
        };

        let conversation = self
            .deps
            .stores
            .conversations
            .fetch_active(user_id, Platform::Whatsapp)
            .await?;
        let conversation_id = conversation_id(&conversation)?;
        self.deps
            .stores
            .conversations
            .append(conversation_id, &ConversationMessage::user(&utterance, audio_ref))
            .await?;

        if !settings.auto_reply {
            debug!(user = %user_id, "Auto-reply disabled, message stored only");
            return Ok(());
        }

        let reply = if settings.ai_processing {
            let intent = self.classifier.classify(&utterance).await;
            info!(user = %user_id, intent = intent.as_str(), "Intent classified");
            let reply = match handlers::dispatch(intent, &self.deps, user, &conversation, &utterance)
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(user = %user_id, intent = intent.as_str(), error = %e, "Handler failed");
                    Reply::text(HANDLER_APOLOGY)
                }
            };
            reply.with_slot("lastIntent", json!(intent.as_str()))
        } else {
            Reply::text(settings.welcome_message.clone())
        };

        self.deps
            .stores
            .conversations
            .update_context(conversation_id, &reply.context)
            .await?;

        let max_chars = settings.max_response_length.max(1) as usize;
        let text = truncate_chars(&reply.text, max_chars);
        self.deps
            .stores
            .conversations
            .append(conversation_id, &ConversationMessage::system(&text))
            .await?;
        self.reply(user, &text).await;
        Ok(())
    }

    /// The user has just written to us, so the policy sends free-form text.
    async fn reply(&self, user: &User, text: &str) {
        if let Err(e) = self.deps.policy.send(user, text, None).await {
            warn!(user = ?user.id, error = %e, "Reply not delivered");
        }
    }

    async fn send_raw(&self, to: &str, text: &str) {
        if let Err(e) = self.deps.policy.transport().send_text(to, text).await {
            warn!(to = %mask_phone(to), error = %e, "Reply not delivered");
        }
    }
}

fn conversation_id(conversation: &Conversation) -> crate::error::ServiceResult<bson::oid::ObjectId> {
    conversation
        .id
        .ok_or_else(|| crate::error::ServiceError::Internal("conversation without id".to_string()))
}
