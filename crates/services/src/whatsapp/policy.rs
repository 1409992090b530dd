use std::collections::BTreeMap;
use std::sync::Arc;

use bson::DateTime;
use shiftdesk_db::models::User;
use tracing::{debug, warn};

use super::client::{TemplateMessage, WhatsAppTransport};
use super::mask_phone;
use super::templates::{
    TemplateRegistry, positional_parameters, render_named, render_positional, render_template,
    resolve_variant,
};
use crate::dao::ConversationDao;
use crate::error::ProviderError;

/// A logical template name plus the slot values to fill it with.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRequest {
    pub name: String,
    pub slots: BTreeMap<String, String>,
}

impl TemplateRequest {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slots: BTreeMap::new(),
        }
    }

    pub fn slot(mut self, key: &str, value: impl Into<String>) -> Self {
        self.slots.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendMode {
    FreeForm,
    Template { template_id: String, language: String },
    /// Template missing; legacy or caller text sent as free-form.
    LegacyFallback,
}

#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub mode: SendMode,
    pub rendered: String,
}

/// Chooses between free-form text and an approved template depending on the
/// recipient's customer-service window.
pub struct OutboundPolicy {
    transport: Arc<dyn WhatsAppTransport>,
    conversations: Arc<ConversationDao>,
    registry: Arc<TemplateRegistry>,
}

impl OutboundPolicy {
    pub fn new(
        transport: Arc<dyn WhatsAppTransport>,
        conversations: Arc<ConversationDao>,
        registry: Arc<TemplateRegistry>,
    ) -> Self {
        Self {
            transport,
            conversations,
            registry,
        }
    }

    pub fn transport(&self) -> &Arc<dyn WhatsAppTransport> {
        &self.transport
    }

    pub async fn in_session_window(&self, user: &User) -> bool {
        let Some(user_id) = user.id else {
            return false;
        };
        match self.conversations.find_active(user_id).await {
            Ok(Some(conversation)) => conversation.within_window(DateTime::now()),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Session window lookup failed, assuming closed");
                false
            }
        }
    }

    /// Text the recipient will see for this message, used as notification content.
    pub async fn preview(&self, user: &User, text: &str, template: Option<&TemplateRequest>) -> String {
        let Some(request) = template else {
            return text.to_string();
        };
        match self.registry.lookup(&request.name).await {
            Ok(Some(definition)) => {
                render_template(&definition, &user.preferred_language, &request.slots)
            }
            _ => text.to_string(),
        }
    }

    /// Sends `text` free-form inside the window. Outside it, sends the
    /// requested template, or the legacy/caller text when the template is
    /// not registered.
    pub async fn send(
        &self,
        user: &User,
        text: &str,
        template: Option<&TemplateRequest>,
    ) -> Result<SendOutcome, ProviderError> {
        let phone = user
            .phone_digits()
            .ok_or_else(|| ProviderError::Rejected("whatsapp", "recipient has no phone".into()))?;

        let request = match template {
            Some(request) if !self.in_session_window(user).await => request,
            _ => {
                self.transport.send_text(&phone, text).await?;
                return Ok(SendOutcome {
                    mode: SendMode::FreeForm,
                    rendered: text.to_string(),
                });
            }
        };

        let definition = match self.registry.lookup(&request.name).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Template registry unavailable");
                None
            }
        };

        if let Some(definition) = definition {
            if let Some(variant) = resolve_variant(&definition, &user.preferred_language) {
                let parameters = positional_parameters(&definition, &request.slots);
                let message = TemplateMessage {
                    name: variant.template_id.clone(),
                    language: variant.code.clone(),
                    parameters: parameters.clone(),
                };
                self.transport.send_template(&phone, &message).await?;
                debug!(to = %mask_phone(&phone), template = %message.name, "Sent template outside session window");
                let body = variant.body.as_deref().unwrap_or(&definition.body);
                return Ok(SendOutcome {
                    mode: SendMode::Template {
                        template_id: message.name,
                        language: message.language,
                    },
                    rendered: render_positional(body, &parameters),
                });
            }
        }

        warn!(
            template = %request.name,
            to = %mask_phone(&phone),
            "Template not registered, falling back to legacy text outside session window"
        );
        let fallback = match self.registry.legacy(&request.name).await {
            Ok(Some(legacy)) => render_named(&legacy, &request.slots),
            _ => text.to_string(),
        };
        self.transport.send_text(&phone, &fallback).await?;
        Ok(SendOutcome {
            mode: SendMode::LegacyFallback,
            rendered: fallback,
        })
    }
}
