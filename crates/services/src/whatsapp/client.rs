use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shiftdesk_config::WhatsAppSettings as WhatsAppConfig;
use tracing::{debug, instrument};

use super::mask_phone;
use crate::error::ProviderError;
use crate::providers::{http_client, with_deadline};

const PROVIDER: &str = "whatsapp";

/// An approved template resolved to a provider id, language and ordered parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMessage {
    pub name: String,
    pub language: String,
    pub parameters: Vec<String>,
}

#[async_trait]
pub trait WhatsAppTransport: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), ProviderError>;

    async fn send_template(&self, to: &str, template: &TemplateMessage)
    -> Result<(), ProviderError>;

    /// Resolves a media id to its short-lived download URL.
    async fn media_url(&self, media_id: &str) -> Result<String, ProviderError>;

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}

pub fn text_payload(to: &str, body: &str) -> serde_json::Value {
    json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "text",
        "text": { "body": body },
    })
}

pub fn template_payload(to: &str, template: &TemplateMessage) -> serde_json::Value {
    let parameters: Vec<serde_json::Value> = template
        .parameters
        .iter()
        .map(|text| json!({ "type": "text", "text": text }))
        .collect();
    json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "template",
        "template": {
            "name": template.name,
            "language": { "code": template.language },
            "components": [{ "type": "body", "parameters": parameters }],
        },
    })
}

#[derive(Debug, Deserialize)]
struct MediaInfo {
    url: String,
}

/// Meta WhatsApp Cloud (Graph API) transport.
pub struct CloudApiClient {
    client: reqwest::Client,
    config: WhatsAppConfig,
}

impl CloudApiClient {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config,
        }
    }

    fn graph_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version,
            path
        )
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.config.access_token.is_empty() || self.config.phone_number_id.is_empty() {
            return Err(ProviderError::NotConfigured(PROVIDER));
        }
        Ok(())
    }

    async fn post_message(&self, payload: serde_json::Value) -> Result<(), ProviderError> {
        self.ensure_configured()?;
        let url = self.graph_url(&format!("{}/messages", self.config.phone_number_id));
        with_deadline(PROVIDER, self.config.timeout_secs, async {
            let response = self
                .client
                .post(url)
                .bearer_auth(&self.config.access_token)
                .json(&payload)
                .send()
                .await
                .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Rejected(PROVIDER, format!("{status}: {body}")));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl WhatsAppTransport for CloudApiClient {
    #[instrument(skip(self, to, body), fields(to = %mask_phone(to)))]
    async fn send_text(&self, to: &str, body: &str) -> Result<(), ProviderError> {
        self.post_message(text_payload(to, body)).await?;
        debug!("Text message sent");
        Ok(())
    }

    #[instrument(skip(self, to, template), fields(to = %mask_phone(to), template = %template.name))]
    async fn send_template(
        &self,
        to: &str,
        template: &TemplateMessage,
    ) -> Result<(), ProviderError> {
        self.post_message(template_payload(to, template)).await?;
        debug!("Template message sent");
        Ok(())
    }

    async fn media_url(&self, media_id: &str) -> Result<String, ProviderError> {
        self.ensure_configured()?;
        with_deadline(PROVIDER, self.config.timeout_secs, async {
            let info: MediaInfo = self
                .client
                .get(self.graph_url(media_id))
                .bearer_auth(&self.config.access_token)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?
                .json()
                .await
                .map_err(|e| ProviderError::Unavailable(PROVIDER, e.to_string()))?;
            Ok(info.url)
        })
        .await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.ensure_configured()?;
        with_deadline(PROVIDER, self.config.timeout_secs, async {
            let bytes = self
                .client
                .get(url)
                .bearer_auth(&self.config.access_token)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?
                .bytes()
                .await
                .map_err(|e| ProviderError::Unavailable(PROVIDER, e.to_string()))?;
            Ok(bytes.to_vec())
        })
        .await
    }
}
