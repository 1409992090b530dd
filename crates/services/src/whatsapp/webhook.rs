use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::warn;

/// Echoes the challenge when the subscription request carries the expected token.
pub fn verify_subscription<'a>(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&'a str>,
    expected_token: &str,
) -> Option<&'a str> {
    if expected_token.is_empty() {
        return None;
    }
    match (mode, token) {
        (Some("subscribe"), Some(token)) if token == expected_token => challenge,
        _ => None,
    }
}

/// Checks an `X-Hub-Signature-256` header (`sha256=<hex>`) against the raw body.
pub fn verify_signature(app_secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(hex_sig) = header.and_then(|h| h.strip_prefix("sha256=")) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundKind {
    Text(String),
    Audio { media_id: String },
    /// Any other message type (image, sticker, location, ...).
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub from: String,
    pub id: String,
    pub kind: InboundKind,
}

#[derive(Debug, Deserialize)]
struct Event {
    object: String,
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    field: String,
    #[serde(default)]
    value: ChangeValue,
}

/// Messages stay raw so one malformed entry cannot sink the batch.
#[derive(Debug, Default, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    messages: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    from: String,
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    kind: String,
    text: Option<TextBody>,
    audio: Option<MediaRef>,
}

#[derive(Debug, Deserialize)]
struct TextBody {
    body: String,
}

#[derive(Debug, Deserialize)]
struct MediaRef {
    id: String,
}

impl From<RawMessage> for InboundMessage {
    fn from(raw: RawMessage) -> Self {
        let kind = match (raw.kind.as_str(), raw.text, raw.audio) {
            ("text", Some(text), _) => InboundKind::Text(text.body),
            ("audio", _, Some(audio)) => InboundKind::Audio { media_id: audio.id },
            (other, ..) => InboundKind::Other(other.to_string()),
        };
        InboundMessage {
            from: raw.from,
            id: raw.id,
            kind,
        }
    }
}

/// Extracts inbound messages from a webhook body. Status callbacks, other
/// change fields and other objects yield an empty list.
pub fn parse_event(body: &[u8]) -> Result<Vec<InboundMessage>, serde_json::Error> {
    let event: Event = serde_json::from_slice(body)?;
    if event.object != "whatsapp_business_account" {
        return Ok(Vec::new());
    }
    Ok(event
        .entry
        .into_iter()
        .flat_map(|entry| entry.changes)
        .filter(|change| change.field == "messages")
        .flat_map(|change| change.value.messages)
        .filter_map(decode_message)
        .collect())
}

fn decode_message(raw: Value) -> Option<InboundMessage> {
    match serde_json::from_value::<RawMessage>(raw) {
        Ok(message) => Some(message.into()),
        Err(e) => {
            warn!(error = %e, "Skipping malformed WhatsApp message");
            None
        }
    }
}
