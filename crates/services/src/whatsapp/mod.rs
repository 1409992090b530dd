pub mod client;
pub mod policy;
pub mod templates;
pub mod webhook;

pub use client::{CloudApiClient, TemplateMessage, WhatsAppTransport};
pub use policy::{OutboundPolicy, SendMode, SendOutcome, TemplateRequest};
pub use templates::TemplateRegistry;
pub use webhook::{InboundKind, InboundMessage, parse_event, verify_signature, verify_subscription};

/// Last four digits of a phone number, for logs.
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("***{tail}")
}
