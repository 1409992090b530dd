use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};

use shiftdesk_db::models::{TemplateDefinition, TemplateVariant, WhatsAppSettings};
use tokio::sync::RwLock;
use tracing::debug;

use crate::dao::{DaoResult, WhatsAppSettingsDao};

pub const FALLBACK_LANGUAGE: &str = "en";

static POSITIONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\d+)\}\}").expect("valid regex"));
static NAMED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// In-process snapshot of the settings singleton. The snapshot may be stale;
/// a template miss reloads it once before giving up.
pub struct TemplateRegistry {
    dao: Arc<WhatsAppSettingsDao>,
    snapshot: RwLock<Option<Arc<WhatsAppSettings>>>,
}

impl TemplateRegistry {
    pub fn new(dao: Arc<WhatsAppSettingsDao>) -> Self {
        Self {
            dao,
            snapshot: RwLock::new(None),
        }
    }

    pub async fn settings(&self) -> DaoResult<Arc<WhatsAppSettings>> {
        if let Some(current) = self.snapshot.read().await.as_ref() {
            return Ok(current.clone());
        }
        self.refresh().await
    }

    pub async fn refresh(&self) -> DaoResult<Arc<WhatsAppSettings>> {
        let fresh = Arc::new(self.dao.get_or_create().await?);
        *self.snapshot.write().await = Some(fresh.clone());
        debug!(templates = fresh.templates.len(), "Template registry refreshed");
        Ok(fresh)
    }

    /// Replaces the stored singleton and the cached snapshot.
    pub async fn store(&self, settings: WhatsAppSettings) -> DaoResult<Arc<WhatsAppSettings>> {
        let stored = Arc::new(self.dao.replace(settings).await?);
        *self.snapshot.write().await = Some(stored.clone());
        Ok(stored)
    }

    pub async fn lookup(&self, name: &str) -> DaoResult<Option<TemplateDefinition>> {
        if let Some(found) = self.settings().await?.templates.get(name) {
            return Ok(Some(found.clone()));
        }
        Ok(self.refresh().await?.templates.get(name).cloned())
    }

    pub async fn legacy(&self, name: &str) -> DaoResult<Option<String>> {
        Ok(self.settings().await?.legacy_templates.get(name).cloned())
    }
}

/// Picks the variant for `language` (or its primary subtag), falling back to English.
pub fn resolve_variant<'a>(
    definition: &'a TemplateDefinition,
    language: &str,
) -> Option<&'a TemplateVariant> {
    let lowered = language.to_lowercase();
    let primary = lowered.split(['-', '_']).next().unwrap_or_default();
    definition
        .languages
        .get(&lowered)
        .or_else(|| definition.languages.get(primary))
        .or_else(|| definition.languages.get(FALLBACK_LANGUAGE))
}

/// Parameter values in the template's slot order; missing slots become empty.
pub fn positional_parameters(
    definition: &TemplateDefinition,
    slots: &BTreeMap<String, String>,
) -> Vec<String> {
    definition
        .parameters
        .iter()
        .map(|slot| slots.get(slot).cloned().unwrap_or_default())
        .collect()
}

/// Substitutes `{{1}}`, `{{2}}`, ... with the parameters in order. Values
/// are inserted verbatim; placeholders without a parameter are left as is.
pub fn render_positional(body: &str, parameters: &[String]) -> String {
    POSITIONAL
        .replace_all(body, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| parameters.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Substitutes `{slot}` placeholders from the slot map in a single pass.
pub fn render_named(text: &str, slots: &BTreeMap<String, String>) -> String {
    NAMED
        .replace_all(text, |caps: &Captures| {
            slots
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// The literal text a template produces for `language` and `slots`.
pub fn render_template(
    definition: &TemplateDefinition,
    language: &str,
    slots: &BTreeMap<String, String>,
) -> String {
    let body = resolve_variant(definition, language)
        .and_then(|v| v.body.as_deref())
        .unwrap_or(&definition.body);
    render_positional(body, &positional_parameters(definition, slots))
}
