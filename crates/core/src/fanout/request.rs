use crate::config::LanguageDefaults;
use crate::credentials::UserId;
use crate::lang::{self, LangCode, Language};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const AUTO_DETECT: &str = "auto";

/// Per-name on/off switches. Names that are not listed are enabled.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Toggles(BTreeMap<String, bool>);

impl Toggles {
    pub fn with(mut self, name: &str, enabled: bool) -> Self {
        self.0.insert(name.to_owned(), enabled);
        self
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(true)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub target_languages: Option<Vec<String>>,
    #[serde(default)]
    pub enabled_providers: Option<Toggles>,
    #[serde(default)]
    pub enabled_enrichments: Option<Toggles>,
    #[serde(default)]
    pub user: Option<UserId>,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn from_language(mut self, name: impl Into<String>) -> Self {
        self.source_language = Some(name.into());
        self
    }

    pub fn to_languages<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_languages = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_providers(mut self, toggles: Toggles) -> Self {
        self.enabled_providers = Some(toggles);
        self
    }

    pub fn with_enrichments(mut self, toggles: Toggles) -> Self {
        self.enabled_enrichments = Some(toggles);
        self
    }

    pub fn for_user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    pub(crate) fn provider_enabled(&self, name: &str) -> bool {
        self.enabled_providers
            .as_ref()
            .map_or(true, |t| t.is_enabled(name))
    }

    pub(crate) fn enrichment_enabled(&self, name: &str) -> bool {
        self.enabled_enrichments
            .as_ref()
            .map_or(true, |t| t.is_enabled(name))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("text to translate must not be empty")]
    EmptyText,
}

/// Effective languages and text of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Plan {
    pub text: String,
    pub source_name: String,
    pub source_code: LangCode,
    pub targets: Vec<(String, LangCode)>,
}

pub(crate) fn plan(
    request: &TranslationRequest,
    defaults: &LanguageDefaults,
) -> Result<Plan, RequestError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(RequestError::EmptyText);
    }

    let source_name = match request.source_language.as_deref().map(lang::normalize_name) {
        Some(name) if !name.is_empty() && name != AUTO_DETECT => name,
        _ => lang::normalize_name(&defaults.source),
    };
    let default_source_code = lang::code_for(&defaults.source).unwrap_or(Language::German.code());
    let source_code = lang::code_or(&source_name, default_source_code);

    let fallback_target_code =
        lang::known_code(&defaults.fallback_target_code).unwrap_or(Language::English.code());
    let requested = request
        .target_languages
        .as_ref()
        .unwrap_or(&defaults.targets);

    let mut targets: Vec<(String, LangCode)> = Vec::new();
    for name in requested.iter().map(|n| lang::normalize_name(n)) {
        if name.is_empty() || name == source_name || targets.iter().any(|(t, _)| *t == name) {
            continue;
        }
        let code = lang::code_or(&name, fallback_target_code);
        targets.push((name, code));
    }

    Ok(Plan {
        text: text.to_owned(),
        source_name,
        source_code,
        targets,
    })
}
