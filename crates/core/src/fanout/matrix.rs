use crate::enrich::EnrichmentSlot;
use crate::translate::TranslationOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ProviderOutcomes = BTreeMap<String, TranslationOutcome>;

/// Complete answer to one translation request.
///
/// Enrichment slots are `None` when the enrichment was disabled and
/// `Some("")` when it ran without producing anything.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultMatrix {
    pub source_language: String,
    pub source_text: String,
    pub translations: BTreeMap<String, ProviderOutcomes>,
    pub definition: Option<String>,
    pub explanation: Option<String>,
}

impl ResultMatrix {
    pub(crate) fn new<'a, I>(source_language: &str, source_text: &str, targets: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            source_language: source_language.to_owned(),
            source_text: source_text.to_owned(),
            translations: targets
                .into_iter()
                .map(|t| (t.to_owned(), ProviderOutcomes::new()))
                .collect(),
            definition: None,
            explanation: None,
        }
    }

    pub(crate) fn insert(&mut self, language: &str, provider: &str, outcome: TranslationOutcome) {
        self.translations
            .entry(language.to_owned())
            .or_default()
            .insert(provider.to_owned(), outcome);
    }

    pub(crate) fn set_enrichment(&mut self, slot: EnrichmentSlot, value: String) {
        match slot {
            EnrichmentSlot::Definition => self.definition = Some(value),
            EnrichmentSlot::Explanation => self.explanation = Some(value),
        }
    }

    pub fn outcome(&self, language: &str, provider: &str) -> Option<&TranslationOutcome> {
        self.translations.get(language)?.get(provider)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.translations.keys().map(String::as_str)
    }

    /// Number of (language, provider) cells.
    pub fn cell_count(&self) -> usize {
        self.translations.values().map(BTreeMap::len).sum()
    }
}
