use crate::clean;
use crate::config::ApiKey;
use crate::credentials::Service;
use crate::enrich::{EnrichmentSlot, Enricher};
use crate::lang::LangCode;
use crate::translate::pons::{lookup, PonsLanguageResult, PONS_API_URL};
use crate::translate::TranslateError;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(10);
const MAX_HITS: usize = 2;
const MAX_ROMS: usize = 2;
const MAX_SENSES: usize = 3;

/// Short dictionary definition built from PONS headwords and sense headers.
#[derive(Clone)]
pub struct PonsDefinition {
    client: Client,
    base_url: String,
}

impl PonsDefinition {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: PONS_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl Default for PonsDefinition {
    fn default() -> Self {
        Self::new()
    }
}

/// Dictionary used to describe a word in `source`.
fn definition_pair(source: LangCode) -> &'static str {
    match source {
        "es" => "dees",
        "pl" => "depl",
        _ => "deen",
    }
}

fn definition_parts(results: &[PonsLanguageResult]) -> Vec<String> {
    let mut parts = Vec::new();
    let roms = results
        .iter()
        .take(1)
        .flat_map(|lang| lang.hits.iter().take(MAX_HITS))
        .flat_map(|hit| hit.roms.iter().take(MAX_ROMS));

    for rom in roms {
        let headword = clean::strip_markup(&rom.headword_full);
        if !rom.wordclass.is_empty() && !headword.is_empty() {
            parts.push(format!("[{}] {headword}", rom.wordclass));
        }
        parts.extend(
            rom.arabs
                .iter()
                .take(MAX_SENSES)
                .filter_map(|arab| clean::clean_header(&arab.header)),
        );
    }
    parts
}

impl Enricher for PonsDefinition {
    fn name(&self) -> &'static str {
        "PONS Definition"
    }

    fn slot(&self) -> EnrichmentSlot {
        EnrichmentSlot::Definition
    }

    fn service(&self) -> Service {
        Service::Pons
    }

    fn deadline(&self) -> Duration {
        DEADLINE
    }

    fn lookup(
        &self,
        text: String,
        source: LangCode,
        credential: ApiKey,
    ) -> BoxFuture<'_, Result<String, TranslateError>> {
        async move {
            let results = lookup(
                &self.client,
                &self.base_url,
                definition_pair(source),
                &text,
                &credential,
            )
            .await?
            .unwrap_or_default();
            Ok(clean::assemble_definition(definition_parts(&results)))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_follows_source_language() {
        assert_eq!(definition_pair("de"), "deen");
        assert_eq!(definition_pair("en"), "deen");
        assert_eq!(definition_pair("es"), "dees");
        assert_eq!(definition_pair("pl"), "depl");
        assert_eq!(definition_pair("fr"), "deen");
    }

    #[test]
    fn parts_come_from_headwords_and_headers() {
        let body = r#"[{"lang":"de","hits":[
            {"roms":[{"headword_full":"<strong>Haus</strong> &lt;-es, Häuser&gt;",
              "wordclass":"noun",
              "arabs":[{"header":"1. Haus <span>(Gebäude)</span>:"},{"header":"2. Haus"},
                       {"header":"3."},{"header":"4. Familie"}]},
             {"headword_full":"","wordclass":"","arabs":[]},
             {"headword_full":"third","wordclass":"noun","arabs":[]}]},
            {"roms":[{"headword_full":"hausen","wordclass":"verb","arabs":[]}]},
            {"roms":[{"headword_full":"ignored","wordclass":"noun","arabs":[]}]}]}]"#;
        let results: Vec<PonsLanguageResult> = serde_json::from_str(body).expect("valid body");
        assert_eq!(
            definition_parts(&results),
            vec![
                "[noun] Haus <-es, Häuser>".to_string(),
                "Haus (Gebäude)".to_string(),
                "Haus".to_string(),
                "[verb] hausen".to_string(),
            ]
        );
    }
}
